#![forbid(unsafe_code)]

//! Annotation bubbles: per-step note navigation and drag repositioning.
//!
//! # Invariants
//!
//! 1. The bubble index is reset to 0 whenever the active step changes.
//! 2. At most one pointer is captured at a time; a second `pointer_down`
//!    while captured is rejected.
//! 3. Only the captured pointer id can move or release a drag.
//! 4. Offsets are keyed by `(step_id, bubble_id)` and survive step changes
//!    for the lifetime of the overlay.
//! 5. Reset restores the declared default exactly.

use std::collections::HashMap;

use serde::Serialize;
use stu_core::geometry::{Offset, Point};

use crate::step::BubblePlacement;

pub const NEXT_NOTE_LABEL: &str = "Next note";
pub const NEXT_VIEW_LABEL: &str = "Next view";
pub const PREVIOUS_NOTE_LABEL: &str = "Previous note";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BubbleKey {
    pub step_id: String,
    pub bubble_id: String,
}

impl BubbleKey {
    pub fn new(step_id: impl Into<String>, bubble_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            bubble_id: bubble_id.into(),
        }
    }
}

/// Outcome of the bubble's primary control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteAdvance {
    /// Moved to the next bubble of the same step.
    NextNote,
    /// Last bubble: advance to the next step.
    NextStep,
    /// Last bubble of the last step: leave the walkthrough.
    Exit,
}

impl NoteAdvance {
    /// What the primary control does at `bubble_index`.
    pub const fn resolve(bubble_index: usize, bubble_count: usize, has_next_step: bool) -> Self {
        if bubble_index + 1 < bubble_count {
            Self::NextNote
        } else if has_next_step {
            Self::NextStep
        } else {
            Self::Exit
        }
    }

    /// Button label; the exit label is host configurable.
    pub fn label(self, exit_label: &str) -> &str {
        match self {
            Self::NextNote => NEXT_NOTE_LABEL,
            Self::NextStep => NEXT_VIEW_LABEL,
            Self::Exit => exit_label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalEdge {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalEdge {
    Top,
    Center,
    Bottom,
}

/// Layout parameters for a placement anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlacementLayout {
    pub horizontal: HorizontalEdge,
    pub vertical: VerticalEdge,
    /// Extra vertical translation as a percentage of the bubble height.
    pub translate_y_percent: i8,
}

impl PlacementLayout {
    pub const fn for_placement(placement: BubblePlacement) -> Self {
        let (horizontal, vertical) = match placement {
            BubblePlacement::TopLeft => (HorizontalEdge::Left, VerticalEdge::Top),
            BubblePlacement::TopRight => (HorizontalEdge::Right, VerticalEdge::Top),
            BubblePlacement::CenterLeft => (HorizontalEdge::Left, VerticalEdge::Center),
            BubblePlacement::CenterRight => (HorizontalEdge::Right, VerticalEdge::Center),
            BubblePlacement::BottomLeft => (HorizontalEdge::Left, VerticalEdge::Bottom),
            BubblePlacement::BottomRight => (HorizontalEdge::Right, VerticalEdge::Bottom),
        };
        let translate_y_percent = match vertical {
            VerticalEdge::Center => -50,
            VerticalEdge::Top | VerticalEdge::Bottom => 0,
        };
        Self {
            horizontal,
            vertical,
            translate_y_percent,
        }
    }

    /// CSS transform combining the centering shift with a drag offset.
    pub fn css_transform(&self, offset: Offset) -> String {
        if self.translate_y_percent == 0 {
            format!("translate({}px, {}px)", offset.x, offset.y)
        } else {
            format!(
                "translate({}px, calc({}% + {}px))",
                offset.x, self.translate_y_percent, offset.y
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DragSession {
    pointer_id: i32,
    key: BubbleKey,
    start: Point,
    base: Offset,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationOverlay {
    bubble_index: usize,
    offsets: HashMap<BubbleKey, Offset>,
    drag: Option<DragSession>,
}

impl AnnotationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bubble_index(&self) -> usize {
        self.bubble_index
    }

    /// Called on every step change.
    pub fn reset_for_step(&mut self) {
        self.bubble_index = 0;
        if let Some(drag) = self.drag.take() {
            tracing::trace!(
                target: "stu.walkthrough.annotation",
                pointer_id = drag.pointer_id,
                "drag released by step change"
            );
        }
    }

    /// Primary control. Only [`NoteAdvance::NextNote`] changes overlay
    /// state; the caller performs step transitions and exits.
    pub fn next_note(&mut self, bubble_count: usize, has_next_step: bool) -> NoteAdvance {
        let advance = NoteAdvance::resolve(self.bubble_index, bubble_count, has_next_step);
        if advance == NoteAdvance::NextNote {
            self.bubble_index += 1;
            self.drag = None;
        }
        advance
    }

    /// Step back one note; stays put on the first note.
    pub fn prev_note(&mut self) -> bool {
        if self.bubble_index == 0 {
            return false;
        }
        self.bubble_index -= 1;
        self.drag = None;
        true
    }

    pub fn offset(&self, key: &BubbleKey, default: Offset) -> Offset {
        self.offsets.get(key).copied().unwrap_or(default)
    }

    pub fn can_reset(&self, key: &BubbleKey, default: Offset) -> bool {
        self.offset(key, default) != default
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Capture `pointer_id` on the drag handle of `key`.
    pub fn pointer_down(
        &mut self,
        pointer_id: i32,
        at: Point,
        key: BubbleKey,
        default: Offset,
    ) -> bool {
        if let Some(active) = &self.drag {
            tracing::debug!(
                target: "stu.walkthrough.annotation",
                captured = active.pointer_id,
                rejected = pointer_id,
                "pointer already captured"
            );
            return false;
        }
        let base = self.offset(&key, default);
        self.drag = Some(DragSession {
            pointer_id,
            key,
            start: at,
            base,
        });
        true
    }

    /// Apply a move from the captured pointer; returns the new offset.
    pub fn pointer_move(&mut self, pointer_id: i32, at: Point) -> Option<Offset> {
        let drag = self.drag.as_ref().filter(|d| d.pointer_id == pointer_id)?;
        let offset = drag.base + (at - drag.start);
        self.offsets.insert(drag.key.clone(), offset);
        Some(offset)
    }

    /// Release on `pointerup` or `pointercancel`.
    pub fn pointer_release(&mut self, pointer_id: i32) -> bool {
        match &self.drag {
            Some(drag) if drag.pointer_id == pointer_id => {
                self.drag = None;
                true
            }
            _ => false,
        }
    }

    /// Restore the declared default. Returns whether anything changed.
    pub fn reset_position(&mut self, key: &BubbleKey, default: Offset) -> bool {
        let changed = self.can_reset(key, default);
        self.offsets.remove(key);
        if self.drag.as_ref().is_some_and(|d| &d.key == key) {
            self.drag = None;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(step: &str, bubble: &str) -> BubbleKey {
        BubbleKey::new(step, bubble)
    }

    #[test]
    fn next_note_then_next_step() {
        let mut overlay = AnnotationOverlay::new();
        assert_eq!(overlay.next_note(2, true), NoteAdvance::NextNote);
        assert_eq!(overlay.bubble_index(), 1);
        assert_eq!(overlay.next_note(2, true), NoteAdvance::NextStep);
        assert_eq!(overlay.bubble_index(), 1);
    }

    #[test]
    fn last_note_of_last_step_exits() {
        let mut overlay = AnnotationOverlay::new();
        assert_eq!(overlay.next_note(1, false), NoteAdvance::Exit);
        assert_eq!(overlay.bubble_index(), 0);
    }

    #[test]
    fn prev_note_clamps_at_zero() {
        let mut overlay = AnnotationOverlay::new();
        assert!(!overlay.prev_note());
        overlay.next_note(3, true);
        overlay.next_note(3, true);
        assert!(overlay.prev_note());
        assert_eq!(overlay.bubble_index(), 1);
    }

    #[test]
    fn step_change_resets_index() {
        let mut overlay = AnnotationOverlay::new();
        overlay.next_note(3, true);
        overlay.reset_for_step();
        assert_eq!(overlay.bubble_index(), 0);
    }

    #[test]
    fn labels_follow_position() {
        assert_eq!(NoteAdvance::resolve(0, 2, true).label("Done"), "Next note");
        assert_eq!(NoteAdvance::resolve(1, 2, true).label("Done"), "Next view");
        assert_eq!(NoteAdvance::resolve(1, 2, false).label("Done"), "Done");
        assert_eq!(NoteAdvance::resolve(0, 0, false), NoteAdvance::Exit);
    }

    #[test]
    fn drag_moves_relative_to_base() {
        let mut overlay = AnnotationOverlay::new();
        let k = key("s", "b");
        let default = Offset::new(10, 5);
        assert!(overlay.pointer_down(1, Point::new(100, 100), k.clone(), default));
        assert_eq!(
            overlay.pointer_move(1, Point::new(130, 90)),
            Some(Offset::new(40, -5))
        );
        assert!(overlay.pointer_release(1));
        assert!(overlay.can_reset(&k, default));

        // A second drag starts from the dragged position.
        assert!(overlay.pointer_down(2, Point::new(0, 0), k.clone(), default));
        assert_eq!(
            overlay.pointer_move(2, Point::new(-40, 5)),
            Some(Offset::new(0, 0))
        );
    }

    #[test]
    fn capture_is_exclusive() {
        let mut overlay = AnnotationOverlay::new();
        let k = key("s", "b");
        assert!(overlay.pointer_down(1, Point::new(0, 0), k.clone(), Offset::ZERO));
        assert!(!overlay.pointer_down(2, Point::new(5, 5), k.clone(), Offset::ZERO));
        assert_eq!(overlay.pointer_move(2, Point::new(50, 50)), None);
        assert!(!overlay.pointer_release(2));
        assert!(overlay.is_dragging());
        assert!(overlay.pointer_release(1));
        assert!(!overlay.is_dragging());
    }

    #[test]
    fn reset_restores_exact_default() {
        let mut overlay = AnnotationOverlay::new();
        let k = key("s", "b");
        let default = Offset::new(-12, 7);
        overlay.pointer_down(1, Point::new(3, 3), k.clone(), default);
        overlay.pointer_move(1, Point::new(50, -20));
        overlay.pointer_release(1);
        assert!(overlay.reset_position(&k, default));
        assert_eq!(overlay.offset(&k, default), default);
        assert!(!overlay.can_reset(&k, default));
        assert!(!overlay.reset_position(&k, default));
    }

    #[test]
    fn offsets_are_keyed_per_bubble() {
        let mut overlay = AnnotationOverlay::new();
        let a = key("s1", "b");
        let b = key("s2", "b");
        overlay.pointer_down(1, Point::new(0, 0), a.clone(), Offset::ZERO);
        overlay.pointer_move(1, Point::new(9, 9));
        overlay.pointer_release(1);
        assert_eq!(overlay.offset(&a, Offset::ZERO), Offset::new(9, 9));
        assert_eq!(overlay.offset(&b, Offset::ZERO), Offset::ZERO);
        overlay.reset_for_step();
        assert_eq!(overlay.offset(&a, Offset::ZERO), Offset::new(9, 9));
    }

    #[test]
    fn center_placements_shift_vertically() {
        let layout = PlacementLayout::for_placement(BubblePlacement::CenterLeft);
        assert_eq!(layout.vertical, VerticalEdge::Center);
        assert_eq!(layout.translate_y_percent, -50);
        assert_eq!(
            layout.css_transform(Offset::new(4, 6)),
            "translate(4px, calc(-50% + 6px))"
        );

        let layout = PlacementLayout::for_placement(BubblePlacement::TopRight);
        assert_eq!(layout.horizontal, HorizontalEdge::Right);
        assert_eq!(layout.translate_y_percent, 0);
        assert_eq!(layout.css_transform(Offset::ZERO), "translate(0px, 0px)");
    }
}
