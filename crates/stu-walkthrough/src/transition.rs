#![forbid(unsafe_code)]

//! Step transitions: clamped targets and keyboard mapping.

use serde::Serialize;
use stu_core::event::{FocusTarget, KeyCode, KeyEvent, KeyEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Back,
}

/// What triggered a transition; reported as the `input` analytics property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionInput {
    /// Step-level Back/Next buttons.
    Button,
    /// ArrowLeft/ArrowRight.
    Keyboard,
    /// The bubble's primary control on its last note.
    Note,
    /// Direct jump (progress dots, chapter list).
    Jump,
}

impl TransitionInput {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Keyboard => "keyboard",
            Self::Note => "note",
            Self::Jump => "jump",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRequest {
    Next,
    Back,
    To(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTransition {
    pub from: usize,
    pub to: usize,
    pub direction: Direction,
}

/// Compute the transition for `request`, or `None` when it would not move.
///
/// Targets are clamped into `[0, total - 1]`.
pub fn plan(current: usize, total: usize, request: TransitionRequest) -> Option<StepTransition> {
    let last = total.checked_sub(1)?;
    let current = current.min(last);
    let target = match request {
        TransitionRequest::Next => current.saturating_add(1),
        TransitionRequest::Back => current.saturating_sub(1),
        TransitionRequest::To(index) => index,
    }
    .min(last);

    if target == current {
        return None;
    }
    let direction = if target > current {
        Direction::Next
    } else {
        Direction::Back
    };
    Some(StepTransition {
        from: current,
        to: target,
        direction,
    })
}

/// Map a key press to a step direction.
///
/// Keys typed into text entry controls, releases, and chords with
/// Ctrl/Alt/Super are never treated as navigation.
pub fn keyboard_direction(key: &KeyEvent, focus: FocusTarget) -> Option<Direction> {
    if key.kind == KeyEventKind::Release || focus.is_text_entry() || key.has_command_modifier() {
        return None;
    }
    match key.code {
        KeyCode::Right => Some(Direction::Next),
        KeyCode::Left => Some(Direction::Back),
        _ => None,
    }
}
