#![forbid(unsafe_code)]

//! Host input, already translated from DOM events.
//!
//! Pointer coordinates are whole CSS pixels relative to the viewport. Key
//! events carry the focused element so navigation keys can stay out of form
//! fields.

use bitflags::bitflags;

use crate::geometry::Point;

/// Canonical input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A keyboard event together with the element that had focus.
    Key(KeyEvent, FocusTarget),

    /// A pointer event (mouse, pen, or touch).
    Pointer(PointerEvent),
}

/// A `keydown` as seen by the walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Unmodified press of `code`.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Ctrl, Alt or Super is held. Those chords belong to the browser.
    #[must_use]
    pub const fn has_command_modifier(&self) -> bool {
        self.modifiers
            .intersects(Modifiers::CTRL.union(Modifiers::ALT).union(Modifiers::SUPER))
    }
}

/// Keys the walkthrough tells apart. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Single printable character.
    Char(char),
    /// `ArrowLeft`.
    Left,
    /// `ArrowRight`.
    Right,
    Other,
}

impl KeyCode {
    /// Map a DOM `KeyboardEvent.key` value.
    #[must_use]
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "ArrowLeft" | "Left" => Self::Left,
            "ArrowRight" | "Right" => Self::Right,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Other,
                }
            }
        }
    }
}

/// `keydown` with `repeat == false`, `keydown` with `repeat == true`, `keyup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

bitflags! {
    /// `shiftKey`, `altKey`, `ctrlKey` and `metaKey` of a DOM key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const NONE  = 0;
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
        const SUPER = 1 << 3;
    }
}

impl Modifiers {
    /// Build from the DOM event's modifier booleans.
    #[must_use]
    pub fn from_dom(shift: bool, alt: bool, ctrl: bool, meta: bool) -> Self {
        let mut m = Self::NONE;
        m.set(Self::SHIFT, shift);
        m.set(Self::ALT, alt);
        m.set(Self::CTRL, ctrl);
        m.set(Self::SUPER, meta);
        m
    }
}

/// The element that had focus when a key event was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusTarget {
    /// Nothing focused, or the document body.
    #[default]
    Document,
    /// An `<input>` element.
    Input,
    /// A `<textarea>` element.
    TextArea,
    /// A `<select>` element.
    Select,
    /// Any element with `contenteditable` set.
    ContentEditable,
    /// A button or link.
    Control,
}

impl FocusTarget {
    /// Classify a focused element from its tag name and editability.
    #[must_use]
    pub fn from_element(tag_name: &str, content_editable: bool) -> Self {
        if content_editable {
            return Self::ContentEditable;
        }
        match tag_name.to_ascii_uppercase().as_str() {
            "INPUT" => Self::Input,
            "TEXTAREA" => Self::TextArea,
            "SELECT" => Self::Select,
            "BUTTON" | "A" => Self::Control,
            _ => Self::Document,
        }
    }

    /// Whether keystrokes belong to the focused element rather than the page.
    #[must_use]
    pub const fn is_text_entry(self) -> bool {
        matches!(
            self,
            Self::Input | Self::TextArea | Self::Select | Self::ContentEditable
        )
    }
}

/// A pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    /// Browser-assigned pointer id; stable for the lifetime of one contact.
    pub pointer_id: i32,

    /// The type of pointer event.
    pub kind: PointerEventKind,

    /// Viewport position in CSS pixels.
    pub position: Point,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub const fn new(pointer_id: i32, kind: PointerEventKind, x: i32, y: i32) -> Self {
        Self {
            pointer_id,
            kind,
            position: Point::new(x, y),
        }
    }
}

/// The type of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// `pointerdown`.
    Down,
    /// `pointermove`.
    Move,
    /// `pointerup`.
    Up,
    /// `pointercancel`.
    Cancel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_keys_map_to_codes() {
        assert_eq!(KeyCode::from_dom_key("ArrowLeft"), KeyCode::Left);
        assert_eq!(KeyCode::from_dom_key("ArrowRight"), KeyCode::Right);
        assert_eq!(KeyCode::from_dom_key("Escape"), KeyCode::Other);
        assert_eq!(KeyCode::from_dom_key("n"), KeyCode::Char('n'));
        assert_eq!(KeyCode::from_dom_key("PageDown"), KeyCode::Other);
        assert_eq!(KeyCode::from_dom_key(""), KeyCode::Other);
    }

    #[test]
    fn key_event_builders() {
        let key = KeyEvent::new(KeyCode::Right)
            .with_modifiers(Modifiers::SHIFT)
            .with_kind(KeyEventKind::Repeat);
        assert_eq!(key.code, KeyCode::Right);
        assert_eq!(key.kind, KeyEventKind::Repeat);
        assert!(!key.has_command_modifier());
    }

    #[test]
    fn dom_modifier_flags() {
        assert_eq!(Modifiers::from_dom(false, false, false, false), Modifiers::NONE);
        assert_eq!(
            Modifiers::from_dom(true, false, true, false),
            Modifiers::SHIFT | Modifiers::CTRL
        );
        assert!(
            KeyEvent::new(KeyCode::Right)
                .with_modifiers(Modifiers::from_dom(false, false, false, true))
                .has_command_modifier()
        );
    }

    #[test]
    fn command_modifiers_detected() {
        for m in [Modifiers::CTRL, Modifiers::ALT, Modifiers::SUPER] {
            let key = KeyEvent::new(KeyCode::Left).with_modifiers(m | Modifiers::SHIFT);
            assert!(key.has_command_modifier(), "{m:?}");
        }
        assert!(!KeyEvent::new(KeyCode::Left).has_command_modifier());
    }

    #[test]
    fn focus_classification() {
        assert_eq!(FocusTarget::from_element("input", false), FocusTarget::Input);
        assert_eq!(
            FocusTarget::from_element("TEXTAREA", false),
            FocusTarget::TextArea
        );
        assert_eq!(FocusTarget::from_element("select", false), FocusTarget::Select);
        assert_eq!(
            FocusTarget::from_element("div", true),
            FocusTarget::ContentEditable
        );
        assert_eq!(FocusTarget::from_element("button", false), FocusTarget::Control);
        assert_eq!(FocusTarget::from_element("body", false), FocusTarget::Document);
    }

    #[test]
    fn text_entry_targets() {
        assert!(FocusTarget::Input.is_text_entry());
        assert!(FocusTarget::TextArea.is_text_entry());
        assert!(FocusTarget::Select.is_text_entry());
        assert!(FocusTarget::ContentEditable.is_text_entry());
        assert!(!FocusTarget::Control.is_text_entry());
        assert!(!FocusTarget::Document.is_text_entry());
    }

    #[test]
    fn pointer_event_position() {
        let ev = PointerEvent::new(7, PointerEventKind::Down, 12, -3);
        assert_eq!(ev.position, Point::new(12, -3));
        assert_eq!(ev.pointer_id, 7);
    }
}
