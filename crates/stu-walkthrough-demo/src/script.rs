#![forbid(unsafe_code)]

//! Scripted input for the headless host.
//!
//! A script is a list of actions separated by whitespace or `;`:
//!
//! ```text
//! next-note next-note key:right drag:40,-12 reset exit
//! ```
//!
//! | Action | Effect |
//! |--------|--------|
//! | `next` / `back` | Step buttons |
//! | `goto:N` | Jump to step N (1-indexed) |
//! | `next-note` / `prev-note` | Bubble controls |
//! | `key:left` / `key:ArrowRight` | Arrow key, document focus |
//! | `key:right@input` | Arrow key while an element (tag name) has focus |
//! | `drag:DX,DY` | Drag the active bubble by a delta |
//! | `reset` | Reset the bubble position |
//! | `exit` | Exit call to action |
//! | `sync` | Re-run route reconciliation |

use std::fmt;

use stu_core::event::{FocusTarget, KeyCode, KeyEvent, PointerEvent, PointerEventKind};
use stu_walkthrough::analytics::Analytics;
use stu_walkthrough::router::Router;
use stu_walkthrough::walkthrough::Walkthrough;

const DRAG_POINTER_ID: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Next,
    Back,
    GoTo(usize),
    NextNote,
    PrevNote,
    Key(KeyCode, FocusTarget),
    Drag(i32, i32),
    Reset,
    Exit,
    Sync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    UnknownAction(String),
    InvalidKey(String),
    InvalidFocus(String),
    InvalidDrag(String),
    InvalidStep(String),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAction(a) => write!(f, "unknown action: {a}"),
            Self::InvalidKey(k) => write!(f, "invalid key (expected left or right): {k}"),
            Self::InvalidFocus(t) => write!(f, "invalid focus target: {t}"),
            Self::InvalidDrag(d) => write!(f, "invalid drag delta (expected DX,DY): {d}"),
            Self::InvalidStep(s) => write!(f, "invalid step number (expected N >= 1): {s}"),
        }
    }
}

impl std::error::Error for ScriptError {}

pub fn parse(script: &str) -> Result<Vec<Action>, ScriptError> {
    script
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|token| !token.is_empty())
        .map(parse_action)
        .collect()
}

fn parse_action(token: &str) -> Result<Action, ScriptError> {
    match token {
        "next" => return Ok(Action::Next),
        "back" => return Ok(Action::Back),
        "next-note" => return Ok(Action::NextNote),
        "prev-note" => return Ok(Action::PrevNote),
        "reset" => return Ok(Action::Reset),
        "exit" => return Ok(Action::Exit),
        "sync" => return Ok(Action::Sync),
        _ => {}
    }
    if let Some(rest) = token.strip_prefix("key:") {
        let (key, focus) = rest.split_once('@').unwrap_or((rest, "body"));
        let dom_key = match key {
            "left" => "ArrowLeft",
            "right" => "ArrowRight",
            other => other,
        };
        let code = KeyCode::from_dom_key(dom_key);
        if !matches!(code, KeyCode::Left | KeyCode::Right) {
            return Err(ScriptError::InvalidKey(key.to_string()));
        }
        return Ok(Action::Key(code, parse_focus(focus)?));
    }
    if let Some(rest) = token.strip_prefix("drag:") {
        let invalid = || ScriptError::InvalidDrag(rest.to_string());
        let (dx, dy) = rest.split_once(',').ok_or_else(invalid)?;
        let dx = dx.trim().parse().map_err(|_| invalid())?;
        let dy = dy.trim().parse().map_err(|_| invalid())?;
        return Ok(Action::Drag(dx, dy));
    }
    if let Some(rest) = token.strip_prefix("goto:") {
        return match rest.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Action::GoTo(n - 1)),
            _ => Err(ScriptError::InvalidStep(rest.to_string())),
        };
    }
    Err(ScriptError::UnknownAction(token.to_string()))
}

/// `document`, `contenteditable`, or an element tag name.
fn parse_focus(name: &str) -> Result<FocusTarget, ScriptError> {
    match name {
        "document" | "body" => Ok(FocusTarget::Document),
        "contenteditable" => Ok(FocusTarget::from_element("div", true)),
        tag => match FocusTarget::from_element(tag, false) {
            FocusTarget::Document => Err(ScriptError::InvalidFocus(tag.to_string())),
            focus => Ok(focus),
        },
    }
}

/// Apply `actions` in order.
pub fn run<R: Router, A: Analytics>(walkthrough: &mut Walkthrough<R, A>, actions: &[Action]) {
    for (i, action) in actions.iter().enumerate() {
        let changed = apply(walkthrough, action);
        tracing::debug!(
            target: "stu.demo.script",
            index = i,
            action = ?action,
            changed,
            step = walkthrough.active_step().map(|s| s.id.as_str()).unwrap_or(""),
            "applied"
        );
    }
}

fn apply<R: Router, A: Analytics>(walkthrough: &mut Walkthrough<R, A>, action: &Action) -> bool {
    match action {
        Action::Next => walkthrough.next(),
        Action::Back => walkthrough.back(),
        Action::GoTo(index) => walkthrough.go_to(*index),
        Action::NextNote => walkthrough.next_note().is_some(),
        Action::PrevNote => walkthrough.prev_note(),
        Action::Key(code, focus) => walkthrough.handle_key(&KeyEvent::new(*code), *focus),
        Action::Drag(dx, dy) => {
            let down = PointerEvent::new(DRAG_POINTER_ID, PointerEventKind::Down, 0, 0);
            let moved = PointerEvent::new(DRAG_POINTER_ID, PointerEventKind::Move, *dx, *dy);
            let up = PointerEvent::new(DRAG_POINTER_ID, PointerEventKind::Up, *dx, *dy);
            walkthrough.handle_pointer(&down)
                && walkthrough.handle_pointer(&moved)
                && walkthrough.handle_pointer(&up)
        }
        Action::Reset => walkthrough.reset_position(),
        Action::Exit => walkthrough.exit(),
        Action::Sync => walkthrough.sync_route(),
    }
}
