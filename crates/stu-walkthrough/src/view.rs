#![forbid(unsafe_code)]

//! Render-facing snapshot of the walkthrough.

use serde::Serialize;
use stu_core::geometry::Offset;

use crate::annotation::{NoteAdvance, PlacementLayout};
use crate::step::{BubblePlacement, Chapter, EventContext, ScreenContent};

pub const EMPTY_MESSAGE: &str = "No walkthrough steps are available yet.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WalkthroughView {
    Empty { message: String },
    Active(Box<StepView>),
}

impl WalkthroughView {
    pub fn step(&self) -> Option<&StepView> {
        match self {
            Self::Empty { .. } => None,
            Self::Active(step) => Some(step),
        }
    }
}

/// Notices shown above the embedded screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepNotice {
    /// The URL named a step that does not exist; the first step is shown.
    StepNotFound { requested: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub step_id: String,
    pub title: String,
    pub chapter: Chapter,
    pub chapter_label: &'static str,
    /// 1-based.
    pub position: usize,
    pub total: usize,
    pub screen: ScreenContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_context: Option<EventContext>,
    pub bubble: BubbleView,
    pub can_go_back: bool,
    pub can_go_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<StepNotice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubbleView {
    pub bubble_id: String,
    pub title: String,
    pub text: String,
    /// 0-based index within the step.
    pub index: usize,
    pub count: usize,
    pub placement: BubblePlacement,
    pub layout: PlacementLayout,
    pub offset: Offset,
    pub transform: String,
    pub dragging: bool,
    pub can_reset: bool,
    pub can_go_previous: bool,
    pub previous_label: &'static str,
    pub primary: NoteAdvance,
    pub primary_label: String,
    /// The primary control is the exit call to action.
    pub exit_visible: bool,
}
