#![forbid(unsafe_code)]

//! Step definitions and the ordered step registry.
//!
//! A [`StepRegistry`] is built once at startup and never mutated. Step ids are
//! the routing keys written into the `step` query parameter, so they must be
//! non-empty and unique; bubble ids must be unique within their step because
//! drag offsets are keyed by `(step_id, bubble_id)`.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stu_core::geometry::Offset;

/// Id of the bubble synthesized for steps that declare none.
pub const OVERVIEW_BUBBLE_ID: &str = "overview";

/// Display grouping for steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chapter {
    Overview,
    Recruiter,
    Student,
    Pilot,
}

impl Chapter {
    pub const ALL: &'static [Chapter] = &[
        Chapter::Overview,
        Chapter::Recruiter,
        Chapter::Student,
        Chapter::Pilot,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Chapter::Overview => "Overview",
            Chapter::Recruiter => "Recruiter view",
            Chapter::Student => "Student view",
            Chapter::Pilot => "Pilot",
        }
    }
}

/// Anchor of an annotation bubble relative to the embedded screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BubblePlacement {
    TopLeft,
    TopRight,
    CenterLeft,
    CenterRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// An annotation callout shown over a step's screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bubble {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<BubblePlacement>,
    /// Pixel offset applied on top of the placement anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
}

impl Bubble {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            placement: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn placed(mut self, placement: BubblePlacement) -> Self {
        self.placement = Some(placement);
        self
    }

    #[must_use]
    pub fn offset(mut self, x: i32, y: i32) -> Self {
        self.offset = Some(Offset::new(x, y));
        self
    }

    pub fn resolved_placement(&self) -> BubblePlacement {
        self.placement.unwrap_or_default()
    }

    pub fn default_offset(&self) -> Offset {
        self.offset.unwrap_or(Offset::ZERO)
    }
}

/// Which mock screen a step embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenKind {
    RecruiterDashboard,
    CandidateProfile,
    StudentDashboard,
    ReadinessReport,
    PracticePlan,
    PilotSummary,
}

/// Descriptor of the screen embedded in a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenContent {
    pub kind: ScreenKind,
    pub heading: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl ScreenContent {
    pub fn new(kind: ScreenKind, heading: impl Into<String>) -> Self {
        Self {
            kind,
            heading: heading.into(),
            highlights: Vec::new(),
        }
    }

    #[must_use]
    pub fn highlight(mut self, line: impl Into<String>) -> Self {
        self.highlights.push(line.into());
        self
    }
}

/// Zero-argument producer of a step's embedded screen.
#[derive(Clone)]
pub struct StepRender(Arc<dyn Fn() -> ScreenContent + Send + Sync>);

impl StepRender {
    pub fn new(render: impl Fn() -> ScreenContent + Send + Sync + 'static) -> Self {
        Self(Arc::new(render))
    }

    pub fn render(&self) -> ScreenContent {
        (self.0)()
    }
}

impl fmt::Debug for StepRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StepRender(..)")
    }
}

/// Persona/stage/objective metadata for analytics consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    pub persona: String,
    pub stage: String,
    pub objective: String,
}

#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub id: String,
    pub chapter: Chapter,
    pub title: String,
    pub bubbles: Vec<Bubble>,
    pub render: StepRender,
    pub event_context: Option<EventContext>,
}

impl StepDefinition {
    pub fn new(
        id: impl Into<String>,
        chapter: Chapter,
        title: impl Into<String>,
        render: impl Fn() -> ScreenContent + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            chapter,
            title: title.into(),
            bubbles: Vec::new(),
            render: StepRender::new(render),
            event_context: None,
        }
    }

    #[must_use]
    pub fn bubble(mut self, bubble: Bubble) -> Self {
        self.bubbles.push(bubble);
        self
    }

    #[must_use]
    pub fn context(
        mut self,
        persona: impl Into<String>,
        stage: impl Into<String>,
        objective: impl Into<String>,
    ) -> Self {
        self.event_context = Some(EventContext {
            persona: persona.into(),
            stage: stage.into(),
            objective: objective.into(),
        });
        self
    }

    /// Bubbles to display; never empty.
    ///
    /// Steps without bubbles get a single overview bubble built from the title.
    pub fn effective_bubbles(&self) -> Vec<Bubble> {
        if self.bubbles.is_empty() {
            vec![Bubble::new(
                OVERVIEW_BUBBLE_ID,
                self.title.clone(),
                format!("{}: {}", self.chapter.label(), self.title),
            )]
        } else {
            self.bubbles.clone()
        }
    }

    pub fn bubble_count(&self) -> usize {
        self.bubbles.len().max(1)
    }
}

/// Errors raised while validating a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A step was declared with an empty id.
    EmptyStepId { position: usize },
    /// Two steps share an id.
    DuplicateStepId(String),
    /// Two bubbles in one step share an id.
    DuplicateBubbleId { step_id: String, bubble_id: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyStepId { position } => {
                write!(f, "step at position {} has an empty id", position + 1)
            }
            Self::DuplicateStepId(id) => write!(f, "duplicate step id: {id}"),
            Self::DuplicateBubbleId { step_id, bubble_id } => {
                write!(f, "duplicate bubble id {bubble_id} in step {step_id}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Ordered, validated list of walkthrough steps.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
}

impl StepRegistry {
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(steps.len());
        for (position, step) in steps.iter().enumerate() {
            if step.id.is_empty() {
                return Err(RegistryError::EmptyStepId { position });
            }
            if !seen.insert(step.id.as_str()) {
                return Err(RegistryError::DuplicateStepId(step.id.clone()));
            }
            let mut bubble_ids = HashSet::with_capacity(step.bubbles.len());
            for bubble in &step.bubbles {
                if !bubble_ids.insert(bubble.id.as_str()) {
                    return Err(RegistryError::DuplicateBubbleId {
                        step_id: step.id.clone(),
                        bubble_id: bubble.id.clone(),
                    });
                }
            }
        }
        Ok(Self { steps })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.iter()
    }
}
