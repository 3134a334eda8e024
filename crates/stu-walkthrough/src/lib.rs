#![forbid(unsafe_code)]

//! Headless controller for the Stu product walkthrough.
//!
//! The walkthrough is an ordered list of steps, each embedding a mock product
//! screen with annotation bubbles layered on top. This crate owns the state
//! that keeps it coherent:
//!
//! - [`route_sync`]: the `step` query parameter and the active step agree.
//! - [`transition`]: Back/Next and arrow keys move between steps, clamped.
//! - [`annotation`]: bubbles are stepped through and dragged independently.
//! - [`analytics`]: named events fire at fixed points, some at most once.
//!
//! The host page supplies a [`router::Router`] and an
//! [`analytics::Analytics`] sink and forwards input into
//! [`walkthrough::Walkthrough`].

pub mod analytics;
pub mod annotation;
pub mod catalog;
pub mod config;
pub mod route_sync;
pub mod router;
pub mod step;
pub mod transition;
pub mod view;
pub mod walkthrough;

pub use analytics::{Analytics, EventName, Properties, RecordingAnalytics};
pub use config::WalkthroughConfig;
pub use router::{MemoryRouter, Router};
pub use step::{Bubble, BubblePlacement, Chapter, StepDefinition, StepRegistry};
pub use view::WalkthroughView;
pub use walkthrough::Walkthrough;
