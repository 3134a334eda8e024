#![forbid(unsafe_code)]

//! Walkthrough configuration.
//!
//! Defaults match the production page. [`WalkthroughConfig::from_env`] reads
//! `STU_WALKTHROUGH_*` overrides; unparseable values fail open to the default
//! with a warning.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `STU_WALKTHROUGH_STEP_PARAM` | `step_param` |
//! | `STU_WALKTHROUGH_SOURCE_PARAM` | `source_param` |
//! | `STU_WALKTHROUGH_DEFAULT_SOURCE` | `default_source` |
//! | `STU_WALKTHROUGH_EXIT_ROUTE` | `exit_route` |
//! | `STU_WALKTHROUGH_EXIT_LABEL` | `exit_label` |
//! | `STU_WALKTHROUGH_KEYBOARD` | `keyboard` (`1/true/on`, `0/false/off`) |

use std::env;

use crate::router::Route;

pub const DEFAULT_STEP_PARAM: &str = "step";
pub const DEFAULT_SOURCE_PARAM: &str = "source";
pub const DEFAULT_SOURCE: &str = "direct";
pub const DEFAULT_EXIT_ROUTE: &str = "/#pilot";
pub const DEFAULT_EXIT_LABEL: &str = "Request a pilot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkthroughConfig {
    /// Query parameter holding the current step id.
    pub step_param: String,
    /// Query parameter read once for attribution.
    pub source_param: String,
    /// Attribution used when `source_param` is absent.
    pub default_source: String,
    /// Where the exit call to action navigates.
    pub exit_route: String,
    /// Label of the exit control on the final note.
    pub exit_label: String,
    /// Install the ArrowLeft/ArrowRight listener.
    pub keyboard: bool,
}

impl Default for WalkthroughConfig {
    fn default() -> Self {
        Self {
            step_param: DEFAULT_STEP_PARAM.into(),
            source_param: DEFAULT_SOURCE_PARAM.into(),
            default_source: DEFAULT_SOURCE.into(),
            exit_route: DEFAULT_EXIT_ROUTE.into(),
            exit_label: DEFAULT_EXIT_LABEL.into(),
            keyboard: true,
        }
    }
}

impl WalkthroughConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let text = |key: &str, slot: &mut String| {
            if let Some(value) = lookup(key) {
                let value = value.trim();
                if value.is_empty() {
                    tracing::warn!(target: "stu.walkthrough.config", key, "ignoring empty value");
                } else {
                    *slot = value.to_string();
                }
            }
        };
        text("STU_WALKTHROUGH_STEP_PARAM", &mut config.step_param);
        text("STU_WALKTHROUGH_SOURCE_PARAM", &mut config.source_param);
        text("STU_WALKTHROUGH_DEFAULT_SOURCE", &mut config.default_source);
        text("STU_WALKTHROUGH_EXIT_ROUTE", &mut config.exit_route);
        text("STU_WALKTHROUGH_EXIT_LABEL", &mut config.exit_label);

        if let Some(value) = lookup("STU_WALKTHROUGH_KEYBOARD") {
            match parse_bool(&value) {
                Some(flag) => config.keyboard = flag,
                None => tracing::warn!(
                    target: "stu.walkthrough.config",
                    value = %value,
                    "STU_WALKTHROUGH_KEYBOARD is not a boolean; keeping default"
                ),
            }
        }
        config
    }

    pub fn exit_route(&self) -> Route {
        Route::parse(&self.exit_route)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
