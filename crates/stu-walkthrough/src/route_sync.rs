#![forbid(unsafe_code)]

//! Reconciles the active step between the URL and local state.
//!
//! The URL wins once the router is ready. Before that, the locally held index
//! is used. A ready router whose `step` value is missing or unknown resolves
//! to the first step and requests a rewrite so the address bar always names a
//! valid step.
//!
//! Reconciliation runs on dependency change only: [`RouteWatch`] remembers the
//! last `(ready, step)` pair it saw and reports whether a new observation
//! differs.

use crate::router::{NavigateOptions, Query, Route, Router, RouterError};
use crate::step::StepRegistry;

/// How the requested step id was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepLookup {
    /// Router not ready; local state was used.
    Pending,
    /// The URL named a known step.
    Found,
    /// No `step` value in the URL.
    Missing,
    /// The URL named a step that does not exist.
    NotFound(String),
}

/// Result of resolving the active step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResolution {
    pub index: usize,
    pub step_id: String,
    pub lookup: StepLookup,
    /// The URL must be rewritten to `step_id`.
    pub rewrite: bool,
}

/// Resolve the active step index.
///
/// Returns `None` for an empty registry.
pub fn resolve(
    ready: bool,
    query: &Query,
    step_param: &str,
    registry: &StepRegistry,
    local_index: usize,
) -> Option<StepResolution> {
    let last = registry.last_index()?;

    if !ready {
        let index = local_index.min(last);
        let step = registry.get(index)?;
        return Some(StepResolution {
            index,
            step_id: step.id.clone(),
            lookup: StepLookup::Pending,
            rewrite: false,
        });
    }

    let requested = query.first(step_param);
    let (index, lookup) = match requested {
        Some(id) => match registry.position(id) {
            Some(index) => (index, StepLookup::Found),
            None => (0, StepLookup::NotFound(id.to_string())),
        },
        None => (0, StepLookup::Missing),
    };
    let step = registry.get(index)?;
    let rewrite = requested != Some(step.id.as_str());

    Some(StepResolution {
        index,
        step_id: step.id.clone(),
        lookup,
        rewrite,
    })
}

/// Route for the current page with `step_param` set to `step_id`.
///
/// Other query parameters are preserved.
pub fn step_route<R: Router + ?Sized>(router: &R, step_param: &str, step_id: &str) -> Route {
    let query = router.query().clone().with(step_param, step_id);
    Route::new(router.pathname(), query)
}

/// Issue the shallow rewrite that points the URL at `step_id`.
pub fn write_step<R: Router + ?Sized>(
    router: &mut R,
    step_param: &str,
    step_id: &str,
) -> Result<(), RouterError> {
    let route = step_route(router, step_param, step_id);
    tracing::debug!(
        target: "stu.walkthrough.route",
        href = %route,
        "rewriting step query"
    );
    router.replace(route, NavigateOptions::SHALLOW)
}

/// Last observed router dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteWatch {
    seen: Option<(bool, Option<String>)>,
}

impl RouteWatch {
    /// Record an observation; `true` when it differs from the previous one.
    pub fn observe(&mut self, ready: bool, step: Option<&str>) -> bool {
        let next = (ready, step.map(str::to_string));
        if self.seen.as_ref() == Some(&next) {
            return false;
        }
        self.seen = Some(next);
        true
    }

    /// Forget the last observation so the next one always reconciles.
    pub fn invalidate(&mut self) {
        self.seen = None;
    }
}
