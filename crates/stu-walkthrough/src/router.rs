#![forbid(unsafe_code)]

//! Router collaborator.
//!
//! The walkthrough never touches the browser location directly. The host page
//! implements [`Router`] over its framework router; tests and the demo use
//! [`MemoryRouter`].
//!
//! # Contract
//!
//! - `query` is only meaningful once `is_ready` reports `true`.
//! - `replace` rewrites the current entry without scrolling or adding history.
//!   The call may complete asynchronously on the host side; the walkthrough
//!   does not wait for it.
//! - `push` performs a full navigation (used for the exit call to action).

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use url::form_urlencoded;

/// A single query parameter value as exposed by the host router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// First value; list-valued parameters yield their first element.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value.as_str()),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

/// Query parameters keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `a=1&b=2` string; repeated keys become list values.
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::new();
        for (key, value) in form_urlencoded::parse(raw.trim_start_matches('?').as_bytes()) {
            query.append(key.into_owned(), value.into_owned());
        }
        query
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    /// First value of `key`, if present.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(QueryValue::first)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn append(&mut self, key: String, value: String) {
        let merged = match self.0.remove(&key) {
            None => QueryValue::One(value),
            Some(QueryValue::One(prev)) => QueryValue::Many(vec![prev, value]),
            Some(QueryValue::Many(mut values)) => {
                values.push(value);
                QueryValue::Many(values)
            }
        };
        self.0.insert(key, merged);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// URL-encoded form, without the leading `?`.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.0 {
            match value {
                QueryValue::One(v) => {
                    serializer.append_pair(key, v);
                }
                QueryValue::Many(values) => {
                    for v in values {
                        serializer.append_pair(key, v);
                    }
                }
            }
        }
        serializer.finish()
    }
}

/// A navigation target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Route {
    pub pathname: String,
    pub query: Query,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Route {
    pub fn new(pathname: impl Into<String>, query: Query) -> Self {
        Self {
            pathname: pathname.into(),
            query,
            hash: None,
        }
    }

    /// Parse a site-relative href of the form `path?query#hash`.
    ///
    /// An empty path resolves to `/`.
    pub fn parse(href: &str) -> Self {
        let (rest, hash) = match href.split_once('#') {
            Some((rest, hash)) => (rest, Some(hash.to_string())),
            None => (href, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Query::parse(query)),
            None => (rest, Query::new()),
        };
        let pathname = if path.is_empty() { "/" } else { path };
        Self {
            pathname: pathname.to_string(),
            query,
            hash,
        }
    }

    pub fn href(&self) -> String {
        let mut href = self.pathname.clone();
        if !self.query.is_empty() {
            href.push('?');
            href.push_str(&self.query.encode());
        }
        if let Some(hash) = &self.hash {
            href.push('#');
            href.push_str(hash);
        }
        href
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

/// History behaviour for [`Router::replace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigateOptions {
    /// Update the URL without re-running page data loading.
    pub shallow: bool,
    /// Scroll to the top after navigating.
    pub scroll: bool,
}

impl NavigateOptions {
    /// Query-only rewrite: no data reload, no scroll.
    pub const SHALLOW: NavigateOptions = NavigateOptions {
        shallow: true,
        scroll: false,
    };
}

/// Errors reported by a router implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The router has not finished hydrating its state.
    NotReady,
    /// The host rejected or aborted the navigation.
    Navigation(String),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "router is not ready"),
            Self::Navigation(msg) => write!(f, "navigation failed: {msg}"),
        }
    }
}

impl std::error::Error for RouterError {}

/// Host routing surface consumed by the walkthrough.
pub trait Router {
    fn is_ready(&self) -> bool;

    fn query(&self) -> &Query;

    fn pathname(&self) -> &str;

    /// Rewrite the current history entry.
    fn replace(&mut self, route: Route, options: NavigateOptions) -> Result<(), RouterError>;

    /// Navigate to a new entry.
    fn push(&mut self, route: Route) -> Result<(), RouterError>;
}

/// In-memory router recording every navigation.
///
/// `replace` and `push` apply synchronously, so the query observed after a
/// call reflects the new route.
#[derive(Debug, Clone, Default)]
pub struct MemoryRouter {
    ready: bool,
    pathname: String,
    query: Query,
    hash: Option<String>,
    replaced: Vec<(Route, NavigateOptions)>,
    pushed: Vec<Route>,
    fail_replace: Option<String>,
    fail_push: Option<String>,
}

impl MemoryRouter {
    /// A ready router positioned at `href`.
    pub fn new(href: &str) -> Self {
        let route = Route::parse(href);
        Self {
            ready: true,
            pathname: route.pathname,
            query: route.query,
            hash: route.hash,
            ..Self::default()
        }
    }

    /// A router at `href` that has not hydrated yet.
    pub fn pending(href: &str) -> Self {
        Self {
            ready: false,
            ..Self::new(href)
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Simulate an external navigation (back button, edited URL).
    pub fn set_query(&mut self, query: Query) {
        self.query = query;
    }

    /// Make every later `replace` fail with `msg`.
    pub fn fail_replace(&mut self, msg: impl Into<String>) {
        self.fail_replace = Some(msg.into());
    }

    /// Make every later `push` fail with `msg`.
    pub fn fail_push(&mut self, msg: impl Into<String>) {
        self.fail_push = Some(msg.into());
    }

    pub fn replaced(&self) -> &[(Route, NavigateOptions)] {
        &self.replaced
    }

    pub fn pushed(&self) -> &[Route] {
        &self.pushed
    }

    pub fn current(&self) -> Route {
        Route {
            pathname: self.pathname.clone(),
            query: self.query.clone(),
            hash: self.hash.clone(),
        }
    }

    fn apply(&mut self, route: Route) {
        self.pathname = route.pathname;
        self.query = route.query;
        self.hash = route.hash;
    }
}

impl Router for MemoryRouter {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn pathname(&self) -> &str {
        &self.pathname
    }

    fn replace(&mut self, route: Route, options: NavigateOptions) -> Result<(), RouterError> {
        if let Some(msg) = &self.fail_replace {
            return Err(RouterError::Navigation(msg.clone()));
        }
        self.replaced.push((route.clone(), options));
        self.apply(route);
        Ok(())
    }

    fn push(&mut self, route: Route) -> Result<(), RouterError> {
        if let Some(msg) = &self.fail_push {
            return Err(RouterError::Navigation(msg.clone()));
        }
        self.pushed.push(route.clone());
        self.apply(route);
        Ok(())
    }
}
