//! Route table: compile path templates and match request paths against them.
//!
//! Routes are declared as templates with named placeholders and registered together
//! with an opaque handler identifier:
//!
//! | Template                              | Example match    | Captured params                     |
//! |---------------------------------------|------------------|-------------------------------------|
//! | `/`                                   | `/`              | *(none)*                            |
//! | `/users/{id}`                         | `/users/42`      | `id → "42"`                         |
//! | `/api/{method}/{continuation:\d+}/`   | `/api/echo/7/`   | `method → "echo"`, `continuation → "7"` |
//!
//! Registration and matching are separate phases. A [`RouteTable`] only collects
//! `(template, handler)` pairs; [`RouteTable::compile`] turns them into an immutable
//! [`Router`] that can be shared across tasks and queried without locking.
//!
//! Matchers are anchored at both ends: a route matches the *entire* path, never a
//! prefix. Paths are not normalized, so `/users` and `/users/` are different paths.
//!
//! Routes are tried in registration order and the first match wins, even when a later
//! route would be "more specific". Register overlapping templates most-specific-first.

mod template;

pub use template::{DEFAULT_CONSTRAINT, RouteTemplate, TemplateError, Token};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::context::PathParams;

/// No compiled route matched the request path.
///
/// Callers map this to a `404 Not Found` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route matches `{path}`")]
pub struct RouteNotFound {
    pub path: String,
}

/// A template paired with its compiled, anchored matcher and handler identifier.
#[derive(Debug, Clone)]
pub struct CompiledRoute<H> {
    template: RouteTemplate,
    matcher: Regex,
    handler: H,
}

impl<H> CompiledRoute<H> {
    /// Scan and compile `template`.
    ///
    /// # Errors
    ///
    /// Any [`TemplateError`], including [`TemplateError::Pattern`] when a
    /// placeholder constraint is not a valid regex.
    pub fn new(template: &str, handler: H) -> Result<Self, TemplateError> {
        let template = RouteTemplate::parse(template)?;
        let pattern = template.to_pattern();
        let matcher = Regex::new(&pattern).map_err(|source| TemplateError::Pattern {
            template: template.as_str().to_owned(),
            source,
        })?;

        debug!(template = %template, pattern = %pattern, "route compiled");

        Ok(Self {
            template,
            matcher,
            handler,
        })
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    // Returns the captured placeholder values when the whole path matches.
    fn captures(&self, path: &str) -> Option<PathParams> {
        let caps = self.matcher.captures(path)?;
        let mut params = PathParams::new();
        for name in self.template.placeholder_names() {
            if let Some(value) = caps.name(name) {
                params.insert(name.to_owned(), value.as_str().to_owned());
            }
        }
        Some(params)
    }
}

/// The outcome of a successful [`Router::lookup`].
#[derive(Debug)]
pub struct RouteMatch<'r, H> {
    /// Handler identifier of the winning route.
    pub handler: &'r H,
    /// Placeholder name → matched substring. Values are never coerced.
    pub params: PathParams,
    /// The winning route's template.
    pub template: &'r RouteTemplate,
}

/// Ordered, append-only list of route registrations.
///
/// Nothing is validated at registration time; malformed templates surface from
/// [`compile`](Self::compile).
///
/// # Examples
///
/// ```
/// use pathwise::router::RouteTable;
///
/// let mut table = RouteTable::new();
/// table.register("/", "frontpage");
/// table.register("/api/{method}/{continuation:\\d+}/", "api");
///
/// let router = table.compile().unwrap();
/// let found = router.lookup("/api/echo/42/").unwrap();
/// assert_eq!(*found.handler, "api");
/// assert_eq!(found.params.get("method"), Some("echo"));
/// assert_eq!(found.params.get("continuation"), Some("42"));
///
/// assert!(router.lookup("/api/echo/abc/").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    registrations: Vec<(String, H)>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouteTable<H> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Append a route. Earlier registrations take precedence over later ones.
    pub fn register(&mut self, template: impl Into<String>, handler: H) -> &mut Self {
        self.registrations.push((template.into(), handler));
        self
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Compile every registration, in order, into an immutable [`Router`].
    ///
    /// Compilation is pure: calling it again on the same table yields a router
    /// that answers every lookup identically.
    ///
    /// # Errors
    ///
    /// The first [`TemplateError`] encountered. Treat it as a startup
    /// configuration error.
    pub fn compile(&self) -> Result<Router<H>, TemplateError>
    where
        H: Clone,
    {
        let routes = self
            .registrations
            .iter()
            .map(|(template, handler)| CompiledRoute::new(template, handler.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(routes = routes.len(), "route table compiled");
        Ok(Router { routes })
    }
}

/// A compiled, read-only route table.
///
/// `lookup` never mutates, so a `Router` can be shared behind an `Arc` by any
/// number of concurrent requests.
#[derive(Debug, Clone)]
pub struct Router<H> {
    routes: Vec<CompiledRoute<H>>,
}

impl<H> Router<H> {
    /// Find the first route, in registration order, whose matcher accepts the
    /// entire `path`.
    ///
    /// # Errors
    ///
    /// [`RouteNotFound`] when no route matches.
    pub fn lookup(&self, path: &str) -> Result<RouteMatch<'_, H>, RouteNotFound> {
        self.routes
            .iter()
            .find_map(|route| {
                route.captures(path).map(|params| RouteMatch {
                    handler: &route.handler,
                    params,
                    template: &route.template,
                })
            })
            .ok_or_else(|| RouteNotFound {
                path: path.to_owned(),
            })
    }

    /// Compiled routes in match order.
    pub fn routes(&self) -> impl Iterator<Item = &CompiledRoute<H>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
