//! Per-request context handed to resource handlers.
//!
//! A [`Context`] owns the [`ParsedRequest`], the [`PathParams`] captured by the
//! winning route, and a type-keyed [`Extensions`] map carrying application state.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use crate::http::{ParsedRequest, QueryTable};

/// Type-erased request extensions map, used to inject per-request state
/// into handlers without requiring handlers to know about each other's types.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
    }

    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

/// Path parameters captured by the matched route template.
///
/// Values are the literal substrings the placeholders matched; no type
/// coercion is applied.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.map.remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Everything a handler needs to answer one request.
#[derive(Debug)]
pub struct Context {
    request: ParsedRequest,
    params: PathParams,
    extensions: Extensions,
}

impl Context {
    /// Create a context with no path parameters.
    pub fn new(request: ParsedRequest) -> Self {
        Self::with_params(request, PathParams::new())
    }

    /// Create a context carrying the parameters of the matched route.
    pub fn with_params(request: ParsedRequest, params: PathParams) -> Self {
        Self {
            request,
            params,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &ParsedRequest {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Shorthand for `self.params().get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// The merged query-string and form-body arguments.
    pub fn query(&self) -> &QueryTable {
        self.request.query()
    }

    /// Header lookup by canonical key; see [`crate::http::Headers`].
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name)
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Application-wide state registered with
    /// [`Application::state`](crate::app::Application::state).
    pub fn state<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.extensions.get::<Arc<T>>().map(Arc::as_ref)
    }

    /// Deserialize the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{RawRequest, RequestParser};

    fn context(raw: RawRequest) -> Context {
        Context::new(RequestParser::default().parse(raw))
    }

    #[test]
    fn extensions_are_keyed_by_type() {
        let mut ext = Extensions::new();
        ext.insert(7u32);
        ext.insert(String::from("seven"));
        assert_eq!(ext.get::<u32>(), Some(&7));
        assert_eq!(ext.get::<String>().map(String::as_str), Some("seven"));
        assert_eq!(ext.get::<i64>(), None);

        ext.insert(8u32);
        assert_eq!(ext.len(), 2);
        *ext.get_mut::<u32>().unwrap() += 1;
        assert_eq!(ext.remove::<u32>(), Some(9));
        assert_eq!(ext.get::<u32>(), None);
    }

    #[test]
    fn path_params_basic_ops() {
        let mut params = PathParams::new();
        assert!(params.is_empty());
        params.insert("id".into(), "42".into());
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("id", "42")]);
        assert_eq!(params.remove("id").as_deref(), Some("42"));
        assert!(params.get("id").is_none());
    }

    #[test]
    fn accessors_delegate_to_request() {
        let raw = RawRequest::new("get", "/items?q=x")
            .header("X-Token", "abc")
            .header("Host", "localhost");
        let mut params = PathParams::new();
        params.insert("item".into(), "7".into());
        let ctx = Context::with_params(RequestParser::default().parse(raw), params);

        assert_eq!(ctx.param("item"), Some("7"));
        assert_eq!(ctx.query().argument("q").unwrap(), "x");
        assert_eq!(ctx.header("x_token"), Some("abc"));
        assert_eq!(ctx.request().path(), "/items");
    }

    #[test]
    fn state_is_read_through_arc() {
        let mut ctx = context(RawRequest::new("GET", "/"));
        ctx.extensions_mut().insert(Arc::new(String::from("repo")));
        assert_eq!(ctx.state::<String>().map(String::as_str), Some("repo"));
        assert!(ctx.state::<u8>().is_none());
    }

    #[test]
    fn json_body() {
        #[derive(serde::Deserialize)]
        struct Payload {
            a: String,
        }
        let ctx = context(
            RawRequest::new("POST", "/")
                .header("Content-Type", "application/json")
                .body(&br#"{"a":"b"}"#[..]),
        );
        let payload: Payload = ctx.json().unwrap();
        assert_eq!(payload.a, "b");
    }
}
