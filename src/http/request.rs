//! Request parsing: transport input in, normalized [`ParsedRequest`] out.
//!
//! Parsing is a single linear pass and never fails. The one fallible step,
//! merging a form body into the query table, degrades silently: when the body
//! cannot be used the request carries only the URL's query arguments and the
//! reason is kept in [`ParsedRequest::form_error`]. Callers that care can log
//! or reject; the parser itself only emits a `debug!` line.

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::headers::{self, Headers};
use super::query::QueryTable;
use super::uri::{self, Authority, PathSegment};
use super::Method;

/// Content types whose bodies are merged into the query table.
///
/// Both are parsed as `key=value&key=value`; multipart boundaries are not
/// interpreted.
pub const FORM_CONTENT_TYPES: [&str; 2] =
    ["application/x-www-form-urlencoded", "multipart/form-data"];

/// Errors decoding an HTTP/1.1 request head from raw bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("request is incomplete, more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Why a POST/PUT body was not merged into the query table.
///
/// Never returned as an error; see [`ParsedRequest::form_error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormBodyError {
    #[error("no Content-Type header")]
    MissingContentType,

    #[error("content type `{0}` is not a form encoding")]
    UnsupportedContentType(String),

    #[error("no Content-Length header")]
    MissingContentLength,

    #[error("malformed Content-Length `{0}`")]
    InvalidContentLength(String),

    #[error("declared length {declared} exceeds the form body limit of {max} bytes")]
    TooLarge { declared: usize, max: usize },

    #[error("body has {actual} bytes but Content-Length declares {declared}")]
    LengthMismatch { declared: usize, actual: usize },
}

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Scheme assumed when neither the target nor the transport names one.
    pub default_scheme: String,
    /// Largest form body, in bytes, that is merged into the query table.
    pub max_form_bytes: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_scheme: "http".to_owned(),
            max_form_bytes: 8 * 1024 * 1024,
        }
    }
}

/// A request as handed over by the transport layer, before normalization.
///
/// # Examples
///
/// ```
/// use pathwise::http::RawRequest;
///
/// let raw = RawRequest::new("post", "/login?next=/home")
///     .header("Content-Type", "application/x-www-form-urlencoded")
///     .header("Content-Length", "8")
///     .body("user=ada");
/// assert_eq!(raw.method, "post");
/// assert_eq!(raw.content_length(), Some(8));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    /// Method token as received.
    pub method: String,
    /// Request-target: origin-form path or absolute URL, with query and fragment.
    pub target: String,
    /// Header lines in arrival order, names as received.
    pub headers: Vec<(String, String)>,
    /// Scheme of the transport the request arrived on, if known.
    pub scheme: Option<String>,
    pub body: Bytes,
}

impl RawRequest {
    /// Maximum number of headers accepted by [`decode`](Self::decode).
    const MAX_HEADERS: usize = 64;

    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            ..Self::default()
        }
    }

    /// Appends a header line.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the scheme hint.
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The last `Content-Length` header parsed as a number, if present and valid.
    pub fn content_length(&self) -> Option<usize> {
        let key = headers::canonical_name("content-length");
        self.headers
            .iter()
            .rev()
            .find(|(name, _)| headers::canonical_name(name) == key)
            .and_then(|(_, value)| value.trim().parse().ok())
    }

    /// Decode an HTTP/1.1 request head from `buf`.
    ///
    /// Returns the request (with an empty body) and the byte offset at which
    /// the body begins, immediately after the `\r\n\r\n` terminator. Header
    /// values that are not valid UTF-8 are dropped.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Incomplete`]: more data is needed to complete the head.
    /// - [`DecodeError::Parse`]: the data is malformed.
    /// - [`DecodeError::MissingField`]: the method or path is absent.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), DecodeError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(DecodeError::Incomplete),
        };

        let method = raw_req
            .method
            .ok_or(DecodeError::MissingField { field: "method" })?;
        let target = raw_req
            .path
            .ok_or(DecodeError::MissingField { field: "path" })?;

        let headers = raw_req
            .headers
            .iter()
            .filter_map(|header| {
                std::str::from_utf8(header.value)
                    .ok()
                    .map(|value| (header.name.to_owned(), value.to_owned()))
            })
            .collect();

        Ok((
            Self {
                method: method.to_owned(),
                target: target.to_owned(),
                headers,
                scheme: None,
                body: Bytes::new(),
            },
            body_offset,
        ))
    }
}

/// A normalized request, created fresh for each inbound request.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    method: Method,
    target: String,
    scheme: String,
    hostname: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    path: String,
    segments: Vec<PathSegment>,
    fragment: Option<String>,
    headers: Headers,
    query: QueryTable,
    body: Bytes,
    form_error: Option<FormBodyError>,
}

impl ParsedRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request-target exactly as received.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Lowercased scheme: from the target if absolute, else the transport hint,
    /// else the parser default.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn is_secure(&self) -> bool {
        uri::is_secure_scheme(&self.scheme)
    }

    /// Hostname from the target's authority, or from the `Host` header for
    /// origin-form targets. Empty when neither is present.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The explicit port, or 443/80 depending on the scheme.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// The normalized, percent-decoded path with matrix parameters removed.
    /// This is the path used for routing.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Every path segment, including the empty leading one, with its matrix
    /// parameters.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Matrix parameters of the last segment named `name` that carries any.
    pub fn segment_params(&self, name: &str) -> Option<&[String]> {
        self.segments
            .iter()
            .rev()
            .find(|segment| segment.name == name && !segment.params.is_empty())
            .map(|segment| segment.params.as_slice())
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Header lookup by canonical key.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Query-string arguments, plus form-body arguments for form posts.
    pub fn query(&self) -> &QueryTable {
        &self.query
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Why a POST/PUT body was not merged into [`query`](Self::query), if it
    /// was not.
    pub fn form_error(&self) -> Option<&FormBodyError> {
        self.form_error.as_ref()
    }
}

/// Turns [`RawRequest`]s into [`ParsedRequest`]s.
///
/// # Examples
///
/// ```
/// use pathwise::http::{Method, RawRequest, RequestParser};
///
/// let parser = RequestParser::default();
/// let request = parser.parse(
///     RawRequest::new("get", "/widgets;color=red;size=9/list?page=2&page=3#top")
///         .header("Host", "shop.example:8080")
///         .header("X-Forwarded-For", "10.0.0.1"),
/// );
///
/// assert_eq!(request.method(), &Method::Get);
/// assert_eq!(request.path(), "/widgets/list");
/// assert_eq!(request.segment_params("widgets").unwrap(), ["color=red", "size=9"]);
/// assert_eq!(request.hostname(), "shop.example");
/// assert_eq!(request.port(), 8080);
/// assert_eq!(request.fragment(), Some("top"));
/// assert_eq!(request.query().argument("page").unwrap(), "3");
/// assert_eq!(request.header("X FORWARDED FOR"), Some("10.0.0.1"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestParser {
    config: ParserConfig,
}

impl RequestParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Normalize `raw`. Never fails; see the module docs for how form bodies
    /// degrade.
    pub fn parse(&self, raw: RawRequest) -> ParsedRequest {
        let RawRequest {
            method,
            target,
            headers: header_lines,
            scheme: scheme_hint,
            body,
        } = raw;

        let method = Method::from_token(&method);
        let headers: Headers = header_lines.into_iter().collect();

        let parts = uri::split(&target);
        let scheme = parts
            .scheme
            .or(scheme_hint.as_deref())
            .unwrap_or(&self.config.default_scheme)
            .to_ascii_lowercase();

        let authority = parts
            .authority
            .or_else(|| headers.get("host"))
            .map(Authority::parse)
            .unwrap_or_default();
        let port = authority.port.unwrap_or_else(|| uri::default_port(&scheme));

        let segments = uri::parse_segments(parts.path);
        let path = uri::join_segments(&segments);

        let mut query = QueryTable::parse(parts.query.unwrap_or(""));
        let fragment = parts.fragment.map(str::to_owned);

        let form_error = if method.accepts_form_body() {
            merge_form_body(&headers, &body, &mut query, self.config.max_form_bytes).err()
        } else {
            None
        };
        if let Some(error) = &form_error {
            debug!(method = %method, target = %target, error = %error, "form body ignored");
        }

        ParsedRequest {
            method,
            scheme,
            hostname: authority.hostname,
            port,
            username: authority.username,
            password: authority.password,
            path,
            segments,
            fragment,
            headers,
            query,
            body,
            form_error,
            target,
        }
    }
}

// Appends the form body's arguments to `query` when the request declares a
// form content type and a length that matches the body exactly.
fn merge_form_body(
    headers: &Headers,
    body: &[u8],
    query: &mut QueryTable,
    max_form_bytes: usize,
) -> Result<(), FormBodyError> {
    let content_type = headers
        .get("content-type")
        .ok_or(FormBodyError::MissingContentType)?;
    let media_type = content_type.split(';').next().unwrap_or("").trim();
    if !FORM_CONTENT_TYPES
        .iter()
        .any(|form| media_type.eq_ignore_ascii_case(form))
    {
        return Err(FormBodyError::UnsupportedContentType(media_type.to_owned()));
    }

    let declared = headers
        .get("content-length")
        .ok_or(FormBodyError::MissingContentLength)?;
    let declared: usize = declared
        .trim()
        .parse()
        .map_err(|_| FormBodyError::InvalidContentLength(declared.to_owned()))?;

    if declared > max_form_bytes {
        return Err(FormBodyError::TooLarge {
            declared,
            max: max_form_bytes,
        });
    }
    if body.len() != declared {
        return Err(FormBodyError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }

    query.extend_encoded(body);
    Ok(())
}
