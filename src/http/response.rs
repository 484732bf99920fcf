//! HTTP/1.1 response builder.
//!
//! Provides a fluent builder API for constructing responses and serializing
//! them to a byte buffer. Every serialized response carries `Content-Length`
//! and `Connection: close`; connections are never reused.

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use super::StatusCode;

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use pathwise::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// assert!(text.contains("Connection: close\r\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    // Names are written as given; responses are not looked up by canonical key.
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// A `200 OK` response whose body is `value` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures from `serde_json`.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(StatusCode::Ok)
            .header("Content-Type", "application/json")
            .body_bytes(body))
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends a header in-place.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// First value of the header `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the response into a `BytesMut` buffer using HTTP/1.1 wire format.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if the body is non-empty and no
    ///   `Content-Type` header was set.
    /// - `Connection: close`.
    /// - `Content-Length: <n>` (always written, last).
    ///
    /// Any `Connection` or `Content-Length` set by the handler is dropped in
    /// favour of the computed values.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        self.headers.retain(|(name, _)| {
            !name.eq_ignore_ascii_case("content-length") && !name.eq_ignore_ascii_case("connection")
        });
        if !self.body.is_empty() && self.header_value("content-type").is_none() {
            self.add_header("Content-Type", "text/plain; charset=utf-8");
        }
        self.add_header("Connection", "close");

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        for (name, value) in &self.headers {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(&b"\r\n"[..]);

        if !self.body.is_empty() {
            buf.put(self.body.as_slice());
        }

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let s = to_string(Response::new(StatusCode::Ok).body("Hello").into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let r = Response::new(StatusCode::Ok)
            .header("content-type", "text/html")
            .body("<p>");
        let s = to_string(r.into_bytes());
        assert!(s.contains("content-type: text/html\r\n"));
        assert!(!s.contains("text/plain"));
    }

    #[test]
    fn empty_body_has_no_content_type() {
        let s = to_string(Response::new(StatusCode::NoContent).into_bytes());
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn json_body() {
        let r = Response::json(&serde_json::json!({"a": "b"})).unwrap();
        assert_eq!(r.status(), StatusCode::Ok);
        assert_eq!(r.header_value("Content-Type"), Some("application/json"));
        assert_eq!(r.body_ref(), br#"{"a":"b"}"#);
    }

    #[test]
    fn handler_framing_headers_are_replaced() {
        let r = Response::new(StatusCode::Ok)
            .header("Content-Length", "2")
            .header("connection", "keep-alive")
            .body("hello");
        let s = to_string(r.into_bytes());
        assert_eq!(s.to_ascii_lowercase().matches("content-length:").count(), 1);
        assert_eq!(s.to_ascii_lowercase().matches("connection:").count(), 1);
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.contains("Connection: close\r\n"));
        assert!(!s.contains("keep-alive"));
        assert!(s.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn method_not_allowed_status_line() {
        let s = to_string(Response::new(StatusCode::MethodNotAllowed).into_bytes());
        assert!(s.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    }
}
