//! HTTP request parsing and response types.
//!
//! The parsing pipeline turns transport input ([`RawRequest`]) into a normalized
//! [`ParsedRequest`]:
//!
//! - [`headers`]: canonical-key header map;
//! - [`uri`]: request-target splitting, authority and matrix-parameter parsing;
//! - [`query`]: multi-valued query/form argument table;
//! - [`request`]: the [`RequestParser`] tying the above together;
//! - [`response`]: the [`Response`] builder and its HTTP/1.1 serialization.

use std::fmt;

pub mod headers;
pub mod query;
pub mod request;
pub mod response;
pub mod uri;

pub use headers::Headers;
pub use query::{MissingArgument, QueryTable};
pub use request::{
    DecodeError, FormBodyError, ParsedRequest, ParserConfig, RawRequest, RequestParser,
};
pub use response::Response;

/// An HTTP response status code.
///
/// Only the codes this crate produces or handlers commonly return are listed.
///
/// # Examples
///
/// ```
/// use pathwise::http::StatusCode;
///
/// let status = StatusCode::NotFound;
/// assert_eq!(status.as_u16(), 404);
/// assert_eq!(status.canonical_reason(), "Not Found");
/// assert!(status.is_client_error());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    NoContent = 204,

    MovedPermanently = 301,
    Found = 302,
    NotModified = 304,

    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    PayloadTooLarge = 413,
    UnsupportedMediaType = 415,

    InternalServerError = 500,
    NotImplemented = 501,
    ServiceUnavailable = 503,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the canonical reason phrase for this status code.
    pub fn canonical_reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::MovedPermanently => "Moved Permanently",
            Self::Found => "Found",
            Self::NotModified => "Not Modified",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::PayloadTooLarge => "Payload Too Large",
            Self::UnsupportedMediaType => "Unsupported Media Type",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
            Self::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(self) -> bool {
        self.as_u16() >= 500
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

/// An HTTP request method.
///
/// The verbs a [`Resource`](crate::app::Resource) can implement are explicit
/// variants. Any other token is kept verbatim in [`Method::Extension`] and is
/// answered with `501 Not Implemented` by the dispatcher.
///
/// # Examples
///
/// ```
/// use pathwise::http::Method;
///
/// assert_eq!(Method::from_token("post"), Method::Post);
/// assert_eq!(Method::from_token("PURGE"), Method::Extension("PURGE".into()));
/// assert!(Method::Post.accepts_form_body());
/// assert!(!Method::Get.accepts_form_body());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Connect,
    Trace,
    /// A non-standard method token, stored uppercased.
    Extension(String),
}

impl Method {
    /// Parse a request-line method token. Matching is case-insensitive; the
    /// stored extension token is uppercased.
    pub fn from_token(token: &str) -> Self {
        let token = token.to_ascii_uppercase();
        match token.as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "CONNECT" => Self::Connect,
            "TRACE" => Self::Trace,
            _ => Self::Extension(token),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
            Self::Extension(s) => s.as_str(),
        }
    }

    /// `true` for the methods whose form-encoded bodies are merged into the
    /// query table (POST and PUT).
    pub fn accepts_form_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_token(s))
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_tokens_are_case_insensitive() {
        assert_eq!(Method::from_token("get"), Method::Get);
        assert_eq!(Method::from_token("Delete"), Method::Delete);
        assert_eq!("options".parse::<Method>(), Ok(Method::Options));
    }

    #[test]
    fn extension_methods_are_uppercased() {
        let m = Method::from_token("propfind");
        assert_eq!(m, Method::Extension("PROPFIND".into()));
        assert_eq!(m.to_string(), "PROPFIND");
    }

    #[test]
    fn status_display_and_classes() {
        assert_eq!(StatusCode::MethodNotAllowed.to_string(), "405 Method Not Allowed");
        assert!(StatusCode::BadRequest.is_client_error());
        assert!(!StatusCode::BadRequest.is_server_error());
        assert!(StatusCode::NotImplemented.is_server_error());
        assert!(!StatusCode::Ok.is_client_error());
    }
}
