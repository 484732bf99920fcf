//! Request-target splitting.
//!
//! The target is split the way generic URL syntax prescribes:
//! `scheme://authority/path?query#fragment`, every part optional. Origin-form
//! targets (`/path?query`) simply have no scheme or authority.

use percent_encoding::percent_decode_str;

/// The borrowed components of a request target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

/// Split `target` into scheme, authority, path, query and fragment.
///
/// A scheme is only recognized when the text before the first `:` starts with a
/// letter and consists of letters, digits, `+`, `-` and `.`; a `:` inside the
/// path (`/a:b`) is therefore never mistaken for one.
///
/// ```
/// use pathwise::http::uri::split;
///
/// let parts = split("https://user@example.com:8443/a/b?x=1#top");
/// assert_eq!(parts.scheme, Some("https"));
/// assert_eq!(parts.authority, Some("user@example.com:8443"));
/// assert_eq!(parts.path, "/a/b");
/// assert_eq!(parts.query, Some("x=1"));
/// assert_eq!(parts.fragment, Some("top"));
/// ```
pub fn split(target: &str) -> UrlParts<'_> {
    let mut rest = target;
    let mut parts = UrlParts::default();

    if let Some((scheme, after)) = rest.split_once(':') {
        if is_scheme(scheme) {
            parts.scheme = Some(scheme);
            rest = after;
        }
    }

    if let Some(after) = rest.strip_prefix("//") {
        let end = after.find(['/', '?', '#']).unwrap_or(after.len());
        parts.authority = Some(&after[..end]);
        rest = &after[end..];
    }

    if let Some((before, fragment)) = rest.split_once('#') {
        parts.fragment = Some(fragment);
        rest = before;
    }

    if let Some((before, query)) = rest.split_once('?') {
        parts.query = Some(query);
        rest = before;
    }

    parts.path = rest;
    parts
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// `true` for schemes carried over TLS.
pub fn is_secure_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("wss")
}

/// Port implied by `scheme` when the authority names none.
pub fn default_port(scheme: &str) -> u16 {
    if is_secure_scheme(scheme) { 443 } else { 80 }
}

/// The parsed authority component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authority {
    pub username: Option<String>,
    pub password: Option<String>,
    pub hostname: String,
    /// The explicit port, if one was given and is a valid number.
    pub port: Option<u16>,
}

impl Authority {
    /// Parse `userinfo@host:port`.
    ///
    /// Userinfo is split from the host on the **first** `@`, so an `@` inside
    /// the host part is kept in the hostname. Userinfo is split into username
    /// and password on its first `:`. A bracketed IPv6 literal is unwrapped.
    /// An unparsable port is ignored and the scheme default applies.
    ///
    /// ```
    /// use pathwise::http::uri::Authority;
    ///
    /// let auth = Authority::parse("alice:s3:cret@example.com:8080");
    /// assert_eq!(auth.username.as_deref(), Some("alice"));
    /// assert_eq!(auth.password.as_deref(), Some("s3:cret"));
    /// assert_eq!(auth.hostname, "example.com");
    /// assert_eq!(auth.port, Some(8080));
    /// ```
    pub fn parse(authority: &str) -> Self {
        let (userinfo, host) = match authority.split_once('@') {
            Some((userinfo, host)) => (Some(userinfo), host),
            None => (None, authority),
        };

        let (username, password) = match userinfo.filter(|u| !u.is_empty()) {
            Some(userinfo) => match userinfo.split_once(':') {
                Some((user, pass)) => (Some(user.to_owned()), Some(pass.to_owned())),
                None => (Some(userinfo.to_owned()), None),
            },
            None => (None, None),
        };

        let (hostname, port) = split_host(host);

        Self {
            username,
            password,
            hostname: hostname.to_owned(),
            port: port.and_then(|p| p.parse().ok()),
        }
    }
}

fn split_host(host: &str) -> (&str, Option<&str>) {
    if let Some(bracketed) = host.strip_prefix('[') {
        if let Some((literal, after)) = bracketed.split_once(']') {
            return (literal, after.strip_prefix(':'));
        }
    }
    match host.split_once(':') {
        Some((hostname, port)) => (hostname, Some(port)),
        None => (host, None),
    }
}

/// One `/`-delimited path segment with its matrix parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSegment {
    /// The segment with any `;` parameters removed, percent-decoded.
    pub name: String,
    /// The `;`-separated tokens after the name, percent-decoded, in order.
    pub params: Vec<String>,
}

/// Split `path` into segments, separating matrix parameters from each segment.
///
/// The path is split on `/` and `;` before percent-decoding, so an encoded
/// `%3B` stays inside its segment name or parameter and `%2F` never splits a
/// segment here. Once [`join_segments`] rejoins the decoded names, though, a
/// `%2F` is an ordinary `/` in the routing path: `/a%2Fb/x` routes as `/a/b/x`.
///
/// ```
/// use pathwise::http::uri::parse_segments;
///
/// let segments = parse_segments("/widgets;color=red;size=9/list");
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[1].name, "widgets");
/// assert_eq!(segments[1].params, ["color=red", "size=9"]);
/// assert_eq!(segments[2].name, "list");
/// ```
pub fn parse_segments(path: &str) -> Vec<PathSegment> {
    path.split('/')
        .map(|raw| {
            let mut tokens = raw.split(';').map(decode);
            PathSegment {
                name: tokens.next().unwrap_or_default(),
                params: tokens.collect(),
            }
        })
        .collect()
}

/// Join the bare segment names back into a routable path.
pub fn join_segments(segments: &[PathSegment]) -> String {
    let path = segments
        .iter()
        .map(|segment| segment.name.as_str())
        .collect::<Vec<_>>()
        .join("/");
    if path.is_empty() { "/".to_owned() } else { path }
}

fn decode(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_form() {
        let p = split("/search?q=rust&page=2");
        assert_eq!(p.scheme, None);
        assert_eq!(p.authority, None);
        assert_eq!(p.path, "/search");
        assert_eq!(p.query, Some("q=rust&page=2"));
        assert_eq!(p.fragment, None);
    }

    #[test]
    fn fragment_is_split_before_query() {
        let p = split("/a#frag?not-query");
        assert_eq!(p.path, "/a");
        assert_eq!(p.query, None);
        assert_eq!(p.fragment, Some("frag?not-query"));
    }

    #[test]
    fn colon_in_path_is_not_a_scheme() {
        let p = split("/time/12:30");
        assert_eq!(p.scheme, None);
        assert_eq!(p.path, "/time/12:30");

        let p = split("1abc:/x");
        assert_eq!(p.scheme, None);
    }

    #[test]
    fn absolute_form_without_path() {
        let p = split("http://example.com?x=1");
        assert_eq!(p.scheme, Some("http"));
        assert_eq!(p.authority, Some("example.com"));
        assert_eq!(p.path, "");
        assert_eq!(p.query, Some("x=1"));
    }

    #[test]
    fn authority_without_userinfo() {
        let a = Authority::parse("example.com");
        assert_eq!(a.hostname, "example.com");
        assert_eq!(a.port, None);
        assert_eq!(a.username, None);
        assert_eq!(a.password, None);
    }

    #[test]
    fn userinfo_splits_on_first_at() {
        let a = Authority::parse("bob@corp@example.com:81");
        assert_eq!(a.username.as_deref(), Some("bob"));
        assert_eq!(a.password, None);
        assert_eq!(a.hostname, "corp@example.com");
        assert_eq!(a.port, Some(81));
    }

    #[test]
    fn empty_userinfo_is_ignored() {
        let a = Authority::parse("@example.com");
        assert_eq!(a.username, None);
        assert_eq!(a.hostname, "example.com");
    }

    #[test]
    fn ipv6_literal_and_bad_port() {
        let a = Authority::parse("[::1]:8080");
        assert_eq!(a.hostname, "::1");
        assert_eq!(a.port, Some(8080));

        let a = Authority::parse("example.com:http");
        assert_eq!(a.hostname, "example.com");
        assert_eq!(a.port, None);
    }

    #[test]
    fn default_ports() {
        assert_eq!(default_port("https"), 443);
        assert_eq!(default_port("HTTPS"), 443);
        assert_eq!(default_port("wss"), 443);
        assert_eq!(default_port("http"), 80);
        assert_eq!(default_port("ftp"), 80);
    }

    #[test]
    fn matrix_parameters_are_stripped_from_the_path() {
        let segments = parse_segments("/widgets;color=red;size=9/list");
        assert_eq!(join_segments(&segments), "/widgets/list");
        assert_eq!(segments[1].params, vec!["color=red", "size=9"]);
        assert!(segments[2].params.is_empty());
    }

    #[test]
    fn segments_are_decoded_after_splitting() {
        let segments = parse_segments("/a%2Fb;k=v%3Bw/caf%C3%A9");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].name, "a/b");
        assert_eq!(segments[1].params, vec!["k=v;w"]);
        assert_eq!(segments[2].name, "café");
    }

    #[test]
    fn encoded_slash_becomes_a_separator_in_the_joined_path() {
        assert_eq!(join_segments(&parse_segments("/a%2Fb/x")), "/a/b/x");
    }

    #[test]
    fn empty_path_normalizes_to_root() {
        assert_eq!(join_segments(&parse_segments("")), "/");
        assert_eq!(join_segments(&parse_segments("/")), "/");
        assert_eq!(join_segments(&parse_segments("/api/x/")), "/api/x/");
    }
}
