//! Request header map keyed by canonical header name.
//!
//! Header names are canonicalized by uppercasing them and mapping both `-` and
//! `_` to a space, so `Content-Type`, `CONTENT_TYPE` and `content type` all
//! resolve to the key `CONTENT TYPE`. The original spelling is not kept.

use std::collections::HashMap;

/// Canonical lookup key for a header name.
///
/// ```
/// use pathwise::http::headers::canonical_name;
///
/// assert_eq!(canonical_name("X-Forwarded-For"), "X FORWARDED FOR");
/// assert_eq!(canonical_name("x_forwarded_for"), "X FORWARDED FOR");
/// ```
pub fn canonical_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '_' => ' ',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// A header map with canonical, separator-insensitive keys.
///
/// Repeated header lines are last-write-wins through [`insert`](Self::insert);
/// use [`append`](Self::append) to merge them into a comma-separated value.
///
/// # Examples
///
/// ```
/// use pathwise::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("X-Forwarded-For", "10.0.0.1");
/// headers.insert("X_Forwarded_For", "10.0.0.2");
///
/// assert_eq!(headers.get("X FORWARDED FOR"), Some("10.0.0.2"));
/// assert_eq!(headers.get("x-forwarded-for"), Some("10.0.0.2"));
/// assert_eq!(headers.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: HashMap::with_capacity(capacity),
        }
    }

    /// Stores `value` under the canonical form of `name`, replacing any
    /// previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.inner.insert(canonical_name(name), value.into());
    }

    /// Merges `value` into an existing entry as `existing, value`, or inserts
    /// it when the name is new.
    pub fn append(&mut self, name: &str, value: &str) {
        self.inner
            .entry(canonical_name(name))
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }

    /// Returns the value stored for `name`, which may be given in any spelling.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(&canonical_name(name)).map(String::as_str)
    }

    /// Like [`get`](Self::get), falling back to `default`.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Removes the entry for `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.inner.remove(&canonical_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&canonical_name(name))
    }

    /// Number of distinct canonical names.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over `(canonical name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_and_case_are_insignificant() {
        let mut h = Headers::new();
        h.insert("Content-Type", "text/plain");
        for spelling in ["Content-Type", "CONTENT_TYPE", "content type", "content-TYPE"] {
            assert_eq!(h.get(spelling), Some("text/plain"), "{spelling}");
        }
    }

    #[test]
    fn forwarded_for_spellings_share_a_key() {
        let h: Headers = [("X-Forwarded-For", "1.2.3.4")].into_iter().collect();
        assert_eq!(h.get("X FORWARDED FOR"), Some("1.2.3.4"));

        let h: Headers = [("X_Forwarded_For", "1.2.3.4")].into_iter().collect();
        assert_eq!(h.get("X FORWARDED FOR"), Some("1.2.3.4"));
    }

    #[test]
    fn last_write_wins() {
        let mut h = Headers::new();
        h.insert("Accept", "text/html");
        h.insert("accept", "application/json");
        assert_eq!(h.get("Accept"), Some("application/json"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn append_merges() {
        let mut h = Headers::new();
        h.append("Via", "a");
        h.append("VIA", "b");
        assert_eq!(h.get("via"), Some("a, b"));
    }

    #[test]
    fn iter_yields_canonical_names() {
        let h: Headers = [("x-request-id", "abc")].into_iter().collect();
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![("X REQUEST ID", "abc")]);
    }

    #[test]
    fn remove_and_contains() {
        let mut h = Headers::new();
        h.insert("Authorization", "Bearer token");
        assert!(h.contains("authorization"));
        assert!(!h.contains("x-missing"));
        assert_eq!(h.remove("AUTHORIZATION").as_deref(), Some("Bearer token"));
        assert!(h.is_empty());
        assert_eq!(h.remove("authorization"), None);
    }

    #[test]
    fn get_or_default() {
        let h = Headers::new();
        assert_eq!(h.get_or("Host", "localhost"), "localhost");
    }
}
