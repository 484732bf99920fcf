//! Multi-valued query and form argument table.

use std::collections::HashMap;

use thiserror::Error;

/// A required argument was absent from both the query string and the form body.
///
/// Callers map this to a `400 Bad Request` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing argument {name}")]
pub struct MissingArgument {
    pub name: String,
}

/// Arguments from the query string and, for form posts, the request body.
///
/// Every name maps to one or more values in arrival order. Adding a value for a
/// name that already exists appends to it; nothing is ever overwritten.
///
/// Values are stored as decoded. Sanitization happens on read: the control
/// characters `0x00..=0x08` and `0x0E..=0x1F` are replaced by a space, then the
/// value is trimmed unless an `_unstripped` accessor is used.
///
/// # Examples
///
/// ```
/// use pathwise::http::QueryTable;
///
/// let query = QueryTable::parse("a=1&a=2&b=3");
/// assert_eq!(query.arguments("a"), ["1", "2"]);
/// assert_eq!(query.argument("a").unwrap(), "2");
/// assert!(query.argument("c").is_err());
/// assert_eq!(query.argument_or("c", "none"), "none");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTable {
    args: HashMap<String, Vec<String>>,
}

impl QueryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key=value&key=value` string. `+` decodes to a space, percent
    /// escapes are decoded, and keys without `=` get an empty value.
    pub fn parse(input: &str) -> Self {
        let mut table = Self::new();
        table.extend_encoded(input.as_bytes());
        table
    }

    /// Append every pair of a form-urlencoded byte string.
    pub fn extend_encoded(&mut self, input: &[u8]) {
        for (name, value) in form_urlencoded::parse(input) {
            self.add_argument(name.into_owned(), value.into_owned());
        }
    }

    /// Append `value` to the values of `name`.
    pub fn add_argument(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.args.entry(name.into()).or_default().push(value.into());
    }

    /// All values for `name`, sanitized and trimmed, in arrival order.
    pub fn arguments(&self, name: &str) -> Vec<String> {
        self.collect(name, true)
    }

    /// All values for `name`, sanitized but not trimmed.
    pub fn arguments_unstripped(&self, name: &str) -> Vec<String> {
        self.collect(name, false)
    }

    /// The last value for `name`, sanitized and trimmed.
    ///
    /// # Errors
    ///
    /// [`MissingArgument`] when `name` has no values.
    pub fn argument(&self, name: &str) -> Result<String, MissingArgument> {
        self.last(name, true)
    }

    /// The last value for `name`, sanitized but not trimmed.
    ///
    /// # Errors
    ///
    /// [`MissingArgument`] when `name` has no values.
    pub fn argument_unstripped(&self, name: &str) -> Result<String, MissingArgument> {
        self.last(name, false)
    }

    /// The last value for `name`, or `default` when there is none. The default
    /// is returned as given.
    pub fn argument_or(&self, name: &str, default: impl Into<String>) -> String {
        self.argument(name).unwrap_or_else(|_| default.into())
    }

    /// The stored values for `name` without sanitization.
    pub fn raw_values(&self, name: &str) -> &[String] {
        self.args.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    /// Argument names in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(String::as_str)
    }

    /// Number of distinct argument names.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn collect(&self, name: &str, strip: bool) -> Vec<String> {
        self.raw_values(name)
            .iter()
            .map(|value| clean(value, strip))
            .collect()
    }

    fn last(&self, name: &str, strip: bool) -> Result<String, MissingArgument> {
        self.raw_values(name)
            .last()
            .map(|value| clean(value, strip))
            .ok_or_else(|| MissingArgument {
                name: name.to_owned(),
            })
    }
}

/// Replace the control characters `0x00..=0x08` and `0x0E..=0x1F` with spaces.
/// Tab, newline, vertical tab, form feed and carriage return are kept.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\x00'..='\x08' | '\x0e'..='\x1f' => ' ',
            other => other,
        })
        .collect()
}

fn clean(value: &str, strip: bool) -> String {
    let sanitized = sanitize(value);
    if strip {
        sanitized.trim().to_owned()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_keep_order_and_last_wins() {
        let q = QueryTable::parse("a=1&a=2&b=3");
        assert_eq!(q.arguments("a"), vec!["1", "2"]);
        assert_eq!(q.argument("a").unwrap(), "2");
        assert_eq!(q.argument("b").unwrap(), "3");
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn missing_argument_without_default() {
        let q = QueryTable::parse("a=1");
        assert_eq!(
            q.argument("c").unwrap_err(),
            MissingArgument { name: "c".into() }
        );
        assert_eq!(q.argument("c").unwrap_err().to_string(), "missing argument c");
        assert!(q.arguments("c").is_empty());
    }

    #[test]
    fn default_is_used_only_when_absent() {
        let q = QueryTable::parse("empty=&x=1");
        assert_eq!(q.argument_or("x", "d"), "1");
        assert_eq!(q.argument_or("empty", "d"), "");
        assert_eq!(q.argument_or("nope", "  d  "), "  d  ");
    }

    #[test]
    fn control_characters_become_spaces_before_trimming() {
        let mut q = QueryTable::new();
        q.add_argument("v", "a\x07b");
        q.add_argument("edge", "\x01value\x1f");
        assert_eq!(q.argument("v").unwrap(), "a b");
        assert_eq!(q.argument("edge").unwrap(), "value");
        assert_eq!(q.argument_unstripped("edge").unwrap(), " value ");
    }

    #[test]
    fn whitespace_controls_are_preserved_until_trim() {
        let mut q = QueryTable::new();
        q.add_argument("v", "\tx\ny\r");
        assert_eq!(q.argument_unstripped("v").unwrap(), "\tx\ny\r");
        assert_eq!(q.argument("v").unwrap(), "x\ny");
    }

    #[test]
    fn percent_and_plus_decoding() {
        let q = QueryTable::parse("name=J%C3%BCrgen+Smith&bell=%07&blank");
        assert_eq!(q.argument("name").unwrap(), "Jürgen Smith");
        assert_eq!(q.argument_unstripped("bell").unwrap(), " ");
        assert_eq!(q.raw_values("bell"), ["\x07"]);
        assert!(q.contains("blank"));
        assert_eq!(q.argument("blank").unwrap(), "");
    }

    #[test]
    fn adding_a_value_never_drops_earlier_ones() {
        let mut q = QueryTable::parse("tag=a");
        q.add_argument("tag", "b");
        q.extend_encoded(b"tag=c&other=1");
        assert_eq!(q.arguments("tag"), vec!["a", "b", "c"]);
        assert_eq!(q.argument("tag").unwrap(), "c");
    }

    #[test]
    fn empty_input_is_empty_table() {
        let q = QueryTable::parse("");
        assert!(q.is_empty());
        assert_eq!(q.names().count(), 0);
    }
}
