//! Route template scanning.
//!
//! A template is a literal path with embedded placeholders:
//!
//! | Placeholder          | Matches                                  |
//! |----------------------|------------------------------------------|
//! | `{name}`             | one or more non-`/` characters           |
//! | `{name:pattern}`     | whatever the regex fragment `pattern` accepts |
//!
//! Templates are scanned once, left to right, into a [`Token`] stream. The
//! token stream is then rendered as an anchored regular expression where each
//! literal run is escaped and each placeholder becomes a named capture group.
//!
//! Placeholder names are ASCII word characters and may not start with a digit.
//! A constraint runs up to the first `}`, so constraints cannot themselves
//! contain braces (`{id:\d{3}}` is rejected).
//!
//! Constraint fragments are inserted verbatim. Template authors are trusted;
//! request paths are not.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Pattern used for placeholders that carry no explicit constraint.
pub const DEFAULT_CONSTRAINT: &str = "[^/]+";

/// A route template that could not be compiled.
///
/// Offsets are byte offsets into the template string. Regex rejections carry
/// none; the engine's own message locates the problem within the constraint.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder in `{template}` starting at byte {offset}")]
    Unterminated { template: String, offset: usize },

    #[error("unmatched `}}` in `{template}` at byte {offset}")]
    StrayClose { template: String, offset: usize },

    #[error("placeholder without a name in `{template}` at byte {offset}")]
    EmptyName { template: String, offset: usize },

    #[error("placeholder name `{name}` in `{template}` must not start with a digit")]
    InvalidName {
        template: String,
        name: String,
        offset: usize,
    },

    #[error("unexpected `{found}` inside placeholder of `{template}` at byte {offset}")]
    UnexpectedChar {
        template: String,
        found: char,
        offset: usize,
    },

    #[error("placeholder `{name}` in `{template}` has an empty constraint")]
    EmptyConstraint {
        template: String,
        name: String,
        offset: usize,
    },

    #[error("placeholder `{name}` appears more than once in `{template}` (again at byte {offset})")]
    DuplicateName {
        template: String,
        name: String,
        offset: usize,
    },

    #[error("constraint rejected by the regex engine in `{template}`: {source}")]
    Pattern {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// One piece of a scanned template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text that must appear in the path exactly as written.
    Literal(String),
    /// A named capture, optionally restricted by a regex fragment.
    Placeholder {
        name: String,
        constraint: Option<String>,
    },
}

/// A scanned route template.
///
/// # Examples
///
/// ```
/// use pathwise::router::{RouteTemplate, Token};
///
/// let template: RouteTemplate = "/api/{method}/{continuation:\\d+}/".parse().unwrap();
/// assert_eq!(template.placeholder_names().collect::<Vec<_>>(), ["method", "continuation"]);
/// assert_eq!(template.tokens()[0], Token::Literal("/api/".into()));
/// assert_eq!(
///     template.to_pattern(),
///     r"^/api/(?P<method>[^/]+)/(?P<continuation>\d+)/$"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    source: String,
    tokens: Vec<Token>,
}

impl RouteTemplate {
    /// Scan `template` into literal and placeholder tokens.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for unbalanced braces, malformed or
    /// duplicate placeholder names, and empty constraints. Whether a
    /// constraint is a valid regex is only checked when the route is compiled.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let tokens = Scanner::new(template).run()?;
        Ok(Self {
            source: template.to_owned(),
            tokens,
        })
    }

    /// The template exactly as it was registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Placeholder names in template order.
    pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|token| match token {
            Token::Placeholder { name, .. } => Some(name.as_str()),
            Token::Literal(_) => None,
        })
    }

    /// Render the template as regex source anchored at both ends.
    pub fn to_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.source.len() + 16);
        pattern.push('^');
        for token in &self.tokens {
            match token {
                Token::Literal(text) => pattern.push_str(&regex::escape(text)),
                Token::Placeholder { name, constraint } => {
                    let constraint = constraint.as_deref().unwrap_or(DEFAULT_CONSTRAINT);
                    pattern.push_str(&format!("(?P<{name}>{constraint})"));
                }
            }
        }
        pattern.push('$');
        pattern
    }
}

impl FromStr for RouteTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// Single-pass cursor over the template. `pos` is always a char boundary in
// `template` and only ever moves forward.
struct Scanner<'a> {
    template: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    seen: HashSet<String>,
}

impl<'a> Scanner<'a> {
    fn new(template: &'a str) -> Self {
        Self {
            template,
            pos: 0,
            tokens: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, TemplateError> {
        let mut literal_start = 0;

        while let Some(c) = self.peek() {
            match c {
                '{' => {
                    self.flush_literal(literal_start);
                    let open = self.pos;
                    self.pos += 1;
                    self.placeholder(open)?;
                    literal_start = self.pos;
                }
                '}' => {
                    return Err(TemplateError::StrayClose {
                        template: self.template.to_owned(),
                        offset: self.pos,
                    });
                }
                other => self.pos += other.len_utf8(),
            }
        }

        self.flush_literal(literal_start);
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.template[self.pos..].chars().next()
    }

    fn flush_literal(&mut self, start: usize) {
        if start < self.pos {
            self.tokens
                .push(Token::Literal(self.template[start..self.pos].to_owned()));
        }
    }

    // Called with `pos` just past the opening brace at `open`.
    fn placeholder(&mut self, open: usize) -> Result<(), TemplateError> {
        let template = self.template;
        let rest = &template[self.pos..];
        let name_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        let name = &rest[..name_len];
        self.pos += name_len;

        let next = match self.peek() {
            Some(c) => c,
            None => return Err(self.unterminated(open)),
        };

        if name.is_empty() {
            return Err(TemplateError::EmptyName {
                template: self.template.to_owned(),
                offset: open,
            });
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(TemplateError::InvalidName {
                template: self.template.to_owned(),
                name: name.to_owned(),
                offset: open,
            });
        }

        let constraint = match next {
            '}' => {
                self.pos += 1;
                None
            }
            ':' => {
                self.pos += 1;
                let rest = &template[self.pos..];
                let len = rest.find('}').ok_or_else(|| self.unterminated(open))?;
                if len == 0 {
                    return Err(TemplateError::EmptyConstraint {
                        template: self.template.to_owned(),
                        name: name.to_owned(),
                        offset: open,
                    });
                }
                let constraint = rest[..len].to_owned();
                self.pos += len + 1;
                Some(constraint)
            }
            found => {
                return Err(TemplateError::UnexpectedChar {
                    template: self.template.to_owned(),
                    found,
                    offset: self.pos,
                });
            }
        };

        if !self.seen.insert(name.to_owned()) {
            return Err(TemplateError::DuplicateName {
                template: self.template.to_owned(),
                name: name.to_owned(),
                offset: open,
            });
        }

        self.tokens.push(Token::Placeholder {
            name: name.to_owned(),
            constraint,
        });
        Ok(())
    }

    fn unterminated(&self, open: usize) -> TemplateError {
        TemplateError::Unterminated {
            template: self.template.to_owned(),
            offset: open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder(name: &str, constraint: Option<&str>) -> Token {
        Token::Placeholder {
            name: name.to_owned(),
            constraint: constraint.map(str::to_owned),
        }
    }

    #[test]
    fn literal_only() {
        let t = RouteTemplate::parse("/about/team").unwrap();
        assert_eq!(t.tokens(), &[Token::Literal("/about/team".into())]);
        assert_eq!(t.to_pattern(), "^/about/team$");
    }

    #[test]
    fn empty_template_has_no_tokens() {
        let t = RouteTemplate::parse("").unwrap();
        assert!(t.tokens().is_empty());
        assert_eq!(t.to_pattern(), "^$");
    }

    #[test]
    fn placeholders_and_literals_interleave() {
        let t = RouteTemplate::parse("/api/{method}/{continuation:\\d+}/").unwrap();
        assert_eq!(
            t.tokens(),
            &[
                Token::Literal("/api/".into()),
                placeholder("method", None),
                Token::Literal("/".into()),
                placeholder("continuation", Some("\\d+")),
                Token::Literal("/".into()),
            ]
        );
    }

    #[test]
    fn adjacent_placeholders() {
        let t = RouteTemplate::parse("{a}{b:x}").unwrap();
        assert_eq!(t.tokens(), &[placeholder("a", None), placeholder("b", Some("x"))]);
    }

    #[test]
    fn literal_runs_are_escaped() {
        let t = RouteTemplate::parse("/files/{name}.tar.gz").unwrap();
        assert_eq!(t.to_pattern(), r"^/files/(?P<name>[^/]+)\.tar\.gz$");
    }

    #[test]
    fn multibyte_literals_keep_offsets() {
        let t = RouteTemplate::parse("/café/{id}/ü").unwrap();
        assert_eq!(
            t.tokens(),
            &[
                Token::Literal("/café/".into()),
                placeholder("id", None),
                Token::Literal("/ü".into()),
            ]
        );
    }

    #[test]
    fn constraint_keeps_colons_and_unicode() {
        let t = RouteTemplate::parse("/t/{stamp:\\d+:\\d+}/{word:é+}").unwrap();
        assert_eq!(
            t.placeholder_names().collect::<Vec<_>>(),
            vec!["stamp", "word"]
        );
        assert_eq!(t.to_pattern(), r"^/t/(?P<stamp>\d+:\d+)/(?P<word>é+)$");
    }

    #[test]
    fn unterminated_placeholder() {
        let err = RouteTemplate::parse("/users/{id").unwrap_err();
        assert!(matches!(err, TemplateError::Unterminated { offset: 7, .. }));

        let err = RouteTemplate::parse("/users/{id:\\d+").unwrap_err();
        assert!(matches!(err, TemplateError::Unterminated { offset: 7, .. }));

        let err = RouteTemplate::parse("/users/{").unwrap_err();
        assert!(matches!(err, TemplateError::Unterminated { offset: 7, .. }));
    }

    #[test]
    fn stray_close_brace() {
        let err = RouteTemplate::parse("/users}/{id}").unwrap_err();
        assert!(matches!(err, TemplateError::StrayClose { offset: 6, .. }));
    }

    #[test]
    fn braces_inside_constraint_are_rejected() {
        let err = RouteTemplate::parse("/code/{id:\\d{3}}").unwrap_err();
        assert!(matches!(err, TemplateError::StrayClose { offset: 15, .. }));
    }

    #[test]
    fn empty_name() {
        assert!(matches!(
            RouteTemplate::parse("/a/{}").unwrap_err(),
            TemplateError::EmptyName { offset: 3, .. }
        ));
        assert!(matches!(
            RouteTemplate::parse("/a/{:x}").unwrap_err(),
            TemplateError::EmptyName { .. }
        ));
    }

    #[test]
    fn digit_leading_name() {
        let err = RouteTemplate::parse("/{1st}").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidName { ref name, .. } if name == "1st"));
    }

    #[test]
    fn unexpected_character_in_name() {
        let err = RouteTemplate::parse("/{user-id}").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnexpectedChar { found: '-', offset: 6, .. }
        ));
    }

    #[test]
    fn empty_constraint() {
        let err = RouteTemplate::parse("/{id:}").unwrap_err();
        assert!(matches!(err, TemplateError::EmptyConstraint { ref name, .. } if name == "id"));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = RouteTemplate::parse("/{id}/x/{id:\\d+}").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::DuplicateName { ref name, offset: 8, .. } if name == "id"
        ));
    }

    #[test]
    fn display_round_trips_source() {
        let source = "/api/{method}/";
        let t: RouteTemplate = source.parse().unwrap();
        assert_eq!(t.to_string(), source);
        assert_eq!(t.as_str(), source);
    }
}
