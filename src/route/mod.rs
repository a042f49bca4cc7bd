//! Route templates and their compiled patterns.

use std::{collections::BTreeMap, str::FromStr};

use regex::Regex;

pub mod coerce;

/// A parsed route template.
///
/// A template is *static* when it contains no `{name}` placeholder and is
/// matched by exact string comparison; it is *dynamic* when it contains at
/// least one placeholder and is matched through its [`CompiledPattern`].
#[derive(Debug, Clone)]
pub enum RouteTemplate {
    /// A literal path, matched exactly.
    Static(String),

    /// A parametrized path, matched through a compiled pattern.
    Dynamic(CompiledPattern),
}

/// An error that can occur when parsing a route template.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The route template does not start with a slash.
    #[error("the route template does not start with a slash")]
    NoLeadingSlash,

    /// A placeholder has no identifier.
    #[error("empty placeholder at position {position}")]
    EmptyPlaceholder {
        /// The position at which the placeholder was opened.
        position: usize,
    },

    /// A placeholder is not closed.
    #[error("the placeholder opened at position {start} is not closed")]
    UnclosedPlaceholder {
        /// The position at which the placeholder was opened.
        start: usize,
    },

    /// A placeholder identifier contains an invalid character.
    #[error(
        "the placeholder opened at position {start} contains an invalid character (`{character}`) at position {position}"
    )]
    InvalidPlaceholderCharacter {
        /// The position at which the placeholder was opened.
        start: usize,

        /// The position at which the invalid character was found.
        position: usize,

        /// The invalid character.
        character: char,
    },

    /// The same placeholder name appears twice in one template.
    #[error("duplicate placeholder name `{name}`")]
    DuplicatePlaceholder {
        /// The duplicated name.
        name: String,
    },

    /// The derived pattern was rejected by the regex engine.
    ///
    /// This typically means a placeholder identifier is not a valid capture
    /// group name.
    #[error("failed to compile the pattern for the route template: {err}")]
    Pattern {
        /// The error that occurred.
        #[source]
        err: regex::Error,
    },
}

impl ParseError {
    /// Returns the range of characters that caused the error, when known.
    pub fn range(&self) -> Option<std::ops::RangeInclusive<usize>> {
        match self {
            Self::NoLeadingSlash => Some(0..=0),
            Self::EmptyPlaceholder { position } => Some(*position..=*position + 1),
            Self::UnclosedPlaceholder { start } => Some(*start..=*start),
            Self::InvalidPlaceholderCharacter {
                start, position, ..
            } => Some(*start..=*position),
            Self::DuplicatePlaceholder { .. } | Self::Pattern { .. } => None,
        }
    }

    /// Get a detailled error message with the specific position of the error.
    pub fn detail(&self, s: &str) -> String {
        let Some(range) = self.range() else {
            return s.to_owned();
        };

        let start = *range.start();
        let mut end = (range.end() + 1).min(s.len());

        while end < s.len() && !s.is_char_boundary(end) {
            end += 1;
        }

        let mut result = String::with_capacity(s.len() + 2);
        result.push_str(&s[..start]);
        result.push('^');
        result.push_str(&s[start..end]);
        result.push('^');
        result.push_str(&s[end..]);

        result
    }
}

impl RouteTemplate {
    /// Parse a route template, classifying it as static or dynamic and
    /// compiling the pattern in the dynamic case.
    pub fn parse(template: &str) -> Result<Self, ParseError> {
        if !template.starts_with('/') {
            return Err(ParseError::NoLeadingSlash);
        }

        if !template.contains('{') {
            return Ok(Self::Static(template.to_owned()));
        }

        CompiledPattern::compile(template).map(Self::Dynamic)
    }

    /// Whether this template contains placeholders.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

impl FromStr for RouteTemplate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The compiled form of a dynamic route template.
///
/// Each `{name}` placeholder becomes a `(?P<name>[^/]+)` capture group
/// matching exactly one path segment; the full pattern is anchored at both
/// ends and matching is case-sensitive. Compilation is deterministic: the
/// same template always yields the same pattern source, which the registry
/// uses as the merge key for multi-verb entries.
///
/// Adjacent placeholders with no literal separator compile fine but are
/// ambiguous at match time; avoiding them is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl CompiledPattern {
    /// Compile a dynamic route template into an anchored pattern.
    pub fn compile(template: &str) -> Result<Self, ParseError> {
        let mut pattern = String::with_capacity(template.len() + 16);
        let mut names: Vec<String> = Vec::new();
        let mut literal = String::new();

        pattern.push('^');

        let mut chars = template.char_indices();

        while let Some((position, c)) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }

            pattern.push_str(&regex::escape(&literal));
            literal.clear();

            let start = position;
            let mut name = String::new();

            loop {
                match chars.next() {
                    Some((_, '}')) => break,
                    Some((position, character @ ('/' | '{'))) => {
                        return Err(ParseError::InvalidPlaceholderCharacter {
                            start,
                            position,
                            character,
                        });
                    }
                    Some((_, c)) => name.push(c),
                    None => return Err(ParseError::UnclosedPlaceholder { start }),
                }
            }

            if name.is_empty() {
                return Err(ParseError::EmptyPlaceholder { position: start });
            }

            if names.contains(&name) {
                return Err(ParseError::DuplicatePlaceholder { name });
            }

            pattern.push_str("(?P<");
            pattern.push_str(&name);
            pattern.push_str(">[^/]+)");
            names.push(name);
        }

        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|err| ParseError::Pattern { err })?;

        Ok(Self {
            template: template.to_owned(),
            regex,
            names,
        })
    }

    /// The original route template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The pattern source string.
    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    /// The placeholder names, in template order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether the pattern structurally matches the path.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match the path and extract the captured parameters.
    ///
    /// The group names are re-derived from the compiled pattern itself, and
    /// the captured values are taken segment-exact from the path: no
    /// percent-decoding happens here.
    pub fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.regex.captures(path)?;

        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_owned(), m.as_str().to_owned()))
                })
                .collect(),
        )
    }
}
