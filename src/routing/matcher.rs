//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile declarative path patterns (literal prefix or regex)
//! - Match request paths, reporting the matched prefix length
//! - Strip matched prefixes for `strip_path` routes
//!
//! # Design Decisions
//! - A pattern containing a group (`(`) is a regex; anything else is a
//!   literal prefix, so plain routes never pay regex cost
//! - Regexes are anchored at the start of the path; the matched span is
//!   the strippable prefix
//! - Path matching is case-sensitive

use regex::Regex;
use thiserror::Error;

/// Error produced when a declarative path pattern fails to compile.
#[derive(Debug, Error)]
#[error("invalid path pattern {pattern:?}: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Literal prefix: matches exactly or as a byte prefix of the path.
    Prefix(String),
    /// Regex pattern, anchored at the start of the path.
    Regex { raw: String, re: Regex },
}

/// Whether a raw pattern carries a regex group and must be compiled.
pub fn is_regex_pattern(raw: &str) -> bool {
    raw.contains('(')
}

/// The literal lead-in of a pattern, up to its first regex metacharacter.
/// Used for load-time overlap detection between routes.
pub fn static_prefix(raw: &str) -> &str {
    match raw.find(|c| {
        matches!(
            c,
            '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' | '^' | '$' | '|' | '\\' | '.'
        )
    }) {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

impl PathPattern {
    /// Compile a raw pattern from the configuration.
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        if is_regex_pattern(raw) {
            let re = Regex::new(&format!("^(?:{raw})")).map_err(|source| PatternError {
                pattern: raw.to_string(),
                source,
            })?;
            Ok(Self::Regex {
                raw: raw.to_string(),
                re,
            })
        } else {
            Ok(Self::Prefix(raw.to_string()))
        }
    }

    /// The pattern as written in the configuration.
    pub fn raw(&self) -> &str {
        match self {
            Self::Prefix(p) => p,
            Self::Regex { raw, .. } => raw,
        }
    }

    /// Match a request path. Returns the length of the matched prefix,
    /// which is what `strip_path` removes.
    pub fn matches(&self, path: &str) -> Option<usize> {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()).then(|| prefix.len()),
            Self::Regex { re, .. } => re.find(path).filter(|m| m.start() == 0).map(|m| m.end()),
        }
    }
}

/// Remove a matched prefix from a path, keeping the result a valid path.
pub fn strip_matched_prefix(path: &str, matched_len: usize) -> String {
    let rest = &path[matched_len..];
    if rest.is_empty() {
        "/".to_string()
    } else if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    }
}
