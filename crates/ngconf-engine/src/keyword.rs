//! Keyword parser (C4): translates the textual selector grammar
//!
//! ```text
//! <kind>[':sep: ' <value> | ':sep: :reg: ' <regexp>]
//! ```
//!
//! into a structured [`Keyword`] the query engine (C5) can match against
//! nodes without re-parsing.

use crate::error::{EngineError, EngineResult};
use regex::Regex;

const SEPARATOR: &str = ":sep: ";
const REGEX_PREFIX: &str = ":reg: ";

/// How a keyword's value should be matched against a node's query text.
#[derive(Debug, Clone)]
pub enum MatchMode {
    /// Match any node of the given kind.
    Any,
    /// Match nodes whose query text equals this string exactly.
    Literal(String),
    /// Match nodes whose query text contains a match for this pattern.
    Regex(Regex),
}

impl PartialEq for MatchMode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatchMode::Any, MatchMode::Any) => true,
            (MatchMode::Literal(a), MatchMode::Literal(b)) => a == b,
            (MatchMode::Regex(a), MatchMode::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// A parsed selector: the node kind to look for, plus how to match on its
/// query text.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub kind: String,
    pub match_mode: MatchMode,
}

/// Parses a selector string into a [`Keyword`].
///
/// An unparsable regex surfaces as [`EngineError::ParseError`]; an empty
/// kind surfaces as [`EngineError::UnknownKeyword`].
pub fn parse_keyword(selector: &str) -> EngineResult<Keyword> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(EngineError::UnknownKeyword(selector.to_string()));
    }

    let Some(sep_idx) = selector.find(SEPARATOR) else {
        return Ok(Keyword {
            kind: selector.to_string(),
            match_mode: MatchMode::Any,
        });
    };

    let kind = selector[..sep_idx].trim().to_string();
    if kind.is_empty() {
        return Err(EngineError::UnknownKeyword(selector.to_string()));
    }
    let rest = &selector[sep_idx + SEPARATOR.len()..];

    if let Some(pattern) = rest.strip_prefix(REGEX_PREFIX) {
        let regex = Regex::new(pattern).map_err(|e| EngineError::ParseError(e.to_string()))?;
        Ok(Keyword {
            kind,
            match_mode: MatchMode::Regex(regex),
        })
    } else {
        Ok(Keyword {
            kind,
            match_mode: MatchMode::Literal(rest.to_string()),
        })
    }
}

impl Keyword {
    /// Whether this keyword's value criterion matches `text` (the node's
    /// query text). Does not check the kind — callers compare kind
    /// separately against the node's tag.
    pub fn matches_text(&self, text: &str) -> bool {
        match &self.match_mode {
            MatchMode::Any => true,
            MatchMode::Literal(value) => text == value,
            MatchMode::Regex(re) => re.is_match(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_kind() {
        let kw = parse_keyword("server").unwrap();
        assert_eq!(kw.kind, "server");
        assert_eq!(kw.match_mode, MatchMode::Any);
    }

    #[test]
    fn parses_literal_value() {
        let kw = parse_keyword(r"key:sep: server_name test1\.com").unwrap();
        assert_eq!(kw.kind, "key");
        assert!(kw.matches_text(r"server_name test1\.com"));
    }

    #[test]
    fn parses_regex_value() {
        let kw = parse_keyword(r"location:sep: :reg: \^\~\s+\/").unwrap();
        assert_eq!(kw.kind, "location");
        assert!(matches!(kw.match_mode, MatchMode::Regex(_)));
    }

    #[test]
    fn rejects_invalid_regex() {
        let err = parse_keyword("comment:sep: :reg: (unclosed").unwrap_err();
        assert_eq!(err.tag(), "parse-error");
    }

    #[test]
    fn rejects_empty_selector() {
        let err = parse_keyword("   ").unwrap_err();
        assert_eq!(err.tag(), "unknown-keyword");
    }
}
