//! Error taxonomy (§6/§7): every failure mode is a stable, machine-matchable
//! tag in addition to a human-readable message, so callers across an RPC
//! boundary can match on `tag()` rather than parsing prose.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no node matched selector")]
    NotFound,

    #[error("update produced the same fingerprint as the current configuration")]
    SameFingerprint,

    #[error("node at target position has a different kind than expected")]
    TypeMismatch,

    #[error("queryer handle is stale; the bundle has been mutated since it was issued")]
    StaleQueryer,

    #[error("inserting this include would create a cycle")]
    IncludeLoop,

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("unknown selector keyword: {0}")]
    UnknownKeyword(String),
}

impl EngineError {
    /// The stable, machine-readable name of this error's category.
    pub fn tag(&self) -> &'static str {
        match self {
            EngineError::NotFound => "not-found",
            EngineError::SameFingerprint => "same-fingerprint",
            EngineError::TypeMismatch => "type-mismatch",
            EngineError::StaleQueryer => "stale-queryer",
            EngineError::IncludeLoop => "include-loop",
            EngineError::ParseError(_) => "parse-error",
            EngineError::IoError(_) => "io-error",
            EngineError::UnknownKeyword(_) => "unknown-keyword",
        }
    }
}

impl From<ngconf_syntax::ParseError> for EngineError {
    fn from(err: ngconf_syntax::ParseError) -> Self {
        EngineError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::ParseError(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stable() {
        assert_eq!(EngineError::NotFound.tag(), "not-found");
        assert_eq!(EngineError::SameFingerprint.tag(), "same-fingerprint");
        assert_eq!(EngineError::TypeMismatch.tag(), "type-mismatch");
        assert_eq!(EngineError::StaleQueryer.tag(), "stale-queryer");
        assert_eq!(EngineError::IncludeLoop.tag(), "include-loop");
        assert_eq!(EngineError::ParseError(String::new()).tag(), "parse-error");
        assert_eq!(EngineError::IoError(String::new()).tag(), "io-error");
        assert_eq!(
            EngineError::UnknownKeyword(String::new()).tag(),
            "unknown-keyword"
        );
    }
}
