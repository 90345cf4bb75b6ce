/// Domain-specific error types for the value engine.
/// Per-fixture failures degrade to the unavailable sentinel and the cycle
/// continues. Only structural failures abort a cycle.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("no market found for '{query}'")]
    NotFound { query: String },

    #[error("alignment mismatch: {fixtures} fixtures, {odds} odds, {distributions} distributions")]
    AlignmentMismatch {
        fixtures: usize,
        odds: usize,
        distributions: usize,
    },

    #[error("arithmetic degenerate: {0}")]
    ArithmeticDegenerate(String),

    #[error("unknown error: {0}")]
    Unknown(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("exchange API error: {status} {body}")]
    Api { status: u16, body: String },

    #[error("auth error: {0}")]
    Auth(String),

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// Failures that only cost one fixture its quote.
    pub fn is_per_fixture(&self) -> bool {
        !matches!(self, EngineError::AlignmentMismatch { .. } | EngineError::Config(_))
    }

    /// Short tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::SourceUnavailable(_)
            | EngineError::Network(_)
            | EngineError::Parse(_)
            | EngineError::Api { .. } => "source_unavailable",
            EngineError::NotFound { .. } => "not_found",
            EngineError::AlignmentMismatch { .. } => "alignment_mismatch",
            EngineError::ArithmeticDegenerate(_) => "arithmetic_degenerate",
            EngineError::Auth(_) => "auth",
            EngineError::Config(_) => "config",
            EngineError::Unknown(_) => "unknown",
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_is_structural() {
        let e = EngineError::AlignmentMismatch { fixtures: 13, odds: 12, distributions: 13 };
        assert!(!e.is_per_fixture());
        assert_eq!(e.kind(), "alignment_mismatch");
    }

    #[test]
    fn test_transport_failures_degrade() {
        let e = EngineError::Api { status: 503, body: String::new() };
        assert!(e.is_per_fixture());
        assert_eq!(e.kind(), "source_unavailable");
        assert!(EngineError::NotFound { query: "A v B".into() }.is_per_fixture());
    }
}
