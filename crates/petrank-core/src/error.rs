use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// Vote tag other than `up` or `down`.
    InvalidVoteType(String),
    /// Instant that is not finite, out of range, or unparseable.
    InvalidTimestamp(String),
    /// Instant past the epoch day, where `1 / (age_days + 1)` is undefined or leaves (0, 1].
    DegenerateTimeWeight { age_days: i64 },
    /// Accumulator or result that is NaN or infinite.
    NonFiniteScore(f64),
    InvalidConfig(String),
    Snapshot(String),
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::InvalidVoteType(v) => {
                write!(f, "invalid vote type {v:?}: expected \"up\" or \"down\"")
            }
            ScoreError::InvalidTimestamp(msg) => write!(f, "invalid timestamp: {msg}"),
            ScoreError::DegenerateTimeWeight { age_days } => write!(
                f,
                "degenerate time weight: age_days={age_days} is past the reference epoch"
            ),
            ScoreError::NonFiniteScore(v) => write!(f, "non-finite score: {v}"),
            ScoreError::InvalidConfig(msg) => write!(f, "invalid scoring config: {msg}"),
            ScoreError::Snapshot(msg) => write!(f, "invalid feed snapshot: {msg}"),
        }
    }
}

impl std::error::Error for ScoreError {}

impl From<serde_json::Error> for ScoreError {
    fn from(e: serde_json::Error) -> Self {
        ScoreError::Snapshot(e.to_string())
    }
}

impl From<toml::de::Error> for ScoreError {
    fn from(e: toml::de::Error) -> Self {
        ScoreError::InvalidConfig(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScoreError>;
