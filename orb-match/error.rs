use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("query descriptor set is empty")]
    EmptyQuery,
    #[error("candidate descriptor set is empty")]
    EmptyTrain,
    #[error("k must be > 0")]
    InvalidK,
    #[error("top-N window must be > 0")]
    InvalidTopN,
    #[error("acceptance distance {0} out of range (1-256)")]
    InvalidMaxDistance(u32),
}

pub type MatchResult<T> = Result<T, MatchError>;
