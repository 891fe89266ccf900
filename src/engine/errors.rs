use thiserror::Error;

/// Errors raised by the cross-partition pipeline stages.
///
/// Only request-level and fatal conditions surface as `Err`. Transient
/// partition failures travel through `QueryPage { success: false, .. }` and
/// leave stage state untouched so the caller can retry from the same cursor.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed continuation token `{token}`: {reason}")]
    MalformedContinuation { token: String, reason: String },

    #[error("Unknown ExecutionEnvironment value: {0}")]
    UnknownEnvironment(String),

    #[error("Malformed rewritten projection: {0}")]
    MalformedProjection(String),

    #[error("Invalid aggregate configuration: {0}")]
    InvalidAggregateSpec(String),

    #[error("Grouping cardinality limit of {limit} groups exceeded")]
    GroupingCardinalityExceeded { limit: usize },

    #[error("Internal invariant violation: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Wraps a continuation parse failure together with the token that
    /// produced it, as surfaced to the issuing client.
    pub fn malformed_continuation(token: &str, reason: impl ToString) -> Self {
        PipelineError::MalformedContinuation {
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}
