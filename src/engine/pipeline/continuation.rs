use serde::{Deserialize, Serialize};

use crate::engine::errors::PipelineError;

/// Continuation token of a DISTINCT stage: the source's own token plus a
/// snapshot of the distinct map. Wire field names are part of the stable
/// token format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistinctContinuation {
    #[serde(rename = "sourceToken")]
    pub source_token: Option<String>,
    #[serde(rename = "distinctMapToken")]
    pub distinct_map_token: Option<String>,
}

impl DistinctContinuation {
    pub fn new(source_token: Option<String>, distinct_map_token: Option<String>) -> Self {
        Self {
            source_token,
            distinct_map_token,
        }
    }

    pub fn to_token(&self) -> Result<String, PipelineError> {
        serialize_token(self)
    }

    pub fn parse(token: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(token).map_err(|e| PipelineError::malformed_continuation(token, e))
    }
}

/// Continuation token of a GROUP BY stage. A null `sourceToken` with a
/// non-null table token marks an emit-phase resume: the source is exhausted
/// and only the remaining groups are restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByContinuation {
    #[serde(rename = "sourceToken")]
    pub source_token: Option<String>,
    #[serde(rename = "groupingTableToken")]
    pub grouping_table_token: Option<String>,
}

impl GroupByContinuation {
    pub fn new(source_token: Option<String>, grouping_table_token: Option<String>) -> Self {
        Self {
            source_token,
            grouping_table_token,
        }
    }

    pub fn to_token(&self) -> Result<String, PipelineError> {
        serialize_token(self)
    }

    pub fn parse(token: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(token).map_err(|e| PipelineError::malformed_continuation(token, e))
    }
}

fn serialize_token<T: Serialize>(token: &T) -> Result<String, PipelineError> {
    serde_json::to_string(token)
        .map_err(|e| PipelineError::Internal(format!("continuation serialization failed: {e}")))
}
