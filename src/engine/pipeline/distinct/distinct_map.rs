use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::engine::errors::PipelineError;
use crate::engine::pipeline::fingerprint::fingerprint;
use crate::engine::types::DocValue;

/// Which deduplication strategy the rewriter proved applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctQueryType {
    /// No ordering guarantee: every fingerprint ever seen is retained.
    Unordered,
    /// Upstream emits documents sorted by the distinct key, so only the
    /// last fingerprint needs to be kept.
    Ordered,
}

/// Persisted form of a distinct map. Fingerprints travel as decimal strings
/// because JSON numbers cannot hold 128 bits.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum DistinctMapToken {
    Unordered { seen: Vec<String> },
    Ordered { last: Option<String> },
}

/// Tracks which documents a DISTINCT stage has already emitted.
#[derive(Debug)]
pub enum DistinctMap {
    Unordered(UnorderedDistinctMap),
    Ordered(OrderedDistinctMap),
}

impl DistinctMap {
    /// Creates a map, restoring state from `continuation` when resuming.
    pub fn new(
        query_type: DistinctQueryType,
        continuation: Option<&str>,
    ) -> Result<Self, PipelineError> {
        let token = match continuation {
            Some(raw) => Some(parse_token(raw, query_type)?),
            None => None,
        };

        match query_type {
            DistinctQueryType::Unordered => {
                let mut seen = HashSet::new();
                if let Some(DistinctMapToken::Unordered { seen: encoded }) = token {
                    for raw in &encoded {
                        seen.insert(parse_fingerprint(raw, continuation.unwrap_or_default())?);
                    }
                }
                Ok(DistinctMap::Unordered(UnorderedDistinctMap { seen }))
            }
            DistinctQueryType::Ordered => {
                let mut last = None;
                if let Some(DistinctMapToken::Ordered { last: Some(raw) }) = token {
                    last = Some(parse_fingerprint(&raw, continuation.unwrap_or_default())?);
                }
                Ok(DistinctMap::Ordered(OrderedDistinctMap { last }))
            }
        }
    }

    /// Registers an element. Returns whether it is new (and should be
    /// emitted) together with its fingerprint. Idempotent: re-adding an
    /// equivalent element is never admitted.
    pub fn add(&mut self, value: &DocValue) -> (bool, u128) {
        let hash = fingerprint(value);
        let admitted = match self {
            DistinctMap::Unordered(map) => map.seen.insert(hash),
            DistinctMap::Ordered(map) => {
                if map.last == Some(hash) {
                    false
                } else {
                    map.last = Some(hash);
                    true
                }
            }
        };
        (admitted, hash)
    }

    /// Serializes the map state for a continuation token. The unordered
    /// snapshot is exact (and grows with the result set); the ordered one
    /// is a single fingerprint.
    pub fn cursor(&self) -> Result<String, PipelineError> {
        let token = match self {
            DistinctMap::Unordered(map) => {
                let mut fingerprints: Vec<u128> = map.seen.iter().copied().collect();
                fingerprints.sort_unstable();
                DistinctMapToken::Unordered {
                    seen: fingerprints.iter().map(u128::to_string).collect(),
                }
            }
            DistinctMap::Ordered(map) => DistinctMapToken::Ordered {
                last: map.last.map(|h| h.to_string()),
            },
        };
        serde_json::to_string(&token)
            .map_err(|e| PipelineError::Internal(format!("distinct map serialization failed: {e}")))
    }

    pub fn len(&self) -> usize {
        match self {
            DistinctMap::Unordered(map) => map.seen.len(),
            DistinctMap::Ordered(map) => usize::from(map.last.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct UnorderedDistinctMap {
    seen: HashSet<u128>,
}

#[derive(Debug)]
pub struct OrderedDistinctMap {
    last: Option<u128>,
}

fn parse_token(raw: &str, query_type: DistinctQueryType) -> Result<DistinctMapToken, PipelineError> {
    let token: DistinctMapToken =
        serde_json::from_str(raw).map_err(|e| PipelineError::malformed_continuation(raw, e))?;

    let kind_matches = matches!(
        (&token, query_type),
        (DistinctMapToken::Unordered { .. }, DistinctQueryType::Unordered)
            | (DistinctMapToken::Ordered { .. }, DistinctQueryType::Ordered)
    );
    if !kind_matches {
        return Err(PipelineError::malformed_continuation(
            raw,
            "distinct map token kind does not match the query's distinct type",
        ));
    }
    Ok(token)
}

fn parse_fingerprint(raw: &str, token: &str) -> Result<u128, PipelineError> {
    raw.parse::<u128>().map_err(|_| {
        PipelineError::malformed_continuation(
            token,
            format!("`{raw}` is not a decimal 128-bit fingerprint"),
        )
    })
}
