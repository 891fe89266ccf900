use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::engine::errors::PipelineError;
use crate::engine::pipeline::fingerprint::fingerprint_array;
use crate::engine::types::DocValue;

use super::plan::GroupByPlan;
use super::projection::RewrittenProjection;
use super::single_group::SingleGroupAggregator;

/// Hash table from grouping-key fingerprint to the group's aggregator.
///
/// Iteration (and therefore drain and cursor order) is the insertion order,
/// which is deterministic for a fixed sequence of `add_payload` calls and is
/// reproduced on resume because the cursor object preserves it.
#[derive(Debug)]
pub struct GroupingTable {
    plan: Arc<GroupByPlan>,
    groups: IndexMap<u128, SingleGroupAggregator>,
}

impl GroupingTable {
    pub fn new(plan: Arc<GroupByPlan>) -> Self {
        Self {
            plan,
            groups: IndexMap::new(),
        }
    }

    /// Rebuilds a table from a cursor produced by [`Self::cursor`].
    pub fn from_cursor(plan: Arc<GroupByPlan>, token: &str) -> Result<Self, PipelineError> {
        let parsed: JsonValue = serde_json::from_str(token)
            .map_err(|e| PipelineError::malformed_continuation(token, e))?;
        let obj = parsed.as_object().ok_or_else(|| {
            PipelineError::malformed_continuation(token, "grouping table cursor must be an object")
        })?;

        let mut groups = IndexMap::with_capacity(obj.len());
        for (key, value) in obj {
            let hash: u128 = key.parse().map_err(|_| {
                PipelineError::malformed_continuation(
                    token,
                    format!("`{key}` is not a decimal 128-bit group key"),
                )
            })?;
            let state_raw = value.as_str().ok_or_else(|| {
                PipelineError::malformed_continuation(
                    token,
                    "per-group aggregator cursor must be a string",
                )
            })?;
            let state: JsonValue = serde_json::from_str(state_raw)
                .map_err(|e| PipelineError::malformed_continuation(state_raw, e))?;
            groups.insert(hash, SingleGroupAggregator::from_state(&plan, &state)?);
        }

        debug!(groups = groups.len(), "restored grouping table from cursor");
        Ok(Self { plan, groups })
    }

    /// Routes one rewritten document into its group, creating the group's
    /// aggregator on first sight. The aggregator instance for a key is
    /// stable for the rest of the query.
    pub fn add_payload(&mut self, projection: &RewrittenProjection) -> Result<(), PipelineError> {
        let key = fingerprint_array(&projection.group_by_items);

        if !self.groups.contains_key(&key) {
            if let Some(limit) = self.plan.max_groups() {
                if self.groups.len() >= limit {
                    return Err(PipelineError::GroupingCardinalityExceeded { limit });
                }
            }
            self.groups
                .insert(key, SingleGroupAggregator::new(&self.plan));
        }

        // contains_key above guarantees the entry exists.
        match self.groups.get_mut(&key) {
            Some(aggregator) => aggregator.add_values(&projection.payload),
            None => Err(PipelineError::Internal(
                "grouping table lost a freshly inserted group".to_string(),
            )),
        }
    }

    /// Removes up to `max_item_count` groups in iteration order and emits
    /// their results. Destructive: a drained group cannot be re-entered, so
    /// draining must only begin once the source is exhausted.
    pub fn drain(&mut self, max_item_count: usize) -> Vec<DocValue> {
        let n = max_item_count.min(self.groups.len());
        self.groups
            .drain(0..n)
            .filter_map(|(_, aggregator)| aggregator.result())
            .collect()
    }

    /// Serializes the still-resident groups: decimal fingerprint keys,
    /// string-encoded aggregator cursors, in iteration order.
    pub fn cursor(&self) -> Result<String, PipelineError> {
        let mut obj = Map::with_capacity(self.groups.len());
        for (key, aggregator) in &self.groups {
            let state = serde_json::to_string(&aggregator.state()).map_err(|e| {
                PipelineError::Internal(format!("aggregator state serialization failed: {e}"))
            })?;
            obj.insert(key.to_string(), JsonValue::String(state));
        }
        serde_json::to_string(&JsonValue::Object(obj)).map_err(|e| {
            PipelineError::Internal(format!("grouping table serialization failed: {e}"))
        })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
