use serde_json::{Map, Value as JsonValue};

use crate::engine::errors::PipelineError;
use crate::engine::types::DocValue;

use super::ops::AggregatorImpl;
use super::plan::GroupByPlan;

/// The composite aggregator for one grouping key: one column aggregator per
/// output alias, stitched back into a result document when the group is
/// drained.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleGroupAggregator {
    aggregators: Vec<(String, AggregatorImpl)>,
    has_select_value: bool,
}

impl SingleGroupAggregator {
    pub fn new(plan: &GroupByPlan) -> Self {
        let aggregators = plan
            .aliases()
            .iter()
            .map(|alias| (alias.clone(), AggregatorImpl::from_kind(plan.kind_of(alias))))
            .collect();
        Self {
            aggregators,
            has_select_value: plan.has_select_value(),
        }
    }

    /// Restores a group from the cursor state written by [`Self::state`].
    /// Alias order comes from the plan, so key order in the state object is
    /// irrelevant.
    pub fn from_state(plan: &GroupByPlan, state: &JsonValue) -> Result<Self, PipelineError> {
        let obj = state.as_object().ok_or_else(|| {
            PipelineError::malformed_continuation(
                &state.to_string(),
                "aggregator cursor must be an object",
            )
        })?;

        let mut aggregators = Vec::with_capacity(plan.aliases().len());
        for alias in plan.aliases() {
            let alias_state = obj.get(alias).ok_or_else(|| {
                PipelineError::malformed_continuation(
                    &state.to_string(),
                    format!("aggregator cursor is missing alias `{alias}`"),
                )
            })?;
            aggregators.push((
                alias.clone(),
                AggregatorImpl::from_state(plan.kind_of(alias), alias_state)?,
            ));
        }

        Ok(Self {
            aggregators,
            has_select_value: plan.has_select_value(),
        })
    }

    /// Feeds one rewritten payload into the per-alias aggregators.
    ///
    /// In `SELECT VALUE` mode the payload itself is the single aggregated
    /// value; otherwise it is an object keyed by alias. Aggregate kinds
    /// receive their value wrapped as `{"item": v}` and a missing `item` is
    /// undefined; scalar aliases take the value as-is.
    pub fn add_values(&mut self, payload: &DocValue) -> Result<(), PipelineError> {
        if self.has_select_value {
            if let Some((_, aggregator)) = self.aggregators.first_mut() {
                feed(aggregator, Some(payload))?;
            }
            return Ok(());
        }

        if !matches!(payload, DocValue::Object(_)) {
            return Err(PipelineError::MalformedProjection(format!(
                "payload must be an object, got {}",
                payload.type_name()
            )));
        }
        for (alias, aggregator) in &mut self.aggregators {
            feed(aggregator, payload.get(alias))?;
        }
        Ok(())
    }

    /// Stitches the per-alias results into the group's output document.
    /// Aliases with undefined results are omitted; a `SELECT VALUE` group
    /// yields the bare aggregated value (or `None` when it is undefined).
    pub fn result(&self) -> Option<DocValue> {
        if self.has_select_value {
            return self
                .aggregators
                .first()
                .and_then(|(_, aggregator)| aggregator.result());
        }

        let fields = self
            .aggregators
            .iter()
            .filter_map(|(alias, aggregator)| {
                aggregator.result().map(|value| (alias.clone(), value))
            })
            .collect();
        Some(DocValue::Object(fields))
    }

    /// Cursor state: one entry per alias, in alias order.
    pub fn state(&self) -> JsonValue {
        let mut obj = Map::with_capacity(self.aggregators.len());
        for (alias, aggregator) in &self.aggregators {
            obj.insert(alias.clone(), aggregator.state());
        }
        JsonValue::Object(obj)
    }
}

fn feed(
    aggregator: &mut AggregatorImpl,
    raw: Option<&DocValue>,
) -> Result<(), PipelineError> {
    let value = if aggregator.is_aggregate() {
        raw.and_then(|v| v.get("item"))
    } else {
        raw
    };
    aggregator.add_value(value)
}
