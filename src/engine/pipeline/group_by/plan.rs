use std::collections::HashMap;
use std::str::FromStr;

use crate::engine::errors::PipelineError;

/// Aggregate requested for one output alias. A missing kind means scalar
/// passthrough (the alias carries a grouping-key column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Min,
    Max,
    Average,
}

impl FromStr for AggregateKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Count" => Ok(AggregateKind::Count),
            "Sum" => Ok(AggregateKind::Sum),
            "Min" => Ok(AggregateKind::Min),
            "Max" => Ok(AggregateKind::Max),
            "Average" => Ok(AggregateKind::Average),
            other => Err(PipelineError::InvalidAggregateSpec(format!(
                "unknown aggregate kind `{other}`"
            ))),
        }
    }
}

/// Static description of a GROUP BY projection, derived upstream from the
/// rewritten query: output aliases in projection order, the aggregate each
/// alias carries, and whether the query was a `SELECT VALUE`.
#[derive(Debug, Clone)]
pub struct GroupByPlan {
    ordered_aliases: Vec<String>,
    alias_kinds: HashMap<String, Option<AggregateKind>>,
    has_select_value: bool,
    max_groups: Option<usize>,
}

impl GroupByPlan {
    pub fn new(
        ordered_aliases: Vec<String>,
        alias_kinds: HashMap<String, Option<AggregateKind>>,
        has_select_value: bool,
    ) -> Result<Self, PipelineError> {
        if ordered_aliases.is_empty() {
            return Err(PipelineError::InvalidAggregateSpec(
                "a GROUP BY projection needs at least one output alias".to_string(),
            ));
        }
        if has_select_value && ordered_aliases.len() != 1 {
            return Err(PipelineError::InvalidAggregateSpec(format!(
                "SELECT VALUE admits exactly one aggregator, got {}",
                ordered_aliases.len()
            )));
        }
        for alias in alias_kinds.keys() {
            if !ordered_aliases.iter().any(|a| a == alias) {
                return Err(PipelineError::InvalidAggregateSpec(format!(
                    "aggregate alias `{alias}` is not in the projection"
                )));
            }
        }

        Ok(Self {
            ordered_aliases,
            alias_kinds,
            has_select_value,
            max_groups: None,
        })
    }

    /// Caps the number of live groups the stage may accumulate.
    pub fn with_max_groups(mut self, limit: Option<usize>) -> Self {
        self.max_groups = limit;
        self
    }

    /// Applies the globally configured cardinality cap. Embedding layers
    /// call this; tests and callers with their own policy pass an explicit
    /// limit instead.
    pub fn with_configured_limits(self) -> Self {
        let limit = crate::shared::config::CONFIG.pipeline.max_grouping_cardinality;
        self.with_max_groups(limit)
    }

    pub fn aliases(&self) -> &[String] {
        &self.ordered_aliases
    }

    /// Aggregate kind for an alias; aliases absent from the map are scalar.
    pub fn kind_of(&self, alias: &str) -> Option<AggregateKind> {
        self.alias_kinds.get(alias).copied().flatten()
    }

    pub fn has_select_value(&self) -> bool {
        self.has_select_value
    }

    pub fn max_groups(&self) -> Option<usize> {
        self.max_groups
    }
}
