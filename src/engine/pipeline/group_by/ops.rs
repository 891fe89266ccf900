use std::cmp::Ordering;

use serde_json::{json, Map, Value as JsonValue};

use crate::engine::errors::PipelineError;
use crate::engine::types::{compare_values, DocValue};

use super::plan::AggregateKind;

/// Per-alias aggregator with concrete implementations per kind.
///
/// `None` inputs stand for undefined (a missing payload alias or a missing
/// `item`). Each aggregator serializes its internal state to JSON for
/// continuation tokens and restores from the same shape.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatorImpl {
    Scalar(ScalarAgg),
    Count(CountAgg),
    Sum(SumAgg),
    Min(MinAgg),
    Max(MaxAgg),
    Average(AverageAgg),
}

impl AggregatorImpl {
    pub fn from_kind(kind: Option<AggregateKind>) -> Self {
        match kind {
            None => Self::Scalar(ScalarAgg::new()),
            Some(AggregateKind::Count) => Self::Count(CountAgg::new()),
            Some(AggregateKind::Sum) => Self::Sum(SumAgg::new()),
            Some(AggregateKind::Min) => Self::Min(MinAgg::new()),
            Some(AggregateKind::Max) => Self::Max(MaxAgg::new()),
            Some(AggregateKind::Average) => Self::Average(AverageAgg::new()),
        }
    }

    pub fn from_state(
        kind: Option<AggregateKind>,
        state: &JsonValue,
    ) -> Result<Self, PipelineError> {
        match kind {
            None => Ok(Self::Scalar(ScalarAgg::from_state(state)?)),
            Some(AggregateKind::Count) => Ok(Self::Count(CountAgg::from_state(state)?)),
            Some(AggregateKind::Sum) => Ok(Self::Sum(SumAgg::from_state(state)?)),
            Some(AggregateKind::Min) => Ok(Self::Min(MinAgg::from_state(state)?)),
            Some(AggregateKind::Max) => Ok(Self::Max(MaxAgg::from_state(state)?)),
            Some(AggregateKind::Average) => Ok(Self::Average(AverageAgg::from_state(state)?)),
        }
    }

    /// Whether inputs arrive wrapped as `{"item": v}`.
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, AggregatorImpl::Scalar(_))
    }

    pub fn add_value(&mut self, value: Option<&DocValue>) -> Result<(), PipelineError> {
        match self {
            AggregatorImpl::Scalar(a) => a.add(value),
            AggregatorImpl::Count(a) => a.add(value),
            AggregatorImpl::Sum(a) => a.add(value),
            AggregatorImpl::Min(a) => a.add(value),
            AggregatorImpl::Max(a) => a.add(value),
            AggregatorImpl::Average(a) => a.add(value),
        }
    }

    /// Final value for the alias; `None` is undefined and is omitted from
    /// the stitched result document.
    pub fn result(&self) -> Option<DocValue> {
        match self {
            AggregatorImpl::Scalar(a) => a.result(),
            AggregatorImpl::Count(a) => a.result(),
            AggregatorImpl::Sum(a) => a.result(),
            AggregatorImpl::Min(a) => a.result(),
            AggregatorImpl::Max(a) => a.result(),
            AggregatorImpl::Average(a) => a.result(),
        }
    }

    pub fn state(&self) -> JsonValue {
        match self {
            AggregatorImpl::Scalar(a) => a.state(),
            AggregatorImpl::Count(a) => a.state(),
            AggregatorImpl::Sum(a) => a.state(),
            AggregatorImpl::Min(a) => a.state(),
            AggregatorImpl::Max(a) => a.state(),
            AggregatorImpl::Average(a) => a.state(),
        }
    }
}

fn bad_state(state: &JsonValue, reason: &str) -> PipelineError {
    PipelineError::malformed_continuation(&state.to_string(), reason)
}

/// Passthrough for grouping-key columns: the first defined value wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarAgg {
    value: Option<DocValue>,
}

impl ScalarAgg {
    pub fn new() -> Self {
        Self { value: None }
    }

    fn add(&mut self, value: Option<&DocValue>) -> Result<(), PipelineError> {
        if self.value.is_none() {
            self.value = value.cloned();
        }
        Ok(())
    }

    fn result(&self) -> Option<DocValue> {
        self.value.clone()
    }

    fn state(&self) -> JsonValue {
        match &self.value {
            Some(v) => json!({ "value": v.to_json() }),
            None => json!({}),
        }
    }

    fn from_state(state: &JsonValue) -> Result<Self, PipelineError> {
        let obj = state
            .as_object()
            .ok_or_else(|| bad_state(state, "scalar state must be an object"))?;
        Ok(Self {
            value: obj.get("value").map(DocValue::from_json),
        })
    }
}

/// Sums the integer partial counts the partitions report.
#[derive(Debug, Clone, PartialEq)]
pub struct CountAgg {
    count: i64,
}

impl CountAgg {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    fn add(&mut self, value: Option<&DocValue>) -> Result<(), PipelineError> {
        match value {
            None => Ok(()),
            Some(DocValue::Int(n)) => {
                self.count += n;
                Ok(())
            }
            Some(other) => Err(PipelineError::Internal(format!(
                "COUNT aggregator received a {} partial count",
                other.type_name()
            ))),
        }
    }

    fn result(&self) -> Option<DocValue> {
        Some(DocValue::Int(self.count))
    }

    fn state(&self) -> JsonValue {
        json!(self.count)
    }

    fn from_state(state: &JsonValue) -> Result<Self, PipelineError> {
        let count = state
            .as_i64()
            .ok_or_else(|| bad_state(state, "count state must be an integer"))?;
        Ok(Self { count })
    }
}

/// Arithmetic sum over numeric inputs. Any undefined or non-numeric input
/// makes the result stick to undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct SumAgg {
    sum: f64,
    all_integers: bool,
    undefined: bool,
}

impl SumAgg {
    pub fn new() -> Self {
        Self {
            sum: 0.0,
            all_integers: true,
            undefined: false,
        }
    }

    fn add(&mut self, value: Option<&DocValue>) -> Result<(), PipelineError> {
        if self.undefined {
            return Ok(());
        }
        match value {
            Some(DocValue::Int(i)) => self.sum += *i as f64,
            Some(DocValue::Float(f)) => {
                self.sum += f;
                self.all_integers = false;
            }
            _ => self.undefined = true,
        }
        Ok(())
    }

    fn result(&self) -> Option<DocValue> {
        if self.undefined {
            None
        } else if self.all_integers {
            Some(DocValue::Int(self.sum as i64))
        } else {
            Some(DocValue::Float(self.sum))
        }
    }

    fn state(&self) -> JsonValue {
        json!({
            "sum": self.sum,
            "allIntegers": self.all_integers,
            "undefined": self.undefined,
        })
    }

    fn from_state(state: &JsonValue) -> Result<Self, PipelineError> {
        let obj = state
            .as_object()
            .ok_or_else(|| bad_state(state, "sum state must be an object"))?;
        let sum = obj
            .get("sum")
            .and_then(JsonValue::as_f64)
            .ok_or_else(|| bad_state(state, "sum state is missing `sum`"))?;
        let all_integers = obj
            .get("allIntegers")
            .and_then(JsonValue::as_bool)
            .ok_or_else(|| bad_state(state, "sum state is missing `allIntegers`"))?;
        let undefined = obj
            .get("undefined")
            .and_then(JsonValue::as_bool)
            .ok_or_else(|| bad_state(state, "sum state is missing `undefined`"))?;
        Ok(Self {
            sum,
            all_integers,
            undefined,
        })
    }
}

/// Running minimum under the total order
/// `Undefined < Null < Bool < Number < String`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinAgg {
    seen: bool,
    current: Option<DocValue>,
}

impl MinAgg {
    pub fn new() -> Self {
        Self {
            seen: false,
            current: None,
        }
    }

    fn add(&mut self, value: Option<&DocValue>) -> Result<(), PipelineError> {
        reject_unordered("MIN", value)?;
        if !self.seen {
            self.seen = true;
            self.current = value.cloned();
        } else if compare_values(value, self.current.as_ref()) == Ordering::Less {
            self.current = value.cloned();
        }
        Ok(())
    }

    fn result(&self) -> Option<DocValue> {
        self.current.clone()
    }

    fn state(&self) -> JsonValue {
        extremum_state(self.seen, &self.current)
    }

    fn from_state(state: &JsonValue) -> Result<Self, PipelineError> {
        let (seen, current) = extremum_from_state(state)?;
        Ok(Self { seen, current })
    }
}

/// Running maximum under the same total order as [`MinAgg`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaxAgg {
    seen: bool,
    current: Option<DocValue>,
}

impl MaxAgg {
    pub fn new() -> Self {
        Self {
            seen: false,
            current: None,
        }
    }

    fn add(&mut self, value: Option<&DocValue>) -> Result<(), PipelineError> {
        reject_unordered("MAX", value)?;
        if !self.seen {
            self.seen = true;
            self.current = value.cloned();
        } else if compare_values(value, self.current.as_ref()) == Ordering::Greater {
            self.current = value.cloned();
        }
        Ok(())
    }

    fn result(&self) -> Option<DocValue> {
        self.current.clone()
    }

    fn state(&self) -> JsonValue {
        extremum_state(self.seen, &self.current)
    }

    fn from_state(state: &JsonValue) -> Result<Self, PipelineError> {
        let (seen, current) = extremum_from_state(state)?;
        Ok(Self { seen, current })
    }
}

fn reject_unordered(name: &str, value: Option<&DocValue>) -> Result<(), PipelineError> {
    match value {
        Some(v) if matches!(v, DocValue::Array(_) | DocValue::Object(_)) => {
            Err(PipelineError::Internal(format!(
                "{name} aggregator received a {}",
                v.type_name()
            )))
        }
        _ => Ok(()),
    }
}

fn extremum_state(seen: bool, current: &Option<DocValue>) -> JsonValue {
    let mut obj = Map::new();
    obj.insert("seen".to_string(), json!(seen));
    if let Some(v) = current {
        obj.insert("value".to_string(), v.to_json());
    }
    JsonValue::Object(obj)
}

fn extremum_from_state(state: &JsonValue) -> Result<(bool, Option<DocValue>), PipelineError> {
    let obj = state
        .as_object()
        .ok_or_else(|| bad_state(state, "extremum state must be an object"))?;
    let seen = obj
        .get("seen")
        .and_then(JsonValue::as_bool)
        .ok_or_else(|| bad_state(state, "extremum state is missing `seen`"))?;
    Ok((seen, obj.get("value").map(DocValue::from_json)))
}

/// Pair of running sum and count; only numeric inputs participate.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageAgg {
    sum: f64,
    count: u64,
}

impl AverageAgg {
    pub fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: Option<&DocValue>) -> Result<(), PipelineError> {
        if let Some(f) = value.and_then(DocValue::as_f64) {
            self.sum += f;
            self.count += 1;
        }
        Ok(())
    }

    fn result(&self) -> Option<DocValue> {
        if self.count == 0 {
            None
        } else {
            Some(DocValue::Float(self.sum / self.count as f64))
        }
    }

    fn state(&self) -> JsonValue {
        json!({ "sum": self.sum, "count": self.count })
    }

    fn from_state(state: &JsonValue) -> Result<Self, PipelineError> {
        let obj = state
            .as_object()
            .ok_or_else(|| bad_state(state, "average state must be an object"))?;
        let sum = obj
            .get("sum")
            .and_then(JsonValue::as_f64)
            .ok_or_else(|| bad_state(state, "average state is missing `sum`"))?;
        let count = obj
            .get("count")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| bad_state(state, "average state is missing `count`"))?;
        Ok(Self { sum, count })
    }
}
