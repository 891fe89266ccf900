use serde_json::{json, Map, Value};

use crate::engine::types::DocValue;

/// Builds documents in the rewritten `{groupByItems, payload}` shape the
/// GROUP BY stage consumes.
pub struct RewrittenDocFactory {
    group_by_items: Vec<Value>,
    payload: Map<String, Value>,
    raw_payload: Option<Value>,
}

impl RewrittenDocFactory {
    pub fn new() -> Self {
        Self {
            group_by_items: Vec::new(),
            payload: Map::new(),
            raw_payload: None,
        }
    }

    /// Appends a grouping-key component.
    pub fn with_group_key(mut self, value: impl Into<Value>) -> Self {
        let value: Value = value.into();
        self.group_by_items.push(json!({ "item": value }));
        self
    }

    /// Appends an undefined grouping-key component (no `item` field).
    pub fn with_undefined_group_key(mut self) -> Self {
        self.group_by_items.push(json!({}));
        self
    }

    /// Payload entry for a scalar (passthrough) alias.
    pub fn with_scalar(mut self, alias: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(alias.to_string(), value.into());
        self
    }

    /// Payload entry for an aggregate alias, wrapped as `{"item": value}`.
    pub fn with_aggregate(mut self, alias: &str, value: impl Into<Value>) -> Self {
        let value: Value = value.into();
        self.payload.insert(alias.to_string(), json!({ "item": value }));
        self
    }

    /// Aggregate alias entry carrying no `item`, i.e. an undefined input.
    pub fn with_undefined_aggregate(mut self, alias: &str) -> Self {
        self.payload.insert(alias.to_string(), json!({}));
        self
    }

    /// Replaces the whole payload, for `SELECT VALUE` shapes.
    pub fn with_value_payload(mut self, payload: Value) -> Self {
        self.raw_payload = Some(payload);
        self
    }

    pub fn create(self) -> DocValue {
        let payload = self
            .raw_payload
            .unwrap_or(Value::Object(self.payload));
        DocValue::from(json!({
            "groupByItems": self.group_by_items,
            "payload": payload,
        }))
    }
}

impl Default for RewrittenDocFactory {
    fn default() -> Self {
        Self::new()
    }
}
