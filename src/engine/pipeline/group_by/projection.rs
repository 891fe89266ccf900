use crate::engine::errors::PipelineError;
use crate::engine::types::DocValue;

/// A source element in the rewritten `{groupByItems, payload}` form the
/// upstream query rewrite produces. `groupByItems` is the ordered grouping
/// key tuple; `payload` drives the aggregator updates.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenProjection {
    pub group_by_items: Vec<DocValue>,
    pub payload: DocValue,
}

impl RewrittenProjection {
    pub fn parse(document: &DocValue) -> Result<Self, PipelineError> {
        if !matches!(document, DocValue::Object(_)) {
            return Err(PipelineError::MalformedProjection(format!(
                "expected an object, got {}",
                document.type_name()
            )));
        }

        let group_by_items = match document.get("groupByItems") {
            Some(DocValue::Array(items)) => items.clone(),
            Some(other) => {
                return Err(PipelineError::MalformedProjection(format!(
                    "`groupByItems` must be an array, got {}",
                    other.type_name()
                )))
            }
            None => {
                return Err(PipelineError::MalformedProjection(
                    "missing required field `groupByItems`".to_string(),
                ))
            }
        };

        let payload = document
            .get("payload")
            .cloned()
            .ok_or_else(|| {
                PipelineError::MalformedProjection(
                    "missing required field `payload`".to_string(),
                )
            })?;

        Ok(Self {
            group_by_items,
            payload,
        })
    }
}
