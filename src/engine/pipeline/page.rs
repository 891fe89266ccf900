use uuid::Uuid;

use crate::engine::types::DocValue;

/// Per-page accounting copied between stages. A stage that filters or holds
/// back elements still propagates the source page's metrics unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetrics {
    pub activity_id: String,
    pub request_charge: f64,
    pub diagnostics: Vec<String>,
    pub response_bytes: u64,
}

impl PageMetrics {
    pub fn new() -> Self {
        Self {
            activity_id: Uuid::new_v4().to_string(),
            request_charge: 0.0,
            diagnostics: Vec::new(),
            response_bytes: 0,
        }
    }

    /// Zeroed metrics that keep only the activity id, for pages produced
    /// without a partition round-trip.
    pub fn for_activity(activity_id: &str) -> Self {
        Self {
            activity_id: activity_id.to_string(),
            request_charge: 0.0,
            diagnostics: Vec::new(),
            response_bytes: 0,
        }
    }
}

impl Default for PageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// One response page of a pipeline stage.
///
/// `success: false` marks a transient partition failure travelling through
/// the pipeline untouched; elements are always empty on failure pages.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage {
    pub success: bool,
    pub elements: Vec<DocValue>,
    pub cursor: Option<String>,
    pub disallow_cursor_reason: Option<String>,
    pub metrics: PageMetrics,
}

impl QueryPage {
    pub fn success(elements: Vec<DocValue>, metrics: PageMetrics) -> Self {
        Self {
            success: true,
            elements,
            cursor: None,
            disallow_cursor_reason: None,
            metrics,
        }
    }

    pub fn failure(metrics: PageMetrics) -> Self {
        Self {
            success: false,
            elements: Vec::new(),
            cursor: None,
            disallow_cursor_reason: None,
            metrics,
        }
    }
}
