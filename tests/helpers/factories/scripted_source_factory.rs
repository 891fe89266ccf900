use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::engine::errors::PipelineError;
use crate::engine::pipeline::{
    BoxedStage, CursorState, PageMetrics, PipelineStage, QueryPage, SourceFactory,
};
use crate::engine::types::DocValue;

#[derive(Clone)]
enum ScriptedPage {
    Data(Vec<DocValue>),
    Failure,
}

/// Scripts a partition-backed source stage page by page, with optional
/// failure injection and positional cursors, so stage tests can interrupt
/// and resume at any prefix.
#[derive(Clone)]
pub struct ScriptedSourceFactory {
    pages: Vec<ScriptedPage>,
    emit_cursors: bool,
    request_charge: f64,
}

impl ScriptedSourceFactory {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            emit_cursors: true,
            request_charge: 1.0,
        }
    }

    pub fn with_page(mut self, elements: Vec<Value>) -> Self {
        self.pages.push(ScriptedPage::Data(
            elements.iter().map(DocValue::from_json).collect(),
        ));
        self
    }

    pub fn with_doc_page(mut self, elements: Vec<DocValue>) -> Self {
        self.pages.push(ScriptedPage::Data(elements));
        self
    }

    /// Injects one transient failure page at this point of the script.
    pub fn with_failure(mut self) -> Self {
        self.pages.push(ScriptedPage::Failure);
        self
    }

    /// Makes the source refuse to supply cursors, like a partition fetcher
    /// mid-flight.
    pub fn without_cursors(mut self) -> Self {
        self.emit_cursors = false;
        self
    }

    pub fn with_request_charge(mut self, charge: f64) -> Self {
        self.request_charge = charge;
        self
    }

    pub fn create(&self) -> ScriptedSource {
        ScriptedSource {
            pages: self.pages.clone(),
            position: 0,
            offset: 0,
            emit_cursors: self.emit_cursors,
            request_charge: self.request_charge,
        }
    }

    pub fn create_at(&self, cursor: Option<&str>) -> Result<ScriptedSource, PipelineError> {
        let (position, offset) = match cursor {
            None => (0, 0),
            Some(raw) => {
                let value: Value = serde_json::from_str(raw)
                    .map_err(|e| PipelineError::malformed_continuation(raw, e))?;
                let page = value.get("page").and_then(Value::as_u64).ok_or_else(|| {
                    PipelineError::malformed_continuation(raw, "missing `page` position")
                })?;
                let offset = value.get("offset").and_then(Value::as_u64).unwrap_or(0);
                (page as usize, offset as usize)
            }
        };

        let mut source = self.create();
        source.position = position;
        source.offset = offset;
        Ok(source)
    }

    /// The `create_source` callback handed to stage factories.
    pub fn source_factory(&self) -> SourceFactory {
        let factory = self.clone();
        Box::new(move |cursor: Option<String>| {
            Box::pin(async move {
                let source = factory.create_at(cursor.as_deref())?;
                Ok(Box::new(source) as BoxedStage)
            })
        })
    }
}

impl Default for ScriptedSourceFactory {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ScriptedSource {
    pages: Vec<ScriptedPage>,
    position: usize,
    offset: usize,
    emit_cursors: bool,
    request_charge: f64,
}

impl ScriptedSource {
    fn cursor_token(&self) -> String {
        json!({ "page": self.position, "offset": self.offset }).to_string()
    }
}

#[async_trait]
impl PipelineStage for ScriptedSource {
    async fn drain(
        &mut self,
        max_elements: usize,
        cancel: &CancellationToken,
    ) -> Result<QueryPage, PipelineError> {
        if cancel.is_cancelled() {
            let mut metrics = PageMetrics::new();
            metrics.diagnostics.push("drain cancelled".to_string());
            return Ok(QueryPage::failure(metrics));
        }
        if self.is_done() {
            return Ok(QueryPage::success(Vec::new(), PageMetrics::new()));
        }

        match self.pages[self.position].clone() {
            ScriptedPage::Failure => {
                self.position += 1;
                let mut metrics = PageMetrics::new();
                metrics
                    .diagnostics
                    .push("injected partition failure".to_string());
                Ok(QueryPage::failure(metrics))
            }
            ScriptedPage::Data(elements) => {
                let end = (self.offset + max_elements).min(elements.len());
                let served: Vec<DocValue> = elements[self.offset..end].to_vec();
                if end >= elements.len() {
                    self.position += 1;
                    self.offset = 0;
                } else {
                    self.offset = end;
                }

                let mut metrics = PageMetrics::new();
                metrics.request_charge = self.request_charge;
                metrics.response_bytes = served
                    .iter()
                    .map(|e| e.to_json().to_string().len() as u64)
                    .sum();

                let mut page = QueryPage::success(served, metrics);
                if self.emit_cursors && !self.is_done() {
                    page.cursor = Some(self.cursor_token());
                }
                Ok(page)
            }
        }
    }

    fn try_get_cursor(&self) -> Result<CursorState, PipelineError> {
        if self.is_done() {
            return Ok(CursorState::Done);
        }
        if self.emit_cursors {
            Ok(CursorState::Available(self.cursor_token()))
        } else {
            Ok(CursorState::Unavailable)
        }
    }

    fn is_done(&self) -> bool {
        self.position >= self.pages.len()
    }
}
