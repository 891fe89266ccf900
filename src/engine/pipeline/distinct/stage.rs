use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::errors::PipelineError;
use crate::engine::pipeline::continuation::DistinctContinuation;
use crate::engine::pipeline::page::QueryPage;
use crate::engine::pipeline::stage::{
    BoxedStage, CursorState, ExecutionEnvironment, PipelineStage, SourceFactory,
    DISALLOW_INLINE_CURSOR,
};

use super::distinct_map::{DistinctMap, DistinctQueryType};

/// Suppresses duplicates across all pages of all partitions.
///
/// Every drained source page is filtered through the distinct map; admitted
/// elements keep their source order. The page may legitimately be empty while
/// the stage is not done (all source items were duplicates).
pub struct DistinctStage {
    environment: ExecutionEnvironment,
    source: BoxedStage,
    map: DistinctMap,
}

impl DistinctStage {
    pub async fn create(
        environment: ExecutionEnvironment,
        distinct_query_type: DistinctQueryType,
        continuation: Option<String>,
        create_source: SourceFactory,
    ) -> Result<Self, PipelineError> {
        let (source_token, map_token) = match continuation {
            Some(token) => {
                let parsed = DistinctContinuation::parse(&token)?;
                (parsed.source_token, parsed.distinct_map_token)
            }
            None => (None, None),
        };

        let map = DistinctMap::new(distinct_query_type, map_token.as_deref())?;
        if !map.is_empty() {
            debug!(restored = map.len(), %environment, "resuming distinct stage");
        }
        let source = create_source(source_token).await?;

        Ok(Self {
            environment,
            source,
            map,
        })
    }
}

#[async_trait]
impl PipelineStage for DistinctStage {
    async fn drain(
        &mut self,
        max_elements: usize,
        cancel: &CancellationToken,
    ) -> Result<QueryPage, PipelineError> {
        let page = self.source.drain(max_elements, cancel).await?;
        if !page.success {
            debug!(activity_id = %page.metrics.activity_id, "passing through failure page");
            return Ok(page);
        }

        let QueryPage {
            elements,
            cursor: source_cursor,
            metrics,
            ..
        } = page;

        let mut admitted = Vec::with_capacity(elements.len());
        for element in elements {
            if self.map.add(&element).0 {
                admitted.push(element);
            }
        }

        let mut out = QueryPage::success(admitted, metrics);
        match self.environment {
            ExecutionEnvironment::Client => {
                if let (Some(source_cursor), false) = (source_cursor, self.is_done()) {
                    let token =
                        DistinctContinuation::new(Some(source_cursor), Some(self.map.cursor()?))
                            .to_token()?;
                    out.cursor = Some(token);
                }
            }
            ExecutionEnvironment::Compute => {
                out.disallow_cursor_reason = Some(DISALLOW_INLINE_CURSOR.to_string());
            }
        }
        Ok(out)
    }

    fn try_get_cursor(&self) -> Result<CursorState, PipelineError> {
        if self.is_done() {
            return Ok(CursorState::Done);
        }
        match self.source.try_get_cursor()? {
            CursorState::Done => Ok(CursorState::Done),
            CursorState::Unavailable => Ok(CursorState::Unavailable),
            CursorState::Available(source_token) => {
                let token =
                    DistinctContinuation::new(Some(source_token), Some(self.map.cursor()?))
                        .to_token()?;
                Ok(CursorState::Available(token))
            }
        }
    }

    fn is_done(&self) -> bool {
        self.source.is_done()
    }
}
