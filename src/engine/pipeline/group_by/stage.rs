use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::engine::errors::PipelineError;
use crate::engine::pipeline::continuation::GroupByContinuation;
use crate::engine::pipeline::page::{PageMetrics, QueryPage};
use crate::engine::pipeline::stage::{
    BoxedStage, CursorState, ExecutionEnvironment, PipelineStage, SourceFactory,
    DISALLOW_INLINE_CURSOR,
};

use super::grouping_table::GroupingTable;
use super::plan::GroupByPlan;
use super::projection::RewrittenProjection;

/// `disallow_cursor_reason` on Client emit-phase pages: once groups are
/// being handed out, a Client consumer cannot resume mid-stream.
pub const DISALLOW_MID_EMIT_CONTINUATION: &str =
    "Cross-partition GROUP BY cannot be resumed while results are being emitted";

/// Accumulates aggregate state per grouping key across all pages of all
/// partitions, then emits completed groups on demand.
///
/// Two phases: while the source still has pages ("fill"), every drain feeds
/// the grouping table and returns an empty page with the source's metrics.
/// Once the source is exhausted ("emit"), drains hand out groups from the
/// table until it is empty.
pub struct GroupByStage {
    environment: ExecutionEnvironment,
    /// `None` after an emit-phase resume: the source was already exhausted
    /// when the continuation was cut.
    source: Option<BoxedStage>,
    table: GroupingTable,
    last_activity_id: String,
}

impl GroupByStage {
    pub async fn create(
        environment: ExecutionEnvironment,
        plan: GroupByPlan,
        continuation: Option<String>,
        create_source: SourceFactory,
    ) -> Result<Self, PipelineError> {
        let plan = Arc::new(plan);

        let (table, source) = match continuation {
            None => (
                GroupingTable::new(Arc::clone(&plan)),
                Some(create_source(None).await?),
            ),
            Some(token) => {
                let parsed = GroupByContinuation::parse(&token)?;
                let table = match parsed.grouping_table_token {
                    Some(table_token) => GroupingTable::from_cursor(Arc::clone(&plan), &table_token)?,
                    None => GroupingTable::new(Arc::clone(&plan)),
                };
                let source = match parsed.source_token {
                    Some(source_token) => Some(create_source(Some(source_token)).await?),
                    None => {
                        debug!(groups = table.len(), "resuming group-by in emit phase");
                        None
                    }
                };
                (table, source)
            }
        };

        Ok(Self {
            environment,
            source,
            table,
            last_activity_id: Uuid::new_v4().to_string(),
        })
    }

    fn emit_cursor(&self) -> Result<CursorState, PipelineError> {
        match self.environment {
            ExecutionEnvironment::Client => Ok(CursorState::Unavailable),
            ExecutionEnvironment::Compute => {
                let token =
                    GroupByContinuation::new(None, Some(self.table.cursor()?)).to_token()?;
                Ok(CursorState::Available(token))
            }
        }
    }
}

#[async_trait]
impl PipelineStage for GroupByStage {
    async fn drain(
        &mut self,
        max_elements: usize,
        cancel: &CancellationToken,
    ) -> Result<QueryPage, PipelineError> {
        if let Some(source) = self.source.as_mut() {
            if !source.is_done() {
                let page = source.drain(max_elements, cancel).await?;
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

                // A malformed projection fails the page before any group
                // state changes.
                let projections = elements
                    .iter()
                    .map(RewrittenProjection::parse)
                    .collect::<Result<Vec<_>, _>>()?;
                for projection in &projections {
                    self.table.add_payload(projection)?;
                }
                self.last_activity_id = metrics.activity_id.clone();

                // Results are held back until every input has been seen.
                let mut out = QueryPage::success(Vec::new(), metrics);
                match self.environment {
                    ExecutionEnvironment::Client => {
                        if let Some(source_cursor) = source_cursor {
                            let token = GroupByContinuation::new(
                                Some(source_cursor),
                                Some(self.table.cursor()?),
                            )
                            .to_token()?;
                            out.cursor = Some(token);
                        }
                    }
                    ExecutionEnvironment::Compute => {
                        out.disallow_cursor_reason = Some(DISALLOW_INLINE_CURSOR.to_string());
                    }
                }
                return Ok(out);
            }
        }

        let results = self.table.drain(max_elements);
        debug!(
            emitted = results.len(),
            remaining = self.table.len(),
            "draining grouping table"
        );

        let mut out = QueryPage::success(results, PageMetrics::for_activity(&self.last_activity_id));
        out.disallow_cursor_reason = Some(match self.environment {
            ExecutionEnvironment::Client => DISALLOW_MID_EMIT_CONTINUATION.to_string(),
            ExecutionEnvironment::Compute => DISALLOW_INLINE_CURSOR.to_string(),
        });
        Ok(out)
    }

    fn try_get_cursor(&self) -> Result<CursorState, PipelineError> {
        if self.is_done() {
            return Ok(CursorState::Done);
        }

        if let Some(source) = &self.source {
            if !source.is_done() {
                return match source.try_get_cursor()? {
                    CursorState::Available(source_token) => {
                        let token = GroupByContinuation::new(
                            Some(source_token),
                            Some(self.table.cursor()?),
                        )
                        .to_token()?;
                        Ok(CursorState::Available(token))
                    }
                    CursorState::Unavailable => Ok(CursorState::Unavailable),
                    // The source finished between drains; only groups remain.
                    CursorState::Done => self.emit_cursor(),
                };
            }
        }
        self.emit_cursor()
    }

    fn is_done(&self) -> bool {
        let source_done = self.source.as_ref().map_or(true, |s| s.is_done());
        source_done && self.table.is_empty()
    }
}
