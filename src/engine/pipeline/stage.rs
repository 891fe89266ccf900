use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::engine::errors::PipelineError;
use crate::engine::pipeline::page::QueryPage;

/// `disallow_cursor_reason` stamped on pages by stages that only hand out
/// continuation tokens through [`PipelineStage::try_get_cursor`].
pub const DISALLOW_INLINE_CURSOR: &str = "Use TryGetCursor";

/// Where a stage runs, which decides how continuation tokens leave it.
///
/// `Client` stages may inline a cursor on each response page. `Compute`
/// stages never do; the caller asks for one explicitly via `try_get_cursor`
/// and decides when to serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEnvironment {
    Client,
    Compute,
}

impl FromStr for ExecutionEnvironment {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Client" => Ok(ExecutionEnvironment::Client),
            "Compute" => Ok(ExecutionEnvironment::Compute),
            other => Err(PipelineError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for ExecutionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionEnvironment::Client => "Client",
            ExecutionEnvironment::Compute => "Compute",
        })
    }
}

/// Outcome of asking a stage for a continuation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    /// The stage is finished; there is nothing to resume.
    Done,
    /// A token that resumes the stage at its current logical position.
    Available(String),
    /// The underlying source cannot supply a cursor right now.
    Unavailable,
}

/// A node in the query execution pipeline.
///
/// Stages are single-threaded cooperative: callers must await one `drain`
/// before issuing the next. `is_done` is monotonic.
#[async_trait]
pub trait PipelineStage: Send {
    /// Produces the next page with at most `max_elements` elements. Fewer
    /// elements (including zero) do not imply the stage is done. The
    /// cancellation token is forwarded to the source; a cancelled or failed
    /// source surfaces as a failure page and leaves stage state untouched.
    async fn drain(
        &mut self,
        max_elements: usize,
        cancel: &CancellationToken,
    ) -> Result<QueryPage, PipelineError>;

    fn try_get_cursor(&self) -> Result<CursorState, PipelineError>;

    fn is_done(&self) -> bool;
}

pub type BoxedStage = Box<dyn PipelineStage>;

pub type SourceFuture = Pin<Box<dyn Future<Output = Result<BoxedStage, PipelineError>> + Send>>;

/// Supplied by the upstream pipeline builder: takes the source's own
/// continuation token (if resuming) and produces the source stage.
pub type SourceFactory = Box<dyn FnOnce(Option<String>) -> SourceFuture + Send>;
