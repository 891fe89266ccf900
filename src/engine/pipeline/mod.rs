pub mod continuation;
pub mod distinct;
pub mod fingerprint;
pub mod group_by;
pub mod page;
pub mod stage;

pub use continuation::{DistinctContinuation, GroupByContinuation};
pub use page::{PageMetrics, QueryPage};
pub use stage::{
    BoxedStage, CursorState, ExecutionEnvironment, PipelineStage, SourceFactory, SourceFuture,
    DISALLOW_INLINE_CURSOR,
};

#[cfg(test)]
mod continuation_test;
