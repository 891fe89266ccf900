mod grouping_table;
mod ops;
mod plan;
mod projection;
mod single_group;
mod stage;

pub use grouping_table::GroupingTable;
pub use ops::AggregatorImpl;
pub use plan::{AggregateKind, GroupByPlan};
pub use projection::RewrittenProjection;
pub use single_group::SingleGroupAggregator;
pub use stage::{GroupByStage, DISALLOW_MID_EMIT_CONTINUATION};
