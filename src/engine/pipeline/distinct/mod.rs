mod distinct_map;
mod stage;

pub use distinct_map::{DistinctMap, DistinctQueryType};
pub use stage::DistinctStage;

#[cfg(test)]
mod stage_test;
