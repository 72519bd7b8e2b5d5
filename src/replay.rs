//! Experience storage: prioritized replay memory and multi-step aggregation

pub mod memory;
pub mod multi_step;

pub use memory::{PriorityEntry, PriorityParams, ReplayMemory, SampledBatch, lower_bound};
pub use multi_step::MultiStepAggregator;
