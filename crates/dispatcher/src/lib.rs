pub mod aggregator;
pub mod plan;
pub mod scheduler;

pub use aggregator::{ResultAggregator, RunReport};
pub use plan::{JobPlan, PLACEHOLDER};
pub use scheduler::RangeScheduler;
