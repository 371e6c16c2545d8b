//! Statistics and metrics

pub mod metrics;

pub(crate) use metrics::BindingCounters;
pub use metrics::{BindingStats, RegistryStats, TopicStats};
