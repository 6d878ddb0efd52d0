//! Pipeline monitoring.
//!
//! [`PipelineMonitor`] owns the state of every registered pipeline, drives
//! stage transitions, samples resources in the background and publishes
//! [`PipelineEvent`](crate::core::PipelineEvent)s.

mod alerts;
mod config;
mod graph;
mod sampler;
mod tracker;

pub use self::alerts::{check_thresholds, Alert};
pub use self::config::{AlertThresholds, MonitorConfig};
pub use self::graph::validate_stages;
#[cfg(test)]
pub use self::sampler::MockResourceSampler;
pub use self::sampler::{FixedSampler, ResourceSampler, SimulatedSampler};
pub use self::tracker::PipelineMonitor;
