//! Resource sampling for the background monitor loop.

use crate::core::{PipelineStatus, ResourceUsage, StageStatus};
use crate::utils::now_utc;
use rand::Rng;

/// Produces a resource snapshot for a pipeline on each sampler tick.
#[cfg_attr(test, mockall::automock)]
pub trait ResourceSampler: Send + Sync {
    /// Samples current resource usage attributable to `pipeline`.
    fn sample(&self, pipeline: &PipelineStatus) -> ResourceUsage;
}

/// A sampler that synthesizes plausible load figures.
///
/// Load grows with the number of running stages and jitters on every tick.
/// It stands in for a host probe when none is wired in.
#[derive(Debug, Clone)]
pub struct SimulatedSampler {
    memory_total_mb: f64,
    disk_total_gb: f64,
}

impl Default for SimulatedSampler {
    fn default() -> Self {
        Self {
            memory_total_mb: 16_384.0,
            disk_total_gb: 512.0,
        }
    }
}

impl SimulatedSampler {
    /// Creates a simulated sampler for a host of the given size.
    #[must_use]
    pub fn new(memory_total_mb: f64, disk_total_gb: f64) -> Self {
        Self {
            memory_total_mb,
            disk_total_gb,
        }
    }
}

impl ResourceSampler for SimulatedSampler {
    fn sample(&self, pipeline: &PipelineStatus) -> ResourceUsage {
        let mut rng = rand::thread_rng();
        let running = pipeline
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Running)
            .count() as f64;

        let memory_percent = (20.0 + running * 15.0 + rng.gen_range(-5.0..5.0)).clamp(0.0, 100.0);
        let cpu_percent = (10.0 + running * 25.0 + rng.gen_range(-10.0..10.0)).clamp(0.0, 100.0);
        let disk_percent = (30.0 + rng.gen_range(0.0_f64..5.0)).clamp(0.0, 100.0);

        ResourceUsage {
            memory_used_mb: self.memory_total_mb * memory_percent / 100.0,
            memory_total_mb: self.memory_total_mb,
            memory_percent,
            cpu_percent,
            disk_used_gb: self.disk_total_gb * disk_percent / 100.0,
            disk_total_gb: self.disk_total_gb,
            disk_percent,
            network_in_kbps: running * rng.gen_range(100.0..1_000.0),
            network_out_kbps: running * rng.gen_range(50.0..500.0),
            sampled_at: now_utc(),
        }
    }
}

/// A sampler that always reports the same figures.
#[derive(Debug, Clone, Default)]
pub struct FixedSampler {
    usage: ResourceUsage,
}

impl FixedSampler {
    /// Creates a fixed sampler.
    #[must_use]
    pub fn new(usage: ResourceUsage) -> Self {
        Self { usage }
    }
}

impl ResourceSampler for FixedSampler {
    fn sample(&self, _pipeline: &PipelineStatus) -> ResourceUsage {
        ResourceUsage {
            sampled_at: now_utc(),
            ..self.usage.clone()
        }
    }
}
