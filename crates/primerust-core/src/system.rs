//! Host information and CPU usage sampling, backed by `sysinfo`.

use serde::{Deserialize, Serialize};
use sysinfo::System;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Snapshot of the machine a run executed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default = "not_available")]
    pub host_name: String,
    #[serde(default = "not_available")]
    pub processor_name: String,
    #[serde(default)]
    pub thread_count: usize,
    #[serde(default)]
    pub total_memory_gb: f64,
}

fn not_available() -> String {
    "N/A".to_string()
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            host_name: not_available(),
            processor_name: not_available(),
            thread_count: 0,
            total_memory_gb: 0.0,
        }
    }
}

impl SystemInfo {
    /// Reads the current host. Unknown values become `"N/A"` or zero.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let processor_name = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(not_available);
        let thread_count = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or_else(|_| sys.cpus().len());
        let total_memory_gb = (sys.total_memory() as f64 / BYTES_PER_GB * 100.0).round() / 100.0;

        Self {
            host_name: System::host_name().unwrap_or_else(not_available),
            processor_name,
            thread_count,
            total_memory_gb,
        }
    }
}

/// Global CPU usage sampler.
///
/// `sysinfo` computes usage between two refreshes, so the first refresh
/// happens on construction and each [`CpuSampler::sample`] reports usage since
/// the previous call. The mean of all samples describes the whole run.
pub struct CpuSampler {
    sys: System,
    total: f64,
    count: u32,
}

impl CpuSampler {
    pub fn start() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        Self {
            sys,
            total: 0.0,
            count: 0,
        }
    }

    /// Global usage (0–100) since the previous sample.
    pub fn sample(&mut self) -> f64 {
        self.sys.refresh_cpu();
        let usage = f64::from(self.sys.global_cpu_info().cpu_usage());
        let usage = if usage.is_finite() {
            usage.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.total += usage;
        self.count += 1;
        usage
    }

    /// Mean of the samples taken so far, zero without samples.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / f64::from(self.count)
        }
    }
}
