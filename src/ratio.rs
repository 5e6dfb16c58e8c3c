//! Derived values built from aggregated metrics.

use std::path::Path;

use crate::error::{AnalysisError, Result};

pub fn dpu_seconds(cycles: f64, clock_hz: f64) -> f64 {
    cycles / clock_hz
}

/// Host time over DPU time, `None` if the DPU side has no positive time.
pub fn speedup(host_secs: f64, dpu_cycles: f64, overhead_secs: f64, clock_hz: f64) -> Option<f64> {
    let dpu_secs = dpu_seconds(dpu_cycles, clock_hz) + overhead_secs;
    if dpu_secs > 0.0 && dpu_secs.is_finite() {
        Some(host_secs / dpu_secs)
    } else {
        None
    }
}

/// Percentage shown on host-speedup bars. Slowdowns are shifted by one so
/// they plot below zero.
pub fn display_percent(host_secs: f64, dpu_secs: f64) -> f64 {
    let ratio = host_secs / dpu_secs;
    if host_secs < dpu_secs {
        (ratio - 1.0) * 100.0
    } else {
        ratio * 100.0
    }
}

/// Tasklets per DPU when every block of the input goes to its own tasklet
/// and blocks are spread evenly across DPUs.
pub fn optimal_tasklets(
    file_size: u64,
    block_size: u64,
    dpus: u32,
    max_tasklets: u32,
) -> Result<u32> {
    if block_size == 0 {
        return Err(AnalysisError::invalid_argument("block size must be non-zero"));
    }
    if dpus == 0 {
        return Err(AnalysisError::invalid_argument("DPU count must be non-zero"));
    }

    let blocks = file_size.div_ceil(block_size);
    let tasklets = blocks.div_ceil(dpus as u64);
    Ok(tasklets.min(max_tasklets as u64) as u32)
}

pub fn optimal_tasklets_for_file(
    path: &Path,
    block_size: u64,
    dpus: u32,
    max_tasklets: u32,
) -> Result<u32> {
    let size = std::fs::metadata(path)
        .map_err(|e| AnalysisError::io(path, e))?
        .len();
    optimal_tasklets(size, block_size, dpus, max_tasklets)
}

/// `min, min + incr, ...` up to and including `max`.
pub fn sweep(min: u32, max: u32, incr: u32) -> Result<Vec<u32>> {
    if incr == 0 {
        return Err(AnalysisError::invalid_argument("increment must be non-zero"));
    }
    Ok((min..=max).step_by(incr as usize).collect())
}
