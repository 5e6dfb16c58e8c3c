//! Single-file extractors.
//!
//! Each extractor scans one log for lines containing a marker and parses a
//! whitespace-delimited token of that line. A missing marker or an
//! unparseable payload yields `None`; only failing to read the file is an
//! error.

use std::path::Path;
use std::str::FromStr;

use crate::config::{AnalysisConfig, Markers};
use crate::error::{AnalysisError, Result};
use crate::metric::{Metric, Overhead};

pub fn read_log(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| AnalysisError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `from_end` = 1 is the last token.
fn field_from_end<T: FromStr>(line: &str, from_end: usize) -> Option<T> {
    if from_end == 0 {
        return None;
    }
    line.split_whitespace().rev().nth(from_end - 1)?.parse().ok()
}

/// Largest cycle count reported on any tasklet line.
pub fn max_cycles_in(text: &str, marker: &str, from_end: usize) -> Option<u64> {
    text.lines()
        .filter(|line| line.contains(marker))
        .filter_map(|line| {
            let cycles = field_from_end::<u64>(line, from_end);
            if cycles.is_none() {
                tracing::trace!(line, "skipping tasklet line without cycle count");
            }
            cycles
        })
        .max()
}

/// Last token of the first marker line that parses as a number.
pub fn last_value_in(text: &str, marker: &str) -> Option<f64> {
    text.lines()
        .filter(|line| line.contains(marker))
        .find_map(|line| field_from_end::<f64>(line, 1))
}

pub fn overhead_in(text: &str, markers: &Markers) -> Overhead {
    let phase = |marker: &str| last_value_in(text, marker).unwrap_or(0.0);

    Overhead {
        prepare: phase(&markers.prepare),
        alloc: phase(&markers.alloc),
        load: phase(&markers.load),
        copy_in: phase(&markers.copy_in),
        copy_out: phase(&markers.copy_out),
        free: phase(&markers.free),
    }
}

/// Reads log files and pulls single metrics out of them.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Extractor { config }
    }

    pub fn max_cycles(&self, path: &Path) -> Result<Option<u64>> {
        let text = read_log(path)?;
        Ok(max_cycles_in(
            &text,
            &self.config.markers.tasklet,
            self.config.cycle_field_from_end,
        ))
    }

    pub fn host_runtime(&self, path: &Path) -> Result<Option<f64>> {
        self.last_value(path, &self.config.markers.host_time)
    }

    pub fn preproc_time(&self, path: &Path) -> Result<Option<f64>> {
        self.last_value(path, &self.config.markers.preproc_time)
    }

    pub fn postproc_time(&self, path: &Path) -> Result<Option<f64>> {
        self.last_value(path, &self.config.markers.postproc_time)
    }

    pub fn compression_ratio(&self, path: &Path) -> Result<Option<f64>> {
        self.last_value(path, &self.config.markers.compression_ratio)
    }

    pub fn overhead(&self, path: &Path) -> Result<Overhead> {
        let text = read_log(path)?;
        Ok(overhead_in(&text, &self.config.markers))
    }

    pub fn metric(&self, metric: Metric, path: &Path) -> Result<Option<f64>> {
        match metric {
            Metric::MaxCycles => Ok(self.max_cycles(path)?.map(|c| c as f64)),
            Metric::HostRuntime => self.host_runtime(path),
            Metric::PreprocTime => self.preproc_time(path),
            Metric::PostprocTime => self.postproc_time(path),
            Metric::CompressionRatio => self.compression_ratio(path),
        }
    }

    fn last_value(&self, path: &Path, marker: &str) -> Result<Option<f64>> {
        let text = read_log(path)?;
        Ok(last_value_in(&text, marker))
    }
}
