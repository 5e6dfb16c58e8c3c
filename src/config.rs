use std::path::Path;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Marker substrings located in the benchmark output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Markers {
    pub tasklet: String,
    pub host_time: String,
    pub preproc_time: String,
    pub postproc_time: String,
    pub compression_ratio: String,
    pub prepare: String,
    pub alloc: String,
    pub load: String,
    pub copy_in: String,
    pub copy_out: String,
    pub free: String,
}

impl Default for Markers {
    fn default() -> Self {
        Markers {
            tasklet: "Tasklet".to_string(),
            host_time: "Host time".to_string(),
            preproc_time: "Pre-processing time".to_string(),
            postproc_time: "Post-processing time".to_string(),
            compression_ratio: "Compression ratio".to_string(),
            prepare: "Prepare time".to_string(),
            alloc: "Alloc time".to_string(),
            load: "Load time".to_string(),
            copy_in: "Copy in time".to_string(),
            copy_out: "Copy out time".to_string(),
            free: "Free time".to_string(),
        }
    }
}

/// Parameters shared by every extractor and aggregator.
///
/// Loaded from JSON with missing fields falling back to [`Default`], so a
/// config file only needs to name what differs between experiments.
#[derive(Serialize, Deserialize, Builder, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// DPU clock in Hz.
    #[builder(default = 266_000_000.0)]
    pub clock_hz: f64,
    #[builder(default = 24)]
    pub max_tasklets: u32,
    #[builder(default = 640)]
    pub max_dpus: u32,
    #[builder(default = 32768)]
    pub block_size: u64,
    /// Position of the cycle count on a tasklet line, counted from the end.
    /// 2 for `Tasklet 0: completed in 1234 cycles`, 4 for
    /// `Tasklet 0: 1234 cycles, 4096 bytes`.
    #[builder(default = 2)]
    pub cycle_field_from_end: usize,
    /// Add pre/post-processing time to the host runtime.
    #[builder(default = true)]
    pub host_includes_prepost: bool,
    #[builder(default)]
    pub markers: Markers,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig::builder().build()
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        let config = serde_json::from_str(&text).map_err(|source| AnalysisError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "clock_hz": 267000000.0, "cycle_field_from_end": 4 }"#)
                .unwrap();

        assert_eq!(config.clock_hz, 267_000_000.0);
        assert_eq!(config.cycle_field_from_end, 4);
        assert_eq!(config.max_tasklets, 24);
        assert_eq!(config.markers.host_time, "Host time");
    }

    #[test]
    fn marker_override() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "markers": { "tasklet": "TL" } }"#).unwrap();

        assert_eq!(config.markers.tasklet, "TL");
        assert_eq!(config.markers.compression_ratio, "Compression ratio");
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AnalysisConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
