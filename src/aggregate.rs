//! Directory aggregators.
//!
//! A results directory holds one file per trial. Queries select the trials of
//! a [`TestCaseKey`] by file name and average what the extractors find.

use std::path::{Path, PathBuf};

use crate::case::TestCaseKey;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::extract::{self, Extractor};
use crate::metric::{Aggregate, Metric, Overhead};

#[derive(Debug, Clone)]
pub struct LogDir<'a> {
    path: PathBuf,
    config: &'a AnalysisConfig,
}

impl<'a> LogDir<'a> {
    pub fn new(path: impl Into<PathBuf>, config: &'a AnalysisConfig) -> Self {
        LogDir {
            path: path.into(),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    /// Files of `key`, sorted by name. The listing is taken once per call.
    pub fn matching_files(&self, key: &TestCaseKey) -> Result<Vec<PathBuf>> {
        let entries =
            std::fs::read_dir(&self.path).map_err(|e| AnalysisError::io(&self.path, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AnalysisError::io(&self.path, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if key.matches(name) {
                files.push(path);
            }
        }
        files.sort();

        tracing::debug!(case = %key, matched = files.len(), dir = %self.path.display(), "listed trials");
        Ok(files)
    }

    /// Runs `f` on every trial of `key`, keeping the values it finds.
    /// Unreadable trials are logged and left out.
    fn collect<T>(
        &self,
        key: &TestCaseKey,
        mut f: impl FnMut(&Extractor<'_>, &Path) -> Result<Option<T>>,
    ) -> Result<Vec<T>> {
        let extractor = Extractor::new(self.config);
        let mut values = Vec::new();

        for file in self.matching_files(key)? {
            match f(&extractor, &file) {
                Ok(Some(value)) => values.push(value),
                Ok(None) => {
                    tracing::warn!(file = %file.display(), case = %key, "no value in trial, excluded")
                }
                Err(e) => tracing::warn!(case = %key, "skipping trial: {e}"),
            }
        }

        Ok(values)
    }

    pub fn avg_max_cycles(&self, key: &TestCaseKey) -> Result<Option<Aggregate>> {
        let samples = self.collect(key, |ex, file| {
            Ok(ex.max_cycles(file)?.map(|c| c as f64))
        })?;
        Ok(Aggregate::from_samples(&samples))
    }

    /// Host baseline of `test_file`. Pre/post-processing is added when the
    /// config says so; a trial without a host time is left out.
    pub fn avg_host_runtime(&self, test_file: &str) -> Result<Option<Aggregate>> {
        let key = TestCaseKey::host(test_file);
        let include_prepost = self.config.host_includes_prepost;
        let markers = &self.config.markers;

        let samples = self.collect(&key, |_, file| {
            let text = extract::read_log(file)?;
            let Some(host) = extract::last_value_in(&text, &markers.host_time) else {
                return Ok(None);
            };
            if !include_prepost {
                return Ok(Some(host));
            }
            let pre = extract::last_value_in(&text, &markers.preproc_time).unwrap_or(0.0);
            let post = extract::last_value_in(&text, &markers.postproc_time).unwrap_or(0.0);
            Ok(Some(host + pre + post))
        })?;
        Ok(Aggregate::from_samples(&samples))
    }

    pub fn avg_prepostproc_time(&self, key: &TestCaseKey) -> Result<Option<Aggregate>> {
        let markers = &self.config.markers;
        let samples = self.collect(key, |_, file| {
            let text = extract::read_log(file)?;
            let pre = extract::last_value_in(&text, &markers.preproc_time).unwrap_or(0.0);
            let post = extract::last_value_in(&text, &markers.postproc_time).unwrap_or(0.0);
            Ok(Some(pre + post))
        })?;
        Ok(Aggregate::from_samples(&samples))
    }

    pub fn avg_overhead(&self, key: &TestCaseKey) -> Result<Option<Overhead>> {
        let samples = self.collect(key, |ex, file| ex.overhead(file).map(Some))?;
        Ok(Overhead::mean(&samples))
    }

    /// Ratio of the first trial (by name) that reports one.
    pub fn compression_ratio(&self, key: &TestCaseKey) -> Result<Option<f64>> {
        let extractor = Extractor::new(self.config);
        for file in self.matching_files(key)? {
            match extractor.compression_ratio(&file) {
                Ok(Some(ratio)) => return Ok(Some(ratio)),
                Ok(None) => continue,
                Err(e) => tracing::warn!(case = %key, "skipping trial: {e}"),
            }
        }
        Ok(None)
    }

    /// Mean of any single-file metric over the trials of `key`.
    pub fn avg_metric(&self, metric: Metric, key: &TestCaseKey) -> Result<Option<Aggregate>> {
        let samples = self.collect(key, |ex, file| ex.metric(metric, file))?;
        Ok(Aggregate::from_samples(&samples))
    }

    /// DPU-side time in seconds: kernel cycles at the configured clock plus
    /// pre/post-processing.
    pub fn avg_dpu_seconds(&self, key: &TestCaseKey) -> Result<Option<f64>> {
        let Some(cycles) = self.avg_max_cycles(key)? else {
            return Ok(None);
        };
        let overhead = self.avg_prepostproc_time(key)?.map_or(0.0, |a| a.mean);
        Ok(Some(
            crate::ratio::dpu_seconds(cycles.mean, self.config.clock_hz) + overhead,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn missing_directory_is_an_error() {
        let config = AnalysisConfig::default();
        let logs = LogDir::new("/nonexistent/results", &config);
        assert!(logs.avg_max_cycles(&TestCaseKey::dpu("alice", 1, 1)).is_err());
    }

    #[test]
    fn subdirectories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("alice_dpus=1_tasklets=1.txt")).unwrap();

        let config = AnalysisConfig::default();
        let logs = LogDir::new(dir.path(), &config);
        let key = TestCaseKey::dpu("alice", 1, 1);
        assert!(logs.matching_files(&key).unwrap().is_empty());
        assert_eq!(logs.avg_max_cycles(&key).unwrap(), None);
    }

    #[test]
    fn host_runtime_with_and_without_prepost() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "xml_host.txt",
            "Pre-processing time: 0.5\nHost time: 2.0\nPost-processing time: 0.5\n",
        );

        let config = AnalysisConfig::default();
        let logs = LogDir::new(dir.path(), &config);
        assert_eq!(logs.avg_host_runtime("xml").unwrap().unwrap().mean, 3.0);

        let config = AnalysisConfig::builder().host_includes_prepost(false).build();
        let logs = LogDir::new(dir.path(), &config);
        assert_eq!(logs.avg_host_runtime("xml").unwrap().unwrap().mean, 2.0);
    }

    #[test]
    fn dpu_seconds_adds_prepost() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "sao_dpus=2_tasklets=8.txt",
            "Tasklet 0: completed in 266000000 cycles\nPre-processing time: 0.25\n",
        );

        let config = AnalysisConfig::default();
        let logs = LogDir::new(dir.path(), &config);
        let secs = logs
            .avg_dpu_seconds(&TestCaseKey::dpu("sao", 2, 8))
            .unwrap()
            .unwrap();
        assert_eq!(secs, 1.25);
    }
}
