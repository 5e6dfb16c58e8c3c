//! CSV tables handed to the chart renderer.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use bon::builder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::aggregate::LogDir;
use crate::case::TestCaseKey;
use crate::error::{AnalysisError, Result};
use crate::ratio;

/// One point of a speedup sweep. `scale` is the tasklet or DPU count,
/// depending on which table the row came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpeedupRow {
    pub version: String,
    pub time: f64,
    #[serde(alias = "tasklets", alias = "dpus")]
    pub scale: u32,
}

impl SpeedupRow {
    /// Baseline row every speedup table starts with.
    pub fn host() -> Self {
        SpeedupRow {
            version: "host".to_string(),
            time: 1.0,
            scale: 0,
        }
    }

    pub fn is_host(&self) -> bool {
        self.version == "host"
    }
}

/// Which parameter a speedup table varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Scale {
    Tasklets,
    Dpus,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    pub prepare: f64,
    pub alloc: f64,
    pub load: f64,
    pub copy_in: f64,
    pub run: f64,
    pub copy_out: f64,
    pub free: f64,
    pub dpus: u32,
}

impl BreakdownRow {
    pub fn total(&self) -> f64 {
        self.prepare + self.alloc + self.load + self.copy_in + self.run + self.copy_out + self.free
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ComprTaskletRow {
    pub tasklets: u32,
    pub time: f64,
    pub compratio: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TradeoffRow {
    pub dpus: u32,
    pub tasklets: u32,
    pub mcycles: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub version: String,
    pub testfile: String,
    pub dpu_time: Option<f64>,
    pub host_time: Option<f64>,
    pub compratio: Option<f64>,
}

/// How many tasklets a DPU sweep runs with at each DPU count.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskletPolicy {
    Fixed(u32),
    /// Size the tasklet count to `<inputs>/<test file>.txt`.
    Optimal { inputs: PathBuf },
}

impl TaskletPolicy {
    pub fn resolve(&self, logs: &LogDir<'_>, test_file: &str, dpus: u32) -> Result<u32> {
        match self {
            TaskletPolicy::Fixed(tasklets) => Ok(*tasklets),
            TaskletPolicy::Optimal { inputs } => {
                let config = logs.config();
                ratio::optimal_tasklets_for_file(
                    &inputs.join(format!("{test_file}.txt")),
                    config.block_size,
                    dpus,
                    config.max_tasklets,
                )
            }
        }
    }
}

fn speedup_for(logs: &LogDir<'_>, key: &TestCaseKey) -> Result<Option<f64>> {
    let Some(host) = logs.avg_host_runtime(&key.test_file)? else {
        tracing::warn!(case = %key, "no host baseline");
        return Ok(None);
    };
    let Some(cycles) = logs.avg_max_cycles(key)? else {
        tracing::warn!(case = %key, "no dpu trials");
        return Ok(None);
    };
    let overhead = logs.avg_prepostproc_time(key)?.map_or(0.0, |a| a.mean);

    Ok(ratio::speedup(
        host.mean,
        cycles.mean,
        overhead,
        logs.config().clock_hz,
    ))
}

/// Speedup over host for each test file as the tasklet count varies.
#[builder]
pub fn speedup_by_tasklets<'a>(
    logs: &LogDir<'a>,
    test_files: &[String],
    dpus: u32,
    tasklets: &[u32],
) -> Result<Vec<SpeedupRow>> {
    let mut rows = vec![SpeedupRow::host()];
    for test_file in test_files {
        for &t in tasklets {
            let key = TestCaseKey::dpu(test_file.as_str(), dpus, t);
            if let Some(time) = speedup_for(logs, &key)? {
                rows.push(SpeedupRow {
                    version: test_file.clone(),
                    time,
                    scale: t,
                });
            }
        }
    }
    Ok(rows)
}

/// Speedup over host for each test file as the DPU count varies.
#[builder]
pub fn speedup_by_dpus<'a>(
    logs: &LogDir<'a>,
    test_files: &[String],
    dpus: &[u32],
    tasklets: &TaskletPolicy,
) -> Result<Vec<SpeedupRow>> {
    let mut rows = vec![SpeedupRow::host()];
    for test_file in test_files {
        for &d in dpus {
            let t = tasklets.resolve(logs, test_file, d)?;
            let key = TestCaseKey::dpu(test_file.as_str(), d, t);
            if let Some(time) = speedup_for(logs, &key)? {
                rows.push(SpeedupRow {
                    version: test_file.clone(),
                    time,
                    scale: d,
                });
            }
        }
    }
    Ok(rows)
}

/// Where the time of one test file goes as the DPU count varies.
pub fn breakdown(
    logs: &LogDir<'_>,
    test_file: &str,
    dpus: &[u32],
    tasklets: u32,
) -> Result<Vec<BreakdownRow>> {
    let mut rows = Vec::new();
    for &d in dpus {
        let key = TestCaseKey::dpu(test_file, d, tasklets);
        let Some(cycles) = logs.avg_max_cycles(&key)? else {
            tracing::warn!(case = %key, "no dpu trials");
            continue;
        };
        let run = ratio::dpu_seconds(cycles.mean, logs.config().clock_hz);
        if run <= 0.0 {
            tracing::warn!(case = %key, "no dpu run time");
            continue;
        }
        let overhead = logs.avg_overhead(&key)?.unwrap_or_default();

        rows.push(BreakdownRow {
            prepare: overhead.prepare,
            alloc: overhead.alloc,
            load: overhead.load,
            copy_in: overhead.copy_in,
            run,
            copy_out: overhead.copy_out,
            free: overhead.free,
            dpus: d,
        });
    }
    Ok(rows)
}

/// DPU time and compression ratio of one test file per tasklet count.
/// Fails on the first configuration without trials.
pub fn compr_by_tasklets(
    logs: &LogDir<'_>,
    test_file: &str,
    dpus: u32,
    tasklets: &[u32],
) -> Result<Vec<ComprTaskletRow>> {
    let mut rows = Vec::new();
    for &t in tasklets {
        let key = TestCaseKey::dpu(test_file, dpus, t);
        let time = logs
            .avg_dpu_seconds(&key)?
            .ok_or_else(|| AnalysisError::MissingData(key.to_string()))?;
        let compratio = logs
            .compression_ratio(&key)?
            .ok_or_else(|| AnalysisError::MissingData(format!("compression ratio of {key}")))?;

        rows.push(ComprTaskletRow {
            tasklets: t,
            time,
            compratio,
        });
    }
    Ok(rows)
}

/// Kernel cycles (in millions) over a DPU x tasklet grid.
/// Fails on the first configuration without trials.
pub fn tradeoff(
    logs: &LogDir<'_>,
    test_file: &str,
    dpus: &[u32],
    tasklets: &[u32],
) -> Result<Vec<TradeoffRow>> {
    let mut rows = Vec::with_capacity(dpus.len() * tasklets.len());
    for &t in tasklets {
        for &d in dpus {
            let key = TestCaseKey::dpu(test_file, d, t);
            let cycles = logs
                .avg_max_cycles(&key)?
                .ok_or_else(|| AnalysisError::MissingData(key.to_string()))?;
            rows.push(TradeoffRow {
                dpus: d,
                tasklets: t,
                mcycles: cycles.mean / 1_000_000.0,
            });
        }
    }
    Ok(rows)
}

/// Side-by-side numbers for several result directories (one per codec).
pub fn compare(
    versions: &[(String, LogDir<'_>)],
    cases: &[TestCaseKey],
) -> Result<Vec<ComparisonRow>> {
    let mut rows = Vec::new();
    for (version, logs) in versions {
        for key in cases {
            rows.push(ComparisonRow {
                version: version.clone(),
                testfile: key.test_file.clone(),
                dpu_time: logs.avg_dpu_seconds(key)?,
                host_time: logs.avg_host_runtime(&key.test_file)?.map(|a| a.mean),
                compratio: logs.compression_ratio(key)?,
            });
        }
    }
    Ok(rows)
}

/// Speedup tables name their scale column after the swept parameter. The
/// baseline row is written as `host,1,0`.
pub fn write_speedup<W: Write>(writer: W, scale: Scale, rows: &[SpeedupRow]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(["version", "time", &scale.to_string()])?;
    for row in rows {
        if *row == SpeedupRow::host() {
            csv.write_record(["host", "1", "0"])?;
        } else {
            csv.serialize(row)?;
        }
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Reads a speedup table along with the parameter its third column sweeps.
pub fn read_speedup<R: Read>(reader: R) -> Result<(Scale, Vec<SpeedupRow>)> {
    let mut csv = csv::Reader::from_reader(reader);
    let scale = csv
        .headers()?
        .get(2)
        .and_then(|column| column.parse::<Scale>().ok())
        .ok_or_else(|| {
            AnalysisError::invalid_argument("speedup table needs a tasklets or dpus column")
        })?;
    let rows = csv
        .deserialize()
        .collect::<std::result::Result<Vec<SpeedupRow>, _>>()?;
    Ok((scale, rows))
}

pub fn read_rows<R: Read, T: DeserializeOwned>(reader: R) -> Result<Vec<T>> {
    csv::Reader::from_reader(reader)
        .deserialize()
        .map(|row| row.map_err(AnalysisError::from))
        .collect()
}

pub fn create_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
    }
    std::fs::File::create(path).map_err(|e| AnalysisError::io(path, e))
}

pub fn open_file(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| AnalysisError::io(path, e))
}
