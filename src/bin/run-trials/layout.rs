use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dpu_bench::TestCaseKey;
use dpu_bench::case::log_file_name;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Direction of a benchmark run. Each has its own results directory.
#[derive(Display, EnumIter, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Compression,
    Decompression,
}

impl Mode {
    /// Input file the benchmark binary reads for `test_file`.
    pub fn input(&self, inputs: &Path, test_file: &str) -> PathBuf {
        match self {
            Mode::Compression => inputs.join(format!("{test_file}.txt")),
            Mode::Decompression => inputs.join(format!("{test_file}.snappy")),
        }
    }

    /// Command line of the benchmark binary; `dpu` selects the DPU path.
    pub fn args(&self, input: &Path, dpu: bool) -> Vec<String> {
        let mut args = Vec::new();
        if dpu {
            args.push("-d".to_string());
        }
        if *self == Mode::Compression {
            args.push("-c".to_string());
        }
        args.push("-i".to_string());
        args.push(input.display().to_string());
        args
    }
}

/// `results/{compression,decompression}/<log files>` plus the CSV tables
/// next to them.
pub struct ResultsLayout {
    root: PathBuf,
}

impl ResultsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ResultsLayout { root: root.into() }
    }

    pub fn create(&self) -> Result<()> {
        for mode in Mode::iter() {
            let dir = self.mode_dir(mode);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn mode_dir(&self, mode: Mode) -> PathBuf {
        self.root.join(mode.to_string())
    }

    pub fn log_file(&self, mode: Mode, key: &TestCaseKey, trial: u32) -> PathBuf {
        self.mode_dir(mode).join(log_file_name(key, trial))
    }

    pub fn table(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
