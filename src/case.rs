//! Test case selection by file name.
//!
//! Trial output files carry their configuration in the name, e.g.
//! `alice_dpus=16_tasklets=12_trial=2.txt` or `alice_host.txt`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static DPUS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"dpus=(\d+)").unwrap());
static TASKLETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"tasklets=(\d+)").unwrap());
static HOST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|[_.-])host(?:[_.-]|$)").unwrap());

/// Which side of the comparison produced a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Dpu { dpus: u32, tasklets: u32 },
}

/// Selects the trial files of one benchmark configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseKey {
    pub test_file: String,
    pub role: Role,
}

impl TestCaseKey {
    pub fn host(test_file: impl Into<String>) -> Self {
        TestCaseKey {
            test_file: test_file.into(),
            role: Role::Host,
        }
    }

    pub fn dpu(test_file: impl Into<String>, dpus: u32, tasklets: u32) -> Self {
        TestCaseKey {
            test_file: test_file.into(),
            role: Role::Dpu { dpus, tasklets },
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        if !file_name.contains(&self.test_file) {
            return false;
        }

        let tag = FileTag::parse(file_name);
        match self.role {
            Role::Host => tag.host,
            Role::Dpu { dpus, tasklets } => {
                tag.dpus.contains(&dpus) && tag.tasklets.contains(&tasklets)
            }
        }
    }
}

impl fmt::Display for TestCaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::Host => write!(f, "{} (host)", self.test_file),
            Role::Dpu { dpus, tasklets } => write!(
                f,
                "{} with {} dpus and {} tasklets",
                self.test_file, dpus, tasklets
            ),
        }
    }
}

/// Configuration tokens found in a file name.
///
/// Every `dpus=`/`tasklets=` occurrence is captured with its full digit run,
/// so `dpus=16` never reads as `dpus=1`. Counts written with leading zeros
/// (`dpus=01`) are not recognised. `host` must stand alone between
/// separators, so `ghost_dpus=4` is not a host run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileTag {
    pub dpus: Vec<u32>,
    pub tasklets: Vec<u32>,
    pub host: bool,
}

impl FileTag {
    pub fn parse(file_name: &str) -> Self {
        let numbers = |re: &Regex| {
            re.captures_iter(file_name)
                .map(|c| c.get(1).map_or("", |m| m.as_str()))
                .filter(|digits| *digits == "0" || !digits.starts_with('0'))
                .filter_map(|digits| digits.parse().ok())
                .collect()
        };

        FileTag {
            dpus: numbers(&DPUS),
            tasklets: numbers(&TASKLETS),
            host: HOST.is_match(file_name),
        }
    }
}

/// Canonical log file name for a trial, `trial` 0 meaning "no trial suffix".
pub fn log_file_name(key: &TestCaseKey, trial: u32) -> String {
    let stem = match key.role {
        Role::Host => format!("{}_host", key.test_file),
        Role::Dpu { dpus, tasklets } => {
            format!("{}_dpus={}_tasklets={}", key.test_file, dpus, tasklets)
        }
    };

    if trial == 0 {
        format!("{stem}.txt")
    } else {
        format!("{stem}_trial={trial}.txt")
    }
}
