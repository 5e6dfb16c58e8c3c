use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use bon::builder;
use dpu_bench::TestCaseKey;
use quanta::Instant;
use strum::IntoEnumIterator;

use crate::layout::{Mode, ResultsLayout};

/// The benchmark program and the tree it is built in.
pub struct Bench {
    /// Build tool run in `build_dir`, normally `make`.
    pub make: PathBuf,
    pub build_dir: PathBuf,
    pub binary: PathBuf,
    pub inputs: PathBuf,
}

impl Bench {
    /// `make clean` followed by `make`, with the DPU topology when given.
    pub fn rebuild(&self, topology: Option<(u32, u32)>) -> Result<()> {
        self.make(&["clean".to_string()])?;
        let vars = match topology {
            Some((dpus, tasklets)) => {
                vec![format!("NR_DPUS={dpus}"), format!("NR_TASKLETS={tasklets}")]
            }
            None => Vec::new(),
        };
        self.make(&vars)
    }

    fn make(&self, args: &[String]) -> Result<()> {
        tracing::debug!(?args, "make");
        let status = Command::new(&self.make)
            .args(args)
            .current_dir(&self.build_dir)
            .stdout(Stdio::null())
            .status()
            .with_context(|| format!("running {}", self.make.display()))?;
        if !status.success() {
            bail!("{} {} failed with {status}", self.make.display(), args.join(" "));
        }
        Ok(())
    }

    /// Runs one trial with stdout redirected to `log`. Returns wall seconds.
    pub fn run_to(&self, args: &[String], log: &Path) -> Result<f64> {
        let out = File::create(log).with_context(|| format!("creating {}", log.display()))?;

        println!("{} {} > {}", self.binary.display(), args.join(" "), log.display());
        let start = Instant::now();
        let status = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.build_dir)
            .stdout(out)
            .status()
            .with_context(|| format!("running {}", self.binary.display()))?;
        let elapsed = start.elapsed().as_secs_f64();

        if !status.success() {
            tracing::warn!(log = %log.display(), %status, "benchmark exited unsuccessfully");
        }
        Ok(elapsed)
    }
}

/// Test files with the (dpus, tasklets) configurations to run for each.
pub type Plan = Vec<(String, Vec<(u32, u32)>)>;

/// Runs every configuration of `plan` in both directions, `trials` times
/// each. Stops early, between invocations, once `running` is cleared.
/// Returns the number of benchmark invocations made.
#[builder]
pub fn trial_loop(
    bench: &Bench,
    layout: &ResultsLayout,
    plan: &Plan,
    trials: u32,
    with_host: bool,
    running: Arc<AtomicBool>,
) -> Result<usize> {
    let mut invocations = 0;
    let suffix = |trial: u32| if trials > 1 { trial + 1 } else { 0 };

    'outer: for (test_file, configs) in plan {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        if with_host {
            bench.rebuild(None)?;
            let key = TestCaseKey::host(test_file.as_str());
            for trial in 0..trials {
                for mode in Mode::iter() {
                    if !running.load(Ordering::Relaxed) {
                        break 'outer;
                    }
                    let input = mode.input(&bench.inputs, test_file);
                    let log = layout.log_file(mode, &key, suffix(trial));
                    let secs = bench.run_to(&mode.args(&input, false), &log)?;
                    tracing::info!(case = %key, %mode, secs, "host trial done");
                    invocations += 1;
                }
            }
        }

        for &(dpus, tasklets) in configs {
            if !running.load(Ordering::Relaxed) {
                break 'outer;
            }
            bench.rebuild(Some((dpus, tasklets)))?;
            let key = TestCaseKey::dpu(test_file.as_str(), dpus, tasklets);
            for trial in 0..trials {
                for mode in Mode::iter() {
                    if !running.load(Ordering::Relaxed) {
                        break 'outer;
                    }
                    let input = mode.input(&bench.inputs, test_file);
                    let log = layout.log_file(mode, &key, suffix(trial));
                    let secs = bench.run_to(&mode.args(&input, true), &log)?;
                    tracing::info!(case = %key, %mode, trial, secs, "dpu trial done");
                    invocations += 1;
                }
            }
        }
    }

    if !running.load(Ordering::Relaxed) {
        tracing::warn!(invocations, "stopped before the plan finished");
    }
    Ok(invocations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench(make: &str, build_dir: &Path) -> Bench {
        Bench {
            make: make.into(),
            build_dir: build_dir.to_path_buf(),
            binary: "echo".into(),
            inputs: PathBuf::from("inputs"),
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn results(dir: &Path) -> ResultsLayout {
        let layout = ResultsLayout::new(dir.join("results"));
        layout.create().unwrap();
        layout
    }

    #[test]
    fn single_trial_logs_have_no_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let layout = results(dir.path());
        let plan: Plan = vec![("alice".to_string(), vec![(4, 2)])];

        let invocations = trial_loop()
            .bench(&bench("true", dir.path()))
            .layout(&layout)
            .plan(&plan)
            .trials(1)
            .with_host(true)
            .running(Arc::new(AtomicBool::new(true)))
            .call()
            .unwrap();

        assert_eq!(invocations, 4);
        for mode in Mode::iter() {
            assert_eq!(
                file_names(&layout.mode_dir(mode)),
                vec!["alice_dpus=4_tasklets=2.txt", "alice_host.txt"]
            );
        }
        let key = TestCaseKey::dpu("alice", 4, 2);
        let log = std::fs::read_to_string(layout.log_file(Mode::Compression, &key, 0)).unwrap();
        assert_eq!(log.trim(), "-d -c -i inputs/alice.txt");
        let log =
            std::fs::read_to_string(layout.log_file(Mode::Decompression, &TestCaseKey::host("alice"), 0))
                .unwrap();
        assert_eq!(log.trim(), "-i inputs/alice.snappy");
    }

    #[test]
    fn repeated_trials_are_numbered_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let layout = results(dir.path());
        let plan: Plan = vec![("nci".to_string(), vec![(8, 4)])];

        let invocations = trial_loop()
            .bench(&bench("true", dir.path()))
            .layout(&layout)
            .plan(&plan)
            .trials(2)
            .with_host(false)
            .running(Arc::new(AtomicBool::new(true)))
            .call()
            .unwrap();

        assert_eq!(invocations, 4);
        assert_eq!(
            file_names(&layout.mode_dir(Mode::Compression)),
            vec![
                "nci_dpus=8_tasklets=4_trial=1.txt",
                "nci_dpus=8_tasklets=4_trial=2.txt",
            ]
        );
    }

    #[test]
    fn cleared_flag_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = results(dir.path());
        let plan: Plan = vec![("alice".to_string(), vec![(1, 1), (2, 1)])];

        let invocations = trial_loop()
            .bench(&bench("true", dir.path()))
            .layout(&layout)
            .plan(&plan)
            .trials(1)
            .with_host(true)
            .running(Arc::new(AtomicBool::new(false)))
            .call()
            .unwrap();

        assert_eq!(invocations, 0);
        for mode in Mode::iter() {
            assert!(file_names(&layout.mode_dir(mode)).is_empty());
        }
    }

    #[test]
    fn failed_build_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let layout = results(dir.path());
        let plan: Plan = vec![("alice".to_string(), vec![(1, 1)])];

        let result = trial_loop()
            .bench(&bench("false", dir.path()))
            .layout(&layout)
            .plan(&plan)
            .trials(1)
            .with_host(false)
            .running(Arc::new(AtomicBool::new(true)))
            .call();

        assert!(result.is_err());
        assert!(file_names(&layout.mode_dir(Mode::Compression)).is_empty());
    }
}
