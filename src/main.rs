use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dpu_bench::report::{self, Scale, TaskletPolicy};
use dpu_bench::{AnalysisConfig, LogDir, Metric, TestCaseKey, ratio};

#[derive(Parser, Debug)]
#[command(version, about = "Aggregate DPU compression benchmark logs", long_about = None)]
struct Cli {
    /// JSON file overriding markers, clock frequency and limits
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(clap::Args, Debug)]
struct Sweep {
    /// Smallest and largest value of the swept parameter
    #[arg(short, long, num_args = 2, required = true, value_names = ["MIN", "MAX"])]
    range: Vec<u32>,
    #[arg(short, long, default_value_t = 1)]
    incr: u32,
}

impl Sweep {
    fn values(&self) -> Result<Vec<u32>> {
        Ok(ratio::sweep(self.range[0], self.range[1], self.incr)?)
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print one metric of a single log file.
    Extract {
        #[arg(value_enum)]
        metric: Metric,
        file: PathBuf,
    },
    /// Average one metric over the trials of a test case.
    Aggregate {
        #[arg(value_enum)]
        metric: Metric,
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short = 'f', long)]
        test_file: String,
        #[arg(long, required_unless_present = "host")]
        dpus: Option<u32>,
        #[arg(short, long, required_unless_present = "host")]
        tasklets: Option<u32>,
        /// Select host baseline runs instead of DPU runs
        #[arg(long, conflicts_with_all = ["dpus", "tasklets"])]
        host: bool,
    },
    /// Tasklets per DPU that give every input block its own tasklet.
    Tasklets {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        dpus: u32,
        #[arg(short, long)]
        block_size: Option<u64>,
    },
    /// Speedup table over a range of tasklet counts.
    SpeedupTasklets {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short, long, num_args = 1.., required = true)]
        files: Vec<String>,
        #[arg(long)]
        dpus: u32,
        #[command(flatten)]
        sweep: Sweep,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Speedup table over a range of DPU counts.
    SpeedupDpus {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short, long, num_args = 1.., required = true)]
        files: Vec<String>,
        #[command(flatten)]
        sweep: Sweep,
        /// Fixed tasklet count; sized to the input file when omitted
        #[arg(short, long)]
        tasklets: Option<u32>,
        /// Directory holding the uncompressed `<test file>.txt` inputs
        #[arg(long, required_unless_present = "tasklets")]
        inputs: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Time breakdown of one test file over a range of DPU counts.
    Breakdown {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short = 'f', long)]
        test_file: String,
        #[command(flatten)]
        sweep: Sweep,
        #[arg(short, long, default_value_t = 12)]
        tasklets: u32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// DPU time and compression ratio per tasklet count.
    ComprTasklets {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short = 'f', long)]
        test_file: String,
        #[arg(long, default_value_t = 128)]
        dpus: u32,
        #[arg(short, long, value_delimiter = ',', default_value = "1,4,8,12,16,20,24")]
        tasklets: Vec<u32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Cycle count over a grid of DPU and tasklet counts.
    Tradeoff {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short = 'f', long)]
        test_file: String,
        #[arg(long, value_delimiter = ',', default_value = "16,32,64,128")]
        dpus: Vec<u32>,
        #[arg(short, long, value_delimiter = ',', default_value = "4,8,12,16,20,24")]
        tasklets: Vec<u32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare result directories of several codecs.
    Compare {
        /// `label=path`, once per codec
        #[arg(short, long = "version", required = true, value_parser = parse_version)]
        versions: Vec<(String, PathBuf)>,
        /// `test_file:dpus:tasklets`, once per test case
        #[arg(short = 'k', long = "case", required = true, value_parser = parse_case)]
        cases: Vec<TestCaseKey>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_version(s: &str) -> Result<(String, PathBuf), String> {
    let (label, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected label=path, got {s}"))?;
    Ok((label.to_string(), PathBuf::from(path)))
}

fn parse_case(s: &str) -> Result<TestCaseKey, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let &[test_file, dpus, tasklets] = parts.as_slice() else {
        return Err(format!("expected test_file:dpus:tasklets, got {s}"));
    };
    let dpus = dpus.parse().map_err(|e| format!("dpus in {s}: {e}"))?;
    let tasklets = tasklets.parse().map_err(|e| format!("tasklets in {s}: {e}"))?;
    Ok(TestCaseKey::dpu(test_file, dpus, tasklets))
}

fn main() {
    dpu_bench::init_logging("warn");
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR: {e:#}");
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AnalysisConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Cmd::Extract { metric, file } => {
            let value = dpu_bench::extract::Extractor::new(&config).metric(metric, &file)?;
            match value {
                Some(value) => println!("{value}"),
                None => bail!("{metric} not found in {}", file.display()),
            }
        }
        Cmd::Aggregate {
            metric,
            dir,
            test_file,
            dpus,
            tasklets,
            host,
        } => {
            let key = match (host, dpus, tasklets) {
                (true, _, _) => TestCaseKey::host(test_file),
                (false, Some(d), Some(t)) => TestCaseKey::dpu(test_file, d, t),
                _ => bail!("either --host or both --dpus and --tasklets are required"),
            };
            let logs = LogDir::new(dir, &config);
            let aggregate = match (metric, key.role) {
                (Metric::HostRuntime, dpu_bench::Role::Host) => {
                    logs.avg_host_runtime(&key.test_file)?
                }
                (Metric::CompressionRatio, _) => logs.compression_ratio(&key)?.map(|ratio| {
                    dpu_bench::Aggregate {
                        mean: ratio,
                        samples: 1,
                    }
                }),
                _ => logs.avg_metric(metric, &key)?,
            };
            match aggregate {
                Some(a) => println!("{} ({} trials)", a.mean, a.samples),
                None => bail!("File not found for {key}"),
            }
        }
        Cmd::Tasklets {
            input,
            dpus,
            block_size,
        } => {
            let tasklets = ratio::optimal_tasklets_for_file(
                &input,
                block_size.unwrap_or(config.block_size),
                dpus,
                config.max_tasklets,
            )?;
            println!("{tasklets}");
        }
        Cmd::SpeedupTasklets {
            dir,
            files,
            dpus,
            sweep,
            output,
        } => {
            let logs = LogDir::new(dir, &config);
            let rows = report::speedup_by_tasklets()
                .logs(&logs)
                .test_files(&files)
                .dpus(dpus)
                .tasklets(&sweep.values()?)
                .call()?;
            emit(output.as_deref(), |w| report::write_speedup(w, Scale::Tasklets, &rows))?;
        }
        Cmd::SpeedupDpus {
            dir,
            files,
            sweep,
            tasklets,
            inputs,
            output,
        } => {
            let policy = match (tasklets, inputs) {
                (Some(t), _) => TaskletPolicy::Fixed(t),
                (None, Some(inputs)) => TaskletPolicy::Optimal { inputs },
                (None, None) => bail!("--inputs is required without --tasklets"),
            };
            let logs = LogDir::new(dir, &config);
            let rows = report::speedup_by_dpus()
                .logs(&logs)
                .test_files(&files)
                .dpus(&sweep.values()?)
                .tasklets(&policy)
                .call()?;
            emit(output.as_deref(), |w| report::write_speedup(w, Scale::Dpus, &rows))?;
        }
        Cmd::Breakdown {
            dir,
            test_file,
            sweep,
            tasklets,
            output,
        } => {
            let logs = LogDir::new(dir, &config);
            let rows = report::breakdown(&logs, &test_file, &sweep.values()?, tasklets)?;
            emit(output.as_deref(), |w| report::write_rows(w, &rows))?;
        }
        Cmd::ComprTasklets {
            dir,
            test_file,
            dpus,
            tasklets,
            output,
        } => {
            let logs = LogDir::new(dir, &config);
            let rows = report::compr_by_tasklets(&logs, &test_file, dpus, &tasklets)?;
            emit(output.as_deref(), |w| report::write_rows(w, &rows))?;
        }
        Cmd::Tradeoff {
            dir,
            test_file,
            dpus,
            tasklets,
            output,
        } => {
            let logs = LogDir::new(dir, &config);
            let rows = report::tradeoff(&logs, &test_file, &dpus, &tasklets)?;
            emit(output.as_deref(), |w| report::write_rows(w, &rows))?;
        }
        Cmd::Compare {
            versions,
            cases,
            output,
        } => {
            for (label, path) in &versions {
                if !path.is_dir() {
                    bail!("{} for {label} is not a valid path", path.display());
                }
            }
            let versions = versions
                .into_iter()
                .map(|(label, path)| (label, LogDir::new(path, &config)))
                .collect::<Vec<_>>();
            let rows = report::compare(&versions, &cases)?;
            emit(output.as_deref(), |w| report::write_rows(w, &rows))?;
        }
    }

    Ok(())
}

/// Writes a table to `output`, or stdout when no file is given.
fn emit(
    output: Option<&Path>,
    write: impl FnOnce(&mut dyn Write) -> dpu_bench::Result<()>,
) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = report::create_file(path)?;
            write(&mut file).with_context(|| format!("writing {}", path.display()))?;
            println!("writing file to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)?;
        }
    }
    Ok(())
}
