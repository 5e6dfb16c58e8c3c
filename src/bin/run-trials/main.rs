use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use clap::Parser;
use dpu_bench::report::{self, Scale, TaskletPolicy};
use dpu_bench::{AnalysisConfig, LogDir, ratio};
use libc::gethostname;
use strum::IntoEnumIterator;

mod layout;
mod trial_loop;

use layout::{Mode, ResultsLayout};
use trial_loop::{Bench, Plan, trial_loop};

#[derive(clap::ValueEnum, strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
enum TestKind {
    /// Vary the DPU count, sizing tasklets to the input
    Dpus,
    /// Vary the tasklet count on a fixed number of DPUs
    Tasklets,
    /// Vary the DPU count on a fixed tasklet count for one file
    Breakdown,
}

#[derive(Parser, Debug)]
#[command(version, about = "Rebuild and run the DPU benchmark over a parameter sweep", long_about = None)]
struct Config {
    #[arg(short = 'k', long, value_enum)]
    kind: TestKind,
    /// Test files, without extension
    #[arg(short, long, num_args = 1.., required = true)]
    files: Vec<String>,
    #[arg(short, long, num_args = 2, required = true, value_names = ["MIN", "MAX"])]
    range: Vec<u32>,
    #[arg(short, long, default_value_t = 1)]
    incr: u32,
    /// DPU count kept constant when varying tasklets
    #[arg(short, long, required_if_eq("kind", "tasklets"))]
    dpus: Option<u32>,
    /// Tasklet count kept constant for the breakdown
    #[arg(short, long, default_value_t = 12)]
    tasklets: u32,
    #[arg(short = 'n', long, default_value_t = 1)]
    trials: u32,
    #[arg(long, default_value = ".")]
    build_dir: PathBuf,
    /// Build tool invoked as `<make> clean` then `<make> NR_DPUS=.. NR_TASKLETS=..`
    #[arg(long, default_value = "make")]
    make: PathBuf,
    #[arg(short, long, default_value = "./dpu_snappy")]
    binary: PathBuf,
    #[arg(long, default_value = "../test")]
    inputs: PathBuf,
    #[arg(long, default_value = "results")]
    results: PathBuf,
    /// JSON analysis config
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Only rebuild the CSV tables from existing logs
    #[arg(long)]
    tables_only: bool,
}

fn main() -> Result<()> {
    dpu_bench::init_logging("info");
    let cli = Config::parse();
    let analysis = AnalysisConfig::load_or_default(cli.config.as_deref())?;

    print_config(&cli);

    let layout = ResultsLayout::new(&cli.results);
    layout.create()?;

    let sweep = ratio::sweep(cli.range[0], cli.range[1], cli.incr)?;
    let plan = plan(&cli, &analysis, &sweep)?;

    if !cli.tables_only {
        let binary = if cli.binary.is_relative() {
            cli.build_dir.join(&cli.binary)
        } else {
            cli.binary.clone()
        };
        let bench = Bench {
            make: cli.make.clone(),
            build_dir: cli.build_dir.clone(),
            binary,
            inputs: cli.inputs.clone(),
        };
        let running = setup_exit_signal();

        let invocations = trial_loop()
            .bench(&bench)
            .layout(&layout)
            .plan(&plan)
            .trials(cli.trials)
            .with_host(cli.kind != TestKind::Breakdown)
            .running(running.clone())
            .call()?;
        println!("Ran {invocations} benchmark invocations");

        if !running.load(Ordering::Relaxed) {
            bail!("interrupted, tables not written");
        }
    }

    write_tables(&cli, &analysis, &layout, &sweep)
}

fn setup_exit_signal() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let r1 = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        r1.store(false, Ordering::Relaxed);
    }) {
        tracing::warn!("could not install Ctrl-C handler: {e}");
    }

    running
}

fn hostname() -> String {
    let mut name = [0u8; 256];
    let rc = unsafe { gethostname(name.as_mut_ptr() as *mut _, name.len()) };
    if rc != 0 {
        return "unknown".to_string();
    }
    String::from_utf8_lossy(&name)
        .trim_end_matches('\0')
        .to_string()
}

fn print_config(cli: &Config) {
    println!("Configuration on {}:", hostname());
    println!("  Test: {}", cli.kind);
    println!("  Files: {}", cli.files.join(" "));
    println!("  Range: {}..={} step {}", cli.range[0], cli.range[1], cli.incr);
    println!("  DPUs: {:?}", cli.dpus);
    println!("  Trials: {}", cli.trials);
    println!("  Binary: {}", cli.binary.display());
    println!("  Results: {}", cli.results.display());
}

/// Configurations to run for each test file.
fn plan(cli: &Config, analysis: &AnalysisConfig, sweep: &[u32]) -> Result<Plan> {
    let (limit, swept) = match cli.kind {
        TestKind::Dpus | TestKind::Breakdown => (analysis.max_dpus, "DPUs"),
        TestKind::Tasklets => (analysis.max_tasklets, "tasklets"),
    };
    if let Some(over) = sweep.iter().find(|&&v| v > limit) {
        bail!("{over} {swept} exceeds the limit of {limit}");
    }

    let mut plan = Vec::new();
    match cli.kind {
        TestKind::Dpus => {
            for test_file in &cli.files {
                let input = Mode::Compression.input(&cli.inputs, test_file);
                let mut configs = Vec::new();
                for &dpus in sweep {
                    let tasklets = ratio::optimal_tasklets_for_file(
                        &input,
                        analysis.block_size,
                        dpus,
                        analysis.max_tasklets,
                    )?;
                    configs.push((dpus, tasklets));
                }
                plan.push((test_file.clone(), configs));
            }
        }
        TestKind::Tasklets => {
            let Some(dpus) = cli.dpus else {
                bail!("--dpus is required when varying tasklets");
            };
            if dpus > analysis.max_dpus {
                bail!("{dpus} DPUs exceeds the limit of {}", analysis.max_dpus);
            }
            for test_file in &cli.files {
                let configs = sweep.iter().map(|&t| (dpus, t)).collect();
                plan.push((test_file.clone(), configs));
            }
        }
        TestKind::Breakdown => {
            if cli.tasklets > analysis.max_tasklets {
                bail!("{} tasklets exceeds the limit of {}", cli.tasklets, analysis.max_tasklets);
            }
            let configs = sweep.iter().map(|&d| (d, cli.tasklets)).collect();
            plan.push((cli.files[0].clone(), configs));
        }
    }
    Ok(plan)
}

fn write_tables(
    cli: &Config,
    analysis: &AnalysisConfig,
    layout: &ResultsLayout,
    sweep: &[u32],
) -> Result<()> {
    for mode in Mode::iter() {
        let logs = LogDir::new(layout.mode_dir(mode), analysis);
        let (path, written) = match cli.kind {
            TestKind::Dpus => {
                let rows = report::speedup_by_dpus()
                    .logs(&logs)
                    .test_files(&cli.files)
                    .dpus(sweep)
                    .tasklets(&TaskletPolicy::Optimal {
                        inputs: cli.inputs.clone(),
                    })
                    .call()?;
                let path = layout.table(&format!("{mode}_speedup_dpu.csv"));
                report::write_speedup(report::create_file(&path)?, Scale::Dpus, &rows)?;
                (path, rows.len())
            }
            TestKind::Tasklets => {
                let Some(dpus) = cli.dpus else {
                    bail!("--dpus is required when varying tasklets");
                };
                let rows = report::speedup_by_tasklets()
                    .logs(&logs)
                    .test_files(&cli.files)
                    .dpus(dpus)
                    .tasklets(sweep)
                    .call()?;
                let path = layout.table(&format!("{mode}_speedup_tasklet.csv"));
                report::write_speedup(report::create_file(&path)?, Scale::Tasklets, &rows)?;
                (path, rows.len())
            }
            TestKind::Breakdown => {
                let test_file = &cli.files[0];
                let rows = report::breakdown(&logs, test_file, sweep, cli.tasklets)?;
                let path = layout.table(&format!("{test_file}_{mode}_breakdown.csv"));
                report::write_rows(report::create_file(&path)?, &rows)?;
                (path, rows.len())
            }
        };
        println!("writing file to {} ({written} rows)", path.display());
    }
    Ok(())
}
