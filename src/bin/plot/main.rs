use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dpu_bench::report::{self, BreakdownRow, ComparisonRow, ComprTaskletRow, TradeoffRow};
use serde::de::DeserializeOwned;

mod charts;
mod series;

use charts::Labels;

#[derive(Parser, Debug)]
#[command(version, about = "Render benchmark CSV tables as SVG charts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(clap::Args, Debug)]
struct ChartArgs {
    /// CSV table to read
    #[arg(short, long)]
    input: PathBuf,
    /// SVG file to write
    #[arg(short, long)]
    output: PathBuf,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    xlabel: Option<String>,
    #[arg(long)]
    ylabel: Option<String>,
}

impl ChartArgs {
    fn labels<'a>(&'a self, title: &'a str, x: &'a str, y: &'a str) -> Labels<'a> {
        Labels {
            title: self.title.as_deref().unwrap_or(title),
            x: self.xlabel.as_deref().unwrap_or(x),
            y: self.ylabel.as_deref().unwrap_or(y),
        }
    }

    fn rows<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let rows = report::read_rows(report::open_file(&self.input)?)
            .with_context(|| format!("reading {}", self.input.display()))?;
        if rows.is_empty() {
            bail!("{} has no rows", self.input.display());
        }
        Ok(rows)
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Speedup lines from a `speedup-tasklets` or `speedup-dpus` table.
    Speedup {
        #[command(flatten)]
        chart: ChartArgs,
    },
    /// Stacked time breakdown per DPU count.
    Breakdown {
        #[command(flatten)]
        chart: ChartArgs,
    },
    /// DPU time bars with the compression ratio on a second axis.
    ComprTasklets {
        #[command(flatten)]
        chart: ChartArgs,
    },
    /// Cycle counts grouped by DPU count, one bar per tasklet count.
    Tradeoff {
        #[command(flatten)]
        chart: ChartArgs,
    },
    /// Speedup over the host per test file, from a `compare` table.
    Percent {
        #[command(flatten)]
        chart: ChartArgs,
        /// Version label to plot
        #[arg(short, long)]
        label: String,
    },
}

fn main() -> Result<()> {
    dpu_bench::init_logging("warn");
    let cli = Cli::parse();

    let output = match &cli.command {
        Cmd::Speedup { chart } => {
            let (scale, rows) = report::read_speedup(report::open_file(&chart.input)?)
                .with_context(|| format!("reading {}", chart.input.display()))?;
            if rows.iter().all(|r| r.is_host()) {
                bail!("{} has no speedup rows", chart.input.display());
            }
            let labels = chart.labels("", series::scale_label(scale), "Speedup");
            charts::speedup(&series::speedup_lines(&rows), &labels, &chart.output)?;
            &chart.output
        }
        Cmd::Breakdown { chart } => {
            let rows: Vec<BreakdownRow> = chart.rows()?;
            let labels = chart.labels("", "DPUs", "Time (s)");
            charts::breakdown(&rows, &labels, &chart.output)?;
            &chart.output
        }
        Cmd::ComprTasklets { chart } => {
            let rows: Vec<ComprTaskletRow> = chart.rows()?;
            let labels = chart.labels("", "Number of Tasklets", "Time (s)");
            charts::compr_tasklets(&rows, &labels, &chart.output)?;
            &chart.output
        }
        Cmd::Tradeoff { chart } => {
            let rows: Vec<TradeoffRow> = chart.rows()?;
            let labels = chart.labels("", "Number of DPUs", "Cycle Count (in Millions)");
            charts::tradeoff(&series::tradeoff_groups(&rows), &labels, &chart.output)?;
            &chart.output
        }
        Cmd::Percent { chart, label } => {
            let rows: Vec<ComparisonRow> = chart.rows()?;
            let bars = series::percent_bars(&rows, label);
            if bars.is_empty() {
                bail!("no complete rows for {label} in {}", chart.input.display());
            }
            let labels = chart.labels("", "Speedup Over Host Application (%)", "");
            charts::percent(&bars, &labels, &chart.output)?;
            &chart.output
        }
    };

    println!("writing file to {}", output.display());
    Ok(())
}
