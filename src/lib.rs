pub mod aggregate;
pub mod case;
pub mod config;
pub mod error;
pub mod extract;
pub mod metric;
pub mod ratio;
pub mod report;

pub use aggregate::LogDir;
pub use case::{Role, TestCaseKey};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use metric::{Aggregate, Metric, Overhead};

/// Installs the `RUST_LOG`-driven subscriber used by every binary.
pub fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
