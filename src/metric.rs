use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

/// Scalar metrics that can be pulled out of a single log file.
#[derive(clap::ValueEnum, Display, EnumString, EnumIter, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub enum Metric {
    MaxCycles,
    HostRuntime,
    PreprocTime,
    PostprocTime,
    CompressionRatio,
}

/// Mean of a metric over the trial files of one test case.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub mean: f64,
    pub samples: usize,
}

impl Aggregate {
    /// `None` when there is nothing to average.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        Some(Aggregate {
            mean: samples.iter().sum::<f64>() / samples.len() as f64,
            samples: samples.len(),
        })
    }
}

/// Host-side time spent outside the DPU kernel, in seconds.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Overhead {
    pub prepare: f64,
    pub alloc: f64,
    pub load: f64,
    pub copy_in: f64,
    pub copy_out: f64,
    pub free: f64,
}

impl Overhead {
    pub fn total(&self) -> f64 {
        self.prepare + self.alloc + self.load + self.copy_in + self.copy_out + self.free
    }

    pub fn mean(samples: &[Overhead]) -> Option<Overhead> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let sum = samples.iter().fold(Overhead::default(), |acc, o| Overhead {
            prepare: acc.prepare + o.prepare,
            alloc: acc.alloc + o.alloc,
            load: acc.load + o.load,
            copy_in: acc.copy_in + o.copy_in,
            copy_out: acc.copy_out + o.copy_out,
            free: acc.free + o.free,
        });

        Some(Overhead {
            prepare: sum.prepare / n,
            alloc: sum.alloc / n,
            load: sum.load / n,
            copy_in: sum.copy_in / n,
            copy_out: sum.copy_out / n,
            free: sum.free / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn empty_samples_are_not_found() {
        assert_eq!(Aggregate::from_samples(&[]), None);
        assert_eq!(Overhead::mean(&[]), None);
    }

    #[test]
    fn mean_of_samples() {
        let agg = Aggregate::from_samples(&[1.0, 2.0, 6.0]).unwrap();
        assert_eq!(agg.mean, 3.0);
        assert_eq!(agg.samples, 3);
    }

    #[test]
    fn metric_names_parse_back() {
        for metric in Metric::iter() {
            assert_eq!(Metric::from_str(&metric.to_string()).unwrap(), metric);
        }
        assert_eq!(Metric::MaxCycles.to_string(), "max-cycles");
    }
}
