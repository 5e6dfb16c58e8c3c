//! Aggregation over results directories built in temp dirs.

use std::path::Path;

use dpu_bench::{AnalysisConfig, LogDir, Metric, Overhead, TestCaseKey};
use rand::seq::SliceRandom;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn dpu_log(cycles: &[u64]) -> String {
    cycles
        .iter()
        .enumerate()
        .map(|(i, c)| format!("Tasklet {i}: completed in {c} cycles\n"))
        .collect()
}

#[test]
fn empty_directory_gives_none_everywhere() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "unrelated.log", "Host time: 1.0\n");

    let config = AnalysisConfig::default();
    let logs = LogDir::new(dir.path(), &config);
    let key = TestCaseKey::dpu("alice", 4, 12);

    assert_eq!(logs.avg_max_cycles(&key).unwrap(), None);
    assert_eq!(logs.avg_host_runtime("alice").unwrap(), None);
    assert_eq!(logs.avg_prepostproc_time(&key).unwrap(), None);
    assert_eq!(logs.avg_overhead(&key).unwrap(), None);
    assert_eq!(logs.compression_ratio(&key).unwrap(), None);
    assert_eq!(logs.avg_dpu_seconds(&key).unwrap(), None);
    for metric in [Metric::MaxCycles, Metric::HostRuntime, Metric::CompressionRatio] {
        assert_eq!(logs.avg_metric(metric, &key).unwrap(), None);
    }
}

#[test]
fn mean_does_not_depend_on_file_order() {
    let maxima = [100u64, 200, 300, 600];

    for _ in 0..5 {
        let dir = TempDir::new().unwrap();
        let mut trials: Vec<(usize, u64)> = maxima.iter().copied().enumerate().collect();
        trials.shuffle(&mut rand::rng());
        for (trial, max) in trials {
            write(
                dir.path(),
                &format!("alice_dpus=4_tasklets=2_trial={}.txt", trial + 1),
                &dpu_log(&[max / 2, max]),
            );
        }

        let config = AnalysisConfig::default();
        let logs = LogDir::new(dir.path(), &config);
        let avg = logs
            .avg_max_cycles(&TestCaseKey::dpu("alice", 4, 2))
            .unwrap()
            .unwrap();
        assert_eq!(avg.mean, 300.0);
        assert_eq!(avg.samples, 4);
    }
}

#[test]
fn single_dpu_query_skips_sixteen_dpu_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "nci_dpus=1_tasklets=8.txt", &dpu_log(&[10, 20]));
    write(dir.path(), "nci_dpus=16_tasklets=8.txt", &dpu_log(&[1000]));

    let config = AnalysisConfig::default();
    let logs = LogDir::new(dir.path(), &config);

    let one = logs.avg_max_cycles(&TestCaseKey::dpu("nci", 1, 8)).unwrap().unwrap();
    assert_eq!((one.mean, one.samples), (20.0, 1));
    let sixteen = logs.avg_max_cycles(&TestCaseKey::dpu("nci", 16, 8)).unwrap().unwrap();
    assert_eq!((sixteen.mean, sixteen.samples), (1000.0, 1));
}

#[test]
fn summary_lines_do_not_count() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "sao_dpus=2_tasklets=2.txt",
        "Tasklet 0: completed in 500 cycles\nTasklet summary: n/a\nTasklet 1: completed in 800 cycles\n",
    );

    let config = AnalysisConfig::default();
    let logs = LogDir::new(dir.path(), &config);
    let avg = logs.avg_max_cycles(&TestCaseKey::dpu("sao", 2, 2)).unwrap().unwrap();
    assert_eq!(avg.mean, 800.0);
}

#[test]
fn trials_without_cycles_are_left_out_of_the_mean() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sao_dpus=2_tasklets=2_trial=1.txt", &dpu_log(&[400]));
    write(dir.path(), "sao_dpus=2_tasklets=2_trial=2.txt", "Host time: 3.0\n");

    let config = AnalysisConfig::default();
    let logs = LogDir::new(dir.path(), &config);
    let avg = logs.avg_max_cycles(&TestCaseKey::dpu("sao", 2, 2)).unwrap().unwrap();
    assert_eq!((avg.mean, avg.samples), (400.0, 1));
}

#[test]
fn lz4_field_position() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "xml_dpus=1_tasklets=2.txt",
        "Tasklet 0: 1500 cycles, 32768 bytes\nTasklet 1: 900 cycles, 32768 bytes\n",
    );

    let config = AnalysisConfig::builder().cycle_field_from_end(4).build();
    let logs = LogDir::new(dir.path(), &config);
    let avg = logs.avg_max_cycles(&TestCaseKey::dpu("xml", 1, 2)).unwrap().unwrap();
    assert_eq!(avg.mean, 1500.0);
}

#[test]
fn overhead_phases_are_averaged() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "alice_dpus=8_tasklets=4_trial=1.txt",
        "Alloc time: 1.0\nLoad time: 0.5\nCopy in time: 2.0\n",
    );
    write(
        dir.path(),
        "alice_dpus=8_tasklets=4_trial=2.txt",
        "Alloc time: 3.0\nLoad time: 0.5\nFree time: 1.0\n",
    );

    let config = AnalysisConfig::default();
    let logs = LogDir::new(dir.path(), &config);
    let overhead = logs
        .avg_overhead(&TestCaseKey::dpu("alice", 8, 4))
        .unwrap()
        .unwrap();
    assert_eq!(
        overhead,
        Overhead {
            prepare: 0.0,
            alloc: 2.0,
            load: 0.5,
            copy_in: 1.0,
            copy_out: 0.0,
            free: 0.5,
        }
    );
}

#[test]
fn compression_ratio_comes_from_the_first_trial_reporting_one() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "nci_dpus=4_tasklets=4_trial=1.txt", &dpu_log(&[10]));
    write(dir.path(), "nci_dpus=4_tasklets=4_trial=2.txt", "Compression ratio: 2.5\n");
    write(dir.path(), "nci_dpus=4_tasklets=4_trial=3.txt", "Compression ratio: 9.0\n");

    let config = AnalysisConfig::default();
    let logs = LogDir::new(dir.path(), &config);
    assert_eq!(
        logs.compression_ratio(&TestCaseKey::dpu("nci", 4, 4)).unwrap(),
        Some(2.5)
    );
}

#[test]
fn optimal_tasklets_from_input_size() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("alice.txt");
    std::fs::write(&input, vec![b'a'; 1_000_000]).unwrap();

    assert_eq!(
        dpu_bench::ratio::optimal_tasklets_for_file(&input, 32768, 16, 24).unwrap(),
        2
    );
    assert_eq!(
        dpu_bench::ratio::optimal_tasklets_for_file(&input, 32768, 1, 24).unwrap(),
        24
    );
    assert!(dpu_bench::ratio::optimal_tasklets_for_file(&dir.path().join("missing.txt"), 32768, 1, 24).is_err());
}
