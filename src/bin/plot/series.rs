use std::collections::BTreeMap;

use dpu_bench::ratio;
use dpu_bench::report::{BreakdownRow, ComparisonRow, Scale, SpeedupRow, TradeoffRow};

/// Speedup lines keyed by version, plus the host baseline (1 when the table
/// has no host row).
pub struct SpeedupLines {
    pub host: f64,
    pub lines: BTreeMap<String, Vec<(f64, f64)>>,
}

/// Default x axis label of a speedup chart.
pub fn scale_label(scale: Scale) -> &'static str {
    match scale {
        Scale::Tasklets => "Number of Tasklets",
        Scale::Dpus => "Number of DPUs",
    }
}

pub fn speedup_lines(rows: &[SpeedupRow]) -> SpeedupLines {
    let host = rows.iter().find(|r| r.is_host()).map_or(1.0, |r| r.time);

    let mut lines: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows.iter().filter(|r| !r.is_host()) {
        lines
            .entry(row.version.clone())
            .or_default()
            .push((row.scale as f64, row.time));
    }
    for points in lines.values_mut() {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    SpeedupLines { host, lines }
}

/// Phases of a breakdown bar in stacking order.
pub const PHASES: [&str; 7] = [
    "prepare",
    "alloc",
    "load",
    "copy in",
    "DPU execution",
    "copy out",
    "free",
];

/// `(phase index, bottom, top)` segments of one stacked bar.
pub fn stack(row: &BreakdownRow) -> Vec<(usize, f64, f64)> {
    let values = [
        row.prepare,
        row.alloc,
        row.load,
        row.copy_in,
        row.run,
        row.copy_out,
        row.free,
    ];

    let mut bottom = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let segment = (i, bottom, bottom + v);
            bottom += v;
            segment
        })
        .collect()
}

/// Grouped bars: DPU counts along x, one series per tasklet count.
pub struct TradeoffGroups {
    pub dpus: Vec<u32>,
    pub series: Vec<(u32, Vec<f64>)>,
}

pub fn tradeoff_groups(rows: &[TradeoffRow]) -> TradeoffGroups {
    let mut dpus: Vec<u32> = rows.iter().map(|r| r.dpus).collect();
    dpus.sort_unstable();
    dpus.dedup();

    let mut by_tasklets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let bars = by_tasklets
            .entry(row.tasklets)
            .or_insert_with(|| vec![0.0; dpus.len()]);
        if let Ok(i) = dpus.binary_search(&row.dpus) {
            bars[i] = row.mcycles;
        }
    }

    TradeoffGroups {
        dpus,
        series: by_tasklets.into_iter().collect(),
    }
}

/// Speedup percentages per test file for one version. Rows missing either
/// time are left out.
pub fn percent_bars(rows: &[ComparisonRow], version: &str) -> Vec<(String, f64)> {
    rows.iter()
        .filter(|r| r.version == version)
        .filter_map(|r| match (r.host_time, r.dpu_time) {
            (Some(host), Some(dpu)) if dpu > 0.0 => {
                Some((r.testfile.clone(), ratio::display_percent(host, dpu)))
            }
            _ => None,
        })
        .collect()
}

/// Label for a category axis drawn on integer positions.
pub fn category_label<T: ToString>(categories: &[T], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    categories
        .get(i as usize)
        .map(|c| c.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speedup_row(version: &str, time: f64, scale: u32) -> SpeedupRow {
        SpeedupRow {
            version: version.to_string(),
            time,
            scale,
        }
    }

    #[test]
    fn lines_are_sorted_and_exclude_host() {
        let rows = vec![
            SpeedupRow::host(),
            speedup_row("alice", 3.0, 8),
            speedup_row("alice", 2.0, 4),
            speedup_row("nci", 5.0, 4),
        ];
        let lines = speedup_lines(&rows);
        assert_eq!(lines.host, 1.0);
        assert_eq!(lines.lines.len(), 2);
        assert_eq!(lines.lines["alice"], vec![(4.0, 2.0), (8.0, 3.0)]);
    }

    #[test]
    fn axis_label_follows_the_swept_parameter() {
        let text = "version,time,dpus\nhost,1,0\nalice,2.5,64\n";
        let (scale, rows) = dpu_bench::report::read_speedup(text.as_bytes()).unwrap();
        assert_eq!(scale_label(scale), "Number of DPUs");
        assert_eq!(speedup_lines(&rows).lines["alice"], vec![(64.0, 2.5)]);
        assert_eq!(scale_label(Scale::Tasklets), "Number of Tasklets");
    }

    #[test]
    fn stack_accumulates() {
        let row = BreakdownRow {
            prepare: 1.0,
            alloc: 1.0,
            load: 0.5,
            copy_in: 0.5,
            run: 2.0,
            copy_out: 0.0,
            free: 1.0,
            dpus: 4,
        };
        let segments = stack(&row);
        assert_eq!(segments.len(), PHASES.len());
        assert_eq!(segments[4], (4, 3.0, 5.0));
        assert_eq!(segments[6].2, row.total());
    }

    #[test]
    fn tradeoff_grid() {
        let rows = vec![
            TradeoffRow { dpus: 32, tasklets: 4, mcycles: 2.0 },
            TradeoffRow { dpus: 16, tasklets: 4, mcycles: 4.0 },
            TradeoffRow { dpus: 16, tasklets: 8, mcycles: 3.0 },
        ];
        let groups = tradeoff_groups(&rows);
        assert_eq!(groups.dpus, vec![16, 32]);
        assert_eq!(groups.series, vec![(4, vec![4.0, 2.0]), (8, vec![3.0, 0.0])]);
    }

    #[test]
    fn percent_skips_incomplete_rows() {
        let row = |testfile: &str, host: Option<f64>, dpu: Option<f64>| ComparisonRow {
            version: "snappy".to_string(),
            testfile: testfile.to_string(),
            dpu_time: dpu,
            host_time: host,
            compratio: None,
        };
        let rows = vec![
            row("a", Some(4.0), Some(2.0)),
            row("b", Some(1.0), Some(4.0)),
            row("c", None, Some(1.0)),
        ];
        let bars = percent_bars(&rows, "snappy");
        assert_eq!(bars, vec![("a".to_string(), 200.0), ("b".to_string(), -75.0)]);
        assert!(percent_bars(&rows, "lz4").is_empty());
    }

    #[test]
    fn category_labels_only_on_integers() {
        let cats = [16, 32];
        assert_eq!(category_label(&cats, 1.0), "32");
        assert_eq!(category_label(&cats, 0.5), "");
        assert_eq!(category_label(&cats, 2.0), "");
        assert_eq!(category_label(&cats, -1.0), "");
    }
}
