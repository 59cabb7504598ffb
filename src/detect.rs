//! Column-wise hot/cold detection and threshold discovery.

use tracing::debug;

use crate::frame::CleanedFrame;
use crate::params::RangeTable;

/// Hot/cold cut-points (°C)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Columns with any pixel at or above this are hot
    pub hot: f32,

    /// Columns with any pixel at or below this (and not hot) are cold
    pub cold: f32,
}

impl Default for Thresholds {
    /// Fallback used when a table has too few distinct boundaries
    fn default() -> Self {
        Self {
            hot: 30.0,
            cold: 20.0,
        }
    }
}

/// Classification of a column or region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Hot,
    Cold,
}

/// Maximal run of adjacent columns sharing a kind (inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub start_column: usize,
    pub end_column: usize,
}

impl Region {
    pub fn width(&self) -> usize {
        self.end_column - self.start_column + 1
    }

    /// Center column (may fall between two columns)
    pub fn center(&self) -> f32 {
        (self.start_column + self.end_column) as f32 / 2.0
    }
}

/// Label every column; hot wins when a column qualifies for both
pub fn label_columns(frame: &CleanedFrame, thresholds: Thresholds) -> Vec<Option<RegionKind>> {
    (0..frame.width())
        .map(|x| {
            let mut cold = false;
            for value in frame.column(x) {
                if value >= thresholds.hot {
                    return Some(RegionKind::Hot);
                }
                cold |= value <= thresholds.cold;
            }
            cold.then_some(RegionKind::Cold)
        })
        .collect()
}

/// Count hot and cold columns. Each column is counted at most once.
pub fn scan_columns(frame: &CleanedFrame, thresholds: Thresholds) -> (usize, usize) {
    label_columns(frame, thresholds)
        .into_iter()
        .fold((0, 0), |(hot, cold), label| match label {
            Some(RegionKind::Hot) => (hot + 1, cold),
            Some(RegionKind::Cold) => (hot, cold + 1),
            None => (hot, cold),
        })
}

/// Merge adjacent equally-labelled columns into left-to-right regions
pub fn detect_regions(frame: &CleanedFrame, thresholds: Thresholds) -> Vec<Region> {
    let labels = label_columns(frame, thresholds);
    let mut regions: Vec<Region> = Vec::new();

    for (x, label) in labels.into_iter().enumerate() {
        let Some(kind) = label else {
            continue;
        };
        match regions.last_mut() {
            Some(last) if last.kind == kind && last.end_column + 1 == x => last.end_column = x,
            _ => regions.push(Region {
                kind,
                start_column: x,
                end_column: x,
            }),
        }
    }

    regions
}

/// Pick cut-points from the table's interior boundaries.
///
/// All distinct `low`/`high` values are sorted ascending; the second-highest
/// becomes `hot` and the second-lowest `cold`. With fewer than two distinct
/// boundaries the default 30/20 pair is returned.
pub fn derive_thresholds(table: &RangeTable) -> Thresholds {
    let mut edges: Vec<f32> = table
        .entries()
        .iter()
        .flat_map(|entry| [entry.low, entry.high])
        .collect();
    edges.sort_by(f32::total_cmp);
    edges.dedup();

    if edges.len() < 2 {
        debug!(
            edges = edges.len(),
            "Too few range boundaries, using default thresholds"
        );
        return Thresholds::default();
    }

    Thresholds {
        hot: edges[edges.len() - 2],
        cold: edges[1],
    }
}
