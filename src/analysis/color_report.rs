//! Self-analysis of a reference color table.
//!
//! Shows how well separated the configured colors are: the closest pairs,
//! distance statistics over all pairs and the spread of vector lengths.

use serde::Serialize;

use crate::analysis::color::{ReferenceColor, ScalarStats};

/// Number of closest pairs listed in the report.
pub const CLOSEST_PAIRS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorPair {
    pub distance: f64,
    pub first: ReferenceColor,
    pub second: ReferenceColor,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorTableReport {
    pub closest: Vec<ColorPair>,
    pub distance: Option<ScalarStats>,
    pub length: Option<ScalarStats>,
}

/// Every unordered pair once, sorted by ascending distance.
pub fn pairwise_distances(table: &[ReferenceColor]) -> Vec<ColorPair> {
    let mut pairs = Vec::with_capacity(table.len() * table.len().saturating_sub(1) / 2);
    for (idx, first) in table.iter().enumerate() {
        for second in &table[idx + 1..] {
            pairs.push(ColorPair {
                distance: first.rgb.distance(&second.rgb),
                first: first.clone(),
                second: second.clone(),
            });
        }
    }
    pairs.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    pairs
}

pub fn analyse_table(table: &[ReferenceColor]) -> ColorTableReport {
    let pairs = pairwise_distances(table);
    let distances: Vec<f64> = pairs.iter().map(|p| p.distance).collect();
    let lengths: Vec<f64> = table.iter().map(|c| c.rgb.length()).collect();

    ColorTableReport {
        closest: pairs.into_iter().take(CLOSEST_PAIRS).collect(),
        distance: ScalarStats::from_values(&distances),
        length: ScalarStats::from_values(&lengths),
    }
}

impl ColorTableReport {
    /// Text rendering used by the CLI.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("******************** Distance between all colors ********************\n");
        for pair in &self.closest {
            out.push_str(&format!(
                "Dist: {:4} ({:<25} {:<25}) : {} {}\n",
                pair.distance as u64,
                pair.first.name,
                pair.second.name,
                pair.first.rgb,
                pair.second.rgb
            ));
        }
        if let Some(stats) = &self.distance {
            out.push_str(&format_stats("Distance  ", stats));
        }
        out.push_str("******************** Length of all colors ********************\n");
        if let Some(stats) = &self.length {
            out.push_str(&format_stats("RGB Length", stats));
        }
        out
    }
}

fn format_stats(label: &str, stats: &ScalarStats) -> String {
    format!(
        "{} - Avg: {:5} Std: {:5}, Min: {:5}, Max: {:5}\n",
        label, stats.mean as u64, stats.std as u64, stats.min as u64, stats.max as u64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<ReferenceColor> {
        vec![
            ReferenceColor::new("a", [0, 0, 0]),
            ReferenceColor::new("b", [3, 4, 0]),
            ReferenceColor::new("c", [0, 0, 10]),
        ]
    }

    #[test]
    fn test_pairs_sorted_ascending() {
        let pairs = pairwise_distances(&table());
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].distance, 5.0);
        assert_eq!(pairs[0].first.name, "a");
        assert_eq!(pairs[0].second.name, "b");
        assert_eq!(pairs[1].distance, 10.0);
    }

    #[test]
    fn test_report_stats() {
        let report = analyse_table(&table());
        let length = report.length.unwrap();
        assert_eq!(length.min, 0.0);
        assert_eq!(length.max, 10.0);
        assert_eq!(report.distance.unwrap().min, 5.0);
        assert!(report.render().contains("RGB Length"));
    }

    #[test]
    fn test_closest_capped() {
        let table: Vec<ReferenceColor> = (0..8u32)
            .map(|i| ReferenceColor::new(format!("c{}", i), [i * 10, 0, 0]))
            .collect();
        assert_eq!(analyse_table(&table).closest.len(), CLOSEST_PAIRS);
    }

    #[test]
    fn test_single_color_has_no_pairs() {
        let report = analyse_table(&table()[..1]);
        assert!(report.closest.is_empty());
        assert!(report.distance.is_none());
    }
}
