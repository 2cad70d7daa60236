//! Nearest-neighbor color classification with a rejection band.
//!
//! The reference tables are small (tens of entries) and classification is
//! rate-limited by the stable sampler, so a linear scan is all that is needed.

use serde::{Deserialize, Serialize};

use crate::analysis::color::{ReferenceColor, Rgb};

/// Accepted classification: label, its reference value and the distance to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorMatch {
    pub name: String,
    pub reference: Rgb,
    pub distance: f64,
}

/// Closest table entry regardless of distance. Ties go to the earlier entry.
pub fn nearest(rgb: &Rgb, table: &[ReferenceColor]) -> Option<ColorMatch> {
    let mut best: Option<ColorMatch> = None;
    for color in table {
        let distance = rgb.distance(&color.rgb);
        // strict comparison keeps the first of equally distant entries
        if best.as_ref().map_or(true, |b| distance < b.distance) {
            best = Some(ColorMatch {
                name: color.name.clone(),
                reference: color.rgb,
                distance,
            });
        }
    }
    best
}

/// Nearest entry, or `None` when even the nearest is farther than
/// `max_distance`. A distance exactly equal to the limit still matches.
pub fn classify(rgb: &Rgb, table: &[ReferenceColor], max_distance: f64) -> Option<ColorMatch> {
    nearest(rgb, table).filter(|m| m.distance <= max_distance)
}

/// Reference table bundled with its rejection band.
#[derive(Debug, Clone)]
pub struct ColorClassifier {
    table: Vec<ReferenceColor>,
    max_distance: f64,
}

impl ColorClassifier {
    pub fn new(table: Vec<ReferenceColor>, max_distance: f64) -> Self {
        Self {
            table,
            max_distance,
        }
    }

    pub fn classify(&self, rgb: &Rgb) -> Option<ColorMatch> {
        let result = classify(rgb, &self.table, self.max_distance);
        match &result {
            Some(m) => tracing::debug!(
                "[Classifier] {} -> {} ({}) dist {:.1}",
                rgb,
                m.name,
                m.reference,
                m.distance
            ),
            None => tracing::debug!(
                "[Classifier] {} -> no match within {:.1}",
                rgb,
                self.max_distance
            ),
        }
        result
    }

    pub fn table(&self) -> &[ReferenceColor] {
        &self.table
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }
}
