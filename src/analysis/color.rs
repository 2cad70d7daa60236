//! RGB triples, reference colors and the vector math shared by the sampler,
//! the classifier and the calibration statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Red/green/blue intensities with the clear channel dropped.
///
/// Serialized as a plain `[r, g, b]` array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 3]", into = "[u32; 3]")]
pub struct Rgb {
    pub r: u32,
    pub g: u32,
    pub b: u32,
}

impl Rgb {
    pub const fn new(r: u32, g: u32, b: u32) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [u32; 3] {
        [self.r, self.g, self.b]
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Rgb) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Length of the vector from black.
    pub fn length(&self) -> f64 {
        self.distance(&Rgb::default())
    }
}

impl From<[u32; 3]> for Rgb {
    fn from(value: [u32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<Rgb> for [u32; 3] {
    fn from(value: Rgb) -> Self {
        value.channels()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:5} {:5} {:5}]", self.r, self.g, self.b)
    }
}

/// Named entry of a color table. Serialized as `["label", [r, g, b]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Rgb)", into = "(String, Rgb)")]
pub struct ReferenceColor {
    pub name: String,
    pub rgb: Rgb,
}

impl ReferenceColor {
    pub fn new(name: impl Into<String>, rgb: impl Into<Rgb>) -> Self {
        Self {
            name: name.into(),
            rgb: rgb.into(),
        }
    }
}

impl From<(String, Rgb)> for ReferenceColor {
    fn from((name, rgb): (String, Rgb)) -> Self {
        Self { name, rgb }
    }
}

impl From<ReferenceColor> for (String, Rgb) {
    fn from(value: ReferenceColor) -> Self {
        (value.name, value.rgb)
    }
}

/// Per-channel median, each channel taken independently and truncated.
///
/// Returns `None` for an empty slice.
pub fn median(samples: &[Rgb]) -> Option<Rgb> {
    if samples.is_empty() {
        return None;
    }
    let channel = |pick: fn(&Rgb) -> u32| -> u32 {
        let mut values: Vec<u32> = samples.iter().map(pick).collect();
        values.sort_unstable();
        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            values[mid]
        } else {
            ((values[mid - 1] as u64 + values[mid] as u64) / 2) as u32
        }
    };
    Some(Rgb::new(channel(|c| c.r), channel(|c| c.g), channel(|c| c.b)))
}

/// Per-channel population standard deviation.
pub fn std_dev(samples: &[Rgb]) -> [f64; 3] {
    if samples.is_empty() {
        return [0.0; 3];
    }
    let n = samples.len() as f64;
    let mut out = [0.0; 3];
    for (idx, slot) in out.iter_mut().enumerate() {
        let mean = samples.iter().map(|s| s.channels()[idx] as f64).sum::<f64>() / n;
        let var = samples
            .iter()
            .map(|s| {
                let d = s.channels()[idx] as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        *slot = var.sqrt();
    }
    out
}

/// Norm of a per-channel deviation vector, used to summarise `std_dev`.
pub fn spread(std: &[f64; 3]) -> f64 {
    std.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Mean, population std, min and max of a list of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalarStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ScalarStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            mean,
            std: var.sqrt(),
            min,
            max,
        })
    }
}
