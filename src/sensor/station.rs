//! Station identity from the fixed-width digital pattern.

use serde::{Deserialize, Serialize};

use crate::error::SensingError;

use super::StationPatternSource;

/// One configured pattern and the station it identifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationPattern {
    pub pattern: Vec<u8>,
    pub station: u8,
}

impl StationPattern {
    pub fn new(pattern: impl Into<Vec<u8>>, station: u8) -> Self {
        Self {
            pattern: pattern.into(),
            station,
        }
    }
}

/// Maps live patterns to station ids by exact match.
#[derive(Debug, Clone)]
pub struct StationResolver {
    patterns: Vec<StationPattern>,
}

impl StationResolver {
    pub fn new(patterns: Vec<StationPattern>) -> Self {
        Self { patterns }
    }

    pub fn resolve(&self, live: &[u8]) -> Result<u8, SensingError> {
        for entry in &self.patterns {
            tracing::debug!(
                "[Station] live {:?} vs configured {:?} -> {}",
                live,
                entry.pattern,
                entry.station
            );
            if entry.pattern.as_slice() == live {
                tracing::info!("[Station] Found station: {}", entry.station);
                return Ok(entry.station);
            }
        }
        Err(SensingError::UndefinedStation {
            pattern: live.to_vec(),
        })
    }

    /// Read the pattern from `source` and resolve it.
    pub fn read_station(&self, source: &mut dyn StationPatternSource) -> Result<u8, SensingError> {
        let live = source.read_pattern();
        self.resolve(&live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::FixedPattern;

    fn resolver() -> StationResolver {
        StationResolver::new(vec![
            StationPattern::new([1, 1, 1], 1),
            StationPattern::new([1, 1, 0], 2),
        ])
    }

    #[test]
    fn test_resolve_exact_match() {
        assert_eq!(resolver().resolve(&[1, 1, 0]), Ok(2));
    }

    #[test]
    fn test_resolve_unknown_pattern_fails() {
        let err = resolver().resolve(&[0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            SensingError::UndefinedStation {
                pattern: vec![0, 0, 0]
            }
        );
    }

    #[test]
    fn test_resolve_requires_full_width() {
        assert!(resolver().resolve(&[1, 1]).is_err());
    }

    #[test]
    fn test_read_station_from_source() {
        let mut source = FixedPattern(vec![1, 1, 1]);
        assert_eq!(resolver().read_station(&mut source), Ok(1));
    }
}
