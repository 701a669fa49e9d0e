//! Externally supplied per-feature statistics
//!
//! A `DataStats` bundle lets a discretizer be rebuilt without the data it was
//! originally fitted on. It is the crate's persistence boundary and is stored
//! as JSON.

use super::sampling::BinStatistics;
use crate::error::{DiscretizerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Per-feature, per-bin statistics keyed by column index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStats {
    #[serde(default)]
    pub means: BTreeMap<usize, Vec<f64>>,
    #[serde(default)]
    pub stds: BTreeMap<usize, Vec<f64>>,
    #[serde(default)]
    pub mins: BTreeMap<usize, Vec<f64>>,
    #[serde(default)]
    pub maxs: BTreeMap<usize, Vec<f64>>,
    /// Bin boundaries, consumed by the external-stats strategy
    #[serde(default)]
    pub bins: BTreeMap<usize, Vec<f64>>,
}

impl DataStats {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bin boundaries of a feature
    pub fn with_bins(mut self, feature: usize, bins: Vec<f64>) -> Self {
        self.bins.insert(feature, bins);
        self
    }

    /// Set the per-bin statistics of a feature
    pub fn with_feature_stats(
        mut self,
        feature: usize,
        means: Vec<f64>,
        stds: Vec<f64>,
        mins: Vec<f64>,
        maxs: Vec<f64>,
    ) -> Self {
        self.means.insert(feature, means);
        self.stds.insert(feature, stds);
        self.mins.insert(feature, mins);
        self.maxs.insert(feature, maxs);
        self
    }

    /// Whether the bundle carries statistics (not just bins) for `feature`
    pub fn has_feature_stats(&self, feature: usize) -> bool {
        self.means.contains_key(&feature)
    }

    /// Bin boundaries for `feature`, if any
    pub fn bins_for(&self, feature: usize) -> Option<&[f64]> {
        self.bins.get(&feature).map(Vec::as_slice)
    }

    /// Statistics of `feature` as one record per bin.
    ///
    /// Returns `Ok(None)` when the bundle has no means for the feature, and an
    /// error when the four vectors are missing or not all `n_bins` long.
    pub fn feature_stats(&self, feature: usize, n_bins: usize) -> Result<Option<Vec<BinStatistics>>> {
        if !self.has_feature_stats(feature) {
            return Ok(None);
        }

        let means = stats_field(&self.means, "means", feature, n_bins)?;
        let stds = stats_field(&self.stds, "stds", feature, n_bins)?;
        let mins = stats_field(&self.mins, "mins", feature, n_bins)?;
        let maxs = stats_field(&self.maxs, "maxs", feature, n_bins)?;

        Ok(Some(
            (0..n_bins)
                .map(|i| BinStatistics {
                    mean: means[i],
                    std: stds[i],
                    min: mins[i],
                    max: maxs[i],
                    count: 0,
                })
                .collect(),
        ))
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to an indented JSON string
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

fn stats_field<'a>(
    map: &'a BTreeMap<usize, Vec<f64>>,
    name: &str,
    feature: usize,
    n_bins: usize,
) -> Result<&'a [f64]> {
    let values = map.get(&feature).ok_or_else(|| {
        DiscretizerError::ConfigError(format!(
            "data stats have means but no {} for feature {}",
            name, feature
        ))
    })?;
    if values.len() != n_bins {
        return Err(DiscretizerError::ConfigError(format!(
            "data stats {} for feature {} have {} entries, expected {}",
            name,
            feature,
            values.len(),
            n_bins
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> DataStats {
        DataStats::new()
            .with_bins(0, vec![2.0, 4.0])
            .with_feature_stats(
                0,
                vec![1.5, 3.0, 5.0],
                vec![0.5, 0.8, 0.5],
                vec![1.0, 2.0, 4.0],
                vec![2.0, 4.0, 6.0],
            )
    }

    #[test]
    fn test_feature_stats() {
        let stats = sample_stats();
        let bins = stats.feature_stats(0, 3).unwrap().unwrap();
        assert_eq!(bins.len(), 3);
        assert_eq!(bins[1].mean, 3.0);
        assert_eq!(bins[2].max, 6.0);
        assert!(stats.feature_stats(1, 3).unwrap().is_none());
    }

    #[test]
    fn test_feature_stats_length_mismatch() {
        let stats = sample_stats();
        assert!(matches!(
            stats.feature_stats(0, 4),
            Err(DiscretizerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_feature_stats_missing_field() {
        let mut stats = sample_stats();
        stats.stds.clear();
        assert!(matches!(
            stats.feature_stats(0, 3),
            Err(DiscretizerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let stats = sample_stats();
        let json = stats.to_json().unwrap();
        assert!(json.contains("\"bins\":{\"0\":[2.0,4.0]}"));
        assert_eq!(DataStats::from_json(&json).unwrap(), stats);
    }

    #[test]
    fn test_partial_json() {
        let stats = DataStats::from_json(r#"{"bins": {"3": [0.5]}}"#).unwrap();
        assert_eq!(stats.bins_for(3), Some(&[0.5][..]));
        assert!(!stats.has_feature_stats(3));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let stats = sample_stats();
        stats.save(&path).unwrap();
        assert_eq!(DataStats::load(&path).unwrap(), stats);
    }
}
