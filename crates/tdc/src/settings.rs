use crate::observe::{Event, LogObserver, Observer};
use crate::{Error, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Default, Debug, Clone)]
/// Analysis parameters deserialized from JSON, any of which may be omitted
pub struct Input {
    /// FDR threshold used to define positive training examples
    pub fdr_threshold: Option<f64>,
    /// Number of cross-validation folds
    pub folds: Option<usize>,
    /// Seed for fold shuffling and decoy matching
    pub seed: Option<u64>,
    /// Largest tolerated fraction of unmatched, non-shared peptides
    pub max_unmatched: Option<f64>,
    /// Largest tolerated fraction of unmatched, non-shared decoy peptides
    pub max_unmatched_decoys: Option<f64>,
    pub protein_delimiter: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
/// Actual analysis parameters - includes default values not set by user
pub struct Settings {
    pub fdr_threshold: f64,
    pub folds: usize,
    pub seed: u64,
    pub max_unmatched: f64,
    pub max_unmatched_decoys: f64,
    pub protein_delimiter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fdr_threshold: 0.01,
            folds: 3,
            seed: 1,
            max_unmatched: 0.10,
            max_unmatched_decoys: 0.05,
            protein_delimiter: ", ".into(),
        }
    }
}

fn fraction(name: &str, value: f64) -> Result<f64> {
    match (0.0..=1.0).contains(&value) {
        true => Ok(value),
        false => Err(Error::InvalidSetting(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        ))),
    }
}

impl Input {
    pub fn from_json(s: &str) -> Result<Input> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn build(self) -> Result<Settings> {
        self.build_with_observer(&LogObserver)
    }

    /// [`Input::build`], reporting warnings to `observer`
    pub fn build_with_observer(self, observer: &dyn Observer) -> Result<Settings> {
        let default = Settings::default();

        let fdr_threshold = self.fdr_threshold.unwrap_or(default.fdr_threshold);
        if !(fdr_threshold > 0.0 && fdr_threshold <= 1.0) {
            return Err(Error::InvalidSetting(format!(
                "fdr_threshold must be in (0, 1], got {}",
                fdr_threshold
            )));
        }
        if fdr_threshold > 0.10 {
            observer.observe(&Event::HighFdrThreshold { fdr_threshold });
        }

        let folds = self.folds.unwrap_or(default.folds);
        if folds < 2 {
            return Err(Error::InvalidSetting(format!(
                "at least 2 folds are required, got {}",
                folds
            )));
        }

        let protein_delimiter = self
            .protein_delimiter
            .unwrap_or(default.protein_delimiter);
        if protein_delimiter.trim().is_empty() {
            return Err(Error::InvalidSetting(
                "protein_delimiter must contain a non-whitespace character".into(),
            ));
        }

        Ok(Settings {
            fdr_threshold,
            folds,
            seed: self.seed.unwrap_or(default.seed),
            max_unmatched: fraction(
                "max_unmatched",
                self.max_unmatched.unwrap_or(default.max_unmatched),
            )?,
            max_unmatched_decoys: fraction(
                "max_unmatched_decoys",
                self.max_unmatched_decoys
                    .unwrap_or(default.max_unmatched_decoys),
            )?,
            protein_delimiter,
        })
    }
}

impl Settings {
    /// A freshly seeded random source - repeated calls yield identical streams
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }
}
