//! Target-decoy competition for peptide-spectrum matches
//!
//! q-value estimation for linear and cross-linked PSMs, the semi-supervised
//! labelling helpers used to seed a discriminant model, spectrum-grouped
//! cross-validation folds, and picked-protein grouping.

pub mod confidence;
pub mod database;
pub mod dataset;
pub mod observe;
pub mod peptide;
pub mod picked_protein;
pub mod qvalue;
pub mod settings;
pub mod table;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// One or more required columns are not present in the input table
    MissingColumns(Vec<String>),
    ColumnType {
        column: String,
        expected: &'static str,
    },
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    /// Parallel arrays (scores, labels, ...) disagree in length
    LengthMismatch {
        expected: usize,
        found: usize,
    },
    DegenerateCalibration {
        anchor: f64,
    },
    InvalidFolds {
        folds: usize,
        spectra: usize,
    },
    InvalidSetting(String),
    Json(serde_json::Error),
    /// No feature passes any target at the requested threshold
    NoPassingFeature {
        fdr_threshold: f64,
    },
    MissingLabels {
        positives: usize,
        negatives: usize,
    },
    UnmatchedPeptides {
        unmatched: usize,
        total: usize,
        tolerance: f64,
    },
    UnmatchedDecoys {
        unmatched: usize,
        total: usize,
        tolerance: f64,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumns(cols) => write!(
                f,
                "the following specified columns were not found: {}",
                cols.join(", ")
            ),
            Self::ColumnType { column, expected } => {
                write!(f, "column `{}` must contain {} values", column, expected)
            }
            Self::ColumnLength {
                column,
                expected,
                found,
            } => write!(
                f,
                "column `{}` has {} rows, but the table has {}",
                column, found, expected
            ),
            Self::LengthMismatch { expected, found } => write!(
                f,
                "expected {} values (one per row), found {}",
                expected, found
            ),
            Self::DegenerateCalibration { anchor } => write!(
                f,
                "cannot calibrate scores: target and decoy anchors are both {}",
                anchor
            ),
            Self::InvalidFolds { folds, spectra } => write!(
                f,
                "cannot split {} spectra into {} folds",
                spectra, folds
            ),
            Self::InvalidSetting(msg) => write!(f, "invalid setting: {}", msg),
            Self::Json(e) => e.fmt(f),
            Self::NoPassingFeature { fdr_threshold } => write!(
                f,
                "no PSMs found below the FDR threshold ({}) using any single feature",
                fdr_threshold
            ),
            Self::MissingLabels {
                positives,
                negatives,
            } => write!(
                f,
                "cannot calibrate scores with {} positive and {} negative examples",
                positives, negatives
            ),
            Self::UnmatchedPeptides {
                unmatched,
                total,
                tolerance,
            } => write!(
                f,
                "{} of {} peptides ({:.1}%) could not be matched to proteins, exceeding the {:.0}% tolerance. \
                 Verify that your digest settings are correct.",
                unmatched,
                total,
                100.0 * *unmatched as f64 / *total as f64,
                100.0 * tolerance
            ),
            Self::UnmatchedDecoys {
                unmatched,
                total,
                tolerance,
            } => write!(
                f,
                "{} of {} decoy peptides ({:.1}%) could not be mapped to proteins, exceeding the {:.0}% tolerance. \
                 Was the correct FASTA file and digest settings used?",
                unmatched,
                total,
                100.0 * *unmatched as f64 / *total as f64,
                100.0 * tolerance
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
