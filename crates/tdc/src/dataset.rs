//! Collections of PSMs and the semi-supervised training helpers built on top
//! of target-decoy competition.
//!
//! A [`PsmDataset`] borrows a caller-owned [`Table`] and never mutates it.
//! Linear and cross-linked PSMs share one type: the variant lives in
//! [`Targets`], which decides how q-values are estimated.

use crate::confidence::Confidence;
use crate::observe::{Event, LogObserver, Observer};
use crate::qvalue;
use crate::table::Table;
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;

/// Training label assigned to a PSM
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Label {
    /// Decoy PSM
    Negative = -1,
    /// Target PSM that is not confident at the current threshold
    Excluded = 0,
    /// Target PSM accepted at the current threshold
    Positive = 1,
}

impl Label {
    pub fn value(self) -> i8 {
        self as i8
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Targets {
    /// Is each PSM a target?
    Linear(Vec<bool>),
    /// Number of target peptides in each cross-linked pair (0, 1 or 2)
    CrossLinked(Vec<u8>),
}

impl Targets {
    pub fn len(&self) -> usize {
        match self {
            Targets::Linear(t) => t.len(),
            Targets::CrossLinked(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cross-linked PSMs only count as targets when both peptides are targets
    pub fn is_target(&self, ix: usize) -> bool {
        match self {
            Targets::Linear(t) => t[ix],
            Targets::CrossLinked(t) => t[ix] >= 2,
        }
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len()).map(|ix| self.is_target(ix)).collect()
    }

    /// Restrict to `rows`, in the given order
    pub fn select(&self, rows: &[usize]) -> Targets {
        match self {
            Targets::Linear(t) => Targets::Linear(rows.iter().map(|&r| t[r]).collect()),
            Targets::CrossLinked(t) => {
                Targets::CrossLinked(rows.iter().map(|&r| t[r]).collect())
            }
        }
    }

    pub fn q_values(&self, scores: &[f64], desc: bool) -> Result<Vec<f64>> {
        match self {
            Targets::Linear(t) => qvalue::tdc(scores, t, desc),
            Targets::CrossLinked(t) => qvalue::crosslink_tdc(scores, t, desc),
        }
    }
}

/// Column mapping for standard, linear PSMs
#[derive(Clone, Debug)]
pub struct LinearColumns {
    /// Coerced to boolean: non-zero values are targets
    pub target: String,
    /// Column(s) that together identify a unique mass spectrum
    pub spectrum: Vec<String>,
    /// Column(s) that together define a peptide
    pub peptide: Vec<String>,
    pub protein: String,
    /// Defaults to every column not listed above
    pub features: Option<Vec<String>>,
}

/// Column mapping for cross-linked PSMs, with one entry per peptide in a pair
#[derive(Clone, Debug)]
pub struct CrossLinkedColumns {
    pub targets: [String; 2],
    pub spectrum: Vec<String>,
    pub peptides: [Vec<String>; 2],
    pub proteins: [String; 2],
    pub features: Option<Vec<String>>,
}

/// Best single feature for separating targets from decoys
#[derive(Clone, Debug, PartialEq)]
pub struct BestFeature {
    pub feature: String,
    /// Are higher values of the feature better?
    pub desc: bool,
    /// Number of positive labels using this feature as a score
    pub passing: usize,
    pub labels: Vec<Label>,
}

pub struct PsmDataset<'a> {
    table: &'a Table,
    targets: Targets,
    spectrum_columns: Vec<String>,
    peptide_columns: Vec<String>,
    feature_columns: Vec<String>,
    // Column-major feature values, parsed once at construction
    features: Vec<Vec<f64>>,
    observer: &'a dyn Observer,
}

impl<'a> PsmDataset<'a> {
    pub fn linear(table: &'a Table, columns: LinearColumns) -> Result<Self> {
        let LinearColumns {
            target,
            spectrum,
            peptide,
            protein,
            features,
        } = columns;

        let mut other = vec![target.clone()];
        other.extend(peptide.iter().cloned());
        other.push(protein);
        Self::validate(table, &spectrum, &other)?;

        let targets = Targets::Linear(table.boolean(&target)?);
        Self::new(table, targets, spectrum, peptide, other, features)
    }

    pub fn cross_linked(table: &'a Table, columns: CrossLinkedColumns) -> Result<Self> {
        let CrossLinkedColumns {
            targets,
            spectrum,
            peptides,
            proteins,
            features,
        } = columns;

        let peptide = peptides.concat();
        let mut other = targets.to_vec();
        other.extend(peptide.iter().cloned());
        other.extend(proteins);
        Self::validate(table, &spectrum, &other)?;

        let [alpha, beta] = [table.boolean(&targets[0])?, table.boolean(&targets[1])?];
        let counts = alpha
            .iter()
            .zip(&beta)
            .map(|(&a, &b)| a as u8 + b as u8)
            .collect();

        Self::new(
            table,
            Targets::CrossLinked(counts),
            spectrum,
            peptide,
            other,
            features,
        )
    }

    fn validate(table: &Table, spectrum: &[String], other: &[String]) -> Result<()> {
        if spectrum.is_empty() {
            return Err(Error::InvalidSetting(
                "at least one spectrum column is required".into(),
            ));
        }
        let used = other.iter().chain(spectrum).collect::<Vec<_>>();
        table.require(&used)
    }

    fn new(
        table: &'a Table,
        targets: Targets,
        spectrum_columns: Vec<String>,
        peptide_columns: Vec<String>,
        other: Vec<String>,
        features: Option<Vec<String>>,
    ) -> Result<Self> {
        let feature_columns = match features {
            Some(features) => {
                table.require(&features)?;
                features
            }
            None => table
                .columns()
                .iter()
                .filter(|c| !other.contains(c) && !spectrum_columns.contains(c))
                .cloned()
                .collect(),
        };
        if feature_columns.is_empty() {
            return Err(Error::InvalidSetting(
                "no feature columns were found".into(),
            ));
        }

        let features = feature_columns
            .iter()
            .map(|name| table.numeric(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(PsmDataset {
            table,
            targets,
            spectrum_columns,
            peptide_columns,
            feature_columns,
            features,
            observer: &LogObserver,
        })
    }

    /// Send diagnostics for this run to `observer` instead of the log
    pub fn with_observer(mut self, observer: &'a dyn Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The full collection of PSMs
    pub fn data(&self) -> &Table {
        self.table
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn spectrum_columns(&self) -> &[String] {
        &self.spectrum_columns
    }

    /// Peptide columns; for cross-linked PSMs, alpha columns come first
    pub fn peptide_columns(&self) -> &[String] {
        &self.peptide_columns
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn metadata_columns(&self) -> Vec<&str> {
        self.table
            .columns()
            .iter()
            .filter(|c| !self.feature_columns.contains(c))
            .map(String::as_str)
            .collect()
    }

    pub fn feature(&self, name: &str) -> Option<&[f64]> {
        self.feature_columns
            .iter()
            .position(|c| c == name)
            .map(|ix| self.features[ix].as_slice())
    }

    /// Copy of the PSMs at `rows`, e.g. a cross-validation fold
    pub fn take(&self, rows: &[usize]) -> Table {
        self.table.take(rows)
    }

    fn check_len(&self, scores: &[f64]) -> Result<()> {
        match scores.len() == self.len() {
            true => Ok(()),
            false => Err(Error::LengthMismatch {
                expected: self.len(),
                found: scores.len(),
            }),
        }
    }

    fn labels(&self, scores: &[f64], fdr_threshold: f64, desc: bool) -> Result<Vec<Label>> {
        self.check_len(scores)?;
        let q_values = self.targets.q_values(scores, desc)?;
        Ok(q_values
            .iter()
            .enumerate()
            .map(|(ix, &q)| match (self.targets.is_target(ix), q <= fdr_threshold) {
                (false, _) => Label::Negative,
                (true, true) => Label::Positive,
                (true, false) => Label::Excluded,
            })
            .collect())
    }

    /// Training label for each PSM, given its score.
    ///
    /// Decoys are always negative examples. Targets accepted at
    /// `fdr_threshold` are positive, the remaining targets are excluded from
    /// training.
    pub fn update_labels(
        &self,
        scores: &[f64],
        fdr_threshold: f64,
        desc: bool,
    ) -> Result<Vec<Label>> {
        let labels = self.labels(scores, fdr_threshold, desc)?;
        let count = |label| labels.iter().filter(|&&l| l == label).count();
        self.observer.observe(&Event::LabelsUpdated {
            positives: count(Label::Positive),
            negatives: count(Label::Negative),
            excluded: count(Label::Excluded),
        });
        Ok(labels)
    }

    /// Find the feature, and direction, that accepts the most targets at
    /// `fdr_threshold` when used directly as a score.
    ///
    /// On ties, the first feature wins and descending beats ascending.
    pub fn find_best_feature(&self, fdr_threshold: f64) -> Result<BestFeature> {
        let mut best: Option<(usize, bool, usize)> = None;
        for desc in [true, false] {
            let passing = self
                .features
                .par_iter()
                .map(|values| {
                    self.labels(values, fdr_threshold, desc)
                        .map(|labels| labels.iter().filter(|&&l| l == Label::Positive).count())
                })
                .collect::<Result<Vec<_>>>()?;

            for (ix, passing) in passing.into_iter().enumerate() {
                if passing > best.map(|(_, _, n)| n).unwrap_or(0) {
                    best = Some((ix, desc, passing));
                }
            }
        }

        let (ix, desc, passing) = best.ok_or(Error::NoPassingFeature { fdr_threshold })?;
        let feature = self.feature_columns[ix].clone();
        self.observer.observe(&Event::BestFeature {
            feature: &feature,
            desc,
            passing,
        });

        Ok(BestFeature {
            labels: self.labels(&self.features[ix], fdr_threshold, desc)?,
            feature,
            desc,
            passing,
        })
    }

    /// Calibrate scores as described in Granholm et al.
    ///
    /// The lowest positive score is mapped to 0 and the median negative score
    /// to -1: `(score - target) / (target - decoy)`.
    ///
    /// Granholm V, Noble WS, Käll L. A cross-validation scheme for machine
    /// learning algorithms in shotgun proteomics. BMC Bioinformatics. 2012
    pub fn calibrate_scores(
        &self,
        scores: &[f64],
        fdr_threshold: f64,
        desc: bool,
    ) -> Result<Vec<f64>> {
        let labels = self.labels(scores, fdr_threshold, desc)?;

        let mut positives = Vec::new();
        let mut negatives = Vec::new();
        for (&score, label) in scores.iter().zip(&labels) {
            match label {
                Label::Positive => positives.push(score),
                Label::Negative => negatives.push(score),
                Label::Excluded => {}
            }
        }
        if positives.is_empty() || negatives.is_empty() {
            return Err(Error::MissingLabels {
                positives: positives.len(),
                negatives: negatives.len(),
            });
        }

        let target = positives.iter().copied().fold(f64::INFINITY, f64::min);
        let decoy = median(&mut negatives);
        if target == decoy {
            return Err(Error::DegenerateCalibration { anchor: target });
        }

        self.observer.observe(&Event::Calibrated {
            target_anchor: target,
            decoy_anchor: decoy,
        });

        let scale = target - decoy;
        Ok(scores.iter().map(|s| (s - target) / scale).collect())
    }

    /// Randomly split the PSMs into `folds` groups of spectra.
    ///
    /// All PSMs from the same spectrum land in the same fold. Every fold holds
    /// `spectra / folds` spectra, except the last, which also takes the
    /// remainder.
    pub fn split<R: Rng + ?Sized>(&self, folds: usize, rng: &mut R) -> Result<Vec<Vec<usize>>> {
        let mut spectra = self.table.group_indices(&self.spectrum_columns)?;
        if folds == 0 || spectra.len() < folds {
            return Err(Error::InvalidFolds {
                folds,
                spectra: spectra.len(),
            });
        }

        let n_spectra = spectra.len();
        spectra.shuffle(rng);

        let size = n_spectra / folds;
        let mut groups = spectra.into_iter();
        let splits = (0..folds)
            .map(|fold| {
                let take = match fold + 1 == folds {
                    true => usize::MAX,
                    false => size,
                };
                groups.by_ref().take(take).flatten().collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        self.observer.observe(&Event::FoldsCreated {
            folds,
            spectra: n_spectra,
            psms: self.len(),
        });
        Ok(splits)
    }

    /// q-values for PSMs and peptides, given a score for each PSM
    pub fn assign_confidence(&self, scores: &[f64], desc: bool) -> Result<Confidence> {
        self.check_len(scores)?;
        Confidence::new(self, scores, desc)
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    match values.len() % 2 {
        0 => (values[mid - 1] + values[mid]) / 2.0,
        _ => values[mid],
    }
}
