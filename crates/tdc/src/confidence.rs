//! Confidence estimates for a scored [`PsmDataset`]
//!
//! PSM-level q-values are reported for every row. Peptide-level q-values use
//! the picked-peptide approach: only the best-scoring PSM of each peptide (or
//! peptide pair) competes.

use crate::dataset::{PsmDataset, Targets};
use crate::qvalue;
use crate::Result;

/// Scores and q-values at one level of aggregation
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    /// Row in the dataset that represents each entry
    pub rows: Vec<usize>,
    pub scores: Vec<f64>,
    pub targets: Vec<bool>,
    pub q_values: Vec<f64>,
}

impl Level {
    fn new(targets: &Targets, rows: Vec<usize>, scores: &[f64], desc: bool) -> Result<Self> {
        let targets = targets.select(&rows);
        let scores = rows.iter().map(|&r| scores[r]).collect::<Vec<_>>();
        let q_values = targets.q_values(&scores, desc)?;
        Ok(Level {
            rows,
            scores,
            targets: targets.to_bools(),
            q_values,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of targets accepted at `threshold`
    pub fn passing(&self, threshold: f64) -> usize {
        qvalue::count_passing(&self.q_values, &self.targets, threshold)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Confidence {
    /// Are higher scores better?
    pub desc: bool,
    pub psms: Level,
    pub peptides: Level,
}

impl Confidence {
    pub(crate) fn new(dataset: &PsmDataset<'_>, scores: &[f64], desc: bool) -> Result<Self> {
        let targets = dataset.targets();
        let psms = Level::new(targets, (0..dataset.len()).collect(), scores, desc)?;

        let better = |a: usize, b: usize| match desc {
            true => scores[a] > scores[b],
            false => scores[a] < scores[b],
        };

        // Best PSM per peptide; the first row wins ties
        let best = dataset
            .data()
            .group_indices(dataset.peptide_columns())?
            .into_iter()
            .filter_map(|rows| {
                rows.into_iter()
                    .reduce(|best, row| if better(row, best) { row } else { best })
            })
            .collect::<Vec<_>>();
        let peptides = Level::new(targets, best, scores, desc)?;

        Ok(Confidence {
            desc,
            psms,
            peptides,
        })
    }
}
