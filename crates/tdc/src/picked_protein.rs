//! Picked-protein grouping
//!
//! Peptides are mapped to protein groups, the mapping is checked against the
//! database, and each canonical protein is then represented by its single
//! best-scoring peptide. Target and decoy versions of a protein resolve to the
//! same canonical protein, so only the better of the two survives and protein
//! level q-values come from a fair competition.
//!
//! If the database contains no decoys, decoy peptides are first matched to
//! the target peptide they were most likely generated from, and inherit that
//! peptide's protein group with every accession prefixed as a decoy.

use crate::database::ProteinDatabase;
use crate::observe::{Event, LogObserver, Observer};
use crate::peptide::{strip_peptides, DecoyMatcher};
use crate::qvalue;
use crate::settings::Settings;
use crate::table::{groupby_max, Table};
use crate::{Error, Result};
use fnv::FnvHashMap;
use itertools::{izip, Itertools};

/// A peptide awaiting protein assignment
#[derive(Clone, Debug, PartialEq)]
pub struct PeptideRow {
    /// Index of the source row
    pub row: usize,
    pub peptide: String,
    /// Sequence without modifications or flanking residues
    pub stripped: String,
    pub score: f64,
    pub target: bool,
    pub protein_group: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchedPeptide {
    pub row: usize,
    pub peptide: String,
    pub stripped: String,
    pub score: f64,
    pub target: bool,
    pub protein_group: String,
    /// Protein that targets and decoys compete for
    pub canonical: String,
}

/// Peptides that survived [`ProteinGrouper::verify_match`]
#[derive(Clone, Debug, PartialEq)]
pub struct Verified {
    pub peptides: Vec<MatchedPeptide>,
    /// Unmatched peptides excused because they are shared between groups
    pub num_shared: usize,
    /// Unmatched peptides dropped while within tolerance
    pub num_unmatched: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProteinEntry {
    pub protein_group: String,
    pub best_peptide: String,
    pub stripped_sequence: String,
    pub score: f64,
    pub target: bool,
}

/// Best cross-linked pair for an unordered pair of canonical proteins
#[derive(Clone, Debug, PartialEq)]
pub struct CrossLinkedProteinEntry {
    pub protein_groups: [String; 2],
    pub best_peptides: [String; 2],
    pub score: f64,
    /// Number of target partners: 0, 1 or 2
    pub num_targets: u8,
}

pub struct ProteinGrouper<'a> {
    database: &'a dyn ProteinDatabase,
    matcher: &'a dyn DecoyMatcher,
    max_unmatched: f64,
    max_unmatched_decoys: f64,
    delimiter: &'a str,
    observer: &'a dyn Observer,
}

/// Individual accessions of a protein group
fn accessions<'s>(group: &'s str, delimiter: &'s str) -> impl Iterator<Item = &'s str> {
    group
        .split(delimiter.trim())
        .map(str::trim)
        .filter(|accession| !accession.is_empty())
}

fn read_peptides(
    table: &Table,
    target_column: &str,
    peptide_column: &str,
    score_column: &str,
) -> Result<Vec<PeptideRow>> {
    table.require(&[target_column, peptide_column, score_column])?;
    let targets = table.boolean(target_column)?;
    let sequences = table.text(peptide_column)?;
    let scores = table.numeric(score_column)?;
    let stripped = strip_peptides(&sequences);

    Ok(izip!(sequences, stripped, targets, scores)
        .enumerate()
        .map(|(row, (peptide, stripped, target, score))| PeptideRow {
            row,
            peptide: peptide.into(),
            stripped,
            score,
            target,
            protein_group: None,
        })
        .collect())
}

impl<'a> ProteinGrouper<'a> {
    pub fn new(
        database: &'a dyn ProteinDatabase,
        matcher: &'a dyn DecoyMatcher,
        settings: &'a Settings,
    ) -> Self {
        Self {
            database,
            matcher,
            max_unmatched: settings.max_unmatched,
            max_unmatched_decoys: settings.max_unmatched_decoys,
            delimiter: &settings.protein_delimiter,
            observer: &LogObserver,
        }
    }

    /// Send diagnostics for this run to `observer` instead of the log
    pub fn with_observer(mut self, observer: &'a dyn Observer) -> Self {
        self.observer = observer;
        self
    }

    /// One row per canonical protein, holding its best-scoring peptide.
    /// Higher scores are better; rows are returned in canonical protein order.
    pub fn picked_protein(
        &self,
        peptides: &Table,
        target_column: &str,
        peptide_column: &str,
        score_column: &str,
    ) -> Result<Vec<ProteinEntry>> {
        let peptides = read_peptides(peptides, target_column, peptide_column, score_column)?;
        let verified = self.verify_match(self.assign_groups(peptides))?;

        let keys = verified
            .peptides
            .iter()
            .map(|p| p.canonical.as_str())
            .collect_vec();
        let scores = verified.peptides.iter().map(|p| p.score).collect_vec();

        let proteins = groupby_max(&keys, &scores)
            .into_iter()
            .map(|ix| {
                let best = &verified.peptides[ix];
                ProteinEntry {
                    protein_group: best.protein_group.clone(),
                    best_peptide: best.peptide.clone(),
                    stripped_sequence: best.stripped.clone(),
                    score: best.score,
                    target: best.target,
                }
            })
            .collect_vec();

        self.observer.observe(&Event::ProteinsPicked {
            proteins: proteins.len(),
            peptides: verified.peptides.len(),
        });
        Ok(proteins)
    }

    /// Picked-protein grouping for cross-linked peptide pairs.
    ///
    /// Each position is stripped and mapped on its own, then both positions
    /// are validated together. Pairs where either partner was dropped are
    /// discarded; the remaining pairs compete on the unordered pair of
    /// canonical proteins.
    pub fn crosslink_picked_protein(
        &self,
        pairs: &Table,
        target_columns: [&str; 2],
        peptide_columns: [&str; 2],
        score_column: &str,
    ) -> Result<Vec<CrossLinkedProteinEntry>> {
        let n = pairs.len();
        let mut peptides = Vec::with_capacity(2 * n);
        for position in 0..2 {
            let rows = read_peptides(
                pairs,
                target_columns[position],
                peptide_columns[position],
                score_column,
            )?;
            peptides.extend(rows.into_iter().map(|mut p| {
                p.row += position * n;
                p
            }));
        }
        let verified = self.verify_match(self.assign_groups(peptides))?;

        let mut partners: Vec<[Option<MatchedPeptide>; 2]> = vec![[None, None]; n];
        for peptide in verified.peptides {
            let (position, row) = (peptide.row / n, peptide.row % n);
            partners[row][position] = Some(peptide);
        }
        let linked = partners
            .into_iter()
            .filter_map(|[alpha, beta]| Some((alpha?, beta?)))
            .collect_vec();

        let keys = linked
            .iter()
            .map(|(a, b)| match a.canonical <= b.canonical {
                true => (a.canonical.as_str(), b.canonical.as_str()),
                false => (b.canonical.as_str(), a.canonical.as_str()),
            })
            .collect_vec();
        let scores = linked.iter().map(|(a, _)| a.score).collect_vec();

        let proteins = groupby_max(&keys, &scores)
            .into_iter()
            .map(|ix| {
                let (a, b) = &linked[ix];
                CrossLinkedProteinEntry {
                    protein_groups: [a.protein_group.clone(), b.protein_group.clone()],
                    best_peptides: [a.peptide.clone(), b.peptide.clone()],
                    score: a.score,
                    num_targets: a.target as u8 + b.target as u8,
                }
            })
            .collect_vec();

        self.observer.observe(&Event::ProteinsPicked {
            proteins: proteins.len(),
            peptides: linked.len(),
        });
        Ok(proteins)
    }

    /// Attach a protein group to every peptide that can be mapped
    pub fn assign_groups(&self, peptides: Vec<PeptideRow>) -> Vec<PeptideRow> {
        match self.database.has_decoys() {
            true => self.group_with_decoys(peptides),
            false => self.group_without_decoys(peptides),
        }
    }

    fn group_with_decoys(&self, peptides: Vec<PeptideRow>) -> Vec<PeptideRow> {
        peptides
            .into_iter()
            .map(|mut p| {
                p.protein_group = self.database.protein_group(&p.stripped).map(String::from);
                p
            })
            .collect()
    }

    fn group_without_decoys(&self, peptides: Vec<PeptideRow>) -> Vec<PeptideRow> {
        let decoys = peptides
            .iter()
            .filter(|p| !p.target)
            .map(|p| p.stripped.as_str())
            .unique()
            .collect_vec();
        let targets = self.database.target_peptides();
        let prefix = self.database.decoy_prefix();

        let decoy_groups: FnvHashMap<String, String> = self
            .matcher
            .match_decoys(&decoys, &targets)
            .into_iter()
            .filter_map(|(decoy, target)| {
                let group = self.database.protein_group(&target)?;
                let group = accessions(group, self.delimiter)
                    .map(|accession| format!("{}{}", prefix, accession))
                    .join(self.delimiter);
                Some((decoy, group))
            })
            .collect();

        self.observer.observe(&Event::DecoysMapped {
            decoys: decoys.len(),
            mapped: decoy_groups.len(),
        });

        peptides
            .into_iter()
            .map(|mut p| {
                p.protein_group = self
                    .database
                    .protein_group(&p.stripped)
                    .map(String::from)
                    .or_else(|| decoy_groups.get(&p.stripped).cloned());
                p
            })
            .collect()
    }

    /// Check that enough peptides were mapped to a protein group, and drop
    /// those that were not.
    ///
    /// Unmatched decoys always count against the tolerance; unmatched targets
    /// only count when the database has decoys. Unmatched peptides known to be
    /// shared between protein groups are excused.
    pub fn verify_match(&self, peptides: Vec<PeptideRow>) -> Result<Verified> {
        let total = peptides.len();
        let has_decoys = self.database.has_decoys();

        let mut num_shared = 0;
        let mut unmatched = Vec::new();
        let mut unmatched_decoys = 0;
        for p in &peptides {
            if p.protein_group.is_some() || (p.target && !has_decoys) {
                continue;
            }
            if self.database.is_shared(&p.stripped) {
                num_shared += 1;
            } else {
                unmatched.push(p.stripped.clone());
                unmatched_decoys += !p.target as usize;
            }
        }

        self.observer.observe(&Event::SharedPeptidesDiscarded {
            shared: num_shared,
            total,
        });

        if !unmatched.is_empty() {
            if unmatched.len() as f64 / total as f64 > self.max_unmatched {
                return Err(Error::UnmatchedPeptides {
                    unmatched: unmatched.len(),
                    total,
                    tolerance: self.max_unmatched,
                });
            }
            self.observer.observe(&Event::UnmatchedPeptides {
                unmatched: unmatched.len(),
                total,
                examples: &unmatched,
            });
        }

        if has_decoys {
            let decoys = peptides.iter().filter(|p| !p.target).count();
            if decoys > 0 && unmatched_decoys as f64 / decoys as f64 > self.max_unmatched_decoys {
                return Err(Error::UnmatchedDecoys {
                    unmatched: unmatched_decoys,
                    total: decoys,
                    tolerance: self.max_unmatched_decoys,
                });
            }
        }

        let peptides = peptides
            .into_iter()
            .filter_map(|p| {
                let protein_group = p.protein_group?;
                let canonical = accessions(&protein_group, self.delimiter)
                    .next()
                    .map(|leader| {
                        self.database
                            .canonical_protein(leader)
                            .unwrap_or(leader)
                            .to_string()
                    })?;
                Some(MatchedPeptide {
                    row: p.row,
                    peptide: p.peptide,
                    stripped: p.stripped,
                    score: p.score,
                    target: p.target,
                    protein_group,
                    canonical,
                })
            })
            .collect();

        Ok(Verified {
            peptides,
            num_shared,
            num_unmatched: unmatched.len(),
        })
    }
}

/// Protein-level q-values for picked proteins
pub fn assign_protein_confidence(proteins: &[ProteinEntry], desc: bool) -> Result<Vec<f64>> {
    let scores = proteins.iter().map(|p| p.score).collect_vec();
    let targets = proteins.iter().map(|p| p.target).collect_vec();
    qvalue::tdc(&scores, &targets, desc)
}

/// Protein-level q-values for picked cross-linked protein pairs
pub fn assign_crosslink_protein_confidence(
    proteins: &[CrossLinkedProteinEntry],
    desc: bool,
) -> Result<Vec<f64>> {
    let scores = proteins.iter().map(|p| p.score).collect_vec();
    let targets = proteins.iter().map(|p| p.num_targets).collect_vec();
    qvalue::crosslink_tdc(&scores, &targets, desc)
}
