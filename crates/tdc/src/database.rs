//! Peptide to protein lookups used by picked-protein grouping
//!
//! Digesting a FASTA file and generating decoys happens elsewhere: this crate
//! only needs the [`ProteinDatabase`] view of the result. [`ProteinIndex`] is
//! an in-memory implementation built from `(peptide, accession)` evidence.

use fnv::{FnvHashMap, FnvHashSet};
use itertools::Itertools;

pub trait ProteinDatabase: Send + Sync {
    /// Delimiter-joined protein group of a peptide that maps to exactly one
    /// group. Shared and unknown peptides return `None`
    fn protein_group(&self, peptide: &str) -> Option<&str>;

    /// Every peptide that maps to a single target protein group
    fn target_peptides(&self) -> Vec<&str>;

    /// Is this peptide consistent with more than one protein group?
    fn is_shared(&self, peptide: &str) -> bool;

    /// Canonical name for a protein accession. Target and decoy versions of
    /// the same protein resolve to the same name.
    fn canonical_protein(&self, accession: &str) -> Option<&str>;

    /// Does the database contain decoy proteins?
    fn has_decoys(&self) -> bool;

    fn decoy_prefix(&self) -> &str;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProteinIndex {
    /// Peptide -> protein group, for peptides unique to one group
    pub peptide_map: FnvHashMap<String, String>,
    pub shared_peptides: FnvHashSet<String>,
    /// Protein accession -> canonical protein
    pub protein_map: FnvHashMap<String, String>,
    pub has_decoys: bool,
    pub decoy_prefix: String,
}

impl ProteinIndex {
    /// Build an index from `(peptide, protein accession)` pairs.
    ///
    /// Proteins with identical peptide evidence are collapsed into a single
    /// protein group named by their sorted accessions joined with
    /// `delimiter`; the first accession leads the group.
    pub fn build<I, P, A>(evidence: I, decoy_prefix: &str, delimiter: &str) -> Self
    where
        I: IntoIterator<Item = (P, A)>,
        P: Into<String>,
        A: Into<String>,
    {
        let mut proteins: FnvHashMap<String, Vec<String>> = FnvHashMap::default();
        for (peptide, accession) in evidence {
            proteins
                .entry(accession.into())
                .or_default()
                .push(peptide.into());
        }

        let mut evidence: FnvHashMap<Vec<String>, Vec<String>> = FnvHashMap::default();
        for (accession, mut peptides) in proteins {
            peptides.sort_unstable();
            peptides.dedup();
            evidence.entry(peptides).or_default().push(accession);
        }

        // (accessions, peptides), sorted by accessions so the build is
        // independent of hash order
        let groups = evidence
            .into_iter()
            .map(|(peptides, accessions)| (accessions.into_iter().sorted().collect_vec(), peptides))
            .sorted()
            .collect_vec();

        let mut membership: FnvHashMap<&str, Vec<usize>> = FnvHashMap::default();
        for (ix, (_, peptides)) in groups.iter().enumerate() {
            for peptide in peptides {
                membership.entry(peptide.as_str()).or_default().push(ix);
            }
        }

        let mut index = ProteinIndex {
            decoy_prefix: decoy_prefix.into(),
            ..Default::default()
        };

        for (peptide, members) in membership {
            match members.as_slice() {
                [ix] => {
                    let name = groups[*ix].0.join(delimiter);
                    index.peptide_map.insert(peptide.into(), name);
                }
                _ => {
                    index.shared_peptides.insert(peptide.into());
                }
            }
        }

        let (decoys, targets): (Vec<_>, Vec<_>) = groups
            .iter()
            .map(|(accessions, _)| accessions)
            .partition(|accessions| index.is_decoy(&accessions[0]));

        for accessions in targets {
            for accession in accessions {
                index
                    .protein_map
                    .insert(accession.clone(), accessions[0].clone());
            }
        }

        // Decoys resolve through the target they were generated from
        for accessions in decoys {
            let leader = index.strip_decoy(&accessions[0]);
            let canonical = index
                .protein_map
                .get(leader)
                .cloned()
                .unwrap_or_else(|| leader.to_string());
            for accession in accessions {
                index
                    .protein_map
                    .insert(accession.clone(), canonical.clone());
            }
        }

        index.has_decoys = index.protein_map.keys().any(|acc| index.is_decoy(acc));
        index
    }

    fn is_decoy(&self, accession: &str) -> bool {
        !self.decoy_prefix.is_empty() && accession.starts_with(&self.decoy_prefix)
    }

    fn strip_decoy<'s>(&self, accession: &'s str) -> &'s str {
        match self.is_decoy(accession) {
            true => &accession[self.decoy_prefix.len()..],
            false => accession,
        }
    }
}

impl ProteinDatabase for ProteinIndex {
    fn protein_group(&self, peptide: &str) -> Option<&str> {
        self.peptide_map.get(peptide).map(String::as_str)
    }

    fn target_peptides(&self) -> Vec<&str> {
        self.peptide_map
            .iter()
            .filter(|(_, group)| !self.is_decoy(group))
            .map(|(peptide, _)| peptide.as_str())
            .sorted_unstable()
            .collect()
    }

    fn is_shared(&self, peptide: &str) -> bool {
        self.shared_peptides.contains(peptide)
    }

    fn canonical_protein(&self, accession: &str) -> Option<&str> {
        self.protein_map
            .get(accession)
            .or_else(|| self.protein_map.get(self.strip_decoy(accession)))
            .map(String::as_str)
    }

    fn has_decoys(&self) -> bool {
        self.has_decoys
    }

    fn decoy_prefix(&self) -> &str {
        &self.decoy_prefix
    }
}
