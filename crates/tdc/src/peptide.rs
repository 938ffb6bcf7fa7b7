//! Peptide sequence helpers: stripping modifications and flanking residues,
//! and matching decoy peptides back to the targets they were generated from

use fnv::{FnvHashMap, FnvHashSet};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use regex::Regex;

static MODIFICATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[\(].*?[\]\)]").expect("valid modification regex"));
static N_FLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*?\.").expect("valid flank regex"));
static C_FLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\..*?$").expect("valid flank regex"));
static LOWERCASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]").expect("valid case regex"));

/// Strip modifications and flanking amino acids from peptide sequences,
/// e.g. `K.PEP[+79.97]TIDEn[42]K.R` -> `PEPTIDEK`
///
/// Lowercase letters are sometimes used for termini or modified residues:
/// if every sequence is entirely lowercase, sequences are uppercased,
/// otherwise lowercase letters are dropped.
pub fn strip_peptides<S: AsRef<str>>(peptides: &[S]) -> Vec<String> {
    let sequences = peptides
        .iter()
        .map(|peptide| {
            let s = MODIFICATION.replace_all(peptide.as_ref(), "");
            let s = N_FLANK.replace(&s, "");
            C_FLANK.replace(&s, "").into_owned()
        })
        .collect::<Vec<_>>();

    let lowercase = sequences
        .iter()
        .all(|s| s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_uppercase));

    match lowercase {
        true => sequences.into_iter().map(|s| s.to_uppercase()).collect(),
        false => sequences
            .into_iter()
            .map(|s| LOWERCASE.replace_all(&s, "").into_owned())
            .collect(),
    }
}

/// Un-reverse a decoy generated by reversing all but the terminal residues
pub fn pseudo_forward(sequence: &str) -> String {
    let mut residues = sequence.chars().collect::<Vec<_>>();
    if residues.len() > 2 {
        let n = residues.len() - 1;
        residues[1..n].reverse();
    }
    residues.into_iter().collect()
}

/// Amino acid composition, as a sorted string of residues
fn composition(sequence: &str) -> String {
    sequence.chars().sorted_unstable().collect()
}

/// Maps decoy peptides to the target peptide they most plausibly came from
pub trait DecoyMatcher: Send + Sync {
    /// Returns `decoy -> target` for every decoy that could be matched. Each
    /// target is assigned to at most one decoy.
    fn match_decoys(&self, decoys: &[&str], targets: &[&str]) -> FnvHashMap<String, String>;
}

/// Match decoys first by un-reversing them, then to a random unused target
/// peptide with the same amino acid composition
#[derive(Copy, Clone, Debug)]
pub struct CompositionMatcher {
    seed: u64,
}

impl CompositionMatcher {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl DecoyMatcher for CompositionMatcher {
    fn match_decoys(&self, decoys: &[&str], targets: &[&str]) -> FnvHashMap<String, String> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let available = targets.iter().copied().collect::<FnvHashSet<_>>();
        let decoys = decoys.iter().copied().sorted_unstable().dedup().collect::<Vec<_>>();

        let mut matched = FnvHashMap::default();
        let mut used = FnvHashSet::default();
        let mut pending = Vec::new();
        for decoy in decoys {
            let forward = pseudo_forward(decoy);
            match available.get(forward.as_str()) {
                Some(&target) if !used.contains(target) => {
                    used.insert(target);
                    matched.insert(decoy.to_string(), forward);
                }
                _ => pending.push(decoy),
            }
        }

        if pending.is_empty() {
            return matched;
        }

        // Sorted so that the random draw does not depend on hash order
        let mut by_composition: FnvHashMap<String, Vec<&str>> = FnvHashMap::default();
        for target in available.into_iter().sorted_unstable() {
            if !used.contains(target) {
                by_composition
                    .entry(composition(target))
                    .or_default()
                    .push(target);
            }
        }

        for decoy in pending {
            if let Some(candidates) = by_composition.get_mut(&composition(decoy)) {
                if !candidates.is_empty() {
                    let target = candidates.swap_remove(rng.gen_range(0..candidates.len()));
                    matched.insert(decoy.to_string(), target.to_string());
                }
            }
        }
        matched
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strip() {
        let peptides = [
            "K.PEP[+79.97]TIDEK.R",
            "-.AC(UniMod:4)DEFK.-",
            "n[42]MPEPTIDER",
            "PEPTIDEK",
        ];
        assert_eq!(
            strip_peptides(&peptides),
            vec!["PEPTIDEK", "ACDEFK", "MPEPTIDER", "PEPTIDEK"]
        );

        // Entirely lowercase input is uppercased rather than erased
        assert_eq!(
            strip_peptides(&["k.peptidek.r", "acdefk"]),
            vec!["PEPTIDEK", "ACDEFK"]
        );
        // Mixed: lowercase marks termini or modified residues
        assert_eq!(strip_peptides(&["k.PEPTmIDEK.r", "acdefk"]), vec!["PEPTIDEK", ""]);
    }

    #[test]
    fn forward() {
        assert_eq!(pseudo_forward("PEDITPEK"), "PEPTIDEK");
        assert_eq!(pseudo_forward(&pseudo_forward("LESLIEK")), "LESLIEK");
        assert_eq!(pseudo_forward("AK"), "AK");
    }

    #[test]
    fn match_decoys() {
        let targets = ["PEPTIDEK", "EPPTIDEK", "LESLIEK", "ACDEFGHIK"];
        let decoys = ["PEDITPEK", "KEDITPEP", "KEILSEL", "WWWWK", "PEDITPEK"];
        let matcher = CompositionMatcher::new(7);
        let matched = matcher.match_decoys(&decoys, &targets);

        // Un-reversed exactly
        assert_eq!(matched["PEDITPEK"], "PEPTIDEK");
        // Same composition as PEPTIDEK, which is already taken
        assert_eq!(matched["KEDITPEP"], "EPPTIDEK");
        assert_eq!(matched["KEILSEL"], "LESLIEK");
        // No target with this composition
        assert!(!matched.contains_key("WWWWK"));
        assert_eq!(matched.len(), 3);

        // Deterministic for a fixed seed
        assert_eq!(matched, matcher.match_decoys(&decoys, &targets));
    }
}
