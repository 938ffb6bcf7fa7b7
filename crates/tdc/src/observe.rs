//! Structured diagnostics emitted while training and grouping
//!
//! Components never log directly: an [`Observer`] is handed to each of them
//! for the duration of an analysis run. [`LogObserver`] forwards everything to
//! the `log` facade.

#[derive(Debug, Clone, PartialEq)]
pub enum Event<'a> {
    BestFeature {
        feature: &'a str,
        desc: bool,
        passing: usize,
    },
    LabelsUpdated {
        positives: usize,
        negatives: usize,
        excluded: usize,
    },
    Calibrated {
        target_anchor: f64,
        decoy_anchor: f64,
    },
    FoldsCreated {
        folds: usize,
        spectra: usize,
        psms: usize,
    },
    DecoysMapped {
        decoys: usize,
        mapped: usize,
    },
    SharedPeptidesDiscarded {
        shared: usize,
        total: usize,
    },
    /// Unmatched, non-shared peptides below the failure tolerance
    UnmatchedPeptides {
        unmatched: usize,
        total: usize,
        examples: &'a [String],
    },
    ProteinsPicked {
        proteins: usize,
        peptides: usize,
    },
    /// Requested FDR threshold is unusually permissive
    HighFdrThreshold {
        fdr_threshold: f64,
    },
}

pub trait Observer: Send + Sync {
    fn observe(&self, event: &Event<'_>);
}

#[derive(Copy, Clone, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn observe(&self, event: &Event<'_>) {
        match event {
            Event::BestFeature {
                feature,
                desc,
                passing,
            } => log::info!(
                "- selected feature `{}` ({}) with {} PSMs passing",
                feature,
                if *desc { "descending" } else { "ascending" },
                passing
            ),
            Event::LabelsUpdated {
                positives,
                negatives,
                excluded,
            } => log::trace!(
                "- labels updated: {} positive, {} negative, {} excluded",
                positives,
                negatives,
                excluded
            ),
            Event::Calibrated {
                target_anchor,
                decoy_anchor,
            } => log::trace!(
                "- calibrated scores: target anchor {}, decoy anchor {}",
                target_anchor,
                decoy_anchor
            ),
            Event::FoldsCreated {
                folds,
                spectra,
                psms,
            } => log::info!(
                "- split {} PSMs from {} spectra into {} folds",
                psms,
                spectra,
                folds
            ),
            Event::DecoysMapped { decoys, mapped } => log::info!(
                "- mapped {} of {} decoy peptides to protein groups",
                mapped,
                decoys
            ),
            Event::SharedPeptidesDiscarded { shared, total } => log::debug!(
                "{} out of {} peptides were discarded as shared peptides",
                shared,
                total
            ),
            Event::UnmatchedPeptides {
                unmatched,
                total,
                examples,
            } => {
                log::debug!("unmatched peptides: {:?}", examples);
                log::warn!(
                    "{} out of {} peptides could not be mapped. Check your digest settings.",
                    unmatched,
                    total
                )
            }
            Event::ProteinsPicked { proteins, peptides } => log::info!(
                "- picked {} protein groups from {} peptides",
                proteins,
                peptides
            ),
            Event::HighFdrThreshold { fdr_threshold } => log::warn!(
                "FDR threshold {} is higher than expected, training labels may be unreliable",
                fdr_threshold
            ),
        }
    }
}

/// Discards every event
#[derive(Copy, Clone, Debug, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn observe(&self, _: &Event<'_>) {}
}
