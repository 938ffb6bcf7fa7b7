//! q-value estimation using target-decoy competition
//!
//! Both estimators share the same skeleton:
//! * Rank entries best-first (stable, so ties keep their input order)
//! * Estimate the local FDR once per block of tied scores
//! * Convert FDR to q-values with a cumulative minimum from the worst score up
//!
//! Crosslinked FDR follows Walzthoeni et al., https://pubmed.ncbi.nlm.nih.gov/22772142/

use crate::{Error, Result};
use std::cmp::Ordering;

/// Order `a` before `b` if it is the better score. NaN is always worst, and
/// all NaNs are tied regardless of sign or payload.
fn compare(a: f64, b: f64, desc: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if desc => b.total_cmp(&a),
        (false, false) => a.total_cmp(&b),
    }
}

/// Indices of `scores`, ordered from best to worst score
fn rank(scores: &[f64], desc: bool) -> Vec<usize> {
    let mut order = (0..scores.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| compare(scores[a], scores[b], desc));
    order
}

/// Shared TDC walk. `accept` is called once per entry in rank order; it
/// updates the running counts and returns the current FDR estimate.
fn competition<F>(scores: &[f64], desc: bool, mut accept: F) -> Vec<f64>
where
    F: FnMut(usize) -> f64,
{
    let order = rank(scores, desc);
    let mut local = vec![1.0f64; order.len()];

    let mut start = 0;
    while start < order.len() {
        let score = scores[order[start]];
        let mut end = start + 1;
        while end < order.len() && compare(scores[order[end]], score, desc).is_eq() {
            end += 1;
        }

        // Every member of a tie block receives the estimate computed after
        // the whole block has been counted
        let mut fdr = 1.0;
        for &ix in &order[start..end] {
            fdr = accept(ix);
        }
        local[start..end].fill(fdr.min(1.0));
        start = end;
    }

    // Reverse slice, and calculate the cumulative minimum
    // `q = q[::-1].cummin()[::-1]`
    let mut q_values = vec![1.0f64; order.len()];
    let mut q_min = 1.0f64;
    for (rank, &ix) in order.iter().enumerate().rev() {
        q_min = q_min.min(local[rank]);
        q_values[ix] = q_min;
    }
    q_values
}

/// Estimate q-values for linear PSMs, returned in input order.
///
/// FDR at each score threshold is `(decoys + 1) / max(targets, 1)`, clipped
/// to 1.0.
///
/// * `desc`: are higher scores better?
pub fn tdc(scores: &[f64], targets: &[bool], desc: bool) -> Result<Vec<f64>> {
    if scores.len() != targets.len() {
        return Err(Error::LengthMismatch {
            expected: scores.len(),
            found: targets.len(),
        });
    }

    let mut decoy = 1;
    let mut target = 0;
    Ok(competition(scores, desc, |ix| {
        match targets[ix] {
            true => target += 1,
            false => decoy += 1,
        }
        decoy as f64 / target.max(1) as f64
    }))
}

/// Estimate q-values for cross-linked PSMs, returned in input order.
///
/// `num_targets` holds the number of target peptides in each pair: 2 for
/// target-target, 1 for target-decoy, 0 for decoy-decoy. A target-decoy pair
/// can arise from a false match on either partner, while each decoy-decoy pair
/// is also counted in the target-decoy population, so the number of false
/// target-target pairs is estimated as `TD - DD`.
///
/// FDR is `(max(TD - DD, 0) + 1) / max(TT, 1)`, clipped to 1.0. Counts above
/// 2 are treated as target-target.
pub fn crosslink_tdc(scores: &[f64], num_targets: &[u8], desc: bool) -> Result<Vec<f64>> {
    if scores.len() != num_targets.len() {
        return Err(Error::LengthMismatch {
            expected: scores.len(),
            found: num_targets.len(),
        });
    }

    let (mut tt, mut td, mut dd) = (0i64, 0i64, 0i64);
    Ok(competition(scores, desc, |ix| {
        match num_targets[ix] {
            0 => dd += 1,
            1 => td += 1,
            _ => tt += 1,
        }
        ((td - dd).max(0) + 1) as f64 / tt.max(1) as f64
    }))
}

/// Number of target entries accepted at `threshold`
pub fn count_passing(q_values: &[f64], targets: &[bool], threshold: f64) -> usize {
    q_values
        .iter()
        .zip(targets)
        .filter(|&(q, target)| *target && *q <= threshold)
        .count()
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn all_close(lhs: &[f64], rhs: &[f64]) -> bool {
        lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(l, r)| (l - r).abs() <= 1E-9)
    }

    #[test]
    fn linear_tdc() {
        let scores = [5., 4., 3., 2., 1.];
        let targets = [true, true, false, true, false];
        let q = tdc(&scores, &targets, true).unwrap();
        // Local FDR: [1, 1/2, 1, 2/3, 1] -> entries before the first decoy
        // inherit the best downstream estimate
        assert!(all_close(&q, &[0.5, 0.5, 2. / 3., 2. / 3., 1.0]), "{:?}", q);

        // Ascending scores, shuffled input order: same answer, mapped back
        let scores = [3., 1., 5., 2., 4.];
        let targets = [false, true, false, true, true];
        let q = tdc(&scores, &targets, false).unwrap();
        assert!(all_close(&q, &[2. / 3., 0.5, 1.0, 0.5, 2. / 3.]), "{:?}", q);
    }

    #[test]
    fn all_decoys() {
        let scores = (0..10).map(|s| s as f64).collect::<Vec<_>>();
        let q = tdc(&scores, &[false; 10], true).unwrap();
        assert_eq!(q, vec![1.0; 10]);
    }

    #[test]
    fn empty() {
        assert!(tdc(&[], &[], true).unwrap().is_empty());
        assert!(crosslink_tdc(&[], &[], false).unwrap().is_empty());
    }

    #[test]
    fn length_mismatch() {
        assert!(matches!(
            tdc(&[1.0, 2.0], &[true], true),
            Err(Error::LengthMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn ties_share_q_values() {
        // A decoy tied with the best target must drag the whole block down
        let scores = [10., 10., 10., 1.];
        let targets = [true, false, true, true];
        let q = tdc(&scores, &targets, true).unwrap();
        assert_eq!(q[0], q[1]);
        assert_eq!(q[1], q[2]);
        // Block estimate is 2/2, the trailing target lowers it to 2/3
        assert!(all_close(&q, &[2. / 3., 2. / 3., 2. / 3., 2. / 3.]), "{:?}", q);
    }

    #[test]
    fn crosslinked() {
        let scores = [5., 4., 3., 2., 1.];
        let num_targets = [2, 2, 1, 2, 0];
        let q = crosslink_tdc(&scores, &num_targets, true).unwrap();
        // Local FDR: [1, 1/2, 2/2, 2/3, 1/3]
        assert!(all_close(&q, &[1. / 3.; 5]), "{:?}", q);

        let num_targets = [1, 1, 1, 1, 1];
        let q = crosslink_tdc(&scores, &num_targets, true).unwrap();
        assert_eq!(q, vec![1.0; 5]);
    }

    #[test]
    fn passing() {
        let scores = [5., 4., 3., 2., 1.];
        let targets = [true, true, false, true, false];
        let q = tdc(&scores, &targets, true).unwrap();
        assert_eq!(count_passing(&q, &targets, 0.5), 2);
        assert_eq!(count_passing(&q, &targets, 1.0), 3);
        assert_eq!(count_passing(&q, &targets, 0.1), 0);
    }

    #[quickcheck]
    fn monotone(data: Vec<(i16, bool)>, desc: bool) -> bool {
        let scores = data.iter().map(|(s, _)| *s as f64).collect::<Vec<_>>();
        let targets = data.iter().map(|(_, t)| *t).collect::<Vec<_>>();
        let q = tdc(&scores, &targets, desc).unwrap();

        (0..scores.len()).all(|a| {
            (0..scores.len()).all(|b| {
                let better = match desc {
                    true => scores[a] >= scores[b],
                    false => scores[a] <= scores[b],
                };
                !better || q[a] <= q[b]
            })
        }) && q.iter().all(|q| (0.0..=1.0).contains(q))
    }

    #[test]
    fn nan_scores_rank_last() {
        // Regardless of direction or sign bit, a missing score never
        // outranks a real one
        for nan in [f64::NAN, -f64::NAN] {
            for desc in [true, false] {
                let q = tdc(&[nan, 3., 2., 1.], &[false, true, true, true], desc).unwrap();
                assert!(all_close(&q, &[2. / 3., 1. / 3., 1. / 3., 1. / 3.]), "{:?}", q);
            }
        }

        // NaNs form a single tie block
        let q = tdc(&[f64::NAN, 1., -f64::NAN], &[true, true, false], true).unwrap();
        assert_eq!(q[0], q[2]);
        assert!(all_close(&q, &[1.0, 1.0, 1.0]), "{:?}", q);

        let q = crosslink_tdc(&[-f64::NAN, 2., 1.], &[1, 2, 2], true).unwrap();
        assert!(all_close(&q, &[1.0, 0.5, 0.5]), "{:?}", q);
    }

    #[quickcheck]
    fn crosslink_monotone(data: Vec<(i16, u8)>, desc: bool) -> bool {
        let scores = data.iter().map(|(s, _)| *s as f64).collect::<Vec<_>>();
        let targets = data.iter().map(|(_, t)| t % 3).collect::<Vec<_>>();
        let q = crosslink_tdc(&scores, &targets, desc).unwrap();

        (0..scores.len()).all(|a| {
            (0..scores.len()).all(|b| {
                let better = match desc {
                    true => scores[a] >= scores[b],
                    false => scores[a] <= scores[b],
                };
                !better || q[a] <= q[b]
            })
        }) && q.iter().all(|q| (0.0..=1.0).contains(q))
    }
}
