//! Per-scan ranking, synopsis filtering and first-hit selection

use std::cmp::Ordering;

use fnv::{FnvHashMap, FnvHashSet};
use serde::{Deserialize, Serialize};

use crate::resolver::AppliedModification;

/// What the ranking engine needs to know about one search result
pub trait Hit {
    fn scan(&self) -> u32;
    fn charge(&self) -> u8;
    /// Spectrum-level score; smaller is better
    fn primary(&self) -> f64;
    fn secondary(&self) -> f64;
    /// FDR-type value, if the engine reported one
    fn fdr(&self) -> Option<f64>;
    fn peptide(&self) -> &str;
    fn protein(&self) -> &str;
    fn mh(&self) -> f64;
    fn rank(&self) -> u32;
    fn set_rank(&mut self, rank: u32);
    fn modifications(&self) -> &[AppliedModification];
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Keep results with a primary score at or below this value
    pub primary: f64,
    /// Keep results with a secondary score at or below this value
    pub secondary: f64,
    /// Keep results with an FDR-type value in (0, fdr)
    pub fdr: f64,
}

impl Thresholds {
    /// A result needs to pass only one of the three criteria
    pub fn passes<H: Hit>(&self, hit: &H) -> bool {
        hit.secondary() <= self.secondary
            || hit.primary() <= self.primary
            || hit
                .fdr()
                .map(|fdr| fdr > 0.0 && fdr < self.fdr)
                .unwrap_or(false)
    }
}

fn score_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Order within a file: scan, charge, best primary score first, then
/// peptide and protein
pub fn scan_order<H: Hit>(a: &H, b: &H) -> Ordering {
    a.scan()
        .cmp(&b.scan())
        .then_with(|| a.charge().cmp(&b.charge()))
        .then_with(|| score_cmp(a.primary(), b.primary()))
        .then_with(|| a.peptide().cmp(b.peptide()))
        .then_with(|| a.protein().cmp(b.protein()))
}

/// Order of the written output: best primary score first, then scan,
/// charge, peptide and protein
pub fn output_order<H: Hit>(a: &H, b: &H) -> Ordering {
    score_cmp(a.primary(), b.primary())
        .then_with(|| a.scan().cmp(&b.scan()))
        .then_with(|| a.charge().cmp(&b.charge()))
        .then_with(|| a.peptide().cmp(b.peptide()))
        .then_with(|| a.protein().cmp(b.protein()))
}

/// Sort by [`scan_order`] and rank every scan.
///
/// Ranks are shared across charge states. The best score gets rank 1 and the
/// rank only increases when the score changes, so tied results share a rank
/// and the next distinct score gets the following integer.
pub fn assign_ranks<H: Hit>(results: &mut [H]) {
    results.sort_by(scan_order);

    let mut start = 0;
    while start < results.len() {
        let scan = results[start].scan();
        let end = results[start..]
            .iter()
            .position(|r| r.scan() != scan)
            .map(|p| start + p)
            .unwrap_or(results.len());

        let run = &mut results[start..end];
        let mut order = (0..run.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| score_cmp(run[a].primary(), run[b].primary()));

        let mut rank = 0;
        let mut last = f64::NAN;
        for ix in order {
            let score = run[ix].primary();
            if rank == 0 || (score - last).abs() > f64::EPSILON {
                rank += 1;
                last = score;
            }
            run[ix].set_rank(rank);
        }
        start = end;
    }
}

/// Results passing `thresholds`. Within a scan, duplicates of the same
/// peptide, protein, MH and primary score are dropped and the first of them
/// is kept; other scans are never affected.
pub fn synopsis<H: Hit + Clone>(results: &[H], thresholds: &Thresholds) -> Vec<H> {
    let mut seen = FnvHashSet::default();
    let mut selected = results
        .iter()
        .filter(|r| thresholds.passes(*r))
        .filter(|r| {
            seen.insert((
                r.scan(),
                r.peptide().to_string(),
                r.protein().to_string(),
                r.mh().to_bits(),
                r.primary().to_bits(),
            ))
        })
        .cloned()
        .collect::<Vec<_>>();
    selected.sort_by(output_order);
    selected
}

/// The single best result of every (scan, charge).
///
/// When several proteins explain the best peptide equally well, the protein
/// that comes first in the FASTA file wins; proteins missing from the FASTA
/// file rank after those present, and otherwise the first one seen is used.
/// First hits are not filtered by score.
pub fn first_hits<H, F>(results: &[H], protein_ordinal: F) -> Vec<H>
where
    H: Hit + Clone,
    F: Fn(&str) -> Option<usize>,
{
    // (scan, charge) -> index of the chosen result
    let mut best: FnvHashMap<(u32, u8), usize> = FnvHashMap::default();
    let mut keys = Vec::new();

    for (ix, result) in results.iter().enumerate() {
        let key = (result.scan(), result.charge());
        let current = match best.get(&key) {
            None => {
                keys.push(key);
                best.insert(key, ix);
                continue;
            }
            Some(&current) => &results[current],
        };

        let delta = (result.primary() - current.primary()).abs();
        let replace = if delta > f64::EPSILON {
            result.primary() < current.primary()
        } else if result.peptide() == current.peptide() {
            match (protein_ordinal(result.protein()), protein_ordinal(current.protein())) {
                (Some(a), Some(b)) => a < b,
                (Some(_), None) => true,
                _ => false,
            }
        } else {
            false
        };
        if replace {
            best.insert(key, ix);
        }
    }

    let mut selected = keys
        .into_iter()
        .filter_map(|key| best.get(&key))
        .map(|&ix| results[ix].clone())
        .collect::<Vec<_>>();
    selected.sort_by(output_order);
    selected
}
