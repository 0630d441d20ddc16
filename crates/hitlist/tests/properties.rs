//! Properties of modification resolution and ranking over random inputs

use hitlist_core::modification::ModificationCatalog;
use hitlist_core::ranking::{assign_ranks, first_hits, synopsis, Hit, Thresholds};
use hitlist_core::resolver::{AppliedModification, ModTextResolver, ResolverWarnings};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

const RESIDUES: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

fn catalog() -> ModificationCatalog {
    let mut catalog = ModificationCatalog::default();
    catalog.add_static(&"C".parse().unwrap(), 57.021464, "Carbamidomethyl");
    catalog.add_dynamic(&"M".parse().unwrap(), 15.994915, "Oxidation");
    catalog.add_dynamic(&"STY".parse().unwrap(), 79.966331, "Phospho");
    catalog.add_dynamic(&"K".parse().unwrap(), 14.01565, "Methyl");
    catalog.add_dynamic(&"^".parse().unwrap(), 42.010565, "Acetyl");
    catalog.add_dynamic(&"$".parse().unwrap(), -0.984016, "Amidated");
    catalog
}

/// Build `K.<residues with deltas>.R`; returns the token and the deltas as
/// they will be read back
fn build_peptide(sites: &[(u8, i16, bool)], leading: Option<i16>) -> (String, Vec<f64>) {
    let mut token = String::from("K.");
    let mut deltas = Vec::new();
    if let Some(mass) = leading {
        let text = format!("{:+.2}", mass as f64 / 100.0);
        deltas.push(text.parse::<f64>().unwrap());
        token.push_str(&text);
    }
    for &(residue, mass, modified) in sites {
        token.push(RESIDUES[residue as usize % RESIDUES.len()] as char);
        if modified {
            let text = format!("{:+.2}", mass as f64 / 100.0);
            deltas.push(text.parse::<f64>().unwrap());
            token.push_str(&text);
        }
    }
    token.push_str(".R");
    (token, deltas)
}

#[quickcheck]
fn total_mass_is_the_sum_of_deltas(sites: Vec<(u8, i16, bool)>, leading: Option<i16>) -> TestResult {
    if sites.is_empty() || sites.len() > 40 {
        return TestResult::discard();
    }
    let catalog = catalog();
    let resolver = ModTextResolver::new(&catalog);
    let mut warnings = ResolverWarnings::default();

    let (token, deltas) = build_peptide(&sites, leading);
    let resolved = resolver.resolve_mass_deltas(&token, &mut warnings);
    let expected = deltas.iter().sum::<f64>();

    TestResult::from_bool(
        (resolved.total_mod_mass - expected).abs() < 1e-6
            && resolved.clean_sequence.len() == sites.len(),
    )
}

#[quickcheck]
fn resolution_is_idempotent(sites: Vec<(u8, i16, bool)>, leading: Option<i16>) -> TestResult {
    if sites.is_empty() || sites.len() > 40 {
        return TestResult::discard();
    }
    let catalog = catalog();
    let resolver = ModTextResolver::new(&catalog);
    let mut warnings = ResolverWarnings::default();

    let (token, _) = build_peptide(&sites, leading);
    let first = resolver.resolve_mass_deltas(&token, &mut warnings);
    if !first.success() {
        return TestResult::discard();
    }
    let second = resolver.resolve_mass_deltas(&first.peptide(), &mut warnings);

    TestResult::from_bool(
        second.peptide() == first.peptide()
            && second.total_mod_mass == 0.0
            && second.modifications.is_empty()
            && second.clean_sequence == first.clean_sequence,
    )
}

#[derive(Clone, Debug)]
struct Psm {
    scan: u32,
    charge: u8,
    primary: f64,
    secondary: f64,
    peptide: String,
    protein: String,
    rank: u32,
}

impl Hit for Psm {
    fn scan(&self) -> u32 {
        self.scan
    }
    fn charge(&self) -> u8 {
        self.charge
    }
    fn primary(&self) -> f64 {
        self.primary
    }
    fn secondary(&self) -> f64 {
        self.secondary
    }
    fn fdr(&self) -> Option<f64> {
        None
    }
    fn peptide(&self) -> &str {
        &self.peptide
    }
    fn protein(&self) -> &str {
        &self.protein
    }
    fn mh(&self) -> f64 {
        1000.0 + self.peptide.len() as f64
    }
    fn rank(&self) -> u32 {
        self.rank
    }
    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }
    fn modifications(&self) -> &[AppliedModification] {
        &[]
    }
}

fn psms(rows: &[(u8, u8, u8, u8, u8)]) -> Vec<Psm> {
    rows.iter()
        .map(|&(scan, charge, score, peptide, protein)| Psm {
            scan: (scan % 8) as u32,
            charge: charge % 4 + 1,
            primary: (score % 16) as f64 * 1e-3,
            secondary: (score % 7) as f64 * 0.2,
            peptide: format!("PEP{}", peptide % 5),
            protein: format!("PROT{}", protein % 3),
            rank: 0,
        })
        .collect()
}

#[quickcheck]
fn ranks_follow_scores(rows: Vec<(u8, u8, u8, u8, u8)>) -> bool {
    let mut results = psms(&rows);
    assign_ranks(&mut results);

    results.iter().all(|a| {
        results.iter().filter(|b| b.scan == a.scan).all(|b| {
            if (a.primary - b.primary).abs() <= f64::EPSILON {
                a.rank == b.rank
            } else if a.primary < b.primary {
                a.rank < b.rank
            } else {
                a.rank > b.rank
            }
        })
    }) && results.iter().all(|r| r.rank >= 1)
}

#[quickcheck]
fn first_hits_are_the_best_of_each_scan_and_charge(rows: Vec<(u8, u8, u8, u8, u8)>) -> bool {
    let mut results = psms(&rows);
    assign_ranks(&mut results);
    let firsts = first_hits(&results, |_| None);

    let mut groups = results
        .iter()
        .map(|r| (r.scan, r.charge))
        .collect::<Vec<_>>();
    groups.sort_unstable();
    groups.dedup();

    firsts.len() == groups.len()
        && firsts.iter().all(|hit| {
            results
                .iter()
                .filter(|r| r.scan == hit.scan && r.charge == hit.charge)
                .all(|r| r.primary >= hit.primary)
        })
}

#[quickcheck]
fn synopsis_only_keeps_passing_results(rows: Vec<(u8, u8, u8, u8, u8)>) -> bool {
    let thresholds = Thresholds {
        primary: 0.004,
        secondary: 0.5,
        fdr: 0.01,
    };
    let mut results = psms(&rows);
    assign_ranks(&mut results);
    let kept = synopsis(&results, &thresholds);

    let passing = results.iter().filter(|r| thresholds.passes(*r)).count();
    kept.len() <= passing && kept.iter().all(|r| thresholds.passes(r))
}

#[quickcheck]
fn first_hits_are_in_the_synopsis_or_the_unique_best(rows: Vec<(u8, u8, u8, u8, u8)>) -> bool {
    let thresholds = Thresholds {
        primary: 0.004,
        secondary: 0.5,
        fdr: 0.01,
    };
    let mut results = psms(&rows);
    assign_ranks(&mut results);
    let kept = synopsis(&results, &thresholds);
    let firsts = first_hits(&results, |_| None);

    firsts.iter().all(|hit| {
        // Duplicates within a scan collapse, so match on content
        let in_synopsis = kept.iter().any(|r| {
            r.scan == hit.scan
                && r.peptide == hit.peptide
                && r.protein == hit.protein
                && r.primary == hit.primary
        });
        let unique = firsts
            .iter()
            .filter(|f| f.scan == hit.scan && f.charge == hit.charge)
            .count()
            == 1;
        let best = results
            .iter()
            .filter(|r| r.scan == hit.scan && r.charge == hit.charge)
            .all(|r| r.primary >= hit.primary);

        (!thresholds.passes(hit) || in_synopsis) && (in_synopsis || (unique && best))
    })
}
