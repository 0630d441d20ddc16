//! Rewrite search-engine modification notation into single-character symbols
//!
//! Two notations are understood:
//! * mass deltas written after a residue (or before the first residue, for
//!   N-terminal modifications): `K.+42.011MNDS+79.966PK.A`
//! * bracketed masses or names, optionally following a parenthesised group
//!   of residues whose position is ambiguous: `-.(MA)[Acetyl]SK[15.995]E.-`
//!
//! Either way the output keeps every residue, writes the symbol of each
//! dynamic modification directly after the residue it belongs to, and adds
//! the mass of every recognised modification (static ones included) to the
//! total modification mass.

use fnv::FnvHashSet;
use regex::Regex;

use crate::modification::{lookup_mass_by_name, ModificationCatalog, ModificationKind};
use crate::throttle::WarningLimiter;

/// Default window (in Da) for matching an observed mass to a definition
pub const MOD_MASS_TOLERANCE: f64 = 0.25;

/// Leading run of N-terminal mass deltas
const NTERM_DELTAS: &str = r"^([0-9\.\+\-]+)";
/// A single signed mass delta
const DELTA: &str = r"([+-][0-9\.]+)";
/// Bracketed modification, either a (possibly exponential) mass or a name
const BRACKET: &str = r"\[(?<ModMass>[+-]*[0-9\.e-]+)\]|\[(?<NamedMod>[^\]]+)\]";

/// Warning state carried across every peptide of a file
#[derive(Debug, Clone)]
pub struct ResolverWarnings {
    pub unresolved_mass: WarningLimiter,
    pub unknown_names: FnvHashSet<String>,
}

impl Default for ResolverWarnings {
    fn default() -> Self {
        Self {
            unresolved_mass: WarningLimiter::new(10),
            unknown_names: FnvHashSet::default(),
        }
    }
}

/// A modification that was matched to a catalog definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedModification {
    pub definition: usize,
    /// 0-based residue index in the clean sequence
    pub residue: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPeptide {
    pub prefix: Option<char>,
    /// Primary sequence with modification symbols
    pub sequence: String,
    pub suffix: Option<char>,
    pub clean_sequence: String,
    pub total_mod_mass: f64,
    /// Observed masses with no definition inside the window
    pub unresolved: Vec<f64>,
    pub modifications: Vec<AppliedModification>,
}

impl ResolvedPeptide {
    pub fn success(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Sequence including the prefix and suffix residues, e.g. `K.PEPT*IDE.G`
    pub fn peptide(&self) -> String {
        match (self.prefix, self.suffix) {
            (Some(p), Some(s)) => format!("{}.{}.{}", p, self.sequence, s),
            _ => self.sequence.clone(),
        }
    }
}

/// Split `K.PEPTIDE.G` into prefix, primary sequence and suffix
pub fn split_prefix_suffix(peptide: &str) -> (Option<char>, &str, Option<char>) {
    let bytes = peptide.as_bytes();
    let n = bytes.len();
    if n > 4 && bytes[1] == b'.' && bytes[n - 2] == b'.' && !bytes[n - 1].is_ascii_digit() {
        (
            Some(bytes[0] as char),
            &peptide[2..n - 2],
            Some(bytes[n - 1] as char),
        )
    } else {
        (None, peptide, None)
    }
}

/// Where on the peptide an observed mass sits
#[derive(Debug, Clone, Copy)]
struct Site {
    residue: u8,
    n_terminal: bool,
    c_terminal: bool,
}

/// A definition matched against one site and observed mass
#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    kind: ModificationKind,
    symbol: Option<char>,
    mass: f64,
    delta: f64,
    targets_residue: bool,
}

#[derive(Default)]
struct Slot {
    residue: u8,
    tags: String,
}

/// Accumulates residues and the text to write after each of them
#[derive(Default)]
struct Builder {
    nterm: String,
    slots: Vec<Slot>,
    total_mod_mass: f64,
    unresolved: Vec<f64>,
    modifications: Vec<AppliedModification>,
}

enum Target {
    NTerm,
    Residue(usize),
}

impl Builder {
    fn push_residue(&mut self, residue: u8) {
        self.slots.push(Slot {
            residue,
            tags: String::new(),
        });
    }

    fn tags(&mut self, target: &Target) -> &mut String {
        match target {
            Target::NTerm => &mut self.nterm,
            Target::Residue(ix) => &mut self.slots[*ix].tags,
        }
    }

    /// Record a match. `mass` is what the input said, which for a named
    /// modification is the definition's own mass.
    fn apply(&mut self, target: Target, candidate: &Candidate, mass: f64) {
        self.total_mod_mass += mass;
        let residue = match target {
            Target::NTerm => 0,
            Target::Residue(ix) => ix,
        };
        self.modifications.push(AppliedModification {
            definition: candidate.index,
            residue,
        });
        if candidate.kind.is_static() {
            return;
        }
        // N-terminal definitions observed on the first residue render at the
        // N-terminus; elsewhere they stay on their residue
        let target = match (candidate.kind.is_n_terminal(), target) {
            (true, Target::Residue(0)) => Target::NTerm,
            (_, target) => target,
        };
        match candidate.symbol {
            Some(symbol) => self.tags(&target).push(symbol),
            None => {
                let text = format!("{:+.3}", candidate.mass);
                self.tags(&target).push_str(&text);
            }
        }
    }

    fn unresolved(&mut self, target: Target, mass: f64, literal: &str) {
        self.total_mod_mass += mass;
        self.unresolved.push(mass);
        self.tags(&target).push_str(literal);
    }

    /// Assemble the canonical sequence. N-terminal text goes directly after
    /// the first residue.
    fn finish(self, prefix: Option<char>, suffix: Option<char>) -> ResolvedPeptide {
        let mut sequence = String::with_capacity(self.slots.len() * 2 + self.nterm.len());
        let mut clean_sequence = String::with_capacity(self.slots.len());
        for (ix, slot) in self.slots.iter().enumerate() {
            sequence.push(slot.residue as char);
            clean_sequence.push(slot.residue as char);
            if ix == 0 {
                sequence.push_str(&self.nterm);
            }
            sequence.push_str(&slot.tags);
        }
        if self.slots.is_empty() {
            sequence.push_str(&self.nterm);
        }

        ResolvedPeptide {
            prefix,
            sequence,
            suffix,
            clean_sequence,
            total_mod_mass: self.total_mod_mass,
            unresolved: self.unresolved,
            modifications: self.modifications,
        }
    }
}

enum State {
    InResidue,
    InAmbiguityGroup { first: usize },
    InModBracket { start: usize, group: Option<usize> },
}

pub struct ModTextResolver<'a> {
    catalog: &'a ModificationCatalog,
    tolerance: f64,
    nterm_deltas: Regex,
    delta: Regex,
    bracket: Regex,
}

impl<'a> ModTextResolver<'a> {
    pub fn new(catalog: &'a ModificationCatalog) -> Self {
        Self::with_tolerance(catalog, MOD_MASS_TOLERANCE)
    }

    pub fn with_tolerance(catalog: &'a ModificationCatalog, tolerance: f64) -> Self {
        Self {
            catalog,
            tolerance,
            nterm_deltas: Regex::new(NTERM_DELTAS).expect("valid regex"),
            delta: Regex::new(DELTA).expect("valid regex"),
            bracket: Regex::new(BRACKET).expect("valid regex"),
        }
    }

    pub fn catalog(&self) -> &ModificationCatalog {
        self.catalog
    }

    /// Pick the definition closest in mass to `observed` for a site.
    ///
    /// Terminal sites first consider only definitions of the matching
    /// terminal kind, then definitions on the residue itself, then anything.
    /// Ties on mass difference go to the definition that targets the
    /// observed residue, then to catalog order.
    fn best_match(
        &self,
        observed: f64,
        site: Site,
        prefix: Option<char>,
        suffix: Option<char>,
    ) -> Option<Candidate> {
        let protein_n = matches!(prefix, None | Some('-'));
        let protein_c = matches!(suffix, None | Some('-'));

        if site.n_terminal {
            let hit = self.search(observed, site, |kind, targets| {
                kind.is_n_terminal() && targets && (protein_n || !kind.is_protein_terminal())
            });
            if hit.is_some() {
                return hit;
            }
        }
        if site.c_terminal {
            let hit = self.search(observed, site, |kind, targets| {
                kind.is_c_terminal() && targets && (protein_c || !kind.is_protein_terminal())
            });
            if hit.is_some() {
                return hit;
            }
        }
        self.search(observed, site, |kind, targets| {
            matches!(kind, ModificationKind::Static | ModificationKind::Dynamic) && targets
        })
        .or_else(|| self.search(observed, site, |kind, _| kind.matches_deltas()))
    }

    fn search<F>(&self, observed: f64, site: Site, eligible: F) -> Option<Candidate>
    where
        F: Fn(ModificationKind, bool) -> bool,
    {
        let mut best: Option<Candidate> = None;
        for (index, def) in self.catalog.iter().enumerate() {
            let targets_residue = def.targets(site.residue);
            if !eligible(def.kind, targets_residue) {
                continue;
            }
            let delta = (def.mass - observed).abs();
            if delta > self.tolerance {
                continue;
            }
            let candidate = Candidate {
                index,
                kind: def.kind,
                symbol: def.symbol,
                mass: def.mass,
                delta,
                targets_residue,
            };
            best = match best {
                None => Some(candidate),
                Some(b) if (candidate.delta - b.delta).abs() <= f64::EPSILON => {
                    match candidate.targets_residue && !b.targets_residue {
                        true => Some(candidate),
                        false => Some(b),
                    }
                }
                Some(b) if candidate.delta < b.delta => Some(candidate),
                keep => keep,
            };
        }
        best
    }

    fn warn_unresolved(
        &self,
        warnings: &mut ResolverWarnings,
        mass: f64,
        residue: u8,
        peptide: &str,
    ) {
        if warnings.unresolved_mass.hit() {
            log::warn!(
                "no modification within {} Da of {:+.4} on `{}` in {}",
                self.tolerance,
                mass,
                residue as char,
                peptide
            );
        }
    }

    /// Resolve MS-GF+ style mass deltas (`+15.995`) into symbols.
    ///
    /// Masses are never dropped: an observed delta without a definition in
    /// the window stays in the sequence as written and is still added to the
    /// total modification mass.
    pub fn resolve_mass_deltas(
        &self,
        peptide: &str,
        warnings: &mut ResolverWarnings,
    ) -> ResolvedPeptide {
        let (prefix, primary, suffix) = split_prefix_suffix(peptide);
        let residue_count = primary.bytes().filter(u8::is_ascii_alphabetic).count();
        let first_residue = primary
            .bytes()
            .find(u8::is_ascii_alphabetic)
            .unwrap_or(b'-');

        let mut builder = Builder::default();
        let mut rest = primary;

        if let Some(m) = self.nterm_deltas.find(rest) {
            let site = Site {
                residue: first_residue,
                n_terminal: true,
                c_terminal: residue_count <= 1,
            };
            self.apply_deltas(m.as_str(), site, None, prefix, suffix, &mut builder, warnings, peptide);
            rest = &rest[m.end()..];
        }

        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c.is_ascii_alphabetic() {
                builder.push_residue(c as u8);
                continue;
            }

            if matches!(c, '+' | '-') && !builder.slots.is_empty() {
                let end = rest[i..]
                    .find(|ch: char| !matches!(ch, '0'..='9' | '.' | '+' | '-'))
                    .map(|p| i + p)
                    .unwrap_or(rest.len());
                let ix = builder.slots.len() - 1;
                let site = Site {
                    residue: builder.slots[ix].residue,
                    n_terminal: false,
                    c_terminal: ix + 1 == residue_count,
                };
                self.apply_deltas(&rest[i..end], site, Some(ix), prefix, suffix, &mut builder, warnings, peptide);
                while chars.next_if(|&(j, _)| j < end).is_some() {}
                continue;
            }

            // Anything else (an existing symbol) stays attached to the
            // preceding residue
            let target = match builder.slots.len() {
                0 => Target::NTerm,
                n => Target::Residue(n - 1),
            };
            builder.tags(&target).push(c);
        }

        builder.finish(prefix, suffix)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_deltas(
        &self,
        run: &str,
        site: Site,
        residue: Option<usize>,
        prefix: Option<char>,
        suffix: Option<char>,
        builder: &mut Builder,
        warnings: &mut ResolverWarnings,
        peptide: &str,
    ) {
        let target = || match residue {
            Some(ix) => Target::Residue(ix),
            None => Target::NTerm,
        };

        // An unsigned leading mass is positive
        let signed = match run.starts_with(|c| c == '+' || c == '-') {
            true => run.to_string(),
            false => format!("+{}", run),
        };

        let mut any = false;
        for m in self.delta.find_iter(&signed) {
            any = true;
            let text = m.as_str();
            match text.parse::<f64>() {
                Ok(mass) => match self.best_match(mass, site, prefix, suffix) {
                    Some(candidate) => builder.apply(target(), &candidate, mass),
                    None => {
                        self.warn_unresolved(warnings, mass, site.residue, peptide);
                        builder.unresolved(target(), mass, text);
                    }
                },
                Err(_) => {
                    self.warn_unresolved(warnings, 0.0, site.residue, peptide);
                    builder.unresolved(target(), 0.0, text);
                }
            }
        }
        if !any {
            builder.tags(&target()).push_str(run);
        }
    }

    /// Resolve TopPIC style bracketed modifications into symbols.
    ///
    /// A bracket directly after a parenthesised group belongs to the first
    /// residue of the group. That is a convention; the real position inside
    /// the group is unknown.
    pub fn resolve_bracketed(
        &self,
        proteoform: &str,
        warnings: &mut ResolverWarnings,
    ) -> ResolvedPeptide {
        let (prefix, primary, suffix) = split_prefix_suffix(proteoform);

        let mut builder = Builder::default();
        // (target residue index, bracket text); None targets the N-terminus
        let mut pending: Vec<(Option<usize>, &str)> = Vec::new();
        let mut closed_group: Option<usize> = None;
        let mut state = State::InResidue;

        for (i, c) in primary.char_indices() {
            state = match state {
                State::InResidue => match c {
                    _ if c.is_ascii_alphabetic() => {
                        builder.push_residue(c as u8);
                        closed_group = None;
                        State::InResidue
                    }
                    '(' => {
                        closed_group = None;
                        State::InAmbiguityGroup {
                            first: builder.slots.len(),
                        }
                    }
                    '[' => State::InModBracket {
                        start: i,
                        group: None,
                    },
                    _ => {
                        let target = match builder.slots.len() {
                            0 => Target::NTerm,
                            n => Target::Residue(n - 1),
                        };
                        builder.tags(&target).push(c);
                        State::InResidue
                    }
                },
                State::InAmbiguityGroup { first } => match c {
                    _ if c.is_ascii_alphabetic() => {
                        builder.push_residue(c as u8);
                        State::InAmbiguityGroup { first }
                    }
                    ')' => {
                        closed_group = Some(first);
                        State::InResidue
                    }
                    '[' => State::InModBracket {
                        start: i,
                        group: Some(first),
                    },
                    _ => State::InAmbiguityGroup { first },
                },
                State::InModBracket { start, group } => match c {
                    ']' => {
                        let target = match closed_group {
                            Some(first) if first < builder.slots.len() => Some(first),
                            _ => builder.slots.len().checked_sub(1),
                        };
                        pending.push((target, &primary[start..=i]));
                        match group {
                            Some(first) => State::InAmbiguityGroup { first },
                            None => State::InResidue,
                        }
                    }
                    _ => State::InModBracket { start, group },
                },
            };
        }

        if let State::InModBracket { start, .. } = state {
            let text = &primary[start..];
            log::warn!("unterminated modification `{}` in {}", text, proteoform);
            let target = match builder.slots.len() {
                0 => Target::NTerm,
                n => Target::Residue(n - 1),
            };
            builder.unresolved(target, 0.0, text);
        }

        let residue_count = builder.slots.len();
        for (target, text) in pending {
            let site = Site {
                residue: match target {
                    Some(ix) => builder.slots[ix].residue,
                    None => builder.slots.first().map(|s| s.residue).unwrap_or(b'-'),
                },
                n_terminal: matches!(target, None | Some(0)),
                c_terminal: match target {
                    Some(ix) => ix + 1 == residue_count,
                    None => residue_count <= 1,
                },
            };
            let to_target = || match target {
                Some(ix) => Target::Residue(ix),
                None => Target::NTerm,
            };
            self.apply_bracket(
                text,
                site,
                prefix,
                suffix,
                &mut builder,
                warnings,
                proteoform,
                to_target,
            );
        }

        builder.finish(prefix, suffix)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_bracket<T>(
        &self,
        text: &str,
        site: Site,
        prefix: Option<char>,
        suffix: Option<char>,
        builder: &mut Builder,
        warnings: &mut ResolverWarnings,
        proteoform: &str,
        target: T,
    ) where
        T: Fn() -> Target,
    {
        let caps = match self.bracket.captures(text) {
            Some(caps) => caps,
            None => {
                builder.unresolved(target(), 0.0, text);
                return;
            }
        };

        let observed = if let Some(m) = caps.name("ModMass") {
            match m.as_str().trim_start_matches('+').parse::<f64>() {
                Ok(mass) => mass,
                Err(_) => {
                    self.warn_unresolved(warnings, 0.0, site.residue, proteoform);
                    builder.unresolved(target(), 0.0, text);
                    return;
                }
            }
        } else {
            let name = caps.name("NamedMod").map(|m| m.as_str()).unwrap_or_default();

            // A definition with this exact name wins outright
            let named = self
                .catalog
                .iter()
                .enumerate()
                .filter(|(_, def)| def.name.eq_ignore_ascii_case(name))
                .min_by_key(|(_, def)| !def.targets(site.residue))
                .map(|(index, def)| Candidate {
                    index,
                    kind: def.kind,
                    symbol: def.symbol,
                    mass: def.mass,
                    delta: 0.0,
                    targets_residue: def.targets(site.residue),
                });
            if let Some(candidate) = named {
                builder.apply(target(), &candidate, candidate.mass);
                return;
            }

            match lookup_mass_by_name(name) {
                Some(mass) => mass,
                None => {
                    if warnings.unknown_names.insert(name.to_string()) {
                        log::warn!(
                            "unknown modification `{}` in {}; assuming zero mass",
                            name,
                            proteoform
                        );
                    }
                    return;
                }
            }
        };

        match self.best_match(observed, site, prefix, suffix) {
            Some(candidate) => builder.apply(target(), &candidate, observed),
            None => {
                self.warn_unresolved(warnings, observed, site.residue, proteoform);
                builder.unresolved(target(), observed, text);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn catalog() -> ModificationCatalog {
        let mut catalog = ModificationCatalog::default();
        catalog.add_static(&"C".parse().unwrap(), 57.021464, "Carbamidomethyl");
        catalog.add_dynamic(&"M".parse().unwrap(), 15.994915, "Oxidation");
        catalog.add_dynamic(&"K".parse().unwrap(), 14.016, "Methyl");
        catalog.add_dynamic(&"STY".parse().unwrap(), 79.966331, "Phospho");
        catalog.add_dynamic(&"^".parse().unwrap(), 42.010565, "Acetyl");
        catalog
    }

    #[test]
    fn split() {
        assert_eq!(
            split_prefix_suffix("K.PEPTIDE.G"),
            (Some('K'), "PEPTIDE", Some('G'))
        );
        assert_eq!(
            split_prefix_suffix("-.+42.011MNDS.-"),
            (Some('-'), "+42.011MNDS", Some('-'))
        );
        assert_eq!(split_prefix_suffix("PEPTIDE"), (None, "PEPTIDE", None));
        assert_eq!(split_prefix_suffix("A.B"), (None, "A.B", None));
    }

    #[test]
    fn single_dynamic_delta() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        let r = resolver.resolve_mass_deltas("K.LQVPAGK+14.016ANPSPPIGPALGQR.G", &mut warnings);
        assert_eq!(r.peptide(), "K.LQVPAGK#ANPSPPIGPALGQR.G");
        assert_eq!(r.clean_sequence, "LQVPAGKANPSPPIGPALGQR");
        assert!((r.total_mod_mass - 14.016).abs() < 1e-9);
        assert!(r.success());
        assert_eq!(r.modifications.len(), 1);
        assert_eq!(r.modifications[0].residue, 6);
    }

    #[test]
    fn static_mods_have_no_symbol() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        let r = resolver.resolve_mass_deltas("R.AC+57.021M+15.995K.L", &mut warnings);
        assert_eq!(r.peptide(), "R.ACM*K.L");
        assert!((r.total_mod_mass - (57.021 + 15.995)).abs() < 1e-9);
    }

    #[test]
    fn nterm_symbols_follow_first_residue() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        let r = resolver.resolve_mass_deltas("-.+42.011M+15.995NDS+79.966PK.A", &mut warnings);
        assert_eq!(r.peptide(), "-.M$*NDS@PK.A");
        assert_eq!(r.clean_sequence, "MNDSPK");
        assert!((r.total_mod_mass - (42.011 + 15.995 + 79.966)).abs() < 1e-9);

        // Observed on the first residue rather than before it
        let r = resolver.resolve_mass_deltas("-.M+15.995+42.011NDS.A", &mut warnings);
        assert_eq!(r.peptide(), "-.M$*NDS.A");
    }

    #[test]
    fn nterm_definition_inside_the_peptide_stays_put() {
        let mut catalog = ModificationCatalog::default();
        catalog.add_dynamic(&"^".parse().unwrap(), 42.010565, "Acetyl");
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        let r = resolver.resolve_mass_deltas("R.PEPK+42.011IDER.G", &mut warnings);
        assert_eq!(r.peptide(), "R.PEPK*IDER.G");
        assert_eq!(r.modifications.len(), 1);
        assert_eq!(r.modifications[0].residue, 3);
    }

    #[test]
    fn non_ascii_symbols_survive() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        let r = resolver.resolve_mass_deltas("K.PEPK†IDE.G", &mut warnings);
        assert_eq!(r.peptide(), "K.PEPK†IDE.G");
        assert_eq!(r.clean_sequence, "PEPKIDE");

        let r = resolver.resolve_mass_deltas("K.PEPK†+14.016IDE.G", &mut warnings);
        assert_eq!(r.peptide(), "K.PEPK†#IDE.G");
    }

    #[test]
    fn concatenated_deltas() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        // Static and dynamic on the same residue: only the dynamic symbol
        let mut catalog2 = catalog.clone();
        catalog2.add_dynamic(&"C".parse().unwrap(), 0.984, "Deamidated");
        let resolver2 = ModTextResolver::new(&catalog2);
        let r = resolver2.resolve_mass_deltas("K.AC+57.021+0.984K.L", &mut warnings);
        assert_eq!(r.peptide(), "K.AC&K.L");
        assert!((r.total_mod_mass - 58.005).abs() < 1e-9);

        let r = resolver.resolve_mass_deltas("K.S+79.966T+79.966Y.L", &mut warnings);
        assert_eq!(r.peptide(), "K.S@T@Y.L");
    }

    #[test]
    fn unresolved_mass_kept_literally() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        let r = resolver.resolve_mass_deltas("K.PEPT+123.456IDE.G", &mut warnings);
        assert_eq!(r.peptide(), "K.PEPT+123.456IDE.G");
        assert!(!r.success());
        assert_eq!(r.unresolved, vec![123.456]);
        assert!((r.total_mod_mass - 123.456).abs() < 1e-9);
        assert_eq!(warnings.unresolved_mass.count(), 1);
    }

    #[test]
    fn canonical_is_unchanged() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        for peptide in ["K.LQVPAGK#ANPSPPIGPALGQR.G", "-.M$*NDS@PK.A", "PEPTIDE"] {
            let r = resolver.resolve_mass_deltas(peptide, &mut warnings);
            assert_eq!(r.peptide(), peptide);
            assert_eq!(r.total_mod_mass, 0.0);
            assert!(r.modifications.is_empty());
        }
    }

    #[test]
    fn residue_decides_between_equal_masses() {
        let mut catalog = ModificationCatalog::default();
        catalog.add_static(&"C".parse().unwrap(), 14.016, "Static");
        catalog.add_dynamic_with_symbol(&"K".parse().unwrap(), 14.016, "Methyl", '#');
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();

        let r = resolver.resolve_mass_deltas("R.PK+14.016L.G", &mut warnings);
        assert_eq!(r.peptide(), "R.PK#L.G");
        let r = resolver.resolve_mass_deltas("R.PC+14.016L.G", &mut warnings);
        assert_eq!(r.peptide(), "R.PCL.G");
    }

    #[test]
    fn cterm_definitions_tried_first() {
        let mut catalog = ModificationCatalog::default();
        catalog.add_dynamic_with_symbol(&"K".parse().unwrap(), -0.984, "Residue", '*');
        catalog.add_dynamic_with_symbol(&"$".parse().unwrap(), -0.984, "Amidated", '~');
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();

        let r = resolver.resolve_mass_deltas("R.PEPK-0.984.-", &mut warnings);
        assert_eq!(r.peptide(), "R.PEPK~.-");
        let r = resolver.resolve_mass_deltas("R.PK-0.984EP.-", &mut warnings);
        assert_eq!(r.peptide(), "R.PK*EP.-");
    }

    #[test]
    fn bracketed_names_and_masses() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();

        let r = resolver.resolve_bracketed("-.(MA)[Acetyl]SK[14.016]E.-", &mut warnings);
        assert_eq!(r.peptide(), "-.M$ASK#E.-");
        assert_eq!(r.clean_sequence, "MASKE");
        assert!((r.total_mod_mass - (42.010565 + 14.016)).abs() < 1e-9);

        let r = resolver.resolve_bracketed("K.AM[Oxidation]S[Phospho]PR.G", &mut warnings);
        assert_eq!(r.peptide(), "K.AM*S@PR.G");

        let r = resolver.resolve_bracketed("K.A(STY)[Phosphorylation]PR.G", &mut warnings);
        assert_eq!(r.peptide(), "K.AS@TYPR.G");
    }

    #[test]
    fn bracketed_scientific_notation() {
        let mut catalog = ModificationCatalog::default();
        catalog.add_dynamic_with_symbol(&"K".parse().unwrap(), 0.0045, "Tiny", '%');
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        let r = resolver.resolve_bracketed("R.PK[4.52e-003]L.G", &mut warnings);
        assert_eq!(r.peptide(), "R.PK%L.G");
        assert!((r.total_mod_mass - 0.00452).abs() < 1e-12);
    }

    #[test]
    fn unknown_names_warn_once() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        for _ in 0..3 {
            let r = resolver.resolve_bracketed("K.AK[Frobnicated]R.G", &mut warnings);
            assert_eq!(r.peptide(), "K.AKR.G");
            assert_eq!(r.total_mod_mass, 0.0);
            assert!(r.success());
        }
        assert_eq!(warnings.unknown_names.len(), 1);
    }

    #[test]
    fn bracketed_unresolved_mass() {
        let catalog = catalog();
        let resolver = ModTextResolver::new(&catalog);
        let mut warnings = ResolverWarnings::default();
        let r = resolver.resolve_bracketed("K.AK[+301.2]R.G", &mut warnings);
        assert_eq!(r.peptide(), "K.AK[+301.2]R.G");
        assert!(!r.success());
        assert!((r.total_mod_mass - 301.2).abs() < 1e-9);
    }
}
