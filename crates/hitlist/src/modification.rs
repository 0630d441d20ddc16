use std::{
    collections::HashMap,
    fmt::{Display, Write},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::mass::VALID_AA;

/// Symbols handed out to dynamic modifications, in order
pub const DEFAULT_SYMBOLS: &str = "*#@$&!%~^=";

/// Two dynamic definitions closer than this share a symbol
const SHARED_SYMBOL_TOLERANCE: f64 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Terminus {
    Anywhere,
    PeptideN,
    PeptideC,
    ProteinN,
    ProteinC,
}

/// Where a modification may occur: an optional terminus, and the residues it
/// targets. An empty residue list means "any residue".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModificationSpecificity {
    pub terminus: Terminus,
    pub residues: Vec<u8>,
}

impl Display for ModificationSpecificity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.terminus {
            Terminus::Anywhere => {}
            Terminus::PeptideN => f.write_char('^')?,
            Terminus::PeptideC => f.write_char('$')?,
            Terminus::ProteinN => f.write_char('[')?,
            Terminus::ProteinC => f.write_char(']')?,
        }
        for r in &self.residues {
            f.write_char(*r as char)?;
        }
        Ok(())
    }
}

impl Serialize for ModificationSpecificity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvalidModification {
    Empty,
    InvalidResidue(char),
}

impl Display for InvalidModification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidModification::Empty => f.write_str("empty"),
            InvalidModification::InvalidResidue(c) => write!(f, "unrecognized residue ({})", c),
        }
    }
}

/// Residues accepted in a specificity: the standard set plus the ambiguous
/// letters that custom amino acids are usually mapped to
fn valid_residue(c: u8) -> bool {
    VALID_AA.contains(&c) || matches!(c, b'B' | b'J' | b'X' | b'Z')
}

impl FromStr for ModificationSpecificity {
    type Err = InvalidModification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(InvalidModification::Empty);
        }
        let (terminus, rest) = match s.as_bytes()[0] {
            b'^' => (Terminus::PeptideN, &s[1..]),
            b'$' => (Terminus::PeptideC, &s[1..]),
            b'[' => (Terminus::ProteinN, &s[1..]),
            b']' => (Terminus::ProteinC, &s[1..]),
            _ => (Terminus::Anywhere, s),
        };

        let mut residues = Vec::with_capacity(rest.len());
        for c in rest.chars() {
            if !c.is_ascii() || !valid_residue(c as u8) {
                return Err(InvalidModification::InvalidResidue(c));
            }
            residues.push(c as u8);
        }
        if terminus == Terminus::Anywhere && residues.is_empty() {
            return Err(InvalidModification::Empty);
        }
        Ok(ModificationSpecificity { terminus, residues })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ModificationKind {
    Static,
    Dynamic,
    StaticNTermPeptide,
    StaticCTermPeptide,
    StaticNTermProtein,
    StaticCTermProtein,
    DynNTermPeptide,
    DynCTermPeptide,
    DynNTermProtein,
    DynCTermProtein,
    Isotopic,
    CustomAminoAcid,
}

impl ModificationKind {
    pub fn new(terminus: Terminus, fixed: bool) -> Self {
        use ModificationKind::*;
        match (terminus, fixed) {
            (Terminus::Anywhere, true) => Static,
            (Terminus::Anywhere, false) => Dynamic,
            (Terminus::PeptideN, true) => StaticNTermPeptide,
            (Terminus::PeptideN, false) => DynNTermPeptide,
            (Terminus::PeptideC, true) => StaticCTermPeptide,
            (Terminus::PeptideC, false) => DynCTermPeptide,
            (Terminus::ProteinN, true) => StaticNTermProtein,
            (Terminus::ProteinN, false) => DynNTermProtein,
            (Terminus::ProteinC, true) => StaticCTermProtein,
            (Terminus::ProteinC, false) => DynCTermProtein,
        }
    }

    /// Static kinds contribute mass but are never rendered as a symbol
    pub fn is_static(&self) -> bool {
        use ModificationKind::*;
        matches!(
            self,
            Static | StaticNTermPeptide | StaticCTermPeptide | StaticNTermProtein | StaticCTermProtein
        )
    }

    pub fn is_n_terminal(&self) -> bool {
        use ModificationKind::*;
        matches!(
            self,
            StaticNTermPeptide | StaticNTermProtein | DynNTermPeptide | DynNTermProtein
        )
    }

    pub fn is_c_terminal(&self) -> bool {
        use ModificationKind::*;
        matches!(
            self,
            StaticCTermPeptide | StaticCTermProtein | DynCTermPeptide | DynCTermProtein
        )
    }

    pub fn is_protein_terminal(&self) -> bool {
        use ModificationKind::*;
        matches!(
            self,
            StaticNTermProtein | StaticCTermProtein | DynNTermProtein | DynCTermProtein
        )
    }

    /// Can a mass delta observed in a peptide string be explained by this kind?
    pub fn matches_deltas(&self) -> bool {
        !matches!(
            self,
            ModificationKind::Isotopic | ModificationKind::CustomAminoAcid
        )
    }
}

impl Display for ModificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ModificationKind::*;
        let s = match self {
            Static => "Static",
            Dynamic => "Dynamic",
            StaticNTermPeptide => "StaticNTermPeptide",
            StaticCTermPeptide => "StaticCTermPeptide",
            StaticNTermProtein => "StaticNTermProtein",
            StaticCTermProtein => "StaticCTermProtein",
            DynNTermPeptide => "DynNTermPeptide",
            DynCTermPeptide => "DynCTermPeptide",
            DynNTermProtein => "DynNTermProtein",
            DynCTermProtein => "DynCTermProtein",
            Isotopic => "Isotopic",
            CustomAminoAcid => "CustomAminoAcid",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModificationDefinition {
    pub name: String,
    pub mass: f64,
    pub kind: ModificationKind,
    /// Target residues; empty means any residue
    pub residues: Vec<u8>,
    /// Only dynamic kinds carry a symbol
    pub symbol: Option<char>,
}

impl ModificationDefinition {
    pub fn targets(&self, residue: u8) -> bool {
        self.residues.is_empty() || self.residues.contains(&residue.to_ascii_uppercase())
    }

    pub fn residues_str(&self) -> String {
        self.residues.iter().map(|&r| r as char).collect()
    }
}

/// Value of a `variable_mods` entry: a single mass or a list of masses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueOrVec {
    Value(f64),
    Vec(Vec<f64>),
}

impl ValueOrVec {
    pub fn into_vec(self) -> Vec<f64> {
        match self {
            ValueOrVec::Value(v) => vec![v],
            ValueOrVec::Vec(v) => v,
        }
    }
}

/// Ordered set of modification definitions known for a search
#[derive(Clone, Debug, Default, Serialize)]
pub struct ModificationCatalog {
    definitions: Vec<ModificationDefinition>,
    #[serde(skip_serializing)]
    next_symbol: usize,
}

impl ModificationCatalog {
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ModificationDefinition> {
        self.definitions.get(index)
    }

    pub fn kind(&self, index: usize) -> Option<ModificationKind> {
        self.definitions.get(index).map(|def| def.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModificationDefinition> {
        self.definitions.iter()
    }

    /// Add a static (fixed) modification and return its index
    pub fn add_static(&mut self, spec: &ModificationSpecificity, mass: f64, name: &str) -> usize {
        self.push(ModificationDefinition {
            name: name.into(),
            mass,
            kind: ModificationKind::new(spec.terminus, true),
            residues: spec.residues.clone(),
            symbol: None,
        })
    }

    /// Add a dynamic (variable) modification and return its index.
    ///
    /// Dynamic definitions of the same kind and (nearly) the same mass share
    /// a symbol, so that e.g. phosphorylation of S, T and Y renders alike.
    pub fn add_dynamic(&mut self, spec: &ModificationSpecificity, mass: f64, name: &str) -> usize {
        let kind = ModificationKind::new(spec.terminus, false);
        let shared = self
            .definitions
            .iter()
            .find(|def| def.kind == kind && (def.mass - mass).abs() < SHARED_SYMBOL_TOLERANCE)
            .and_then(|def| def.symbol);

        let symbol = shared.or_else(|| {
            let symbol = DEFAULT_SYMBOLS.chars().nth(self.next_symbol);
            if symbol.is_none() {
                log::warn!(
                    "ran out of modification symbols; `{}` ({}) will be reported by mass",
                    name,
                    mass
                );
            }
            self.next_symbol += 1;
            symbol
        });

        self.push(ModificationDefinition {
            name: name.into(),
            mass,
            kind,
            residues: spec.residues.clone(),
            symbol,
        })
    }

    /// Add a dynamic modification with an explicit symbol
    pub fn add_dynamic_with_symbol(
        &mut self,
        spec: &ModificationSpecificity,
        mass: f64,
        name: &str,
        symbol: char,
    ) -> usize {
        self.push(ModificationDefinition {
            name: name.into(),
            mass,
            kind: ModificationKind::new(spec.terminus, false),
            residues: spec.residues.clone(),
            symbol: Some(symbol),
        })
    }

    pub fn add_isotopic(&mut self, mass: f64, name: &str) -> usize {
        self.push(ModificationDefinition {
            name: name.into(),
            mass,
            kind: ModificationKind::Isotopic,
            residues: Vec::new(),
            symbol: None,
        })
    }

    pub fn add_custom_amino_acid(&mut self, residue: u8, mass: f64, name: &str) -> usize {
        self.push(ModificationDefinition {
            name: name.into(),
            mass,
            kind: ModificationKind::CustomAminoAcid,
            residues: vec![residue.to_ascii_uppercase()],
            symbol: None,
        })
    }

    /// Number of uses of each definition, indexed like the catalog.
    /// Out-of-range indices are ignored.
    pub fn usage_counts<I: IntoIterator<Item = usize>>(&self, uses: I) -> Vec<usize> {
        let mut counts = vec![0; self.definitions.len()];
        for ix in uses {
            if let Some(count) = counts.get_mut(ix) {
                *count += 1;
            }
        }
        counts
    }

    fn push(&mut self, def: ModificationDefinition) -> usize {
        log::trace!(
            "modification {} {} {:+.5} on `{}` symbol {:?}",
            def.kind,
            def.name,
            def.mass,
            def.residues_str(),
            def.symbol
        );
        self.definitions.push(def);
        self.definitions.len() - 1
    }

    /// Build a catalog from the `static_mods` / `variable_mods` maps of a
    /// parameter file. Invalid specifiers are logged and skipped.
    pub fn from_maps(
        static_mods: Option<HashMap<String, f64>>,
        variable_mods: Option<HashMap<String, ValueOrVec>>,
    ) -> Self {
        let mut catalog = ModificationCatalog::default();

        // HashMap order is arbitrary; sort so that symbol assignment is stable
        let mut static_mods = static_mods.unwrap_or_default().into_iter().collect::<Vec<_>>();
        static_mods.sort_by(|a, b| a.0.cmp(&b.0));
        for (s, mass) in static_mods {
            match s.parse::<ModificationSpecificity>() {
                Ok(spec) => {
                    catalog.add_static(&spec, mass, &name_for_mass(mass));
                }
                Err(e) => log::error!("Invalid modification string `{}`: {}", s, e),
            }
        }

        let mut variable_mods = variable_mods
            .unwrap_or_default()
            .into_iter()
            .collect::<Vec<_>>();
        variable_mods.sort_by(|a, b| a.0.cmp(&b.0));
        for (s, masses) in variable_mods {
            match s.parse::<ModificationSpecificity>() {
                Ok(spec) => {
                    for mass in masses.into_vec() {
                        catalog.add_dynamic(&spec, mass, &name_for_mass(mass));
                    }
                }
                Err(e) => log::error!("Skipping invalid modification string `{}`: {}", s, e),
            }
        }
        catalog
    }
}

/// Known modification names, in Unimod and TopPIC spelling
const NAMED_MASSES: &[(&str, f64)] = &[
    ("Acetyl", 42.010565),
    ("Acetylation", 42.010565),
    ("Amidated", -0.984016),
    ("Amidation", -0.984016),
    ("Ammonia-loss", -17.026549),
    ("Biotin", 226.077598),
    ("Carbamidomethyl", 57.021464),
    ("Carbamidomethylation", 57.021464),
    ("Carbamyl", 43.005814),
    ("Carbamylation", 43.005814),
    ("Cation:Na", 21.981943),
    ("Crotonyl", 68.026215),
    ("Cysteinyl", 119.004099),
    ("Deamidated", 0.984016),
    ("Deamidation", 0.984016),
    ("Dehydrated", -18.010565),
    ("Dimethyl", 28.0313),
    ("Dimethylation", 28.0313),
    ("Dioxidation", 31.989829),
    ("Farnesyl", 204.187801),
    ("Formyl", 27.994915),
    ("Formylation", 27.994915),
    ("Gln->pyro-Glu", -17.026549),
    ("Glu->pyro-Glu", -18.010565),
    ("GlyGly", 114.042927),
    ("Hex", 162.052824),
    ("HexNAc", 203.079373),
    ("iTRAQ4plex", 144.102063),
    ("Malonyl", 86.000394),
    ("Methyl", 14.01565),
    ("Methylation", 14.01565),
    ("Myristoyl", 210.198366),
    ("Nitro", 44.985078),
    ("Nitrosyl", 28.990164),
    ("Oxidation", 15.994915),
    ("Palmitoyl", 238.229666),
    ("Phospho", 79.966331),
    ("Phosphorylation", 79.966331),
    ("Succinyl", 100.016044),
    ("Succinylation", 100.016044),
    ("Sulfo", 79.956815),
    ("TMT6plex", 229.162932),
    ("Trimethyl", 42.04695),
    ("Trimethylation", 42.04695),
    ("Trioxidation", 47.984744),
    ("Ubiquitination", 114.042927),
];

/// Resolve a named modification to its monoisotopic mass (case-insensitive)
pub fn lookup_mass_by_name(name: &str) -> Option<f64> {
    let name = name.trim();
    NAMED_MASSES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, mass)| *mass)
}

/// Best-effort name for a modification only known by mass
pub fn name_for_mass(mass: f64) -> String {
    NAMED_MASSES
        .iter()
        .find(|(_, m)| (m - mass).abs() < 0.001)
        .map(|(n, _)| n.to_string())
        .unwrap_or_else(|| format!("{:+.4}", mass))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_specificity() {
        use InvalidModification::*;
        let spec = "[".parse::<ModificationSpecificity>().unwrap();
        assert_eq!(spec.terminus, Terminus::ProteinN);
        assert!(spec.residues.is_empty());

        let spec = "^Q".parse::<ModificationSpecificity>().unwrap();
        assert_eq!(spec.terminus, Terminus::PeptideN);
        assert_eq!(spec.residues, b"Q".to_vec());

        let spec = "STY".parse::<ModificationSpecificity>().unwrap();
        assert_eq!(spec.terminus, Terminus::Anywhere);
        assert_eq!(spec.to_string(), "STY");

        assert_eq!("".parse::<ModificationSpecificity>(), Err(Empty));
        assert_eq!("M1".parse::<ModificationSpecificity>(), Err(InvalidResidue('1')));
    }

    #[test]
    fn symbols_are_shared_by_mass() {
        let mut catalog = ModificationCatalog::default();
        catalog.add_static(&"C".parse().unwrap(), 57.021464, "Carbamidomethyl");
        let ox = catalog.add_dynamic(&"M".parse().unwrap(), 15.994915, "Oxidation");
        let ph_s = catalog.add_dynamic(&"S".parse().unwrap(), 79.966331, "Phospho");
        let ph_ty = catalog.add_dynamic(&"TY".parse().unwrap(), 79.96633, "Phospho");
        let ac = catalog.add_dynamic(&"^".parse().unwrap(), 42.010565, "Acetyl");

        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.get(0).unwrap().symbol, None);
        assert_eq!(catalog.get(ox).unwrap().symbol, Some('*'));
        assert_eq!(catalog.get(ph_s).unwrap().symbol, Some('#'));
        assert_eq!(catalog.get(ph_ty).unwrap().symbol, Some('#'));
        assert_eq!(catalog.get(ac).unwrap().symbol, Some('@'));
        assert_eq!(catalog.kind(ac), Some(ModificationKind::DynNTermPeptide));
        assert_eq!(catalog.usage_counts([ox, ox, ac, 99]), vec![0, 2, 0, 0, 1]);
    }

    #[test]
    fn catalog_from_maps() {
        let mut statics = HashMap::new();
        statics.insert("C".to_string(), 57.021464);
        statics.insert("Z1".to_string(), 1.0);
        let mut vars = HashMap::new();
        vars.insert("M".to_string(), ValueOrVec::Value(15.994915));
        vars.insert("^".to_string(), ValueOrVec::Vec(vec![42.010565, 28.0313]));

        let catalog = ModificationCatalog::from_maps(Some(statics), Some(vars));
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get(0).unwrap().name, "Carbamidomethyl");
        assert!(catalog.get(0).unwrap().kind.is_static());
        assert_eq!(catalog.get(1).unwrap().name, "Oxidation");
        assert_eq!(catalog.get(2).unwrap().kind, ModificationKind::DynNTermPeptide);
        assert_eq!(catalog.get(2).unwrap().name, "Acetyl");
        assert_eq!(catalog.get(3).unwrap().name, "Dimethyl");
    }

    #[test]
    fn named_masses() {
        assert_eq!(lookup_mass_by_name("acetyl"), Some(42.010565));
        assert_eq!(lookup_mass_by_name(" Phosphorylation "), Some(79.966331));
        assert_eq!(lookup_mass_by_name("Frobnication"), None);
        assert_eq!(name_for_mass(15.9949), "Oxidation");
        assert_eq!(name_for_mass(3.5), "+3.5000");
    }
}
