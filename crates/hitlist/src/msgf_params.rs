//! Reader for MS-GF+ search parameter (and `Mods.txt`) files
//!
//! ```text
//! PrecursorMassTolerance=20ppm
//! NumMods=3
//! StaticMod=C2H3N1O1,C,fix,any,Carbamidomethyl
//! DynamicMod=O1,M,opt,any,Oxidation
//! DynamicMod=42.010565,*,opt,Prot-N-term,Acetyl
//! CustomAA=C5H7N1O2,J,custom,P,Hydroxyproline
//! ```

use std::path::Path;

use crate::mass::{formula_mass, SequenceMassCalculator, Tolerance};
use crate::modification::{name_for_mass, ModificationCatalog, ModificationSpecificity, Terminus};
use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct ModLine {
    pub mass: f64,
    /// Target residues; empty means any
    pub residues: Vec<u8>,
    pub fixed: bool,
    pub terminus: Terminus,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomResidue {
    pub residue: u8,
    pub mass: f64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MsgfParameters {
    pub precursor_tol: Option<Tolerance>,
    pub num_mods: Option<usize>,
    pub mods: Vec<ModLine>,
    pub custom_residues: Vec<CustomResidue>,
}

fn err<S: Into<String>>(line: usize, message: S) -> Error {
    Error::Parameter {
        line,
        message: message.into(),
    }
}

/// Mass given either as a number or as an empirical formula
fn parse_mass(text: &str) -> Option<f64> {
    let text = text.trim();
    text.parse::<f64>().ok().or_else(|| formula_mass(text))
}

/// `20ppm`, `0.5Da`, or asymmetric `10ppm,20ppm` (left, right)
fn parse_tolerance(text: &str) -> Option<Tolerance> {
    let sides = text
        .split(',')
        .map(|side| {
            let side = side.trim().to_ascii_lowercase();
            if let Some(v) = side.strip_suffix("ppm") {
                v.trim().parse::<f64>().ok().map(|v| (v.abs(), true))
            } else if let Some(v) = side.strip_suffix("da") {
                v.trim().parse::<f64>().ok().map(|v| (v.abs(), false))
            } else {
                None
            }
        })
        .collect::<Option<Vec<_>>>()?;

    let (left, right) = match sides.as_slice() {
        [one] => (*one, *one),
        [left, right] => (*left, *right),
        _ => return None,
    };
    match (left.1, right.1) {
        (true, true) => Some(Tolerance::Ppm(-left.0, right.0)),
        (false, false) => Some(Tolerance::Da(-left.0, right.0)),
        // Mixed units: the left side decides
        (true, false) => Some(Tolerance::Ppm(-left.0, left.0)),
        (false, true) => Some(Tolerance::Da(-left.0, left.0)),
    }
}

fn parse_terminus(text: &str) -> Option<Terminus> {
    match text.trim().to_ascii_lowercase().as_str() {
        "any" => Some(Terminus::Anywhere),
        "n-term" | "nterm" => Some(Terminus::PeptideN),
        "c-term" | "cterm" => Some(Terminus::PeptideC),
        "prot-n-term" | "protnterm" => Some(Terminus::ProteinN),
        "prot-c-term" | "protcterm" => Some(Terminus::ProteinC),
        _ => None,
    }
}

fn parse_mod(line: usize, value: &str) -> Result<Option<ModLine>, Error> {
    let parts = value.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.len() == 1 && parts[0].eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    if parts.len() < 4 {
        return Err(err(line, format!("expected at least 4 fields in `{}`", value)));
    }

    let mass = parse_mass(parts[0])
        .ok_or_else(|| err(line, format!("invalid mass or formula `{}`", parts[0])))?;
    let residues = match parts[1] {
        "*" => Vec::new(),
        r => r.bytes().map(|b| b.to_ascii_uppercase()).collect(),
    };
    let fixed = match parts[2].to_ascii_lowercase().as_str() {
        "fix" => true,
        "opt" => false,
        other => return Err(err(line, format!("expected `fix` or `opt`, found `{}`", other))),
    };
    let terminus = parse_terminus(parts[3])
        .ok_or_else(|| err(line, format!("invalid position `{}`", parts[3])))?;
    let name = match parts.get(4) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => name_for_mass(mass),
    };

    Ok(Some(ModLine {
        mass,
        residues,
        fixed,
        terminus,
        name,
    }))
}

fn parse_custom(line: usize, value: &str) -> Result<Option<CustomResidue>, Error> {
    let parts = value.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.len() == 1 && parts[0].eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    if parts.len() < 2 || parts[1].len() != 1 {
        return Err(err(line, format!("invalid custom amino acid `{}`", value)));
    }
    let mass = parse_mass(parts[0])
        .ok_or_else(|| err(line, format!("invalid mass or formula `{}`", parts[0])))?;
    let residue = parts[1].as_bytes()[0].to_ascii_uppercase();
    let name = parts
        .get(4)
        .filter(|n| !n.is_empty())
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("CustomAA_{}", residue as char));
    Ok(Some(CustomResidue {
        residue,
        mass,
        name,
    }))
}

impl MsgfParameters {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Error> {
        let mut params = MsgfParameters::default();
        let mut settings = 0;

        for (ix, line) in contents.lines().enumerate() {
            let line_no = ix + 1;
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim()),
                // A bare modification line, as found in Mods.txt
                None if line.contains(',') => ("mod".to_string(), line),
                None => continue,
            };
            settings += 1;

            match key.as_str() {
                "precursormasstolerance" | "pmtolerance" | "precursortolerance" | "t" => {
                    let tol = parse_tolerance(value)
                        .ok_or_else(|| err(line_no, format!("invalid tolerance `{}`", value)))?;
                    params.precursor_tol = Some(tol);
                }
                "nummods" => {
                    let n = value
                        .parse()
                        .map_err(|_| err(line_no, format!("invalid NumMods `{}`", value)))?;
                    params.num_mods = Some(n);
                }
                "staticmod" | "dynamicmod" | "mod" => {
                    if let Some(m) = parse_mod(line_no, value)? {
                        params.mods.push(m);
                    }
                }
                "customaa" => {
                    if let Some(aa) = parse_custom(line_no, value)? {
                        params.custom_residues.push(aa);
                    }
                }
                _ => log::trace!("ignoring parameter `{}`", key),
            }
        }

        if settings == 0 {
            return Err(err(0, "parameter file is empty"));
        }
        Ok(params)
    }

    /// Add modifications and custom residues to a catalog and mass calculator
    pub fn register(&self, catalog: &mut ModificationCatalog, calc: &mut SequenceMassCalculator) {
        for aa in &self.custom_residues {
            calc.set_custom_residue(aa.residue, aa.mass);
            catalog.add_custom_amino_acid(aa.residue, aa.mass, &aa.name);
        }
        // Static definitions first so that they never take a symbol slot
        for m in self.mods.iter().filter(|m| m.fixed) {
            let spec = ModificationSpecificity {
                terminus: m.terminus,
                residues: m.residues.clone(),
            };
            catalog.add_static(&spec, m.mass, &m.name);
        }
        for m in self.mods.iter().filter(|m| !m.fixed) {
            let spec = ModificationSpecificity {
                terminus: m.terminus,
                residues: m.residues.clone(),
            };
            catalog.add_dynamic(&spec, m.mass, &m.name);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modification::ModificationKind;

    const PARAMS: &str = r#"
# MS-GF+ parameters
PrecursorMassTolerance=20ppm
NumMods=3
StaticMod=C2H3N1O1,C,fix,any,Carbamidomethyl   # alkylation
DynamicMod=O1,M,opt,any,Oxidation
DynamicMod=HO3P,STY,opt,any,Phospho
DynamicMod=42.010565,*,opt,Prot-N-term,Acetyl
CustomAA=C5H7N1O2,J,custom,P,Hydroxyproline
StaticMod=None
"#;

    #[test]
    fn parse_file() {
        let params = MsgfParameters::parse(PARAMS).unwrap();
        assert_eq!(params.precursor_tol, Some(Tolerance::Ppm(-20.0, 20.0)));
        assert_eq!(params.num_mods, Some(3));
        assert_eq!(params.mods.len(), 4);
        assert!(params.mods[0].fixed);
        assert!((params.mods[0].mass - 57.021464).abs() < 1e-5);
        assert_eq!(params.mods[2].residues, b"STY".to_vec());
        assert_eq!(params.mods[3].terminus, Terminus::ProteinN);
        assert!(params.mods[3].residues.is_empty());
        assert_eq!(params.custom_residues[0].residue, b'J');

        let mut catalog = ModificationCatalog::default();
        let mut calc = SequenceMassCalculator::default();
        params.register(&mut catalog, &mut calc);
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.kind(0), Some(ModificationKind::CustomAminoAcid));
        assert_eq!(catalog.kind(1), Some(ModificationKind::Static));
        assert_eq!(catalog.get(2).unwrap().symbol, Some('*'));
        assert_eq!(catalog.get(4).unwrap().kind, ModificationKind::DynNTermProtein);
        assert!((calc.residue_mass(b'J').unwrap() - 113.047679).abs() < 1e-4);
    }

    #[test]
    fn tolerances() {
        assert_eq!(parse_tolerance("0.5Da"), Some(Tolerance::Da(-0.5, 0.5)));
        assert_eq!(parse_tolerance("10ppm,20ppm"), Some(Tolerance::Ppm(-10.0, 20.0)));
        assert_eq!(parse_tolerance("20"), None);
    }

    #[test]
    fn errors() {
        assert!(matches!(
            MsgfParameters::parse("# nothing here\n\n"),
            Err(Error::Parameter { line: 0, .. })
        ));
        assert!(matches!(
            MsgfParameters::parse("PrecursorMassTolerance=20ppm\nDynamicMod=Xx1,M,opt,any"),
            Err(Error::Parameter { line: 2, .. })
        ));
        assert!(matches!(
            MsgfParameters::parse("DynamicMod=O1,M,maybe,any"),
            Err(Error::Parameter { line: 1, .. })
        ));
    }
}
