use std::fmt::Display;

use fnv::FnvHashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const H2O: f64 = 18.0105647;
pub const PROTON: f64 = 1.00727649;
/// Mass difference between 13C and 12C
pub const C13_DELTA: f64 = 1.00335483;

#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    Ppm(f64, f64),
    Da(f64, f64),
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Ppm(-20.0, 20.0)
    }
}

impl Tolerance {
    /// Compute the (`lower`, `upper`) window (in Da) for a monoisotopic
    /// mass and a given tolerance
    pub fn bounds(&self, center: f64) -> (f64, f64) {
        match self {
            Tolerance::Ppm(lo, hi) => {
                let delta_lo = center * lo / 1_000_000.0;
                let delta_hi = center * hi / 1_000_000.0;
                (center + delta_lo, center + delta_hi)
            }
            Tolerance::Da(lo, hi) => (center + lo, center + hi),
        }
    }

    /// Widest side of the window, expressed in Da at `center`
    pub fn max_da(&self, center: f64) -> f64 {
        let (lo, hi) = self.bounds(center);
        (center - lo).abs().max((hi - center).abs())
    }
}

impl Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tolerance::Ppm(lo, hi) => write!(f, "[{} - {}] ppm", lo, hi),
            Tolerance::Da(lo, hi) => write!(f, "[{} - {}] Da", lo, hi),
        }
    }
}

pub fn ppm_to_mass(ppm: f64, center: f64) -> f64 {
    ppm * center / 1_000_000.0
}

pub fn mass_to_ppm(delta: f64, center: f64) -> f64 {
    if center == 0.0 {
        return 0.0;
    }
    delta / center * 1_000_000.0
}

pub const VALID_AA: [u8; 22] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y', b'U', b'O',
];

/// Monoisotopic residue mass of one of the 22 proteinogenic amino acids
pub fn monoisotopic(residue: u8) -> Option<f64> {
    let mass = match residue {
        b'A' => 71.0371138,
        b'R' => 156.1011110,
        b'N' => 114.0429274,
        b'D' => 115.0269430,
        b'C' => 103.0091845,
        b'E' => 129.0425931,
        b'Q' => 128.0585775,
        b'G' => 57.0214637,
        b'H' => 137.0589119,
        b'I' => 113.0840640,
        b'L' => 113.0840640,
        b'K' => 128.0949630,
        b'M' => 131.0404846,
        b'F' => 147.0684139,
        b'P' => 97.0527638,
        b'S' => 87.0320284,
        b'T' => 101.0476785,
        b'W' => 186.0793130,
        b'Y' => 163.0633285,
        b'V' => 99.0684139,
        b'U' => 150.9536334,
        b'O' => 237.1477269,
        _ => return None,
    };
    Some(mass)
}

fn element_mass(symbol: &str) -> Option<f64> {
    let mass = match symbol {
        "H" => 1.00782503207,
        "C" => 12.0,
        "N" => 14.0030740048,
        "O" => 15.99491461956,
        "S" => 31.97207100,
        "P" => 30.97376163,
        "Se" => 79.9165213,
        "Br" => 78.9183371,
        "Cl" => 34.96885268,
        "Fe" => 55.9349375,
        "Na" => 22.9897692809,
        "K" => 38.96370668,
        "Ca" => 39.96259098,
        "Mg" => 23.9850417,
        "Cu" => 62.9295975,
        "Zn" => 63.9291422,
        "Li" => 7.01600455,
        "F" => 18.99840322,
        "I" => 126.904473,
        "Hg" => 201.970643,
        _ => return None,
    };
    Some(mass)
}

/// Monoisotopic mass of an empirical formula such as `C2H3N1O1` or
/// `H-1N-1O1`. Element counts may be omitted (implying 1) or negative.
pub fn formula_mass(formula: &str) -> Option<f64> {
    let re = Regex::new(r"([A-Z][a-z]?)(-?[0-9]*)").expect("valid regex");
    let formula = formula.trim();
    if formula.is_empty() {
        return None;
    }

    let mut consumed = 0;
    let mut mass = 0.0;
    for cap in re.captures_iter(formula) {
        let whole = cap.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();

        let count = match cap.get(2).map(|m| m.as_str()) {
            None | Some("") => 1,
            Some("-") => return None,
            Some(n) => n.parse::<i32>().ok()?,
        };
        mass += element_mass(&cap[1])? * count as f64;
    }

    match consumed == formula.len() {
        true => Some(mass),
        false => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownResidue(pub char);

impl Display for UnknownResidue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown residue `{}`", self.0)
    }
}

impl std::error::Error for UnknownResidue {}

/// Computes monoisotopic masses of clean (unmodified, symbol-free) sequences.
///
/// Ambiguous and user-defined residues (B, J, O, U, X, Z, or anything set
/// through a `CustomAA` line) are looked up in `custom` before the standard
/// table.
#[derive(Debug, Clone)]
pub struct SequenceMassCalculator {
    custom: FnvHashMap<u8, f64>,
    pub charge_carrier: f64,
}

impl Default for SequenceMassCalculator {
    fn default() -> Self {
        let mut custom = FnvHashMap::default();
        // average of N and D
        custom.insert(b'B', 114.5349352);
        custom.insert(b'J', 113.0840640);
        custom.insert(b'X', 113.0840640);
        // average of Q and E
        custom.insert(b'Z', 128.5505853);
        Self {
            custom,
            charge_carrier: PROTON,
        }
    }
}

impl SequenceMassCalculator {
    pub fn with_charge_carrier(mut self, charge_carrier: f64) -> Self {
        self.charge_carrier = charge_carrier;
        self
    }

    /// Define (or redefine) the residue mass used for `residue`
    pub fn set_custom_residue(&mut self, residue: u8, mass: f64) {
        self.custom.insert(residue.to_ascii_uppercase(), mass);
    }

    pub fn residue_mass(&self, residue: u8) -> Option<f64> {
        let residue = residue.to_ascii_uppercase();
        self.custom
            .get(&residue)
            .copied()
            .or_else(|| monoisotopic(residue))
    }

    /// Monoisotopic mass of a clean sequence, including the terminal water
    pub fn sequence_mass(&self, clean_sequence: &str) -> Result<f64, UnknownResidue> {
        let mut mass = H2O;
        for residue in clean_sequence.bytes() {
            mass += self
                .residue_mass(residue)
                .ok_or(UnknownResidue(residue as char))?;
        }
        Ok(mass)
    }

    /// Convert `mass` observed at `from_charge` into the equivalent mass at
    /// `to_charge`. A charge of 0 denotes the neutral monoisotopic mass, 1
    /// is M+H, and anything above is an m/z value.
    pub fn convolute_mass(&self, mass: f64, from_charge: u8, to_charge: u8) -> f64 {
        if from_charge == to_charge {
            return mass;
        }
        let neutral = match from_charge {
            0 => mass,
            z => mass * z as f64 - self.charge_carrier * z as f64,
        };
        match to_charge {
            0 => neutral,
            z => (neutral + self.charge_carrier * z as f64) / z as f64,
        }
    }
}

/// Difference between an observed and a theoretical mass, in ppm of the
/// theoretical mass, after removing whole 13C isotope offsets.
///
/// If `isotope_error` is known (MS-GF+ reports it), that many C13 deltas are
/// removed. Otherwise the offset is estimated from the mass difference when
/// it is at least half a Dalton.
pub fn c13_corrected_ppm(delta_mass: f64, theoretical: f64, isotope_error: Option<i32>) -> f64 {
    let isotopes = match isotope_error {
        Some(n) => n as f64,
        None if delta_mass.abs() >= 0.5 => (delta_mass / C13_DELTA).round(),
        None => 0.0,
    };
    mass_to_ppm(delta_mass - isotopes * C13_DELTA, theoretical)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smoke() {
        for ch in VALID_AA {
            assert!(monoisotopic(ch).unwrap() > 0.0);
        }
        assert!(monoisotopic(b'#').is_none());
    }

    #[test]
    fn tolerances() {
        let (lo, hi) = Tolerance::Ppm(-10.0, 20.0).bounds(1000.0);
        assert!((lo - 999.99).abs() < 1e-9);
        assert!((hi - 1000.02).abs() < 1e-9);
        let (lo, hi) = Tolerance::Da(-0.5, 0.5).bounds(487.0);
        assert_eq!((lo, hi), (486.5, 487.5));
        assert!((Tolerance::Ppm(-20.0, 10.0).max_da(2000.0) - 0.04).abs() < 1e-9);
    }

    #[test]
    fn peptide_mass() {
        let calc = SequenceMassCalculator::default();
        let mass = calc.sequence_mass("PEPTIDE").unwrap();
        assert!((mass - 799.35997).abs() < 1e-4, "{}", mass);
        assert_eq!(calc.sequence_mass("PEP1"), Err(UnknownResidue('1')));
        assert!(calc.sequence_mass("PEPBZ").is_ok());
    }

    #[test]
    fn convolute() {
        let calc = SequenceMassCalculator::default();
        let mz = calc.convolute_mass(1000.0, 0, 2);
        assert!((mz - (1000.0 + 2.0 * PROTON) / 2.0).abs() < 1e-9);
        let back = calc.convolute_mass(mz, 2, 0);
        assert!((back - 1000.0).abs() < 1e-9);
        let mh = calc.convolute_mass(mz, 2, 1);
        assert!((mh - (1000.0 + PROTON)).abs() < 1e-9);
    }

    #[test]
    fn formulas() {
        let carbamidomethyl = formula_mass("C2H3N1O1").unwrap();
        assert!((carbamidomethyl - 57.021464).abs() < 1e-5);
        let oxidation = formula_mass("O1").unwrap();
        assert!((oxidation - 15.994915).abs() < 1e-5);
        let deamidation = formula_mass("H-1N-1O1").unwrap();
        assert!((deamidation - 0.984016).abs() < 1e-5);
        let phospho = formula_mass("HO3P").unwrap();
        assert!((phospho - 79.966331).abs() < 1e-5);
        assert_eq!(formula_mass("15.9949"), None);
        assert_eq!(formula_mass("C2Xx3"), None);
        assert_eq!(formula_mass(""), None);
    }

    #[test]
    fn isotope_correction() {
        let ppm = c13_corrected_ppm(1.00335483 + 0.001, 1000.0, None);
        assert!((ppm - 1.0).abs() < 1e-6);
        let ppm = c13_corrected_ppm(2.0 * C13_DELTA, 1000.0, Some(2));
        assert!(ppm.abs() < 1e-9);
        assert!((c13_corrected_ppm(-0.01, 1000.0, None) + 10.0).abs() < 1e-9);
    }
}
