pub mod columns;
pub mod enzyme;
pub mod fasta;
pub mod mass;
pub mod modification;
pub mod msgf;
pub mod msgf_params;
pub mod ranking;
pub mod resolver;
pub mod scans;
pub mod throttle;
pub mod toppic;

use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Problem in a search engine parameter file, with its line number
    Parameter { line: usize, message: String },
    /// The first line of an input file is not a recognized header
    Header(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
            Self::Parameter { line, message } => write!(f, "line {}: {}", line, message),
            Self::Header(msg) => write!(f, "unrecognized header: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Why a single input row was skipped
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    TooFewColumns { found: usize, required: usize },
    MissingField(&'static str),
    InvalidNumber { field: &'static str, value: String },
    UnknownResidue { residue: char, peptide: String },
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewColumns { found, required } => {
                write!(f, "expected at least {} columns, found {}", required, found)
            }
            Self::MissingField(field) => write!(f, "missing value for {}", field),
            Self::InvalidNumber { field, value } => {
                write!(f, "invalid {} `{}`", field, value)
            }
            Self::UnknownResidue { residue, peptide } => {
                write!(f, "unknown residue `{}` in {}", residue, peptide)
            }
        }
    }
}

impl std::error::Error for RowError {}

/// Search engine that produced an input file
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[serde(alias = "msgfdb", alias = "msgf+")]
    MsgfPlus,
    TopPic,
}

impl Tool {
    /// Guess the tool from the header record of a result file
    pub fn detect(header: &StringRecord) -> Option<Tool> {
        let columns = header
            .iter()
            .map(|s| s.trim().to_ascii_lowercase().replace(' ', "_"))
            .collect::<Vec<_>>();
        let has = |name: &str| columns.iter().any(|c| c == name);

        if has("specevalue") || has("specprob") || has("msgfscore") {
            Some(Tool::MsgfPlus)
        } else if has("proteoform") || has("prsm_id") {
            Some(Tool::TopPic)
        } else {
            None
        }
    }

    pub fn default_thresholds(&self) -> ranking::Thresholds {
        match self {
            Tool::MsgfPlus => ranking::Thresholds {
                primary: 5e-7,
                secondary: 0.75,
                fdr: 0.01,
            },
            Tool::TopPic => ranking::Thresholds {
                primary: 0.01,
                secondary: 0.75,
                fdr: 0.01,
            },
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tool::MsgfPlus => f.write_str("MS-GF+"),
            Tool::TopPic => f.write_str("TopPIC"),
        }
    }
}

/// Mass handling shared by the result parsers
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParserSettings {
    /// Parent ion tolerance the search was run with
    pub precursor_tol: mass::Tolerance,
    /// Window for matching observed modification masses to definitions
    pub mod_mass_tolerance: f64,
    /// Remove whole 13C offsets before computing ppm errors
    pub c13_correction: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            precursor_tol: mass::Tolerance::default(),
            mod_mass_tolerance: resolver::MOD_MASS_TOLERANCE,
            c13_correction: true,
        }
    }
}

/// Turns the data lines of one result file into search results
pub trait ResultParser {
    type Output: ranking::Hit + Clone;

    /// Parse one data record. A merged spectrum or a list of proteins
    /// expands into several results.
    fn parse_row(&mut self, record: &StringRecord) -> Result<Vec<Self::Output>, RowError>;

    fn scan_groups(&self) -> &scans::ScanGroups;

    /// Rows containing at least one modification mass without a definition
    fn numeric_mod_errors(&self) -> usize;

    /// Repeated warnings that were counted but not logged
    fn suppressed_warnings(&self) -> usize;
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<fasta::Fasta, Error> {
    let contents = std::fs::read_to_string(path)?;
    Ok(fasta::Fasta::parse(&contents))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detect_tool() {
        let msgf = "#SpecFile\tSpecID\tScanNum\tFragMethod\tPrecursor\tIsotopeError\t\
                    PrecursorError(ppm)\tCharge\tPeptide\tProtein\tDeNovoScore\tMSGFScore\t\
                    SpecEValue\tEValue";
        let record = |line: &str| StringRecord::from(line.split('\t').collect::<Vec<_>>());
        assert_eq!(Tool::detect(&record(msgf)), Some(Tool::MsgfPlus));
        let toppic = "Data file name\tPrsm ID\tSpectrum ID\tFragmentation\tScan(s)\tProteoform";
        assert_eq!(Tool::detect(&record(toppic)), Some(Tool::TopPic));
        assert_eq!(Tool::detect(&record("a\tb\tc")), None);
    }

    #[test]
    fn tool_json() {
        let tool: Tool = serde_json::from_str("\"msgfplus\"").unwrap();
        assert_eq!(tool, Tool::MsgfPlus);
        let tool: Tool = serde_json::from_str("\"msgfdb\"").unwrap();
        assert_eq!(tool, Tool::MsgfPlus);
        let tool: Tool = serde_json::from_str("\"toppic\"").unwrap();
        assert_eq!(tool, Tool::TopPic);
    }
}
