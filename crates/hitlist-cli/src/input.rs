use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::ArgMatches;
use hitlist_core::mass::{Tolerance, PROTON};
use hitlist_core::modification::ValueOrVec;
use hitlist_core::msgf_params::MsgfParameters;
use hitlist_core::ranking::Thresholds;
use hitlist_core::resolver::MOD_MASS_TOLERANCE;
use hitlist_core::{ParserSettings, Tool};
use serde::{Deserialize, Serialize};

use crate::runner::FileSummary;

#[derive(Serialize)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub tool: Option<Tool>,
    pub input_paths: Vec<String>,
    pub fasta: Option<String>,
    pub msgf_parameter_file: Option<String>,
    pub static_mods: HashMap<String, f64>,
    pub variable_mods: HashMap<String, ValueOrVec>,
    pub precursor_tol: Tolerance,
    pub synopsis: SynopsisOptions,
    pub mod_mass_tolerance: f64,
    pub charge_carrier_mass: f64,
    pub c13_correction: bool,
    pub write_synopsis: bool,
    pub write_first_hits: bool,
    pub write_mod_summary: bool,
    pub output_paths: Vec<String>,
    pub files: Vec<FileSummary>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,

    #[serde(skip_serializing)]
    pub msgf_parameters: Option<MsgfParameters>,
}

#[derive(Deserialize, Default)]
/// Input parameters deserialized from JSON file
pub struct Input {
    tool: Option<Tool>,
    input_paths: Option<Vec<String>>,
    output_directory: Option<String>,
    fasta: Option<String>,
    msgf_parameter_file: Option<String>,
    static_mods: Option<HashMap<String, f64>>,
    variable_mods: Option<HashMap<String, ValueOrVec>>,
    precursor_tol: Option<Tolerance>,
    synopsis: Option<SynopsisOptions>,
    mod_mass_tolerance: Option<f64>,
    charge_carrier_mass: Option<f64>,
    c13_correction: Option<bool>,
    write_synopsis: Option<bool>,
    write_first_hits: Option<bool>,
    write_mod_summary: Option<bool>,
}

/// Score cutoffs for the synopsis file. Missing values fall back to the
/// defaults of the tool that produced each input file.
#[derive(Serialize, Deserialize, Default, Debug, Copy, Clone, PartialEq)]
pub struct SynopsisOptions {
    pub primary_threshold: Option<f64>,
    pub secondary_threshold: Option<f64>,
    pub fdr_threshold: Option<f64>,
}

impl SynopsisOptions {
    pub fn thresholds(&self, tool: Tool) -> Thresholds {
        let default = tool.default_thresholds();
        Thresholds {
            primary: self.primary_threshold.unwrap_or(default.primary),
            secondary: self.secondary_threshold.unwrap_or(default.secondary),
            fdr: self.fdr_threshold.unwrap_or(default.fdr),
        }
    }
}

impl Search {
    pub fn parser_settings(&self) -> ParserSettings {
        ParserSettings {
            precursor_tol: self.precursor_tol,
            mod_mass_tolerance: self.mod_mass_tolerance,
            c13_correction: self.c13_correction,
        }
    }
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(fasta) = matches.get_one::<String>("fasta") {
            log::trace!("overriding `fasta` parameter.");
            input.fasta = Some(fasta.into());
        }
        if let Some(tool) = matches.get_one::<String>("tool") {
            log::trace!("overriding `tool` parameter.");
            input.tool = Some(
                serde_json::from_value(serde_json::Value::String(tool.to_ascii_lowercase()))
                    .with_context(|| format!("Unknown tool `{tool}`"))?,
            );
        }
        if let Some(input_paths) = matches.get_many::<String>("input_paths") {
            log::trace!("overriding `input_paths` parameter.");
            input.input_paths = Some(input_paths.into_iter().map(|p| p.into()).collect());
        }
        if matches.get_flag("no-synopsis") {
            input.write_synopsis = Some(false);
        }
        if matches.get_flag("no-first-hits") {
            input.write_first_hits = Some(false);
        }

        ensure!(
            input.input_paths.as_ref().map(|p| !p.is_empty()).unwrap_or(false),
            "`input_paths` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        hitlist_core::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    fn check_tolerances(tolerance: &Tolerance) {
        let (lo, hi) = match tolerance {
            Tolerance::Ppm(lo, hi) | Tolerance::Da(lo, hi) => (lo, hi),
        };
        if lo > hi {
            log::warn!(
                "Lower precursor tolerance is greater than the upper one: [{} - {}]",
                lo,
                hi
            );
        }
    }

    pub fn build(self) -> anyhow::Result<Search> {
        let input_paths = self
            .input_paths
            .context("'input_paths' must be provided!")?;

        let msgf_parameters = match &self.msgf_parameter_file {
            Some(path) => Some(
                MsgfParameters::load(path)
                    .with_context(|| format!("Failed to read MS-GF+ parameters from `{path}`"))?,
            ),
            None => None,
        };

        // The JSON file wins over the MS-GF+ parameter file
        let precursor_tol = self
            .precursor_tol
            .or_else(|| msgf_parameters.as_ref().and_then(|p| p.precursor_tol))
            .unwrap_or_default();
        Self::check_tolerances(&precursor_tol);

        let mod_mass_tolerance = self.mod_mass_tolerance.unwrap_or(MOD_MASS_TOLERANCE).abs();
        if mod_mass_tolerance > 1.0 {
            log::warn!(
                "`mod_mass_tolerance` of {} Da is wider than expected",
                mod_mass_tolerance
            );
        }

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path).with_context(|| {
                    format!("Failed to create output directory `{}`", path.display())
                })?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Search {
            version: clap::crate_version!().into(),
            tool: self.tool,
            input_paths,
            fasta: self.fasta,
            msgf_parameter_file: self.msgf_parameter_file,
            static_mods: self.static_mods.unwrap_or_default(),
            variable_mods: self.variable_mods.unwrap_or_default(),
            precursor_tol,
            synopsis: self.synopsis.unwrap_or_default(),
            mod_mass_tolerance,
            charge_carrier_mass: self.charge_carrier_mass.unwrap_or(PROTON),
            c13_correction: self.c13_correction.unwrap_or(true),
            write_synopsis: self.write_synopsis.unwrap_or(true),
            write_first_hits: self.write_first_hits.unwrap_or(true),
            write_mod_summary: self.write_mod_summary.unwrap_or(true),
            output_paths: Vec::new(),
            files: Vec::new(),
            output_directory,
            msgf_parameters,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let input: Input = serde_json::from_str(
            r#"{
                "input_paths": ["a_msgfplus.tsv"],
                "output_directory": "target/hitlist-input-test",
                "variable_mods": { "M": 15.994915, "^": [42.010565] },
                "synopsis": { "primary_threshold": 1e-9 }
            }"#,
        )?;
        let search = input.build()?;
        assert_eq!(search.tool, None);
        assert_eq!(search.precursor_tol, Tolerance::Ppm(-20.0, 20.0));
        assert_eq!(search.mod_mass_tolerance, MOD_MASS_TOLERANCE);
        assert_eq!(search.charge_carrier_mass, PROTON);
        assert!(search.write_synopsis && search.write_first_hits && search.write_mod_summary);
        assert_eq!(search.variable_mods.len(), 2);

        let thresholds = search.synopsis.thresholds(Tool::MsgfPlus);
        assert_eq!(thresholds.primary, 1e-9);
        assert_eq!(thresholds.secondary, 0.75);
        assert_eq!(search.synopsis.thresholds(Tool::TopPic).secondary, 0.75);
        Ok(())
    }

    #[test]
    fn missing_inputs() {
        let input = Input::default();
        assert!(input.build().is_err());
    }
}
