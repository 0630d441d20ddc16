//! TopPIC PrSM tables

use csv::StringRecord;

use crate::columns::{parse_or_zero, Column, ColumnMap, Score};
use crate::fasta::truncate_protein_name;
use crate::mass::{c13_corrected_ppm, mass_to_ppm, SequenceMassCalculator};
use crate::modification::ModificationCatalog;
use crate::ranking::Hit;
use crate::resolver::{AppliedModification, ModTextResolver, ResolverWarnings};
use crate::scans::ScanGroups;
use crate::{ParserSettings, ResultParser, RowError};

/// Rows with fewer fields are rejected
pub const MIN_COLUMNS: usize = 20;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ToppicColumn {
    DataFileName,
    PrsmId,
    SpectrumId,
    FragMethod,
    Scans,
    RetentionTime,
    Peaks,
    Charge,
    PrecursorMass,
    AdjustedPrecursorMass,
    ProteoformId,
    FeatureIntensity,
    FeatureScore,
    ProteinAccession,
    ProteinDescription,
    FirstResidue,
    LastResidue,
    Proteoform,
    UnexpectedModifications,
    MiScore,
    VariablePtms,
    MatchedPeaks,
    MatchedFragmentIons,
    PValue,
    EValue,
    QValue,
    ProteoformFdr,
}

impl Column for ToppicColumn {
    fn synonyms() -> &'static [(Self, &'static [&'static str])] {
        use ToppicColumn::*;
        &[
            (DataFileName, &["Data file name"]),
            (PrsmId, &["Prsm ID"]),
            (SpectrumId, &["Spectrum ID"]),
            (FragMethod, &["Fragmentation"]),
            (Scans, &["Scan(s)"]),
            (RetentionTime, &["Retention time"]),
            (Peaks, &["#peaks"]),
            (Charge, &["Charge"]),
            (PrecursorMass, &["Precursor mass"]),
            (AdjustedPrecursorMass, &["Adjusted precursor mass"]),
            (ProteoformId, &["Proteoform ID"]),
            (FeatureIntensity, &["Feature intensity"]),
            (FeatureScore, &["Feature score"]),
            (ProteinAccession, &["Protein accession"]),
            (ProteinDescription, &["Protein description"]),
            (FirstResidue, &["First residue"]),
            (LastResidue, &["Last residue"]),
            (Proteoform, &["Proteoform"]),
            (UnexpectedModifications, &["#unexpected modifications"]),
            (MiScore, &["MIScore"]),
            (VariablePtms, &["#variable PTMs"]),
            (MatchedPeaks, &["#matched peaks"]),
            (MatchedFragmentIons, &["#matched fragment ions"]),
            (PValue, &["P-value"]),
            (EValue, &["E-value"]),
            (QValue, &["Q-value (spectral FDR)", "Spectrum-level Q-value"]),
            (ProteoformFdr, &["Proteoform FDR", "Proteoform-level Q-value"]),
        ]
    }

    /// Spaces and underscores are interchangeable
    fn normalize(name: &str) -> String {
        name.trim().to_ascii_lowercase().replace(' ', "_")
    }
}

/// Optional columns detected from the input header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ToppicSchema {
    pub miscore: bool,
    pub variable_ptms: bool,
}

impl ToppicSchema {
    pub fn from_columns(columns: &ColumnMap<ToppicColumn>) -> Self {
        ToppicSchema {
            miscore: columns.contains(ToppicColumn::MiScore),
            variable_ptms: columns.contains(ToppicColumn::VariablePtms),
        }
    }

    pub fn header(&self) -> Vec<&'static str> {
        let mut header = vec![
            "ResultID",
            "Scan",
            "Prsm_ID",
            "Spectrum_ID",
            "FragMethod",
            "Charge",
            "PrecursorMZ",
            "DelM",
            "DelM_PPM",
            "MH",
            "Peptide",
            "Proteoform_ID",
            "Feature_Intensity",
            "Feature_Score",
            "Protein",
            "ResidueStart",
            "ResidueEnd",
            "Unexpected_Mod_Count",
            "Peak_Count",
            "Matched_Peak_Count",
            "Matched_Fragment_Ion_Count",
            "PValue",
            "Rank_PValue",
            "EValue",
            "QValue",
            "Proteoform_QValue",
        ];
        if self.miscore {
            header.push("MIScore");
        }
        if self.variable_ptms {
            header.push("Variable_PTMs");
        }
        header
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToppicResult {
    pub scan: u32,
    pub prsm_id: String,
    pub spectrum_id: String,
    pub frag_method: String,
    pub charge: u8,
    pub precursor_mz: f64,
    pub del_m: f64,
    pub del_m_ppm: f64,
    pub mh: f64,
    /// Proteoform with prefix, suffix and modification symbols
    pub peptide: String,
    pub clean_sequence: String,
    pub total_mod_mass: f64,
    pub proteoform_id: String,
    pub feature_intensity: String,
    pub feature_score: String,
    pub protein: String,
    pub residue_start: String,
    pub residue_end: String,
    pub unexpected_mod_count: String,
    pub peak_count: String,
    pub matched_peak_count: String,
    pub matched_fragment_ion_count: String,
    pub pvalue: Score,
    pub evalue: Score,
    pub qvalue: Score,
    pub proteoform_qvalue: Score,
    pub miscore: String,
    pub variable_ptms: String,
    pub rank: u32,
    pub scan_group: usize,
    pub modifications: Vec<AppliedModification>,
    pub unresolved_mods: bool,
}

impl Hit for ToppicResult {
    fn scan(&self) -> u32 {
        self.scan
    }

    fn charge(&self) -> u8 {
        self.charge
    }

    fn primary(&self) -> f64 {
        self.pvalue.value
    }

    fn secondary(&self) -> f64 {
        self.evalue.value
    }

    fn fdr(&self) -> Option<f64> {
        Some(self.qvalue.value)
    }

    fn peptide(&self) -> &str {
        &self.peptide
    }

    fn protein(&self) -> &str {
        &self.protein
    }

    fn mh(&self) -> f64 {
        self.mh
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }

    fn modifications(&self) -> &[AppliedModification] {
        &self.modifications
    }
}

pub struct ToppicParser<'a> {
    columns: ColumnMap<ToppicColumn>,
    schema: ToppicSchema,
    resolver: ModTextResolver<'a>,
    calc: &'a SequenceMassCalculator,
    settings: ParserSettings,
    warnings: ResolverWarnings,
    scan_groups: ScanGroups,
    numeric_mod_errors: usize,
}

impl<'a> ToppicParser<'a> {
    pub fn new(
        header: &StringRecord,
        catalog: &'a ModificationCatalog,
        calc: &'a SequenceMassCalculator,
        settings: ParserSettings,
    ) -> Self {
        let columns = ColumnMap::from_header(header);
        for name in columns.unknown() {
            log::warn!("unrecognized TopPIC column `{}`", name);
        }
        let schema = ToppicSchema::from_columns(&columns);
        ToppicParser {
            columns,
            schema,
            resolver: ModTextResolver::with_tolerance(catalog, settings.mod_mass_tolerance),
            calc,
            settings,
            warnings: ResolverWarnings::default(),
            scan_groups: ScanGroups::default(),
            numeric_mod_errors: 0,
        }
    }

    pub fn schema(&self) -> ToppicSchema {
        self.schema
    }

    /// Precursor mass error as (Da, ppm): observed minus theoretical, in ppm
    /// of the theoretical (adjusted) mass
    pub fn mass_error(&self, precursor: f64, adjusted: f64) -> (f64, f64) {
        let del_m = precursor - adjusted;
        let ppm = match self.settings.c13_correction {
            true => c13_corrected_ppm(del_m, adjusted, None),
            false => mass_to_ppm(del_m, adjusted),
        };
        (del_m, ppm)
    }
}

impl<'a> ResultParser for ToppicParser<'a> {
    type Output = ToppicResult;

    fn parse_row(&mut self, record: &StringRecord) -> Result<Vec<ToppicResult>, RowError> {
        use ToppicColumn::*;

        if record.len() < MIN_COLUMNS {
            return Err(RowError::TooFewColumns {
                found: record.len(),
                required: MIN_COLUMNS,
            });
        }
        let col = &self.columns;

        let charge_text = col.text(record, Charge);
        let charge = charge_text
            .parse::<u8>()
            .map_err(|_| RowError::InvalidNumber {
                field: "Charge",
                value: charge_text.to_string(),
            })?;
        let proteoform = col
            .get(record, Proteoform)
            .filter(|s| !s.is_empty())
            .ok_or(RowError::MissingField("Proteoform"))?;

        // Multiple scans are separated by spaces or slashes
        let scan_text = col.text(record, Scans);
        let scans = scan_text
            .split(|c: char| c == '/' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>().map_err(|_| RowError::InvalidNumber {
                    field: "Scan(s)",
                    value: scan_text.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if scans.is_empty() {
            return Err(RowError::MissingField("Scan(s)"));
        }

        let precursor = parse_or_zero(col.text(record, PrecursorMass));
        let adjusted = parse_or_zero(col.text(record, AdjustedPrecursorMass));

        let resolved = self.resolver.resolve_bracketed(proteoform, &mut self.warnings);
        if !resolved.success() {
            self.numeric_mod_errors += 1;
        }
        let mono = self
            .calc
            .sequence_mass(&resolved.clean_sequence)
            .map_err(|e| RowError::UnknownResidue {
                residue: e.0,
                peptide: proteoform.to_string(),
            })?
            + resolved.total_mod_mass;

        let (del_m, del_m_ppm) = self.mass_error(precursor, adjusted);
        let col = &self.columns;
        let scan_group = self.scan_groups.assign(&scans, charge);

        let result = ToppicResult {
            scan: scans[0],
            prsm_id: col.text(record, PrsmId).to_string(),
            spectrum_id: col.text(record, SpectrumId).to_string(),
            frag_method: col.text(record, FragMethod).to_string(),
            charge,
            precursor_mz: self.calc.convolute_mass(precursor, 0, charge),
            del_m,
            del_m_ppm,
            mh: self.calc.convolute_mass(mono, 0, 1),
            peptide: resolved.peptide(),
            clean_sequence: resolved.clean_sequence.clone(),
            total_mod_mass: resolved.total_mod_mass,
            proteoform_id: col.text(record, ProteoformId).to_string(),
            feature_intensity: col.text(record, FeatureIntensity).to_string(),
            feature_score: col.text(record, FeatureScore).to_string(),
            protein: truncate_protein_name(col.text(record, ProteinAccession)).to_string(),
            residue_start: col.text(record, FirstResidue).to_string(),
            residue_end: col.text(record, LastResidue).to_string(),
            unexpected_mod_count: col.text(record, UnexpectedModifications).to_string(),
            peak_count: col.text(record, Peaks).to_string(),
            matched_peak_count: col.text(record, MatchedPeaks).to_string(),
            matched_fragment_ion_count: col.text(record, MatchedFragmentIons).to_string(),
            pvalue: Score::parse(col.text(record, PValue)),
            evalue: Score::parse(col.text(record, EValue)),
            qvalue: Score::parse(col.text(record, QValue)),
            proteoform_qvalue: Score::parse(col.text(record, ProteoformFdr)),
            miscore: col.text(record, MiScore).to_string(),
            variable_ptms: col.text(record, VariablePtms).to_string(),
            rank: 0,
            scan_group,
            unresolved_mods: !resolved.success(),
            modifications: resolved.modifications,
        };

        let mut results = Vec::with_capacity(scans.len());
        for &scan in &scans[1..] {
            results.push(ToppicResult {
                scan,
                ..result.clone()
            });
        }
        results.insert(0, result);
        Ok(results)
    }

    fn scan_groups(&self) -> &ScanGroups {
        &self.scan_groups
    }

    fn numeric_mod_errors(&self) -> usize {
        self.numeric_mod_errors
    }

    fn suppressed_warnings(&self) -> usize {
        self.warnings.unresolved_mass.suppressed()
    }
}
