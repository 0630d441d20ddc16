//! MS-GF+ (and MSGFDB) tab-delimited results

use csv::StringRecord;
use regex::Regex;
use serde::Serialize;

use crate::columns::{parse_or_zero, Column, ColumnMap, Score};
use crate::enzyme::Enzyme;
use crate::fasta::truncate_protein_name;
use crate::mass::{c13_corrected_ppm, mass_to_ppm, ppm_to_mass, SequenceMassCalculator, C13_DELTA};
use crate::modification::ModificationCatalog;
use crate::ranking::Hit;
use crate::resolver::{split_prefix_suffix, AppliedModification, ModTextResolver, ResolverWarnings};
use crate::scans::{
    merged_part, normalize_spec_index, scan_from_spec_id, split_merged, ScanGroups,
};
use crate::throttle::WarningLimiter;
use crate::{ParserSettings, ResultParser, RowError};

/// Rows with fewer fields are rejected
pub const MIN_COLUMNS: usize = 13;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MsgfColumn {
    SpectrumFile,
    SpecIndex,
    Scan,
    FragMethod,
    Precursor,
    IsotopeError,
    PrecursorErrorDa,
    PrecursorErrorPpm,
    Charge,
    Peptide,
    Protein,
    DeNovoScore,
    MsgfScore,
    SpecEValue,
    EValue,
    QValue,
    PepQValue,
    Efdr,
    ImsScan,
    ImsDriftTime,
}

impl Column for MsgfColumn {
    fn synonyms() -> &'static [(Self, &'static [&'static str])] {
        use MsgfColumn::*;
        &[
            (SpectrumFile, &["#SpecFile"]),
            (SpecIndex, &["SpecIndex", "SpecID"]),
            (Scan, &["Scan#", "ScanNum"]),
            (FragMethod, &["FragMethod"]),
            (Precursor, &["Precursor"]),
            (IsotopeError, &["IsotopeError"]),
            (PrecursorErrorDa, &["PMError(Da)", "PrecursorError(Da)"]),
            (PrecursorErrorPpm, &["PMError(ppm)", "PrecursorError(ppm)"]),
            (Charge, &["Charge"]),
            (Peptide, &["Peptide"]),
            (Protein, &["Protein"]),
            (DeNovoScore, &["DeNovoScore"]),
            (MsgfScore, &["MSGFScore"]),
            (SpecEValue, &["SpecProb", "SpecEValue"]),
            (EValue, &["P-value", "EValue"]),
            (QValue, &["FDR", "QValue"]),
            (PepQValue, &["PepFDR", "PepQValue"]),
            (Efdr, &["EFDR"]),
            (ImsScan, &["IMS Scan", "IMSScan"]),
            (ImsDriftTime, &["IMS Drift Time", "IMSDriftTime"]),
        ]
    }
}

/// Which FDR-type columns a file carries
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FdrColumns {
    /// Target-decoy MS-GF+: `QValue`, `PepQValue`
    QValue,
    /// Target-decoy MSGFDB: `FDR`, `PepFDR`
    Fdr,
    /// No target-decoy: estimated FDR
    Efdr,
    None,
}

/// Output variant detected from the input header
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MsgfSchema {
    /// MS-GF+ naming (`SpecEValue`, `EValue`) rather than MSGFDB naming
    /// (`SpecProb`, `P-value`)
    pub msgf_plus: bool,
    pub fdr: FdrColumns,
    pub isotope_error: bool,
    pub ims: bool,
}

impl MsgfSchema {
    pub fn from_columns(columns: &ColumnMap<MsgfColumn>) -> Self {
        let named = |column, name: &str| {
            columns
                .header_name(column)
                .map(|h| h.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        };
        let fdr = if named(MsgfColumn::QValue, "QValue") {
            FdrColumns::QValue
        } else if columns.contains(MsgfColumn::QValue) {
            FdrColumns::Fdr
        } else if columns.contains(MsgfColumn::Efdr) {
            FdrColumns::Efdr
        } else {
            FdrColumns::None
        };
        MsgfSchema {
            msgf_plus: !named(MsgfColumn::SpecEValue, "SpecProb"),
            fdr,
            isotope_error: columns.contains(MsgfColumn::IsotopeError),
            ims: columns.contains(MsgfColumn::ImsScan) || columns.contains(MsgfColumn::ImsDriftTime),
        }
    }

    /// Columns of the synopsis and first-hits files
    pub fn header(&self) -> Vec<&'static str> {
        let mut header = vec![
            "ResultID",
            "Scan",
            "FragMethod",
            "SpecIndex",
            "Charge",
            "PrecursorMZ",
            "DelM",
            "DelM_PPM",
            "MH",
            "Peptide",
            "Protein",
            "NTT",
            "DeNovoScore",
            "MSGFScore",
        ];
        match self.msgf_plus {
            true => header.extend(["MSGFDB_SpecEValue", "Rank_MSGFDB_SpecEValue", "EValue"]),
            false => header.extend(["MSGFDB_SpecProb", "Rank_MSGFDB_SpecProb", "PValue"]),
        }
        match self.fdr {
            FdrColumns::QValue => header.extend(["QValue", "PepQValue"]),
            FdrColumns::Fdr => header.extend(["FDR", "PepFDR"]),
            FdrColumns::Efdr => header.push("EFDR"),
            FdrColumns::None => {}
        }
        if self.isotope_error {
            header.push("IsotopeError");
        }
        if self.ims {
            header.extend(["IMS_Scan", "IMS_DriftTime"]);
        }
        header
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MsgfResult {
    pub spectrum_file: String,
    pub scan: u32,
    pub spec_index: String,
    pub frag_method: String,
    pub charge: u8,
    /// As written in the input
    pub precursor_mz: String,
    pub del_m: f64,
    pub del_m_ppm: f64,
    pub mh: f64,
    /// Peptide with prefix, suffix and modification symbols
    pub peptide: String,
    pub clean_sequence: String,
    pub total_mod_mass: f64,
    pub protein: String,
    pub ntt: u8,
    pub de_novo_score: String,
    pub msgf_score: String,
    pub spec_evalue: Score,
    pub evalue: Score,
    /// QValue, FDR or EFDR, depending on the schema
    pub qvalue: Option<Score>,
    pub pep_qvalue: Option<Score>,
    pub isotope_error: String,
    pub ims_scan: String,
    pub ims_drift_time: String,
    pub rank: u32,
    pub scan_group: usize,
    pub modifications: Vec<AppliedModification>,
    pub unresolved_mods: bool,
}

impl Hit for MsgfResult {
    fn scan(&self) -> u32 {
        self.scan
    }

    fn charge(&self) -> u8 {
        self.charge
    }

    fn primary(&self) -> f64 {
        self.spec_evalue.value
    }

    fn secondary(&self) -> f64 {
        self.evalue.value
    }

    fn fdr(&self) -> Option<f64> {
        self.qvalue.as_ref().map(|q| q.value)
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

/// A protein from the `Protein` column, with the residues flanking the
/// peptide in that protein when MS-GF+ reports them
#[derive(Clone, Debug, PartialEq)]
pub struct ProteinHit {
    pub name: String,
    pub prefix: Option<char>,
    pub suffix: Option<char>,
}

pub struct MsgfParser<'a> {
    columns: ColumnMap<MsgfColumn>,
    schema: MsgfSchema,
    resolver: ModTextResolver<'a>,
    calc: &'a SequenceMassCalculator,
    enzyme: Enzyme,
    settings: ParserSettings,
    protein_context: Regex,
    warnings: ResolverWarnings,
    untrusted_ppm: WarningLimiter,
    scan_groups: ScanGroups,
    numeric_mod_errors: usize,
}

impl<'a> MsgfParser<'a> {
    pub fn new(
        header: &StringRecord,
        catalog: &'a ModificationCatalog,
        calc: &'a SequenceMassCalculator,
        settings: ParserSettings,
    ) -> Self {
        let columns = ColumnMap::from_header(header);
        for name in columns.unknown() {
            log::warn!("unrecognized MS-GF+ column `{}`", name);
        }
        let schema = MsgfSchema::from_columns(&columns);
        log::trace!("{:?}", schema);

        MsgfParser {
            columns,
            schema,
            resolver: ModTextResolver::with_tolerance(catalog, settings.mod_mass_tolerance),
            calc,
            enzyme: Enzyme::trypsin(),
            settings,
            protein_context: Regex::new(r"^(.+)\(pre=(.),post=(.)\)$").expect("valid regex"),
            warnings: ResolverWarnings::default(),
            untrusted_ppm: WarningLimiter::periodic(5, 1000),
            scan_groups: ScanGroups::default(),
            numeric_mod_errors: 0,
        }
    }

    pub fn schema(&self) -> MsgfSchema {
        self.schema
    }

    pub fn columns(&self) -> &ColumnMap<MsgfColumn> {
        &self.columns
    }

    /// Split a `;`-separated protein list, keeping the first occurrence of
    /// each protein
    pub fn parse_proteins(&self, field: &str) -> Vec<ProteinHit> {
        let mut proteins: Vec<ProteinHit> = Vec::new();
        for entry in field.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let hit = match self.protein_context.captures(entry) {
                Some(caps) => ProteinHit {
                    name: truncate_protein_name(&caps[1]).to_string(),
                    prefix: caps[2].chars().next(),
                    suffix: caps[3].chars().next(),
                },
                None => ProteinHit {
                    name: truncate_protein_name(entry).to_string(),
                    prefix: None,
                    suffix: None,
                },
            };
            if !proteins.iter().any(|p| p.name == hit.name) {
                proteins.push(hit);
            }
        }
        proteins
    }

    fn corrected_ppm(&self, del_m: f64, mono: f64, isotope_error: Option<i32>) -> f64 {
        match self.settings.c13_correction {
            true => c13_corrected_ppm(del_m, mono, isotope_error),
            false => mass_to_ppm(del_m, mono),
        }
    }

    /// Precursor mass error as (Da, ppm), observed minus theoretical.
    ///
    /// A ppm value larger than 1.5x the search tolerance cannot be right and
    /// is replaced by the difference between the precursor and peptide
    /// masses.
    fn reconcile(
        &mut self,
        precursor_mz: f64,
        charge: u8,
        mono: f64,
        reported: ReportedError,
        peptide: &str,
    ) -> (f64, f64) {
        let precursor = self.calc.convolute_mass(precursor_mz, charge, 0);
        match reported {
            ReportedError::Ppm { ppm, isotope_error } => {
                let del_m = ppm_to_mass(ppm, mono);
                let limit = 1.5 * self.settings.precursor_tol.max_da(mono);
                if del_m.abs() <= limit {
                    let isotopes = isotope_error.unwrap_or(0) as f64 * C13_DELTA;
                    return (del_m + isotopes, ppm);
                }
                if self.untrusted_ppm.hit() {
                    log::warn!(
                        "precursor error of {} ppm for {} exceeds 1.5x {}; recomputing from the precursor m/z",
                        ppm,
                        peptide,
                        self.settings.precursor_tol
                    );
                }
                let del_m = precursor - mono;
                (del_m, self.corrected_ppm(del_m, mono, isotope_error))
            }
            ReportedError::Da { da, isotope_error } => {
                (da, self.corrected_ppm(da, mono, isotope_error))
            }
            ReportedError::None { isotope_error } => {
                let del_m = precursor - mono;
                (del_m, self.corrected_ppm(del_m, mono, isotope_error))
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum ReportedError {
    Ppm { ppm: f64, isotope_error: Option<i32> },
    Da { da: f64, isotope_error: Option<i32> },
    None { isotope_error: Option<i32> },
}

impl<'a> ResultParser for MsgfParser<'a> {
    type Output = MsgfResult;

    fn parse_row(&mut self, record: &StringRecord) -> Result<Vec<MsgfResult>, RowError> {
        use MsgfColumn::*;

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
        let peptide = col
            .get(record, Peptide)
            .filter(|s| !s.is_empty())
            .ok_or(RowError::MissingField("Peptide"))?;
        let protein_field = col
            .get(record, Protein)
            .filter(|s| !s.is_empty())
            .ok_or(RowError::MissingField("Protein"))?;

        // Merged spectra: scan, spectrum index and fragmentation method are
        // all `/`-delimited in parallel
        let spec_ids = split_merged(col.text(record, SpecIndex));
        let frag_methods = split_merged(col.text(record, FragMethod));
        let mut scans = Vec::new();
        for (ix, part) in split_merged(col.text(record, Scan)).into_iter().enumerate() {
            let scan = part
                .parse::<i64>()
                .ok()
                .and_then(|scan| u32::try_from(scan).ok())
                .or_else(|| scan_from_spec_id(merged_part(&spec_ids, ix)))
                .ok_or_else(|| RowError::InvalidNumber {
                    field: "Scan",
                    value: part.to_string(),
                })?;
            scans.push(scan);
        }
        let scan_group = self.scan_groups.assign(&scans, charge);

        let isotope_text = col.text(record, IsotopeError);
        let isotope_error = isotope_text.parse::<i32>().ok();
        let reported = if let Some(ppm) = col.get(record, PrecursorErrorPpm) {
            ReportedError::Ppm {
                ppm: parse_or_zero(ppm),
                isotope_error,
            }
        } else if let Some(da) = col.get(record, PrecursorErrorDa) {
            ReportedError::Da {
                da: parse_or_zero(da),
                isotope_error,
            }
        } else {
            ReportedError::None { isotope_error }
        };

        let precursor_text = col.text(record, Precursor);
        let precursor_mz = parse_or_zero(precursor_text);
        let (qvalue, pep_qvalue) = match self.schema.fdr {
            FdrColumns::QValue | FdrColumns::Fdr => (
                Some(Score::parse(col.text(record, QValue))),
                Some(Score::parse(col.text(record, PepQValue))),
            ),
            FdrColumns::Efdr => (Some(Score::parse(col.text(record, Efdr))), None),
            FdrColumns::None => (None, None),
        };

        let spectrum_file = col.text(record, SpectrumFile).to_string();
        let de_novo_score = col.text(record, DeNovoScore).to_string();
        let msgf_score = col.text(record, MsgfScore).to_string();
        let spec_evalue = Score::parse(col.text(record, SpecEValue));
        let evalue = Score::parse(col.text(record, EValue));
        let ims_scan = col.text(record, ImsScan).to_string();
        let ims_drift_time = col.text(record, ImsDriftTime).to_string();

        let (token_prefix, primary, token_suffix) = split_prefix_suffix(peptide);
        let proteins = self.parse_proteins(protein_field);

        let mut unresolved = false;
        let mut results = Vec::with_capacity(proteins.len() * scans.len());
        for protein in proteins {
            let token = match (protein.prefix.or(token_prefix), protein.suffix.or(token_suffix)) {
                (Some(p), Some(s)) => format!("{}.{}.{}", p, primary, s),
                _ => primary.to_string(),
            };
            let resolved = self.resolver.resolve_mass_deltas(&token, &mut self.warnings);
            unresolved |= !resolved.success();

            let mono = self
                .calc
                .sequence_mass(&resolved.clean_sequence)
                .map_err(|e| RowError::UnknownResidue {
                    residue: e.0,
                    peptide: peptide.to_string(),
                })?
                + resolved.total_mod_mass;
            let mh = self.calc.convolute_mass(mono, 0, 1);
            let (del_m, del_m_ppm) = self.reconcile(precursor_mz, charge, mono, reported, peptide);
            let ntt = self.enzyme.cleavage_state(
                resolved.prefix,
                &resolved.clean_sequence,
                resolved.suffix,
            );
            let peptide = resolved.peptide();

            for (ix, &scan) in scans.iter().enumerate() {
                results.push(MsgfResult {
                    spectrum_file: spectrum_file.clone(),
                    scan,
                    spec_index: normalize_spec_index(merged_part(&spec_ids, ix)).to_string(),
                    frag_method: merged_part(&frag_methods, ix).to_string(),
                    charge,
                    precursor_mz: precursor_text.to_string(),
                    del_m,
                    del_m_ppm,
                    mh,
                    peptide: peptide.clone(),
                    clean_sequence: resolved.clean_sequence.clone(),
                    total_mod_mass: resolved.total_mod_mass,
                    protein: protein.name.clone(),
                    ntt,
                    de_novo_score: de_novo_score.clone(),
                    msgf_score: msgf_score.clone(),
                    spec_evalue: spec_evalue.clone(),
                    evalue: evalue.clone(),
                    qvalue: qvalue.clone(),
                    pep_qvalue: pep_qvalue.clone(),
                    isotope_error: isotope_text.to_string(),
                    ims_scan: ims_scan.clone(),
                    ims_drift_time: ims_drift_time.clone(),
                    rank: 0,
                    scan_group,
                    modifications: resolved.modifications.clone(),
                    unresolved_mods: !resolved.success(),
                });
            }
        }

        if unresolved {
            self.numeric_mod_errors += 1;
        }
        Ok(results)
    }

    fn scan_groups(&self) -> &ScanGroups {
        &self.scan_groups
    }

    fn numeric_mod_errors(&self) -> usize {
        self.numeric_mod_errors
    }

    fn suppressed_warnings(&self) -> usize {
        self.untrusted_ppm.suppressed() + self.warnings.unresolved_mass.suppressed()
    }
}
