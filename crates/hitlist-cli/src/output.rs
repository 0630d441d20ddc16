use csv::ByteRecord;
use hitlist_core::columns::Score;
use hitlist_core::modification::ModificationCatalog;
use hitlist_core::msgf::{FdrColumns, MsgfResult, MsgfSchema};
use hitlist_core::ranking::Hit;
use hitlist_core::scans::ScanGroups;
use hitlist_core::toppic::{ToppicResult, ToppicSchema};

use crate::Runner;

/// A search result that can be written as one row of a synopsis or
/// first-hits file
pub trait Tabular: Hit + Clone {
    /// Columns present in the input, which decide the output columns
    type Schema: Copy;

    fn header(schema: &Self::Schema) -> Vec<&'static str>;

    fn serialize(&self, result_id: usize, schema: &Self::Schema) -> ByteRecord;
}

fn fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

impl Tabular for MsgfResult {
    type Schema = MsgfSchema;

    fn header(schema: &MsgfSchema) -> Vec<&'static str> {
        schema.header()
    }

    fn serialize(&self, result_id: usize, schema: &MsgfSchema) -> ByteRecord {
        let mut record = ByteRecord::new();
        record.push_field(itoa::Buffer::new().format(result_id).as_bytes());
        record.push_field(itoa::Buffer::new().format(self.scan).as_bytes());
        record.push_field(self.frag_method.as_bytes());
        record.push_field(self.spec_index.as_bytes());
        record.push_field(itoa::Buffer::new().format(self.charge).as_bytes());
        record.push_field(self.precursor_mz.as_bytes());
        record.push_field(fixed(self.del_m, 5).as_bytes());
        record.push_field(fixed(self.del_m_ppm, 4).as_bytes());
        record.push_field(fixed(self.mh, 5).as_bytes());
        record.push_field(self.peptide.as_bytes());
        record.push_field(self.protein.as_bytes());
        record.push_field(itoa::Buffer::new().format(self.ntt).as_bytes());
        record.push_field(self.de_novo_score.as_bytes());
        record.push_field(self.msgf_score.as_bytes());
        record.push_field(self.spec_evalue.text.as_bytes());
        record.push_field(itoa::Buffer::new().format(self.rank).as_bytes());
        record.push_field(self.evalue.text.as_bytes());

        let text = |score: &Option<Score>| {
            score.as_ref().map(|s| s.text.clone()).unwrap_or_default()
        };
        match schema.fdr {
            FdrColumns::QValue | FdrColumns::Fdr => {
                record.push_field(text(&self.qvalue).as_bytes());
                record.push_field(text(&self.pep_qvalue).as_bytes());
            }
            FdrColumns::Efdr => record.push_field(text(&self.qvalue).as_bytes()),
            FdrColumns::None => {}
        }
        if schema.isotope_error {
            record.push_field(self.isotope_error.as_bytes());
        }
        if schema.ims {
            record.push_field(self.ims_scan.as_bytes());
            record.push_field(self.ims_drift_time.as_bytes());
        }
        record
    }
}

impl Tabular for ToppicResult {
    type Schema = ToppicSchema;

    fn header(schema: &ToppicSchema) -> Vec<&'static str> {
        schema.header()
    }

    fn serialize(&self, result_id: usize, schema: &ToppicSchema) -> ByteRecord {
        let mut record = ByteRecord::new();
        record.push_field(itoa::Buffer::new().format(result_id).as_bytes());
        record.push_field(itoa::Buffer::new().format(self.scan).as_bytes());
        record.push_field(self.prsm_id.as_bytes());
        record.push_field(self.spectrum_id.as_bytes());
        record.push_field(self.frag_method.as_bytes());
        record.push_field(itoa::Buffer::new().format(self.charge).as_bytes());
        record.push_field(fixed(self.precursor_mz, 5).as_bytes());
        record.push_field(fixed(self.del_m, 5).as_bytes());
        record.push_field(fixed(self.del_m_ppm, 4).as_bytes());
        record.push_field(fixed(self.mh, 5).as_bytes());
        record.push_field(self.peptide.as_bytes());
        record.push_field(self.proteoform_id.as_bytes());
        record.push_field(self.feature_intensity.as_bytes());
        record.push_field(self.feature_score.as_bytes());
        record.push_field(self.protein.as_bytes());
        record.push_field(self.residue_start.as_bytes());
        record.push_field(self.residue_end.as_bytes());
        record.push_field(self.unexpected_mod_count.as_bytes());
        record.push_field(self.peak_count.as_bytes());
        record.push_field(self.matched_peak_count.as_bytes());
        record.push_field(self.matched_fragment_ion_count.as_bytes());
        record.push_field(self.pvalue.text.as_bytes());
        record.push_field(itoa::Buffer::new().format(self.rank).as_bytes());
        record.push_field(self.evalue.text.as_bytes());
        record.push_field(self.qvalue.text.as_bytes());
        record.push_field(self.proteoform_qvalue.text.as_bytes());
        if schema.miscore {
            record.push_field(self.miscore.as_bytes());
        }
        if schema.variable_ptms {
            record.push_field(self.variable_ptms.as_bytes());
        }
        record
    }
}

impl Runner {
    fn write_records<I>(&self, file_name: &str, header: Vec<&str>, records: I) -> anyhow::Result<String>
    where
        I: IntoIterator<Item = ByteRecord>,
    {
        let path = self.make_path(file_name);

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        wtr.write_byte_record(&ByteRecord::from(header))?;
        for record in records {
            wtr.write_byte_record(&record)?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }

    /// Write synopsis or first-hits rows; result IDs start at 1
    pub fn write_results<R: Tabular>(
        &self,
        file_name: &str,
        results: &[R],
        schema: &R::Schema,
    ) -> anyhow::Result<String> {
        self.write_records(
            file_name,
            R::header(schema),
            results
                .iter()
                .enumerate()
                .map(|(ix, result)| result.serialize(ix + 1, schema)),
        )
    }

    pub fn write_scan_groups(&self, file_name: &str, groups: &ScanGroups) -> anyhow::Result<String> {
        self.write_records(
            file_name,
            vec!["Scan_Group_ID", "Charge", "Scan"],
            groups.members().iter().map(|member| {
                let mut record = ByteRecord::new();
                record.push_field(itoa::Buffer::new().format(member.group).as_bytes());
                record.push_field(itoa::Buffer::new().format(member.charge).as_bytes());
                record.push_field(itoa::Buffer::new().format(member.scan).as_bytes());
                record
            }),
        )
    }

    /// One row per catalog definition used by at least one written result
    pub fn write_mod_summary<R: Hit>(
        &self,
        file_name: &str,
        catalog: &ModificationCatalog,
        results: &[R],
    ) -> anyhow::Result<String> {
        let counts = catalog.usage_counts(
            results
                .iter()
                .flat_map(|r| r.modifications().iter().map(|m| m.definition)),
        );

        self.write_records(
            file_name,
            vec![
                "Modification_Symbol",
                "Modification_Mass",
                "Target_Residues",
                "Modification_Type",
                "Mass_Correction_Tag",
                "Occurrence_Count",
            ],
            catalog
                .iter()
                .zip(counts)
                .filter(|(_, count)| *count > 0)
                .map(|(definition, count)| {
                    let mut symbol = [0u8; 4];
                    let mut record = ByteRecord::new();
                    record.push_field(match definition.symbol {
                        Some(c) => c.encode_utf8(&mut symbol).as_bytes(),
                        None => "-".as_bytes(),
                    });
                    record.push_field(ryu::Buffer::new().format(definition.mass).as_bytes());
                    record.push_field(definition.residues_str().as_bytes());
                    record.push_field(definition.kind.to_string().as_bytes());
                    record.push_field(definition.name.as_bytes());
                    record.push_field(itoa::Buffer::new().format(count).as_bytes());
                    record
                }),
        )
    }
}
