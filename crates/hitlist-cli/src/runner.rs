use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use hitlist_core::columns::tsv_reader;
use hitlist_core::fasta::Fasta;
use hitlist_core::mass::SequenceMassCalculator;
use hitlist_core::modification::ModificationCatalog;
use hitlist_core::msgf::MsgfParser;
use hitlist_core::ranking::{assign_ranks, first_hits, synopsis};
use hitlist_core::throttle::BoundedLog;
use hitlist_core::toppic::ToppicParser;
use hitlist_core::{ResultParser, Tool};
use log::info;
use serde::Serialize;

use super::input::Search;
use super::output::Tabular;

/// Row errors kept per input file
const MAX_ROW_ERRORS: usize = 255;

/// Progress is logged every 10% of the input, but not more often than this
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

pub struct Runner {
    pub parameters: Search,
    catalog: ModificationCatalog,
    calc: SequenceMassCalculator,
    fasta: Option<Fasta>,
    abort: Arc<AtomicBool>,
    start: Instant,
}

/// Outcome of processing one input file
#[derive(Serialize, Debug, Clone, Default)]
pub struct FileSummary {
    pub input: String,
    pub tool: Option<Tool>,
    /// `false` if the file could not be read, a row was rejected, or the run
    /// was aborted
    pub success: bool,
    pub message: String,
    pub results: usize,
    pub synopsis: usize,
    pub first_hits: usize,
    pub rejected_rows: usize,
    pub numeric_mod_errors: usize,
}

impl FileSummary {
    fn failed(input: &str, error: &anyhow::Error) -> Self {
        FileSummary {
            input: input.into(),
            success: false,
            message: format!("{:#}", error),
            ..Default::default()
        }
    }
}

struct Progress {
    total: usize,
    next_decile: usize,
    last: Instant,
}

impl Progress {
    fn new(total: usize) -> Self {
        Progress {
            total,
            next_decile: 1,
            last: Instant::now(),
        }
    }

    fn update(&mut self, consumed: usize, path: &str) {
        if self.total == 0 || consumed * 10 < self.next_decile * self.total {
            return;
        }
        let decile = consumed * 10 / self.total;
        self.next_decile = decile + 1;
        if self.last.elapsed() >= PROGRESS_INTERVAL {
            self.last = Instant::now();
            info!("- {}: {}% read", path, decile * 10);
        }
    }
}

impl Runner {
    pub fn new(parameters: Search) -> anyhow::Result<Self> {
        let start = Instant::now();

        let mut catalog = ModificationCatalog::from_maps(
            Some(parameters.static_mods.clone()),
            Some(parameters.variable_mods.clone()),
        );
        let mut calc =
            SequenceMassCalculator::default().with_charge_carrier(parameters.charge_carrier_mass);
        if let Some(msgf) = &parameters.msgf_parameters {
            if let Some(n) = msgf.num_mods {
                log::trace!("MS-GF+ parameters allow {} modifications per peptide", n);
            }
            msgf.register(&mut catalog, &mut calc);
        }
        info!("using {} modification definitions", catalog.len());
        for (ix, def) in catalog.iter().enumerate() {
            log::trace!(
                "- {}: {} {} {:+} on `{}` ({})",
                ix,
                def.symbol.unwrap_or('-'),
                def.name,
                def.mass,
                def.residues_str(),
                def.kind
            );
        }

        let fasta = match &parameters.fasta {
            Some(path) => {
                let fasta = hitlist_core::read_fasta(path)
                    .with_context(|| format!("Failed to read FASTA from `{}`", path))?;
                info!("read {} proteins from {}", fasta.len(), path);
                Some(fasta)
            }
            None => None,
        };

        Ok(Self {
            parameters,
            catalog,
            calc,
            fasta,
            abort: Arc::new(AtomicBool::new(false)),
            start,
        })
    }

    /// Flag that stops the read loop of the current file when set
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    pub fn catalog(&self) -> &ModificationCatalog {
        &self.catalog
    }

    // Create a path for `file_name` in the specified output directory
    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }

    pub fn run(mut self) -> anyhow::Result<Search> {
        let paths = self.parameters.input_paths.clone();
        for path in &paths {
            let start = Instant::now();
            let summary = match self.process_file(path) {
                Ok(summary) => summary,
                Err(e) => {
                    log::error!("- {}: {:#}", path, e);
                    FileSummary::failed(path, &e)
                }
            };
            info!(
                "- {}: {} results, {} in synopsis, {} first hits in {:#?}",
                path,
                summary.results,
                summary.synopsis,
                summary.first_hits,
                start.elapsed()
            );
            self.parameters.files.push(summary);
            if self.abort.load(Ordering::Relaxed) {
                log::warn!("aborted, skipping remaining input files");
                break;
            }
        }

        let path = self.make_path("results.json");
        self.parameters.output_paths.push(path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&self.parameters)?);

        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)?;

        info!("finished in {}s", self.start.elapsed().as_secs());
        Ok(self.parameters)
    }

    fn process_file(&mut self, path: &str) -> anyhow::Result<FileSummary> {
        let total = std::fs::metadata(path)
            .with_context(|| format!("Failed to read results from `{}`", path))?
            .len() as usize;
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to read results from `{}`", path))?;
        let mut reader = tsv_reader(file);
        let header = reader
            .headers()
            .with_context(|| format!("Failed to read the header of `{}`", path))?
            .clone();
        if header.iter().all(|field| field.trim().is_empty()) {
            anyhow::bail!("`{}` is empty", path);
        }

        let tool = match self.parameters.tool.or_else(|| Tool::detect(&header)) {
            Some(tool) => tool,
            None => {
                let names = header.iter().collect::<Vec<_>>().join("\t");
                return Err(hitlist_core::Error::Header(names).into());
            }
        };
        info!("- {}: reading {} results", path, tool);

        let settings = self.parameters.parser_settings();
        let (summary, written) = match tool {
            Tool::MsgfPlus => {
                let parser = MsgfParser::new(&header, &self.catalog, &self.calc, settings);
                let schema = parser.schema();
                self.process(parser, &schema, reader, total, path, tool)?
            }
            Tool::TopPic => {
                let parser = ToppicParser::new(&header, &self.catalog, &self.calc, settings);
                let schema = parser.schema();
                self.process(parser, &schema, reader, total, path, tool)?
            }
        };
        self.parameters.output_paths.extend(written);
        Ok(summary)
    }

    /// Parse, rank, filter and write one file. Returns the summary and the
    /// paths written.
    fn process<P, R>(
        &self,
        mut parser: P,
        schema: &<P::Output as Tabular>::Schema,
        mut reader: csv::Reader<R>,
        total: usize,
        path: &str,
        tool: Tool,
    ) -> anyhow::Result<(FileSummary, Vec<String>)>
    where
        P: ResultParser,
        P::Output: Tabular,
        R: std::io::Read,
    {
        let mut results = Vec::new();
        let mut errors = BoundedLog::new(MAX_ROW_ERRORS);
        let mut progress = Progress::new(total);
        let mut record = csv::StringRecord::new();
        let mut aborted = false;

        loop {
            if self.abort.load(Ordering::Relaxed) {
                log::warn!("- {}: aborted at line {}", path, reader.position().line());
                aborted = true;
                break;
            }
            match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    let (line, byte) = record
                        .position()
                        .map(|pos| (pos.line(), pos.byte() as usize))
                        .unwrap_or_default();
                    progress.update(byte, path);
                    if record.iter().all(|field| field.trim().is_empty()) {
                        continue;
                    }
                    match parser.parse_row(&record) {
                        Ok(rows) => results.extend(rows),
                        Err(e) => {
                            log::debug!("- {}: line {}: {}", path, line, e);
                            errors.push(format!("line {}: {}", line, e));
                        }
                    }
                }
                Err(e) => {
                    if let csv::ErrorKind::Io(_) = e.kind() {
                        return Err(e).with_context(|| format!("Failed to read `{}`", path));
                    }
                    let line = e.position().map(|pos| pos.line()).unwrap_or_default();
                    log::debug!("- {}: line {}: {}", path, line, e);
                    errors.push(format!("line {}: {}", line, e));
                }
            }
        }
        progress.update(total, path);

        if parser.suppressed_warnings() > 0 {
            info!(
                "- {}: {} repeated warnings suppressed",
                path,
                parser.suppressed_warnings()
            );
        }
        if !errors.is_empty() {
            log::warn!("- {}: skipped {} invalid rows", path, errors.len());
        }
        if parser.numeric_mod_errors() > 0 {
            log::warn!(
                "- {}: {} rows contain modification masses without a matching definition",
                path,
                parser.numeric_mod_errors()
            );
        }

        assign_ranks(&mut results);
        let thresholds = self.parameters.synopsis.thresholds(tool);
        let synopsis = synopsis(&results, &thresholds);
        let first_hits = first_hits(&results, |protein| {
            self.fasta.as_ref().and_then(|f| f.ordinal(protein))
        });

        let base = base_name(path);
        let mut written = Vec::new();
        if self.parameters.write_synopsis {
            written.push(self.write_results(&format!("{}_syn.txt", base), &synopsis, schema)?);
        }
        if self.parameters.write_first_hits {
            written.push(self.write_results(&format!("{}_fht.txt", base), &first_hits, schema)?);
        }
        if parser.scan_groups().has_merged() {
            written.push(
                self.write_scan_groups(&format!("{}_ScanGroupInfo.txt", base), parser.scan_groups())?,
            );
        }
        if self.parameters.write_mod_summary {
            written.push(self.write_mod_summary(
                &format!("{}_ModSummary.txt", base),
                &self.catalog,
                &synopsis,
            )?);
        }

        let mut message = errors.messages().join("\n");
        if errors.dropped() > 0 {
            message.push_str(&format!("\n... and {} more", errors.dropped()));
        }
        if aborted {
            message = match message.is_empty() {
                true => "aborted".into(),
                false => format!("aborted\n{}", message),
            };
        }

        let summary = FileSummary {
            input: path.into(),
            tool: Some(tool),
            success: errors.is_empty() && !aborted,
            message,
            results: results.len(),
            synopsis: synopsis.len(),
            first_hits: first_hits.len(),
            rejected_rows: errors.len(),
            numeric_mod_errors: parser.numeric_mod_errors(),
        };
        Ok((summary, written))
    }
}

/// File name without directories and without its last extension
fn base_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
