//! Mapping of header names to logical columns
//!
//! Search engines rename their columns between versions (`SpecProb` became
//! `SpecEValue`, `FDR` became `QValue`, ...). Each tool lists the names it
//! accepts for every logical column; the map is built once from the header
//! line and never changes afterwards.

use std::fmt::Debug;
use std::hash::Hash;

use csv::StringRecord;
use fnv::FnvHashMap;

pub trait Column: Copy + Eq + Hash + Debug + 'static {
    /// Accepted header names for each logical column
    fn synonyms() -> &'static [(Self, &'static [&'static str])];

    /// Key used to compare header names. Case-insensitive by default.
    fn normalize(name: &str) -> String {
        name.trim().to_ascii_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct ColumnMap<C: Column> {
    indices: FnvHashMap<C, usize>,
    names: Vec<String>,
    unknown: Vec<String>,
}

impl<C: Column> ColumnMap<C> {
    pub fn from_header(header: &StringRecord) -> Self {
        let mut lookup = FnvHashMap::default();
        for (column, names) in C::synonyms() {
            for name in names.iter() {
                lookup.insert(C::normalize(name), *column);
            }
        }

        let mut indices = FnvHashMap::default();
        let mut unknown = Vec::new();
        let names = header
            .iter()
            .map(|s| s.trim().to_string())
            .collect::<Vec<_>>();

        for (ix, name) in names.iter().enumerate() {
            match lookup.get(&C::normalize(name)) {
                Some(column) => {
                    // First occurrence wins
                    indices.entry(*column).or_insert(ix);
                }
                None if name.is_empty() => {}
                None => unknown.push(name.clone()),
            }
        }

        ColumnMap {
            indices,
            names,
            unknown,
        }
    }

    pub fn index(&self, column: C) -> Option<usize> {
        self.indices.get(&column).copied()
    }

    pub fn contains(&self, column: C) -> bool {
        self.indices.contains_key(&column)
    }

    /// Header name as it was written in the file
    pub fn header_name(&self, column: C) -> Option<&str> {
        self.index(column).map(|ix| self.names[ix].as_str())
    }

    /// Header columns that did not match any known name
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    /// Trimmed value of `column` in a record; missing columns and short
    /// records both yield `None`
    pub fn get<'a>(&self, record: &'a StringRecord, column: C) -> Option<&'a str> {
        self.index(column)
            .and_then(|ix| record.get(ix))
            .map(|s| s.trim())
    }

    /// Like [`ColumnMap::get`], but absent values are empty strings
    pub fn text<'a>(&self, record: &'a StringRecord, column: C) -> &'a str {
        self.get(record, column).unwrap_or_default()
    }
}

/// Reader for tab-delimited search results. Quotes are ordinary characters
/// and records may be shorter or longer than the header.
pub fn tsv_reader<R: std::io::Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(rdr)
}

/// A score column, kept as written and as a number.
///
/// Unparsable values become 0 rather than rejecting the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    pub text: String,
    pub value: f64,
}

impl Score {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        Score {
            text: text.to_string(),
            value: parse_or_zero(text),
        }
    }
}

pub fn parse_or_zero(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(0.0)
}
