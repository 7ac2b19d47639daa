//! Delimited-text reading with header lookup by name.

use std::collections::HashMap;

use csv::StringRecord;

use crate::error::IngestError;

const BOM: char = '\u{feff}';

/// A parsed export: normalized header names plus the raw records.
#[derive(Debug)]
pub struct RawTable {
    columns: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl RawTable {
    /// Parse `text`, sniffing the delimiter from its first line: a tab makes
    /// it TSV, anything else is read as CSV.
    pub fn parse(text: &str) -> Result<Self, IngestError> {
        let text = text.strip_prefix(BOM).unwrap_or(text);
        if text.trim().is_empty() {
            return Err(IngestError::Unreadable("report is empty".to_string()));
        }

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(text))
            .flexible(true)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let mut columns = HashMap::new();
        for (index, header) in rdr.headers()?.iter().enumerate() {
            columns.entry(header_key(header)).or_insert(index);
        }

        let records = rdr.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns, records })
    }

    /// Required headers with no matching column, in the order given.
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|header| !self.columns.contains_key(&header_key(header)))
            .map(|header| header.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.records.iter().map(move |record| RawRow {
            table: self,
            record,
        })
    }
}

pub struct RawRow<'a> {
    table: &'a RawTable,
    record: &'a StringRecord,
}

impl<'a> RawRow<'a> {
    /// Trimmed cell under `header`; empty when the column or cell is absent.
    pub fn get(&self, header: &str) -> &'a str {
        self.table
            .columns
            .get(&header_key(header))
            .and_then(|index| self.record.get(*index))
            .map(str::trim)
            .unwrap_or("")
    }
}

fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

fn header_key(header: &str) -> String {
    header.trim().trim_start_matches(BOM).to_lowercase()
}
