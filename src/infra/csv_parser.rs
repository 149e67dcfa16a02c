use crate::app::ports::RecordParserPort;
use crate::constants::{CENSUS_HEADER, DOB_FORMATS};
use crate::types::PersonRow;
use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvCensusRecord {
    first_name: String,
    last_name: String,
    email: String,
    gender: String,
    dob: String,
    state: String,
}

/// Census parser for comma-delimited text with a named header row
#[derive(Debug, Default, Clone)]
pub struct CsvRecordParser;

impl CsvRecordParser {
    pub fn new() -> Self {
        Self
    }
}

pub fn parse_dob(raw: &str) -> anyhow::Result<NaiveDate> {
    DOB_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| anyhow!("unrecognized date of birth '{}'", raw))
}

impl RecordParserPort for CsvRecordParser {
    fn parse(&self, source: &str) -> anyhow::Result<Vec<PersonRow>> {
        let source = source.trim_start_matches('\u{feff}');
        if source.trim().is_empty() {
            bail!("census file is empty");
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(source.as_bytes());

        let headers = reader.headers().context("reading census header")?.clone();
        let missing: Vec<&str> = CENSUS_HEADER
            .iter()
            .copied()
            .filter(|name| !headers.iter().any(|h| h == *name))
            .collect();
        if !missing.is_empty() {
            bail!("census header is missing columns: {}", missing.join(", "));
        }

        let mut rows = Vec::new();
        for (index, record) in reader.deserialize::<CsvCensusRecord>().enumerate() {
            // Header is line 1
            let line = index + 2;
            let record = record.with_context(|| format!("malformed census line {line}"))?;
            let dob = parse_dob(&record.dob).with_context(|| format!("census line {line}"))?;
            rows.push(PersonRow {
                first_name: record.first_name,
                last_name: record.last_name,
                email: record.email,
                gender: record.gender,
                dob,
                state: record.state,
            });
        }

        if rows.is_empty() {
            bail!("census file has a header but no data rows");
        }
        debug!(rows = rows.len(), "Parsed census CSV");
        Ok(rows)
    }
}
