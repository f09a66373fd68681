//! Tabular mode: uploaded resource estimates in, migration import CSV out.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use poegen_utils::error::RenderError;
use poegen_utils::types::ResourceEstimate;

use crate::diagram::strip_code_fence;

/// Columns used when no migration header template is configured: the
/// leading columns of the Azure Migrate server import template.
pub const DEFAULT_HEADER: &[&str] = &[
    "*Server name",
    "IP addresses",
    "*Cores",
    "*Memory (In MB)",
    "*OS name",
    "OS version",
    "OS architecture",
    "Server type",
    "CPU utilization percentage",
    "Memory utilization percentage",
    "Number of disks",
    "Disk 1 size (In GB)",
    "Disk 1 read throughput (MB per second)",
    "Disk 1 write throughput (MB per second)",
    "Disk 1 read ops (operations per second)",
    "Disk 1 write ops (operations per second)",
    "Number of NICs",
    "Network In throughput",
    "Network Out throughput",
    "Boot type",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One input row the model mapped to a source-server record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRecord {
    /// Row number of the estimate this record was inferred from.
    pub row: usize,
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
    row: usize,
    #[serde(default)]
    record: Option<serde_json::Map<String, Value>>,
}

#[must_use]
pub fn default_header() -> Vec<String> {
    DEFAULT_HEADER.iter().map(|c| (*c).to_string()).collect()
}

/// Parse an uploaded estimate sheet exported as CSV.
///
/// Blank lines are skipped; rows are numbered from 1 in file order.
///
/// # Errors
///
/// Returns `RenderError::InvalidUpload` if the file is not CSV, has no
/// header row or has no data rows.
pub fn parse_estimates(bytes: &[u8]) -> Result<Vec<ResourceEstimate>, RenderError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let invalid = |reason: String| RenderError::InvalidUpload { reason };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| invalid(e.to_string()))?
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if name.is_empty() {
                format!("Column {}", index + 1)
            } else {
                name.to_string()
            }
        })
        .collect();
    if headers.iter().all(|h| h.starts_with("Column ")) {
        return Err(invalid("no header row".to_string()));
    }

    let mut estimates = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| invalid(e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        estimates.push(ResourceEstimate {
            row: estimates.len() + 1,
            fields,
        });
    }

    if estimates.is_empty() {
        return Err(invalid("no data rows".to_string()));
    }
    Ok(estimates)
}

/// Column names from the first line of a header template CSV.
///
/// Cells are kept verbatim, padding and empty columns included, so the
/// merged CSV reproduces the template's first line.
///
/// # Errors
///
/// Returns `RenderError::Csv` if the file is not CSV or has no columns.
pub fn parse_header(bytes: &[u8]) -> Result<Vec<String>, RenderError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let first = reader
        .records()
        .next()
        .transpose()
        .map_err(|e| RenderError::Csv(e.to_string()))?
        .ok_or_else(|| RenderError::Csv("header template is empty".to_string()))?;
    let columns: Vec<String> = first.iter().map(str::to_string).collect();
    if columns.iter().all(|c| c.trim().is_empty()) {
        return Err(RenderError::Csv("header template has no columns".to_string()));
    }
    Ok(columns)
}

/// Parse the model's row mapping against the uploaded estimates.
///
/// Returns the records in input order and the number of input rows that
/// produced no record (declined with `null` or left out). Row numbers that
/// match no input row are ignored; for repeated row numbers the first entry
/// wins.
///
/// # Errors
///
/// Returns `RenderError::InvalidMapping` carrying the raw answer when it is
/// not a JSON array of `{"row", "record"}` objects.
pub fn parse_mapped_records(
    raw: &str,
    estimates: &[ResourceEstimate],
) -> Result<(Vec<MappedRecord>, usize), RenderError> {
    let entries = parse_entries(raw).map_err(|reason| RenderError::InvalidMapping {
        reason,
        raw: raw.to_string(),
    })?;

    let mut by_row: HashMap<usize, Option<serde_json::Map<String, Value>>> = HashMap::new();
    for entry in entries {
        by_row.entry(entry.row).or_insert(entry.record);
    }

    let mut records = Vec::new();
    let mut dropped = 0;
    for estimate in estimates {
        match by_row.remove(&estimate.row).flatten() {
            Some(record) => records.push(MappedRecord {
                row: estimate.row,
                values: record
                    .into_iter()
                    .map(|(column, value)| (column, cell_text(value)))
                    .collect(),
            }),
            None => dropped += 1,
        }
    }
    if !by_row.is_empty() {
        tracing::debug!(ignored = by_row.len(), "Mapping referenced unknown rows");
    }
    Ok((records, dropped))
}

/// The first `[` that opens a non-empty mapping array wins; prose around it
/// may itself contain brackets. An empty array is accepted only when no
/// other candidate parses.
fn parse_entries(raw: &str) -> Result<Vec<MappingEntry>, String> {
    let text = strip_code_fence(raw);
    let mut first_error = None;
    let mut empty_found = false;
    for (start, _) in text.match_indices('[') {
        let mut stream =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<Vec<MappingEntry>>();
        match stream.next() {
            Some(Ok(entries)) if entries.is_empty() => empty_found = true,
            Some(Ok(entries)) => return Ok(entries),
            Some(Err(e)) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
            None => {}
        }
    }
    if empty_found {
        return Ok(Vec::new());
    }
    Err(first_error.unwrap_or_else(|| "no JSON array in output".to_string()))
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Header names compare without the required-column `*`, case and padding.
fn normalize_column(name: &str) -> String {
    name.trim().trim_start_matches('*').trim().to_lowercase()
}

/// Write the merged CSV: the header, then one line per record with values
/// placed under their columns. Unknown keys are dropped and missing columns
/// stay empty.
///
/// # Errors
///
/// Returns `RenderError::Csv` if writing fails.
pub fn merge(header: &[String], records: &[MappedRecord]) -> Result<Vec<u8>, RenderError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| RenderError::Csv(e.to_string()))?;

    for record in records {
        // Exact keys win; among keys that normalize alike the first in key
        // order wins.
        let mut normalized: HashMap<String, &str> = HashMap::new();
        for (column, value) in &record.values {
            normalized
                .entry(normalize_column(column))
                .or_insert(value.as_str());
        }
        let line = header.iter().map(|column| {
            record
                .values
                .get(column)
                .map(String::as_str)
                .or_else(|| normalized.get(&normalize_column(column)).copied())
                .unwrap_or("")
        });
        writer
            .write_record(line)
            .map_err(|e| RenderError::Csv(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| RenderError::Csv(e.to_string()))
}
