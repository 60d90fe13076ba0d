//! CSV parser for the cleaned CTR master dataset.

use std::borrow::Cow;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::record::{REQUIRED_COLUMNS, WorksiteRecord};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decodes worksite records from CSV bytes, gzip-compressed or plain.
///
/// # Errors
///
/// Returns [`SchemaError::MissingColumn`] naming the first absent required
/// column, or [`SchemaError::InvalidValue`] for the first row that does not
/// fit the record shape. Nothing is returned for a dataset that fails.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<WorksiteRecord>, SchemaError> {
    let data = decompress(bytes)?;

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::Headers)
        .from_reader(data.as_ref());

    let headers = rdr
        .headers()
        .map_err(|e| SchemaError::Unreadable(e.to_string()))?
        .clone();
    check_columns(&headers)?;

    let mut records = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let record: WorksiteRecord = result.map_err(|e| {
            // header is line 1, so the first data row is line 2
            let row = e
                .position()
                .map(|p| p.line())
                .unwrap_or(index as u64 + 2);
            SchemaError::InvalidValue {
                row,
                message: e.to_string(),
            }
        })?;
        records.push(record);
    }

    debug!(rows = records.len(), "Dataset parsed");
    Ok(records)
}

/// Logs every record that breaks a data-quality invariant and returns how
/// many records were affected.
pub fn report_issues(records: &[WorksiteRecord]) -> usize {
    let mut affected = 0;
    for record in records {
        let issues = record.validate();
        if issues.is_empty() {
            continue;
        }
        affected += 1;
        for issue in issues {
            warn!(
                cycle = %record.cycle,
                organization = %record.organization,
                issue = %issue,
                "Record failed validation"
            );
        }
    }
    affected
}

fn check_columns(headers: &StringRecord) -> Result<(), SchemaError> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(SchemaError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>, SchemaError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| SchemaError::Unreadable(format!("gzip: {e}")))?;
    debug!(compressed = bytes.len(), decompressed = out.len(), "Dataset decompressed");
    Ok(Cow::Owned(out))
}
