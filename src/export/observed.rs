use anyhow::{Context, Result};

use super::{cell, check_header, finish};
use crate::domain::model::{ExternalLinkRecord, ObservedRow};

pub const OBSERVED_HEADER: [&str; 3] = ["PID", "obsoletes", "obsoletedBy"];

/// Link column text for a record whose metadata could not be fetched.
pub const FAILED: &str = "FAILED";

pub fn read_observed(text: &str) -> Result<Vec<ObservedRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    check_header(reader.headers().context("Missing header row")?, &OBSERVED_HEADER)?;

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.context("Failed to read observed links row")?;
        if let Some(identifier) = cell(&row, 0) {
            rows.push(ObservedRow::new(identifier, cell(&row, 1), cell(&row, 2)));
        }
    }
    Ok(rows)
}

/// Observed rows implied by a chain export's resolved columns.
pub fn rows_from_chains(records: &[ExternalLinkRecord]) -> Vec<ObservedRow> {
    records
        .iter()
        .map(|record| ObservedRow {
            identifier: record.identifier.as_column(),
            obsoletes: record.resolved_obsoletes.as_ref().map(|r| r.as_column()),
            obsoleted_by: record.resolved_obsoleted_by.as_ref().map(|r| r.as_column()),
        })
        .collect()
}

pub fn write_observed(rows: &[ObservedRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(OBSERVED_HEADER)?;
    for row in rows {
        writer.write_record([
            row.identifier.as_str(),
            row.obsoletes.as_deref().unwrap_or_default(),
            row.obsoleted_by.as_deref().unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::read_chains;

    #[test]
    fn test_read_observed() {
        let rows = read_observed(
            "PID,obsoletes,obsoletedBy\nedi/1/1,,edi/1/2\nedi/1/2,FAILED,FAILED\n,,\n",
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![
                ObservedRow::new("edi/1/1", None, Some("edi/1/2")),
                ObservedRow::new("edi/1/2", Some(FAILED), Some(FAILED)),
            ]
        );
    }

    #[test]
    fn test_write_observed() {
        let rows = vec![ObservedRow::new("edi/1/2", Some("edi/1/1"), None)];
        let text = String::from_utf8(write_observed(&rows).unwrap()).unwrap();
        assert_eq!(text, "PID,obsoletes,obsoletedBy\nedi/1/2,edi/1/1,\n");
    }

    #[test]
    fn test_rows_from_chains() {
        let records = read_chains(
            "doi,obsoletes,obsoletedBy,metadataPID,metadataObsoletesPID,metadataObsoletedByPID\n\
             doi:b,doi:a,,edi/1/2,edi/1/1,\n",
        )
        .unwrap();
        assert_eq!(
            rows_from_chains(&records),
            vec![ObservedRow::new("edi/1/2", Some("edi/1/1"), None)]
        );
    }
}
