use anyhow::{Context, Result};
use log::warn;

use super::{cell, check_header, finish};
use crate::domain::model::{ExternalLinkRecord, PackageIdentifier, Resolution, UNRESOLVED};
use crate::error::ChainError;

pub const CHAIN_HEADER: [&str; 6] = [
    "doi",
    "obsoletes",
    "obsoletedBy",
    "metadataPID",
    "metadataObsoletesPID",
    "metadataObsoletedByPID",
];

/// Parse a chain export. Rows with a malformed identifier are skipped.
pub fn read_chains(text: &str) -> Result<Vec<ExternalLinkRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    check_header(reader.headers().context("Missing header row")?, &CHAIN_HEADER)?;

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read chain row {}", line + 2))?;
        let Some(external_id) = cell(&row, 0) else {
            warn!("Skipping chain row {} without an external id", line + 2);
            continue;
        };
        match parse_row(external_id, &row) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping chain row for '{}': {}", external_id, e),
        }
    }
    Ok(records)
}

fn parse_row(external_id: &str, row: &csv::StringRecord) -> Result<ExternalLinkRecord, ChainError> {
    Ok(ExternalLinkRecord {
        external_id: external_id.to_string(),
        obsoletes: cell(row, 1).map(String::from),
        obsoleted_by: cell(row, 2).map(String::from),
        identifier: parse_resolution(cell(row, 3))?,
        resolved_obsoletes: cell(row, 4).map(|raw| parse_resolution(Some(raw))).transpose()?,
        resolved_obsoleted_by: cell(row, 5)
            .map(|raw| parse_resolution(Some(raw)))
            .transpose()?,
    })
}

fn parse_resolution(raw: Option<&str>) -> Result<Resolution, ChainError> {
    match raw {
        None | Some(UNRESOLVED) => Ok(Resolution::Unresolved),
        Some(raw) => PackageIdentifier::parse(raw).map(Resolution::Resolved),
    }
}

pub fn write_chains(records: &[ExternalLinkRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CHAIN_HEADER)?;
    for record in records {
        let link = |r: &Option<Resolution>| r.as_ref().map(Resolution::as_column).unwrap_or_default();
        writer.write_record([
            record.external_id.clone(),
            record.obsoletes.clone().unwrap_or_default(),
            record.obsoleted_by.clone().unwrap_or_default(),
            record.identifier.as_column(),
            link(&record.resolved_obsoletes),
            link(&record.resolved_obsoleted_by),
        ])?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAINS: &str = "\
doi,obsoletes,obsoletedBy,metadataPID,metadataObsoletesPID,metadataObsoletedByPID
doi:a,,doi:b,edi/1/1,,edi/1/2
doi:b,doi:a,,edi/1/2,edi/1/1,
doi:c,doi:z,,UNRESOLVED,UNRESOLVED,
doi:d,,,edi/x/1,,
";

    #[test]
    fn test_read_chains() {
        let records = read_chains(CHAINS).unwrap();
        // doi:d has a malformed identifier and is skipped.
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].external_id, "doi:a");
        assert_eq!(records[0].obsoletes, None);
        assert_eq!(
            records[0].resolved_obsoleted_by,
            Some(Resolution::Resolved("edi/1/2".parse().unwrap()))
        );
        assert_eq!(records[0].resolved_obsoletes, None);

        assert_eq!(records[2].identifier, Resolution::Unresolved);
        assert_eq!(records[2].resolved_obsoletes, Some(Resolution::Unresolved));
        assert_eq!(records[2].unresolved_references(), vec!["doi:c", "doi:z"]);
    }

    #[test]
    fn test_header_is_required() {
        let err = read_chains("doi:a,,,edi/1/1,,\n").unwrap_err();
        assert!(err.to_string().contains("Unexpected header"));
    }

    #[test]
    fn test_write_chains_matches_input_layout() {
        let records = read_chains(CHAINS).unwrap();
        let written = String::from_utf8(write_chains(&records).unwrap()).unwrap();
        let expected: Vec<&str> = CHAINS.lines().take(4).collect();
        assert_eq!(written.lines().collect::<Vec<_>>(), expected);
    }
}
