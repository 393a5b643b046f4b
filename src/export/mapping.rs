use std::collections::HashSet;

use anyhow::{Context, Result};

use super::{cell, check_header, finish};
use crate::domain::model::{ExternalLinkRecord, PackageIdentifier, Resolution};

pub const MAPPING_HEADER: [&str; 2] = ["doi", "pid"];

/// External id to identifier pairs known from a chain export.
///
/// Only records with at least one expected link contribute. The first
/// mapping of an external id wins and insertion order is kept.
pub fn build_mapping(records: &[ExternalLinkRecord]) -> Vec<(String, PackageIdentifier)> {
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    let mut push = |external_id: Option<&String>, resolution: Option<&Resolution>| {
        if let (Some(external_id), Some(Resolution::Resolved(pid))) = (external_id, resolution) {
            if seen.insert(external_id.clone()) {
                pairs.push((external_id.clone(), pid.clone()));
            }
        }
    };

    for record in records.iter().filter(|r| r.has_expected_links()) {
        push(Some(&record.external_id), Some(&record.identifier));
        push(record.obsoletes.as_ref(), record.resolved_obsoletes.as_ref());
        push(record.obsoleted_by.as_ref(), record.resolved_obsoleted_by.as_ref());
    }
    pairs
}

pub fn read_mapping(text: &str) -> Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    check_header(reader.headers().context("Missing header row")?, &MAPPING_HEADER)?;

    let mut pairs = Vec::new();
    for row in reader.records() {
        let row = row.context("Failed to read mapping row")?;
        if let (Some(external_id), Some(pid)) = (cell(&row, 0), cell(&row, 1)) {
            pairs.push((external_id.to_string(), pid.to_string()));
        }
    }
    Ok(pairs)
}

pub fn write_mapping(pairs: &[(String, PackageIdentifier)]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(MAPPING_HEADER)?;
    for (external_id, pid) in pairs {
        writer.write_record([external_id.as_str(), pid.to_string().as_str()])?;
    }
    finish(writer)
}
