//! CSV and TSV files exchanged between the commands.
//!
//! Readers take file contents and writers return bytes; the commands move
//! them through the runtime.

mod audit;
mod chains;
mod mapping;
mod observed;

use anyhow::{Result, bail};

pub use audit::{AUDIT_HEADER, AuditRow, write_audit};
pub use chains::{CHAIN_HEADER, read_chains, write_chains};
pub use mapping::{MAPPING_HEADER, build_mapping, read_mapping, write_mapping};
pub use observed::{FAILED, OBSERVED_HEADER, read_observed, rows_from_chains, write_observed};

/// Reject a file whose header row is not exactly `expected`.
fn check_header(headers: &csv::StringRecord, expected: &[&str]) -> Result<()> {
    let found: Vec<&str> = headers.iter().map(str::trim).collect();
    if found != expected {
        bail!(
            "Unexpected header row '{}', expected '{}'",
            found.join(","),
            expected.join(",")
        );
    }
    Ok(())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e))
}

/// Empty or whitespace-only cells are absent.
fn cell(record: &csv::StringRecord, index: usize) -> Option<&str> {
    record
        .get(index)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
