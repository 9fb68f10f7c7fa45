//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting backends, catalog profiles and loaded data.

use anyhow::Result;
use arrow::array::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use tabled::{Table, Tabled};

use vegaset_core::{BackendId, BackendStatus, Probe, Profile};

/// Table row representation for displaying backend availability.
#[derive(Tabled)]
pub struct BackendRow {
    /// Backend identifier (e.g., `arrow[parquet]`).
    #[tabled(rename = "Backend")]
    pub backend: String,
    /// Cargo features the backend needs.
    #[tabled(rename = "Requires")]
    pub requirements: String,
    /// Availability in this build.
    #[tabled(rename = "Status")]
    pub status: String,
    /// Marks the backend commands will use.
    #[tabled(rename = "Selected")]
    pub selected: String,
}

/// Table row representation for one catalog artifact.
#[derive(Tabled)]
pub struct DatasetRow {
    #[tabled(rename = "File")]
    pub file_name: String,
    #[tabled(rename = "Tag")]
    pub tag: String,
    #[tabled(rename = "Size")]
    pub size: String,
    /// Outcome of capability resolution for the active backend.
    #[tabled(rename = "Outcome")]
    pub outcome: String,
    /// Parse function, or `-` when none applies.
    #[tabled(rename = "Reader")]
    pub reader: String,
}

/// Builds one row per backend, marking `selected`.
#[must_use]
pub fn backend_rows(report: &[BackendStatus], selected: Option<BackendId>) -> Vec<BackendRow> {
    report
        .iter()
        .map(|status| BackendRow {
            backend: status.id.to_string(),
            requirements: status.requirements.join(", "),
            status: match status.probe {
                Probe::Available => "available".to_string(),
                Probe::Missing(dependency) => format!("missing '{dependency}'"),
            },
            selected: if Some(status.id) == selected { "*" } else { "" }.to_string(),
        })
        .collect()
}

/// Builds one row per profiled artifact.
#[must_use]
pub fn dataset_rows(profile: &[Profile]) -> Vec<DatasetRow> {
    profile
        .iter()
        .map(|entry| DatasetRow {
            file_name: entry.row.file_name.clone(),
            tag: entry.row.tag.clone(),
            size: format_bytes(entry.row.bytes),
            outcome: entry.outcome.to_string(),
            reader: entry.reader.unwrap_or("-").to_string(),
        })
        .collect()
}

pub fn display_backends(report: &[BackendStatus], selected: Option<BackendId>) {
    println!("\nBackends ({} total):\n", report.len());
    println!("{}", Table::new(backend_rows(report, selected)));
}

pub fn display_datasets(backend: BackendId, profile: &[Profile]) {
    let readable = profile.iter().filter(|p| p.reader.is_some()).count();
    println!(
        "\nDatasets readable with '{backend}' ({readable} of {}):\n",
        profile.len()
    );
    println!("{}", Table::new(dataset_rows(profile)));
}

/// Prints the schema and the first `limit` rows of `batch`.
///
/// # Errors
///
/// Returns an error if a column cannot be rendered as text.
pub fn display_batch(batch: &RecordBatch, limit: usize) -> Result<()> {
    println!("\n=== Schema ===");
    for field in batch.schema().fields() {
        let nullable = if field.is_nullable() { "" } else { " not null" };
        println!("{}: {}{nullable}", field.name(), field.data_type());
    }

    let shown = limit.min(batch.num_rows());
    println!("\n=== Rows ({shown} of {}) ===", batch.num_rows());
    if shown > 0 {
        println!("{}", pretty_format_batches(&[batch.slice(0, shown)])?);
    }
    Ok(())
}

/// Formats a byte count with a binary unit.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
