//! CSV report of measurement statistics
//!
//! Writes one row per measurement kind so the figures can be pulled into a
//! spreadsheet or compared between manuscripts.

use crate::length::{MeasurementKind, MeasurementStats};
use std::collections::BTreeMap;
use std::io::Write;

/// Error types for CSV export
#[derive(Debug, thiserror::Error)]
pub enum CsvExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

pub type CsvExportResult<T> = Result<T, CsvExportError>;

/// Configuration for CSV export
#[derive(Debug, Clone)]
pub struct CsvExportConfig {
    /// Include column headers in the output
    pub include_headers: bool,

    /// CSV delimiter character
    pub delimiter: u8,

    /// Include kinds that have no measurements
    pub include_empty: bool,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self { include_headers: true, delimiter: b',', include_empty: true }
    }
}

/// Export per-kind statistics to CSV
///
/// CSV columns:
/// - Measurement: kind name (e.g. `interlinear`)
/// - Orientation: `horizontal` (height) or `vertical` (width)
/// - Count: number of measured rectangles
/// - Average: mean value, two decimals
/// - Standard Deviation: population standard deviation, two decimals
/// - Mode: most frequent value, or `No mode`
pub fn export_stats_csv<W: Write>(
    writer: W,
    stats: &BTreeMap<MeasurementKind, MeasurementStats>,
    config: &CsvExportConfig,
) -> CsvExportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.include_headers)
        .from_writer(writer);

    if config.include_headers {
        csv_writer.write_record([
            "Measurement",
            "Orientation",
            "Count",
            "Average",
            "Standard Deviation",
            "Mode",
        ])?;
    }

    for (kind, entry) in stats {
        if !config.include_empty && entry.count == 0 {
            continue;
        }

        csv_writer.write_record([
            kind.as_str().to_string(),
            kind.orientation().as_str().to_string(),
            entry.count.to_string(),
            format!("{:.2}", entry.average),
            format!("{:.2}", entry.standard_deviation),
            entry.mode.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
