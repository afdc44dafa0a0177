use crate::ingest::FailedAttempt;
use thiserror::Error;

/// Failure to turn an uploaded file into a table
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type '{0}' (expected .csv or a spreadsheet such as .xlsx)")]
    UnsupportedFileKind(String),

    #[error("Header row {row} is out of range (maximum is {max})")]
    HeaderRowOutOfRange { row: usize, max: usize },

    #[error("Failed to load spreadsheet: {0}")]
    Spreadsheet(String),

    #[error(
        "Failed to load CSV with any encoding/delimiter combination ({} attempts failed)",
        .attempts.len()
    )]
    Exhausted { attempts: Vec<FailedAttempt> },
}

/// A plot request that cannot produce a chart
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Please select at least one column for both X and Y axes.")]
    MissingSelection,

    #[error(
        "For 3D Scatter Plot, please select exactly two columns for X Axis \
         and one column for Y Axis."
    )]
    Arity,

    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    #[error("Failed to parse '{value}' as number in column '{column}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Column '{0}' has no numeric values to plot")]
    NoData(String),

    #[error("Unknown plot type '{0}'")]
    UnknownPlotType(String),
}
