//! ## Custom Errors for the Taxi Dashboard
//!
//! This module defines the error type shared by every stage of the dashboard.
//! It uses the `thiserror` crate to derive the `Error` trait.
//! The `DashboardError` enum wraps the errors of the underlying crates (DataFusion, Arrow,
//! Parquet, reqwest) and adds variants for the failure scenarios of the dashboard itself.
//!
//! Only two situations are recoverable and they are not errors at all: an empty filtered
//! subset (see [`crate::dashboard::PassOutcome::NoData`]) and a trip without a matching zone
//! (kept with a null zone name). Everything represented here is fatal for the current run.
//!
//! ### Example
//!
//! ```rust
//! use taxi_dashboard::exceptions::{DashboardError, DashboardResult};
//!
//! fn check_hour(hour: u8) -> DashboardResult<u8> {
//!     if hour > 23 {
//!         return Err(DashboardError::InvalidParameter(format!("hour {} out of range", hour)));
//!     }
//!     Ok(hour)
//! }
//! ```

use thiserror::Error;

/// Errors specific to the taxi dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Wraps underlying I/O errors (cache directory, cached files, terminal output).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from Parquet.
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// A remote file could not be retrieved.
    #[error("Download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Indicates that an invalid parameter was provided (e.g., an hour outside 0-23).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that a column has an unexpected data type or an unreadable file format.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),
}

/// A convenient result type for dashboard operations.
pub type DashboardResult<T> = std::result::Result<T, DashboardError>;
