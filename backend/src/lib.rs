//! # nfadjust - Invoice line CSV validation and decimal adjustment
//!
//! nfadjust reads CSV files of invoice lines (`NF_ID`, `NUM_ITEM`), validates
//! and normalizes them, enriches every line with eight monetary values from a
//! lookup source shifted by a user-chosen decimal amount, and exports the
//! result as a spreadsheet.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│   Adjust    │────▶│   Export    │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (lookup+Δ)  │     │ (10 cols)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nfadjust::{ingest, apply, Adjustment, AdjustmentMode};
//!
//! let parsed = ingest("NF_ID;NUM_ITEM\n1234567890;1");
//! let adjustment = Adjustment::from_input("0,50", AdjustmentMode::Increase)?;
//! let result = apply(&parsed.rows, &lookup.items, adjustment.delta());
//! println!("{}", result.summary(&adjustment));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Row records, lookup entries, adjustment results
//! - [`decimal`] - Comma-decimal formatting and the adjustment field validator
//! - [`parser`] - CSV ingestion with encoding auto-detection
//! - [`transform`] - Lookup join, adjustment and pipeline
//! - [`lookup`] - Lookup document sources (file, HTTP)
//! - [`export`] - Export schema and spreadsheet writers
//! - [`session`] - Per-upload state, simulated save and reset
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Values
pub mod decimal;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Sources and sinks
pub mod export;
pub mod lookup;

// State
pub mod session;

// Runtime
pub mod config;
pub mod logging;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AdjustmentError, ConfigError, DecimalError, ExportError, IngestError, LookupError,
    PipelineError, ServerError, SessionError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AdjustmentMode, AdjustmentResult, LookupDocument, LookupEntry, MonetaryField,
    MonetaryValues, RowRecord,
};

// =============================================================================
// Re-exports - Decimal
// =============================================================================

pub use decimal::{DecimalInput, InputCheck, InputState, FORMAT_HINT};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_encoding, ingest, ingest_bytes, IngestReport, InvalidField,
    LineError, ParseResult, ReportLevel,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{apply, Adjustment};

pub use transform::pipeline::{
    export_rows, export_to_dir, ingest_file, ingest_upload, run_adjustment, AdjustmentRun,
};

// =============================================================================
// Re-exports - Lookup / Export / Session
// =============================================================================

pub use lookup::{ConfiguredLookup, FileLookup, HttpLookup, LookupSource};

pub use export::{
    export, export_file_name, CsvSheetWriter, ExportColumn, ExportFile, SpreadsheetWriter,
    Workbook, EXPORT_COLUMNS,
};

pub use session::{SaveReceipt, Session};

pub use config::Settings;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
