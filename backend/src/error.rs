//! Error types for the adjustment pipeline.
//!
//! Row validation problems are not errors: the ingestor returns them as data
//! (see [`crate::parser::LineError`]). Everything in this module is fatal to
//! the action that raised it:
//!
//! - [`DecimalError`] - Malformed decimal text
//! - [`AdjustmentError`] - Adjustment value not in `D,DD` form
//! - [`IngestError`] - Input file could not be read
//! - [`LookupError`] - Lookup document could not be fetched or decoded
//! - [`ExportError`] - Spreadsheet could not be produced
//! - [`SessionError`] - Session action not allowed in the current state
//! - [`ConfigError`] - Invalid environment configuration
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Conversion is automatic via `From`, so `?` works across boundaries.

use thiserror::Error;

// =============================================================================
// Decimal Errors
// =============================================================================

/// Errors while reading a decimal value from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    /// More than one separator, stray characters, etc.
    #[error("Malformed decimal value: '{0}'")]
    Malformed(String),
}

// =============================================================================
// Adjustment Errors
// =============================================================================

/// Errors while building the adjustment from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdjustmentError {
    /// The entered text is not exactly one digit, a comma and two digits.
    #[error("O valor do ajuste decimal deve estar no formato 0,00")]
    InvalidFormat(String),
}

// =============================================================================
// Ingestion Errors
// =============================================================================

/// Errors while reading the uploaded file.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Uploaded file does not carry a `.csv` name.
    #[error("Apenas arquivos CSV são permitidos.")]
    NotCsv(String),

    /// Failed to read file.
    #[error("Erro ao ler o arquivo: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Lookup Errors
// =============================================================================

/// Errors while loading the lookup document.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Failed to read the lookup file.
    #[error("Erro ao carregar dados complementares: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed or returned a non-success status.
    #[error("Erro ao carregar dados complementares: {0}")]
    Http(#[from] reqwest::Error),

    /// Document is not a valid lookup document.
    #[error("Erro ao carregar dados complementares: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while producing the export file.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export.
    #[error("Não há dados para exportar.")]
    NoData,

    /// Spreadsheet writer failure.
    #[error("Erro ao exportar o arquivo: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to write the file.
    #[error("Erro ao exportar o arquivo: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors raised by session actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Save requested before the adjustment ran.
    #[error("Os dados ainda não foram processados")]
    NotProcessed,

    /// Save requested with no rows loaded.
    #[error("Não há dados para salvar.")]
    NothingToSave,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// Returned by the functions in [`crate::transform::pipeline`]; wraps every
/// lower-level error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file error.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Adjustment value error.
    #[error(transparent)]
    Adjustment(#[from] AdjustmentError),

    /// Lookup fetch error.
    #[error("Ocorreu um erro ao processar os dados: {0}")]
    Lookup(#[from] LookupError),

    /// Export error.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Session error.
    #[error(transparent)]
    Session(#[from] SessionError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decimal parsing.
pub type DecimalResult<T> = Result<T, DecimalError>;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for lookup operations.
pub type LookupResult<T> = Result<T, LookupError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
