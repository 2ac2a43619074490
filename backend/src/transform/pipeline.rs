//! High-level pipeline API: file → rows → adjusted rows → export file.
//!
//! Each step reports progress through [`crate::api::logs`], so the CLI and
//! SSE clients see the same messages.
//!
//! # Example
//!
//! ```rust,ignore
//! use nfadjust::lookup::FileLookup;
//! use nfadjust::models::AdjustmentMode;
//! use nfadjust::transform::pipeline::{ingest_file, run_adjustment};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let parsed = ingest_file(Path::new("notas.csv")).await?;
//!     let lookup = FileLookup::new("data/lookup.json");
//!     let run = run_adjustment(&parsed.rows, "0,50", AdjustmentMode::Increase, &lookup).await?;
//!
//!     println!("{}", run.summary());
//!     Ok(())
//! }
//! ```

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::adjust::{self, Adjustment};
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{ExportError, IngestError, PipelineResult};
use crate::export::{self, ExportFile, SpreadsheetWriter};
use crate::lookup::LookupSource;
use crate::models::{AdjustmentMode, AdjustmentResult, RowRecord};
use crate::parser::{self, ParseResult};

/// Line errors echoed to the log before the rest is summarized.
const LOGGED_LINE_ERRORS: usize = 3;

/// A completed adjustment: the validated parameters and the enriched rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRun {
    pub adjustment: Adjustment,
    pub result: AdjustmentResult,
}

impl AdjustmentRun {
    pub fn summary(&self) -> String {
        self.result.summary(&self.adjustment)
    }
}

/// Read and ingest a CSV file.
///
/// Only `.csv` file names are accepted.
pub async fn ingest_file(path: &Path) -> PipelineResult<ParseResult> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !parser::is_csv_file_name(&name) {
        log_error(format!("Rejected non-CSV file: {}", path.display()));
        return Err(IngestError::NotCsv(name).into());
    }

    log_info(format!("📖 Reading {}", path.display()));
    let bytes = tokio::fs::read(path).await.map_err(IngestError::from)?;
    Ok(ingest_upload(&bytes))
}

/// Ingest uploaded bytes.
pub fn ingest_upload(bytes: &[u8]) -> ParseResult {
    let result = parser::ingest_bytes(bytes);

    log_success(format!("Detected encoding: {}", result.encoding));
    log_success(format!("Read {} valid rows", result.rows.len()));

    if !result.errors.is_empty() {
        log_warning(format!("{} lines with invalid data", result.errors.len()));
        for err in result.errors.iter().take(LOGGED_LINE_ERRORS) {
            log_error(err.to_string());
        }
    } else if result.rows.is_empty() {
        log_warning("No valid rows in file");
    }

    result
}

/// Validate the adjustment value, fetch the lookup document and apply it.
///
/// The value is checked before anything is fetched. A failed fetch aborts
/// the run; no row is enriched.
pub async fn run_adjustment<S: LookupSource>(
    rows: &[RowRecord],
    value: &str,
    mode: AdjustmentMode,
    source: &S,
) -> PipelineResult<AdjustmentRun> {
    let adjustment = Adjustment::from_input(value, mode)?;
    log_info(format!(
        "🔄 Adjusting {} rows by {}",
        rows.len(),
        adjustment.display()
    ));

    log_info(format!("Fetching lookup data from {}", source.describe()));
    let document = match source.fetch().await {
        Ok(document) => document,
        Err(e) => {
            log_error(format!("Lookup fetch failed: {}", e));
            return Err(e.into());
        }
    };
    log_success(format!("Loaded {} lookup entries", document.items.len()));

    let result = adjust::apply(rows, &document.items, adjustment.delta());
    log_success(format!("{} rows adjusted", result.matched_count));
    if result.unmatched_count > 0 {
        log_warning(format!(
            "{} rows not found in lookup data",
            result.unmatched_count
        ));
    }

    Ok(AdjustmentRun { adjustment, result })
}

/// Render the rows with `writer`, naming the file after `now`.
pub fn export_rows<W: SpreadsheetWriter>(
    rows: &[RowRecord],
    writer: &W,
    now: NaiveDateTime,
) -> PipelineResult<ExportFile> {
    let file = match export::export(rows, writer, now) {
        Ok(file) => file,
        Err(e) => {
            log_warning(format!("Export skipped: {}", e));
            return Err(e.into());
        }
    };
    log_success(format!(
        "Rendered {} ({} rows, {} bytes)",
        file.file_name,
        rows.len(),
        file.bytes.len()
    ));
    Ok(file)
}

/// Render the rows and write the file into `dir`, creating it if needed.
///
/// Returns the path of the written file.
pub async fn export_to_dir<W: SpreadsheetWriter>(
    rows: &[RowRecord],
    dir: &Path,
    writer: &W,
    now: NaiveDateTime,
) -> PipelineResult<PathBuf> {
    let file = export_rows(rows, writer, now)?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(ExportError::from)?;
    let path = dir.join(&file.file_name);
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(ExportError::from)?;

    log_success(format!("💾 Export written to {}", path.display()));
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AdjustmentError, PipelineError};
    use crate::export::CsvSheetWriter;
    use crate::lookup::FileLookup;
    use crate::models::{LookupDocument, LookupEntry, MonetaryField};
    use chrono::NaiveDate;
    use std::io::Write;

    fn lookup() -> LookupDocument {
        LookupDocument {
            items: vec![LookupEntry {
                nf_id: "1234567890".into(),
                num_item: "000001".into(),
                vl_opr_saida: "10,00".into(),
                vl_item: "2.5".into(),
                ..Default::default()
            }],
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "NF_ID;NUM_ITEM\r\n1234567890;1\r\n123;1\r\n").unwrap();

        let result = ingest_file(file.path()).await.unwrap();

        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.rows, vec![RowRecord::new("1234567890", "000001")]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, 3);
    }

    #[tokio::test]
    async fn test_ingest_rejects_other_extensions() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let err = ingest_file(file.path()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(IngestError::NotCsv(_))));
        assert_eq!(err.to_string(), "Apenas arquivos CSV são permitidos.");
    }

    #[tokio::test]
    async fn test_ingest_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ingest_file(&dir.path().join("absent.csv")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(IngestError::Io(_))));
    }

    #[tokio::test]
    async fn test_run_adjustment_in_memory() {
        let rows = vec![
            RowRecord::new("1234567890", "000001"),
            RowRecord::new("1234567890", "000002"),
        ];

        let run = run_adjustment(&rows, "0,50", AdjustmentMode::Decrease, &lookup())
            .await
            .unwrap();

        assert_eq!(run.result.matched_count, 1);
        assert_eq!(run.result.unmatched_count, 1);
        assert_eq!(run.result.rows[0].value(MonetaryField::OutboundValue), "9,50");
        assert_eq!(run.result.rows[0].value(MonetaryField::ItemValue), "2,00");
        assert_eq!(run.result.rows[0].value(MonetaryField::BaseValue), "-0,50");
        assert_eq!(run.result.rows[1], rows[1]);
        assert!(run.summary().contains("Ajuste aplicado: -0,50"));
    }

    #[tokio::test]
    async fn test_invalid_value_checked_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let unreachable = FileLookup::new(dir.path().join("absent.json"));

        let err = run_adjustment(&[], "5", AdjustmentMode::Increase, &unreachable)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Adjustment(AdjustmentError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_fetch_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FileLookup::new(dir.path().join("absent.json"));
        let rows = vec![RowRecord::new("1234567890", "000001")];

        let err = run_adjustment(&rows, "1,00", AdjustmentMode::Increase, &missing)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Lookup(_)));
        assert!(err
            .to_string()
            .starts_with("Ocorreu um erro ao processar os dados"));
    }

    #[tokio::test]
    async fn test_export_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let rows = vec![RowRecord::new("1234567890", "000001")];

        let path = export_to_dir(&rows, &out, &CsvSheetWriter::default(), now())
            .await
            .unwrap();

        assert_eq!(path, out.join("dados_ajustados_20240131_2359.csv"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("NF_ID;NUM_ITEM;"));
        assert!(written.contains("1234567890;000001;"));
    }

    #[test]
    fn test_export_rows_empty() {
        let err = export_rows(&[], &CsvSheetWriter::default(), now()).unwrap_err();
        assert!(matches!(err, PipelineError::Export(ExportError::NoData)));
    }
}
