//! REST API request and response types.
//!
//! Rows travel in their flat camelCase wire form (`nfId`, `numItem`,
//! `vlOprSaida`, ...), so a client can send back exactly what it received.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::decimal::input::{InputCheck, InputState};
use crate::export::{ExportColumn, EXPORT_COLUMNS, SHEET_NAME, SHEET_TITLE};
use crate::models::{AdjustmentMode, RowRecord};
use crate::parser::{IngestReport, InvalidField, LineError, ParseResult, FORMAT_HELP};
use crate::session::{SaveReceipt, Session, RESET_MESSAGE};
use crate::transform::pipeline::AdjustmentRun;

// =============================================================================
// Ingest
// =============================================================================

/// Response sent after a CSV upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// Unique identifier of this upload
    pub run_id: String,
    pub file_name: String,
    pub encoding: String,
    pub rows: Vec<RowRecord>,
    pub errors: Vec<LineIssue>,
    /// User-facing summary
    pub report: IngestReport,
}

impl IngestResponse {
    pub fn new(file_name: impl Into<String>, parsed: ParseResult) -> Self {
        let report = parsed.report();
        Self {
            run_id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            encoding: parsed.encoding,
            errors: parsed.errors.iter().map(LineIssue::from).collect(),
            rows: parsed.rows,
            report,
        }
    }
}

/// A rejected line, with its message already rendered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineIssue {
    pub line: usize,
    pub fields: Vec<InvalidField>,
    pub message: String,
    pub content: String,
}

impl From<&LineError> for LineIssue {
    fn from(err: &LineError) -> Self {
        Self {
            line: err.line,
            fields: err.fields.clone(),
            message: err.message(),
            content: err.content.clone(),
        }
    }
}

// =============================================================================
// Adjust
// =============================================================================

/// Body of `POST /api/adjust`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    pub rows: Vec<RowRecord>,
    /// Adjustment value, `D,DD`
    pub value: String,
    /// `false` subtracts the value
    #[serde(default = "default_increase")]
    pub increase: bool,
}

fn default_increase() -> bool {
    true
}

impl AdjustRequest {
    pub fn mode(&self) -> AdjustmentMode {
        AdjustmentMode::from_increase(self.increase)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustResponse {
    /// Applied adjustment, e.g. `+0,50`
    pub adjustment: String,
    pub rows: Vec<RowRecord>,
    pub matched_count: usize,
    pub unmatched_count: usize,
    pub summary: String,
}

impl From<AdjustmentRun> for AdjustResponse {
    fn from(run: AdjustmentRun) -> Self {
        let summary = run.summary();
        Self {
            adjustment: run.adjustment.display(),
            rows: run.result.rows,
            matched_count: run.result.matched_count,
            unmatched_count: run.result.unmatched_count,
            summary,
        }
    }
}

// =============================================================================
// Export / Save
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub rows: Vec<RowRecord>,
}

/// Body of `POST /api/save`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(default)]
    pub file_name: String,
    pub rows: Vec<RowRecord>,
    #[serde(default)]
    pub processed: bool,
}

impl From<SaveRequest> for Session {
    fn from(req: SaveRequest) -> Self {
        Session {
            file_name: req.file_name,
            rows: req.rows,
            processed: req.processed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub saved: usize,
    pub message: String,
    /// The session is reset after a save; shown once the client clears.
    pub reset_message: &'static str,
}

impl From<SaveReceipt> for SaveResponse {
    fn from(receipt: SaveReceipt) -> Self {
        Self {
            saved: receipt.saved,
            message: receipt.message(),
            reset_message: RESET_MESSAGE,
        }
    }
}

// =============================================================================
// Input / Columns
// =============================================================================

/// Body of `POST /api/input`: the raw field content after a keystroke.
#[derive(Debug, Clone, Deserialize)]
pub struct InputRequest {
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputResponse {
    pub value: String,
    pub state: InputState,
    pub hint: Option<&'static str>,
}

impl From<InputCheck> for InputResponse {
    fn from(check: InputCheck) -> Self {
        Self {
            hint: check.hint(),
            value: check.value,
            state: check.state,
        }
    }
}

/// Export schema and input format help.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub sheet_name: &'static str,
    pub title: &'static str,
    pub columns: &'static [ExportColumn],
    pub help: &'static str,
}

impl Default for ColumnsResponse {
    fn default() -> Self {
        Self {
            sheet_name: SHEET_NAME,
            title: SHEET_TITLE,
            columns: &EXPORT_COLUMNS,
            help: FORMAT_HELP,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::input::check;
    use crate::parser::ingest;

    #[test]
    fn test_ingest_response_wire_format() {
        let parsed = ingest("NF_ID;NUM_ITEM\n1234567890;7\n12345;x");
        let json = serde_json::to_value(IngestResponse::new("notas.csv", parsed)).unwrap();

        assert_eq!(json["fileName"], "notas.csv");
        assert_eq!(json["rows"][0]["nfId"], "1234567890");
        assert_eq!(json["rows"][0]["numItem"], "000007");
        assert_eq!(json["rows"][0]["vlItem"], "");
        assert_eq!(json["errors"][0]["line"], 3);
        assert_eq!(json["errors"][0]["message"], "NF_ID inválido e NUM_ITEM inválido");
        assert_eq!(json["report"]["level"], "warning");
        assert!(Uuid::parse_str(json["runId"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_adjust_request_defaults_to_increase() {
        let req: AdjustRequest = serde_json::from_value(json!({
            "rows": [{ "nfId": "1234567890", "numItem": "000001" }],
            "value": "0,50"
        }))
        .unwrap();
        assert_eq!(req.mode(), AdjustmentMode::Increase);
        assert_eq!(req.rows[0], RowRecord::new("1234567890", "000001"));

        let req: AdjustRequest =
            serde_json::from_value(json!({ "rows": [], "value": "0,50", "increase": false }))
                .unwrap();
        assert_eq!(req.mode(), AdjustmentMode::Decrease);
    }

    #[test]
    fn test_input_response_hint() {
        let ok = InputResponse::from(check("3"));
        assert_eq!(ok.value, "3,");
        assert_eq!(ok.hint, None);

        let bad = serde_json::to_value(InputResponse::from(check("x"))).unwrap();
        assert_eq!(bad["state"], "error");
        assert_eq!(bad["hint"], "Digite um valor no formato 0,00");
    }

    #[test]
    fn test_columns_response() {
        let json = serde_json::to_value(ColumnsResponse::default()).unwrap();
        assert_eq!(json["sheetName"], "Dados Ajustados");
        assert_eq!(json["columns"].as_array().unwrap().len(), 10);
        assert_eq!(json["columns"][2]["label"], "VL_OPR_SAIDA");
        assert_eq!(json["columns"][2]["cellType"], "Text");
    }
}
