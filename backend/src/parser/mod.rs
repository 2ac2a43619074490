//! Invoice line CSV ingestion with encoding auto-detection.
//!
//! Input files carry a header line (always discarded) followed by
//! `NF_ID;NUM_ITEM` or `NF_ID,NUM_ITEM` lines. Each data line is validated
//! on its own; failures are collected as [`LineError`]s and never abort the
//! ingestion.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;

use crate::models::RowRecord;

/// Stored width of `NUM_ITEM`.
pub const ITEM_NUMBER_WIDTH: usize = 6;

/// Errors listed in the ingestion report before the "+N more" suffix.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Title of [`FORMAT_HELP`].
pub const FORMAT_HELP_TITLE: &str = "Ajuda - Formato do Arquivo CSV";

/// Input file format, as shown to the user.
pub const FORMAT_HELP: &str = "O arquivo deve estar no formato CSV com as seguintes colunas:

- NF_ID: Identificador da nota fiscal (10 dígitos numéricos)
- NUM_ITEM: Número do item (até 6 dígitos numéricos)

Exemplo de conteúdo do arquivo CSV:

NF_ID,NUM_ITEM
1234567890,123456
0987654321,654321

O separador pode ser vírgula (,) ou ponto-e-vírgula (;).";

pub(crate) static NF_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("valid regex"));
static NUM_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,6}$").expect("valid regex"));

/// Column that failed validation on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvalidField {
    #[serde(rename = "NF_ID")]
    NfId,
    #[serde(rename = "NUM_ITEM")]
    NumItem,
}

impl InvalidField {
    pub fn label(self) -> &'static str {
        match self {
            InvalidField::NfId => "NF_ID",
            InvalidField::NumItem => "NUM_ITEM",
        }
    }
}

/// A data line that was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineError {
    /// 1-based line number in the source file (header is line 1).
    pub line: usize,
    pub fields: Vec<InvalidField>,
    /// The line as read, for diagnostics.
    pub content: String,
}

impl LineError {
    /// `NF_ID inválido`, `NUM_ITEM inválido`, or both joined with `e`.
    pub fn message(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{} inválido", f.label()))
            .collect::<Vec<_>>()
            .join(" e ")
    }
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Linha {}: {}", self.line, self.message())
    }
}

/// Result of ingesting one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub rows: Vec<RowRecord>,
    pub errors: Vec<LineError>,
    /// Detected or assumed encoding
    pub encoding: String,
}

/// Outcome category of an ingestion, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Success,
    Warning,
}

/// User-facing summary of an ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub level: ReportLevel,
    pub message: String,
}

impl ParseResult {
    /// Summarize the ingestion: line errors first, then empty input, then
    /// the success count.
    pub fn report(&self) -> IngestReport {
        if !self.errors.is_empty() {
            let lines: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
            let body = if lines.len() > MAX_REPORTED_ERRORS {
                format!(
                    "{}\n...(mais {} linhas com erro)",
                    lines[..MAX_REPORTED_ERRORS].join("\n"),
                    lines.len() - MAX_REPORTED_ERRORS
                )
            } else {
                format!("Algumas linhas contêm dados inválidos:\n{}", lines.join("\n"))
            };
            IngestReport {
                level: ReportLevel::Warning,
                message: format!("Dados com problemas de formatação\n\n{}", body),
            }
        } else if self.rows.is_empty() {
            IngestReport {
                level: ReportLevel::Warning,
                message: "Nenhum dado válido encontrado no arquivo.".to_string(),
            }
        } else {
            IngestReport {
                level: ReportLevel::Success,
                message: format!(
                    "Arquivo processado com sucesso. {} linhas válidas encontradas.",
                    self.rows.len()
                ),
            }
        }
    }
}

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 wins outright; otherwise chardet decides.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to text using the given encoding, lossily.
pub fn decode_content<'a>(bytes: &'a [u8], encoding: &str) -> Cow<'a, str> {
    let text = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0
        }
        _ => String::from_utf8_lossy(bytes),
    };

    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim_start_matches('\u{feff}')),
        Cow::Owned(s) => match s.strip_prefix('\u{feff}') {
            Some(rest) => Cow::Owned(rest.to_string()),
            None => Cow::Owned(s),
        },
    }
}

/// Whether an uploaded file name is accepted (`.csv`, any case).
pub fn is_csv_file_name(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Ingest raw file bytes, detecting the encoding first.
pub fn ingest_bytes(bytes: &[u8]) -> ParseResult {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    ParseResult {
        encoding,
        ..ingest(&content)
    }
}

/// Ingest CSV text.
///
/// # Example
/// ```ignore
/// use nfadjust::parser::ingest;
///
/// let result = ingest("NF_ID,NUM_ITEM\n1234567890,5\n12345,1");
/// assert_eq!(result.rows[0].item_number, "000005");
/// assert_eq!(result.errors[0].to_string(), "Linha 3: NF_ID inválido");
/// ```
pub fn ingest(text: &str) -> ParseResult {
    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (index, line) in text.lines().skip(1).enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        // Lines with a single field are dropped without a diagnostic.
        let Some((nf_id, num_item)) = split_fields(line) else {
            continue;
        };

        let id_valid = NF_ID.is_match(nf_id);
        let item_valid = NUM_ITEM.is_match(num_item);

        if id_valid && item_valid {
            rows.push(RowRecord::new(
                nf_id,
                format!("{:0>width$}", num_item, width = ITEM_NUMBER_WIDTH),
            ));
        } else {
            let mut fields = Vec::with_capacity(2);
            if !id_valid {
                fields.push(InvalidField::NfId);
            }
            if !item_valid {
                fields.push(InvalidField::NumItem);
            }
            errors.push(LineError {
                line: index + 2, // +1 for 0-index, +1 for header
                fields,
                content: line.to_string(),
            });
        }
    }

    ParseResult {
        rows,
        errors,
        encoding: "utf-8".to_string(),
    }
}

/// First two trimmed fields, semicolon first, comma as fallback.
fn split_fields(line: &str) -> Option<(&str, &str)> {
    let mut fields: Vec<&str> = line.split(';').collect();
    if fields.len() < 2 {
        fields = line.split(',').collect();
    }

    match fields.as_slice() {
        [first, second, ..] => Some((first.trim(), second.trim())),
        _ => None,
    }
}
