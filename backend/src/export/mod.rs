//! Spreadsheet export of adjusted rows.
//!
//! The column schema is fixed: `NF_ID`, `NUM_ITEM` and the eight monetary
//! columns, all typed as text so the comma decimals are written exactly as
//! displayed. Rendering goes through [`SpreadsheetWriter`]; the bundled
//! [`CsvSheetWriter`] produces a semicolon-delimited sheet.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{ExportError, ExportResult};
use crate::models::{MonetaryField, RowRecord};

pub const SHEET_NAME: &str = "Dados Ajustados";
pub const SHEET_TITLE: &str = "Dados Ajustados com Decimais";
pub const FILE_PREFIX: &str = "dados_ajustados_";

/// Cell type of an exported column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellType {
    /// Written verbatim, never converted to a number.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnSource {
    NfId,
    NumItem,
    Monetary(MonetaryField),
}

/// One spreadsheet column: header label and the record property it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportColumn {
    pub label: &'static str,
    pub property: &'static str,
    pub cell_type: CellType,
    #[serde(skip)]
    source: ColumnSource,
}

impl ExportColumn {
    const fn key(label: &'static str, property: &'static str, source: ColumnSource) -> Self {
        Self {
            label,
            property,
            cell_type: CellType::Text,
            source,
        }
    }

    const fn monetary(field: MonetaryField) -> Self {
        Self::key(field.label(), field.property(), ColumnSource::Monetary(field))
    }

    /// Cell text for a row.
    pub fn value<'a>(&self, row: &'a RowRecord) -> &'a str {
        match self.source {
            ColumnSource::NfId => &row.id,
            ColumnSource::NumItem => &row.item_number,
            ColumnSource::Monetary(field) => row.value(field),
        }
    }
}

/// Export columns, in order.
pub const EXPORT_COLUMNS: [ExportColumn; 10] = [
    ExportColumn::key("NF_ID", "nfId", ColumnSource::NfId),
    ExportColumn::key("NUM_ITEM", "numItem", ColumnSource::NumItem),
    ExportColumn::monetary(MonetaryField::OutboundValue),
    ExportColumn::monetary(MonetaryField::InboundValue),
    ExportColumn::monetary(MonetaryField::ItemValue),
    ExportColumn::monetary(MonetaryField::MerchandiseValue),
    ExportColumn::monetary(MonetaryField::DocumentTotalValue),
    ExportColumn::monetary(MonetaryField::BaseValue),
    ExportColumn::monetary(MonetaryField::OtherBaseValue),
    ExportColumn::monetary(MonetaryField::ExcludedBaseValue),
];

/// What a writer renders: one sheet of rows under the fixed columns.
#[derive(Debug, Clone, Copy)]
pub struct Workbook<'a> {
    pub sheet_name: &'static str,
    pub title: &'static str,
    pub columns: &'static [ExportColumn],
    pub rows: &'a [RowRecord],
}

impl<'a> Workbook<'a> {
    /// Workbook for the given rows. Fails when there is nothing to export.
    pub fn new(rows: &'a [RowRecord]) -> ExportResult<Self> {
        if rows.is_empty() {
            return Err(ExportError::NoData);
        }
        Ok(Self {
            sheet_name: SHEET_NAME,
            title: SHEET_TITLE,
            columns: &EXPORT_COLUMNS,
            rows,
        })
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.label).collect()
    }

    pub fn cells(&self) -> impl Iterator<Item = Vec<&'a str>> + '_ {
        let columns = self.columns;
        self.rows
            .iter()
            .map(move |row| columns.iter().map(|c| c.value(row)).collect())
    }
}

/// Renders a workbook to file bytes.
pub trait SpreadsheetWriter {
    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    fn content_type(&self) -> &'static str;

    fn render(&self, workbook: &Workbook<'_>) -> ExportResult<Vec<u8>>;
}

/// Writes the sheet as delimited text.
///
/// The default `;` delimiter keeps comma decimals unquoted.
#[derive(Debug, Clone, Copy)]
pub struct CsvSheetWriter {
    delimiter: u8,
}

impl CsvSheetWriter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvSheetWriter {
    fn default() -> Self {
        Self::new(b';')
    }
}

impl SpreadsheetWriter for CsvSheetWriter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn render(&self, workbook: &Workbook<'_>) -> ExportResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        writer.write_record(workbook.header())?;
        for cells in workbook.cells() {
            writer.write_record(&cells)?;
        }

        writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
    }
}

/// A rendered export, ready to be written or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// `dados_ajustados_YYYYMMDD_HHMM.<ext>`
pub fn export_file_name(now: NaiveDateTime, extension: &str) -> String {
    format!("{}{}.{}", FILE_PREFIX, now.format("%Y%m%d_%H%M"), extension)
}

/// Render `rows` with `writer`, naming the file after `now`.
pub fn export<W: SpreadsheetWriter>(
    rows: &[RowRecord],
    writer: &W,
    now: NaiveDateTime,
) -> ExportResult<ExportFile> {
    let workbook = Workbook::new(rows)?;
    Ok(ExportFile {
        file_name: export_file_name(now, writer.extension()),
        content_type: writer.content_type(),
        bytes: writer.render(&workbook)?,
    })
}
