//! Domain models for the adjustment pipeline.
//!
//! - [`RowRecord`] - One validated invoice line (NF_ID + NUM_ITEM) and its
//!   monetary values once matched
//! - [`MonetaryField`] - The eight monetary columns, in export order
//! - [`MonetaryValues`] - A complete set of formatted monetary values
//! - [`LookupEntry`] / [`LookupDocument`] - Records from the lookup source
//! - [`AdjustmentMode`] - Increase or decrease
//! - [`AdjustmentResult`] - Output of the adjustment engine
//!
//! On the wire every record is a flat JSON object with camelCase properties
//! (`nfId`, `numItem`, `vlOprSaida`, ...). Unset monetary values are the
//! empty string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::NF_ID;

/// Zero-padded item number.
static ITEM_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").expect("valid regex"));

/// Formatted monetary value, `D..,DD`.
static FORMATTED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]+,[0-9]{2}$").expect("valid regex"));

// =============================================================================
// Monetary Fields
// =============================================================================

/// One of the eight monetary columns carried by an invoice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonetaryField {
    /// VL_OPR_SAIDA
    OutboundValue,
    /// VLR_OPR_ENTRADA
    InboundValue,
    /// VL_ITEM
    ItemValue,
    /// VL_MERC
    MerchandiseValue,
    /// VL_TOTAL_DOCUMENTO
    DocumentTotalValue,
    /// BASE
    BaseValue,
    /// OUTROS_BASE
    OtherBaseValue,
    /// BASE_EXCLUIDA
    ExcludedBaseValue,
}

impl MonetaryField {
    /// All fields, in export column order.
    pub const ALL: [MonetaryField; 8] = [
        MonetaryField::OutboundValue,
        MonetaryField::InboundValue,
        MonetaryField::ItemValue,
        MonetaryField::MerchandiseValue,
        MonetaryField::DocumentTotalValue,
        MonetaryField::BaseValue,
        MonetaryField::OtherBaseValue,
        MonetaryField::ExcludedBaseValue,
    ];

    /// JSON property name used by records and the lookup source.
    pub const fn property(self) -> &'static str {
        match self {
            MonetaryField::OutboundValue => "vlOprSaida",
            MonetaryField::InboundValue => "vlrOprEntrada",
            MonetaryField::ItemValue => "vlItem",
            MonetaryField::MerchandiseValue => "vlMerc",
            MonetaryField::DocumentTotalValue => "vlTotalDocumento",
            MonetaryField::BaseValue => "base",
            MonetaryField::OtherBaseValue => "outrosBase",
            MonetaryField::ExcludedBaseValue => "baseExcluida",
        }
    }

    /// Spreadsheet column label.
    pub const fn label(self) -> &'static str {
        match self {
            MonetaryField::OutboundValue => "VL_OPR_SAIDA",
            MonetaryField::InboundValue => "VLR_OPR_ENTRADA",
            MonetaryField::ItemValue => "VL_ITEM",
            MonetaryField::MerchandiseValue => "VL_MERC",
            MonetaryField::DocumentTotalValue => "VL_TOTAL_DOCUMENTO",
            MonetaryField::BaseValue => "BASE",
            MonetaryField::OtherBaseValue => "OUTROS_BASE",
            MonetaryField::ExcludedBaseValue => "BASE_EXCLUIDA",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A complete set of formatted monetary values (`"9,50"`, `"-0,25"`, ...).
///
/// Only ever built all at once, so a row can never hold a partial set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonetaryValues([String; 8]);

impl MonetaryValues {
    /// Build the set by computing each field's value.
    pub fn from_fn(f: impl FnMut(MonetaryField) -> String) -> Self {
        Self(MonetaryField::ALL.map(f))
    }

    pub fn get(&self, field: MonetaryField) -> &str {
        &self.0[field.index()]
    }
}

// =============================================================================
// Row Record
// =============================================================================

/// One validated invoice line.
///
/// `id` is always 10 digits and `item_number` always 6 digits (zero-padded).
/// `values` is `None` until the row is matched against the lookup source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RowWire", try_from = "RowWire")]
pub struct RowRecord {
    pub id: String,
    pub item_number: String,
    pub values: Option<MonetaryValues>,
}

impl RowRecord {
    /// Create an unmatched row.
    pub fn new(id: impl Into<String>, item_number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_number: item_number.into(),
            values: None,
        }
    }

    /// Copy of this row carrying the given values.
    pub fn with_values(&self, values: MonetaryValues) -> Self {
        Self {
            id: self.id.clone(),
            item_number: self.item_number.clone(),
            values: Some(values),
        }
    }

    /// Formatted value of a monetary field, or `""` when unset.
    pub fn value(&self, field: MonetaryField) -> &str {
        self.values.as_ref().map(|v| v.get(field)).unwrap_or("")
    }

    /// Whether the monetary values are populated.
    pub fn is_matched(&self) -> bool {
        self.values.is_some()
    }

    /// Join key against the lookup source.
    pub fn key(&self) -> (&str, &str) {
        (&self.id, &self.item_number)
    }
}

/// Flat wire form of a [`RowRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowWire {
    nf_id: String,
    num_item: String,
    #[serde(default)]
    vl_opr_saida: String,
    #[serde(default)]
    vlr_opr_entrada: String,
    #[serde(default)]
    vl_item: String,
    #[serde(default)]
    vl_merc: String,
    #[serde(default)]
    vl_total_documento: String,
    #[serde(default)]
    base: String,
    #[serde(default)]
    outros_base: String,
    #[serde(default)]
    base_excluida: String,
}

impl RowWire {
    fn monetary(&self) -> [&str; 8] {
        [
            &self.vl_opr_saida,
            &self.vlr_opr_entrada,
            &self.vl_item,
            &self.vl_merc,
            &self.vl_total_documento,
            &self.base,
            &self.outros_base,
            &self.base_excluida,
        ]
    }
}

impl From<RowRecord> for RowWire {
    fn from(row: RowRecord) -> Self {
        let v = |f| row.value(f).to_string();
        RowWire {
            vl_opr_saida: v(MonetaryField::OutboundValue),
            vlr_opr_entrada: v(MonetaryField::InboundValue),
            vl_item: v(MonetaryField::ItemValue),
            vl_merc: v(MonetaryField::MerchandiseValue),
            vl_total_documento: v(MonetaryField::DocumentTotalValue),
            base: v(MonetaryField::BaseValue),
            outros_base: v(MonetaryField::OtherBaseValue),
            base_excluida: v(MonetaryField::ExcludedBaseValue),
            nf_id: row.id,
            num_item: row.item_number,
        }
    }
}

impl TryFrom<RowWire> for RowRecord {
    type Error = String;

    fn try_from(wire: RowWire) -> Result<Self, Self::Error> {
        if !NF_ID.is_match(&wire.nf_id) {
            return Err(format!("nfId {:?} is not 10 digits", wire.nf_id));
        }
        if !ITEM_NUMBER.is_match(&wire.num_item) {
            return Err(format!("numItem {:?} is not 6 digits", wire.num_item));
        }

        let monetary = wire.monetary();
        let populated = monetary.iter().filter(|v| !v.is_empty()).count();

        let values = match populated {
            0 => None,
            8 => {
                if let Some(bad) = monetary.iter().find(|v| !FORMATTED_VALUE.is_match(v)) {
                    return Err(format!(
                        "row {}/{} has malformed value {:?}",
                        wire.nf_id, wire.num_item, bad
                    ));
                }
                Some(MonetaryValues::from_fn(|f| monetary[f.index()].to_string()))
            }
            n => {
                return Err(format!(
                    "row {}/{} has {} of 8 monetary values set",
                    wire.nf_id, wire.num_item, n
                ))
            }
        };

        Ok(RowRecord {
            id: wire.nf_id,
            item_number: wire.num_item,
            values,
        })
    }
}

// =============================================================================
// Lookup Source Records
// =============================================================================

/// A record from the lookup source. Monetary values are raw text
/// (`"10,00"`, `"10.5"`, `""`) and are only parsed when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupEntry {
    pub nf_id: String,
    pub num_item: String,
    #[serde(default)]
    pub vl_opr_saida: String,
    #[serde(default)]
    pub vlr_opr_entrada: String,
    #[serde(default)]
    pub vl_item: String,
    #[serde(default)]
    pub vl_merc: String,
    #[serde(default)]
    pub vl_total_documento: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub outros_base: String,
    #[serde(default)]
    pub base_excluida: String,
}

impl LookupEntry {
    /// Raw text of a monetary field.
    pub fn raw(&self, field: MonetaryField) -> &str {
        match field {
            MonetaryField::OutboundValue => &self.vl_opr_saida,
            MonetaryField::InboundValue => &self.vlr_opr_entrada,
            MonetaryField::ItemValue => &self.vl_item,
            MonetaryField::MerchandiseValue => &self.vl_merc,
            MonetaryField::DocumentTotalValue => &self.vl_total_documento,
            MonetaryField::BaseValue => &self.base,
            MonetaryField::OtherBaseValue => &self.outros_base,
            MonetaryField::ExcludedBaseValue => &self.base_excluida,
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.nf_id, &self.num_item)
    }
}

/// The document served by the lookup source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupDocument {
    pub items: Vec<LookupEntry>,
}

// =============================================================================
// Adjustment
// =============================================================================

/// Direction of the adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentMode {
    Increase,
    Decrease,
}

impl AdjustmentMode {
    pub fn from_increase(increase: bool) -> Self {
        if increase {
            AdjustmentMode::Increase
        } else {
            AdjustmentMode::Decrease
        }
    }

    pub fn sign(self) -> &'static str {
        match self {
            AdjustmentMode::Increase => "+",
            AdjustmentMode::Decrease => "-",
        }
    }
}

/// Output of [`crate::transform::adjust::apply`].
///
/// `matched_count + unmatched_count == rows.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentResult {
    pub rows: Vec<RowRecord>,
    pub matched_count: usize,
    pub unmatched_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_values() -> MonetaryValues {
        MonetaryValues::from_fn(|f| match f {
            MonetaryField::OutboundValue => "9,50".to_string(),
            _ => "0,00".to_string(),
        })
    }

    #[test]
    fn test_unmatched_row_serializes_empty_markers() {
        let row = RowRecord::new("1234567890", "000005");
        let value = serde_json::to_value(&row).unwrap();

        assert_eq!(value["nfId"], "1234567890");
        assert_eq!(value["numItem"], "000005");
        for field in MonetaryField::ALL {
            assert_eq!(value[field.property()], "", "{}", field.property());
        }
    }

    #[test]
    fn test_matched_row_serializes_values() {
        let row = RowRecord::new("1234567890", "000005").with_values(sample_values());
        let value = serde_json::to_value(&row).unwrap();

        assert_eq!(value["vlOprSaida"], "9,50");
        assert_eq!(value["baseExcluida"], "0,00");
        assert!(row.is_matched());
    }

    #[test]
    fn test_row_deserializes_without_monetary_properties() {
        let row: RowRecord =
            serde_json::from_value(json!({ "nfId": "1234567890", "numItem": "123456" })).unwrap();
        assert_eq!(row, RowRecord::new("1234567890", "123456"));
    }

    #[test]
    fn test_partially_populated_row_is_rejected() {
        let result: Result<RowRecord, _> = serde_json::from_value(json!({
            "nfId": "1234567890",
            "numItem": "123456",
            "vlOprSaida": "1,00"
        }));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("1 of 8"));
    }

    #[test]
    fn test_row_keys_must_be_normalized() {
        for (nf_id, num_item, expected) in [
            ("abc", "000001", "nfId"),
            ("123456789", "000001", "nfId"),
            ("1234567890", "1", "numItem"),
            ("1234567890", "12345a", "numItem"),
        ] {
            let result: Result<RowRecord, _> =
                serde_json::from_value(json!({ "nfId": nf_id, "numItem": num_item }));
            let err = result.unwrap_err().to_string();
            assert!(err.contains(expected), "{}", err);
        }
    }

    #[test]
    fn test_row_values_must_be_formatted() {
        let mut wire = serde_json::to_value(
            RowRecord::new("1234567890", "000001").with_values(sample_values()),
        )
        .unwrap();
        for bad in ["9.50", "9,5", "1.000,00", "abc"] {
            wire["vlItem"] = json!(bad);
            let result: Result<RowRecord, _> = serde_json::from_value(wire.clone());
            assert!(result.unwrap_err().to_string().contains("malformed"), "{}", bad);
        }

        wire["vlItem"] = json!("-0,25");
        let row: RowRecord = serde_json::from_value(wire).unwrap();
        assert_eq!(row.value(MonetaryField::ItemValue), "-0,25");
    }

    #[test]
    fn test_lookup_entry_raw_fields() {
        let entry: LookupEntry = serde_json::from_value(json!({
            "nfId": "1234567890",
            "numItem": "000001",
            "vlTotalDocumento": "150.75",
            "outrosBase": "3,10"
        }))
        .unwrap();

        assert_eq!(entry.raw(MonetaryField::DocumentTotalValue), "150.75");
        assert_eq!(entry.raw(MonetaryField::OtherBaseValue), "3,10");
        assert_eq!(entry.raw(MonetaryField::ItemValue), "");
        assert_eq!(entry.key(), ("1234567890", "000001"));
    }

    #[test]
    fn test_field_order_matches_labels() {
        let labels: Vec<_> = MonetaryField::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(labels[0], "VL_OPR_SAIDA");
        assert_eq!(labels[7], "BASE_EXCLUIDA");
    }
}
