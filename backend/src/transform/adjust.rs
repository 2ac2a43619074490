//! Lookup join and decimal adjustment.
//!
//! Every row whose `(nfId, numItem)` appears in the lookup source receives
//! the source's eight monetary values shifted by the same signed delta.
//! Rows without a match pass through untouched.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::decimal::{self, input};
use crate::error::AdjustmentError;
use crate::models::{
    AdjustmentMode, AdjustmentResult, LookupEntry, MonetaryField, MonetaryValues, RowRecord,
};

/// A validated adjustment: the entered magnitude and its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Adjustment {
    pub magnitude: Decimal,
    pub mode: AdjustmentMode,
}

impl Adjustment {
    /// Build from the text of the adjustment field.
    ///
    /// Only a complete `D,DD` value is accepted.
    pub fn from_input(text: &str, mode: AdjustmentMode) -> Result<Self, AdjustmentError> {
        if !input::is_complete(text) {
            return Err(AdjustmentError::InvalidFormat(text.to_string()));
        }
        let magnitude =
            decimal::parse(text).map_err(|_| AdjustmentError::InvalidFormat(text.to_string()))?;
        Ok(Self { magnitude, mode })
    }

    /// Signed amount added to every monetary value.
    pub fn delta(&self) -> Decimal {
        match self.mode {
            AdjustmentMode::Increase => self.magnitude,
            AdjustmentMode::Decrease => -self.magnitude,
        }
    }

    /// Shown while the run is in progress.
    pub fn progress_message(&self) -> String {
        let direction = match self.mode {
            AdjustmentMode::Increase => "positivo",
            AdjustmentMode::Decrease => "negativo",
        };
        format!(
            "Processando dados com ajuste {} de {}",
            direction,
            decimal::format(self.magnitude)
        )
    }

    /// `+0,50` / `-0,50`
    pub fn display(&self) -> String {
        format!("{}{}", self.mode.sign(), decimal::format(self.magnitude))
    }
}

/// Join `rows` against `lookup` and shift matched values by `delta`.
///
/// The first lookup entry for a key wins. Row order is preserved and the
/// inputs are left untouched.
pub fn apply(rows: &[RowRecord], lookup: &[LookupEntry], delta: Decimal) -> AdjustmentResult {
    let mut index: HashMap<(&str, &str), &LookupEntry> = HashMap::with_capacity(lookup.len());
    for entry in lookup {
        index.entry(entry.key()).or_insert(entry);
    }

    let mut matched_count = 0;
    let mut unmatched_count = 0;

    let rows = rows
        .iter()
        .map(|row| match index.get(&row.key()) {
            Some(entry) => {
                matched_count += 1;
                row.with_values(adjusted_values(entry, delta))
            }
            None => {
                unmatched_count += 1;
                row.clone()
            }
        })
        .collect();

    AdjustmentResult {
        rows,
        matched_count,
        unmatched_count,
    }
}

/// A source value whose sum with `delta` overflows counts as zero, like
/// malformed text.
fn adjusted_values(entry: &LookupEntry, delta: Decimal) -> MonetaryValues {
    MonetaryValues::from_fn(|field: MonetaryField| {
        let sum = decimal::parse_or_zero(entry.raw(field))
            .checked_add(delta)
            .unwrap_or(delta);
        decimal::format(sum)
    })
}

impl AdjustmentResult {
    /// Completion message shown after a run.
    pub fn summary(&self, adjustment: &Adjustment) -> String {
        let mut message = format!(
            "Processamento concluído com sucesso!\n\nAjuste aplicado: {}\nTotal de registros processados: {}\n",
            adjustment.display(),
            self.matched_count
        );
        if self.unmatched_count > 0 {
            message.push_str(&format!(
                "Registros não encontrados no banco de dados: {}",
                self.unmatched_count
            ));
        }
        message
    }
}
