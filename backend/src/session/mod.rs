//! Per-upload working state.
//!
//! A [`Session`] is a plain value: each step (load, adjust, reset) returns
//! the next session instead of mutating shared state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::api::logs::log_success;
use crate::error::SessionError;
use crate::models::{AdjustmentResult, RowRecord};
use crate::parser::ParseResult;

/// Shown after a reset.
pub const RESET_MESSAGE: &str = "Aplicação reiniciada. Você pode importar um novo arquivo.";

/// Working state for one uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub file_name: String,
    pub rows: Vec<RowRecord>,
    /// Set once the adjustment ran; enables saving.
    pub processed: bool,
}

impl Session {
    /// Fresh session for a newly ingested file. Replaces whatever was loaded.
    pub fn load(file_name: impl Into<String>, parsed: &ParseResult) -> Self {
        Self {
            file_name: file_name.into(),
            rows: parsed.rows.clone(),
            processed: false,
        }
    }

    /// Session carrying the adjusted rows.
    pub fn with_adjustment(self, result: AdjustmentResult) -> Self {
        Self {
            rows: result.rows,
            processed: true,
            ..self
        }
    }

    /// Empty session, ready for the next file.
    pub fn reset(self) -> Self {
        Self::default()
    }

    /// Simulated save: waits `delay` and reports how many rows were "saved".
    pub async fn save(&self, delay: Duration) -> Result<SaveReceipt, SessionError> {
        if !self.processed {
            return Err(SessionError::NotProcessed);
        }
        if self.rows.is_empty() {
            return Err(SessionError::NothingToSave);
        }

        tokio::time::sleep(delay).await;

        let receipt = SaveReceipt {
            saved: self.rows.len(),
        };
        log_success(format!("Saved {} records", receipt.saved));
        Ok(receipt)
    }
}

/// Outcome of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub saved: usize,
}

impl SaveReceipt {
    pub fn message(&self) -> String {
        format!(
            "Os dados foram salvos com sucesso no banco de dados!\nTotal de registros salvos: {}",
            self.saved
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ingest;

    fn loaded() -> Session {
        Session::load("notas.csv", &ingest("h\n1234567890,1\n1234567890,2"))
    }

    #[test]
    fn test_load_replaces_rows() {
        let session = loaded();
        assert_eq!(session.file_name, "notas.csv");
        assert_eq!(session.rows.len(), 2);
        assert!(!session.processed);

        let next = Session::load("outro.csv", &ingest("h\n0987654321,9"));
        assert_eq!(next.rows, vec![RowRecord::new("0987654321", "000009")]);
    }

    #[tokio::test]
    async fn test_save_requires_processing() {
        let result = loaded().save(Duration::ZERO).await;
        assert_eq!(result, Err(SessionError::NotProcessed));
    }

    #[tokio::test]
    async fn test_save_after_adjustment() {
        let session = loaded();
        let adjusted = AdjustmentResult {
            rows: session.rows.clone(),
            matched_count: 0,
            unmatched_count: 2,
        };
        let session = session.with_adjustment(adjusted);
        assert!(session.processed);
        assert_eq!(session.file_name, "notas.csv");

        let receipt = session.save(Duration::from_millis(5)).await.unwrap();
        assert_eq!(receipt.saved, 2);
        assert!(receipt.message().ends_with("Total de registros salvos: 2"));
    }

    #[tokio::test]
    async fn test_save_without_rows() {
        let session = Session::default().with_adjustment(AdjustmentResult {
            rows: vec![],
            matched_count: 0,
            unmatched_count: 0,
        });
        let result = session.save(Duration::ZERO).await;
        assert_eq!(result, Err(SessionError::NothingToSave));
    }

    #[test]
    fn test_reset_clears_everything() {
        let session = loaded().reset();
        assert_eq!(session, Session::default());
    }
}
