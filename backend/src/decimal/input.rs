//! Keystroke-level validation for the `D,DD` adjustment field.
//!
//! Each change event truncates the text to four characters, classifies it,
//! then auto-formats it so the user can type `3`, `5`, `0` and end up with
//! `3,50` without typing the comma.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Hint shown while the field is in the error state.
pub const FORMAT_HINT: &str = "Digite um valor no formato 0,00";

/// Longest legal content (`D,DD`).
pub const MAX_LEN: usize = 4;

static FULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9],[0-9]{2}$").expect("valid regex"));
static PARTIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]?(,[0-9]{0,2})?)?$").expect("valid regex"));
static SINGLE_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]$").expect("valid regex"));

/// Displayed validity of the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputState {
    #[default]
    Empty,
    Success,
    PartialValid,
    Error,
}

/// Field content after one change event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCheck {
    pub value: String,
    pub state: InputState,
}

impl InputCheck {
    pub fn hint(&self) -> Option<&'static str> {
        (self.state == InputState::Error).then_some(FORMAT_HINT)
    }
}

/// Whether `text` is a complete adjustment value.
pub fn is_complete(text: &str) -> bool {
    FULL.is_match(text)
}

/// Classify field content without modifying it.
pub fn classify(text: &str) -> InputState {
    if text.is_empty() {
        InputState::Empty
    } else if FULL.is_match(text) {
        InputState::Success
    } else if PARTIAL.is_match(text) {
        InputState::PartialValid
    } else {
        InputState::Error
    }
}

/// Insert the comma after a lone digit and trim overlong parts.
///
/// An overlong integer part keeps its *last* character, so typing over a
/// filled field replaces the digit. Only the first two comma-separated parts
/// survive a rebuild.
pub fn auto_format(text: &str) -> String {
    let mut value = text.to_string();

    if SINGLE_DIGIT.is_match(&value) {
        value.push(',');
    }

    if value.contains(',') {
        let parts: Vec<&str> = value.split(',').collect();
        if parts[1].chars().count() > 2 {
            let fraction: String = parts[1].chars().take(2).collect();
            value = format!("{},{}", parts[0], fraction);
        }
    }

    if value.contains(',') {
        let parts: Vec<&str> = value.split(',').collect();
        if parts[0].chars().count() > 1 {
            let last: String = parts[0].chars().last().into_iter().collect();
            value = format!("{},{}", last, parts[1]);
        }
    }

    value
}

/// Run one change event: truncate, classify, auto-format.
pub fn check(raw: &str) -> InputCheck {
    let truncated: String = raw.chars().take(MAX_LEN).collect();
    let state = classify(&truncated);
    InputCheck {
        value: auto_format(&truncated),
        state,
    }
}

/// The adjustment field, fed with the raw content after every keystroke.
#[derive(Debug, Clone, Default)]
pub struct DecimalInput {
    current: InputCheck,
}

impl DecimalInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a change event and return the new field state.
    pub fn change(&mut self, raw: &str) -> &InputCheck {
        self.current = check(raw);
        &self.current
    }

    /// Append typed characters to the current content.
    pub fn type_str(&mut self, typed: &str) -> &InputCheck {
        let raw = format!("{}{}", self.current.value, typed);
        self.change(&raw)
    }

    pub fn value(&self) -> &str {
        &self.current.value
    }

    pub fn state(&self) -> InputState {
        self.current.state
    }

    pub fn clear(&mut self) {
        self.current = InputCheck::default();
    }
}
