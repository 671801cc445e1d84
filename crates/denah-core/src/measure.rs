//! Typed numeric entry for exact lengths and heights.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest segment a typed length may produce, in metres.
pub const MAX_LINE_LEN_M: f64 = 200.0;
/// Largest typed height magnitude, in metres.
pub const MAX_HEIGHT_M: f64 = 50.0;
/// Arrow-key step, in metres.
pub const STEP_FINE_M: f64 = 0.05;
/// Arrow-key step with the coarse modifier, in metres.
pub const STEP_COARSE_M: f64 = 0.5;

/// What the typed value means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureMode {
    /// Length of a plan segment. Never negative.
    Length,
    /// Signed height of a vertical stroke or extrusion.
    Height,
}

impl MeasureMode {
    fn clamp(self, value: f64) -> f64 {
        match self {
            MeasureMode::Length => value.clamp(0.0, MAX_LINE_LEN_M),
            MeasureMode::Height => value.clamp(-MAX_HEIGHT_M, MAX_HEIGHT_M),
        }
    }
}

/// Why the typed text has no value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    #[error("nothing typed")]
    Empty,
    #[error("not a number: {0:?}")]
    Invalid(String),
    #[error("length cannot be negative: {0}")]
    NegativeLength(f64),
}

/// Parse typed text (an optional trailing `m` is allowed) and clamp it to the
/// range of `mode`.
pub fn parse_measure(text: &str, mode: MeasureMode) -> Result<f64, MeasureError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MeasureError::Empty);
    }
    let number = trimmed.trim_end_matches('m').trim();
    let value: f64 = number
        .parse()
        .map_err(|_| MeasureError::Invalid(text.to_string()))?;
    if !value.is_finite() {
        return Err(MeasureError::Invalid(text.to_string()));
    }
    if mode == MeasureMode::Length && value < 0.0 {
        return Err(MeasureError::NegativeLength(value));
    }
    Ok(mode.clamp(value))
}

/// The numeric entry box shown next to the cursor while placing geometry.
#[derive(Debug, Clone, Default)]
pub struct MeasureInput {
    active: bool,
    mode: Option<MeasureMode>,
    text: String,
    value_m: Option<f64>,
}

impl MeasureInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the box in `mode` with empty text.
    pub fn start(&mut self, mode: MeasureMode) {
        self.active = true;
        self.mode = Some(mode);
        self.clear();
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.value_m = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mode(&self) -> Option<MeasureMode> {
        self.mode
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed value in metres, if the current text is valid.
    pub fn value_m(&self) -> Option<f64> {
        self.value_m
    }

    /// Parse the current text, reporting why it has no value.
    pub fn parsed(&self) -> Result<f64, MeasureError> {
        let mode = self.mode.ok_or(MeasureError::Empty)?;
        parse_measure(&self.text, mode)
    }

    /// A length is being typed, so magnet snapping should yield to it.
    pub fn overrides_magnet(&self) -> bool {
        self.active && self.mode == Some(MeasureMode::Length) && !self.text.is_empty()
    }

    fn reparse(&mut self) {
        let Some(mode) = self.mode else {
            self.value_m = None;
            return;
        };
        self.value_m = match parse_measure(&self.text, mode) {
            Ok(value) => Some(value),
            Err(MeasureError::Empty) => None,
            Err(err) => {
                log::trace!("measure input: {err}");
                None
            }
        };
    }

    /// Feed one typed character. Returns true if it was consumed.
    ///
    /// Digits and `m` append; `.` appends once; `-` prefixes the text, in
    /// height mode only.
    pub fn push_char(&mut self, c: char) -> bool {
        match c {
            '0'..='9' | 'm' => self.text.push(c),
            '.' => {
                if !self.text.contains('.') {
                    self.text.push('.');
                }
            }
            '-' => {
                if self.mode == Some(MeasureMode::Height) && !self.text.starts_with('-') {
                    self.text.insert(0, '-');
                }
            }
            _ => return false,
        }
        self.reparse();
        true
    }

    pub fn backspace(&mut self) {
        self.text.pop();
        self.reparse();
    }

    /// Nudge the value up or down by the fine (or coarse) step.
    pub fn step(&mut self, up: bool, coarse: bool) {
        let Some(mode) = self.mode else {
            return;
        };
        let step = if coarse { STEP_COARSE_M } else { STEP_FINE_M };
        let delta = if up { step } else { -step };
        let value = mode.clamp(self.value_m.unwrap_or(0.0) + delta);
        self.value_m = Some(value);
        self.text = format!("{value:.2}");
    }
}
