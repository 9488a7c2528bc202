//! Ply history and the viewing cursor.
//!
//! Steps only ever grow at the tail; the cursor moves freely between the
//! first and last known ply without touching the steps.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One known position of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub ply: u32,
    pub fen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub san: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uci: Option<String>,
    #[serde(default)]
    pub check: bool,
    /// Pocket contents for drop variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crazy: Option<serde_json::Value>,
}

impl Step {
    pub fn new(ply: u32, fen: impl Into<String>) -> Self {
        Self {
            ply,
            fen: fen.into(),
            san: None,
            uci: None,
            check: false,
            crazy: None,
        }
    }

    pub fn with_move(mut self, san: impl Into<String>, uci: impl Into<String>) -> Self {
        self.san = Some(san.into());
        self.uci = Some(uci.into());
        self
    }

    /// Whether the step was reached by a capture.
    pub fn is_capture(&self) -> bool {
        self.san.as_deref().is_some_and(|san| san.contains('x'))
    }
}

/// Concatenation of every step's san; identifies a step sequence.
pub fn steps_hash(steps: &[Step]) -> String {
    steps.iter().filter_map(|s| s.san.as_deref()).collect()
}

/// History errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("ply {ply} outside history [{first}, {last}]")]
    OutOfRange { ply: u32, first: u32, last: u32 },

    #[error("expected ply {expected}, got {got}")]
    SequenceViolation { expected: u32, got: u32 },

    #[error("history must contain at least one step")]
    Empty,
}

/// Which way a jump moved the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpDirection {
    Forward,
    Backward,
    Stay,
}

/// Ordered steps plus the ply the viewer is looking at.
#[derive(Debug, Clone)]
pub struct PlyHistory {
    steps: Vec<Step>,
    cursor: u32,
}

impl PlyHistory {
    /// Build from a snapshot's step list; the cursor starts live.
    pub fn new(steps: Vec<Step>) -> Result<Self, HistoryError> {
        let last = steps.last().ok_or(HistoryError::Empty)?.ply;
        check_contiguous(&steps)?;
        Ok(Self {
            steps,
            cursor: last,
        })
    }

    pub fn first_ply(&self) -> u32 {
        self.steps[0].ply
    }

    pub fn last_ply(&self) -> u32 {
        self.steps[self.steps.len() - 1].ply
    }

    pub fn current_ply(&self) -> u32 {
        self.cursor
    }

    pub fn is_live(&self) -> bool {
        self.cursor == self.last_ply()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn last(&self) -> &Step {
        &self.steps[self.steps.len() - 1]
    }

    /// Step at `ply`, if known.
    pub fn at(&self, ply: u32) -> Option<&Step> {
        let offset = ply.checked_sub(self.first_ply())? as usize;
        self.steps.get(offset)
    }

    /// Step under the cursor.
    pub fn current(&self) -> &Step {
        let offset = (self.cursor - self.first_ply()) as usize;
        &self.steps[offset]
    }

    /// Check that `ply` would extend the history by exactly one.
    pub fn check_extends(&self, ply: u32) -> Result<(), HistoryError> {
        let expected = self.last_ply() + 1;
        if ply == expected {
            Ok(())
        } else {
            Err(HistoryError::SequenceViolation { expected, got: ply })
        }
    }

    /// Append the next step. The cursor is left where it is.
    pub fn append(&mut self, step: Step) -> Result<(), HistoryError> {
        self.check_extends(step.ply)?;
        self.steps.push(step);
        Ok(())
    }

    /// Move the cursor to `ply`.
    pub fn jump(&mut self, ply: u32) -> Result<JumpDirection, HistoryError> {
        let (first, last) = (self.first_ply(), self.last_ply());
        if ply < first || ply > last {
            return Err(HistoryError::OutOfRange { ply, first, last });
        }
        let direction = match ply.cmp(&self.cursor) {
            std::cmp::Ordering::Greater => JumpDirection::Forward,
            std::cmp::Ordering::Less => JumpDirection::Backward,
            std::cmp::Ordering::Equal => JumpDirection::Stay,
        };
        self.cursor = ply;
        Ok(direction)
    }

    /// Move the cursor to the last known ply.
    pub fn go_live(&mut self) {
        self.cursor = self.last_ply();
    }

    pub fn fingerprint(&self) -> String {
        steps_hash(&self.steps)
    }

    /// Replace every step with a freshly fetched list.
    ///
    /// The cursor jumps to the new live ply only when the fingerprint
    /// changed; otherwise a reader browsing older plies stays put. Returns
    /// whether the cursor was reset.
    pub fn reload(&mut self, steps: Vec<Step>) -> Result<bool, HistoryError> {
        let incoming = PlyHistory::new(steps)?;
        let changed = steps_hash(&incoming.steps) != self.fingerprint();
        let cursor = if changed {
            incoming.last_ply()
        } else {
            self.cursor
                .clamp(incoming.first_ply(), incoming.last_ply())
        };
        self.steps = incoming.steps;
        self.cursor = cursor;
        Ok(changed)
    }
}

fn check_contiguous(steps: &[Step]) -> Result<(), HistoryError> {
    for pair in steps.windows(2) {
        let expected = pair[0].ply + 1;
        if pair[1].ply != expected {
            return Err(HistoryError::SequenceViolation {
                expected,
                got: pair[1].ply,
            });
        }
    }
    Ok(())
}
