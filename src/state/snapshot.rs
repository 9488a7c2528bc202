//! Full game snapshots.
//!
//! A snapshot is what the server sends when a round is opened or reloaded:
//! metadata, every step, and the clock. The same shape is persisted for
//! offline viewing of correspondence games.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::clock::{ClockData, CorrespondenceData};
use super::history::Step;
use super::meta::GameMeta;

/// Snapshot errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot has no steps")]
    NoSteps,
}

/// Game snapshot as served by the round endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    #[serde(flatten)]
    pub meta: GameMeta,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<ClockData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correspondence: Option<CorrespondenceData>,
}

impl GameData {
    pub fn from_json(s: &str) -> Result<Self, SnapshotError> {
        let data: Self = serde_json::from_str(s)?;
        if data.steps.is_empty() {
            return Err(SnapshotError::NoSteps);
        }
        Ok(data)
    }

    pub fn last_ply(&self) -> Option<u32> {
        self.steps.last().map(|s| s.ply)
    }
}

/// A snapshot stored for offline use.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSnapshot {
    pub game_id: String,
    pub saved_at: chrono::DateTime<chrono::Utc>,
    pub data: GameData,
}

impl OfflineSnapshot {
    pub fn new(data: GameData) -> Self {
        Self {
            game_id: data.meta.game.id.clone(),
            saved_at: chrono::Utc::now(),
            data,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
