// Types for session persistence

use crate::sequencer::note::{MidiNumber, Seconds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serialized note event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNoteEvent {
    pub midi_number: MidiNumber,
    pub on_time: Seconds,
    /// `null` for a note that was never released
    #[serde(default)]
    pub off_time: Option<Seconds>,
}

/// Serialized recording session
///
/// ```json
/// { "events": [ { "midiNumber": 60, "onTime": 10.0, "offTime": 10.5 } ],
///   "startTime": 10.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSession {
    pub events: Vec<SerializedNoteEvent>,
    /// `null` only for an empty session that was never started
    #[serde(default)]
    pub start_time: Option<Seconds>,
}

/// A named session as handed to a session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    pub saved_at: DateTime<Utc>,
    pub data: SerializedSession,
}

impl SavedSession {
    pub fn new(name: impl Into<String>, data: SerializedSession) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            user_id: None,
            saved_at: Utc::now(),
            data,
        }
    }

    pub fn with_user(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}
