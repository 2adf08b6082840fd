// Legacy payload migration
//
// Early recordings were stored as one flat JSON array: note entries newest
// first, each `{ "midiNumber", "time1", "time2"? }` plus player bookkeeping,
// with a trailing `{ "startTime" }` entry.

use crate::persistence::types::{SerializedNoteEvent, SerializedSession};
use crate::sequencer::note::MidiNumber;
use crate::session::SessionError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyEntry {
    midi_number: Option<u8>,
    time1: Option<f64>,
    time2: Option<f64>,
    start_time: Option<f64>,
}

/// True when `value` has the legacy array shape
pub fn is_legacy_payload(value: &Value) -> bool {
    value.is_array()
}

/// Convert a legacy array payload to the current format
///
/// Entries without a MIDI number carry no note and are dropped. The start time
/// is taken from the last entry that has one.
pub fn migrate_legacy(value: &Value) -> Result<SerializedSession, SessionError> {
    let entries: Vec<LegacyEntry> = serde_json::from_value(value.clone()).map_err(|e| {
        SessionError::Deserialization(format!("Invalid legacy session payload: {}", e))
    })?;

    let start_time = entries.iter().rev().find_map(|entry| entry.start_time);

    let mut events = Vec::new();
    // Stored newest first
    for entry in entries.iter().rev() {
        let Some(midi_number) = entry.midi_number else {
            continue;
        };
        let on_time = entry.time1.ok_or_else(|| {
            SessionError::Deserialization(format!(
                "legacy entry for note {} has no onset time",
                midi_number
            ))
        })?;

        events.push(SerializedNoteEvent {
            midi_number: MidiNumber::new(midi_number)
                .map_err(|e| SessionError::Deserialization(e.to_string()))?,
            on_time,
            off_time: entry.time2,
        });
    }

    log::info!("Migrated legacy session payload with {} events", events.len());

    Ok(SerializedSession { events, start_time })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_legacy_payload() {
        let legacy = r#"[
            {"audioNode": {}, "midiNumber": 64, "time1": 10.2, "time2": 10.6},
            {"audioNode": {}, "midiNumber": 60, "time1": 10.0, "time2": 10.5},
            {"startTime": 10.0}
        ]"#;

        let session = SerializedSession::parse_any(legacy).unwrap();

        assert_eq!(session.start_time, Some(10.0));
        assert_eq!(session.events.len(), 2);
        assert_eq!(session.events[0].midi_number.value(), 60);
        assert_eq!(session.events[0].off_time, Some(10.5));
        assert_eq!(session.events[1].midi_number.value(), 64);
        assert_eq!(session.events[1].on_time, 10.2);
    }

    #[test]
    fn test_legacy_unreleased_note() {
        let legacy = r#"[{"midiNumber": 60, "time1": 3.0}, {"startTime": 2.5}]"#;
        let session = SerializedSession::parse_any(legacy).unwrap();
        assert_eq!(session.events[0].off_time, None);
    }

    #[test]
    fn test_legacy_without_start_time_is_rejected() {
        let legacy = r#"[{"midiNumber": 60, "time1": 3.0, "time2": 3.5}]"#;
        assert!(matches!(
            SerializedSession::parse_any(legacy),
            Err(SessionError::Deserialization(_))
        ));
    }

    #[test]
    fn test_current_format_passes_through_parse_any() {
        let json = r#"{"events":[{"midiNumber":60,"onTime":1.0,"offTime":1.5}],"startTime":1.0}"#;
        let session = SerializedSession::parse_any(json).unwrap();
        assert_eq!(session, SerializedSession::from_json(json).unwrap());
    }

    #[test]
    fn test_is_legacy_payload() {
        assert!(is_legacy_payload(&serde_json::json!([])));
        assert!(!is_legacy_payload(&serde_json::json!({"events": []})));
    }
}
