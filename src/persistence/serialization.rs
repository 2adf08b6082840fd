// Conversion between event logs and the serialized session format

use crate::persistence::migration::{is_legacy_payload, migrate_legacy};
use crate::persistence::types::{SerializedNoteEvent, SerializedSession};
use crate::sequencer::event_log::EventLog;
use crate::sequencer::note::NoteEvent;
use crate::session::SessionError;

impl SerializedSession {
    /// Snapshot an event log
    pub fn from_log(log: &EventLog) -> Self {
        Self {
            events: log
                .events()
                .iter()
                .map(|event| SerializedNoteEvent {
                    midi_number: event.midi_number(),
                    on_time: event.on_time(),
                    off_time: event.off_time(),
                })
                .collect(),
            start_time: log.start_time(),
        }
    }

    /// Rebuild an event log
    ///
    /// Releases stamped before their onset are kept as-is; replay skips them.
    pub fn to_log(&self) -> Result<EventLog, SessionError> {
        self.validate()?;

        let events = self
            .events
            .iter()
            .map(|event| NoteEvent::new(event.midi_number, event.on_time, event.off_time))
            .collect();

        EventLog::from_parts(self.start_time, events)
    }

    /// Check the payload can be replayed at all
    pub fn validate(&self) -> Result<(), SessionError> {
        match self.start_time {
            Some(start) if !start.is_finite() => {
                return Err(SessionError::Deserialization(format!(
                    "start time {} is not a finite number",
                    start
                )));
            }
            None if !self.events.is_empty() => {
                return Err(SessionError::Deserialization(
                    "missing start time for a non-empty session".to_string(),
                ));
            }
            _ => {}
        }

        for (index, event) in self.events.iter().enumerate() {
            let off_ok = event.off_time.is_none_or(f64::is_finite);
            if !event.on_time.is_finite() || !off_ok {
                return Err(SessionError::Deserialization(format!(
                    "event {} has a non-finite timestamp",
                    index
                )));
            }
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the current JSON format
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let session: Self = serde_json::from_str(json).map_err(|e| {
            SessionError::Deserialization(format!("Failed to parse session JSON: {}", e))
        })?;
        session.validate()?;
        Ok(session)
    }

    /// Parse either the current format or the legacy array format
    pub fn parse_any(json: &str) -> Result<Self, SessionError> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            SessionError::Deserialization(format!("Failed to parse session JSON: {}", e))
        })?;

        let session = if is_legacy_payload(&value) {
            migrate_legacy(&value)?
        } else {
            serde_json::from_value(value).map_err(|e| {
                SessionError::Deserialization(format!("Invalid session payload: {}", e))
            })?
        };

        session.validate()?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::note::MidiNumber;

    fn midi(value: u8) -> MidiNumber {
        MidiNumber::new(value).unwrap()
    }

    #[test]
    fn test_json_field_names() {
        let mut log = EventLog::new();
        log.begin(10.0).unwrap();
        log.record_onset(midi(60), 10.0);
        log.release_pitch(midi(60), 10.5);
        log.record_onset(midi(64), 10.2);

        let json = SerializedSession::from_log(&log).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["startTime"], 10.0);
        assert_eq!(value["events"][0]["midiNumber"], 60);
        assert_eq!(value["events"][0]["offTime"], 10.5);
        assert!(value["events"][1]["offTime"].is_null());
    }

    #[test]
    fn test_log_round_trip_keeps_open_notes() {
        let mut log = EventLog::new();
        log.record_onset(midi(60), 1.0);
        log.record_onset(midi(60), 1.5);
        log.release_pitch(midi(60), 2.0);

        let json = SerializedSession::from_log(&log).to_json().unwrap();
        let restored = SerializedSession::from_json(&json).unwrap().to_log().unwrap();

        assert_eq!(restored, log);
        assert_eq!(restored.open_count(), 1);
    }

    #[test]
    fn test_empty_unstarted_log_round_trip() {
        let log = EventLog::new();
        let json = SerializedSession::from_log(&log).to_json().unwrap();
        assert!(json.contains("\"startTime\":null"));

        let restored = SerializedSession::from_json(&json).unwrap().to_log().unwrap();
        assert_eq!(restored, log);
    }

    #[test]
    fn test_missing_start_time_is_rejected() {
        let json = r#"{"events":[{"midiNumber":60,"onTime":1.0,"offTime":null}]}"#;
        assert!(matches!(
            SerializedSession::from_json(json),
            Err(SessionError::Deserialization(_))
        ));
    }

    #[test]
    fn test_out_of_range_midi_number_is_rejected() {
        let json = r#"{"events":[{"midiNumber":200,"onTime":1.0,"offTime":null}],"startTime":1.0}"#;
        assert!(matches!(
            SerializedSession::from_json(json),
            Err(SessionError::Deserialization(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(
            SerializedSession::from_json("{\"events\": ["),
            Err(SessionError::Deserialization(_))
        ));
        assert!(matches!(
            SerializedSession::parse_any("42"),
            Err(SessionError::Deserialization(_))
        ));
    }

    #[test]
    fn test_missing_off_time_reads_as_open() {
        let json = r#"{"events":[{"midiNumber":60,"onTime":1.0}],"startTime":1.0}"#;
        let session = SerializedSession::from_json(json).unwrap();
        assert_eq!(session.events[0].off_time, None);
    }

    #[test]
    fn test_corrupt_order_survives_loading() {
        let json = r#"{"events":[{"midiNumber":60,"onTime":10.0,"offTime":9.0}],"startTime":10.0}"#;
        let log = SerializedSession::from_json(json).unwrap().to_log().unwrap();
        assert_eq!(log.events()[0].off_time(), Some(9.0));
    }
}
