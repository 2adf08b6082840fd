// Session error types

/// Errors raised while recording, replaying or restoring a session
///
/// None of these are fatal: each is recovered at the session or event level.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session already started")]
    AlreadyStarted,

    #[error("Note {midi_number} released at {off_time} before its onset at {on_time}")]
    InvalidEventOrder {
        midi_number: u8,
        on_time: f64,
        off_time: f64,
    },

    #[error("Invalid session data: {0}")]
    Deserialization(String),

    #[error("MIDI number {0} is outside 0-127")]
    InvalidMidiNumber(u8),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No instrument loaded")]
    InstrumentNotLoaded,

    #[error("Instrument error: {0}")]
    Instrument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
