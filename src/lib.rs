// keyreplay - live note recording and timed replay
//
// Captures note-on/note-off during a performance into an event log and
// replays it later through any playback target with the original timing.

pub mod config;
pub mod messaging;
pub mod midi;
pub mod persistence;
pub mod sequencer;
pub mod session;

// Re-export commonly used types for convenience
pub use config::SessionConfig;
pub use messaging::channels::create_notification_channel;
pub use midi::event::MidiEvent;
pub use persistence::{
    FileSessionStore, MemorySessionStore, SavedSession, SerializedSession, SessionStore,
};
pub use sequencer::{
    Clock, EventLog, ManualClock, MidiNumber, NoteEvent, PlaybackTarget, Recorder,
    RecordingState, Scheduler, Seconds, SystemClock, VoiceHandle,
};
pub use session::{InstrumentLoader, SessionController, SessionError};
