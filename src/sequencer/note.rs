// Note events captured during a live performance
// A note event is a pitch with an onset time and, once released, a release time

use crate::session::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock time in seconds since the Unix epoch
pub type Seconds = f64;

/// MIDI note number (0-127, where 60 = C4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MidiNumber(u8);

impl MidiNumber {
    pub const MAX: u8 = 127;

    pub fn new(value: u8) -> Result<Self, SessionError> {
        if value > Self::MAX {
            return Err(SessionError::InvalidMidiNumber(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Get the note name (e.g., "C4", "A#5")
    pub fn note_name(self) -> String {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];

        let octave = (self.0 / 12) as i32 - 1;
        let note_index = (self.0 % 12) as usize;

        format!("{}{}", NOTE_NAMES[note_index], octave)
    }
}

impl TryFrom<u8> for MidiNumber {
    type Error = SessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MidiNumber> for u8 {
    fn from(midi: MidiNumber) -> Self {
        midi.0
    }
}

impl fmt::Display for MidiNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recorded note
///
/// `off_time` stays unset until the matching release arrives. Only the owning
/// `EventLog` can close an event, so a closed event never changes again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    midi_number: MidiNumber,
    on_time: Seconds,
    off_time: Option<Seconds>,
}

impl NoteEvent {
    /// Build an event from stored parts
    ///
    /// No ordering check happens here: persisted data may carry a release
    /// before its onset, and replay reports those individually.
    pub fn new(midi_number: MidiNumber, on_time: Seconds, off_time: Option<Seconds>) -> Self {
        Self {
            midi_number,
            on_time,
            off_time,
        }
    }

    pub(crate) fn open(midi_number: MidiNumber, on_time: Seconds) -> Self {
        Self::new(midi_number, on_time, None)
    }

    pub(crate) fn close(&mut self, off_time: Seconds) {
        debug_assert!(self.off_time.is_none(), "note event closed twice");
        self.off_time = Some(off_time.max(self.on_time));
    }

    pub fn midi_number(&self) -> MidiNumber {
        self.midi_number
    }

    pub fn on_time(&self) -> Seconds {
        self.on_time
    }

    pub fn off_time(&self) -> Option<Seconds> {
        self.off_time
    }

    /// True while the note is still held
    pub fn is_open(&self) -> bool {
        self.off_time.is_none()
    }

    /// Elapsed time between onset and release
    ///
    /// `Ok(None)` for a note that was never released.
    pub fn hold_duration(&self) -> Result<Option<Seconds>, SessionError> {
        match self.off_time {
            None => Ok(None),
            Some(off_time) if off_time < self.on_time => Err(SessionError::InvalidEventOrder {
                midi_number: self.midi_number.value(),
                on_time: self.on_time,
                off_time,
            }),
            Some(off_time) => Ok(Some(off_time - self.on_time)),
        }
    }
}
