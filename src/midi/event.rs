// MIDI note events from raw input bytes

use crate::sequencer::note::MidiNumber;

/// Note messages the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { note: MidiNumber, velocity: u8 },
    NoteOff { note: MidiNumber },
}

impl MidiEvent {
    /// Parse a raw MIDI message
    ///
    /// Returns None for anything that is not a well-formed note message. The
    /// channel nibble is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let [note, velocity, ..] = *data else {
            return None;
        };
        let note = MidiNumber::new(note).ok()?;

        match status & 0xF0 {
            // Velocity 0 = Note Off
            0x90 if velocity == 0 => Some(MidiEvent::NoteOff { note }),
            0x90 if velocity <= 127 => Some(MidiEvent::NoteOn { note, velocity }),
            0x80 => Some(MidiEvent::NoteOff { note }),
            _ => None,
        }
    }

    pub fn note(&self) -> MidiNumber {
        match *self {
            MidiEvent::NoteOn { note, .. } | MidiEvent::NoteOff { note } => note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        let bytes = [0x90, 60, 100]; // Note On, note 60 (C4), velocity 100
        let event = MidiEvent::from_bytes(&bytes).unwrap();

        match event {
            MidiEvent::NoteOn { note, velocity } => {
                assert_eq!(note.value(), 60);
                assert_eq!(velocity, 100);
            }
            _ => panic!("Expected NoteOn event"),
        }
    }

    #[test]
    fn test_note_off_explicit() {
        let event = MidiEvent::from_bytes(&[0x80, 60, 0]).unwrap();
        assert_eq!(event, MidiEvent::NoteOff { note: MidiNumber::new(60).unwrap() });
    }

    #[test]
    fn test_note_off_velocity_zero() {
        // Note On with velocity 0 = Note Off
        let event = MidiEvent::from_bytes(&[0x90, 64, 0]).unwrap();
        assert_eq!(event, MidiEvent::NoteOff { note: MidiNumber::new(64).unwrap() });
    }

    #[test]
    fn test_non_note_messages_ignored() {
        assert!(MidiEvent::from_bytes(&[0xB0, 7, 127]).is_none()); // CC
        assert!(MidiEvent::from_bytes(&[0xE0, 0x00, 0x40]).is_none()); // Pitch bend
        assert!(MidiEvent::from_bytes(&[0xF0, 0x00, 0x00]).is_none());
    }

    #[test]
    fn test_invalid_messages() {
        assert!(MidiEvent::from_bytes(&[]).is_none());
        assert!(MidiEvent::from_bytes(&[0x90, 60]).is_none()); // Note On without velocity
        assert!(MidiEvent::from_bytes(&[0x90, 200, 100]).is_none()); // Note out of range
        assert!(MidiEvent::from_bytes(&[0x90, 60, 200]).is_none()); // Velocity out of range
    }

    #[test]
    fn test_midi_channel_ignored() {
        let channel_0 = MidiEvent::from_bytes(&[0x90, 60, 100]).unwrap();
        let channel_15 = MidiEvent::from_bytes(&[0x9F, 60, 100]).unwrap();
        assert_eq!(channel_0, channel_15);
        assert_eq!(channel_0.note().value(), 60);
    }
}
