// Playback target - the sound-producing side of live play and replay

use crate::sequencer::note::{MidiNumber, Seconds};
use crate::sequencer::timing::TimeSource;

/// Handle to a sounding voice returned by `PlaybackTarget::trigger`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle {
    pub midi_number: MidiNumber,
    pub voice_id: u64,
}

/// Something that can sound notes (an instrument)
///
/// Releasing an unknown or already stopped voice must be a no-op.
pub trait PlaybackTarget {
    /// Start sounding `midi_number`
    fn trigger(&mut self, midi_number: MidiNumber) -> VoiceHandle;

    /// Stop every voice of `midi_number`
    fn release(&mut self, midi_number: MidiNumber);

    /// Stop one specific voice
    ///
    /// Targets without per-voice control can rely on the default, which
    /// releases the whole pitch.
    fn release_voice(&mut self, voice: VoiceHandle) {
        self.release(voice.midi_number);
    }

    /// Panic stop
    fn release_all(&mut self);
}

/// A call received by a `CapturingTarget`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCall {
    Trigger(VoiceHandle),
    Release(MidiNumber),
    ReleaseVoice(VoiceHandle),
    ReleaseAll,
}

/// Playback target that captures timestamped calls instead of making sound
///
/// Useful for offline inspection of a replay and in tests.
#[derive(Debug)]
pub struct CapturingTarget<T: TimeSource> {
    time: T,
    next_voice_id: u64,
    calls: Vec<(Seconds, PlaybackCall)>,
}

impl<T: TimeSource> CapturingTarget<T> {
    pub fn new(time: T) -> Self {
        Self {
            time,
            next_voice_id: 1,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[(Seconds, PlaybackCall)] {
        &self.calls
    }

    /// Times at which `midi_number` was triggered
    pub fn trigger_times(&self, midi_number: MidiNumber) -> Vec<Seconds> {
        self.calls
            .iter()
            .filter_map(|(time, call)| match call {
                PlaybackCall::Trigger(voice) if voice.midi_number == midi_number => Some(*time),
                _ => None,
            })
            .collect()
    }

    /// Times at which `midi_number` was released, by pitch or by voice
    pub fn release_times(&self, midi_number: MidiNumber) -> Vec<Seconds> {
        self.calls
            .iter()
            .filter_map(|(time, call)| match call {
                PlaybackCall::Release(midi) if *midi == midi_number => Some(*time),
                PlaybackCall::ReleaseVoice(voice) if voice.midi_number == midi_number => {
                    Some(*time)
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    fn push(&mut self, call: PlaybackCall) {
        let now = self.time.now();
        self.calls.push((now, call));
    }
}

impl<T: TimeSource> PlaybackTarget for CapturingTarget<T> {
    fn trigger(&mut self, midi_number: MidiNumber) -> VoiceHandle {
        let voice = VoiceHandle {
            midi_number,
            voice_id: self.next_voice_id,
        };
        self.next_voice_id += 1;
        self.push(PlaybackCall::Trigger(voice));
        voice
    }

    fn release(&mut self, midi_number: MidiNumber) {
        self.push(PlaybackCall::Release(midi_number));
    }

    fn release_voice(&mut self, voice: VoiceHandle) {
        self.push(PlaybackCall::ReleaseVoice(voice));
    }

    fn release_all(&mut self) {
        self.push(PlaybackCall::ReleaseAll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::timing::ManualClock;

    #[test]
    fn test_capturing_target_stamps_calls() {
        let clock = ManualClock::new(0.0);
        let mut target = CapturingTarget::new(clock.clone());
        let c4 = MidiNumber::new(60).unwrap();

        let voice = target.trigger(c4);
        clock.advance(0.5);
        target.release_voice(voice);
        target.release_all();

        assert_eq!(target.trigger_times(c4), vec![0.0]);
        assert_eq!(target.release_times(c4), vec![0.5]);
        assert_eq!(target.calls().len(), 3);
        assert_eq!(target.calls()[2], (0.5, PlaybackCall::ReleaseAll));
    }

    #[test]
    fn test_voice_ids_are_unique() {
        let mut target = CapturingTarget::new(ManualClock::new(0.0));
        let c4 = MidiNumber::new(60).unwrap();

        let first = target.trigger(c4);
        let second = target.trigger(c4);
        assert_ne!(first, second);
    }
}
