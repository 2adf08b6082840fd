// MIDI Recorder - captures live note-on/note-off into an event log
// Only records while the recording state is Recording

use crate::sequencer::event_log::{EventHandle, EventLog};
use crate::sequencer::note::MidiNumber;
use crate::sequencer::timing::Clock;
use crate::session::SessionError;

/// Recording state (idle/recording/stopped)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Stopped,
}

impl RecordingState {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording)
    }

    /// Clearing is only allowed once recording is not in progress
    pub fn can_clear(&self) -> bool {
        matches!(self, RecordingState::Idle | RecordingState::Stopped)
    }
}

/// Live note recorder
///
/// The recorder only owns its state machine. The event log and clock are
/// borrowed for the duration of each call, so nothing outlives a session.
#[derive(Debug, Default)]
pub struct Recorder {
    state: RecordingState,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Enter the Recording state
    ///
    /// Starts the session clock on an unstarted log. Calling it while already
    /// recording does nothing; calling it after a stop resumes into the same log.
    pub fn start(&mut self, log: &mut EventLog, clock: &Clock) {
        if self.state.is_recording() {
            return;
        }

        match log.begin(clock.now()) {
            Ok(start_time) => log::debug!("Recording session started at {:.3}", start_time),
            Err(SessionError::AlreadyStarted) => {
                log::debug!("Resuming recording into a started session")
            }
            Err(e) => log::warn!("Could not start session clock: {}", e),
        }

        self.state = RecordingState::Recording;
    }

    pub fn stop(&mut self) {
        if self.state.is_recording() {
            log::debug!("Recording stopped");
            self.state = RecordingState::Stopped;
        }
    }

    /// Empty the log and return to Idle
    pub fn clear(&mut self, log: &mut EventLog) -> Result<(), SessionError> {
        if !self.state.can_clear() {
            return Err(SessionError::InvalidState(
                "cannot clear while recording".to_string(),
            ));
        }
        log.clear();
        self.state = RecordingState::Idle;
        Ok(())
    }

    /// Observe a note-on
    pub fn note_on(
        &mut self,
        log: &mut EventLog,
        clock: &Clock,
        midi_number: MidiNumber,
    ) -> Option<EventHandle> {
        if !self.state.is_recording() {
            return None;
        }
        Some(log.record_onset(midi_number, clock.now()))
    }

    /// Observe a note-off
    pub fn note_off(&mut self, log: &mut EventLog, clock: &Clock, midi_number: MidiNumber) -> bool {
        if !self.state.is_recording() {
            return false;
        }
        log.release_pitch(midi_number, clock.now())
    }
}
