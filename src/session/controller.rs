// Session controller - owns the event log and drives recording and replay

use crate::config::SessionConfig;
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::event::MidiEvent;
use crate::persistence::store::{SessionStore, StoreError};
use crate::persistence::types::{SavedSession, SerializedSession};
use crate::sequencer::event_log::EventLog;
use crate::sequencer::midi_recorder::{Recorder, RecordingState};
use crate::sequencer::note::MidiNumber;
use crate::sequencer::playback::{PlaybackTarget, VoiceHandle};
use crate::sequencer::player::{ReplayReport, Scheduler};
use crate::sequencer::timing::Clock;
use crate::session::SessionError;
use crate::session::instrument::{InstrumentLoader, InstrumentRequest};
use ringbuf::traits::Producer;
use std::collections::HashMap;
use uuid::Uuid;

/// One recording session with its instrument
///
/// Everything runs on the caller's thread: `tick` (or `run_until_idle`) is
/// the event loop that fires replay timers.
pub struct SessionController<L: InstrumentLoader> {
    config: SessionConfig,
    clock: Clock,
    log: EventLog,
    recorder: Recorder,
    scheduler: Scheduler,
    loader: L,
    instrument_name: String,
    instrument: Option<L::Target>,
    /// Live voices per pitch, most recent last
    live_voices: HashMap<MidiNumber, Vec<VoiceHandle>>,
    notifications: Option<NotificationProducer>,
}

impl<L: InstrumentLoader> SessionController<L> {
    /// Create a controller and load the configured instrument
    ///
    /// A failed load leaves the controller usable but loading; see
    /// `set_instrument`.
    pub fn new(config: SessionConfig, clock: Clock, loader: L) -> Self {
        Self::build(config, clock, loader, None)
    }

    /// Like `new`, reporting recoverable errors on `producer` from the first load on
    pub fn with_notification_channel(
        config: SessionConfig,
        clock: Clock,
        loader: L,
        producer: NotificationProducer,
    ) -> Self {
        Self::build(config, clock, loader, Some(producer))
    }

    fn build(
        config: SessionConfig,
        clock: Clock,
        loader: L,
        notifications: Option<NotificationProducer>,
    ) -> Self {
        let instrument_name = config.instrument_name.clone();
        let mut controller = Self {
            config,
            clock,
            log: EventLog::new(),
            recorder: Recorder::new(),
            scheduler: Scheduler::new(),
            loader,
            instrument_name,
            instrument: None,
            live_voices: HashMap::new(),
            notifications,
        };

        // Failure is already reported; the controller stays loading
        let _ = controller.load_instrument();
        controller
    }

    /// Attach a notification channel for recoverable errors
    pub fn with_notifications(mut self, producer: NotificationProducer) -> Self {
        self.notifications = Some(producer);
        self
    }

    fn notify(&mut self, notification: Notification) {
        if let Some(producer) = self.notifications.as_mut() {
            // Full ring: the host is not draining, drop it
            let _ = producer.try_push(notification);
        }
    }

    /// Switch instrument, reloading only when the name changes
    pub fn set_instrument(&mut self, name: &str) -> Result<(), SessionError> {
        if name == self.instrument_name && self.instrument.is_some() {
            return Ok(());
        }
        self.instrument_name = name.to_string();
        self.load_instrument()
    }

    fn load_instrument(&mut self) -> Result<(), SessionError> {
        // Replay voices belong to the old instrument; its handles mean nothing to the next one
        let cancelled = self.scheduler.cancel_all();
        if !cancelled.is_empty() {
            log::debug!("Instrument change cut {} replay voice(s)", cancelled.len());
        }

        // Silence and drop the old instrument first; loading until the new one arrives
        if let Some(mut old) = self.instrument.take() {
            old.release_all();
        }
        self.live_voices.clear();

        let request = InstrumentRequest::from_config(&self.config, &self.instrument_name);
        log::info!("Loading instrument '{}' from {}", request.name, request.url);

        match self.loader.load(&request) {
            Ok(instrument) => {
                self.instrument = Some(instrument);
                Ok(())
            }
            Err(e) => {
                let e = match e {
                    SessionError::Instrument(_) => e,
                    other => SessionError::Instrument(other.to_string()),
                };
                log::warn!("Instrument '{}' failed to load: {}", self.instrument_name, e);
                self.notify(Notification::error(
                    NotificationCategory::Instrument,
                    e.to_string(),
                ));
                Err(e)
            }
        }
    }

    pub fn instrument_name(&self) -> &str {
        &self.instrument_name
    }

    /// True while no instrument is available
    pub fn is_loading(&self) -> bool {
        self.instrument.is_none()
    }

    pub fn instrument(&self) -> Option<&L::Target> {
        self.instrument.as_ref()
    }

    pub fn instrument_mut(&mut self) -> Option<&mut L::Target> {
        self.instrument.as_mut()
    }

    /// Sound a note and record its onset when recording
    pub fn play_note(&mut self, midi_number: MidiNumber) -> Result<(), SessionError> {
        let instrument = self
            .instrument
            .as_mut()
            .ok_or(SessionError::InstrumentNotLoaded)?;

        let voice = instrument.trigger(midi_number);
        self.live_voices.entry(midi_number).or_default().push(voice);
        self.recorder.note_on(&mut self.log, &self.clock, midi_number);
        Ok(())
    }

    /// Release the most recent live voice of a pitch and record the release
    pub fn stop_note(&mut self, midi_number: MidiNumber) {
        let voice = self
            .live_voices
            .get_mut(&midi_number)
            .and_then(|voices| voices.pop());

        if let (Some(voice), Some(instrument)) = (voice, self.instrument.as_mut()) {
            instrument.release_voice(voice);
        }
        self.recorder.note_off(&mut self.log, &self.clock, midi_number);
    }

    /// Stop every live voice, including ones that never got a note-off
    pub fn stop_all_notes(&mut self) {
        for (midi_number, voices) in std::mem::take(&mut self.live_voices) {
            for _ in voices {
                self.recorder.note_off(&mut self.log, &self.clock, midi_number);
            }
        }
        if let Some(instrument) = self.instrument.as_mut() {
            instrument.release_all();
        }
    }

    pub fn handle_midi(&mut self, event: MidiEvent) -> Result<(), SessionError> {
        match event {
            MidiEvent::NoteOn { note, .. } => self.play_note(note),
            MidiEvent::NoteOff { note } => {
                self.stop_note(note);
                Ok(())
            }
        }
    }

    /// Route a raw MIDI message; non-note messages are ignored
    pub fn handle_midi_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        match MidiEvent::from_bytes(bytes) {
            Some(event) => self.handle_midi(event),
            None => Ok(()),
        }
    }

    /// Start (or resume) recording
    ///
    /// In-flight replays are cancelled so they can't bleed into the take.
    /// Already recording: nothing happens.
    pub fn start_recording(&mut self) {
        if self.recorder.state().is_recording() {
            return;
        }
        self.stop_playback();
        self.recorder.start(&mut self.log, &self.clock);
        self.notify(Notification::info(
            NotificationCategory::Recording,
            "Recording started".to_string(),
        ));
    }

    pub fn stop_recording(&mut self) {
        if !self.recorder.state().is_recording() {
            return;
        }
        self.recorder.stop();
        self.notify(Notification::info(
            NotificationCategory::Recording,
            format!("Recording stopped with {} note(s)", self.log.len()),
        ));
    }

    /// Discard the recording
    pub fn clear_recording(&mut self) -> Result<(), SessionError> {
        self.recorder.clear(&mut self.log)?;
        self.stop_playback();
        Ok(())
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Snapshot the recording under `name`
    pub fn save_recording(&self, name: &str) -> SavedSession {
        SavedSession::new(name, SerializedSession::from_log(&self.log))
    }

    /// Save the recording to `store`
    pub fn persist<S: SessionStore>(&self, store: &mut S, name: &str) -> Result<Uuid, StoreError> {
        let id = store.save(&self.save_recording(name))?;
        log::info!("Recording '{}' persisted as {}", name, id);
        Ok(id)
    }

    /// Rebuild an event log from a serialized session
    pub fn load_recording(&mut self, serialized: &SerializedSession) -> Result<EventLog, SessionError> {
        serialized.to_log().inspect_err(|e| {
            log::warn!("Failed to load recording: {}", e);
            self.notify(Notification::error(
                NotificationCategory::Persistence,
                e.to_string(),
            ));
        })
    }

    /// Replay the controller's own recording
    pub fn play_recording(&mut self) -> Result<ReplayReport, SessionError> {
        if self.instrument.is_none() {
            return Err(SessionError::InstrumentNotLoaded);
        }
        let report = self.scheduler.replay(&self.log, self.clock.now());
        self.report_skipped(&report);
        Ok(report)
    }

    /// Replay a serialized session without touching the controller's recording
    pub fn play_external_recording(
        &mut self,
        serialized: &SerializedSession,
    ) -> Result<ReplayReport, SessionError> {
        if self.instrument.is_none() {
            return Err(SessionError::InstrumentNotLoaded);
        }
        let log = self.load_recording(serialized)?;
        let report = self.scheduler.replay(&log, self.clock.now());
        self.report_skipped(&report);
        Ok(report)
    }

    /// Load a saved session from `store` and replay it
    pub fn play_saved<S: SessionStore>(
        &mut self,
        store: &S,
        id: Uuid,
    ) -> Result<ReplayReport, StoreError> {
        let saved = store.load(id)?;
        Ok(self.play_external_recording(&saved.data)?)
    }

    fn report_skipped(&mut self, report: &ReplayReport) {
        let messages: Vec<String> = report.skipped.iter().map(ToString::to_string).collect();
        for message in messages {
            self.notify(Notification::warning(NotificationCategory::Playback, message));
        }
    }

    /// Cancel every in-flight replay and silence what it left sounding
    pub fn stop_playback(&mut self) {
        let sounding = self.scheduler.cancel_all();
        if let Some(instrument) = self.instrument.as_mut() {
            for voice in sounding {
                instrument.release_voice(voice);
            }
        }
    }

    /// Fire every replay timer due now
    ///
    /// Timers stay queued while no instrument is loaded.
    pub fn tick(&mut self) -> usize {
        let Some(instrument) = self.instrument.as_mut() else {
            return 0;
        };
        self.scheduler.poll(self.clock.now(), instrument)
    }

    /// Run the event loop until no replay timer is left
    ///
    /// Sleeps on the clock between deadlines. Returns the number of timers fired.
    pub fn run_until_idle(&mut self) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.scheduler.next_deadline() {
            if self.instrument.is_none() {
                break;
            }
            self.clock.sleep_until(deadline);
            fired += self.tick();
        }
        fired
    }

    pub fn is_playing(&self) -> bool {
        !self.scheduler.is_idle()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
