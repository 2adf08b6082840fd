// Event log - ordered store of note events for one recording session

use crate::sequencer::note::{MidiNumber, NoteEvent, Seconds};
use crate::session::SessionError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

fn next_generation() -> u64 {
    static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Handle to an onset returned by `EventLog::record_onset`
///
/// Only valid for the log (and session) that produced it: clearing the log
/// invalidates every outstanding handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHandle {
    generation: u64,
    index: usize,
    midi_number: MidiNumber,
}

impl EventHandle {
    pub fn midi_number(&self) -> MidiNumber {
        self.midi_number
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Recorded note events of one session, in onset order
#[derive(Debug, Clone)]
pub struct EventLog {
    start_time: Option<Seconds>,
    events: Vec<NoteEvent>,
    /// Per-pitch stack of indices of events still waiting for a release.
    /// The top of a stack is the most recent unmatched onset for that pitch.
    open_onsets: HashMap<MidiNumber, Vec<usize>>,
    generation: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            start_time: None,
            events: Vec::new(),
            open_onsets: HashMap::new(),
            generation: next_generation(),
        }
    }

    /// Rebuild a log from stored parts
    ///
    /// Open events are re-indexed so a resumed log can still close them.
    pub fn from_parts(
        start_time: Option<Seconds>,
        events: Vec<NoteEvent>,
    ) -> Result<Self, SessionError> {
        if start_time.is_none() && !events.is_empty() {
            return Err(SessionError::Deserialization(
                "session has events but no start time".to_string(),
            ));
        }

        let mut open_onsets: HashMap<MidiNumber, Vec<usize>> = HashMap::new();
        for (index, event) in events.iter().enumerate() {
            if event.is_open() {
                open_onsets
                    .entry(event.midi_number())
                    .or_default()
                    .push(index);
            }
        }

        Ok(Self {
            start_time,
            events,
            open_onsets,
            generation: next_generation(),
        })
    }

    /// Start the session at `now`
    pub fn begin(&mut self, now: Seconds) -> Result<Seconds, SessionError> {
        if self.start_time.is_some() || !self.events.is_empty() {
            return Err(SessionError::AlreadyStarted);
        }
        self.start_time = Some(now);
        Ok(now)
    }

    /// Append a new open event for `midi_number`
    ///
    /// The first onset of an unstarted session also starts it.
    pub fn record_onset(&mut self, midi_number: MidiNumber, now: Seconds) -> EventHandle {
        let start_time = *self.start_time.get_or_insert(now);
        // Onsets are never stamped before the session start
        let on_time = now.max(start_time);

        let index = self.events.len();
        self.events.push(NoteEvent::open(midi_number, on_time));
        self.open_onsets.entry(midi_number).or_default().push(index);

        EventHandle {
            generation: self.generation,
            index,
            midi_number,
        }
    }

    /// Complete the onset behind `handle`
    ///
    /// Stale handles (from a cleared session or another log) are ignored.
    /// Returns false when nothing was closed.
    pub fn record_release(&mut self, handle: EventHandle, now: Seconds) -> bool {
        if handle.generation != self.generation {
            log::trace!("Ignoring release with stale handle for note {}", handle.midi_number);
            return false;
        }
        self.release_pitch(handle.midi_number, now)
    }

    /// Close the most recent open event for `midi_number`
    ///
    /// A release with no matching onset is a no-op.
    pub fn release_pitch(&mut self, midi_number: MidiNumber, now: Seconds) -> bool {
        let Some(index) = self
            .open_onsets
            .get_mut(&midi_number)
            .and_then(|stack| stack.pop())
        else {
            log::trace!("Stray release for note {}", midi_number);
            return false;
        };

        if self.open_onsets.get(&midi_number).is_some_and(Vec::is_empty) {
            self.open_onsets.remove(&midi_number);
        }

        self.events[index].close(now);
        true
    }

    /// Drop every event and forget the start time
    pub fn clear(&mut self) {
        self.start_time = None;
        self.events.clear();
        self.open_onsets.clear();
        self.generation = next_generation();
    }

    pub fn start_time(&self) -> Option<Seconds> {
        self.start_time
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    /// Number of onsets still waiting for a release
    pub fn open_count(&self) -> usize {
        self.open_onsets.values().map(Vec::len).sum()
    }

    /// Time from session start to the last onset or release
    pub fn duration(&self) -> Seconds {
        let Some(start) = self.start_time else {
            return 0.0;
        };
        self.events
            .iter()
            .map(|event| event.off_time().unwrap_or(event.on_time()).max(event.on_time()))
            .fold(start, f64::max)
            - start
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

// Equality is about recorded content; the session generation is bookkeeping.
impl PartialEq for EventLog {
    fn eq(&self, other: &Self) -> bool {
        self.start_time == other.start_time && self.events == other.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn midi(value: u8) -> MidiNumber {
        MidiNumber::new(value).unwrap()
    }

    #[test]
    fn test_begin_sets_start_time_once() {
        let mut log = EventLog::new();
        assert_eq!(log.begin(10.0).unwrap(), 10.0);
        assert!(matches!(log.begin(11.0), Err(SessionError::AlreadyStarted)));
        assert_eq!(log.start_time(), Some(10.0));
    }

    #[test]
    fn test_first_onset_starts_session() {
        let mut log = EventLog::new();
        log.record_onset(midi(60), 12.5);

        assert_eq!(log.start_time(), Some(12.5));
        assert_eq!(log.events()[0].on_time(), 12.5);
        assert!(matches!(log.begin(13.0), Err(SessionError::AlreadyStarted)));
    }

    #[test]
    fn test_release_closes_matching_onset() {
        let mut log = EventLog::new();
        log.begin(0.0).unwrap();
        let handle = log.record_onset(midi(60), 1.0);
        log.record_onset(midi(64), 1.2);

        assert!(log.record_release(handle, 1.5));
        assert_eq!(log.events()[0].off_time(), Some(1.5));
        assert!(log.events()[1].is_open());
        assert_eq!(log.open_count(), 1);
    }

    #[test]
    fn test_repeated_pitch_releases_most_recent_onset() {
        let mut log = EventLog::new();
        log.record_onset(midi(60), 1.0);
        log.record_onset(midi(60), 2.0);

        assert!(log.release_pitch(midi(60), 3.0));
        assert!(log.events()[0].is_open());
        assert_eq!(log.events()[1].off_time(), Some(3.0));

        assert!(log.release_pitch(midi(60), 4.0));
        assert_eq!(log.events()[0].off_time(), Some(4.0));
    }

    #[test]
    fn test_stray_release_leaves_log_unchanged() {
        let mut log = EventLog::new();
        log.record_onset(midi(60), 1.0);
        log.release_pitch(midi(60), 2.0);
        let before = log.clone();

        assert!(!log.release_pitch(midi(60), 3.0));
        assert!(!log.release_pitch(midi(72), 3.0));
        assert_eq!(log, before);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut log = EventLog::new();
        let handle = log.record_onset(midi(60), 1.0);
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.start_time(), None);

        log.record_onset(midi(60), 5.0);
        assert!(!log.record_release(handle, 6.0));
        assert!(log.events()[0].is_open());
    }

    #[test]
    fn test_from_parts_requires_start_time_for_events() {
        let events = vec![NoteEvent::new(midi(60), 1.0, Some(2.0))];
        assert!(matches!(
            EventLog::from_parts(None, events),
            Err(SessionError::Deserialization(_))
        ));
        assert!(EventLog::from_parts(None, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_from_parts_reindexes_open_events() {
        let events = vec![
            NoteEvent::new(midi(60), 1.0, None),
            NoteEvent::new(midi(62), 1.1, Some(1.4)),
        ];
        let mut log = EventLog::from_parts(Some(1.0), events).unwrap();

        assert_eq!(log.open_count(), 1);
        assert!(log.release_pitch(midi(60), 2.0));
        assert_eq!(log.events()[0].off_time(), Some(2.0));
    }

    #[test]
    fn test_duration() {
        let mut log = EventLog::new();
        assert_eq!(log.duration(), 0.0);

        log.begin(10.0).unwrap();
        log.record_onset(midi(60), 10.0);
        log.release_pitch(midi(60), 10.5);
        log.record_onset(midi(64), 10.2);
        log.release_pitch(midi(64), 10.6);

        assert!((log.duration() - 0.6).abs() < 1e-9);
    }
}
