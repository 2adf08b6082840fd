// Replay scheduler - turns a recorded event log back into timed playback calls
//
// Every trigger and release is planned up front as an absolute deadline and
// pushed onto one timer queue. The queue is drained by an event loop calling
// `poll`; nothing here blocks or spawns threads.

use crate::sequencer::event_log::EventLog;
use crate::sequencer::note::{MidiNumber, Seconds};
use crate::sequencer::playback::{PlaybackTarget, VoiceHandle};
use crate::session::SessionError;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Identifies one `replay` call, used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplayId(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Start the note. `releases` tells whether a release timer follows.
    Trigger { releases: bool },
    Release,
}

/// One planned playback call, relative to the replay start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedCall {
    pub delay: Seconds,
    pub midi_number: MidiNumber,
    /// Index of the source event in the log
    pub event_index: usize,
    pub action: TimerAction,
}

/// Replay plan for a log: the calls to make and the events that were skipped
#[derive(Debug, Default)]
pub struct ReplayPlan {
    pub calls: Vec<PlannedCall>,
    pub skipped: Vec<SessionError>,
}

/// Compute the relative delays for every event of `log`
///
/// Onset delays are clamped at zero. A release is planned only for events with
/// a release time; an event whose release precedes its onset is skipped and
/// reported, and the rest of the log still plays.
pub fn plan_replay(log: &EventLog) -> ReplayPlan {
    let mut plan = ReplayPlan::default();

    let Some(base) = log.start_time() else {
        return plan;
    };

    for (event_index, event) in log.events().iter().enumerate() {
        let hold = match event.hold_duration() {
            Ok(hold) => hold,
            Err(e) => {
                plan.skipped.push(e);
                continue;
            }
        };

        let delay_on = (event.on_time() - base).max(0.0);
        plan.calls.push(PlannedCall {
            delay: delay_on,
            midi_number: event.midi_number(),
            event_index,
            action: TimerAction::Trigger {
                releases: hold.is_some(),
            },
        });

        if let Some(hold) = hold {
            plan.calls.push(PlannedCall {
                delay: delay_on + hold,
                midi_number: event.midi_number(),
                event_index,
                action: TimerAction::Release,
            });
        }
    }

    plan
}

/// Result of submitting a replay
#[derive(Debug)]
pub struct ReplayReport {
    pub replay: ReplayId,
    pub triggers: usize,
    pub releases: usize,
    pub skipped: Vec<SessionError>,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    deadline: Seconds,
    seq: u64,
    replay: ReplayId,
    call: PlannedCall,
}

impl PartialEq for PendingTimer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingTimer {}

impl PartialOrd for PendingTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so BinaryHeap pops the earliest deadline first, then the earliest submitted.
impl Ord for PendingTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .total_cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded timer queue for replays
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<PendingTimer>,
    next_seq: u64,
    next_replay: u64,
    /// Timers still queued per replay
    pending: HashMap<ReplayId, usize>,
    /// Voices started by a replay that still have a release timer queued
    sounding: HashMap<(ReplayId, usize), VoiceHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule every event of `log` relative to `now`
    ///
    /// Returns immediately; the calls happen as the event loop polls.
    pub fn replay(&mut self, log: &EventLog, now: Seconds) -> ReplayReport {
        let replay = ReplayId(self.next_replay);
        self.next_replay += 1;

        let plan = plan_replay(log);
        for skipped in &plan.skipped {
            log::warn!("Skipping event in replay: {}", skipped);
        }

        let mut report = ReplayReport {
            replay,
            triggers: 0,
            releases: 0,
            skipped: plan.skipped,
        };

        for call in plan.calls {
            match call.action {
                TimerAction::Trigger { .. } => report.triggers += 1,
                TimerAction::Release => report.releases += 1,
            }
            self.queue.push(PendingTimer {
                deadline: now + call.delay,
                seq: self.next_seq,
                replay,
                call,
            });
            self.next_seq += 1;
        }

        let total = report.triggers + report.releases;
        if total > 0 {
            self.pending.insert(replay, total);
        }

        log::debug!(
            "Replay {:?} scheduled: {} triggers, {} releases, {} skipped",
            replay,
            report.triggers,
            report.releases,
            report.skipped.len()
        );

        report
    }

    /// Fire every timer due at `now`
    ///
    /// Returns the number of timers fired.
    pub fn poll(&mut self, now: Seconds, target: &mut dyn PlaybackTarget) -> usize {
        let mut fired = 0;

        while self.queue.peek().is_some_and(|timer| timer.deadline <= now) {
            let Some(timer) = self.queue.pop() else {
                break;
            };
            self.fire(timer, target);
            fired += 1;
        }

        fired
    }

    fn fire(&mut self, timer: PendingTimer, target: &mut dyn PlaybackTarget) {
        let key = (timer.replay, timer.call.event_index);
        let midi_number = timer.call.midi_number;

        match timer.call.action {
            TimerAction::Trigger { releases } => {
                log::trace!("Replay {:?}: trigger {}", timer.replay, midi_number);
                let voice = target.trigger(midi_number);
                if releases {
                    self.sounding.insert(key, voice);
                }
            }
            TimerAction::Release => {
                log::trace!("Replay {:?}: release {}", timer.replay, midi_number);
                match self.sounding.remove(&key) {
                    Some(voice) => target.release_voice(voice),
                    None => target.release(midi_number),
                }
            }
        }

        if let Some(remaining) = self.pending.get_mut(&timer.replay) {
            *remaining -= 1;
            if *remaining == 0 {
                self.pending.remove(&timer.replay);
                log::debug!("Replay {:?} finished", timer.replay);
            }
        }
    }

    /// Drop every queued timer of `replay`
    ///
    /// Returns the voices the replay started and had not released yet, so the
    /// caller can silence them.
    pub fn cancel(&mut self, replay: ReplayId) -> Vec<VoiceHandle> {
        self.queue.retain(|timer| timer.replay != replay);
        self.pending.remove(&replay);

        let keys: Vec<_> = self
            .sounding
            .keys()
            .filter(|(id, _)| *id == replay)
            .copied()
            .collect();

        keys.into_iter()
            .filter_map(|key| self.sounding.remove(&key))
            .collect()
    }

    /// Cancel every in-flight replay
    pub fn cancel_all(&mut self) -> Vec<VoiceHandle> {
        self.queue.clear();
        self.pending.clear();
        self.sounding.drain().map(|(_, voice)| voice).collect()
    }

    pub fn next_deadline(&self) -> Option<Seconds> {
        self.queue.peek().map(|timer| timer.deadline)
    }

    pub fn is_active(&self, replay: ReplayId) -> bool {
        self.pending.contains_key(&replay)
    }

    pub fn active_replays(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}
