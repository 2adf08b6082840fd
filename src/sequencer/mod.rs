// Sequencer module
// Live note capture, the recording timeline and timed replay

pub mod event_log;
pub mod midi_recorder;
pub mod note;
pub mod playback;
pub mod player;
pub mod timing;

pub use event_log::{EventHandle, EventLog};
pub use midi_recorder::{Recorder, RecordingState};
pub use note::{MidiNumber, NoteEvent, Seconds};
pub use playback::{CapturingTarget, PlaybackCall, PlaybackTarget, VoiceHandle};
pub use player::{ReplayId, ReplayPlan, ReplayReport, Scheduler, plan_replay};
pub use timing::{Clock, ManualClock, SystemClock, TimeSource};
