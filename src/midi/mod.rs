pub mod event;

pub use event::MidiEvent;
