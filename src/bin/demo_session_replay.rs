// Quick demonstration of recording and replaying a session
// Run with: cargo run --bin demo_session_replay

use keyreplay::persistence::store::FileSessionStore;
use keyreplay::sequencer::playback::{CapturingTarget, PlaybackCall};
use keyreplay::session::instrument::InstrumentRequest;
use keyreplay::{Clock, ManualClock, MidiNumber, SessionConfig, SessionController, SessionError};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🎹 keyreplay - Record & Replay Demo");
    println!("===================================");

    // Offline clock so the demo runs instantly
    let clock = ManualClock::new(1_700_000_000.0);
    let instrument_clock = clock.clone();
    let loader = move |request: &InstrumentRequest| -> Result<_, SessionError> {
        println!("🎼 Loading instrument {} ({})", request.name, request.url);
        Ok(CapturingTarget::new(instrument_clock.clone()))
    };

    let mut session = SessionController::new(
        SessionConfig::default(),
        Clock::new(clock.clone()),
        loader,
    );

    // Play a C major arpeggio with the sustain overlapping
    session.start_recording();
    for (pitch, hold) in [(60u8, 0.6), (64, 0.5), (67, 0.4), (72, 0.8)] {
        let note = MidiNumber::new(pitch)?;
        session.play_note(note)?;
        clock.advance(0.25);
        if hold < 0.5 {
            session.stop_note(note);
        }
    }
    clock.advance(0.5);
    session.stop_all_notes();
    session.stop_recording();

    let log = session.event_log();
    println!("\n⏺️  Recorded {} notes over {:.2}s", log.len(), log.duration());

    // Save to a temp store and replay the saved copy
    let mut store = FileSessionStore::open(std::env::temp_dir().join("keyreplay_demo"))?;
    let id = session.persist(&mut store, "Arpeggio")?;
    println!("💾 Saved session {} to {}", id, store.root().display());

    if let Some(instrument) = session.instrument_mut() {
        instrument.clear();
    }

    let report = session.play_saved(&store, id)?;
    println!(
        "\n▶️  Replay scheduled: {} triggers, {} releases",
        report.triggers, report.releases
    );
    let fired = session.run_until_idle();
    println!("   - Timers fired: {}", fired);

    if let Some(instrument) = session.instrument() {
        let start = instrument.calls().first().map(|(t, _)| *t).unwrap_or_default();
        for (time, call) in instrument.calls() {
            let offset_ms = (time - start) * 1000.0;
            match call {
                PlaybackCall::Trigger(voice) => {
                    println!("   {:>6.0} ms  ▼ {}", offset_ms, voice.midi_number.note_name())
                }
                PlaybackCall::ReleaseVoice(voice) => {
                    println!("   {:>6.0} ms  ▲ {}", offset_ms, voice.midi_number.note_name())
                }
                other => println!("   {:>6.0} ms  {:?}", offset_ms, other),
            }
        }
    }

    println!("\n✅ Demo finished");
    Ok(())
}
