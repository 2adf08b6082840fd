// Instrument loader collaborator

use crate::config::{SampleFormat, SessionConfig, Soundfont};
use crate::sequencer::playback::PlaybackTarget;
use crate::session::SessionError;

/// What to load
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRequest {
    pub name: String,
    pub url: String,
    pub soundfont: Soundfont,
    pub format: SampleFormat,
}

impl InstrumentRequest {
    pub fn from_config(config: &SessionConfig, name: &str) -> Self {
        Self {
            name: name.to_string(),
            url: config.instrument_url(name),
            soundfont: config.soundfont,
            format: config.format,
        }
    }
}

/// Produces playable instruments
///
/// Any `FnMut(&InstrumentRequest) -> Result<T, SessionError>` is a loader.
pub trait InstrumentLoader {
    type Target: PlaybackTarget;

    fn load(&mut self, request: &InstrumentRequest) -> Result<Self::Target, SessionError>;
}

impl<F, T> InstrumentLoader for F
where
    F: FnMut(&InstrumentRequest) -> Result<T, SessionError>,
    T: PlaybackTarget,
{
    type Target = T;

    fn load(&mut self, request: &InstrumentRequest) -> Result<T, SessionError> {
        self(request)
    }
}
