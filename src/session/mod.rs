// Session orchestration
//
// The controller owns the event log and drives the recorder and the replay
// scheduler around it. Instruments come from a loader collaborator.

pub mod controller;
pub mod error;
pub mod instrument;

pub use controller::SessionController;
pub use error::SessionError;
pub use instrument::InstrumentLoader;
