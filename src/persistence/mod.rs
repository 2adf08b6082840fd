// Session persistence
// JSON payload shape, legacy migration and session stores

pub mod migration;
pub mod serialization;
pub mod store;
pub mod types;

pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoreError};
pub use types::{SavedSession, SerializedNoteEvent, SerializedSession};
