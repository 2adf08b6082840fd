// Session stores - the persistence collaborator
// Transport is up to the store; only the payload shape is fixed

use crate::persistence::types::SavedSession;
use crate::session::SessionError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Session store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Somewhere saved sessions can be put and fetched back
pub trait SessionStore {
    /// Store `session`, returning its id as acknowledgement
    fn save(&mut self, session: &SavedSession) -> Result<Uuid, StoreError>;

    fn load(&self, id: Uuid) -> Result<SavedSession, StoreError>;

    fn list(&self) -> Result<Vec<Uuid>, StoreError>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: HashMap<Uuid, SavedSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&mut self, session: &SavedSession) -> Result<Uuid, StoreError> {
        self.sessions.insert(session.id, session.clone());
        Ok(session.id)
    }

    fn load(&self, id: Uuid) -> Result<SavedSession, StoreError> {
        self.sessions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Result<Vec<Uuid>, StoreError> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Directory of JSON files, one per session (`<id>.json`)
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Platform data directory for saved sessions
    pub fn default_location() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("keyreplay").join("sessions"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

impl SessionStore for FileSessionStore {
    fn save(&mut self, session: &SavedSession) -> Result<Uuid, StoreError> {
        let json = serde_json::to_string_pretty(session)?;

        // Write then rename, readers never see a partial file
        let path = self.path_for(session.id);
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &path)?;

        log::info!("Saved session '{}' to {}", session.name, path.display());
        Ok(session.id)
    }

    fn load(&self, id: Uuid) -> Result<SavedSession, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }

        let json = std::fs::read_to_string(&path)?;
        let session: SavedSession = serde_json::from_str(&json).map_err(|e| {
            SessionError::Deserialization(format!("Invalid saved session {}: {}", id, e))
        })?;
        session.data.validate()?;
        Ok(session)
    }

    fn list(&self) -> Result<Vec<Uuid>, StoreError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| Uuid::parse_str(stem).ok())
                {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::types::{SerializedNoteEvent, SerializedSession};
    use crate::sequencer::note::MidiNumber;
    use tempfile::TempDir;

    fn sample_session() -> SavedSession {
        SavedSession::new(
            "SongName",
            SerializedSession {
                events: vec![SerializedNoteEvent {
                    midi_number: MidiNumber::new(60).unwrap(),
                    on_time: 10.0,
                    off_time: None,
                }],
                start_time: Some(10.0),
            },
        )
        .with_user(1)
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemorySessionStore::new();
        let session = sample_session();

        let id = store.save(&session).unwrap();
        assert_eq!(store.load(id).unwrap(), session);
        assert_eq!(store.list().unwrap(), vec![id]);
    }

    #[test]
    fn test_memory_store_missing_session() {
        let store = MemorySessionStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.load(id), Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = FileSessionStore::open(dir.path().join("sessions")).unwrap();
        let session = sample_session();

        let id = store.save(&session).unwrap();
        assert!(store.root().join(format!("{}.json", id)).exists());

        let loaded = store.load(id).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(store.list().unwrap(), vec![id]);
    }

    #[test]
    fn test_file_store_rejects_invalid_payload() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::open(dir.path()).unwrap();
        let id = Uuid::new_v4();

        std::fs::write(
            dir.path().join(format!("{}.json", id)),
            format!(
                r#"{{"id":"{}","name":"Broken","saved_at":"2024-01-01T00:00:00Z",
                    "data":{{"events":[{{"midiNumber":60,"onTime":1.0}}],"startTime":null}}}}"#,
                id
            ),
        )
        .unwrap();

        assert!(matches!(
            store.load(id),
            Err(StoreError::Session(SessionError::Deserialization(_)))
        ));
    }

    #[test]
    fn test_file_store_malformed_payloads_share_error_class() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::open(dir.path()).unwrap();

        let bodies = [
            r#""data":{"events":[{"midiNumber":200,"onTime":1.0}],"startTime":1.0}"#,
            r#""data":{"events":[{"midiNumber":60}],"startTime":1.0}"#,
            r#""data":"not a session""#,
        ];
        for body in bodies {
            let id = Uuid::new_v4();
            std::fs::write(
                dir.path().join(format!("{}.json", id)),
                format!(
                    r#"{{"id":"{}","name":"Broken","saved_at":"2024-01-01T00:00:00Z",{}}}"#,
                    id, body
                ),
            )
            .unwrap();

            assert!(
                matches!(
                    store.load(id),
                    Err(StoreError::Session(SessionError::Deserialization(_)))
                ),
                "payload {} should be a deserialization error",
                body
            );
        }
    }
}
