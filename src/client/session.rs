use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::UserSummary;

/// Authenticated session cached on the client side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user: UserSummary,
}

/// Where a client keeps its token and user snapshot between calls.
///
/// `clear` must be called on logout and whenever the server rejects the
/// token; every successful mutation replaces the snapshot via `save`.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> Result<(), String>;
    fn clear(&self) -> Result<(), String>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.session.lock().ok()?.clone()
    }

    fn save(&self, session: &Session) -> Result<(), String> {
        let mut guard = self
            .session
            .lock()
            .map_err(|e| format!("Session lock poisoned: {}", e))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), String> {
        let mut guard = self
            .session
            .lock()
            .map_err(|e| format!("Session lock poisoned: {}", e))?;
        *guard = None;
        Ok(())
    }
}

/// Session persisted as a JSON file, surviving process restarts
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<Session> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("⚠️  Ignoring unreadable session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), String> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        let raw = serde_json::to_string_pretty(session)
            .map_err(|e| format!("Failed to encode session: {}", e))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))
    }

    fn clear(&self) -> Result<(), String> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Failed to remove {}: {}", self.path.display(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> Session {
        Session {
            token: "token-123".to_string(),
            user: UserSummary {
                id: "65a1f0c2e4b0a1b2c3d4e5f6".to_string(),
                username: "ninja".to_string(),
                email: "ninja@example.com".to_string(),
                current_level: 1,
                shield_coins: 20,
                current_streak: 1,
                last_login: None,
            },
        }
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemorySessionStore::new();
        assert!(store.load().is_none());

        store.save(&sample_session()).unwrap();
        assert_eq!(store.load(), Some(sample_session()));

        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_lifecycle() {
        let dir = std::env::temp_dir().join(format!("scamurai-session-{}", uuid::Uuid::new_v4()));
        let store = FileSessionStore::new(dir.join("session.json"));

        assert!(store.load().is_none());
        store.save(&sample_session()).unwrap();
        assert_eq!(store.load(), Some(sample_session()));

        store.clear().unwrap();
        assert!(store.load().is_none());
        // Clearing twice is fine
        store.clear().unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let path = std::env::temp_dir().join(format!("scamurai-corrupt-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(store.load().is_none());

        let _ = std::fs::remove_file(path);
    }
}
