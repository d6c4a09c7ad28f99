use paper_archive_core::{PaperArchive, PositionMap, SyncPolicy, Variant};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One open reading session: the linear text being read plus the position map
/// for scroll sync. Immutable once built; a document change means a new
/// session with a freshly built map.
pub struct ReadingSession {
    pub text: String,
    pub map: PositionMap,
    pub variant: Variant,
    pub created_at: std::time::Instant,
}

/// Global application state.
///
/// The archive holds every credential; handlers only ever pass owner ids,
/// keys and bytes through it. Nothing in this struct can leak a token.
pub struct AppState {
    /// Active reading sessions indexed by UUID
    sessions: RwLock<HashMap<Uuid, ReadingSession>>,
    pub archive: PaperArchive,
}

impl AppState {
    pub fn new(archive: PaperArchive) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            archive,
        }
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.archive.sync_policy()
    }

    /// Open a reading session over an artifact's text.
    ///
    /// Returns the session ID as a string (for URL embedding).
    pub async fn create_session(&self, text: String, variant: Variant) -> String {
        let id = Uuid::new_v4();
        let session = ReadingSession {
            map: PositionMap::from_marked_text(&text),
            text,
            variant,
            created_at: std::time::Instant::now(),
        };
        self.sessions.write().await.insert(id, session);
        id.to_string()
    }

    /// Get a session by ID string.
    ///
    /// Returns `None` if the ID is not a valid UUID or the session doesn't
    /// exist.
    pub async fn get_session(&self, id: &str) -> Option<SessionRef<'_>> {
        let uuid = Uuid::parse_str(id).ok()?;
        let sessions = self.sessions.read().await;
        if sessions.contains_key(&uuid) {
            Some(SessionRef {
                id: uuid,
                state: self,
            })
        } else {
            None
        }
    }

    /// Close a session. Returns whether it existed.
    pub async fn close_session(&self, id: &str) -> bool {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return false;
        };
        self.sessions.write().await.remove(&uuid).is_some()
    }

    /// Cleanup old sessions (older than 1 hour)
    pub async fn cleanup_old_sessions(&self) {
        let mut sessions = self.sessions.write().await;
        let now = std::time::Instant::now();
        let max_age = std::time::Duration::from_secs(3600);

        sessions.retain(|_, session| now.duration_since(session.created_at) < max_age);
    }
}

/// A borrowed reference to a session that provides safe access patterns.
///
/// Holding a `RwLockReadGuard` across an `.await` point is problematic, so
/// session data is only touched inside synchronous closures; the lock is
/// released before the handler awaits anything else.
pub struct SessionRef<'a> {
    id: Uuid,
    state: &'a AppState,
}

impl SessionRef<'_> {
    /// Access session data immutably within a closure.
    ///
    /// The closure runs synchronously while holding a read lock.
    /// The lock is released before this method returns.
    pub async fn with_session<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&ReadingSession) -> R,
    {
        let sessions = self.state.sessions.read().await;
        sessions.get(&self.id).map(f)
    }
}
