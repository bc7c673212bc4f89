//! Process-wide directory of whiteboards and active sessions.
//!
//! The registry owns two namespaces: board names and usernames. Both are
//! guarded by one registry-wide mutex, so every operation here is atomic with
//! respect to the others. Board creation fans its `CREATED` notice out to all
//! registered sessions while still holding that lock. Registration returns
//! the board listing for the HELLO reply under that same lock, so a session
//! registering concurrently with a create either sees the new board in its
//! listing or receives the broadcast, never neither and never both.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use log::info;

use super::protocol::{ClientError, ServerMessage};
use super::session::SessionHandle;
use super::whiteboard::Whiteboard;
use crate::logutil::escape_log;

/// The directory enforcing board-name and username uniqueness.
///
/// Single instance per server process, shared by every session task. Lock
/// ordering: the registry lock is always taken before any board lock, never
/// after one.
pub struct Registry {
    canvas_width: u32,
    canvas_height: u32,
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    boards: HashMap<String, Arc<Whiteboard>>,
    // Username sort order, for deterministic listings in logs and tests.
    sessions: BTreeMap<String, SessionHandle>,
}

impl Registry {
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Registry {
            canvas_width,
            canvas_height,
            inner: Mutex::new(RegistryInner {
                boards: HashMap::new(),
                sessions: BTreeMap::new(),
            }),
        }
    }

    /// Create a board and notify every registered session.
    ///
    /// Fails without side effects if the name is taken. The `CREATED` fan-out
    /// happens under the registry lock and reaches all sessions, including
    /// ones not attached to any board and the creator itself.
    pub fn create_whiteboard(&self, name: &str) -> Result<Arc<Whiteboard>, ClientError> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if inner.boards.contains_key(name) {
            return Err(ClientError::new("Duplicate whiteboard name."));
        }
        let board = Arc::new(Whiteboard::new(name, self.canvas_width, self.canvas_height));
        inner.boards.insert(name.to_string(), Arc::clone(&board));

        let notice = ServerMessage::Created {
            name: name.to_string(),
        }
        .to_string();
        for session in inner.sessions.values() {
            session.send(notice.clone());
        }
        info!("created whiteboard '{}'", escape_log(name));
        Ok(board)
    }

    pub fn get_whiteboard(&self, name: &str) -> Option<Arc<Whiteboard>> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.boards.get(name).cloned()
    }

    pub fn has_whiteboard(&self, name: &str) -> bool {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.boards.contains_key(name)
    }

    /// All board names, alphabetically sorted.
    pub fn whiteboard_names(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        let mut names: Vec<String> = inner.boards.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register a session under its username and return the sorted board
    /// listing for its HELLO reply.
    ///
    /// Fails without registering if the username is already held by a live
    /// session. The listing is taken under the same lock acquisition as the
    /// insert, so relative to any concurrent create this session gets the
    /// board exactly once: in the listing or as a `CREATED` notice.
    pub fn add_session(&self, handle: SessionHandle) -> Result<Vec<String>, ClientError> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if inner.sessions.contains_key(handle.username()) {
            return Err(ClientError::new("Duplicate username."));
        }
        inner.sessions.insert(handle.username().to_string(), handle);
        let mut names: Vec<String> = inner.boards.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Drop a session, freeing its username for reuse.
    pub fn remove_session(&self, username: &str) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.sessions.remove(username);
    }

    /// Currently registered usernames in sort order.
    pub fn session_names(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.sessions.keys().cloned().collect()
    }
}
