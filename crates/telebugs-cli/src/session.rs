//! Session registry for the `serve` loop.
//!
//! A session pins the [`AuthContext`] resolved at `open`. Membership changes
//! made afterwards are not seen until the client opens a new session.

use std::collections::HashMap;
use std::fmt::Write as _;
use telebugs_core::AuthContext;
use tracing::info;

/// Open sessions, keyed by an unguessable hex id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, AuthContext>,
}

fn new_session_id() -> String {
    let bytes: [u8; 16] = rand::random();
    let mut id = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(id, "{byte:02x}");
    }
    id
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ctx` and return its session id.
    pub fn open(&mut self, ctx: AuthContext) -> String {
        let mut id = new_session_id();
        while self.sessions.contains_key(&id) {
            id = new_session_id();
        }
        info!(
            user_id = ctx.user_id(),
            projects = ctx.projects.len(),
            "session opened"
        );
        self.sessions.insert(id.clone(), ctx);
        id
    }

    pub fn get(&self, id: &str) -> Option<&AuthContext> {
        self.sessions.get(id)
    }

    /// Drop a session. Returns `false` if it was not open.
    pub fn close(&mut self, id: &str) -> bool {
        let closed = self.sessions.remove(id);
        if let Some(ctx) = &closed {
            info!(user_id = ctx.user_id(), "session closed");
        }
        closed.is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
