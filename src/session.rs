// =============================================================================
// Session History — per-browser, append-only query log
// =============================================================================
//
// Each browser gets a UUID in the `finddy_session` cookie. The store maps that
// id to the list of human-readable results the session has produced. A
// session's list only ever grows; whole sessions are evicted least recently
// used once `max_sessions` is reached.
//
// Usage as an Axum extractor:
//
//   async fn handler(session: Session, ...) { ... }
//
// The extractor never rejects: a missing or malformed cookie yields a freshly
// minted id and `Session::set_cookie()` returns the header to send back.
// =============================================================================

use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Instant;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "finddy_session";

// =============================================================================
// Store
// =============================================================================

struct SessionHistory {
    entries: Vec<String>,
    last_seen: Instant,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHistory>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Append `entry` to the history of session `id`, creating it if needed.
    pub fn append(&self, id: Uuid, entry: String) {
        let mut sessions = self.sessions.write();

        if !sessions.contains_key(&id) && sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, h)| h.last_seen)
                .map(|(k, _)| *k);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!(session = %oldest, "evicted least recently used session");
            }
        }

        let history = sessions.entry(id).or_insert_with(|| SessionHistory {
            entries: Vec::new(),
            last_seen: Instant::now(),
        });
        history.entries.push(entry);
        history.last_seen = Instant::now();
    }

    /// Snapshot of the history of session `id`, oldest first. Reading counts
    /// as activity for eviction.
    pub fn history(&self, id: Uuid) -> Vec<String> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&id) {
            Some(h) => {
                h.last_seen = Instant::now();
                h.entries.clone()
            }
            None => Vec::new(),
        }
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// The caller's session id, read from (or freshly assigned for) the request.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub id: Uuid,
    pub is_new: bool,
}

impl Session {
    /// `Set-Cookie` value to attach when the id was minted for this request.
    pub fn set_cookie(&self) -> Option<(header::HeaderName, HeaderValue)> {
        if !self.is_new {
            return None;
        }
        let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
        HeaderValue::from_str(&cookie)
            .ok()
            .map(|v| (header::SET_COOKIE, v))
    }
}

/// Find the session id among the request's `Cookie` headers.
fn session_id_from_cookies(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
        .find_map(|value| Uuid::parse_str(value.trim()).ok())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match session_id_from_cookies(parts) {
            Some(id) => Ok(Session { id, is_new: false }),
            None => {
                let id = Uuid::new_v4();
                debug!(session = %id, "new session");
                Ok(Session { id, is_new: true })
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
