//! Live sessions, keyed by id.
//!
//! Each session sits behind its own mutex so a long report run only blocks
//! requests for that session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cardiolake_agents::Session;
use tokio::sync::{Mutex, RwLock};

pub type SessionHandle = Arc<Mutex<Session>>;

/// Maximum number of live sessions before the oldest are evicted.
pub const MAX_SESSIONS: usize = 1_000;

struct Slot {
    /// Creation order; timestamps can collide.
    seq: u64,
    session: SessionHandle,
}

#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<String, Slot>>,
    next_seq: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session and return its id and creation time.
    pub async fn create(&self) -> (String, chrono::DateTime<chrono::Utc>) {
        let session = Session::new();
        let id = session.id().to_string();
        let created_at = session.created_at();

        let mut slots = self.slots.write().await;
        if slots.len() >= MAX_SESSIONS {
            if let Some(oldest) = slots
                .iter()
                .min_by_key(|(_, slot)| slot.seq)
                .map(|(k, _)| k.clone())
            {
                tracing::debug!(session_id = %oldest, "Evicting oldest session");
                slots.remove(&oldest);
            }
        }
        slots.insert(
            id.clone(),
            Slot {
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                session: Arc::new(Mutex::new(session)),
            },
        );
        (id, created_at)
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.slots
            .read()
            .await
            .get(id)
            .map(|slot| slot.session.clone())
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}
