//! Application state: the challenge catalog, per-player sessions, and the
//! progress store.
//!
//! Each session owns its rotation bookkeeping and editor state, so switching
//! levels or players never leaks selection history across sessions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::Rng;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::{load_app_config_from_env, AppConfig};
use crate::domain::Challenge;
use crate::editor::EditorSession;
use crate::error::{ApiError, Result};
use crate::progress::{user_key, JsonFileStore, MemoryStore, ProgressStore};
use crate::rotation::{reset_rotation, select_next, RotationState};

#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub user: String,
    pub level: Option<u32>,
    pub current: Option<String>,
    pub rotation: RotationState,
    pub editor: EditorSession,
    /// Last time any request touched this session.
    pub last_seen: Instant,
}

impl Session {
    pub fn new(id: impl Into<String>, user: &str) -> Self {
        Self {
            id: id.into(),
            user: user.trim().to_string(),
            level: None,
            current: None,
            rotation: RotationState::new(),
            editor: EditorSession::default(),
            last_seen: Instant::now(),
        }
    }

    /// Pick the next challenge for `level` and load it into the editor.
    /// Switching to a different level starts that level's rotation fresh.
    pub fn next_challenge<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        level: u32,
        exclude_id: Option<&str>,
        rng: &mut R,
    ) -> Option<Challenge> {
        if self.level != Some(level) {
            reset_rotation(&mut self.rotation, level);
            self.level = Some(level);
        }
        let picked = select_next(catalog, &mut self.rotation, level, exclude_id, rng)?.clone();
        self.current = Some(picked.id.clone());
        self.editor.load_challenge(&picked);
        Some(picked)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<RwLock<HashMap<String, Session>>>,
    pub store: Arc<dyn ProgressStore>,
    pub debounce: Duration,
    pub session_ttl: Duration,
    /// One lock per user around progress read-modify-write.
    progress_locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl AppState {
    /// Build state from env: load config, assemble the catalog, pick the progress store.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env();

        let mut catalog = match Catalog::builtin() {
            Ok(c) => c,
            Err(e) => {
                error!(target: "challenge", error = %e, "Built-in catalog failed to load; starting empty");
                Catalog::default()
            }
        };
        catalog.extend(cfg.challenges.clone(), cfg.levels.clone());
        catalog.log_inventory();

        let store: Arc<dyn ProgressStore> = match &cfg.storage.progress_dir {
            Some(dir) => {
                info!(target: "prabodha", dir = %dir.display(), "Progress persisted to JSON files.");
                Arc::new(JsonFileStore::new(dir.clone()))
            }
            None => {
                warn!(target: "prabodha", "No progress directory configured; progress is kept in memory.");
                Arc::new(MemoryStore::new())
            }
        };

        Self::with_parts(catalog, store, &cfg)
    }

    pub fn with_parts(catalog: Catalog, store: Arc<dyn ProgressStore>, cfg: &AppConfig) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            debounce: Duration::from_millis(cfg.editor.debounce_ms),
            session_ttl: Duration::from_secs(cfg.sessions.idle_ttl_secs),
            progress_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a new session. Idle sessions are swept first.
    #[instrument(level = "info", skip(self))]
    pub async fn create_session(&self, user: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        sweep_idle(&mut sessions, self.session_ttl);
        sessions.insert(id.clone(), Session::new(id.clone(), user));
        info!(target: "prabodha", session = %id, live = sessions.len(), "Session created");
        id
    }

    /// Drop sessions idle for longer than the configured TTL. Returns how many went.
    pub async fn sweep_idle_sessions(&self) -> usize {
        sweep_idle(&mut *self.sessions.write().await, self.session_ttl)
    }

    pub async fn remove_sessions(&self, ids: &[String]) {
        let mut sessions = self.sessions.write().await;
        for id in ids {
            if sessions.remove(id).is_some() {
                debug!(target: "prabodha", session = %id, "Session closed");
            }
        }
    }

    /// Serialise progress updates for one user. Hold the guard across load + save.
    pub async fn lock_progress(&self, user: &str) -> OwnedMutexGuard<()> {
        let lock = match self.progress_locks.lock() {
            Ok(mut locks) => {
                // Entries nobody holds can go; the map only tracks users mid-update.
                locks.retain(|_, l| Arc::strong_count(l) > 1);
                locks.entry(user_key(user)).or_default().clone()
            }
            Err(e) => {
                warn!(target: "prabodha", error = %e, "Progress lock table poisoned; using a private lock");
                Arc::new(AsyncMutex::new(()))
            }
        };
        lock.lock_owned().await
    }

    /// Read-only access to a challenge by id.
    pub fn get_challenge(&self, id: &str) -> Option<&Challenge> {
        self.catalog.by_id(id)
    }
}

/// Look up a live session and mark it as used.
pub fn touch<'a>(sessions: &'a mut HashMap<String, Session>, id: &str) -> Result<&'a mut Session> {
    let session = sessions.get_mut(id).ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
    session.last_seen = Instant::now();
    Ok(session)
}

fn sweep_idle(sessions: &mut HashMap<String, Session>, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, s| s.last_seen.elapsed() <= ttl);
    let dropped = before - sessions.len();
    if dropped > 0 {
        info!(target: "prabodha", dropped, live = sessions.len(), "Idle sessions evicted");
    }
    dropped
}
