//! Per-user view sessions: run selection, stale-response discard, caching.
//!
//! Every selection takes a fresh token. A fetch that completes after a newer
//! selection (or after the session closed) is discarded rather than
//! committed, so the last selection always wins. Hierarchies are cached per
//! run id, up to a fixed number of runs, and never shared between users.
//! Sessions left idle past the registry's TTL are closed on the next lookup.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use synclog_core::{RunHierarchy, SyncRun};
use tokio::sync::Mutex;

use crate::error::ReconstructError;
use crate::reconstruct::Reconstructor;
use crate::runs::find_run;
use crate::store::EventLog;

/// Result of a run selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Ready(Arc<RunHierarchy>),
    /// A newer selection or a close happened while this one was in flight.
    Superseded,
}

/// Bounds on per-user state held by a [`SessionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Hierarchies kept per session; the least recently selected goes first.
    pub cache_runs: usize,
    /// A session unused for longer than this is closed and forgotten.
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            cache_runs: 16,
            idle_ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// Run id -> hierarchy, evicting in least-recently-selected order.
struct RunCache {
    capacity: usize,
    entries: HashMap<String, Arc<RunHierarchy>>,
    recency: VecDeque<String>,
}

impl RunCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    fn get(&mut self, run_id: &str) -> Option<Arc<RunHierarchy>> {
        let hit = self.entries.get(run_id).cloned()?;
        self.touch(run_id);
        Some(hit)
    }

    fn peek(&self, run_id: &str) -> Option<Arc<RunHierarchy>> {
        self.entries.get(run_id).cloned()
    }

    fn insert(&mut self, run_id: &str, hierarchy: Arc<RunHierarchy>) {
        if self.entries.insert(run_id.to_string(), hierarchy).is_some() {
            self.touch(run_id);
            return;
        }
        self.recency.push_back(run_id.to_string());
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    fn touch(&mut self, run_id: &str) {
        if let Some(pos) = self.recency.iter().position(|id| id == run_id) {
            if let Some(id) = self.recency.remove(pos) {
                self.recency.push_back(id);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

pub struct ViewSession {
    user_id: String,
    log: Arc<dyn EventLog>,
    reconstructor: Reconstructor,
    latest_token: AtomicU64,
    cache: Mutex<RunCache>,
}

impl ViewSession {
    pub fn new(
        user_id: impl Into<String>,
        log: Arc<dyn EventLog>,
        reconstructor: Reconstructor,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            log,
            reconstructor,
            latest_token: AtomicU64::new(0),
            cache: Mutex::new(RunCache::new(SessionLimits::default().cache_runs)),
        }
    }

    /// Caps the number of cached hierarchies. A capacity of 0 is treated as 1.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = Mutex::new(RunCache::new(capacity));
        self
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Selects `run`, reconstructing it unless already cached.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructError::RunNotFound`] if the run belongs to another
    /// user, or [`ReconstructError::Unavailable`] if the window fetch fails
    /// and this selection is still the latest.
    pub async fn select(&self, run: &SyncRun) -> Result<Selection, ReconstructError> {
        if run.user_id != self.user_id {
            return Err(ReconstructError::RunNotFound {
                run_id: run.id.clone(),
            });
        }

        let token = self.latest_token.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(hit) = self.cache.lock().await.get(&run.id) {
            return Ok(Selection::Ready(hit));
        }

        let loaded = self.reconstructor.load(self.log.as_ref(), run).await;

        let mut cache = self.cache.lock().await;
        if !self.is_current(token) {
            tracing::debug!(
                run_id = %run.id,
                user_id = %self.user_id,
                "discarding superseded run selection"
            );
            return Ok(Selection::Superseded);
        }

        let hierarchy = Arc::new(loaded?);
        cache.insert(&run.id, Arc::clone(&hierarchy));
        Ok(Selection::Ready(hierarchy))
    }

    /// Looks up `run_id` for this session's user and selects it.
    ///
    /// # Errors
    ///
    /// See [`find_run`] and [`ViewSession::select`].
    pub async fn select_by_id(
        &self,
        run_id: &str,
    ) -> Result<(SyncRun, Selection), ReconstructError> {
        let run = find_run(self.log.as_ref(), &self.user_id, run_id).await?;
        let selection = self.select(&run).await?;
        Ok((run, selection))
    }

    /// Cached hierarchy for `run_id`, if this session already built it.
    pub async fn cached(&self, run_id: &str) -> Option<Arc<RunHierarchy>> {
        self.cache.lock().await.peek(run_id)
    }

    /// Number of hierarchies currently cached.
    pub async fn cached_runs(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Drops the cache and invalidates any in-flight selection.
    pub async fn close(&self) {
        let mut cache = self.cache.lock().await;
        self.latest_token.fetch_add(1, Ordering::SeqCst);
        cache.clear();
    }

    fn is_current(&self, token: u64) -> bool {
        self.latest_token.load(Ordering::SeqCst) == token
    }
}

struct OpenSession {
    session: Arc<ViewSession>,
    last_used: Instant,
}

/// View sessions keyed by user id.
pub struct SessionRegistry {
    log: Arc<dyn EventLog>,
    reconstructor: Reconstructor,
    limits: SessionLimits,
    sessions: Mutex<HashMap<String, OpenSession>>,
}

impl SessionRegistry {
    pub fn new(log: Arc<dyn EventLog>, reconstructor: Reconstructor) -> Self {
        Self::with_limits(log, reconstructor, SessionLimits::default())
    }

    pub fn with_limits(
        log: Arc<dyn EventLog>,
        reconstructor: Reconstructor,
        limits: SessionLimits,
    ) -> Self {
        Self {
            log,
            reconstructor,
            limits,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn log(&self) -> &Arc<dyn EventLog> {
        &self.log
    }

    #[must_use]
    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// The open session for `user_id`, creating one if needed.
    ///
    /// Other sessions idle past the TTL are closed on the way.
    pub async fn session(&self, user_id: &str) -> Arc<ViewSession> {
        let now = Instant::now();
        let (session, expired) = {
            let mut sessions = self.sessions.lock().await;
            let expired = self.take_idle(&mut sessions, now, Some(user_id));
            let open = sessions
                .entry(user_id.to_string())
                .or_insert_with(|| OpenSession {
                    session: Arc::new(self.open(user_id)),
                    last_used: now,
                });
            open.last_used = now;
            (Arc::clone(&open.session), expired)
        };
        close_all(expired).await;
        session
    }

    /// Closes every session unused since `now - idle_ttl`. Returns how many.
    pub async fn evict_idle_at(&self, now: Instant) -> usize {
        let expired = {
            let mut sessions = self.sessions.lock().await;
            self.take_idle(&mut sessions, now, None)
        };
        let evicted = expired.len();
        close_all(expired).await;
        evicted
    }

    /// Number of sessions currently open.
    pub async fn open_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Closes and forgets `user_id`'s session. Returns `false` if none was open.
    pub async fn close(&self, user_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(user_id);
        match removed {
            Some(open) => {
                open.session.close().await;
                true
            }
            None => false,
        }
    }

    fn open(&self, user_id: &str) -> ViewSession {
        ViewSession::new(user_id, Arc::clone(&self.log), self.reconstructor.clone())
            .with_cache_capacity(self.limits.cache_runs)
    }

    fn take_idle(
        &self,
        sessions: &mut HashMap<String, OpenSession>,
        now: Instant,
        keep: Option<&str>,
    ) -> Vec<Arc<ViewSession>> {
        let idle: Vec<String> = sessions
            .iter()
            .filter(|(user_id, open)| {
                keep != Some(user_id.as_str())
                    && now.saturating_duration_since(open.last_used) > self.limits.idle_ttl
            })
            .map(|(user_id, _)| user_id.clone())
            .collect();

        idle.into_iter()
            .filter_map(|user_id| {
                tracing::debug!(%user_id, "closing idle view session");
                sessions.remove(&user_id).map(|open| open.session)
            })
            .collect()
    }
}

async fn close_all(sessions: Vec<Arc<ViewSession>>) {
    for session in sessions {
        session.close().await;
    }
}
