//! Session store
//!
//! The single source of truth for usage data: owns the active session, the
//! completed-session log, the day-bucketed totals and map metadata, and
//! persists all of it as one JSON blob through a [`StorageBackend`].
//!
//! ## State machine
//!
//! The store is either idle or timing exactly one session. `start` on an
//! already-active store first closes the running session, so duplicate or
//! late events from the game client can never produce two active sessions.
//!
//! ## Write discipline
//!
//! Mutations update the in-memory state synchronously under a mutex, then
//! enqueue a serialized snapshot onto a single writer task. The task
//! applies writes strictly in enqueue order with at most one in flight, so
//! the backend always holds a prefix of the mutation history. Reads
//! (`snapshot`) never touch the backend.
//!
//! ## Failure semantics
//!
//! A failed load at [`SessionStore::init`] degrades to an empty store; a
//! failed write-back is logged and dropped. In-memory state stays
//! authoritative for the life of the process either way.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::config::StoreConfig;
use crate::storage::StorageBackend;
use crate::timeutil;
use crate::types::{ActiveSession, DailyTotals, MapMetadata, MapMetadataPatch, MapSession, StoreData};

/// Backend key under which the store blob lives.
pub const STORE_KEY: &str = "maptrack.store";

/// Change callback registered via [`SessionStore::on_change`].
pub type Listener = Box<dyn Fn() + Send + Sync + 'static>;

/// Handle for removing a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

enum WriteJob {
    Save(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

/// The persistence-backed session state machine.
pub struct SessionStore {
    state: Mutex<StoreData>,
    config: StoreConfig,
    write_tx: mpsc::UnboundedSender<WriteJob>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
}

impl SessionStore {
    /// Load persisted state from the backend and start the writer task.
    ///
    /// Initialization-before-use is a constructor guarantee: no other
    /// method exists until this returns. Backend failures degrade to an
    /// empty in-memory store rather than failing startup.
    pub async fn init(backend: Arc<dyn StorageBackend>, config: StoreConfig) -> Self {
        if let Err(e) = backend.init().await {
            tracing::warn!(error = %e, "storage backend init failed; running memory-only until writes succeed");
        }

        let data = match backend.get(STORE_KEY).await {
            Ok(Some(blob)) => match serde_json::from_slice::<StoreData>(&blob) {
                Ok(data) => {
                    tracing::debug!(
                        sessions = data.sessions.len(),
                        day_buckets = data.daily_totals.len(),
                        "loaded persisted store"
                    );
                    data
                }
                Err(e) => {
                    tracing::warn!(error = %e, "persisted store blob is corrupt; starting empty");
                    StoreData::default()
                }
            },
            Ok(None) => StoreData::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted store; starting empty");
                StoreData::default()
            }
        };

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(backend, write_rx));

        Self {
            state: Mutex::new(data),
            config,
            write_tx,
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    // ============================================
    // State machine operations
    // ============================================

    /// The player entered `map_id`. Closes any running session first.
    pub fn start(&self, map_id: &str, metadata: Option<MapMetadataPatch>) {
        self.start_at(map_id, metadata, Utc::now());
    }

    /// `start` with an explicit clock, for recovery paths and tests.
    pub fn start_at(
        &self,
        map_id: &str,
        metadata: Option<MapMetadataPatch>,
        now: DateTime<Utc>,
    ) {
        {
            let mut data = self.lock_state();
            if data.active_session.is_some() {
                close_active(&mut data, now, &self.config);
            }
            data.active_session = Some(ActiveSession {
                map_id: map_id.to_string(),
                started_at: now,
            });
            if let Some(patch) = metadata {
                upsert_metadata(&mut data, map_id, patch, now);
            }
            tracing::debug!(map_id, "session started");
            self.commit(&data);
        }
        self.notify();
    }

    /// The player left the tracked area. No-op when idle.
    pub fn stop(&self) {
        self.stop_at(Utc::now());
    }

    /// `stop` with an explicit clock.
    pub fn stop_at(&self, now: DateTime<Utc>) {
        {
            let mut data = self.lock_state();
            if data.active_session.is_none() {
                return;
            }
            close_active(&mut data, now, &self.config);
            self.commit(&data);
        }
        self.notify();
    }

    /// Stop only if the active session is on `map_id`.
    ///
    /// Covers the race where a "left map X" signal arrives after the
    /// player already switched to map Y.
    pub fn stop_if_active_map_is(&self, map_id: &str) {
        self.stop_if_active_map_is_at(map_id, Utc::now());
    }

    /// `stop_if_active_map_is` with an explicit clock.
    pub fn stop_if_active_map_is_at(&self, map_id: &str, now: DateTime<Utc>) {
        {
            let mut data = self.lock_state();
            match &data.active_session {
                Some(active) if active.map_id == map_id => {}
                _ => return,
            }
            close_active(&mut data, now, &self.config);
            self.commit(&data);
        }
        self.notify();
    }

    /// Crash recovery, called once right after `init`.
    ///
    /// An active session older than the configured ceiling is treated as
    /// abandoned by an unclean shutdown and force-closed through the
    /// normal close path, crediting the full elapsed time. A legitimately
    /// long-running session inside the ceiling is left untouched.
    pub fn recover(&self) {
        self.recover_at(Utc::now());
    }

    /// `recover` with an explicit clock.
    pub fn recover_at(&self, now: DateTime<Utc>) {
        {
            let mut data = self.lock_state();
            let Some(active) = &data.active_session else {
                return;
            };
            let ceiling = Duration::hours(self.config.max_session_hours);
            if now - active.started_at <= ceiling {
                return;
            }
            tracing::info!(
                map_id = %active.map_id,
                started_at = %active.started_at,
                "closing session abandoned by unclean shutdown"
            );
            close_active(&mut data, now, &self.config);
            self.commit(&data);
        }
        self.notify();
    }

    /// Upsert display metadata for a map; omitted fields keep their
    /// previous values.
    pub fn update_map_metadata(&self, map_id: &str, patch: MapMetadataPatch) {
        self.update_map_metadata_at(map_id, patch, Utc::now());
    }

    /// `update_map_metadata` with an explicit clock.
    pub fn update_map_metadata_at(
        &self,
        map_id: &str,
        patch: MapMetadataPatch,
        now: DateTime<Utc>,
    ) {
        {
            let mut data = self.lock_state();
            upsert_metadata(&mut data, map_id, patch, now);
            self.commit(&data);
        }
        self.notify();
    }

    // ============================================
    // Reads
    // ============================================

    /// Synchronous copy of the current in-memory state.
    ///
    /// Always reflects every mutation issued so far, which may be ahead of
    /// what the backend has durably written.
    pub fn snapshot(&self) -> StoreData {
        self.lock_state().clone()
    }

    /// The currently timed session, if any.
    pub fn active_session(&self) -> Option<ActiveSession> {
        self.lock_state().active_session.clone()
    }

    // ============================================
    // Write queue
    // ============================================

    /// Resolve once every write scheduled before this call has been
    /// applied (or dropped after a logged failure).
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.write_tx.send(WriteJob::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Serialize the current state and hand it to the writer task.
    ///
    /// Must be called while the state lock is held so snapshots enter the
    /// queue in mutation order.
    fn commit(&self, data: &StoreData) {
        match serde_json::to_vec(data) {
            Ok(blob) => {
                if self.write_tx.send(WriteJob::Save(blob)).is_err() {
                    tracing::warn!("store writer task is gone; dropping write-back");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize store snapshot; dropping write-back");
            }
        }
    }

    // ============================================
    // Change listeners
    // ============================================

    /// Register a callback fired after each scheduled write. Consumers are
    /// expected to re-query via `snapshot` or a facade, not to receive a
    /// diff.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.lock_listeners().push((id, Box::new(listener)));
        ListenerId(id)
    }

    /// Remove a previously registered listener.
    pub fn remove_listener(&self, id: ListenerId) {
        self.lock_listeners().retain(|(lid, _)| *lid != id.0);
    }

    fn notify(&self) {
        for (_, listener) in self.lock_listeners().iter() {
            listener();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreData> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn run_writer(
    backend: Arc<dyn StorageBackend>,
    mut rx: mpsc::UnboundedReceiver<WriteJob>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            WriteJob::Save(blob) => {
                if let Err(e) = backend.set(STORE_KEY, &blob).await {
                    tracing::warn!(error = %e, "store write-back failed; in-memory state remains authoritative");
                }
            }
            WriteJob::Flush(ack) => {
                // Jobs are processed in order, so reaching the marker means
                // every earlier save has settled.
                let _ = ack.send(());
            }
        }
    }
}

// ============================================
// Close path (pure, operates on StoreData)
// ============================================

/// Close the active session at `now`: append it, distribute its duration
/// into the day buckets and run throttled retention. Sessions with a
/// non-positive duration are discarded and write nothing; clock
/// adjustments can legitimately produce them.
fn close_active(data: &mut StoreData, now: DateTime<Utc>, config: &StoreConfig) {
    let Some(active) = data.active_session.take() else {
        return;
    };
    if now <= active.started_at {
        tracing::debug!(
            map_id = %active.map_id,
            "discarding session with non-positive duration"
        );
        return;
    }

    let session = MapSession {
        map_id: active.map_id,
        started_at: active.started_at,
        ended_at: now,
    };
    split_into_daily_totals(&mut data.daily_totals, &session);
    tracing::debug!(
        map_id = %session.map_id,
        duration_ms = session.duration_ms(),
        "session closed"
    );
    data.sessions.push(session);

    maybe_run_cleanup(data, now, config);
}

/// Distribute a session's duration into per-day buckets.
///
/// Walks a cursor from start to end, clipping each step to the current
/// UTC day window. The cursor strictly advances every iteration and is
/// bounded by `ended_at`, and the clipped slices partition the session, so
/// the per-day increments sum to exactly the session duration.
fn split_into_daily_totals(totals: &mut DailyTotals, session: &MapSession) {
    let mut cursor = session.started_at;
    while cursor < session.ended_at {
        let day_end = timeutil::next_day_start(cursor);
        let slice_end = day_end.min(session.ended_at);
        let slice_ms = (slice_end - cursor).num_milliseconds() as u64;
        if slice_ms > 0 {
            *totals
                .entry(timeutil::day_key(cursor))
                .or_default()
                .entry(session.map_id.clone())
                .or_insert(0) += slice_ms;
        }
        cursor = slice_end;
    }
}

/// Throttled retention: at most once per configured interval, drop day
/// buckets and completed sessions older than the retention cutoff.
/// Re-running with an unchanged cutoff is a no-op. Day keys that fail to
/// parse are retained; only provably old data is deleted.
fn maybe_run_cleanup(data: &mut StoreData, now: DateTime<Utc>, config: &StoreConfig) {
    if let Some(last) = data.last_cleanup_at {
        if now - last < Duration::minutes(config.cleanup_interval_mins) {
            return;
        }
    }

    let cutoff = timeutil::start_of_day(now) - Duration::days(config.retention_days);
    let buckets_before = data.daily_totals.len();
    let sessions_before = data.sessions.len();

    data.daily_totals.retain(|key, _| match timeutil::parse_day_key(key) {
        Some(day) => day >= cutoff,
        None => true,
    });
    data.sessions.retain(|s| s.ended_at >= cutoff);
    data.last_cleanup_at = Some(now);

    let dropped_buckets = buckets_before - data.daily_totals.len();
    let dropped_sessions = sessions_before - data.sessions.len();
    if dropped_buckets > 0 || dropped_sessions > 0 {
        tracing::info!(
            %cutoff,
            dropped_buckets,
            dropped_sessions,
            "retention cleanup pruned history"
        );
    }
}

/// Last-write-wins per field; `None` fields preserve prior values.
fn upsert_metadata(
    data: &mut StoreData,
    map_id: &str,
    patch: MapMetadataPatch,
    now: DateTime<Utc>,
) {
    let entry = data
        .maps
        .entry(map_id.to_string())
        .or_insert_with(|| MapMetadata {
            map_id: map_id.to_string(),
            title: None,
            thumbnail: None,
            updated_at: now,
        });
    if patch.title.is_some() {
        entry.title = patch.title;
    }
    if patch.thumbnail.is_some() {
        entry.thumbnail = patch.thumbnail;
    }
    entry.updated_at = now;
}
