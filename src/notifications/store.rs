//! Notification list state for one page visit.
//!
//! Read-state changes are a two-phase commit: the local flag flips first,
//! then the remote mutation runs. If the remote half fails the item stays
//! read locally and is tagged `PendingRetry`; `retry_pending` pushes those
//! again. Nothing is rolled back. Until the remote half resolves the item is
//! `InFlight`, so an overlapping `mark_read` queues behind it instead of
//! reporting success early.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use uuid::Uuid;

use super::source::{self, MutateTarget, NotificationEndpoints};
use super::{links, parser, NotificationApi, NotificationError};
use crate::api::ApiError;
use crate::identity::IdentityProvider;
use crate::models::{Filter, NotificationId, NotificationItem, NotificationRecord, ReadSync, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
    /// The list is empty because the fetch failed, not because there is nothing.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MarkReadOutcome {
    /// Flipped locally and confirmed remotely.
    Marked,
    /// Already read and synced; nothing sent.
    AlreadyRead,
    /// No such id in the store; nothing changed.
    NotFound,
    /// Flipped locally, remote mutation failed with the given reason.
    PendingRetry(String),
}

/// How the remote half of a mark-read ended.
enum Push {
    /// Already confirmed by an earlier call; nothing sent.
    Skipped,
    Confirmed,
    Failed(ApiError),
}

struct StoreState {
    items: Vec<NotificationItem>,
    load_state: LoadState,
    endpoints: Option<NotificationEndpoints>,
    /// Bumped by every load and by `close`; completions from an older
    /// epoch are dropped.
    epoch: u64,
    closed: bool,
}

/// Cheap-to-clone handle over one session's notification list.
#[derive(Clone)]
pub struct NotificationStore {
    session_id: Uuid,
    api: Arc<dyn NotificationApi>,
    state: Arc<Mutex<StoreState>>,
    /// Serialises remote calls: one outstanding call per session.
    calls: Arc<tokio::sync::Mutex<()>>,
}

impl NotificationStore {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            api,
            state: Arc::new(Mutex::new(StoreState {
                items: Vec::new(),
                load_state: LoadState::NotLoaded,
                endpoints: None,
                epoch: 0,
                closed: false,
            })),
            calls: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    // Never held across an await; a poisoned lock still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Load ────────────────────────────────────────────────

    /// Fetch the list for this identity and replace the held items.
    ///
    /// The previous list stays visible until the fetch resolves. On failure
    /// the list is emptied and the load state records the failure.
    pub async fn load(&self, identity: &dyn IdentityProvider) -> Result<usize, NotificationError> {
        let _call = self.calls.lock().await;

        let role = identity.role();
        let (epoch, endpoints) = {
            let mut state = self.lock();
            if state.closed {
                return Err(NotificationError::SessionClosed);
            }
            state.epoch += 1;
            state.load_state = LoadState::Loading;
            (state.epoch, source::resolve(role, identity.user_id()))
        };

        tracing::debug!(
            session_id = %self.session_id,
            collection = endpoints.fetch.collection.path,
            "Fetching notifications"
        );
        let result = self.api.fetch(&endpoints.fetch).await;

        let mut state = self.lock();
        if state.closed || state.epoch != epoch {
            tracing::debug!(session_id = %self.session_id, "Discarding stale notification load");
            return Err(NotificationError::Superseded);
        }

        match result {
            Ok(records) => {
                let items: Vec<NotificationItem> =
                    records.into_iter().map(|r| augment(r, role)).collect();
                let count = items.len();
                state.items = items;
                state.endpoints = Some(endpoints);
                state.load_state = LoadState::Loaded;
                tracing::info!(
                    session_id = %self.session_id,
                    role = role.map(|r| r.as_str()).unwrap_or("unknown"),
                    count,
                    "Notifications loaded"
                );
                Ok(count)
            }
            Err(e) => {
                state.items.clear();
                state.endpoints = None;
                state.load_state = LoadState::Failed(e.to_string());
                tracing::warn!(session_id = %self.session_id, "Notification load failed: {e}");
                Err(NotificationError::Load(e))
            }
        }
    }

    // ── Read path ───────────────────────────────────────────

    pub fn load_state(&self) -> LoadState {
        self.lock().load_state.clone()
    }

    /// All held items in fetch order.
    pub fn items(&self) -> Vec<NotificationItem> {
        self.lock().items.clone()
    }

    /// Projection of the held list. Never mutates or reorders it.
    pub fn filter(&self, mode: Filter) -> Vec<NotificationItem> {
        self.lock()
            .items
            .iter()
            .filter(|item| mode.admits(item.read))
            .cloned()
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.lock().items.iter().filter(|item| !item.read).count()
    }

    pub fn pending_retry_count(&self) -> usize {
        self.lock().items.iter().filter(|item| item.is_pending_retry()).count()
    }

    // ── Read-state mutation ─────────────────────────────────

    /// Optimistically mark one notification read, then confirm remotely.
    ///
    /// Unknown ids are a no-op. An already-read, synced item succeeds
    /// without a remote call. A `PendingRetry` item is pushed again, and an
    /// `InFlight` one waits for the earlier call before deciding.
    pub async fn mark_read(&self, id: NotificationId) -> Result<MarkReadOutcome, NotificationError> {
        let (epoch, target) = {
            let mut state = self.lock();
            if state.closed {
                return Err(NotificationError::SessionClosed);
            }
            let Some(target) = state.endpoints.as_ref().map(|e| e.mutate) else {
                return Ok(MarkReadOutcome::NotFound);
            };
            let epoch = state.epoch;
            let Some(item) = state.items.iter_mut().find(|item| item.id == id) else {
                return Ok(MarkReadOutcome::NotFound);
            };
            if item.read && item.sync == ReadSync::Synced {
                return Ok(MarkReadOutcome::AlreadyRead);
            }
            item.read = true;
            item.sync = ReadSync::InFlight;
            (epoch, target)
        };

        Ok(match self.push_read(id, target, epoch).await? {
            Push::Skipped => MarkReadOutcome::AlreadyRead,
            Push::Confirmed => MarkReadOutcome::Marked,
            Push::Failed(e) => MarkReadOutcome::PendingRetry(e.to_string()),
        })
    }

    /// Re-send every `PendingRetry` mutation, one at a time.
    /// Returns how many the server confirmed. Stops at the first transient
    /// failure; the rest stay pending.
    pub async fn retry_pending(&self) -> Result<usize, NotificationError> {
        let (epoch, target, pending) = {
            let state = self.lock();
            if state.closed {
                return Err(NotificationError::SessionClosed);
            }
            let Some(target) = state.endpoints.as_ref().map(|e| e.mutate) else {
                return Ok(0);
            };
            let pending: Vec<NotificationId> = state
                .items
                .iter()
                .filter(|item| item.is_pending_retry())
                .map(|item| item.id)
                .collect();
            (state.epoch, target, pending)
        };

        let mut confirmed = 0;
        for id in pending {
            match self.push_read(id, target, epoch).await? {
                Push::Confirmed => confirmed += 1,
                Push::Skipped => {}
                Push::Failed(e) if e.is_transient() => {
                    tracing::info!(
                        session_id = %self.session_id,
                        "Imaging API unavailable, leaving remaining read updates pending: {e}"
                    );
                    break;
                }
                Push::Failed(_) => {}
            }
        }
        Ok(confirmed)
    }

    /// Remote half of the two-phase mark-read.
    async fn push_read(
        &self,
        id: NotificationId,
        target: MutateTarget,
        epoch: u64,
    ) -> Result<Push, NotificationError> {
        let _call = self.calls.lock().await;
        {
            let state = self.lock();
            if state.closed {
                return Err(NotificationError::SessionClosed);
            }
            // An overlapping call for the same id may have settled it while
            // this one waited on the gate.
            let settled = state
                .items
                .iter()
                .any(|item| item.id == id && item.read && item.sync == ReadSync::Synced);
            if settled {
                return Ok(Push::Skipped);
            }
        }

        let result = self.api.set_read(&target, id, true).await;

        let mut state = self.lock();
        if state.closed {
            tracing::debug!(session_id = %self.session_id, id, "Discarding mark-read result after close");
            return Err(NotificationError::Superseded);
        }
        let current = state.epoch == epoch;
        let item = state.items.iter_mut().find(|item| item.id == id);

        match result {
            Ok(()) => {
                if let Some(item) = item {
                    item.read = true;
                    item.sync = ReadSync::Synced;
                }
                tracing::debug!(session_id = %self.session_id, id, "Notification marked read");
                Ok(Push::Confirmed)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, id, "Mark-read failed, pending retry: {e}");
                // A reload in between replaced the list with server truth.
                if current {
                    if let Some(item) = item {
                        item.sync = ReadSync::PendingRetry(e.to_string());
                    }
                }
                Ok(Push::Failed(e))
            }
        }
    }

    // ── Teardown ────────────────────────────────────────────

    /// End the session. In-flight results are discarded when they land.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            state.epoch += 1;
            tracing::debug!(session_id = %self.session_id, "Notification session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Attach the derived fields once, at load time.
fn augment(record: NotificationRecord, role: Option<Role>) -> NotificationItem {
    let parsed = parser::parse(&record.message);
    let link = links::resolve(role, parsed.category, &parsed.ref_id);
    NotificationItem {
        id: record.id,
        message: record.message,
        read: record.read,
        created_at: record.created_at,
        category: parsed.category,
        ref_id: parsed.ref_id,
        display_text: parsed.display_text,
        icon: parsed.icon,
        link,
        sync: ReadSync::Synced,
    }
}
