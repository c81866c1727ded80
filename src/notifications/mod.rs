//! Notification classification & routing engine.
//!
//! Pipeline: identity → `source::resolve` → remote fetch → `parser::parse`
//! and `links::resolve` per item (once, at load) → `NotificationStore`.

pub mod links;
pub mod parser;
pub mod source;
pub mod store;

pub use parser::{parse, ParsedMessage};
pub use source::{Collection, FetchTarget, MutateTarget, NotificationEndpoints};
pub use store::{LoadState, MarkReadOutcome, NotificationStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::api::ApiError;
use crate::models::{NotificationId, NotificationRecord};

/// Remote notification collections.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Ordered list for one user. Order is preserved by the store.
    async fn fetch(&self, target: &FetchTarget) -> Result<Vec<NotificationRecord>, ApiError>;

    /// Set the read flag of one notification.
    async fn set_read(
        &self,
        target: &MutateTarget,
        id: NotificationId,
        read: bool,
    ) -> Result<(), ApiError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Could not load notifications: {0}")]
    Load(#[source] ApiError),

    #[error("Notifications have not been loaded")]
    NotLoaded,

    #[error("Notification session is closed")]
    SessionClosed,

    /// A newer load or teardown superseded this call; its result was dropped.
    #[error("Result discarded: the session moved on")]
    Superseded,
}
