pub mod api; // Imaging API client
pub mod config;
pub mod identity; // Identity collaborator boundary
pub mod intake; // Scan intake validation
pub mod models;
pub mod notifications; // Notification classification & routing
pub mod upload; // Scan-submission state machine

use tracing_subscriber::EnvFilter;

pub use api::{ApiError, PortalClient};
pub use config::PortalConfig;
pub use identity::{Identity, IdentityProvider};
pub use notifications::NotificationStore;
pub use upload::UploadSession;

/// Install the global `tracing` subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
