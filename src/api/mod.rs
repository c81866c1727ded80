//! Imaging API boundary.
//!
//! `PortalClient` implements the two remote traits the engines depend on
//! (`upload::ScanAnalyzer`, `notifications::NotificationApi`) over reqwest.

pub mod client;
pub mod error;

pub use client::PortalClient;
pub use error::ApiError;
