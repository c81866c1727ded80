//! Scan-submission engine: one MRI image per session, analysed remotely.

pub mod session;
pub mod severity;

pub use session::{UploadSession, UploadSnapshot, ANALYSIS_FAILED_MESSAGE};
pub use severity::SeverityTable;

use async_trait::async_trait;
use thiserror::Error;

use crate::api::ApiError;
use crate::intake::{AcceptedScan, IntakeRejection};
use crate::models::AnalysisResult;

/// Remote classification + segmentation service.
#[async_trait]
pub trait ScanAnalyzer: Send + Sync {
    async fn analyze(&self, scan: &AcceptedScan) -> Result<AnalysisResult, ApiError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error(transparent)]
    Rejected(#[from] IntakeRejection),

    #[error("no file selected")]
    NoFileSelected,

    #[error("A scan is already being analyzed")]
    AlreadySubmitting,

    #[error("Analysis failed: {0}")]
    Analysis(#[source] ApiError),

    #[error("Upload session is closed")]
    SessionClosed,

    /// A new selection or teardown superseded this submission.
    #[error("Result discarded: the session moved on")]
    Superseded,
}
