//! Scan intake: turns a picked or dropped file into an accepted scan.

pub mod format;

pub use format::*;

use thiserror::Error;

/// Machine-readable reason shared by every rejection.
pub const REJECTION_REASON: &str = "unsupported or missing file";

/// Why a file candidate was not accepted. Never fatal: the upload
/// session surfaces the message and stays idle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeRejection {
    #[error("Please select a valid MRI scan image (JPEG or PNG).")]
    Missing,

    #[error("Please select a valid MRI scan image (JPEG or PNG).")]
    UnsupportedType(String),
}

impl IntakeRejection {
    pub fn reason(&self) -> &'static str {
        REJECTION_REASON
    }
}
