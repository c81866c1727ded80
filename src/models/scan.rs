use serde::{Deserialize, Serialize};

/// Successful analysis payload from the segmentation endpoint.
///
/// The classification label is passed through exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "classification_result")]
    pub classification_label: String,
    /// Server-relative path of the segmentation mask image.
    #[serde(rename = "segmentation_result_url")]
    pub segmentation_ref: String,
}

impl AnalysisResult {
    /// Both fields must be present and non-blank for a usable result.
    pub fn is_complete(&self) -> bool {
        !self.classification_label.trim().is_empty() && !self.segmentation_ref.trim().is_empty()
    }

    /// Absolute URL of the segmentation image, for display or download.
    ///
    /// Absolute references are returned unchanged.
    pub fn segmentation_url(&self, base_url: &str) -> String {
        let reference = self.segmentation_ref.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return reference.to_string();
        }
        let base = base_url.trim_end_matches('/');
        if reference.starts_with('/') {
            format!("{base}{reference}")
        } else {
            format!("{base}/{reference}")
        }
    }
}
