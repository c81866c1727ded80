use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::config::PortalConfig;
use crate::intake::AcceptedScan;
use crate::models::{AnalysisResult, NotificationId, NotificationRecord};
use crate::notifications::{FetchTarget, MutateTarget, NotificationApi};
use crate::upload::ScanAnalyzer;

/// Path of the classification + segmentation endpoint (spelling is the server's).
const ANALYZE_PATH: &str = "detection/segement/";

/// Multipart field the analysis endpoint reads the image from.
const IMAGE_FIELD: &str = "image";

/// HTTP client for the imaging API. One instance can back both engines.
#[derive(Clone)]
pub struct PortalClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ReadFlagBody {
    read: bool,
}

/// Raw analysis payload; both fields checked before building the result.
#[derive(Deserialize)]
struct AnalysisResponse {
    classification_result: Option<String>,
    segmentation_result_url: Option<String>,
}

impl PortalClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &PortalConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        ApiError::from_reqwest(err, &self.base_url, self.timeout_secs)
    }

    /// Reject non-2xx responses, keeping the body for diagnostics.
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::status(status.as_u16(), &body))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ScanAnalyzer for PortalClient {
    async fn analyze(&self, scan: &AcceptedScan) -> Result<AnalysisResult, ApiError> {
        let part = reqwest::multipart::Part::bytes(scan.content().to_vec())
            .file_name(scan.file_name().to_string())
            .mime_str(scan.media_type())
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part(IMAGE_FIELD, part);

        let response = self
            .client
            .post(self.url(ANALYZE_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;

        let parsed: AnalysisResponse = self.read_json(response).await?;
        match (parsed.classification_result, parsed.segmentation_result_url) {
            (Some(label), Some(reference)) => {
                let result = AnalysisResult {
                    classification_label: label,
                    segmentation_ref: reference,
                };
                if result.is_complete() {
                    Ok(result)
                } else {
                    Err(ApiError::Malformed("empty analysis fields".into()))
                }
            }
            _ => Err(ApiError::Malformed(
                "missing classification_result or segmentation_result_url".into(),
            )),
        }
    }
}

#[async_trait]
impl NotificationApi for PortalClient {
    async fn fetch(&self, target: &FetchTarget) -> Result<Vec<NotificationRecord>, ApiError> {
        let response = self
            .client
            .get(self.url(&target.path()))
            .query(&target.query())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;
        self.read_json(response).await
    }

    async fn set_read(
        &self,
        target: &MutateTarget,
        id: NotificationId,
        read: bool,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .patch(self.url(&target.item_path(id)))
            .json(&ReadFlagBody { read })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.check_status(response).await?;
        Ok(())
    }
}
