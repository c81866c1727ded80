//! Upload session state machine.
//!
//! ```text
//!            select(ok)               submit                 payload ok
//!  Idle ───────────────▶ Ready ─────────────────▶ Submitting ──────────▶ Succeeded
//!   ▲  select(rejected)    │                          │ transport / status /
//!   └──────────────────────┘                          │ malformed payload
//!                                                     └────────────────▶ Failed
//! ```
//!
//! Any state accepts a new selection, which restarts the machine and
//! invalidates an in-flight submission. Succeeded and Failed never reset on
//! their own. Exactly one remote call per entry into Submitting, and never
//! more than one outstanding per session: a superseded call still blocks the
//! next submit until it resolves.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use super::{ScanAnalyzer, UploadError};
use crate::api::ApiError;
use crate::intake::{self, AcceptedScan, FileCandidate};
use crate::models::{AnalysisResult, UploadStatus};

/// User-facing message for every failed analysis.
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "An error occurred while analyzing the scan. Please try again.";

/// Metadata of the held file, safe to hand to the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeldFile {
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: u64,
}

/// What the view renders. At most one of `file`, `result`, `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSnapshot {
    pub status: UploadStatus,
    pub file: Option<HeldFile>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

impl UploadSnapshot {
    fn idle() -> Self {
        Self {
            status: UploadStatus::Idle,
            file: None,
            result: None,
            error: None,
        }
    }
}

struct SessionState {
    status: UploadStatus,
    held: Option<AcceptedScan>,
    result: Option<AnalysisResult>,
    error: Option<String>,
    /// Bumped by every selection and by `close`.
    epoch: u64,
    /// An analysis call is outstanding. Independent of `status`, which a
    /// new selection resets while the call is still running.
    in_flight: bool,
    closed: bool,
}

impl SessionState {
    fn snapshot(&self) -> UploadSnapshot {
        UploadSnapshot {
            status: self.status,
            file: self.held.as_ref().map(|scan| HeldFile {
                file_name: scan.file_name().to_string(),
                media_type: scan.media_type().to_string(),
                size_bytes: scan.size_bytes(),
            }),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Handle over one page visit's upload flow. Clones share the session.
#[derive(Clone)]
pub struct UploadSession {
    session_id: Uuid,
    analyzer: Arc<dyn ScanAnalyzer>,
    state: Arc<Mutex<SessionState>>,
    updates: Arc<watch::Sender<UploadSnapshot>>,
}

impl UploadSession {
    pub fn new(analyzer: Arc<dyn ScanAnalyzer>) -> Self {
        let (updates, _) = watch::channel(UploadSnapshot::idle());
        Self {
            session_id: Uuid::new_v4(),
            analyzer,
            state: Arc::new(Mutex::new(SessionState {
                status: UploadStatus::Idle,
                held: None,
                result: None,
                error: None,
                epoch: 0,
                in_flight: false,
                closed: false,
            })),
            updates: Arc::new(updates),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    // Never held across an await.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.snapshot());
    }

    pub fn status(&self) -> UploadStatus {
        self.lock().status
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.lock().snapshot()
    }

    /// Receive a snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.updates.subscribe()
    }

    /// Bytes of the held file, for a local preview.
    pub fn preview(&self) -> Option<Vec<u8>> {
        self.lock().held.as_ref().map(|scan| scan.content().to_vec())
    }

    // ── Selection ───────────────────────────────────────────

    /// Feed a new file selection (picker or drop) into the machine.
    ///
    /// Accepted → `Ready`. Rejected → `Idle` with the rejection shown as the
    /// session error. Either way any previous result or error is discarded
    /// and an in-flight submission will not be applied.
    pub fn select_file(&self, candidate: Option<FileCandidate>) -> Result<(), UploadError> {
        let mut state = self.lock();
        if state.closed {
            return Err(UploadError::SessionClosed);
        }

        state.epoch += 1;
        state.result = None;

        let outcome = match intake::validate(candidate) {
            Ok(scan) => {
                tracing::info!(
                    session_id = %self.session_id,
                    file = scan.file_name(),
                    media_type = scan.media_type(),
                    size_bytes = scan.size_bytes(),
                    "Scan selected"
                );
                state.status = UploadStatus::Ready;
                state.held = Some(scan);
                state.error = None;
                Ok(())
            }
            Err(rejection) => {
                tracing::info!(session_id = %self.session_id, "Scan rejected: {rejection:?}");
                state.status = UploadStatus::Idle;
                state.held = None;
                state.error = Some(rejection.to_string());
                Err(UploadError::Rejected(rejection))
            }
        };

        self.publish(&state);
        outcome
    }

    // ── Submission ──────────────────────────────────────────

    /// Send the held scan for analysis. Allowed only from `Ready`.
    ///
    /// The precondition is checked before the first suspension point, so a
    /// second submit issued while one is in flight is refused immediately.
    pub async fn submit(&self) -> Result<AnalysisResult, UploadError> {
        let (epoch, scan) = {
            let mut state = self.lock();
            if state.closed {
                return Err(UploadError::SessionClosed);
            }
            if state.in_flight || state.status == UploadStatus::Submitting {
                return Err(UploadError::AlreadySubmitting);
            }
            let scan = match state.held.as_ref() {
                Some(scan) if state.status == UploadStatus::Ready && !scan.is_empty() => {
                    scan.clone()
                }
                _ => return Err(UploadError::NoFileSelected),
            };

            state.status = UploadStatus::Submitting;
            state.in_flight = true;
            state.error = None;
            state.result = None;
            self.publish(&state);
            (state.epoch, scan)
        };

        let in_flight = InFlight(&self.state);
        tracing::info!(
            session_id = %self.session_id,
            file = scan.file_name(),
            "Submitting scan for analysis"
        );
        let outcome = self
            .analyzer
            .analyze(&scan)
            .await
            .and_then(|result| {
                if result.is_complete() {
                    Ok(result)
                } else {
                    Err(ApiError::Malformed(
                        "analysis payload is missing classification or segmentation".into(),
                    ))
                }
            });

        let mut state = self.lock();
        in_flight.release(&mut state);
        if state.closed || state.epoch != epoch {
            tracing::debug!(session_id = %self.session_id, "Discarding stale analysis result");
            return Err(UploadError::Superseded);
        }

        state.held = None;
        let reply = match outcome {
            Ok(result) => {
                tracing::info!(
                    session_id = %self.session_id,
                    label = %result.classification_label,
                    "Analysis succeeded"
                );
                state.status = UploadStatus::Succeeded;
                state.result = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, "Analysis failed: {e}");
                state.status = UploadStatus::Failed;
                state.error = Some(ANALYSIS_FAILED_MESSAGE.to_string());
                Err(UploadError::Analysis(e))
            }
        };

        self.publish(&state);
        reply
    }

    // ── Teardown ────────────────────────────────────────────

    /// End the session (navigation away). Late results are discarded.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.epoch += 1;
        state.held = None;
        tracing::debug!(session_id = %self.session_id, "Upload session closed");
        self.publish(&state);
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Clears `in_flight` when the analysis call ends, including when the
/// `submit` future is dropped mid-call.
struct InFlight<'a>(&'a Mutex<SessionState>);

impl InFlight<'_> {
    fn release(self, state: &mut SessionState) {
        state.in_flight = false;
        std::mem::forget(self);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    /// Analyzer returning a fixed outcome and counting calls.
    struct MockAnalyzer {
        outcome: Result<AnalysisResult, ApiError>,
        calls: AtomicUsize,
    }

    impl MockAnalyzer {
        fn ok(label: &str) -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(AnalysisResult {
                    classification_label: label.into(),
                    segmentation_ref: "/media/segmentation/1.png".into(),
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(error: ApiError) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(error),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScanAnalyzer for MockAnalyzer {
        async fn analyze(&self, _scan: &AcceptedScan) -> Result<AnalysisResult, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    /// Analyzer that waits for a release signal before answering.
    struct GatedAnalyzer {
        release: tokio::sync::Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScanAnalyzer for GatedAnalyzer {
        async fn analyze(&self, _scan: &AcceptedScan) -> Result<AnalysisResult, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(AnalysisResult {
                classification_label: "Glioma".into(),
                segmentation_ref: "/media/seg.png".into(),
            })
        }
    }

    fn png() -> Option<FileCandidate> {
        Some(FileCandidate::new(PNG.to_vec(), "image/png").with_file_name("axial.png"))
    }

    fn assert_exclusive(snapshot: &UploadSnapshot) {
        let active = [
            snapshot.file.is_some(),
            snapshot.result.is_some(),
            snapshot.error.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count();
        assert!(active <= 1, "more than one of file/result/error set: {snapshot:?}");
    }

    #[tokio::test]
    async fn happy_path_reaches_succeeded() {
        let analyzer = MockAnalyzer::ok("Meningioma");
        let session = UploadSession::new(analyzer.clone());
        assert_eq!(session.status(), UploadStatus::Idle);

        session.select_file(png()).unwrap();
        assert_eq!(session.status(), UploadStatus::Ready);
        assert_eq!(session.snapshot().file.unwrap().file_name, "axial.png");
        assert_eq!(session.preview().unwrap(), PNG);

        let result = session.submit().await.unwrap();
        assert_eq!(result.classification_label, "Meningioma");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, UploadStatus::Succeeded);
        assert!(snapshot.file.is_none());
        assert_eq!(snapshot.result.unwrap().classification_label, "Meningioma");
        assert_eq!(analyzer.calls(), 1);
    }

    #[tokio::test]
    async fn non_image_rejected_without_remote_call() {
        let analyzer = MockAnalyzer::ok("Glioma");
        let session = UploadSession::new(analyzer.clone());

        let err = session
            .select_file(Some(FileCandidate::new(b"%PDF-1.4".to_vec(), "application/pdf")))
            .unwrap_err();
        assert!(matches!(err, UploadError::Rejected(_)));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, UploadStatus::Idle);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Please select a valid MRI scan image (JPEG or PNG).")
        );
        assert_eq!(session.submit().await, Err(UploadError::NoFileSelected));
        assert_eq!(analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn submit_without_file_leaves_state_alone() {
        let session = UploadSession::new(MockAnalyzer::ok("Glioma"));
        let before = session.snapshot();
        assert_eq!(session.submit().await, Err(UploadError::NoFileSelected));
        assert_eq!(session.snapshot(), before);
        assert_eq!(UploadError::NoFileSelected.to_string(), "no file selected");
    }

    #[tokio::test]
    async fn transport_failure_reaches_failed_and_clears_file() {
        let analyzer = MockAnalyzer::err(ApiError::Connection("http://localhost:9000".into()));
        let session = UploadSession::new(analyzer.clone());
        session.select_file(png()).unwrap();

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, UploadError::Analysis(ApiError::Connection(_))));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, UploadStatus::Failed);
        assert!(snapshot.file.is_none());
        assert_eq!(snapshot.error.as_deref(), Some(ANALYSIS_FAILED_MESSAGE));

        // No automatic retry: resubmitting needs a new selection.
        assert_eq!(session.submit().await, Err(UploadError::NoFileSelected));
        assert_eq!(analyzer.calls(), 1);
    }

    #[tokio::test]
    async fn incomplete_payload_is_a_failure() {
        let analyzer = Arc::new(MockAnalyzer {
            outcome: Ok(AnalysisResult {
                classification_label: "Glioma".into(),
                segmentation_ref: String::new(),
            }),
            calls: AtomicUsize::new(0),
        });
        let session = UploadSession::new(analyzer);
        session.select_file(png()).unwrap();

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, UploadError::Analysis(ApiError::Malformed(_))));
        assert_eq!(session.status(), UploadStatus::Failed);
    }

    #[tokio::test]
    async fn terminal_states_only_leave_via_selection() {
        let session = UploadSession::new(MockAnalyzer::ok("Pituitary"));
        session.select_file(png()).unwrap();
        session.submit().await.unwrap();
        assert_eq!(session.status(), UploadStatus::Succeeded);

        // Rejected re-selection goes to Idle and drops the old result.
        session.select_file(None).unwrap_err();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, UploadStatus::Idle);
        assert!(snapshot.result.is_none());
        assert_exclusive(&snapshot);

        session.select_file(png()).unwrap();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, UploadStatus::Ready);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn second_submit_in_flight_is_refused() {
        let analyzer = Arc::new(GatedAnalyzer {
            release: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = UploadSession::new(analyzer.clone());
        session.select_file(png()).unwrap();

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit().await })
        };
        while session.status() != UploadStatus::Submitting {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.submit().await, Err(UploadError::AlreadySubmitting));

        analyzer.release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(session.submit().await, Err(UploadError::NoFileSelected));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn new_selection_discards_in_flight_result() {
        let analyzer = Arc::new(GatedAnalyzer {
            release: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = UploadSession::new(analyzer.clone());
        session.select_file(png()).unwrap();

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit().await })
        };
        while session.status() != UploadStatus::Submitting {
            tokio::task::yield_now().await;
        }

        session.select_file(png()).unwrap();
        analyzer.release.notify_one();

        assert_eq!(first.await.unwrap(), Err(UploadError::Superseded));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, UploadStatus::Ready);
        assert!(snapshot.result.is_none());
    }

    #[tokio::test]
    async fn reselect_during_submit_still_blocks_next_call() {
        let analyzer = Arc::new(GatedAnalyzer {
            release: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = UploadSession::new(analyzer.clone());
        session.select_file(png()).unwrap();

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit().await })
        };
        while session.status() != UploadStatus::Submitting {
            tokio::task::yield_now().await;
        }

        // The new selection resets status to Ready but the first call is
        // still outstanding.
        session.select_file(png()).unwrap();
        assert_eq!(session.status(), UploadStatus::Ready);
        assert_eq!(session.submit().await, Err(UploadError::AlreadySubmitting));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);

        analyzer.release.notify_one();
        assert_eq!(first.await.unwrap(), Err(UploadError::Superseded));

        // Resolved, so the held selection can go out now.
        analyzer.release.notify_one();
        let result = session.submit().await.unwrap();
        assert_eq!(result.classification_label, "Glioma");
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_submit_releases_the_session() {
        let analyzer = Arc::new(GatedAnalyzer {
            release: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = UploadSession::new(analyzer.clone());
        session.select_file(png()).unwrap();

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit().await })
        };
        while session.status() != UploadStatus::Submitting {
            tokio::task::yield_now().await;
        }
        first.abort();
        let _ = first.await;

        session.select_file(png()).unwrap();
        analyzer.release.notify_one();
        assert!(session.submit().await.is_ok());
    }

    #[tokio::test]
    async fn close_discards_in_flight_result() {
        let analyzer = Arc::new(GatedAnalyzer {
            release: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = UploadSession::new(analyzer.clone());
        session.select_file(png()).unwrap();

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit().await })
        };
        while session.status() != UploadStatus::Submitting {
            tokio::task::yield_now().await;
        }

        session.close();
        analyzer.release.notify_one();

        assert_eq!(first.await.unwrap(), Err(UploadError::Superseded));
        assert!(session.snapshot().result.is_none());
        assert_eq!(session.select_file(png()), Err(UploadError::SessionClosed));
        assert_eq!(session.submit().await, Err(UploadError::SessionClosed));
    }

    #[tokio::test]
    async fn subscribers_see_each_transition() {
        let session = UploadSession::new(MockAnalyzer::ok("No Tumour"));
        let mut updates = session.subscribe();
        assert_eq!(updates.borrow_and_update().status, UploadStatus::Idle);

        session.select_file(png()).unwrap();
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().status, UploadStatus::Ready);

        session.submit().await.unwrap();
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.status, UploadStatus::Succeeded);
        assert_exclusive(&latest);
    }

    #[tokio::test]
    async fn selection_sequences_keep_invariants() {
        let session = UploadSession::new(MockAnalyzer::ok("Glioma"));
        let candidates = [
            png(),
            None,
            Some(FileCandidate::new(vec![1, 2, 3], "image/gif")),
            png(),
            Some(FileCandidate::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg")),
        ];

        for candidate in candidates {
            let _ = session.select_file(candidate);
            let snapshot = session.snapshot();
            assert_exclusive(&snapshot);
            if snapshot.status == UploadStatus::Ready {
                assert!(snapshot.file.is_some());
                let _ = session.submit().await;
                assert_exclusive(&session.snapshot());
            } else {
                assert!(snapshot.file.is_none());
            }
        }
    }
}
