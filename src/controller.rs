//! Rewrite Request Lifecycle
//!
//! Owns the single logical rewrite operation: issues monotonically increasing
//! request ids, races the network call against a timeout, supports user
//! cancellation and drops every completion that is no longer current.
//!
//! Phases: `Idle -> Preparing -> AwaitingContext -> InFlight -> Idle`. Every
//! continuation re-checks its captured id against the current one before it
//! touches [`DisplayState`] or the host document.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::context::{build_context, ContextMode, ContextResult, DocumentSnapshot};
use crate::host::{HostDocument, HostError};
use crate::service::{RewriteRequest, RewriteTransport, ServiceError};

pub type RequestId = u64;

pub const STATUS_PROCESSING: &str = "Processing...";
pub const STATUS_REPLACED: &str = "Text replaced in document.";
pub const STATUS_COMPLETE: &str = "Rewrite complete.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Network error: {0}")]
    NetworkFailure(String),
    #[error("API error: {status}{}", .detail.as_ref().map(|d| format!(" - {}", d)).unwrap_or_default())]
    ServiceError { status: u16, detail: Option<String> },
    #[error("Request timed out after {seconds} seconds.")]
    Timeout { seconds: u64 },
    #[error("Canceled by user.")]
    UserCanceled,
    #[error("Please select text in the document or enter an instruction.")]
    EmptyInput,
    #[error("Error: {0}")]
    UnexpectedFailure(String),
}

impl Serialize for ControllerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<ServiceError> for ControllerError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Network(msg) => ControllerError::NetworkFailure(msg),
            ServiceError::Status { status, detail } => ControllerError::ServiceError { status, detail },
            ServiceError::EmptyOutput => ControllerError::ServiceError {
                status: 502,
                detail: Some(ServiceError::EmptyOutput.to_string()),
            },
            ServiceError::Deserialize(msg) => ControllerError::UnexpectedFailure(msg),
        }
    }
}

/// Where the current operation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Preparing,
    AwaitingContext,
    InFlight,
}

/// Why a request's token was signaled; the first reason wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CancelReason {
    User,
    Timeout { seconds: u64 },
    Superseded,
    Teardown,
}

/// Cancellation token tagged with the reason it fired
#[derive(Clone)]
struct CancelSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl CancelSignal {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
        }
    }

    fn fire(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }
}

/// The single current request
struct RequestRecord {
    id: RequestId,
    signal: CancelSignal,
    timer: Option<JoinHandle<()>>,
    started_at: DateTime<Utc>,
}

impl RequestRecord {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn cancel(&mut self, reason: CancelReason) {
        self.signal.fire(reason);
        self.disarm();
    }
}

/// Shared UI-facing state; only the controller writes it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub status: String,
    pub result: Option<String>,
    pub processing: bool,
    pub phase: Phase,
}

/// One user-initiated rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteInput {
    /// Used when the host selection is blank
    pub manual_text: String,
    pub instruction: String,
    pub provider: String,
    pub model: Option<String>,
    pub use_web_search: bool,
    pub context_mode: ContextMode,
    pub context_size: usize,
}

impl RewriteInput {
    /// Input seeded from the configured provider, model and context settings
    pub fn from_config(config: &AppConfig, instruction: impl Into<String>) -> Self {
        Self {
            manual_text: String::new(),
            instruction: instruction.into(),
            provider: config.provider.clone(),
            model: config.model.clone(),
            use_web_search: config.use_web_search,
            context_mode: config.context_mode,
            context_size: config.window_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResult {
    pub request_id: RequestId,
    pub rewritten_text: String,
    pub model_note: Option<String>,
    pub context_note: Option<String>,
    pub replaced: bool,
    pub replace_error: Option<String>,
}

/// How an operation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Completed(RewriteResult),
    Canceled,
    TimedOut { seconds: u64 },
    Failed(ControllerError),
    /// A newer operation took over; nothing was applied
    Superseded,
}

impl RewriteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RewriteOutcome::Completed(_) => "completed",
            RewriteOutcome::Canceled => "canceled",
            RewriteOutcome::TimedOut { .. } => "timed_out",
            RewriteOutcome::Failed(_) => "failed",
            RewriteOutcome::Superseded => "superseded",
        }
    }

    pub fn error(&self) -> Option<ControllerError> {
        match self {
            RewriteOutcome::Canceled => Some(ControllerError::UserCanceled),
            RewriteOutcome::TimedOut { seconds } => Some(ControllerError::Timeout { seconds: *seconds }),
            RewriteOutcome::Failed(e) => Some(e.clone()),
            RewriteOutcome::Completed(_) | RewriteOutcome::Superseded => None,
        }
    }
}

struct Inner {
    active: Option<RequestRecord>,
    display: DisplayState,
}

/// Drives rewrite operations against a host document and a transport
pub struct RewriteController {
    transport: Arc<dyn RewriteTransport>,
    host: Arc<dyn HostDocument>,
    config: AppConfig,
    last_id: AtomicU64,
    inner: Mutex<Inner>,
}

/// Await `fut` unless `signal` fires first
async fn guarded<F: Future>(signal: &CancelSignal, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = signal.token.cancelled() => None,
        out = fut => Some(out),
    }
}

impl RewriteController {
    pub fn new(transport: Arc<dyn RewriteTransport>, host: Arc<dyn HostDocument>, config: AppConfig) -> Self {
        Self {
            transport,
            host,
            config,
            last_id: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                active: None,
                display: DisplayState::default(),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Snapshot of the display state
    pub fn display(&self) -> DisplayState {
        self.inner.lock().display.clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().display.phase
    }

    pub fn current_id(&self) -> Option<RequestId> {
        self.inner.lock().active.as_ref().map(|r| r.id)
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        self.current_id() == Some(id)
    }

    /// Run one rewrite to completion.
    ///
    /// Starting a rewrite while another is active supersedes the older one;
    /// its eventual result is discarded.
    pub async fn rewrite(&self, input: RewriteInput) -> RewriteOutcome {
        let (id, signal) = self.begin();
        let outcome = self.run(id, &signal, input).await;
        info!(request_id = id, outcome = outcome.label(), "Rewrite finished");
        outcome
    }

    /// User cancellation of the current operation; returns false when idle
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        let Some(mut record) = inner.active.take() else {
            return false;
        };
        record.cancel(CancelReason::User);
        inner.display.status = ControllerError::UserCanceled.to_string();
        inner.display.processing = false;
        inner.display.phase = Phase::Idle;
        info!(request_id = record.id, "Rewrite canceled by user");
        true
    }

    /// Cancel whatever is running and clear every timer. Safe to call at any
    /// time, any number of times.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        if let Some(mut record) = inner.active.take() {
            record.cancel(CancelReason::Teardown);
            debug!(request_id = record.id, "Torn down in-flight rewrite");
        }
        inner.display.processing = false;
        inner.display.phase = Phase::Idle;
    }

    fn begin(&self) -> (RequestId, CancelSignal) {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let signal = CancelSignal::new();

        let mut inner = self.inner.lock();
        if let Some(mut previous) = inner.active.take() {
            previous.cancel(CancelReason::Superseded);
            info!(request_id = previous.id, superseded_by = id, "Superseding rewrite");
        }
        inner.active = Some(RequestRecord {
            id,
            signal: signal.clone(),
            timer: None,
            started_at: Utc::now(),
        });
        inner.display = DisplayState {
            status: STATUS_PROCESSING.to_string(),
            result: None,
            processing: true,
            phase: Phase::Preparing,
        };
        info!(request_id = id, "Rewrite started");
        (id, signal)
    }

    /// Apply `update` to the display if `id` is still current
    fn with_current(&self, id: RequestId, update: impl FnOnce(&mut DisplayState)) -> bool {
        let mut inner = self.inner.lock();
        if inner.active.as_ref().map(|r| r.id) != Some(id) {
            return false;
        }
        update(&mut inner.display);
        true
    }

    fn enter(&self, id: RequestId, phase: Phase) -> bool {
        let entered = self.with_current(id, |display| display.phase = phase);
        if entered {
            debug!(request_id = id, phase = ?phase, "Phase change");
        }
        entered
    }

    fn arm_timer(&self, id: RequestId, budget: Duration) {
        let mut inner = self.inner.lock();
        let Some(record) = inner.active.as_mut().filter(|r| r.id == id) else {
            return;
        };
        let signal = record.signal.clone();
        record.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            warn!(request_id = id, budget_secs = budget.as_secs(), "Rewrite timed out");
            signal.fire(CancelReason::Timeout { seconds: budget.as_secs() });
        }));
    }

    fn disarm_timer(&self, id: RequestId) {
        let mut inner = self.inner.lock();
        if let Some(record) = inner.active.as_mut().filter(|r| r.id == id) {
            record.disarm();
        }
    }

    /// Finish `id` and return to idle, applying `update` to the display.
    /// Returns false (and changes nothing) if `id` is no longer current.
    fn finish(&self, id: RequestId, update: impl FnOnce(&mut DisplayState)) -> bool {
        let mut inner = self.inner.lock();
        if inner.active.as_ref().map(|r| r.id) != Some(id) {
            return false;
        }
        if let Some(mut record) = inner.active.take() {
            record.disarm();
            let elapsed_ms = (Utc::now() - record.started_at).num_milliseconds();
            debug!(request_id = id, elapsed_ms = elapsed_ms, "Request closed");
        }
        update(&mut inner.display);
        inner.display.processing = false;
        inner.display.phase = Phase::Idle;
        true
    }

    fn fail(&self, id: RequestId, signal: &CancelSignal, error: ControllerError) -> RewriteOutcome {
        warn!(request_id = id, error = %error, "Rewrite failed");
        let message = error.to_string();
        if self.finish(id, |display| display.status = message) {
            RewriteOutcome::Failed(error)
        } else {
            self.discarded(id, signal)
        }
    }

    /// Outcome for an operation whose token fired or that lost currency
    fn discarded(&self, id: RequestId, signal: &CancelSignal) -> RewriteOutcome {
        match signal.reason() {
            Some(CancelReason::Timeout { seconds }) => {
                let message = ControllerError::Timeout { seconds }.to_string();
                self.finish(id, |display| display.status = message);
                RewriteOutcome::TimedOut { seconds }
            }
            Some(CancelReason::User) | Some(CancelReason::Teardown) => RewriteOutcome::Canceled,
            Some(CancelReason::Superseded) | None => RewriteOutcome::Superseded,
        }
    }

    async fn run(&self, id: RequestId, signal: &CancelSignal, input: RewriteInput) -> RewriteOutcome {
        // Preparing: the selection decides what gets rewritten
        let selection = match guarded(signal, self.host.selection_text()).await {
            None => return self.discarded(id, signal),
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                warn!(request_id = id, error = %e, "Could not read selection, using manual text");
                String::new()
            }
        };
        let has_selection = !selection.trim().is_empty();
        let text = if has_selection { selection.clone() } else { input.manual_text.clone() };
        if text.trim().is_empty() && input.instruction.trim().is_empty() {
            return self.fail(id, signal, ControllerError::EmptyInput);
        }

        if !self.enter(id, Phase::AwaitingContext) {
            return self.discarded(id, signal);
        }
        let context = if input.context_mode.needs_document() {
            let selection_text = if has_selection { selection } else { String::new() };
            match guarded(signal, self.snapshot(selection_text)).await {
                None => return self.discarded(id, signal),
                Some(Ok(snapshot)) => build_context(
                    &snapshot,
                    input.context_mode,
                    input.context_size,
                    &self.config.window_limits(),
                ),
                Some(Err(e)) => {
                    warn!(request_id = id, error = %e, "Document context unavailable");
                    ContextResult {
                        context_text: String::new(),
                        note: format!("Document context unavailable ({}).", e),
                    }
                }
            }
        } else {
            ContextResult::default()
        };

        let request = RewriteRequest::new(text, input.instruction, &input.provider)
            .with_model(input.model.as_deref())
            .with_web_search(input.use_web_search)
            .with_context(input.context_mode, &context);

        if !self.enter(id, Phase::InFlight) {
            return self.discarded(id, signal);
        }
        self.arm_timer(id, self.config.timeout(input.use_web_search));

        let response = match guarded(signal, self.transport.rewrite(&request)).await {
            None => return self.discarded(id, signal),
            Some(Err(e)) => return self.fail(id, signal, e.into()),
            Some(Ok(response)) => response,
        };
        self.disarm_timer(id);

        let rewritten = response.rewritten_text.clone();
        if !self.with_current(id, |display| display.result = Some(rewritten)) {
            return self.discarded(id, signal);
        }

        let mut result = RewriteResult {
            request_id: id,
            rewritten_text: response.rewritten_text,
            model_note: response.model_note,
            context_note: request.context_note.clone(),
            replaced: false,
            replace_error: None,
        };

        if self.config.replace_selection {
            match guarded(signal, self.host.replace_selection(&result.rewritten_text)).await {
                None => return self.discarded(id, signal),
                Some(Ok(())) => result.replaced = true,
                Some(Err(e)) => {
                    warn!(request_id = id, error = %e, "Write-back failed");
                    result.replace_error = Some(e.to_string());
                }
            }
        }

        let status = match (&result.replace_error, result.replaced) {
            (Some(e), _) => format!("Error replacing text: {}", e),
            (None, true) => STATUS_REPLACED.to_string(),
            (None, false) => STATUS_COMPLETE.to_string(),
        };
        if self.finish(id, |display| display.status = status) {
            RewriteOutcome::Completed(result)
        } else {
            self.discarded(id, signal)
        }
    }

    /// Read the document text and paragraph hints for context building
    async fn snapshot(&self, selection_text: String) -> Result<DocumentSnapshot, HostError> {
        let document_text = self.host.document_text().await?;
        let paragraph_hints = self.host.paragraph_hints().await?;
        Ok(DocumentSnapshot {
            selection_text,
            document_text,
            paragraph_hints,
        })
    }
}

impl Drop for RewriteController {
    fn drop(&mut self) {
        self.teardown();
    }
}
