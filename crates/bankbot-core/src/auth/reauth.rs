//! "Your session expired" confirmation.
//!
//! When the server rejects the credential, the gateway asks the user whether
//! to sign in again. Confirming clears the credential and asks the
//! application to restart from its entry route; cancelling leaves everything
//! as it is. Only one prompt is ever open at a time: triggers that arrive
//! while a prompt is showing are dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Session;
use crate::i18n::{self, MessageKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthDecision {
    /// Sign in again: clear the credential and restart
    Confirmed,
    /// Stay on the current view
    Cancelled,
}

/// Signals from the session layer to the application shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The credential was cleared; start over from the entry route.
    RestartRequested,
}

/// Text shown in the confirmation, already localized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText {
    pub title: String,
    pub body: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl PromptText {
    pub fn for_locale(locale: &str) -> Self {
        Self {
            title: i18n::text(locale, MessageKey::ExpiredTitle).to_string(),
            body: i18n::text(locale, MessageKey::ExpiredBody).to_string(),
            confirm_label: i18n::text(locale, MessageKey::ReloginLabel).to_string(),
            cancel_label: i18n::text(locale, MessageKey::CancelLabel).to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// No way to ask the user (e.g. no terminal attached).
    #[error("prompt unavailable: {0}")]
    Unavailable(String),

    #[error("UI error: {0}")]
    UiError(String),
}

/// Blocking two-outcome confirmation shown to the user.
pub trait ReauthPrompt: Send + Sync {
    fn confirm(
        &self,
        text: PromptText,
    ) -> Pin<Box<dyn Future<Output = Result<ReauthDecision, PromptError>> + Send + '_>>;
}

struct FlowInner {
    prompt: Arc<dyn ReauthPrompt>,
    session: Session,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    open: AtomicBool,
    pending: Mutex<Option<JoinHandle<ReauthDecision>>>,
}

/// Clears the open flag when dropped.
struct OpenLatch(Arc<FlowInner>);

impl Drop for OpenLatch {
    fn drop(&mut self) {
        self.0.open.store(false, Ordering::SeqCst);
    }
}

/// Deduplicating driver for the re-authentication prompt.
#[derive(Clone)]
pub struct ReauthFlow {
    inner: Arc<FlowInner>,
}

impl ReauthFlow {
    pub fn new(
        prompt: Arc<dyn ReauthPrompt>,
        session: Session,
        events: Option<mpsc::UnboundedSender<SessionEvent>>,
    ) -> Self {
        Self {
            inner: Arc::new(FlowInner {
                prompt,
                session,
                events,
                open: AtomicBool::new(false),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Whether a prompt is currently showing.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Show the prompt unless one is already open.
    ///
    /// Returns immediately; the prompt runs on its own task. Returns `false`
    /// when the trigger was absorbed by an already open prompt, or when no
    /// tokio runtime is available to run the prompt on.
    pub fn trigger(&self) -> bool {
        if self
            .inner
            .open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Re-authentication prompt already open");
            return false;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "No runtime to show the re-authentication prompt on");
                self.inner.open.store(false, Ordering::SeqCst);
                return false;
            }
        };

        let inner = Arc::clone(&self.inner);
        let handle = runtime.spawn(async move {
            // Released however the task ends, panics included
            let _latch = OpenLatch(Arc::clone(&inner));

            let text = PromptText::for_locale(&inner.session.locale());
            let decision = match inner.prompt.confirm(text).await {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(error = %e, "Re-authentication prompt failed, staying on page");
                    ReauthDecision::Cancelled
                }
            };

            if decision == ReauthDecision::Confirmed {
                inner.session.clear_credential();
                info!("Credential cleared, restarting");
                if let Some(ref events) = inner.events {
                    // Receiver gone means the app is shutting down
                    let _ = events.send(SessionEvent::RestartRequested);
                }
            }

            decision
        });

        if let Ok(mut pending) = self.inner.pending.lock() {
            *pending = Some(handle);
        }
        true
    }

    /// Wait for the most recently triggered prompt to close.
    ///
    /// Returns its decision, or `None` if no prompt was pending.
    pub async fn wait_idle(&self) -> Option<ReauthDecision> {
        let handle = self.inner.pending.lock().ok()?.take()?;
        match handle.await {
            Ok(decision) => Some(decision),
            Err(e) => {
                warn!(error = %e, "Re-authentication task failed");
                None
            }
        }
    }
}

/// A prompt with a fixed answer, for tests.
pub struct MockReauthPrompt {
    decision: Result<ReauthDecision, String>,
    delay: Option<Duration>,
    call_count: Arc<AtomicUsize>,
}

impl MockReauthPrompt {
    pub fn confirming() -> Self {
        Self::answering(ReauthDecision::Confirmed)
    }

    pub fn cancelling() -> Self {
        Self::answering(ReauthDecision::Cancelled)
    }

    pub fn answering(decision: ReauthDecision) -> Self {
        Self {
            decision: Ok(decision),
            delay: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A prompt that fails to show.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            decision: Err(reason.into()),
            delay: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Keep the prompt open this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl ReauthPrompt for MockReauthPrompt {
    fn confirm(
        &self,
        _text: PromptText,
    ) -> Pin<Box<dyn Future<Output = Result<ReauthDecision, PromptError>> + Send + '_>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let decision = self.decision.clone();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            decision.map_err(PromptError::Unavailable)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_confirm_clears_credential_and_requests_restart() {
        let session = Session::default();
        session.set_credential("stale");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let prompt = Arc::new(MockReauthPrompt::confirming());
        let flow = ReauthFlow::new(prompt.clone(), session.clone(), Some(tx));

        assert!(flow.trigger());
        assert_eq!(flow.wait_idle().await, Some(ReauthDecision::Confirmed));

        assert_eq!(session.credential(), "");
        assert_eq!(rx.try_recv().ok(), Some(SessionEvent::RestartRequested));
        assert!(!flow.is_open());
        assert_eq!(prompt.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_leaves_credential() {
        let session = Session::default();
        session.set_credential("stale");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let flow = ReauthFlow::new(Arc::new(MockReauthPrompt::cancelling()), session.clone(), Some(tx));

        flow.trigger();
        assert_eq!(flow.wait_idle().await, Some(ReauthDecision::Cancelled));
        assert_eq!(session.credential(), "stale");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_trigger_is_idempotent_while_open() {
        let prompt = Arc::new(MockReauthPrompt::cancelling().with_delay(Duration::from_millis(50)));
        let flow = ReauthFlow::new(prompt.clone(), Session::default(), None);

        assert!(flow.trigger());
        assert!(!flow.trigger());
        assert!(!flow.trigger());
        assert!(flow.is_open());

        flow.wait_idle().await;
        assert_eq!(prompt.call_count(), 1);

        // Closed prompt can be shown again
        assert!(flow.trigger());
        flow.wait_idle().await;
        assert_eq!(prompt.call_count(), 2);
    }

    #[tokio::test]
    async fn test_prompt_failure_counts_as_cancel() {
        let session = Session::default();
        session.set_credential("kept");
        let flow = ReauthFlow::new(Arc::new(MockReauthPrompt::failing("no tty")), session.clone(), None);

        flow.trigger();
        assert_eq!(flow.wait_idle().await, Some(ReauthDecision::Cancelled));
        assert_eq!(session.credential(), "kept");
        assert!(!flow.is_open());
    }

    /// Panics the first time it is asked, cancels afterwards.
    struct PanicOncePrompt {
        calls: AtomicUsize,
    }

    impl ReauthPrompt for PanicOncePrompt {
        fn confirm(
            &self,
            _text: PromptText,
        ) -> Pin<Box<dyn Future<Output = Result<ReauthDecision, PromptError>> + Send + '_>> {
            let first = self.calls.fetch_add(1, Ordering::SeqCst) == 0;
            Box::pin(async move {
                if first {
                    panic!("prompt window crashed");
                }
                Ok(ReauthDecision::Cancelled)
            })
        }
    }

    #[tokio::test]
    async fn test_panicking_prompt_releases_latch() {
        let prompt = Arc::new(PanicOncePrompt {
            calls: AtomicUsize::new(0),
        });
        let flow = ReauthFlow::new(prompt.clone(), Session::default(), None);

        assert!(flow.trigger());
        assert_eq!(flow.wait_idle().await, None);
        assert!(!flow.is_open());

        assert!(flow.trigger());
        assert_eq!(flow.wait_idle().await, Some(ReauthDecision::Cancelled));
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_trigger_without_runtime_is_refused() {
        let prompt = Arc::new(MockReauthPrompt::confirming());
        let session = Session::default();
        session.set_credential("kept");
        let flow = ReauthFlow::new(prompt.clone(), session.clone(), None);

        assert!(!flow.trigger());
        assert!(!flow.is_open());
        assert_eq!(prompt.call_count(), 0);
        assert_eq!(session.credential(), "kept");
    }

    #[tokio::test]
    async fn test_wait_idle_without_prompt() {
        let flow = ReauthFlow::new(Arc::new(MockReauthPrompt::confirming()), Session::default(), None);
        assert_eq!(flow.wait_idle().await, None);
    }

    #[test]
    fn test_prompt_text_is_localized() {
        let zh = PromptText::for_locale("zh");
        assert_eq!(zh.confirm_label, "重新登陆");
        let en = PromptText::for_locale("en-US");
        assert_eq!(en.cancel_label, "Cancel");
    }
}
