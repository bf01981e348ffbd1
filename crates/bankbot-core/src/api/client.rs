//! The session-aware gateway every API call goes through.

use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::envelope::{Envelope, Outcome};
use super::transport::{OutboundCall, RawResponse, Transport};
use super::GatewayError;
use crate::auth::{ReauthFlow, Session};
use crate::models::{
    ChatLine, MessageRequest, SchemaDetail, SchemaOption, SchemaRequest, SignRequest,
};
use crate::notify::{Notification, Notifier};

// ============================================================================
// Endpoints
// ============================================================================

const SIGN_PATH: &str = "/api/auth/sign";
const PORTAL_OPTION_PATH: &str = "/api/bot/portal/option";
const PORTAL_DETAIL_PATH: &str = "/api/bot/portal/detail";
const CHAT_INIT_PATH: &str = "/api/bot/chat/init";
const CHAT_MESSAGE_PATH: &str = "/api/bot/chat/message";

struct ClientInner {
    transport: Arc<dyn Transport>,
    session: Session,
    notifier: Arc<dyn Notifier>,
    reauth: ReauthFlow,
}

/// API client for the portal.
/// Clone is cheap; clones share the transport, session and prompt latch.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Session,
        notifier: Arc<dyn Notifier>,
        reauth: ReauthFlow,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                session,
                notifier,
                reauth,
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn reauth(&self) -> &ReauthFlow {
        &self.inner.reauth
    }

    /// Pre-send hook: attach the current credential, if any.
    ///
    /// The credential is read here, right before sending, never earlier.
    pub fn prepare(&self, mut call: OutboundCall) -> Result<OutboundCall, GatewayError> {
        let credential = self.inner.session.credential();
        if !credential.is_empty() {
            let value = HeaderValue::from_str(&credential)
                .map_err(|e| GatewayError::Build(format!("invalid credential header: {}", e)))?;
            call.headers.insert(AUTHORIZATION, value);
        }
        Ok(call)
    }

    /// Post-receive hook: classify the response and react to it.
    ///
    /// Session-invalid responses open the re-authentication prompt on the
    /// current tokio runtime; without one, the call still fails and is
    /// notified but no prompt is shown.
    pub fn receive<T: DeserializeOwned>(
        &self,
        response: Result<RawResponse, GatewayError>,
    ) -> Result<T, GatewayError> {
        let response = response.map_err(|e| self.surface(e))?;

        let envelope = match Envelope::parse(&response.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = if response.status.is_success() {
                    GatewayError::InvalidResponse(e.to_string())
                } else {
                    GatewayError::from_status(response.status, &response.body_text())
                };
                return Err(self.surface(err));
            }
        };

        match envelope.outcome() {
            Outcome::Success => {
                self.commit_credential(&response);
                self.decode(envelope.data)
            }
            Outcome::Accepted => self.decode(envelope.data),
            Outcome::BusinessError => Err(self.surface(GatewayError::Business {
                code: envelope.code,
                message: envelope.display_message().to_string(),
            })),
            Outcome::SessionInvalid => {
                let err = self.surface(GatewayError::SessionExpired {
                    code: envelope.code,
                    message: envelope.display_message().to_string(),
                });
                self.inner.reauth.trigger();
                Err(err)
            }
        }
    }

    /// Send a call through both hooks.
    ///
    /// A failed pre-send hook aborts the call without a notification.
    /// Nothing is retried.
    pub async fn call<T: DeserializeOwned>(&self, call: OutboundCall) -> Result<T, GatewayError> {
        let call = self.prepare(call)?;
        let response = self.inner.transport.send(call).await;
        self.receive(response)
    }

    fn commit_credential(&self, response: &RawResponse) {
        // HeaderMap lookups ignore case
        let token = response
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => {
                self.inner.session.set_credential(token);
                debug!("Credential refreshed from response");
            }
            None => debug!("Success response carried no credential"),
        }
    }

    fn decode<T: DeserializeOwned>(&self, data: Value) -> Result<T, GatewayError> {
        serde_json::from_value(data)
            .map_err(|e| self.surface(GatewayError::InvalidResponse(e.to_string())))
    }

    /// Show the error to the user once and hand it back for the caller.
    fn surface(&self, err: GatewayError) -> GatewayError {
        warn!(error = %err, code = ?err.code(), "API call failed");
        self.inner.notifier.notify(Notification::error(err.message()));
        err
    }

    // ===== Typed Calls =====

    /// Sign in. On success the server's credential is committed like on
    /// any other code-0 response.
    ///
    /// Returns whether a credential is held afterwards; a rejected password
    /// comes back as code 1 and leaves the session signed out.
    pub async fn sign_in(&self, username: &str, pwd: &str) -> Result<bool, GatewayError> {
        let call = OutboundCall::post(SIGN_PATH, &SignRequest { username, pwd })?;
        let _: Value = self.call(call).await?;
        Ok(self.inner.session.is_authenticated())
    }

    /// List the schemas offered on the portal
    pub async fn fetch_options(&self) -> Result<Vec<SchemaOption>, GatewayError> {
        self.call(OutboundCall::get(PORTAL_OPTION_PATH)).await
    }

    /// Fetch display settings for one schema
    pub async fn fetch_detail(&self, schema: &str) -> Result<SchemaDetail, GatewayError> {
        let call = OutboundCall::post(PORTAL_DETAIL_PATH, &SchemaRequest { schema })?;
        self.call(call).await
    }

    /// Start (or restart) a chat against a schema; returns the greeting lines
    pub async fn chat_init(&self, schema: &str) -> Result<Vec<ChatLine>, GatewayError> {
        let call = OutboundCall::post(CHAT_INIT_PATH, &SchemaRequest { schema })?;
        self.call(call).await
    }

    /// Send one user message; returns the bot's replies
    pub async fn chat_message(&self, content: &str) -> Result<Vec<ChatLine>, GatewayError> {
        let call = OutboundCall::post(CHAT_MESSAGE_PATH, &MessageRequest { content })?;
        self.call(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{MockReply, MockTransport};
    use crate::auth::MockReauthPrompt;
    use crate::notify::RecordingNotifier;
    use reqwest::StatusCode;
    use serde_json::json;

    struct Harness {
        api: ApiClient,
        transport: Arc<MockTransport>,
        notifier: Arc<RecordingNotifier>,
        prompt: Arc<MockReauthPrompt>,
    }

    fn harness(prompt: MockReauthPrompt) -> Harness {
        let transport = Arc::new(MockTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let prompt = Arc::new(prompt);
        let session = Session::default();
        let reauth = ReauthFlow::new(prompt.clone(), session.clone(), None);
        let api = ApiClient::new(transport.clone(), session, notifier.clone(), reauth);
        Harness {
            api,
            transport,
            notifier,
            prompt,
        }
    }

    #[test]
    fn test_prepare_without_credential_adds_no_header() {
        let h = harness(MockReauthPrompt::cancelling());
        let call = h.api.prepare(OutboundCall::get("/x")).unwrap();
        assert!(call.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_prepare_attaches_raw_credential() {
        let h = harness(MockReauthPrompt::cancelling());
        h.api.session().set_credential("eyJ.abc.def");
        let call = h.api.prepare(OutboundCall::get("/x")).unwrap();
        assert_eq!(call.authorization(), Some("eyJ.abc.def"));
        assert_eq!(call.path, "/x");
    }

    #[test]
    fn test_prepare_rejects_unrepresentable_credential() {
        let h = harness(MockReauthPrompt::cancelling());
        h.api.session().set_credential("bad\ntoken");
        let err = h.api.prepare(OutboundCall::get("/x")).unwrap_err();
        assert!(matches!(err, GatewayError::Build(_)));
        assert_eq!(h.notifier.count(), 0);
    }

    #[test]
    fn test_receive_non_envelope_error_status_is_transport() {
        let h = harness(MockReauthPrompt::cancelling());
        let raw = RawResponse::new(StatusCode::BAD_GATEWAY, "upstream down");
        let err = h.api.receive::<Value>(Ok(raw)).unwrap_err();
        assert!(err.is_transport());
        assert!(err.message().contains("upstream down"));
        assert_eq!(h.notifier.count(), 1);
    }

    #[test]
    fn test_receive_envelope_on_error_status_is_classified() {
        let h = harness(MockReauthPrompt::cancelling());
        let raw = RawResponse::new(StatusCode::BAD_REQUEST, r#"{"code":2,"msg":"bad schema"}"#);
        let err = h.api.receive::<Value>(Ok(raw)).unwrap_err();
        assert_eq!(
            err,
            GatewayError::Business {
                code: 2,
                message: "bad schema".into()
            }
        );
    }

    #[test]
    fn test_receive_garbage_success_body() {
        let h = harness(MockReauthPrompt::cancelling());
        let raw = RawResponse::new(StatusCode::OK, "<html></html>");
        let err = h.api.receive::<Value>(Ok(raw)).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
        assert_eq!(h.notifier.count(), 1);
    }

    #[test]
    fn test_session_invalid_outside_runtime_fails_without_prompt() {
        let h = harness(MockReauthPrompt::confirming());
        h.api.session().set_credential("stale");
        let raw = RawResponse::new(StatusCode::OK, r#"{"code":50014,"msg":"token expired"}"#);

        let err = h.api.receive::<Value>(Ok(raw)).unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.prompt.call_count(), 0);
        assert!(!h.api.reauth().is_open());
        assert_eq!(h.api.session().credential(), "stale");
    }

    #[test]
    fn test_success_without_header_keeps_credential() {
        let h = harness(MockReauthPrompt::cancelling());
        h.api.session().set_credential("old");
        let raw = RawResponse::new(StatusCode::OK, r#"{"code":0,"msg":"success","data":null}"#);
        let _: Value = h.api.receive(Ok(raw)).unwrap();
        assert_eq!(h.api.session().credential(), "old");
    }

    #[test]
    fn test_payload_shape_mismatch_is_invalid_response() {
        let h = harness(MockReauthPrompt::cancelling());
        let raw = RawResponse::new(StatusCode::OK, r#"{"code":0,"data":"not a list"}"#)
            .with_header("authorization", "fresh");
        let err = h.api.receive::<Vec<SchemaOption>>(Ok(raw)).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
        // The server accepted the call, so its credential still counts
        assert_eq!(h.api.session().credential(), "fresh");
    }

    #[tokio::test]
    async fn test_business_error_notifies_without_prompt() {
        let h = harness(MockReauthPrompt::confirming());
        h.api.session().set_credential("tok");
        h.transport.on(
            CHAT_MESSAGE_PATH,
            MockReply::envelope(2, "session timed out", Value::Null),
        );

        let err = h.api.chat_message("hello").await.unwrap_err();
        assert_eq!(err.message(), "session timed out");
        assert!(!err.is_session_expired());
        assert_eq!(h.notifier.notifications()[0].message, "session timed out");
        assert_eq!(h.api.reauth().wait_idle().await, None);
        assert_eq!(h.prompt.call_count(), 0);
        assert_eq!(h.api.session().credential(), "tok");
    }

    #[tokio::test]
    async fn test_typed_calls_hit_their_endpoints() {
        let h = harness(MockReauthPrompt::cancelling());
        h.transport
            .on(
                PORTAL_OPTION_PATH,
                MockReply::envelope(0, "success", json!([{"schema": "loan", "title": "Loans"}])),
            )
            .on(
                PORTAL_DETAIL_PATH,
                MockReply::envelope(0, "success", json!({"name": "loan", "title": "Loans"})),
            )
            .on(
                CHAT_INIT_PATH,
                MockReply::envelope(0, "success", json!([{"content": "Welcome", "time": 1}])),
            );

        let options = h.api.fetch_options().await.unwrap();
        assert_eq!(options[0].schema, "loan");
        let detail = h.api.fetch_detail("loan").await.unwrap();
        assert_eq!(detail.title, "Loans");
        let lines = h.api.chat_init("loan").await.unwrap();
        assert_eq!(lines[0].content, "Welcome");

        let sent = h.transport.sent();
        assert_eq!(sent[0].method, reqwest::Method::GET);
        assert_eq!(sent[1].body, Some(json!({"schema": "loan"})));
        assert_eq!(sent[2].path, CHAT_INIT_PATH);
    }

    #[tokio::test]
    async fn test_sign_in_commits_credential() {
        let h = harness(MockReauthPrompt::cancelling());
        h.transport.on(
            SIGN_PATH,
            MockReply::envelope(0, "success", Value::Null).with_authorization("signed.jwt"),
        );

        let signed_in = h.api.sign_in("alice", "0123456789abcdef0123456789abcdef").await.unwrap();
        assert!(signed_in);
        assert_eq!(h.api.session().credential(), "signed.jwt");
        assert_eq!(
            h.transport.sent()[0].body,
            Some(json!({"username": "alice", "pwd": "0123456789abcdef0123456789abcdef"}))
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_secondary_success_code() {
        // The sign endpoint answers code 1 for a wrong password
        let h = harness(MockReauthPrompt::cancelling());
        h.transport.on(SIGN_PATH, MockReply::envelope(1, "wrong password.", Value::Null));

        let signed_in = h.api.sign_in("alice", "x").await.unwrap();
        assert!(!signed_in);
        assert_eq!(h.notifier.count(), 0);
    }
}
