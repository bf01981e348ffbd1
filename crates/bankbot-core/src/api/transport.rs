//! The HTTP boundary under the gateway.
//!
//! `Transport` moves an `OutboundCall` to the server and returns the raw
//! response without interpreting it. `HttpTransport` does this with reqwest;
//! `MockTransport` replays scripted replies for tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::GatewayError;

/// Method, path, query and JSON body of a call, plus the headers the
/// gateway adds before sending.
#[derive(Debug, Clone)]
pub struct OutboundCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl OutboundCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, GatewayError> {
        let body = serde_json::to_value(body).map_err(|e| GatewayError::Build(e.to_string()))?;
        let mut call = Self::new(Method::POST, path);
        call.body = Some(body);
        Ok(call)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Credential attached by the gateway, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }
}

/// Uninterpreted server response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header. Invalid names or values are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub trait Transport: Send + Sync {
    fn send(
        &self,
        call: OutboundCall,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, GatewayError>> + Send + '_>>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Every call fails with `GatewayError::Timeout` after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn map_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout.as_millis() as u64)
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        call: OutboundCall,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, GatewayError>> + Send + '_>> {
        Box::pin(async move {
            let url = self.url_for(&call.path);
            debug!(method = %call.method, url = %url, "Sending request");

            let mut request = self
                .client
                .request(call.method.clone(), &url)
                .headers(call.headers);
            if !call.query.is_empty() {
                request = request.query(&call.query);
            }
            if let Some(ref body) = call.body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| self.map_error(e))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(|e| self.map_error(e))?;
            debug!(status = %status, bytes = body.len(), "Response received");

            Ok(RawResponse {
                status,
                headers,
                body: body.to_vec(),
            })
        })
    }
}

/// One scripted reply for `MockTransport`.
pub struct MockReply {
    result: Result<RawResponse, GatewayError>,
    delay: Option<Duration>,
}

impl MockReply {
    /// HTTP 200 with a `{ code, msg, data }` body.
    pub fn envelope(code: i64, msg: &str, data: Value) -> Self {
        let body = serde_json::json!({ "code": code, "msg": msg, "data": data });
        Self::response(RawResponse::new(StatusCode::OK, body.to_string()))
    }

    pub fn response(response: RawResponse) -> Self {
        Self {
            result: Ok(response),
            delay: None,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::response(RawResponse::new(status, body.to_string()))
    }

    pub fn timeout(millis: u64) -> Self {
        Self {
            result: Err(GatewayError::Timeout(millis)),
            delay: None,
        }
    }

    pub fn network(message: &str) -> Self {
        Self {
            result: Err(GatewayError::Transport(message.to_string())),
            delay: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.result = self.result.map(|r| r.with_header(name, value));
        self
    }

    pub fn with_authorization(self, token: &str) -> Self {
        self.with_header("Authorization", token)
    }

    /// Hold the reply back this long after the call is sent.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Replays scripted replies per path, in order, and records what was sent.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    sent: Mutex<Vec<OutboundCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next call to `path`.
    pub fn on(&self, path: &str, reply: MockReply) -> &Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(path.to_string()).or_default().push_back(reply);
        }
        self
    }

    /// Every call sent so far, with the headers the gateway attached.
    pub fn sent(&self) -> Vec<OutboundCall> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn next_reply(&self, path: &str) -> Option<MockReply> {
        self.replies.lock().ok()?.get_mut(path)?.pop_front()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        call: OutboundCall,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, GatewayError>> + Send + '_>> {
        let reply = self.next_reply(&call.path);
        let path = call.path.clone();
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(call);
        }

        Box::pin(async move {
            let reply = reply
                .ok_or_else(|| GatewayError::Transport(format!("no mock reply for {}", path)))?;
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            reply.result
        })
    }
}
