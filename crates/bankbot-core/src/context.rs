//! Wiring for a running client: one session shared by the gateway, the
//! re-authentication flow, and the navigation guard.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::api::{ApiClient, HttpTransport, Transport};
use crate::auth::{ReauthFlow, ReauthPrompt, Session, SessionEvent};
use crate::config::Config;
use crate::notify::Notifier;
use crate::router::{NavigationGuard, RouteTable};

pub struct ClientContext {
    pub api: ApiClient,
    pub guard: NavigationGuard,
    /// Restart requests from the re-authentication flow
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl ClientContext {
    /// Build from configuration with the HTTP transport and durable store.
    pub fn from_config(
        config: &Config,
        prompt: Arc<dyn ReauthPrompt>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let store = config.token_store().context("Failed to open credential store")?;
        let session = Session::with_store(store, config.locale.clone());
        let transport = HttpTransport::new(config.base_url.clone(), config.timeout())
            .context("Failed to create HTTP client")?;
        info!(base_url = %config.base_url, "Client configured");

        Ok(Self::assemble(
            Arc::new(transport),
            session,
            RouteTable::default(),
            prompt,
            notifier,
        ))
    }

    /// Build from explicit parts.
    pub fn assemble(
        transport: Arc<dyn Transport>,
        session: Session,
        routes: RouteTable,
        prompt: Arc<dyn ReauthPrompt>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let reauth = ReauthFlow::new(prompt, session.clone(), Some(tx));
        let api = ApiClient::new(transport, session.clone(), notifier, reauth);
        let guard = NavigationGuard::new(routes, session);
        Self {
            api,
            guard,
            events: rx,
        }
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }
}
