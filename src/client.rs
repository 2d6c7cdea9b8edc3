//! API Keys Client
//!
//! High-level client that wires the token service, store, lifecycle
//! controller and visibility overlay together behind one surface.

use std::sync::Arc;

use crate::core::{
    create_transport, Clipboard, Clock, InMemoryClipboard, Notifier, ReqwestHttpTransport,
    SystemClock, TracingNotifier,
};
use crate::error::ApiKeysError;
use crate::telemetry::{ApiKeysLogContext, Logger, TracingLogger};
use crate::token::{
    record_status, HttpTokenService, LifecycleController, OperationOutcome, SecretDisplay,
    TokenService, TokenStore, VisibilityToggle,
};
use crate::types::{ApiKeysConfig, IssuerCredentials, TokenActions, TokenId, TokenView};

pub const COPIED_MESSAGE: &str = "Copied the API Key.";

/// API key client for listing, minting, revoking and deleting tokens.
pub struct ApiKeysClient<S: TokenService = HttpTokenService<ReqwestHttpTransport>> {
    config: ApiKeysConfig,
    controller: LifecycleController<S>,
    visibility: VisibilityToggle,
    notifier: Arc<dyn Notifier>,
    clipboard: Arc<dyn Clipboard>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
}

impl ApiKeysClient<HttpTokenService<ReqwestHttpTransport>> {
    /// Create a new client with default implementations.
    pub fn new(config: ApiKeysConfig) -> Result<Self, ApiKeysError> {
        let transport = Arc::new(create_transport(Some(config.timeout))?);
        let service = Arc::new(HttpTokenService::new(config.clone(), transport));

        Ok(Self::with_components(
            config,
            service,
            Arc::new(TracingNotifier),
            Arc::new(InMemoryClipboard::new()),
            Arc::new(SystemClock),
        ))
    }
}

impl<S: TokenService> ApiKeysClient<S> {
    /// Create a client with custom implementations.
    pub fn with_components(
        config: ApiKeysConfig,
        service: Arc<S>,
        notifier: Arc<dyn Notifier>,
        clipboard: Arc<dyn Clipboard>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(TokenStore::new());
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
        let controller =
            LifecycleController::new(service, store.clone(), notifier.clone(), clock.clone())
                .with_action_gate(config.action_gate)
                .with_logger(logger.clone());
        let visibility =
            VisibilityToggle::new(store, SecretDisplay::new(config.reveal_prefix_len));

        Self {
            config,
            controller,
            visibility,
            notifier,
            clipboard,
            clock,
            logger,
        }
    }

    /// Replace the logger used by the client and its controller.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.controller = self.controller.with_logger(logger.clone());
        self.logger = logger;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ApiKeysConfig {
        &self.config
    }

    pub fn controller(&self) -> &LifecycleController<S> {
        &self.controller
    }

    pub fn visibility(&self) -> &VisibilityToggle {
        &self.visibility
    }

    // ========== Lifecycle ==========

    /// Refresh the token list from the service.
    pub async fn fetch_all(&self) -> OperationOutcome {
        self.controller.fetch_all().await
    }

    /// Mint a new token.
    pub async fn create_token(&self, credentials: &IssuerCredentials) -> OperationOutcome {
        self.controller.create_token(credentials).await
    }

    /// Revoke an active token.
    pub async fn revoke_token(&self, id: TokenId) -> OperationOutcome {
        self.controller.revoke_token(id).await
    }

    /// Delete an expired token.
    pub async fn delete_token(&self, id: TokenId) -> OperationOutcome {
        self.controller.delete_token(id).await
    }

    // ========== Display ==========

    /// Snapshot of every stored token, in service order.
    pub fn tokens(&self) -> Vec<TokenView> {
        let now = self.clock.now();
        let display = self.visibility.policy();

        self.controller
            .store()
            .entries()
            .into_iter()
            .map(|(record, revealed)| TokenView {
                id: record.id,
                created_at: record.created_at,
                expires_at: record.expires_at,
                status: record_status(&record, now),
                revealed,
                display_secret: display.render(record.secret(), revealed),
            })
            .collect()
    }

    /// Snapshot of one token.
    pub fn token(&self, id: TokenId) -> Option<TokenView> {
        self.tokens().into_iter().find(|view| view.id == id)
    }

    pub fn available_actions(&self, id: TokenId) -> Option<TokenActions> {
        self.controller.available_actions(id)
    }

    /// Flip the reveal state of a token. Returns the new state.
    pub fn toggle_revealed(&self, id: TokenId) -> Option<bool> {
        self.visibility.toggle(id)
    }

    pub fn reveal(&self, id: TokenId) -> Option<bool> {
        self.visibility.reveal(id)
    }

    pub fn mask(&self, id: TokenId) -> Option<bool> {
        self.visibility.mask(id)
    }

    /// Copy the full secret of a token to the clipboard.
    ///
    /// The full value is copied whether or not the token is revealed.
    /// Returns `false` for an unknown id.
    pub fn copy_secret(&self, id: TokenId) -> bool {
        let context = ApiKeysLogContext::new()
            .operation("copy_secret")
            .token_id(id);

        if self.controller.is_disposed() {
            return false;
        }

        let Some(record) = self.controller.store().get(id) else {
            self.logger.debug("Ignoring stale token id", &context);
            return false;
        };

        self.clipboard.copy_to_clipboard(record.secret());
        self.logger.debug("Copied secret", &context);
        self.notifier.notify_success(COPIED_MESSAGE);
        true
    }

    // ========== State ==========

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.controller.last_error()
    }

    /// Tear down the client. In-flight responses are discarded.
    pub fn dispose(&self) {
        self.controller.dispose();
    }
}

/// Create a new API keys client with default implementations.
pub fn apikeys_client(config: ApiKeysConfig) -> Result<ApiKeysClient, ApiKeysError> {
    ApiKeysClient::new(config)
}
