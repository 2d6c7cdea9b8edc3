//! Token Service
//!
//! Client for the remote authority that lists, mints, revokes and deletes
//! tokens.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::error::{create_error_from_response, ApiKeysError, ProtocolError};
use crate::types::{ApiKeysConfig, IssuerCredentials, TokenId, TokenListResponse, TokenRecord};

/// Remote token service interface.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// List tokens in service order.
    async fn list(&self) -> Result<Vec<TokenRecord>, ApiKeysError>;

    /// Mint a new token.
    ///
    /// The created representation is returned when the service sends one
    /// that parses; callers must not rely on it for list state.
    async fn create(
        &self,
        credentials: &IssuerCredentials,
    ) -> Result<Option<TokenRecord>, ApiKeysError>;

    /// Revoke an active token.
    async fn revoke(&self, id: TokenId) -> Result<(), ApiKeysError>;

    /// Delete an expired token.
    async fn delete(&self, id: TokenId) -> Result<(), ApiKeysError>;
}

/// HTTP implementation of the token service.
pub struct HttpTokenService<T: HttpTransport> {
    config: ApiKeysConfig,
    transport: Arc<T>,
}

impl<T: HttpTransport> HttpTokenService<T> {
    /// Create new token service client.
    pub fn new(config: ApiKeysConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiKeysError> {
        let request = request
            .with_headers(&self.config.default_headers)
            .with_timeout(self.config.timeout);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(create_error_from_response(
                response.status,
                &response.status_text,
                &response.body,
            ));
        }

        Ok(response)
    }
}

#[async_trait]
impl<T: HttpTransport> TokenService for HttpTokenService<T> {
    async fn list(&self) -> Result<Vec<TokenRecord>, ApiKeysError> {
        let response = self
            .execute(HttpRequest::new(HttpMethod::Get, self.config.collection_url()?))
            .await?;

        let list: TokenListResponse = serde_json::from_str(&response.body).map_err(|e| {
            ApiKeysError::Protocol(ProtocolError::InvalidJson {
                message: e.to_string(),
            })
        })?;

        Ok(list.into_records())
    }

    async fn create(
        &self,
        credentials: &IssuerCredentials,
    ) -> Result<Option<TokenRecord>, ApiKeysError> {
        let request = HttpRequest::new(HttpMethod::Post, self.config.collection_url()?)
            .with_json(&credentials.to_payload());
        let response = self.execute(request).await?;

        Ok(serde_json::from_str::<TokenRecord>(&response.body).ok())
    }

    async fn revoke(&self, id: TokenId) -> Result<(), ApiKeysError> {
        self.execute(HttpRequest::new(HttpMethod::Post, self.config.revoke_url(id)?))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: TokenId) -> Result<(), ApiKeysError> {
        self.execute(HttpRequest::new(HttpMethod::Delete, self.config.token_url(id)?))
            .await?;
        Ok(())
    }
}

/// Call recorded by [`MockTokenService`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenServiceCall {
    List,
    Create { identity: String },
    Revoke(TokenId),
    Delete(TokenId),
}

/// Mock token service for testing.
///
/// Each operation has its own queue of results. An empty list queue serves
/// the current `set_tokens` contents; empty mutation queues succeed.
#[derive(Default)]
pub struct MockTokenService {
    tokens: Mutex<Vec<TokenRecord>>,
    list_results: Mutex<VecDeque<Result<Vec<TokenRecord>, ApiKeysError>>>,
    create_results: Mutex<VecDeque<Result<Option<TokenRecord>, ApiKeysError>>>,
    revoke_results: Mutex<VecDeque<Result<(), ApiKeysError>>>,
    delete_results: Mutex<VecDeque<Result<(), ApiKeysError>>>,
    history: Mutex<Vec<TokenServiceCall>>,
}

impl MockTokenService {
    /// Create new mock token service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what `list` returns once its queue is drained.
    pub fn set_tokens(&self, tokens: Vec<TokenRecord>) -> &Self {
        *lock(&self.tokens) = tokens;
        self
    }

    /// Queue a list result.
    pub fn queue_list(&self, result: Result<Vec<TokenRecord>, ApiKeysError>) -> &Self {
        lock(&self.list_results).push_back(result);
        self
    }

    /// Queue a create result.
    pub fn queue_create(&self, result: Result<Option<TokenRecord>, ApiKeysError>) -> &Self {
        lock(&self.create_results).push_back(result);
        self
    }

    /// Queue a revoke result.
    pub fn queue_revoke(&self, result: Result<(), ApiKeysError>) -> &Self {
        lock(&self.revoke_results).push_back(result);
        self
    }

    /// Queue a delete result.
    pub fn queue_delete(&self, result: Result<(), ApiKeysError>) -> &Self {
        lock(&self.delete_results).push_back(result);
        self
    }

    /// All calls in order.
    pub fn get_history(&self) -> Vec<TokenServiceCall> {
        lock(&self.history).clone()
    }

    /// Number of `list` calls made.
    pub fn list_calls(&self) -> usize {
        lock(&self.history)
            .iter()
            .filter(|c| matches!(c, TokenServiceCall::List))
            .count()
    }

    fn record(&self, call: TokenServiceCall) {
        lock(&self.history).push(call);
    }
}

#[async_trait]
impl TokenService for MockTokenService {
    async fn list(&self) -> Result<Vec<TokenRecord>, ApiKeysError> {
        self.record(TokenServiceCall::List);
        let queued = lock(&self.list_results).pop_front();
        match queued {
            Some(result) => result,
            None => Ok(lock(&self.tokens).clone()),
        }
    }

    async fn create(
        &self,
        credentials: &IssuerCredentials,
    ) -> Result<Option<TokenRecord>, ApiKeysError> {
        self.record(TokenServiceCall::Create {
            identity: credentials.identity.clone(),
        });
        lock(&self.create_results).pop_front().unwrap_or(Ok(None))
    }

    async fn revoke(&self, id: TokenId) -> Result<(), ApiKeysError> {
        self.record(TokenServiceCall::Revoke(id));
        lock(&self.revoke_results).pop_front().unwrap_or(Ok(()))
    }

    async fn delete(&self, id: TokenId) -> Result<(), ApiKeysError> {
        self.record(TokenServiceCall::Delete(id));
        lock(&self.delete_results).pop_front().unwrap_or(Ok(()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Create mock token service for testing.
pub fn create_mock_token_service() -> MockTokenService {
    MockTokenService::new()
}
