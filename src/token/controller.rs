//! Lifecycle Controller
//!
//! Orchestrates fetch/create/revoke/delete against the token service and
//! keeps the token store consistent with it.
//!
//! Every mutating operation finishes with a full refetch instead of an
//! optimistic local patch: status, expiry and existence always come from the
//! service. Operations are not serialized. The store is replaced by whichever
//! fetch resolves last, so the view is eventually consistent rather than
//! ordered by request.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::{Clock, Notifier};
use crate::error::{decode_create_error, TokenError};
use crate::telemetry::{ApiKeysLogContext, Logger, TracingLogger};
use crate::token::status::{record_status, StatusDeriver};
use crate::token::{TokenService, TokenStore};
use crate::types::{ActionGate, IssuerCredentials, TokenActions, TokenId, TokenStatus};

pub const CREATED_MESSAGE: &str = "Generated new token";
pub const CREATE_FAILED_PREFIX: &str = "There was an issue creating the token: ";
pub const REVOKED_MESSAGE: &str = "Revoked token";
pub const REVOKE_FAILED_PREFIX: &str = "There was an issue revoking the token: ";
pub const DELETED_MESSAGE: &str = "Deleted token";
pub const DELETE_FAILED_PREFIX: &str = "There was an issue deleting the token: ";

/// Result of a controller operation, after the notifier has been told.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The service accepted the request.
    Succeeded,
    /// The service (or the network) failed; carries the user-facing message.
    Failed(String),
    /// Rejected locally before any request was made.
    Rejected(String),
    /// Nothing to do: stale id, or the controller was disposed.
    Ignored,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[derive(Clone, Copy, Debug)]
enum Mutation {
    Revoke,
    Delete,
}

impl Mutation {
    fn action(self) -> &'static str {
        match self {
            Self::Revoke => "revoke",
            Self::Delete => "delete",
        }
    }

    fn operation(self) -> &'static str {
        match self {
            Self::Revoke => "revoke_token",
            Self::Delete => "delete_token",
        }
    }

    fn required_status(self) -> TokenStatus {
        match self {
            Self::Revoke => TokenStatus::Active,
            Self::Delete => TokenStatus::Expired,
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            Self::Revoke => REVOKED_MESSAGE,
            Self::Delete => DELETED_MESSAGE,
        }
    }

    fn failure_prefix(self) -> &'static str {
        match self {
            Self::Revoke => REVOKE_FAILED_PREFIX,
            Self::Delete => DELETE_FAILED_PREFIX,
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Token lifecycle controller.
pub struct LifecycleController<S: TokenService> {
    service: Arc<S>,
    store: Arc<TokenStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    gate: ActionGate,
    disposed: AtomicBool,
    fetches_in_flight: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl<S: TokenService> LifecycleController<S> {
    /// Create new controller over a shared store.
    pub fn new(
        service: Arc<S>,
        store: Arc<TokenStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            service,
            store,
            notifier,
            clock,
            logger: Arc::new(TracingLogger),
            gate: ActionGate::default(),
            disposed: AtomicBool::new(false),
            fetches_in_flight: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    /// Replace the logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set the revoke/delete gating policy.
    pub fn with_action_gate(mut self, gate: ActionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn action_gate(&self) -> ActionGate {
        self.gate
    }

    /// True while at least one fetch is awaiting the service.
    pub fn is_loading(&self) -> bool {
        self.fetches_in_flight.load(Ordering::SeqCst) > 0
    }

    /// Message of the last failed fetch, cleared by the next successful one.
    pub fn last_error(&self) -> Option<String> {
        self.last_error_slot().clone()
    }

    /// Tear the controller down. Responses resolving afterwards are dropped
    /// and new operations are ignored.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Status of a stored token, derived now.
    pub fn status_of(&self, id: TokenId) -> Option<TokenStatus> {
        let deriver = StatusDeriver::new(self.clock.as_ref());
        self.store.get(id).map(|record| deriver.status_of(&record))
    }

    /// Actions to offer for a stored token under the gating policy.
    pub fn available_actions(&self, id: TokenId) -> Option<TokenActions> {
        let status = self.status_of(id)?;
        Some(match self.gate {
            ActionGate::ClientSide => TokenActions {
                can_revoke: status == TokenStatus::Active,
                can_delete: status == TokenStatus::Expired,
            },
            ActionGate::ServerOnly => TokenActions {
                can_revoke: true,
                can_delete: true,
            },
        })
    }

    /// Fetch the full token list and replace the store with it.
    ///
    /// On failure the store is left untouched and the error is reported.
    pub async fn fetch_all(&self) -> OperationOutcome {
        let context = ApiKeysLogContext::new().operation("fetch_all");
        if self.is_disposed() {
            return OperationOutcome::Ignored;
        }

        let _in_flight = InFlight::enter(&self.fetches_in_flight);
        self.logger.debug("Fetching tokens", &context);

        let result = self.service.list().await;

        if self.is_disposed() {
            self.logger
                .debug("Dropping fetch response after teardown", &context);
            return OperationOutcome::Ignored;
        }

        match result {
            Ok(records) => {
                let dropped = self.store.replace_all(records);
                if dropped > 0 {
                    self.logger.warn(
                        "Dropped tokens with duplicate ids",
                        &context.clone().extra("dropped", dropped),
                    );
                }

                let now = self.clock.now();
                let records = self.store.records();
                let active = records
                    .iter()
                    .filter(|r| record_status(r, now).is_active())
                    .count();

                *self.last_error_slot() = None;
                self.logger.info(
                    "Fetched tokens",
                    &context
                        .extra("count", records.len())
                        .extra("active", active)
                        .extra("expired", records.len() - active),
                );
                OperationOutcome::Succeeded
            }
            Err(error) => {
                let message = error.user_message();
                self.logger.error(
                    &format!("Failed to fetch tokens: {}", error),
                    &context.extra("error_code", error.error_code()),
                );
                *self.last_error_slot() = Some(message.clone());
                self.notifier.notify_failure(&message);
                OperationOutcome::Failed(message)
            }
        }
    }

    /// Mint a new token, then refetch to pick it up.
    ///
    /// The create response is not used to update the store.
    pub async fn create_token(&self, credentials: &IssuerCredentials) -> OperationOutcome {
        let context = ApiKeysLogContext::new().operation("create_token");
        if self.is_disposed() {
            return OperationOutcome::Ignored;
        }

        if let Err(error) = credentials.validate() {
            let message = error.to_string();
            self.logger.warn("Rejected token creation", &context);
            self.notifier
                .notify_failure(&format!("{}{}", CREATE_FAILED_PREFIX, message));
            return OperationOutcome::Rejected(message);
        }

        self.logger.debug("Creating token", &context);
        let result = self.service.create(credentials).await;

        if self.is_disposed() {
            self.logger
                .debug("Dropping create response after teardown", &context);
            return OperationOutcome::Ignored;
        }

        match result {
            Ok(created) => {
                let context = match created {
                    Some(record) => context.token_id(record.id),
                    None => context,
                };
                self.logger.info("Token created", &context);
                self.notifier.notify_success(CREATED_MESSAGE);
                self.fetch_all().await;
                OperationOutcome::Succeeded
            }
            Err(error) => {
                let message = decode_create_error(&error.user_message());
                self.logger.error(
                    &format!("Failed to create token: {}", message),
                    &context.extra("error_code", error.error_code()),
                );
                self.notifier
                    .notify_failure(&format!("{}{}", CREATE_FAILED_PREFIX, message));
                OperationOutcome::Failed(message)
            }
        }
    }

    /// Revoke an active token, then refetch.
    pub async fn revoke_token(&self, id: TokenId) -> OperationOutcome {
        self.mutate(Mutation::Revoke, id).await
    }

    /// Delete an expired token, then refetch.
    pub async fn delete_token(&self, id: TokenId) -> OperationOutcome {
        self.mutate(Mutation::Delete, id).await
    }

    async fn mutate(&self, mutation: Mutation, id: TokenId) -> OperationOutcome {
        let context = ApiKeysLogContext::new()
            .operation(mutation.operation())
            .token_id(id);
        if self.is_disposed() {
            return OperationOutcome::Ignored;
        }

        let Some(record) = self.store.get(id) else {
            self.logger.debug("Ignoring stale token id", &context);
            return OperationOutcome::Ignored;
        };

        if self.gate == ActionGate::ClientSide {
            let status = record_status(&record, self.clock.now());
            if status != mutation.required_status() {
                let message = TokenError::PreconditionFailed {
                    id,
                    action: mutation.action(),
                    status,
                }
                .to_string();
                self.logger.warn(&message, &context);
                self.notifier
                    .notify_failure(&format!("{}{}", mutation.failure_prefix(), message));
                return OperationOutcome::Rejected(message);
            }
        }

        self.logger.debug("Sending request", &context);
        let result = match mutation {
            Mutation::Revoke => self.service.revoke(id).await,
            Mutation::Delete => self.service.delete(id).await,
        };

        if self.is_disposed() {
            self.logger
                .debug("Dropping response after teardown", &context);
            return OperationOutcome::Ignored;
        }

        let outcome = match result {
            Ok(()) => {
                if let Mutation::Delete = mutation {
                    self.store.remove(id);
                }
                self.logger.info("Request accepted", &context);
                self.notifier.notify_success(mutation.success_message());
                OperationOutcome::Succeeded
            }
            Err(error) => {
                let message = error.user_message();
                self.logger.error(
                    &format!("Request failed: {}", error),
                    &context.extra("error_code", error.error_code()),
                );
                self.notifier
                    .notify_failure(&format!("{}{}", mutation.failure_prefix(), message));
                OperationOutcome::Failed(message)
            }
        };

        // Resync whatever happened; the service owns the truth.
        self.fetch_all().await;
        outcome
    }

    fn last_error_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FixedClock, RecordingNotifier};
    use crate::error::{create_error_from_response, ApiKeysError, NetworkError};
    use crate::telemetry::{InMemoryLogger, LogLevel};
    use crate::token::{MockTokenService, TokenServiceCall};
    use crate::types::TokenRecord;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::VecDeque;
    use tokio::sync::{oneshot, Notify};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 13, 12, 0, 0).unwrap()
    }

    fn expired(id: TokenId) -> TokenRecord {
        TokenRecord::new(id, format!("secret-{}", id), now() - Duration::days(30), now() - Duration::days(1))
    }

    fn active(id: TokenId) -> TokenRecord {
        TokenRecord::new(id, format!("secret-{}", id), now() - Duration::days(1), now() + Duration::days(1))
    }

    struct Harness {
        service: Arc<MockTokenService>,
        notifier: Arc<RecordingNotifier>,
        logger: Arc<InMemoryLogger>,
        controller: LifecycleController<MockTokenService>,
    }

    fn harness(gate: ActionGate) -> Harness {
        let service = Arc::new(MockTokenService::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let logger = Arc::new(InMemoryLogger::new());
        let controller = LifecycleController::new(
            service.clone(),
            Arc::new(TokenStore::new()),
            notifier.clone(),
            Arc::new(FixedClock::new(now())),
        )
        .with_logger(logger.clone())
        .with_action_gate(gate);

        Harness {
            service,
            notifier,
            logger,
            controller,
        }
    }

    async fn seeded(gate: ActionGate) -> Harness {
        let h = harness(gate);
        h.service.set_tokens(vec![expired(1), active(2)]);
        assert!(h.controller.fetch_all().await.is_success());
        h
    }

    #[tokio::test]
    async fn test_fetch_derives_statuses() {
        let h = seeded(ActionGate::ClientSide).await;

        assert_eq!(h.controller.store().ids(), vec![1, 2]);
        assert_eq!(h.controller.status_of(1), Some(TokenStatus::Expired));
        assert_eq!(h.controller.status_of(2), Some(TokenStatus::Active));
        assert!(!h.controller.is_loading());
        assert!(h.notifier.get_notifications().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_store_untouched() {
        let h = seeded(ActionGate::ClientSide).await;
        h.service.queue_list(Err(create_error_from_response(500, "Internal Server Error", r#"{"message":"db down"}"#)));

        let outcome = h.controller.fetch_all().await;

        assert_eq!(outcome, OperationOutcome::Failed("db down".to_string()));
        assert_eq!(h.controller.store().ids(), vec![1, 2]);
        assert_eq!(h.notifier.failures(), vec!["db down"]);
        assert_eq!(h.controller.last_error(), Some("db down".to_string()));
        assert_eq!(h.logger.get_entries_by_level(LogLevel::Error).len(), 1);

        assert!(h.controller.fetch_all().await.is_success());
        assert_eq!(h.controller.last_error(), None);
    }

    #[tokio::test]
    async fn test_revoke_success_refetches() {
        let h = seeded(ActionGate::ClientSide).await;
        h.service.set_tokens(vec![expired(1)]);

        let outcome = h.controller.revoke_token(2).await;

        assert_eq!(outcome, OperationOutcome::Succeeded);
        assert_eq!(h.notifier.successes(), vec![REVOKED_MESSAGE]);
        assert_eq!(
            h.service.get_history(),
            vec![
                TokenServiceCall::List,
                TokenServiceCall::Revoke(2),
                TokenServiceCall::List
            ]
        );
        assert!(!h.controller.store().contains(2));
    }

    #[tokio::test]
    async fn test_revoke_failure_still_refetches() {
        let h = seeded(ActionGate::ClientSide).await;
        h.service.queue_revoke(Err(create_error_from_response(403, "Forbidden", r#"{"message":"not yours"}"#)));

        let outcome = h.controller.revoke_token(2).await;

        assert_eq!(outcome, OperationOutcome::Failed("not yours".to_string()));
        assert_eq!(
            h.notifier.failures(),
            vec![format!("{}not yours", REVOKE_FAILED_PREFIX)]
        );
        assert_eq!(h.service.list_calls(), 2);
        assert!(h.controller.store().contains(2));
    }

    #[tokio::test]
    async fn test_create_structured_error_decoded() {
        let h = seeded(ActionGate::ClientSide).await;
        h.service.queue_create(Err(create_error_from_response(
            500,
            "Internal Server Error",
            &serde_json::json!({
                "message": r#"Error to generate new token: {"error_description":"invalid credentials"}"#
            })
            .to_string(),
        )));

        let outcome = h
            .controller
            .create_token(&IssuerCredentials::new("user@example.com", "wrong"))
            .await;

        assert_eq!(outcome, OperationOutcome::Failed("invalid credentials".to_string()));
        let failures = h.notifier.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("invalid credentials"));
        assert!(!failures[0].contains("error_description"));
        assert_eq!(h.service.list_calls(), 1);
        assert_eq!(h.controller.store().ids(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_create_success_refetches() {
        let h = seeded(ActionGate::ClientSide).await;
        h.service.queue_create(Ok(Some(active(3))));
        h.service.set_tokens(vec![expired(1), active(2), active(3)]);

        let outcome = h
            .controller
            .create_token(&IssuerCredentials::new("user@example.com", "pw"))
            .await;

        assert!(outcome.is_success());
        assert_eq!(h.notifier.successes(), vec![CREATED_MESSAGE]);
        assert_eq!(h.controller.store().ids(), vec![1, 2, 3]);
        assert_eq!(h.service.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_credentials() {
        let h = harness(ActionGate::ClientSide);

        let outcome = h
            .controller
            .create_token(&IssuerCredentials::new("user@example.com", ""))
            .await;

        assert!(matches!(outcome, OperationOutcome::Rejected(_)));
        assert!(h.service.get_history().is_empty());
        assert_eq!(h.notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_active_rejected_locally() {
        let h = seeded(ActionGate::ClientSide).await;

        let outcome = h.controller.delete_token(2).await;

        assert!(matches!(outcome, OperationOutcome::Rejected(_)));
        assert!(!h.service.get_history().contains(&TokenServiceCall::Delete(2)));
        assert_eq!(h.notifier.failures().len(), 1);
        assert!(h.notifier.failures()[0].starts_with(DELETE_FAILED_PREFIX));
    }

    #[tokio::test]
    async fn test_revoke_expired_rejected_locally() {
        let h = seeded(ActionGate::ClientSide).await;

        let outcome = h.controller.revoke_token(1).await;

        assert!(matches!(outcome, OperationOutcome::Rejected(_)));
        assert_eq!(h.service.get_history(), vec![TokenServiceCall::List]);
    }

    #[tokio::test]
    async fn test_server_only_gate_forwards() {
        let h = seeded(ActionGate::ServerOnly).await;
        h.service.queue_delete(Err(create_error_from_response(400, "Bad Request", r#"{"message":"token still active"}"#)));

        let outcome = h.controller.delete_token(2).await;

        assert_eq!(outcome, OperationOutcome::Failed("token still active".to_string()));
        assert!(h.service.get_history().contains(&TokenServiceCall::Delete(2)));
        assert_eq!(
            h.controller.available_actions(2),
            Some(TokenActions {
                can_revoke: true,
                can_delete: true
            })
        );
    }

    #[tokio::test]
    async fn test_available_actions_client_side() {
        let h = seeded(ActionGate::ClientSide).await;
        assert_eq!(
            h.controller.available_actions(1),
            Some(TokenActions {
                can_revoke: false,
                can_delete: true
            })
        );
        assert_eq!(
            h.controller.available_actions(2),
            Some(TokenActions {
                can_revoke: true,
                can_delete: false
            })
        );
        assert_eq!(h.controller.available_actions(99), None);
    }

    #[tokio::test]
    async fn test_delete_success_removes_even_if_refetch_fails() {
        let h = seeded(ActionGate::ClientSide).await;
        h.service.queue_list(Err(ApiKeysError::Network(NetworkError::ConnectionFailed {
            message: "offline".to_string(),
        })));

        let outcome = h.controller.delete_token(1).await;

        assert!(outcome.is_success());
        assert_eq!(h.controller.store().ids(), vec![2]);
        assert_eq!(h.notifier.successes(), vec![DELETED_MESSAGE]);
        assert_eq!(h.notifier.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_id_is_noop() {
        let h = seeded(ActionGate::ClientSide).await;

        assert_eq!(h.controller.revoke_token(42).await, OperationOutcome::Ignored);
        assert_eq!(h.controller.delete_token(42).await, OperationOutcome::Ignored);

        assert_eq!(h.service.get_history(), vec![TokenServiceCall::List]);
        assert!(h.notifier.get_notifications().is_empty());
    }

    #[test]
    fn test_fetch_with_blocking_executor() {
        let h = harness(ActionGate::ClientSide);
        h.service.set_tokens(vec![active(5)]);

        let outcome = tokio_test::block_on(h.controller.fetch_all());

        assert!(outcome.is_success());
        assert_eq!(h.controller.store().ids(), vec![5]);
        assert!(h
            .logger
            .get_entries()
            .iter()
            .any(|e| e.message == "Fetched tokens" && e.context.extra.get("active") == Some(&"1".to_string())));
    }

    /// Service whose list calls resolve only when the test says so.
    #[derive(Default)]
    struct ControlledService {
        pending: Mutex<VecDeque<oneshot::Receiver<Vec<TokenRecord>>>>,
        release: Notify,
    }

    #[async_trait]
    impl TokenService for ControlledService {
        async fn list(&self) -> Result<Vec<TokenRecord>, ApiKeysError> {
            let receiver = self.pending.lock().unwrap().pop_front();
            match receiver {
                Some(rx) => rx.await.map_err(|_| {
                    ApiKeysError::Network(NetworkError::ConnectionFailed {
                        message: "dropped".to_string(),
                    })
                }),
                None => {
                    self.release.notified().await;
                    Ok(vec![active(9)])
                }
            }
        }

        async fn create(
            &self,
            _: &IssuerCredentials,
        ) -> Result<Option<TokenRecord>, ApiKeysError> {
            Ok(None)
        }

        async fn revoke(&self, _: TokenId) -> Result<(), ApiKeysError> {
            Ok(())
        }

        async fn delete(&self, _: TokenId) -> Result<(), ApiKeysError> {
            Ok(())
        }
    }

    fn controlled() -> (Arc<ControlledService>, Arc<RecordingNotifier>, LifecycleController<ControlledService>) {
        let service = Arc::new(ControlledService::default());
        let notifier = Arc::new(RecordingNotifier::new());
        let controller = LifecycleController::new(
            service.clone(),
            Arc::new(TokenStore::new()),
            notifier.clone(),
            Arc::new(FixedClock::new(now())),
        )
        .with_logger(Arc::new(InMemoryLogger::new()));
        (service, notifier, controller)
    }

    #[tokio::test]
    async fn test_last_resolved_fetch_wins() {
        let (service, _, controller) = controlled();
        let (older_tx, older_rx) = oneshot::channel();
        let (newer_tx, newer_rx) = oneshot::channel();
        service.pending.lock().unwrap().extend([older_rx, newer_rx]);

        let observer = &controller;
        let driver = async move {
            assert!(observer.is_loading());
            newer_tx.send(vec![active(2)]).unwrap();
            tokio::task::yield_now().await;
            older_tx.send(vec![active(1)]).unwrap();
        };

        let (older, newer, _) = futures::join!(controller.fetch_all(), controller.fetch_all(), driver);

        assert!(older.is_success() && newer.is_success());
        // The older request resolved last, so its view stands.
        assert_eq!(controller.store().ids(), vec![1]);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_late_response_dropped_after_dispose() {
        let (service, notifier, controller) = controlled();

        let target = &controller;
        let release = service.clone();
        let teardown = async move {
            target.dispose();
            release.release.notify_one();
        };

        let (outcome, _) = futures::join!(controller.fetch_all(), teardown);

        assert_eq!(outcome, OperationOutcome::Ignored);
        assert!(controller.store().is_empty());
        assert!(notifier.get_notifications().is_empty());
        assert_eq!(controller.revoke_token(9).await, OperationOutcome::Ignored);
    }
}
