//! Token manager
//!
//! Acquires the delivery token, keeps it in memory for the rest of the
//! process, and mirrors it into persistent storage. The in-memory copy is
//! authoritative; a failed write-through only costs cross-session continuity.
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::models::{DeviceToken, Platform, TokenRequest};
use crate::registry::{TokenRegistration, TokenRegistry};
use crate::runtime::NotificationRuntime;
use crate::storage::KeyValueStore;

/// Result of a backend registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The backend accepted the request
    Completed,
    /// No token cached in this process; nothing was sent
    NoToken,
    /// Transport or backend error, already logged. Not retried.
    Failed,
}

pub struct TokenManager {
    storage_key: String,
    cache: RwLock<Option<DeviceToken>>,
}

impl TokenManager {
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Request a token from the OS and write it through to storage.
    ///
    /// Only meaningful once the capability gate reported ready.
    pub async fn acquire_token(
        &self,
        runtime: &dyn NotificationRuntime,
        storage: &dyn KeyValueStore,
        request: &TokenRequest,
    ) -> Option<DeviceToken> {
        let token = match runtime.get_push_token(request).await {
            Ok(token) if !token.is_empty() => token,
            Ok(_) => {
                warn!("Push token acquisition returned an empty token");
                return None;
            }
            Err(e) => {
                warn!("Push token acquisition failed: {}", e);
                return None;
            }
        };

        *self.cache.write() = Some(token.clone());
        info!("Acquired push token {}", token.prefix());

        if let Err(e) = storage.set(&self.storage_key, token.as_str()).await {
            error!(
                "Failed to persist push token {} under {}: {}",
                token.prefix(),
                self.storage_key,
                e
            );
        }

        Some(token)
    }

    /// Last token acquired in this process
    pub fn get_push_token(&self) -> Option<DeviceToken> {
        self.cache.read().clone()
    }

    /// Token persisted by this or a previous session
    pub async fn get_stored_push_token(&self, storage: &dyn KeyValueStore) -> Option<DeviceToken> {
        match storage.get(&self.storage_key).await {
            Ok(Some(value)) => {
                let token = DeviceToken::new(value);
                (!token.is_empty()).then_some(token)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read stored push token: {}", e);
                None
            }
        }
    }

    pub async fn register_push_token(
        &self,
        registry: &dyn TokenRegistry,
        user_id: &str,
        platform: Platform,
    ) -> RegistrationOutcome {
        let Some(registration) = self.registration(user_id, platform) else {
            warn!("No push token available, skipping registration for user {}", user_id);
            return RegistrationOutcome::NoToken;
        };

        match registry.register(&registration).await {
            Ok(()) => RegistrationOutcome::Completed,
            Err(e) => {
                error!(
                    "Failed to register push token {} for user {}: {}",
                    registration.token.prefix(),
                    user_id,
                    e
                );
                RegistrationOutcome::Failed
            }
        }
    }

    pub async fn unregister_push_token(
        &self,
        registry: &dyn TokenRegistry,
        user_id: &str,
        platform: Platform,
    ) -> RegistrationOutcome {
        let Some(registration) = self.registration(user_id, platform) else {
            warn!("No push token available, skipping unregistration for user {}", user_id);
            return RegistrationOutcome::NoToken;
        };

        match registry.unregister(&registration).await {
            Ok(()) => RegistrationOutcome::Completed,
            Err(e) => {
                error!(
                    "Failed to unregister push token {} for user {}: {}",
                    registration.token.prefix(),
                    user_id,
                    e
                );
                RegistrationOutcome::Failed
            }
        }
    }

    fn registration(&self, user_id: &str, platform: Platform) -> Option<TokenRegistration> {
        self.get_push_token().map(|token| TokenRegistration {
            user_id: user_id.to_string(),
            token,
            platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PushError, Result};
    use crate::sim::{SimulatedRuntime, SimulatorOptions};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(PushError::PersistenceFailure("disk unavailable".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(PushError::PersistenceFailure("disk full".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingRegistry {
        registered: Mutex<Vec<TokenRegistration>>,
        fail: bool,
    }

    #[async_trait]
    impl TokenRegistry for RecordingRegistry {
        async fn register(&self, registration: &TokenRegistration) -> Result<()> {
            if self.fail {
                return Err(PushError::Backend("503 Service Unavailable".to_string()));
            }
            self.registered.lock().push(registration.clone());
            Ok(())
        }

        async fn unregister(&self, registration: &TokenRegistration) -> Result<()> {
            self.registered
                .lock()
                .retain(|r| r.token != registration.token);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_acquire_caches_and_persists() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default().with_token("tok-123456789"));
        let store = MemoryStore::new();
        let manager = TokenManager::new("push.token");

        assert_eq!(manager.storage_key(), "push.token");
        assert!(manager.get_push_token().is_none());

        let token = manager
            .acquire_token(&runtime, &store, &TokenRequest::default())
            .await;
        assert_eq!(token, Some(DeviceToken::new("tok-123456789")));
        assert_eq!(manager.get_push_token(), token);
        assert_eq!(store.get("push.token").await.unwrap().as_deref(), Some("tok-123456789"));
        assert_eq!(manager.get_stored_push_token(&store).await, token);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_memory_token() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default().with_token("tok-abc"));
        let manager = TokenManager::new("push.token");

        let token = manager
            .acquire_token(&runtime, &FailingStore, &TokenRequest::default())
            .await;
        assert_eq!(token, Some(DeviceToken::new("tok-abc")));
        assert_eq!(manager.get_push_token(), token);
        assert_eq!(manager.get_stored_push_token(&FailingStore).await, None);
    }

    #[tokio::test]
    async fn test_acquisition_failure() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default().with_token_failure("offline"));
        let store = MemoryStore::new();
        let manager = TokenManager::new("push.token");

        let token = manager
            .acquire_token(&runtime, &store, &TokenRequest::default())
            .await;
        assert!(token.is_none());
        assert!(manager.get_push_token().is_none());
        assert_eq!(store.get("push.token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stored_token_ignores_blank_value() {
        let store = MemoryStore::new();
        store.set("push.token", "").await.unwrap();

        let manager = TokenManager::new("push.token");
        assert_eq!(manager.get_stored_push_token(&store).await, None);
    }

    #[tokio::test]
    async fn test_register_without_token() {
        let registry = RecordingRegistry::default();
        let manager = TokenManager::new("push.token");

        let outcome = manager
            .register_push_token(&registry, "user-1", Platform::Ios)
            .await;
        assert_eq!(outcome, RegistrationOutcome::NoToken);
        assert!(registry.registered.lock().is_empty());
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default().with_token("tok-xyz"));
        let store = MemoryStore::new();
        let registry = RecordingRegistry::default();
        let manager = TokenManager::new("push.token");
        manager
            .acquire_token(&runtime, &store, &TokenRequest::default())
            .await;

        let outcome = manager
            .register_push_token(&registry, "user-1", Platform::Android)
            .await;
        assert_eq!(outcome, RegistrationOutcome::Completed);
        {
            let registered = registry.registered.lock();
            assert_eq!(registered.len(), 1);
            assert_eq!(registered[0].platform, Platform::Android);
            assert_eq!(registered[0].token.as_str(), "tok-xyz");
        }

        let outcome = manager
            .unregister_push_token(&registry, "user-1", Platform::Android)
            .await;
        assert_eq!(outcome, RegistrationOutcome::Completed);
        assert!(registry.registered.lock().is_empty());
    }

    #[tokio::test]
    async fn test_register_transport_failure() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default().with_token("tok-xyz"));
        let registry = RecordingRegistry {
            fail: true,
            ..Default::default()
        };
        let manager = TokenManager::new("push.token");
        manager
            .acquire_token(&runtime, &MemoryStore::new(), &TokenRequest::default())
            .await;

        let outcome = manager
            .register_push_token(&registry, "user-1", Platform::Ios)
            .await;
        assert_eq!(outcome, RegistrationOutcome::Failed);
        // Token stays usable
        assert!(manager.get_push_token().is_some());
    }
}
