//! Push client
//!
//! The notification lifecycle manager the app talks to. Construct it once at
//! startup, share it by `Arc`, call `initialize()` when the app is ready and
//! `cleanup()` when it goes away. Every operation has defined behavior
//! before `initialize()` and none of them returns an error.
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::capability::{self, CapabilityResult, UnsupportedReason};
use crate::config::PushClientConfig;
use crate::listeners::{ListenerRegistry, NotificationHandler};
use crate::models::{DeviceToken, Platform, ScheduleId, ScheduleTrigger};
use crate::registry::TokenRegistry;
use crate::runtime::NotificationRuntime;
use crate::schedule;
use crate::storage::KeyValueStore;
use crate::token::{RegistrationOutcome, TokenManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    /// Push unusable until the device or permission changes
    Unsupported(UnsupportedReason),
    /// Capability was fine but the OS issued no token
    TokenUnavailable,
    Ready,
    /// Listeners removed; `initialize()` may run again
    TornDown,
}

pub struct PushClient {
    config: PushClientConfig,
    runtime: Arc<dyn NotificationRuntime>,
    storage: Arc<dyn KeyValueStore>,
    registry: Arc<dyn TokenRegistry>,
    handler: Arc<dyn NotificationHandler>,
    tokens: TokenManager,
    listeners: Mutex<ListenerRegistry>,
    state: RwLock<LifecycleState>,
}

impl PushClient {
    pub fn new(
        config: PushClientConfig,
        runtime: Arc<dyn NotificationRuntime>,
        storage: Arc<dyn KeyValueStore>,
        registry: Arc<dyn TokenRegistry>,
        handler: Arc<dyn NotificationHandler>,
    ) -> Self {
        let tokens = TokenManager::new(config.token_storage_key.clone());
        Self {
            config,
            runtime,
            storage,
            registry,
            handler,
            tokens,
            listeners: Mutex::new(ListenerRegistry::new()),
            state: RwLock::new(LifecycleState::Uninitialized),
        }
    }

    pub fn config(&self) -> &PushClientConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.runtime.platform()
    }

    pub fn state(&self) -> LifecycleState {
        self.state.read().clone()
    }

    /// Run the capability gate, acquire a token and install listeners.
    ///
    /// Returns the token, or `None` when push is unavailable for any reason.
    /// Overlapping calls queue behind the listener lock.
    pub async fn initialize(&self) -> Option<DeviceToken> {
        let mut listeners = self.listeners.lock().await;
        let runtime = self.runtime.as_ref();

        if let CapabilityResult::Unsupported(reason) = capability::check_capability(runtime).await {
            info!("Push notifications unavailable: {}", reason);
            listeners.remove(runtime).await;
            self.set_state(LifecycleState::Unsupported(reason));
            return None;
        }

        if runtime.platform() == Platform::Android {
            if let Err(e) = runtime.configure_channel(&self.config.android_channel).await {
                warn!(
                    "Failed to configure notification channel {}: {}",
                    self.config.android_channel.id, e
                );
            }
        }

        if let Err(e) = runtime
            .set_foreground_presentation(&self.config.presentation)
            .await
        {
            warn!("Failed to set foreground presentation: {}", e);
        }

        let request = self.config.token_request();
        let Some(token) = self
            .tokens
            .acquire_token(runtime, self.storage.as_ref(), &request)
            .await
        else {
            listeners.remove(runtime).await;
            self.set_state(LifecycleState::TokenUnavailable);
            return None;
        };

        if let Err(e) = listeners.install(runtime, self.handler.clone()).await {
            error!("Failed to install notification listeners: {}", e);
        }

        self.set_state(LifecycleState::Ready);
        info!(
            "Push client ready on {} with token {}",
            runtime.platform().as_str(),
            token.prefix()
        );
        Some(token)
    }

    /// Remove listeners. Safe to call any number of times.
    pub async fn cleanup(&self) {
        let mut listeners = self.listeners.lock().await;
        listeners.remove(self.runtime.as_ref()).await;
        self.set_state(LifecycleState::TornDown);
    }

    /// Token acquired in this process, without awaiting anything
    pub fn get_push_token(&self) -> Option<DeviceToken> {
        self.tokens.get_push_token()
    }

    pub async fn get_stored_push_token(&self) -> Option<DeviceToken> {
        self.tokens.get_stored_push_token(self.storage.as_ref()).await
    }

    /// Fire-and-forget: without a cached token this only logs a warning.
    pub async fn register_push_token(&self, user_id: &str) -> RegistrationOutcome {
        self.tokens
            .register_push_token(self.registry.as_ref(), user_id, self.platform())
            .await
    }

    pub async fn unregister_push_token(&self, user_id: &str) -> RegistrationOutcome {
        self.tokens
            .unregister_push_token(self.registry.as_ref(), user_id, self.platform())
            .await
    }

    pub async fn schedule_notification(
        &self,
        title: &str,
        body: &str,
        data: Option<Value>,
        trigger: Option<ScheduleTrigger>,
    ) -> Option<ScheduleId> {
        schedule::schedule_notification(self.runtime.as_ref(), title, body, data, trigger.as_ref())
            .await
    }

    pub async fn cancel_all_notifications(&self) -> bool {
        schedule::cancel_all(self.runtime.as_ref()).await
    }

    pub async fn get_badge_count(&self) -> u32 {
        schedule::badge_count(self.runtime.as_ref()).await
    }

    pub async fn set_badge_count(&self, count: u32) -> bool {
        schedule::set_badge(self.runtime.as_ref(), count).await
    }

    pub async fn clear_badge(&self) -> bool {
        self.set_badge_count(0).await
    }

    fn set_state(&self, state: LifecycleState) {
        let mut current = self.state.write();
        if *current != state {
            info!("Push client state {:?} -> {:?}", *current, state);
        }
        *current = state;
    }
}
