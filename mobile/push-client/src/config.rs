use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PushError, Result};
use crate::models::TokenRequest;

pub const DEFAULT_TOKEN_STORAGE_KEY: &str = "nova.push_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushClientConfig {
    /// Storage key the device token is persisted under
    pub token_storage_key: String,
    /// Project identifier forwarded to the OS token request
    pub project_id: Option<String>,
    pub android_channel: AndroidChannel,
    pub presentation: ForegroundPresentation,
    pub registry: RegistryConfig,
    /// Backing file for `FileStore`
    pub store_path: Option<PathBuf>,
}

/// Android notification channel, configured once before listeners are useful
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidChannel {
    pub id: String,
    pub name: String,
    pub importance: ChannelImportance,
    /// Alternating off/on durations in milliseconds
    pub vibration_pattern: Vec<u64>,
    /// Indicator light color as `#AARRGGBB`
    pub light_color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelImportance {
    Min,
    Low,
    Default,
    High,
    Max,
}

/// How notifications are presented while the app is in the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundPresentation {
    pub show_alert: bool,
    pub play_sound: bool,
    pub set_badge: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AndroidChannel {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "default".to_string(),
            importance: ChannelImportance::Max,
            vibration_pattern: vec![0, 250, 250, 250],
            light_color: "#FF231F7C".to_string(),
        }
    }
}

impl Default for ForegroundPresentation {
    fn default() -> Self {
        Self {
            show_alert: true,
            play_sound: true,
            set_badge: true,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PushClientConfig {
    fn default() -> Self {
        Self {
            token_storage_key: DEFAULT_TOKEN_STORAGE_KEY.to_string(),
            project_id: None,
            android_channel: AndroidChannel::default(),
            presentation: ForegroundPresentation::default(),
            registry: RegistryConfig::default(),
            store_path: None,
        }
    }
}

impl PushClientConfig {
    /// Load configuration from `PUSH_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let timeout_secs = match env::var("PUSH_REGISTRY_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|e| {
                PushError::Config(format!("PUSH_REGISTRY_TIMEOUT_SECS must be a valid u64: {e}"))
            })?,
            Err(_) => defaults.registry.timeout_secs,
        };

        let token_storage_key =
            env::var("PUSH_TOKEN_STORAGE_KEY").unwrap_or(defaults.token_storage_key);
        if token_storage_key.trim().is_empty() {
            return Err(PushError::Config(
                "PUSH_TOKEN_STORAGE_KEY must not be empty".to_string(),
            ));
        }

        Ok(PushClientConfig {
            token_storage_key,
            project_id: env::var("PUSH_PROJECT_ID").ok().filter(|s| !s.is_empty()),
            android_channel: AndroidChannel {
                id: env::var("PUSH_ANDROID_CHANNEL_ID").unwrap_or(defaults.android_channel.id),
                name: env::var("PUSH_ANDROID_CHANNEL_NAME")
                    .unwrap_or(defaults.android_channel.name),
                ..defaults.android_channel
            },
            presentation: defaults.presentation,
            registry: RegistryConfig {
                base_url: env::var("PUSH_REGISTRY_URL").unwrap_or(defaults.registry.base_url),
                timeout_secs,
            },
            store_path: env::var("PUSH_STORE_PATH").ok().map(PathBuf::from),
        })
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.token_storage_key = key.into();
        self
    }

    pub fn with_registry_url(mut self, base_url: impl Into<String>) -> Self {
        self.registry.base_url = base_url.into();
        self
    }

    pub fn token_request(&self) -> TokenRequest {
        TokenRequest {
            project_id: self.project_id.clone(),
        }
    }
}
