//! Backend token registry
//!
//! The backend addresses pushes to this install by the token registered here.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::{PushError, Result};
use crate::models::{DeviceToken, Platform};

/// `(user_id, token, platform)` as sent to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRegistration {
    pub user_id: String,
    pub token: DeviceToken,
    pub platform: Platform,
}

#[async_trait]
pub trait TokenRegistry: Send + Sync {
    async fn register(&self, registration: &TokenRegistration) -> Result<()>;

    async fn unregister(&self, registration: &TokenRegistration) -> Result<()>;
}

/// Register device token request body
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RegisterDevicePayload {
    pub user_id: String,
    pub token: String,
    pub channel: String,     // "fcm", "apns"
    pub device_type: String, // "ios", "android", "web"
}

/// Unregister device token request body
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnregisterDevicePayload {
    pub user_id: String,
    pub token: String,
}

impl From<&TokenRegistration> for RegisterDevicePayload {
    fn from(registration: &TokenRegistration) -> Self {
        Self {
            user_id: registration.user_id.clone(),
            token: registration.token.as_str().to_string(),
            channel: registration.platform.channel().to_string(),
            device_type: registration.platform.as_str().to_string(),
        }
    }
}

impl From<&TokenRegistration> for UnregisterDevicePayload {
    fn from(registration: &TokenRegistration) -> Self {
        Self {
            user_id: registration.user_id.clone(),
            token: registration.token.as_str().to_string(),
        }
    }
}

/// Token registry talking to the notification service's device endpoints
pub struct HttpTokenRegistry {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpTokenRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PushError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn register_url(&self) -> String {
        format!("{}/api/v1/devices/register", self.base_url)
    }

    pub fn unregister_url(&self) -> String {
        format!("{}/api/v1/devices/unregister", self.base_url)
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<()> {
        let response = self.http_client.post(url).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!("Token registry request to {} succeeded", url);
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(PushError::Backend(format!("{} - {}", status, error_text)))
    }
}

#[async_trait]
impl TokenRegistry for HttpTokenRegistry {
    async fn register(&self, registration: &TokenRegistration) -> Result<()> {
        let payload = RegisterDevicePayload::from(registration);
        self.post(&self.register_url(), &payload).await?;
        info!(
            "Registered push token {} for user {} ({})",
            registration.token.prefix(),
            registration.user_id,
            registration.platform.as_str()
        );
        Ok(())
    }

    async fn unregister(&self, registration: &TokenRegistration) -> Result<()> {
        let payload = UnregisterDevicePayload::from(registration);
        self.post(&self.unregister_url(), &payload).await?;
        info!(
            "Unregistered push token {} for user {}",
            registration.token.prefix(),
            registration.user_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry_for(server: &MockServer) -> HttpTokenRegistry {
        HttpTokenRegistry::new(&RegistryConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn registration(platform: Platform) -> TokenRegistration {
        TokenRegistration {
            user_id: "user-1".to_string(),
            token: DeviceToken::new("token-abc"),
            platform,
        }
    }

    #[test]
    fn test_register_payload_channel() {
        let payload = RegisterDevicePayload::from(&registration(Platform::Ios));
        assert_eq!(payload.channel, "apns");
        assert_eq!(payload.device_type, "ios");

        let payload = RegisterDevicePayload::from(&registration(Platform::Android));
        assert_eq!(payload.channel, "fcm");
        assert_eq!(payload.device_type, "android");
        assert_eq!(payload.token, "token-abc");
    }

    #[test]
    fn test_register_payload_json_shape() {
        let payload = RegisterDevicePayload::from(&registration(Platform::Android));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_id": "user-1",
                "token": "token-abc",
                "channel": "fcm",
                "device_type": "android"
            })
        );
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let registry = HttpTokenRegistry::new(&RegistryConfig {
            base_url: "https://api.example.com/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(
            registry.register_url(),
            "https://api.example.com/api/v1/devices/register"
        );
        assert_eq!(
            registry.unregister_url(),
            "https://api.example.com/api/v1/devices/unregister"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let registry = HttpTokenRegistry::new(&RegistryConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
        })
        .unwrap();

        let result = registry.register(&registration(Platform::Ios)).await;
        assert!(matches!(result, Err(PushError::Backend(_))));
    }

    #[tokio::test]
    async fn test_register_posts_device_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/devices/register"))
            .and(body_json(json!({
                "user_id": "user-1",
                "token": "token-abc",
                "channel": "apns",
                "device_type": "ios"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let result = registry.register(&registration(Platform::Ios)).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_register_error_status_maps_to_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/devices/register"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        match registry.register(&registration(Platform::Android)).await {
            Err(PushError::Backend(msg)) => {
                assert!(msg.contains("503"), "unexpected message: {msg}");
                assert!(msg.contains("maintenance"), "unexpected message: {msg}");
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unregister_posts_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/devices/unregister"))
            .and(body_json(json!({
                "user_id": "user-1",
                "token": "token-abc"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let result = registry.unregister(&registration(Platform::Android)).await;
        assert_eq!(result, Ok(()));
    }
}
