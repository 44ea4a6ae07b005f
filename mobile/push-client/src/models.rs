use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque delivery token issued by the OS push service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceToken(String);

impl DeviceToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for logs
    pub fn prefix(&self) -> String {
        self.0.chars().take(8).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform family the client runs on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }

    /// Push channel the backend uses to reach this platform
    pub fn channel(&self) -> &'static str {
        match self {
            Platform::Ios => "apns",
            Platform::Android | Platform::Web => "fcm",
        }
    }
}

/// OS notification permission state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// The user has not been asked yet
    Undetermined,
    Denied,
    Granted,
}

/// Which listener delivered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationOrigin {
    /// Arrived while the app was in the foreground
    Received,
    /// The user interacted with a delivered notification
    Tapped,
}

impl NotificationOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOrigin::Received => "received",
            NotificationOrigin::Tapped => "tapped",
        }
    }
}

/// Handle returned by the OS runtime for an installed listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Identifier of a scheduled local notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub String);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters passed to the OS when requesting a push token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    pub project_id: Option<String>,
}

/// Notification as handed over by the OS runtime, before classification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNotification {
    pub kind: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl RawNotification {
    /// Build from the OS content fields, taking the kind from `data.type`.
    ///
    /// Non-object data is treated as an empty payload.
    pub fn from_data(title: Option<String>, body: Option<String>, data: Value) -> Self {
        let payload = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            kind,
            title,
            body,
            payload,
        }
    }
}

/// Closed set of notification kinds the app understands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StreamStarted,
    StreamEnded,
    OrderUpdate,
    Promotion,
    BidUpdate,
    Message,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::StreamStarted => "stream_started",
            NotificationKind::StreamEnded => "stream_ended",
            NotificationKind::OrderUpdate => "order_update",
            NotificationKind::Promotion => "promotion",
            NotificationKind::BidUpdate => "bid_update",
            NotificationKind::Message => "message",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stream_started" => Some(NotificationKind::StreamStarted),
            "stream_ended" => Some(NotificationKind::StreamEnded),
            "order_update" => Some(NotificationKind::OrderUpdate),
            "promotion" => Some(NotificationKind::Promotion),
            "bid_update" => Some(NotificationKind::BidUpdate),
            "message" => Some(NotificationKind::Message),
            _ => None,
        }
    }
}

/// Typed notification event, one variant per kind
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    StreamStarted { stream_id: Option<String> },
    StreamEnded { stream_id: Option<String> },
    OrderUpdate { order_id: Option<String> },
    Promotion { promotion_id: Option<String> },
    BidUpdate { payload: Map<String, Value> },
    Message { payload: Map<String, Value> },
    /// Kind missing or outside the known set
    Unknown { kind: Option<String> },
}

impl NotificationEvent {
    pub fn kind(&self) -> Option<NotificationKind> {
        match self {
            NotificationEvent::StreamStarted { .. } => Some(NotificationKind::StreamStarted),
            NotificationEvent::StreamEnded { .. } => Some(NotificationKind::StreamEnded),
            NotificationEvent::OrderUpdate { .. } => Some(NotificationKind::OrderUpdate),
            NotificationEvent::Promotion { .. } => Some(NotificationKind::Promotion),
            NotificationEvent::BidUpdate { .. } => Some(NotificationKind::BidUpdate),
            NotificationEvent::Message { .. } => Some(NotificationKind::Message),
            NotificationEvent::Unknown { .. } => None,
        }
    }
}

/// Classified notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEnvelope {
    pub title: Option<String>,
    pub body: Option<String>,
    pub event: NotificationEvent,
}

impl From<RawNotification> for NotificationEnvelope {
    fn from(raw: RawNotification) -> Self {
        let RawNotification {
            kind,
            title,
            body,
            payload,
        } = raw;

        let event = match kind.as_deref().and_then(NotificationKind::parse) {
            Some(NotificationKind::StreamStarted) => NotificationEvent::StreamStarted {
                stream_id: identifier(&payload, "streamId"),
            },
            Some(NotificationKind::StreamEnded) => NotificationEvent::StreamEnded {
                stream_id: identifier(&payload, "streamId"),
            },
            Some(NotificationKind::OrderUpdate) => NotificationEvent::OrderUpdate {
                order_id: identifier(&payload, "orderId"),
            },
            Some(NotificationKind::Promotion) => NotificationEvent::Promotion {
                promotion_id: identifier(&payload, "promotionId"),
            },
            Some(NotificationKind::BidUpdate) => NotificationEvent::BidUpdate { payload },
            Some(NotificationKind::Message) => NotificationEvent::Message { payload },
            None => NotificationEvent::Unknown { kind },
        };

        Self { title, body, event }
    }
}

/// Presence check for an identifier field. Strings and numbers count,
/// anything else (including blank strings) is absent.
fn identifier(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Content of a local notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// When a scheduled local notification fires. Interpreted by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleTrigger {
    /// Fire after `seconds`, optionally repeating
    Interval { seconds: u64, repeats: bool },
    /// Fire once at a point in time
    Date { at: DateTime<Utc> },
    /// Fire every day at the given local time
    Daily { hour: u8, minute: u8 },
}
