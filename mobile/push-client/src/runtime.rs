//! OS notification runtime boundary
//!
//! Everything the push client needs from the platform: device and permission
//! queries, token issuance, listener registration, local scheduling and the
//! badge counter. Implementations wrap the native SDK; `SimulatedRuntime`
//! stands in for emulators and tests.
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::{AndroidChannel, ForegroundPresentation};
use crate::error::Result;
use crate::models::{
    DeviceToken, NotificationContent, PermissionState, Platform, RawNotification, ScheduleId,
    ScheduleTrigger, SubscriptionId, TokenRequest,
};

/// Sender half handed to the runtime for one listener
pub type NotificationSender = mpsc::UnboundedSender<RawNotification>;

#[async_trait]
pub trait NotificationRuntime: Send + Sync {
    /// False on simulators and emulators, where push delivery is unusable
    fn is_physical_device(&self) -> bool;

    fn platform(&self) -> Platform;

    /// Current permission state, without prompting
    async fn get_permission_status(&self) -> Result<PermissionState>;

    /// Prompt the user. Returns the state after the prompt resolves.
    async fn request_permission(&self) -> Result<PermissionState>;

    async fn get_push_token(&self, request: &TokenRequest) -> Result<DeviceToken>;

    /// Android only: create or update the notification channel
    async fn configure_channel(&self, channel: &AndroidChannel) -> Result<()>;

    async fn set_foreground_presentation(&self, presentation: &ForegroundPresentation)
        -> Result<()>;

    /// Deliver foreground notifications into `sender`
    async fn add_received_listener(&self, sender: NotificationSender) -> Result<SubscriptionId>;

    /// Deliver user interactions with notifications into `sender`
    async fn add_tapped_listener(&self, sender: NotificationSender) -> Result<SubscriptionId>;

    /// Drop the listener's sender. Unknown ids are ignored.
    async fn remove_subscription(&self, id: SubscriptionId) -> Result<()>;

    /// `None` trigger means deliver immediately
    async fn schedule_local(
        &self,
        content: &NotificationContent,
        trigger: Option<&ScheduleTrigger>,
    ) -> Result<ScheduleId>;

    /// Clear pending scheduled notifications; delivered ones stay
    async fn cancel_all_scheduled(&self) -> Result<()>;

    async fn get_badge_count(&self) -> Result<u32>;

    async fn set_badge_count(&self, count: u32) -> Result<()>;
}
