//! Local scheduling and badge pass-throughs
//!
//! Each call delegates to the OS runtime. Failures are logged and reported
//! as `None`/`false`/`0`, never as errors.
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{NotificationContent, ScheduleId, ScheduleTrigger};
use crate::runtime::NotificationRuntime;

pub async fn schedule_notification(
    runtime: &dyn NotificationRuntime,
    title: &str,
    body: &str,
    data: Option<Value>,
    trigger: Option<&ScheduleTrigger>,
) -> Option<ScheduleId> {
    let content = NotificationContent {
        title: title.to_string(),
        body: body.to_string(),
        data,
    };

    match runtime.schedule_local(&content, trigger).await {
        Ok(id) => {
            debug!("Scheduled local notification {} (trigger: {:?})", id, trigger);
            Some(id)
        }
        Err(e) => {
            warn!("Failed to schedule local notification: {}", e);
            None
        }
    }
}

pub async fn cancel_all(runtime: &dyn NotificationRuntime) -> bool {
    match runtime.cancel_all_scheduled().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to cancel scheduled notifications: {}", e);
            false
        }
    }
}

pub async fn badge_count(runtime: &dyn NotificationRuntime) -> u32 {
    runtime.get_badge_count().await.unwrap_or_else(|e| {
        warn!("Failed to read badge count: {}", e);
        0
    })
}

pub async fn set_badge(runtime: &dyn NotificationRuntime, count: u32) -> bool {
    match runtime.set_badge_count(count).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to set badge count to {}: {}", count, e);
            false
        }
    }
}
