//! In-process notification runtime
//!
//! Behaves like the OS notification layer on a device or emulator without
//! talking to one: permission answers, token issuance and failures are
//! scripted through `SimulatorOptions`, scheduled notifications fire when
//! `fire_due` is called, and received/tapped notifications are injected with
//! `receive` and `tap`.
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use tracing::debug;
use uuid::Uuid;

use crate::capability::UnsupportedReason;
use crate::config::{AndroidChannel, ForegroundPresentation};
use crate::error::{PushError, Result};
use crate::models::{
    DeviceToken, NotificationContent, NotificationOrigin, PermissionState, Platform,
    RawNotification, ScheduleId, ScheduleTrigger, SubscriptionId, TokenRequest,
};
use crate::runtime::{NotificationRuntime, NotificationSender};

#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    pub physical_device: bool,
    pub platform: Platform,
    pub permission: PermissionState,
    /// State the user picks when prompted
    pub prompt_answer: PermissionState,
    /// Token to issue, or the error message to fail with
    pub token: std::result::Result<String, String>,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            physical_device: true,
            platform: Platform::Ios,
            permission: PermissionState::Granted,
            prompt_answer: PermissionState::Granted,
            token: Ok(format!("SimulatedPushToken[{}]", Uuid::new_v4())),
        }
    }
}

impl SimulatorOptions {
    /// Emulator: no push delivery possible
    pub fn emulator() -> Self {
        Self {
            physical_device: false,
            ..Self::default()
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_permission(mut self, permission: PermissionState) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_prompt_answer(mut self, answer: PermissionState) -> Self {
        self.prompt_answer = answer;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Ok(token.into());
        self
    }

    pub fn with_token_failure(mut self, message: impl Into<String>) -> Self {
        self.token = Err(message.into());
        self
    }
}

struct Listener {
    origin: NotificationOrigin,
    sender: NotificationSender,
}

struct PendingNotification {
    id: ScheduleId,
    content: NotificationContent,
    fire_at: DateTime<Utc>,
    repeat_every: Option<Duration>,
}

pub struct SimulatedRuntime {
    options: SimulatorOptions,
    permission: Mutex<PermissionState>,
    listeners: Mutex<HashMap<u64, Listener>>,
    pending: Mutex<Vec<PendingNotification>>,
    delivered: Mutex<Vec<NotificationContent>>,
    channel: Mutex<Option<AndroidChannel>>,
    presentation: Mutex<Option<ForegroundPresentation>>,
    badge: AtomicU32,
    next_subscription: AtomicU64,
    permission_requests: AtomicUsize,
    token_requests: AtomicUsize,
    subscription_removals: AtomicUsize,
}

impl SimulatedRuntime {
    pub fn new(options: SimulatorOptions) -> Self {
        Self {
            permission: Mutex::new(options.permission),
            options,
            listeners: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
            channel: Mutex::new(None),
            presentation: Mutex::new(None),
            badge: AtomicU32::new(0),
            next_subscription: AtomicU64::new(1),
            permission_requests: AtomicUsize::new(0),
            token_requests: AtomicUsize::new(0),
            subscription_removals: AtomicUsize::new(0),
        }
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn subscription_removals(&self) -> usize {
        self.subscription_removals.load(Ordering::SeqCst)
    }

    pub fn active_listeners(&self, origin: NotificationOrigin) -> usize {
        self.listeners
            .lock()
            .values()
            .filter(|l| l.origin == origin)
            .count()
    }

    pub fn configured_channel(&self) -> Option<AndroidChannel> {
        self.channel.lock().clone()
    }

    pub fn presentation(&self) -> Option<ForegroundPresentation> {
        *self.presentation.lock()
    }

    /// Change the OS-level permission, as if the user used system settings
    pub fn set_permission(&self, permission: PermissionState) {
        *self.permission.lock() = permission;
    }

    /// Simulate a foreground delivery. Returns how many listeners got it.
    pub fn receive(&self, notification: RawNotification) -> usize {
        self.emit(NotificationOrigin::Received, notification)
    }

    /// Simulate the user tapping a notification
    pub fn tap(&self, notification: RawNotification) -> usize {
        self.emit(NotificationOrigin::Tapped, notification)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn delivered(&self) -> Vec<NotificationContent> {
        self.delivered.lock().clone()
    }

    /// Deliver every scheduled notification due at `now`. Returns the count.
    pub fn fire_due(&self, now: DateTime<Utc>) -> usize {
        let due: Vec<NotificationContent> = {
            let mut pending = self.pending.lock();
            let mut due = Vec::new();
            pending.retain_mut(|entry| {
                if entry.fire_at > now {
                    return true;
                }
                debug!("Firing scheduled notification {}", entry.id);
                due.push(entry.content.clone());
                match entry.repeat_every {
                    Some(every) => match advance(entry.fire_at, every, now) {
                        Some(next) => {
                            entry.fire_at = next;
                            true
                        }
                        None => false,
                    },
                    None => false,
                }
            });
            due
        };

        for content in &due {
            self.deliver(content.clone());
        }
        due.len()
    }

    fn deliver(&self, content: NotificationContent) {
        let raw = RawNotification::from_data(
            Some(content.title.clone()),
            Some(content.body.clone()),
            content.data.clone().unwrap_or(Value::Null),
        );
        self.delivered.lock().push(content);
        self.receive(raw);
    }

    fn emit(&self, origin: NotificationOrigin, notification: RawNotification) -> usize {
        self.listeners
            .lock()
            .values()
            .filter(|l| l.origin == origin)
            .filter(|l| l.sender.send(notification.clone()).is_ok())
            .count()
    }

    fn add_listener(&self, origin: NotificationOrigin, sender: NotificationSender) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().insert(id, Listener { origin, sender });
        SubscriptionId(id)
    }
}

const MAX_INTERVAL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn next_fire_time(
    trigger: &ScheduleTrigger,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, Option<Duration>)> {
    match trigger {
        ScheduleTrigger::Interval { seconds, repeats } => {
            if *seconds > MAX_INTERVAL_SECS {
                return Err(PushError::MalformedPayload(format!(
                    "interval of {} seconds exceeds {}",
                    seconds, MAX_INTERVAL_SECS
                )));
            }
            if *repeats && *seconds == 0 {
                return Err(PushError::MalformedPayload(
                    "repeating interval must be at least one second".to_string(),
                ));
            }
            // Bounded by MAX_INTERVAL_SECS above
            let every = Duration::seconds(*seconds as i64);
            Ok((now + every, repeats.then_some(every)))
        }
        ScheduleTrigger::Date { at } => Ok((*at, None)),
        ScheduleTrigger::Daily { hour, minute } => {
            let time = NaiveTime::from_hms_opt(u32::from(*hour), u32::from(*minute), 0)
                .ok_or_else(|| {
                    PushError::MalformedPayload(format!(
                        "daily trigger time {:02}:{:02} is out of range",
                        hour, minute
                    ))
                })?;
            let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));
            let fire_at = if today > now {
                today
            } else {
                today + Duration::days(1)
            };
            Ok((fire_at, Some(Duration::days(1))))
        }
    }
}

/// First occurrence strictly after `now`. `None` past the representable range.
fn advance(fire_at: DateTime<Utc>, every: Duration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let period = every.num_seconds().max(1);
    let periods = (now - fire_at).num_seconds() / period + 1;
    let secs = u64::try_from(period.checked_mul(periods)?).ok()?;
    let step = Duration::from_std(std::time::Duration::from_secs(secs)).ok()?;
    fire_at.checked_add_signed(step)
}

#[async_trait]
impl NotificationRuntime for SimulatedRuntime {
    fn is_physical_device(&self) -> bool {
        self.options.physical_device
    }

    fn platform(&self) -> Platform {
        self.options.platform
    }

    async fn get_permission_status(&self) -> Result<PermissionState> {
        Ok(*self.permission.lock())
    }

    async fn request_permission(&self) -> Result<PermissionState> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let mut permission = self.permission.lock();
        // The OS only shows the prompt once
        if *permission == PermissionState::Undetermined {
            *permission = self.options.prompt_answer;
        }
        Ok(*permission)
    }

    async fn get_push_token(&self, _request: &TokenRequest) -> Result<DeviceToken> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        if !self.options.physical_device {
            return Err(PushError::CapabilityUnavailable(
                UnsupportedReason::NotADevice,
            ));
        }
        match &self.options.token {
            Ok(token) => Ok(DeviceToken::new(token.clone())),
            Err(message) => Err(PushError::AcquisitionFailure(message.clone())),
        }
    }

    async fn configure_channel(&self, channel: &AndroidChannel) -> Result<()> {
        if self.options.platform != Platform::Android {
            return Err(PushError::Runtime(
                "notification channels exist only on Android".to_string(),
            ));
        }
        *self.channel.lock() = Some(channel.clone());
        Ok(())
    }

    async fn set_foreground_presentation(
        &self,
        presentation: &ForegroundPresentation,
    ) -> Result<()> {
        *self.presentation.lock() = Some(*presentation);
        Ok(())
    }

    async fn add_received_listener(&self, sender: NotificationSender) -> Result<SubscriptionId> {
        Ok(self.add_listener(NotificationOrigin::Received, sender))
    }

    async fn add_tapped_listener(&self, sender: NotificationSender) -> Result<SubscriptionId> {
        Ok(self.add_listener(NotificationOrigin::Tapped, sender))
    }

    async fn remove_subscription(&self, id: SubscriptionId) -> Result<()> {
        if self.listeners.lock().remove(&id.0).is_some() {
            self.subscription_removals.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn schedule_local(
        &self,
        content: &NotificationContent,
        trigger: Option<&ScheduleTrigger>,
    ) -> Result<ScheduleId> {
        if matches!(&content.data, Some(data) if !data.is_object()) {
            return Err(PushError::MalformedPayload(
                "notification data must be a JSON object".to_string(),
            ));
        }
        let id = ScheduleId(Uuid::new_v4().to_string());

        match trigger {
            None => self.deliver(content.clone()),
            Some(trigger) => {
                let (fire_at, repeat_every) = next_fire_time(trigger, Utc::now())?;
                self.pending.lock().push(PendingNotification {
                    id: id.clone(),
                    content: content.clone(),
                    fire_at,
                    repeat_every,
                });
            }
        }

        Ok(id)
    }

    async fn cancel_all_scheduled(&self) -> Result<()> {
        self.pending.lock().clear();
        Ok(())
    }

    async fn get_badge_count(&self) -> Result<u32> {
        Ok(self.badge.load(Ordering::SeqCst))
    }

    async fn set_badge_count(&self, count: u32) -> Result<()> {
        self.badge.store(count, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(title: &str) -> NotificationContent {
        NotificationContent {
            title: title.to_string(),
            body: "body".to_string(),
            data: None,
        }
    }

    #[test]
    fn test_daily_trigger_next_occurrence() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        let (fire_at, every) =
            next_fire_time(&ScheduleTrigger::Daily { hour: 9, minute: 30 }, now).unwrap();
        assert_eq!(fire_at, Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
        assert_eq!(every, Some(Duration::days(1)));

        let (fire_at, _) =
            next_fire_time(&ScheduleTrigger::Daily { hour: 18, minute: 0 }, now).unwrap();
        assert_eq!(fire_at, Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_repeating_interval_stays_pending() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default());
        let trigger = ScheduleTrigger::Interval {
            seconds: 60,
            repeats: true,
        };
        runtime
            .schedule_local(&content("repeat"), Some(&trigger))
            .await
            .unwrap();

        assert_eq!(runtime.fire_due(Utc::now() + Duration::seconds(120)), 1);
        assert_eq!(runtime.pending_count(), 1);
        assert_eq!(runtime.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_emulator_issues_no_token() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::emulator());
        let err = runtime
            .get_push_token(&TokenRequest::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PushError::CapabilityUnavailable(UnsupportedReason::NotADevice)
        );
    }

    #[tokio::test]
    async fn test_non_object_data_rejected() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default());
        let mut bad = content("bad");
        bad.data = Some(Value::from("order_update"));

        let err = runtime.schedule_local(&bad, None).await.unwrap_err();
        assert!(matches!(err, PushError::MalformedPayload(_)));
        assert!(runtime.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_channel_rejected_off_android() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default());
        assert!(runtime.configure_channel(&AndroidChannel::default()).await.is_err());

        let runtime =
            SimulatedRuntime::new(SimulatorOptions::default().with_platform(Platform::Android));
        runtime
            .configure_channel(&AndroidChannel::default())
            .await
            .unwrap();
        assert_eq!(runtime.configured_channel(), Some(AndroidChannel::default()));
    }

    #[tokio::test]
    async fn test_fire_due_far_in_the_future() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default());
        let trigger = ScheduleTrigger::Interval {
            seconds: 1,
            repeats: true,
        };
        runtime
            .schedule_local(&content("tick"), Some(&trigger))
            .await
            .unwrap();

        let later = Utc::now() + Duration::days(3650);
        assert_eq!(runtime.fire_due(later), 1);
        assert_eq!(runtime.pending_count(), 1);

        let next = runtime.pending.lock()[0].fire_at;
        assert!(next > later);
        assert!(next <= later + Duration::seconds(1));
    }

    #[test]
    fn test_advance_lands_on_next_period() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let every = Duration::minutes(10);

        let now = start + Duration::minutes(25);
        assert_eq!(advance(start, every, now), Some(start + Duration::minutes(30)));
        assert_eq!(advance(start, every, start), Some(start + every));
    }

    #[tokio::test]
    async fn test_out_of_range_triggers_rejected() {
        let runtime = SimulatedRuntime::new(SimulatorOptions::default());
        let triggers = [
            ScheduleTrigger::Daily { hour: 25, minute: 0 },
            ScheduleTrigger::Daily { hour: 8, minute: 60 },
            ScheduleTrigger::Interval {
                seconds: MAX_INTERVAL_SECS + 1,
                repeats: false,
            },
            ScheduleTrigger::Interval {
                seconds: 0,
                repeats: true,
            },
        ];

        for trigger in triggers {
            let err = runtime
                .schedule_local(&content("bad"), Some(&trigger))
                .await
                .unwrap_err();
            assert!(matches!(err, PushError::MalformedPayload(_)), "{:?}", trigger);
        }
        assert_eq!(runtime.pending_count(), 0);
    }
}
