//! Listener registry
//!
//! Holds at most one received and one tapped subscription. Each subscription
//! is an unbounded channel: the sender goes to the OS runtime, the receiver
//! is drained by a forwarding task that classifies, routes and hands the
//! result to the application's `NotificationHandler`.
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{NotificationEnvelope, NotificationOrigin, RawNotification, SubscriptionId};
use crate::router::{route, RouteAction};
use crate::runtime::NotificationRuntime;

/// A routed notification, ready for the application to act on
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub origin: NotificationOrigin,
    pub envelope: NotificationEnvelope,
    pub action: RouteAction,
}

/// Application-side reaction to routed notifications (navigation, UI refresh)
pub trait NotificationHandler: Send + Sync {
    fn handle(&self, dispatch: Dispatch);
}

impl NotificationHandler for mpsc::UnboundedSender<Dispatch> {
    fn handle(&self, dispatch: Dispatch) {
        // Receiver gone means the app stopped listening
        let _ = self.send(dispatch);
    }
}

/// Handler that only logs, for apps without UI bindings yet
pub struct LoggingHandler;

impl NotificationHandler for LoggingHandler {
    fn handle(&self, dispatch: Dispatch) {
        info!(
            "Notification {} -> {:?}",
            dispatch.origin.as_str(),
            dispatch.action
        );
    }
}

struct ListenerHandle {
    subscription: SubscriptionId,
    task: JoinHandle<()>,
}

#[derive(Default)]
pub struct ListenerRegistry {
    received: Option<ListenerHandle>,
    tapped: Option<ListenerHandle>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self, origin: NotificationOrigin) -> bool {
        self.slot(origin).is_some()
    }

    pub fn installed_count(&self) -> usize {
        usize::from(self.received.is_some()) + usize::from(self.tapped.is_some())
    }

    /// Install both listeners, replacing any existing handle of the same kind.
    ///
    /// Must run inside a tokio runtime.
    pub async fn install(
        &mut self,
        runtime: &dyn NotificationRuntime,
        handler: Arc<dyn NotificationHandler>,
    ) -> Result<()> {
        for origin in [NotificationOrigin::Received, NotificationOrigin::Tapped] {
            self.teardown(runtime, origin).await;

            let (tx, rx) = mpsc::unbounded_channel();
            let subscription = match origin {
                NotificationOrigin::Received => runtime.add_received_listener(tx).await?,
                NotificationOrigin::Tapped => runtime.add_tapped_listener(tx).await?,
            };
            let task = tokio::spawn(forward(origin, rx, handler.clone()));

            debug!(
                "Installed {} listener (subscription {})",
                origin.as_str(),
                subscription.0
            );
            *self.slot_mut(origin) = Some(ListenerHandle { subscription, task });
        }

        Ok(())
    }

    /// Remove both listeners. No-op when nothing is installed.
    pub async fn remove(&mut self, runtime: &dyn NotificationRuntime) {
        self.teardown(runtime, NotificationOrigin::Received).await;
        self.teardown(runtime, NotificationOrigin::Tapped).await;
    }

    async fn teardown(&mut self, runtime: &dyn NotificationRuntime, origin: NotificationOrigin) {
        let Some(handle) = self.slot_mut(origin).take() else {
            return;
        };

        if let Err(e) = runtime.remove_subscription(handle.subscription).await {
            warn!(
                "Failed to remove {} listener (subscription {}): {}",
                origin.as_str(),
                handle.subscription.0,
                e
            );
        }
        handle.task.abort();
        debug!("Removed {} listener", origin.as_str());
    }

    fn slot(&self, origin: NotificationOrigin) -> &Option<ListenerHandle> {
        match origin {
            NotificationOrigin::Received => &self.received,
            NotificationOrigin::Tapped => &self.tapped,
        }
    }

    fn slot_mut(&mut self, origin: NotificationOrigin) -> &mut Option<ListenerHandle> {
        match origin {
            NotificationOrigin::Received => &mut self.received,
            NotificationOrigin::Tapped => &mut self.tapped,
        }
    }
}

async fn forward(
    origin: NotificationOrigin,
    mut rx: mpsc::UnboundedReceiver<RawNotification>,
    handler: Arc<dyn NotificationHandler>,
) {
    while let Some(raw) = rx.recv().await {
        let envelope = NotificationEnvelope::from(raw);
        let action = route(&envelope, origin);
        handler.handle(Dispatch {
            origin,
            envelope,
            action,
        });
    }
    debug!("{} listener channel closed", origin.as_str());
}
