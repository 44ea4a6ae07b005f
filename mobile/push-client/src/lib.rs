/// Nova Push Client
///
/// Client-side push notification lifecycle for the Nova mobile apps.
///
/// It handles:
/// - Capability checks (physical device, notification permission)
/// - Device token acquisition, persistence and backend registration
/// - Exactly-once received/tapped listener installation
/// - Routing notifications by kind to app reactions
/// - Local scheduling and badge count pass-throughs
///
/// The OS layer, storage and backend are traits so the same state machine
/// runs against a native SDK binding or `SimulatedRuntime`.
pub mod capability;
pub mod client;
pub mod config;
pub mod error;
pub mod listeners;
pub mod models;
pub mod registry;
pub mod router;
pub mod runtime;
pub mod schedule;
pub mod sim;
pub mod storage;
pub mod token;

pub use capability::{CapabilityResult, UnsupportedReason};
pub use client::{LifecycleState, PushClient};
pub use config::{AndroidChannel, ForegroundPresentation, PushClientConfig, RegistryConfig};
pub use error::{PushError, Result};
pub use listeners::{Dispatch, ListenerRegistry, LoggingHandler, NotificationHandler};
pub use models::{
    DeviceToken, NotificationEnvelope, NotificationEvent, NotificationKind, NotificationOrigin,
    PermissionState, Platform, RawNotification, ScheduleId, ScheduleTrigger,
};
pub use registry::{HttpTokenRegistry, TokenRegistration, TokenRegistry};
pub use router::{route, Destination, RouteAction};
pub use runtime::{NotificationRuntime, NotificationSender};
pub use sim::{SimulatedRuntime, SimulatorOptions};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use token::{RegistrationOutcome, TokenManager};
