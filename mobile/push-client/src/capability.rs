//! Capability gate
//!
//! Decides whether push can be used at all on this device. At most one
//! permission prompt is issued per check, and only from `Undetermined`.
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::models::PermissionState;
use crate::runtime::NotificationRuntime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnsupportedReason {
    /// Simulator or emulator
    NotADevice,
    PermissionDenied,
    /// The OS failed to answer a permission query or request
    PermissionCheckFailed(String),
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedReason::NotADevice => write!(f, "not-a-device"),
            UnsupportedReason::PermissionDenied => write!(f, "permission-denied"),
            UnsupportedReason::PermissionCheckFailed(msg) => {
                write!(f, "permission-check-failed: {}", msg)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityResult {
    Unsupported(UnsupportedReason),
    NeedsRequest,
    Ready,
}

impl CapabilityResult {
    pub fn is_ready(&self) -> bool {
        matches!(self, CapabilityResult::Ready)
    }
}

/// Classify device and permission state without side effects
pub fn evaluate(is_physical_device: bool, status: PermissionState) -> CapabilityResult {
    if !is_physical_device {
        return CapabilityResult::Unsupported(UnsupportedReason::NotADevice);
    }

    match status {
        PermissionState::Granted => CapabilityResult::Ready,
        PermissionState::Undetermined => CapabilityResult::NeedsRequest,
        PermissionState::Denied => CapabilityResult::Unsupported(UnsupportedReason::PermissionDenied),
    }
}

/// Run the gate against the runtime, prompting at most once.
///
/// The prompt is resolved here, so the result is only ever `Ready` or
/// `Unsupported`, never `NeedsRequest`. Runtime errors map to
/// `PermissionCheckFailed`.
pub async fn check_capability(runtime: &dyn NotificationRuntime) -> CapabilityResult {
    if !runtime.is_physical_device() {
        info!("Push notifications require a physical device, skipping permission check");
        return CapabilityResult::Unsupported(UnsupportedReason::NotADevice);
    }

    let status = match runtime.get_permission_status().await {
        Ok(status) => status,
        Err(e) => {
            warn!("Failed to query notification permission: {}", e);
            return CapabilityResult::Unsupported(UnsupportedReason::PermissionCheckFailed(
                e.to_string(),
            ));
        }
    };

    match evaluate(true, status) {
        CapabilityResult::NeedsRequest => {
            debug!("Notification permission undetermined, requesting");
            let final_status = match runtime.request_permission().await {
                Ok(status) => status,
                Err(e) => {
                    warn!("Notification permission request failed: {}", e);
                    return CapabilityResult::Unsupported(
                        UnsupportedReason::PermissionCheckFailed(e.to_string()),
                    );
                }
            };

            if final_status == PermissionState::Granted {
                info!("Notification permission granted");
                CapabilityResult::Ready
            } else {
                warn!("Notification permission not granted ({:?})", final_status);
                CapabilityResult::Unsupported(UnsupportedReason::PermissionDenied)
            }
        }
        CapabilityResult::Unsupported(reason) => {
            warn!("Notification permission previously denied");
            CapabilityResult::Unsupported(reason)
        }
        CapabilityResult::Ready => CapabilityResult::Ready,
    }
}
