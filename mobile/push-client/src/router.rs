//! Notification router
//!
//! Maps a classified notification to the reaction the app should take.
//! Payloads come from the backend and are not trusted: a missing field
//! degrades to a logged no-op.
use tracing::{debug, warn};

use crate::models::{NotificationEnvelope, NotificationEvent, NotificationKind, NotificationOrigin};

/// Screen the app should open for a tapped notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    LiveStream { stream_id: String },
    OrderDetail { order_id: String },
    Promotion { promotion_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    Navigate(Destination),
    /// Known kind with no navigation; kept for UI binding
    Record { kind: NotificationKind },
    /// Known kind whose identifier field was missing
    Unresolvable {
        kind: NotificationKind,
        missing_field: &'static str,
    },
    /// Kind missing or not in the known set
    Unknown { kind: Option<String> },
}

impl RouteAction {
    pub fn destination(&self) -> Option<&Destination> {
        match self {
            RouteAction::Navigate(destination) => Some(destination),
            _ => None,
        }
    }
}

/// Classify a notification. Foreground deliveries never navigate.
pub fn route(envelope: &NotificationEnvelope, origin: NotificationOrigin) -> RouteAction {
    let action = match (&envelope.event, origin) {
        (NotificationEvent::Unknown { kind }, _) => {
            warn!(
                "Unknown notification kind {:?} ({}), ignoring",
                kind,
                origin.as_str()
            );
            return RouteAction::Unknown { kind: kind.clone() };
        }
        (event, NotificationOrigin::Received) => event
            .kind()
            .map_or(RouteAction::Unknown { kind: None }, |kind| RouteAction::Record { kind }),
        (NotificationEvent::StreamStarted { stream_id }, NotificationOrigin::Tapped) => {
            navigate(NotificationKind::StreamStarted, "streamId", stream_id, |id| {
                Destination::LiveStream { stream_id: id }
            })
        }
        (NotificationEvent::OrderUpdate { order_id }, NotificationOrigin::Tapped) => {
            navigate(NotificationKind::OrderUpdate, "orderId", order_id, |id| {
                Destination::OrderDetail { order_id: id }
            })
        }
        (NotificationEvent::Promotion { promotion_id }, NotificationOrigin::Tapped) => {
            navigate(NotificationKind::Promotion, "promotionId", promotion_id, |id| {
                Destination::Promotion { promotion_id: id }
            })
        }
        (NotificationEvent::StreamEnded { .. }, NotificationOrigin::Tapped) => RouteAction::Record {
            kind: NotificationKind::StreamEnded,
        },
        (NotificationEvent::BidUpdate { .. }, NotificationOrigin::Tapped) => RouteAction::Record {
            kind: NotificationKind::BidUpdate,
        },
        (NotificationEvent::Message { .. }, NotificationOrigin::Tapped) => RouteAction::Record {
            kind: NotificationKind::Message,
        },
    };

    debug!("Routed {} notification: {:?}", origin.as_str(), action);
    action
}

fn navigate(
    kind: NotificationKind,
    field: &'static str,
    id: &Option<String>,
    to_destination: impl FnOnce(String) -> Destination,
) -> RouteAction {
    match id {
        Some(id) => RouteAction::Navigate(to_destination(id.clone())),
        None => {
            warn!(
                "Cannot resolve {} notification: payload missing {}",
                kind.as_str(),
                field
            );
            RouteAction::Unresolvable {
                kind,
                missing_field: field,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawNotification;
    use serde_json::{json, Value};

    fn envelope(data: Value) -> NotificationEnvelope {
        NotificationEnvelope::from(RawNotification::from_data(
            Some("title".to_string()),
            Some("body".to_string()),
            data,
        ))
    }

    #[test]
    fn test_order_update_navigates() {
        let action = route(
            &envelope(json!({"type": "order_update", "orderId": "X"})),
            NotificationOrigin::Tapped,
        );
        assert_eq!(
            action,
            RouteAction::Navigate(Destination::OrderDetail {
                order_id: "X".to_string()
            })
        );
    }

    #[test]
    fn test_order_update_missing_id() {
        let action = route(&envelope(json!({"type": "order_update"})), NotificationOrigin::Tapped);
        assert_eq!(
            action,
            RouteAction::Unresolvable {
                kind: NotificationKind::OrderUpdate,
                missing_field: "orderId"
            }
        );
        assert!(action.destination().is_none());
    }

    #[test]
    fn test_unknown_kind() {
        let action = route(&envelope(json!({"type": "unknown_kind"})), NotificationOrigin::Tapped);
        assert_eq!(
            action,
            RouteAction::Unknown {
                kind: Some("unknown_kind".to_string())
            }
        );

        let action = route(&envelope(json!({})), NotificationOrigin::Received);
        assert_eq!(action, RouteAction::Unknown { kind: None });
    }

    #[test]
    fn test_stream_and_promotion_destinations() {
        let action = route(
            &envelope(json!({"type": "stream_started", "streamId": "live-9"})),
            NotificationOrigin::Tapped,
        );
        assert_eq!(
            action.destination(),
            Some(&Destination::LiveStream {
                stream_id: "live-9".to_string()
            })
        );

        let action = route(
            &envelope(json!({"type": "promotion", "promotionId": 77})),
            NotificationOrigin::Tapped,
        );
        assert_eq!(
            action.destination(),
            Some(&Destination::Promotion {
                promotion_id: "77".to_string()
            })
        );

        let action = route(&envelope(json!({"type": "promotion"})), NotificationOrigin::Tapped);
        assert!(matches!(action, RouteAction::Unresolvable { missing_field: "promotionId", .. }));
    }

    #[test]
    fn test_record_only_kinds() {
        for (kind, expected) in [
            ("stream_ended", NotificationKind::StreamEnded),
            ("bid_update", NotificationKind::BidUpdate),
            ("message", NotificationKind::Message),
        ] {
            let action = route(
                &envelope(json!({"type": kind, "streamId": "s"})),
                NotificationOrigin::Tapped,
            );
            assert_eq!(action, RouteAction::Record { kind: expected });
        }
    }

    #[test]
    fn test_received_never_navigates() {
        let action = route(
            &envelope(json!({"type": "order_update", "orderId": "X"})),
            NotificationOrigin::Received,
        );
        assert_eq!(
            action,
            RouteAction::Record {
                kind: NotificationKind::OrderUpdate
            }
        );
    }

    #[test]
    fn test_hostile_payloads_do_not_panic() {
        let payloads = [
            json!(null),
            json!(42),
            json!({"type": 5}),
            json!({"type": "order_update", "orderId": {"a": [1, 2]}}),
            json!({"type": "stream_started", "streamId": false}),
        ];
        for payload in payloads {
            for origin in [NotificationOrigin::Received, NotificationOrigin::Tapped] {
                let action = route(&envelope(payload.clone()), origin);
                assert!(action.destination().is_none());
            }
        }
    }
}
