use anyhow::Context;
use nova_push_client::{
    Dispatch, FileStore, HttpTokenRegistry, KeyValueStore, MemoryStore, NotificationHandler,
    PushClient, PushClientConfig, RawNotification, ScheduleTrigger, SimulatedRuntime,
    SimulatorOptions,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Drive the push client against the simulated runtime: initialize,
/// register, schedule, badge, a tapped notification, then cleanup.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PushClientConfig::from_env().context("invalid push client configuration")?;

    let storage: Arc<dyn KeyValueStore> = match &config.store_path {
        Some(path) => {
            let store = FileStore::new(path);
            tracing::info!("Persisting push token to {}", store.path().display());
            Arc::new(store)
        }
        None => Arc::new(MemoryStore::new()),
    };
    let registry = Arc::new(HttpTokenRegistry::new(&config.registry)?);
    let runtime = Arc::new(SimulatedRuntime::new(SimulatorOptions::default()));

    let (tx, mut rx) = mpsc::unbounded_channel::<Dispatch>();
    let handler: Arc<dyn NotificationHandler> = Arc::new(tx);

    let client = PushClient::new(config, runtime.clone(), storage, registry, handler);
    tracing::info!(
        "Token registry at {} (storage key {})",
        client.config().registry.base_url,
        client.config().token_storage_key
    );

    if let Some(previous) = client.get_stored_push_token().await {
        tracing::info!("Token from previous session: {}", previous.prefix());
    }

    let Some(token) = client.initialize().await else {
        tracing::warn!("Push unavailable: {:?}", client.state());
        return Ok(());
    };
    tracing::info!("Initialized with token {}", token.prefix());

    if let Ok(user_id) = std::env::var("PUSH_USER_ID") {
        let outcome = client.register_push_token(&user_id).await;
        tracing::info!("Registration outcome: {:?}", outcome);
    }

    client
        .schedule_notification("Welcome", "Thanks for shopping with us", None, None)
        .await;
    client
        .schedule_notification(
            "Still there?",
            "Your cart is waiting",
            None,
            Some(ScheduleTrigger::Interval {
                seconds: 3600,
                repeats: false,
            }),
        )
        .await;
    client.cancel_all_notifications().await;

    client.set_badge_count(3).await;
    tracing::info!("Badge count: {}", client.get_badge_count().await);
    client.clear_badge().await;

    runtime.tap(RawNotification::from_data(
        Some("Your order shipped".to_string()),
        None,
        serde_json::json!({"type": "order_update", "orderId": "demo-1"}),
    ));

    for _ in 0..2 {
        match rx.recv().await {
            Some(dispatch) => tracing::info!(
                "{} notification -> {:?}",
                dispatch.origin.as_str(),
                dispatch.action
            ),
            None => break,
        }
    }

    client.cleanup().await;
    Ok(())
}
