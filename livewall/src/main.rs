use std::sync::Arc;

use livewall::config::AppConfig;
use livewall::events::AppEvent;
use livewall::notification::NotificationChannel;
use livewall::notification::channels::{
    DesktopChannel, NotifySendBackend, SoundChannel, ToastChannel, WebhookChannel, WebhookConfig,
};
use livewall::persistence::JsonFileStore;
use livewall::{Engine, EngineOptions, logging};
use platforms_status::ProviderRegistry;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let (log_config, _guard) = logging::init_logging(&config.log_dir)?;
    let cancel = CancellationToken::new();
    log_config.start_retention_cleanup(cancel.clone());

    let client = platforms_status::client::default_client()?;
    let registry = Arc::new(ProviderRegistry::with_defaults(
        client,
        config.credentials.clone(),
    ));

    let mut channels: Vec<Arc<dyn NotificationChannel>> = vec![
        Arc::new(ToastChannel::new()),
        Arc::new(DesktopChannel::new(Arc::new(NotifySendBackend::new()))),
    ];
    if let Some(sound) = config
        .sound_command
        .as_deref()
        .and_then(SoundChannel::from_command)
    {
        channels.push(Arc::new(sound));
    }
    if let Some(url) = &config.webhook_url {
        channels.push(Arc::new(WebhookChannel::new(WebhookConfig::for_url(url))?));
    }

    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    let engine = Engine::load(
        registry,
        store,
        channels,
        EngineOptions {
            settle_delay: config.settle_delay,
        },
    )
    .await?;

    spawn_event_logger(engine.subscribe(), cancel.clone());
    engine.start();
    info!(
        entities = engine.snapshot().len(),
        data_dir = %config.data_dir.display(),
        "livewall started"
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    cancel.cancel();
    engine.shutdown().await?;
    Ok(())
}

fn spawn_event_logger(
    mut events: tokio::sync::broadcast::Receiver<AppEvent>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(AppEvent::ViewersClosed { closed }) => {
                    info!("Closed {} viewer(s) to fit the new limit", closed.len())
                }
                Ok(event @ AppEvent::TickCompleted(_)) => info!("{}", event.description()),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("event logger lagged by {}", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
