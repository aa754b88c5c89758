//! Email worker: claims notification jobs from the durable queue and
//! delivers them through the configured email provider.

mod health;

use core_config::{env_or_default, Environment, FromEnv};
use domain_notifications::{
    EmailProvider, NotificationProcessor, SendGridConfig, SendGridProvider, SmtpConfig,
    SmtpProvider, TemplateEngine,
};
use health::{health_router, HealthState};
use job_queue::{Availability, QueueClient, QueueConfig, WorkerPool};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub async fn run() -> eyre::Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let queue_config = QueueConfig::from_env()?;
    let client = Arc::new(QueueClient::new(queue_config.clone()));

    if let Availability::Unavailable { reason } = client.initialize().await {
        eyre::bail!(
            "queue store unavailable: {reason}. The worker needs a reachable Redis \
             (REDIS_HOST / REDIS_PORT / REDIS_PASSWORD)."
        );
    }
    let store = client
        .backend()
        .await
        .ok_or_else(|| eyre::eyre!("queue store went away during startup"))?;

    let templates = TemplateEngine::new()?;

    match env_or_default("EMAIL_PROVIDER", "smtp").as_str() {
        "sendgrid" => {
            let provider = SendGridProvider::new(SendGridConfig::from_env()?);
            serve(client, store, NotificationProcessor::new(provider, templates), queue_config)
                .await
        }
        _ => {
            let provider = SmtpProvider::new(SmtpConfig::from_env()?)?;
            serve(client, store, NotificationProcessor::new(provider, templates), queue_config)
                .await
        }
    }
}

async fn serve<P: EmailProvider + 'static>(
    client: Arc<QueueClient>,
    store: Arc<dyn job_queue::JobStore>,
    processor: NotificationProcessor<P>,
    queue_config: QueueConfig,
) -> eyre::Result<()> {
    let pool = Arc::new(WorkerPool::new(store, processor, queue_config));

    // Event sink: the queue's observability channel, serialized for audit.
    let mut events = pool.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => debug!(target: "queue_events", event = %json),
                Err(e) => error!(error = %e, "Failed to serialize queue event"),
            }
        }
    });

    let http_addr = env_or_default("WORKER_HTTP_ADDR", "0.0.0.0:8080");
    let router = health_router(HealthState {
        client: Arc::clone(&client),
    });
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    info!(addr = %http_addr, "Health endpoints listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "Health server stopped");
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    pool.run(shutdown_rx).await?;
    client.close().await;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received"),
            _ = tokio::signal::ctrl_c() => info!("CTRL+C received"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("CTRL+C received");
    }
}
