//! Cinema Email Worker
//!
//! Two consumer loops over Redis Streams, supervised together.
//!
//! ## Architecture
//!
//! ```text
//! Redis Stream (order_created)                 Redis Streams (*_delivery_request)
//!   ↓ (Consumer Group: email_service_orders)     ↓ (Consumer Group: email_service_tokens)
//! StreamWorker<_, OrderCreatedProcessor>       StreamWorker<_, TokenDeliveryProcessor>
//!   ↓                                             ↓
//!   └──────────────► MailService ◄───────────────┘
//!                       ↓
//!        ScreeningAggregator (cinema + movies gRPC)
//!                       ↓
//!                      SMTP
//! ```
//!
//! A message is acknowledged only once it is handled, malformed or expired.
//! Failed messages stay pending and are reclaimed by the group.

mod settings;

pub use settings::WorkerSettings;

use core_config::redis::RedisConfig;
use core_config::{Environment, FromEnv};
use domain_notifications::{
    EmailProvider, GrpcScreeningUpstream, MailService, MailSettings, OrderCreatedProcessor, OrderEventsStream,
    QrCodeGenerator, ScreeningAggregator, SmtpConfig, SmtpProvider, TemplateEngine, TokenDeliveryProcessor,
    TokenDeliveryStream, TzfTimezoneLookup, UpstreamConfig,
};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use stream_worker::{
    HealthState, PipelineSupervisor, RedisStreamConsumer, StreamDef, StreamWorker, health_router, metrics,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Serve `/health`, `/ready`, `/stream/info` and `/metrics`.
async fn start_health_server(health_state: HealthState, port: u16) -> Result<()> {
    let app = health_router(health_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health server listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the email worker until SIGINT, SIGTERM or SIGHUP.
///
/// # Errors
///
/// Returns an error if configuration is invalid or Redis, SMTP or the
/// template engine cannot be set up. Failures of individual messages never
/// end the process.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    metrics::init_metrics().wrap_err("Failed to install Prometheus recorder")?;

    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    info!(name = %name, version = %version, environment = ?environment, "Starting email worker");

    let settings = WorkerSettings::from_env().wrap_err("Failed to load worker settings")?;
    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    let mail_settings = MailSettings::from_env().wrap_err("Failed to load mail settings")?;
    let smtp_config = SmtpConfig::from_env().wrap_err("Failed to load SMTP configuration")?;
    let cinema_config =
        UpstreamConfig::cinema_service_from_env().wrap_err("Failed to load cinema service configuration")?;
    let movies_config =
        UpstreamConfig::movies_service_from_env().wrap_err("Failed to load movies service configuration")?;

    // Each loop blocks on its own connection; health probes get a separate one.
    let client = redis::Client::open(redis_config.connection_url()).wrap_err("Invalid Redis URL")?;
    let health_redis = client
        .get_connection_manager()
        .await
        .wrap_err("Failed to connect to Redis")?;
    let orders_source = RedisStreamConsumer::connect(client.clone(), settings.orders_worker_config())
        .await
        .wrap_err("Failed to connect order events consumer")?;
    let tokens_source = RedisStreamConsumer::connect(client, settings.tokens_worker_config())
        .await
        .wrap_err("Failed to connect token delivery consumer")?;
    info!("Connected to Redis");

    let upstream = GrpcScreeningUpstream::connect(&cinema_config, &movies_config)
        .wrap_err("Failed to set up screening upstream channels")?;
    let screenings = ScreeningAggregator::new(Arc::new(upstream), TzfTimezoneLookup::new());

    let provider = SmtpProvider::new(smtp_config).wrap_err("Failed to create SMTP provider")?;
    match provider.health_check().await {
        Ok(true) => info!(provider = provider.name(), "Email provider reachable"),
        Ok(false) | Err(_) => warn!(
            provider = provider.name(),
            "Email provider not reachable yet, failed sends stay pending for redelivery"
        ),
    }

    let templates = TemplateEngine::new().wrap_err("Failed to register mail templates")?;
    let mail = Arc::new(MailService::new(
        Arc::new(provider),
        Arc::new(templates),
        Arc::new(QrCodeGenerator::default()),
        Arc::new(screenings),
        mail_settings,
    ));

    let health_state = HealthState::new(health_redis, name, version)
        .watch(OrderEventsStream::streams().iter().copied(), settings.orders_group.clone())
        .watch(TokenDeliveryStream::streams().iter().copied(), settings.tokens_group.clone());
    let health_port = settings.health_port;
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_port).await {
            error!(error = %e, "Health server failed");
        }
    });

    let orders_pause = orders_source.config().error_pause();
    let tokens_pause = tokens_source.config().error_pause();

    let mut supervisor = PipelineSupervisor::new(settings.drain_timeout);
    supervisor.spawn(
        StreamWorker::new(orders_source, OrderCreatedProcessor::new(mail.clone())).with_error_pause(orders_pause),
    );
    supervisor.spawn(StreamWorker::new(tokens_source, TokenDeliveryProcessor::new(mail)).with_error_pause(tokens_pause));

    let report = supervisor.run_until(shutdown_signal()).await;
    if report.is_clean() {
        info!(completed = ?report.completed, "Email worker stopped");
    } else {
        warn!(
            completed = ?report.completed,
            failed = ?report.failed,
            aborted = ?report.aborted,
            "Email worker stopped uncleanly"
        );
    }

    Ok(())
}

/// Wait for SIGINT, SIGTERM or SIGHUP.
///
/// If a handler cannot be installed the corresponding signal is never awaited.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let unix_signal = |kind: signal::unix::SignalKind| async move {
        match signal::unix::signal(kind) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = unix_signal(signal::unix::SignalKind::terminate());
    #[cfg(unix)]
    let hangup = unix_signal(signal::unix::SignalKind::hangup());

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    #[cfg(not(unix))]
    let hangup = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
        _ = hangup => {
            info!("Received SIGHUP, initiating shutdown...");
        },
    }
}
