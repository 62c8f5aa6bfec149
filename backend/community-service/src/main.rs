use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use community_service::catalog;
use community_service::handlers::{self, AppState};
use community_service::identity::{IdentityResolver, JwtIdentityProvider};
use community_service::store::{checkpoint, open_store, ContentStore, SnapshotWriter};
use community_service::Config;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn run_healthcheck(port: u16) -> anyhow::Result<()> {
    let url = format!("http://127.0.0.1:{}/api/v1/health", port);
    let resp = reqwest::Client::new().get(&url).send().await?;
    if resp.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("healthcheck HTTP status: {}", resp.status())
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Community Service
///
/// Serves community tips, warnings and photos for Transit Guide cities.
///
/// # Routes
///
/// - `/api/v1/cities/{city_id}/content` - submit and list contributions
/// - `/api/v1/content/{id}` - read, upvote and delete a contribution
/// - `/api/v1/admin/*` - verification and the moderation queue
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Container healthchecks: `community-service healthcheck`
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        return run_healthcheck(config.app.port).await;
    }

    init_tracing(config.app.json_logs);

    tracing::info!("Starting community-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!(
        policy = %config.upvotes.mode,
        allow_anonymous = config.upvotes.allow_anonymous,
        "Upvote policy"
    );
    tracing::info!(
        creates_per_minute = config.rate_limits.creates_per_minute,
        upvotes_per_minute = config.rate_limits.upvotes_per_minute,
        "Rate limits"
    );

    let dependency_timeout = Duration::from_millis(config.catalog.dependency_timeout_ms);
    let city_catalog = catalog::from_config(&config.catalog)?;

    let store = match &config.persistence.snapshot_path {
        Some(path) => {
            let store = open_store(path)?;
            // Fold whatever was replayed into a fresh snapshot before serving.
            checkpoint(&store, path).await?;
            store
        }
        None => {
            tracing::warn!("CONTENT_SNAPSHOT_PATH not set; content is kept in memory only");
            ContentStore::new()
        }
    };
    let store = Arc::new(store);

    let state = web::Data::new(AppState::new(
        store.clone(),
        city_catalog,
        dependency_timeout,
        config.upvotes,
    )
    .with_rate_limits(&config.rate_limits));
    let identity = web::Data::new(IdentityResolver::new(
        Arc::new(JwtIdentityProvider::new(&config.auth.jwt_secret)),
        dependency_timeout,
    ));

    let http_bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", http_bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(identity.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(community_service::metrics::serve_metrics),
            )
            .configure(handlers::configure)
    })
    .bind(&http_bind_address)?
    .workers(4)
    .run();

    let server_handle = server.handle();
    let (shutdown_tx, _) = broadcast::channel(1);

    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    if let Some(path) = config.persistence.snapshot_path.clone() {
        let writer = SnapshotWriter::new(
            store.clone(),
            path,
            Duration::from_secs(config.persistence.snapshot_interval_secs.max(1)),
        );
        let snapshot_shutdown = shutdown_tx.subscribe();
        tasks.spawn(async move {
            writer
                .run(snapshot_shutdown)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
        });
    }

    let mut first_error: Option<io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => {
                        tracing::info!("Background task completed");
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        first_error.get_or_insert(e);
                        let _ = shutdown_tx.send(());
                        server_handle.stop(true).await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        let e = io::Error::new(io::ErrorKind::Other, e.to_string());
                        first_error.get_or_insert(e);
                        let _ = shutdown_tx.send(());
                        server_handle.stop(true).await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(());
                server_handle.stop(true).await;
                break;
            }
        }
    }

    // Let the snapshot writer finish its final flush.
    while let Some(result) = tasks.join_next().await {
        if let Ok(Err(e)) = result {
            tracing::error!("Task failed during shutdown: {}", e);
        }
    }

    tracing::info!("Community-service shutting down");

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
