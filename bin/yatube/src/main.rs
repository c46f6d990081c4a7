//! # Yatube Binary
//!
//! The entry point that assembles the application from the configured
//! plugins and serves it.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use yt_api::{AppState, RouterOptions};
use yt_config::{LogSettings, Settings};
use yt_core::cache::ResponseCache;

#[cfg(feature = "db-sqlite")]
use yt_db_sqlite::SqliteRepo;

#[cfg(feature = "storage-local")]
use yt_storage_local::LocalMediaStore;

#[cfg(feature = "auth-simple")]
use yt_auth_simple::Argon2AuthProvider;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "auth-simple")))]
compile_error!("yatube needs a database, a media store and an auth provider plugin");

const DEFAULT_LOG_FILTER: &str = "yatube=info,yt_api=info,yt_core=info,tower_http=info";

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);

    // 1. Database
    let repo = Arc::new(
        SqliteRepo::new(&settings.database.url, settings.database.max_connections)
            .await
            .with_context(|| format!("opening database {}", settings.database.url))?,
    );

    // 2. Media storage
    tokio::fs::create_dir_all(&settings.media.root)
        .await
        .with_context(|| format!("creating media root {}", settings.media.root.display()))?;
    let media = Arc::new(LocalMediaStore::new(
        settings.media.root.clone(),
        settings.media.url_prefix.clone(),
    ));

    // 3. Password hashing
    let auth = Arc::new(Argon2AuthProvider::new(
        settings.auth.memory_kib,
        settings.auth.iterations,
        settings.auth.parallelism,
    )?);

    let cache = ResponseCache::new(settings.cache.key_prefix.clone(), settings.cache.ttl());
    if settings.admin.flush_token.is_none() {
        info!("no admin.flush_token configured, cache flush endpoint disabled");
    }
    let state = AppState::new(repo, media, auth, settings.feed, cache)
        .with_admin_token(settings.admin.flush_token.clone());

    if !settings.server.secure_cookies {
        warn!("secure cookies disabled, set YATUBE__SERVER__SECURE_COOKIES=true behind HTTPS");
    }
    let app = yt_api::router(
        state,
        RouterOptions {
            static_dir: settings.server.static_dir.clone(),
            media_root: settings.media.root.clone(),
            media_url_prefix: settings.media.url_prefix.clone(),
            secure_cookies: settings.server.secure_cookies,
        },
    );

    let listener = TcpListener::bind(&settings.server.bind)
        .await
        .with_context(|| format!("binding {}", settings.server.bind))?;
    info!("Yatube listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
