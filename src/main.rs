mod broadcast;
mod config;
mod crud;
mod error;
mod handler;
mod model;
mod route;
mod schema;

use anyhow::Context;
use broadcast::{MatchBroadcaster, MatchEvent, MatchFeed};
use config::Config;
use crud::MatchStore;
use route::create_router;
use sqlx::postgres;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::sync::Arc;

pub struct AppState {
    db: Arc<dyn MatchStore>,
    broadcaster: Option<Arc<dyn MatchBroadcaster>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // set up connection pool
    let pool = postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await
        .context("can't connect to database")?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("can't run migrations")?;

    let feed = MatchFeed::new(config.feed_capacity);
    spawn_feed_logger(&feed);

    let app = create_router(Arc::new(AppState {
        db: Arc::new(pool),
        broadcaster: Some(Arc::new(feed)),
    }));

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

fn spawn_feed_logger(feed: &MatchFeed) {
    let mut rx = feed.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(MatchEvent::MatchCreated(m)) => {
                    tracing::info!(match_id = %m.id, status = ?m.status, "match created");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("match feed logger skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
