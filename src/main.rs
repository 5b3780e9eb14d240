use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

mod clock;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod routes;
mod services;

use clock::{Clock, SystemClock};
use config::Config;
use dto::ChangeEvent;
use services::locks::HabitLocks;
use services::streak::StreakEngine;

/// Capacity of the change-feed channel before slow subscribers lag.
const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub locks: HabitLocks,
    pub ws_tx: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Arc<Config>, clock: Arc<dyn Clock>) -> Self {
        let (ws_tx, _) = broadcast::channel::<String>(CHANGE_FEED_CAPACITY);
        Self {
            db,
            config,
            clock,
            locks: HabitLocks::new(),
            ws_tx,
        }
    }

    /// Engine pinned to the current day, shared by every habit in a request.
    pub fn streak_engine(&self) -> StreakEngine {
        StreakEngine::new(self.clock.today(), self.config.completion_window)
    }

    pub fn broadcast(&self, event: ChangeEvent) {
        match serde_json::to_string(&event) {
            // No subscribers is not an error.
            Ok(msg) => {
                let _ = self.ws_tx.send(msg);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode change event"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habit_streaks_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    // Database
    let db = db::create_pool(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    db::MIGRATOR
        .run(&db)
        .await
        .context("failed to run database migrations")?;

    tracing::info!("Database migrations applied");

    let state = AppState::new(db, config.clone(), Arc::new(SystemClock));
    let app = routes::build_router(state)?;

    let addr = config.listen_addr();
    tracing::info!(
        completion_window = config.completion_window,
        "Starting server on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
