use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::AppState;

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config)?;

    let api_routes = Router::new()
        // Habits
        .route(
            "/habits",
            get(handlers::habits::list_habits).post(handlers::habits::create_habit),
        )
        .route(
            "/habits/:id",
            get(handlers::habits::get_habit)
                .put(handlers::habits::update_habit)
                .delete(handlers::habits::delete_habit),
        )
        // Completions
        .route(
            "/habits/:id/complete",
            post(handlers::completions::complete_habit)
                .delete(handlers::completions::uncomplete_habit),
        )
        .route(
            "/habits/:id/completions",
            get(handlers::habits::list_completions),
        )
        // Stats & charts
        .route("/stats", get(handlers::stats::get_stats))
        .route(
            "/charts/completion-rates",
            get(handlers::stats::completion_rates_chart),
        )
        .route("/charts/streaks", get(handlers::stats::streaks_chart))
        .route(
            "/charts/daily-completions",
            get(handlers::stats::daily_completions_chart),
        );

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if config.allows_any_origin() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = config
        .frontend_url
        .split(',')
        .map(|o| {
            o.trim()
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid FRONTEND_URL origin {:?}", o))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(cors.allow_origin(origins).allow_credentials(true))
}
