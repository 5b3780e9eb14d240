use axum::{extract::State, http::StatusCode, Json};

use crate::dto::{HealthResponse, ReadyzChecks, ReadyzResponse};
use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        time: state.clock.now().to_rfc3339(),
        service: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<ReadyzResponse>) {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let status = if db_ok {
        StatusCode::OK
    } else {
        tracing::warn!("Readiness check failed: database unreachable");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyzResponse {
            status: if db_ok { "ready" } else { "not_ready" }.into(),
            checks: ReadyzChecks { database: db_ok },
        }),
    )
}
