use axum::{extract::State, Json};

use crate::dto::{ChartData, Stats};
use crate::error::AppResult;
use crate::services::stats;
use crate::AppState;

pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<Stats>> {
    let stats = stats::compute_stats(&state.db, &state.streak_engine()).await?;
    Ok(Json(stats))
}

pub async fn completion_rates_chart(State(state): State<AppState>) -> AppResult<Json<ChartData>> {
    let chart = stats::completion_rate_chart(&state.db, &state.streak_engine()).await?;
    Ok(Json(chart))
}

pub async fn streaks_chart(State(state): State<AppState>) -> AppResult<Json<ChartData>> {
    let chart = stats::streak_chart(&state.db, &state.streak_engine()).await?;
    Ok(Json(chart))
}

pub async fn daily_completions_chart(State(state): State<AppState>) -> AppResult<Json<ChartData>> {
    let chart = stats::daily_completions_chart(&state.db, state.clock.today()).await?;
    Ok(Json(chart))
}
