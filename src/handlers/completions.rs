use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::dto::{ChangeAction, ChangeEvent, CompletionAck};
use crate::error::{AppError, AppResult};
use crate::models::completion::CompletionDateQuery;
use crate::services::ledger;
use crate::AppState;

/// POST /api/habits/{id}/complete: idempotent per day
pub async fn complete_habit(
    State(state): State<AppState>,
    WithRejection(Path(habit_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<CompletionDateQuery>, AppError>,
) -> AppResult<Json<CompletionAck>> {
    let result = {
        let _guard = state.locks.acquire(habit_id).await;
        ledger::complete(&state.db, state.clock.as_ref(), habit_id, query.date).await
    };
    state.locks.release(habit_id).await;
    let (completion, created) = result?;

    if created {
        tracing::info!(habit_id, date = %completion.completed_at, "Habit completed");
        state.broadcast(ChangeEvent::habit_changed(habit_id, ChangeAction::Completed));
    } else {
        tracing::debug!(habit_id, date = %completion.completed_at, "Habit already completed");
    }

    Ok(Json(CompletionAck::completed(habit_id)))
}

/// DELETE /api/habits/{id}/complete: no-op when nothing was recorded
pub async fn uncomplete_habit(
    State(state): State<AppState>,
    WithRejection(Path(habit_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<CompletionDateQuery>, AppError>,
) -> AppResult<Json<CompletionAck>> {
    let result = {
        let _guard = state.locks.acquire(habit_id).await;
        ledger::uncomplete(&state.db, state.clock.as_ref(), habit_id, query.date).await
    };
    state.locks.release(habit_id).await;
    let removed = result?;

    if removed {
        tracing::info!(habit_id, date = ?query.date, "Habit uncompleted");
        state.broadcast(ChangeEvent::habit_changed(habit_id, ChangeAction::Uncompleted));
    }

    Ok(Json(CompletionAck::uncompleted(habit_id)))
}
