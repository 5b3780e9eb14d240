use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::dto::{ChangeAction, ChangeEvent};
use crate::error::{AppError, AppResult};
use crate::models::completion::Completion;
use crate::models::habit::{CreateHabitRequest, HabitDraft, HabitView, UpdateHabitRequest};
use crate::services::habits::{self, TrackedHabit};
use crate::services::ledger;
use crate::AppState;

pub async fn list_habits(State(state): State<AppState>) -> AppResult<Json<Vec<HabitView>>> {
    let engine = state.streak_engine();
    let tracked = habits::snapshot(&state.db).await?;

    Ok(Json(tracked.into_iter().map(|t| t.view(&engine)).collect()))
}

pub async fn get_habit(
    State(state): State<AppState>,
    WithRejection(Path(habit_id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<HabitView>> {
    let engine = state.streak_engine();
    let tracked = habits::tracked(&state.db, habit_id).await?;

    Ok(Json(tracked.view(&engine)))
}

pub async fn create_habit(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CreateHabitRequest>, AppError>,
) -> AppResult<(StatusCode, Json<HabitView>)> {
    let draft = HabitDraft::from_create(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected habit");
        e
    })?;

    let habit = habits::create(&state.db, &draft, state.clock.now()).await?;
    tracing::info!(habit_id = habit.id, frequency = ?habit.frequency, "Habit created");
    state.broadcast(ChangeEvent::habit_changed(habit.id, ChangeAction::Created));

    let view = TrackedHabit {
        habit,
        dates: Vec::new(),
    }
    .view(&state.streak_engine());
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_habit(
    State(state): State<AppState>,
    WithRejection(Path(habit_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateHabitRequest>, AppError>,
) -> AppResult<Json<HabitView>> {
    let result = {
        let _guard = state.locks.acquire(habit_id).await;
        match habits::update(&state.db, habit_id, body, state.clock.now()).await {
            Ok(_) => habits::tracked(&state.db, habit_id).await,
            Err(e) => Err(e),
        }
    };
    state.locks.release(habit_id).await;
    let tracked = result?;

    tracing::info!(habit_id, "Habit updated");
    state.broadcast(ChangeEvent::habit_changed(habit_id, ChangeAction::Updated));

    Ok(Json(tracked.view(&state.streak_engine())))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    WithRejection(Path(habit_id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<StatusCode> {
    let result = {
        let _guard = state.locks.acquire(habit_id).await;
        habits::delete(&state.db, habit_id).await
    };
    state.locks.release(habit_id).await;
    result?;

    tracing::info!(habit_id, "Habit deleted");
    state.broadcast(ChangeEvent::habit_changed(habit_id, ChangeAction::Deleted));

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_completions(
    State(state): State<AppState>,
    WithRejection(Path(habit_id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<Vec<Completion>>> {
    let completions = ledger::completions_for(&state.db, habit_id).await?;
    Ok(Json(completions))
}
