use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::habit::{Habit, HabitDraft, HabitView, UpdateHabitRequest};
use crate::services::ledger;
use crate::services::streak::StreakEngine;

/// A habit together with its ledger dates, ascending.
#[derive(Debug, Clone)]
pub struct TrackedHabit {
    pub habit: Habit,
    pub dates: Vec<NaiveDate>,
}

impl TrackedHabit {
    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    pub fn view(self, engine: &StreakEngine) -> HabitView {
        let streak = engine.summarize(&self.habit, &self.dates);
        let is_completed_today = self.is_completed_on(engine.today());
        HabitView {
            habit: self.habit,
            streak,
            is_completed_today,
        }
    }
}

pub async fn create(pool: &SqlitePool, draft: &HabitDraft, now: DateTime<Utc>) -> AppResult<Habit> {
    let habit = sqlx::query_as::<_, Habit>(
        r#"
        INSERT INTO habits (name, description, frequency, target_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(draft.frequency)
    .bind(draft.target_count)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(habit)
}

pub async fn get(pool: &SqlitePool, habit_id: i64) -> AppResult<Habit> {
    sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = ?")
        .bind(habit_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::habit_not_found(habit_id))
}

/// Merge `body` over the stored habit. Callers serialize through `HabitLocks`.
pub async fn update(
    pool: &SqlitePool,
    habit_id: i64,
    body: UpdateHabitRequest,
    now: DateTime<Utc>,
) -> AppResult<Habit> {
    let existing = get(pool, habit_id).await?;
    let draft = HabitDraft::merge(&existing, body)?;

    sqlx::query_as::<_, Habit>(
        r#"
        UPDATE habits SET
            name = ?,
            description = ?,
            frequency = ?,
            target_count = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(draft.frequency)
    .bind(draft.target_count)
    .bind(now)
    .bind(habit_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::habit_not_found(habit_id))
}

/// Delete a habit and its whole ledger in one transaction.
pub async fn delete(pool: &SqlitePool, habit_id: i64) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM habit_completions WHERE habit_id = ?")
        .bind(habit_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let result = sqlx::query("DELETE FROM habits WHERE id = ?")
        .bind(habit_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::habit_not_found(habit_id));
    }

    tx.commit().await?;
    tracing::debug!(habit_id, completions_removed = removed, "Habit ledger removed");
    Ok(())
}

/// One habit with its ledger, read in a single transaction.
pub async fn tracked(pool: &SqlitePool, habit_id: i64) -> AppResult<TrackedHabit> {
    let mut tx = pool.begin().await?;

    let habit = sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = ?")
        .bind(habit_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::habit_not_found(habit_id))?;
    let dates = ledger::dates_for(&mut *tx, habit_id).await?;

    tx.commit().await?;
    Ok(TrackedHabit { habit, dates })
}

/// Point-in-time view of every habit and its ledger, in creation order.
pub async fn snapshot(pool: &SqlitePool) -> AppResult<Vec<TrackedHabit>> {
    let mut tx = pool.begin().await?;

    let habits = sqlx::query_as::<_, Habit>("SELECT * FROM habits ORDER BY id ASC")
        .fetch_all(&mut *tx)
        .await?;
    let rows = sqlx::query_as::<_, (i64, NaiveDate)>(
        "SELECT habit_id, completed_at FROM habit_completions ORDER BY habit_id, completed_at",
    )
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    let mut by_habit: HashMap<i64, Vec<NaiveDate>> = HashMap::new();
    for (habit_id, date) in rows {
        by_habit.entry(habit_id).or_default().push(date);
    }

    Ok(habits
        .into_iter()
        .map(|habit| {
            let dates = by_habit.remove(&habit.id).unwrap_or_default();
            TrackedHabit { habit, dates }
        })
        .collect())
}
