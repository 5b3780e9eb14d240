//! Completion ledger: at most one entry per habit per calendar day.
//!
//! Every statement that writes comes first in its transaction so SQLite
//! takes the write lock up front instead of upgrading a read snapshot.

use chrono::{Datelike, NaiveDate};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::completion::Completion;

/// Backfilled entries may not predate this year.
pub const EARLIEST_COMPLETION_YEAR: i32 = 1970;

/// Record `habit_id` as done on `date` (default: today).
///
/// Idempotent: an existing entry for the day is returned unchanged and the
/// flag is `false`.
pub async fn complete(
    pool: &SqlitePool,
    clock: &dyn Clock,
    habit_id: i64,
    date: Option<NaiveDate>,
) -> AppResult<(Completion, bool)> {
    let today = clock.today();
    let date = date.unwrap_or(today);
    if date > today {
        return Err(AppError::Validation(format!(
            "Cannot complete a habit on a future date ({})",
            date
        )));
    }
    if date.year() < EARLIEST_COMPLETION_YEAR {
        return Err(AppError::Validation(format!(
            "Cannot complete a habit before {} ({})",
            EARLIEST_COMPLETION_YEAR, date
        )));
    }

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO habit_completions (habit_id, completed_at, created_at)
        SELECT id, ?, ? FROM habits WHERE id = ?
        ON CONFLICT (habit_id, completed_at) DO NOTHING
        "#,
    )
    .bind(date)
    .bind(clock.now())
    .bind(habit_id)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;

    let completion = sqlx::query_as::<_, Completion>(
        "SELECT * FROM habit_completions WHERE habit_id = ? AND completed_at = ?",
    )
    .bind(habit_id)
    .bind(date)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(completion) = completion else {
        tx.rollback().await?;
        return Err(AppError::habit_not_found(habit_id));
    };

    tx.commit().await?;
    Ok((completion, inserted))
}

/// Remove the entry for `date` (default: today). Returns whether one existed.
pub async fn uncomplete(
    pool: &SqlitePool,
    clock: &dyn Clock,
    habit_id: i64,
    date: Option<NaiveDate>,
) -> AppResult<bool> {
    let date = date.unwrap_or_else(|| clock.today());
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM habit_completions WHERE habit_id = ? AND completed_at = ?")
        .bind(habit_id)
        .bind(date)
        .execute(&mut *tx)
        .await?
        .rows_affected()
        > 0;

    if !removed && !habit_exists(&mut *tx, habit_id).await? {
        tx.rollback().await?;
        return Err(AppError::habit_not_found(habit_id));
    }

    tx.commit().await?;
    Ok(removed)
}

/// Every entry for a habit, oldest first.
pub async fn completions_for(pool: &SqlitePool, habit_id: i64) -> AppResult<Vec<Completion>> {
    let mut tx = pool.begin().await?;

    if !habit_exists(&mut *tx, habit_id).await? {
        return Err(AppError::habit_not_found(habit_id));
    }

    let completions = sqlx::query_as::<_, Completion>(
        "SELECT * FROM habit_completions WHERE habit_id = ? ORDER BY completed_at ASC",
    )
    .bind(habit_id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(completions)
}

/// Completion dates for a habit, ascending.
pub async fn dates_for<'e, E>(executor: E, habit_id: i64) -> Result<Vec<NaiveDate>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_scalar::<_, NaiveDate>(
        "SELECT completed_at FROM habit_completions WHERE habit_id = ? ORDER BY completed_at ASC",
    )
    .bind(habit_id)
    .fetch_all(executor)
    .await
}

/// Number of completions per day across all habits, for `[start, end]`.
pub async fn daily_counts(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<(NaiveDate, i64)>> {
    let rows = sqlx::query_as::<_, (NaiveDate, i64)>(
        r#"
        SELECT completed_at, COUNT(*) AS count
        FROM habit_completions
        WHERE completed_at BETWEEN ? AND ?
        GROUP BY completed_at
        ORDER BY completed_at ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

async fn habit_exists<'e, E>(executor: E, habit_id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM habits WHERE id = ?)")
        .bind(habit_id)
        .fetch_one(executor)
        .await
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::db::create_test_pool;
    use crate::models::habit::{HabitDraft, HabitFrequency};
    use crate::services::habits;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    async fn setup() -> (SqlitePool, FixedClock, i64) {
        let pool = create_test_pool().await;
        let clock = FixedClock::on(day(10));
        let draft = HabitDraft::new("Walk".into(), None, HabitFrequency::Daily, None).unwrap();
        let habit = habits::create(&pool, &draft, clock.now()).await.unwrap();
        (pool, clock, habit.id)
    }

    async fn count(pool: &SqlitePool, habit_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM habit_completions WHERE habit_id = ?")
            .bind(habit_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_complete_defaults_to_today() {
        let (pool, clock, id) = setup().await;
        let (completion, created) = complete(&pool, &clock, id, None).await.unwrap();
        assert!(created);
        assert_eq!(completion.habit_id, id);
        assert_eq!(completion.completed_at, day(10));
        assert_eq!(completion.created_at, clock.now());
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let (pool, clock, id) = setup().await;
        let (first, created) = complete(&pool, &clock, id, None).await.unwrap();
        assert!(created);

        let (second, created) = complete(&pool, &clock, id, None).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(count(&pool, id).await, 1);
    }

    #[tokio::test]
    async fn test_complete_then_uncomplete_restores_ledger() {
        let (pool, clock, id) = setup().await;
        complete(&pool, &clock, id, Some(day(8))).await.unwrap();
        let before = dates_for(&pool, id).await.unwrap();

        complete(&pool, &clock, id, None).await.unwrap();
        assert!(uncomplete(&pool, &clock, id, None).await.unwrap());

        assert_eq!(dates_for(&pool, id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_uncomplete_absent_is_noop() {
        let (pool, clock, id) = setup().await;
        assert!(!uncomplete(&pool, &clock, id, None).await.unwrap());
        assert_eq!(count(&pool, id).await, 0);
    }

    #[tokio::test]
    async fn test_future_date_rejected() {
        let (pool, clock, id) = setup().await;
        let result = complete(&pool, &clock, id, Some(day(11))).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(count(&pool, id).await, 0);
    }

    #[tokio::test]
    async fn test_implausibly_old_date_rejected() {
        let (pool, clock, id) = setup().await;
        for date in [
            NaiveDate::MIN,
            NaiveDate::from_ymd_opt(1969, 12, 31).unwrap(),
        ] {
            let result = complete(&pool, &clock, id, Some(date)).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
        assert_eq!(count(&pool, id).await, 0);

        let floor = NaiveDate::from_ymd_opt(EARLIEST_COMPLETION_YEAR, 1, 1).unwrap();
        assert!(complete(&pool, &clock, id, Some(floor)).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_entry_surfaces_as_conflict() {
        let (pool, clock, id) = setup().await;
        complete(&pool, &clock, id, None).await.unwrap();

        let err = sqlx::query(
            "INSERT INTO habit_completions (habit_id, completed_at, created_at) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(day(10))
        .bind(clock.now())
        .execute(&pool)
        .await
        .unwrap_err();

        let err = AppError::from(err);
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
        assert_eq!(err.code(), "conflict");
    }

    #[tokio::test]
    async fn test_backfill_allowed() {
        let (pool, clock, id) = setup().await;
        let (completion, _) = complete(&pool, &clock, id, Some(day(1))).await.unwrap();
        assert_eq!(completion.completed_at, day(1));
    }

    #[tokio::test]
    async fn test_unknown_habit_is_not_found() {
        let (pool, clock, _) = setup().await;
        assert!(matches!(
            complete(&pool, &clock, 404, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            uncomplete(&pool, &clock, 404, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            completions_for(&pool, 404).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_completions_for_ascending() {
        let (pool, clock, id) = setup().await;
        for d in [day(9), day(3), day(10), day(5)] {
            complete(&pool, &clock, id, Some(d)).await.unwrap();
        }

        let dates: Vec<NaiveDate> = completions_for(&pool, id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.completed_at)
            .collect();
        assert_eq!(dates, vec![day(3), day(5), day(9), day(10)]);
    }

    #[tokio::test]
    async fn test_concurrent_completes_leave_one_entry() {
        let (pool, _, id) = setup().await;
        let clock = std::sync::Arc::new(FixedClock::on(day(10)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let clock = clock.clone();
            handles.push(tokio::spawn(async move {
                complete(&pool, clock.as_ref(), id, None).await.map(|(_, created)| created)
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(count(&pool, id).await, 1);
    }

    #[tokio::test]
    async fn test_daily_counts_across_habits() {
        let (pool, clock, walk) = setup().await;
        let draft = HabitDraft::new("Read".into(), None, HabitFrequency::Daily, None).unwrap();
        let read = habits::create(&pool, &draft, Utc::now()).await.unwrap().id;

        complete(&pool, &clock, walk, Some(day(9))).await.unwrap();
        complete(&pool, &clock, walk, Some(day(10))).await.unwrap();
        complete(&pool, &clock, read, Some(day(10))).await.unwrap();
        complete(&pool, &clock, read, Some(day(1))).await.unwrap();

        let counts = daily_counts(&pool, day(10) - Duration::days(6), day(10))
            .await
            .unwrap();
        assert_eq!(counts, vec![(day(9), 1), (day(10), 2)]);
    }
}
