//! Cross-habit aggregates and chart series.
//!
//! Every function here works from one `habits::snapshot` so a response never
//! mixes ledger states, and every completion rate comes from the same
//! `StreakEngine` formula the habit views use.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use sqlx::SqlitePool;

use crate::dto::{ChartData, Stats};
use crate::error::AppResult;
use crate::services::habits::{self, TrackedHabit};
use crate::services::ledger;
use crate::services::streak::{StreakEngine, StreakSummary};

/// Days shown by the daily completions chart.
pub const DAILY_CHART_DAYS: i64 = 30;

pub async fn compute_stats(pool: &SqlitePool, engine: &StreakEngine) -> AppResult<Stats> {
    let snapshot = habits::snapshot(pool).await?;
    Ok(aggregate(&snapshot, engine))
}

pub fn aggregate(snapshot: &[TrackedHabit], engine: &StreakEngine) -> Stats {
    let summaries: Vec<StreakSummary> = snapshot
        .iter()
        .map(|t| engine.summarize(&t.habit, &t.dates))
        .collect();

    let total_habits = snapshot.len() as i64;
    let completed_today = snapshot
        .iter()
        .filter(|t| t.is_completed_on(engine.today()))
        .count() as i64;
    let total_completions = snapshot.iter().map(|t| t.dates.len() as i64).sum();
    let best_streak = summaries.iter().map(|s| s.longest_streak).max().unwrap_or(0);

    let (average_streak, completion_rate) = if summaries.is_empty() {
        (0.0, 0.0)
    } else {
        let n = summaries.len() as f64;
        let streak_sum: i64 = summaries.iter().map(|s| s.current_streak as i64).sum();
        let rate_sum: f64 = summaries.iter().map(|s| s.completion_rate).sum();
        (streak_sum as f64 / n, rate_sum / n)
    };

    Stats {
        total_habits,
        completed_today,
        total_completions,
        average_streak,
        best_streak,
        completion_rate,
    }
}

/// Per-habit completion rate, in creation order.
pub async fn completion_rate_chart(
    pool: &SqlitePool,
    engine: &StreakEngine,
) -> AppResult<ChartData> {
    let snapshot = habits::snapshot(pool).await?;

    let mut chart = ChartData::default();
    for tracked in &snapshot {
        let summary = engine.summarize(&tracked.habit, &tracked.dates);
        chart.labels.push(tracked.habit.name.clone());
        chart.data.push(summary.completion_rate);
    }
    Ok(chart)
}

/// Per-habit current streak, longest first. Ties keep creation order.
pub async fn streak_chart(pool: &SqlitePool, engine: &StreakEngine) -> AppResult<ChartData> {
    let snapshot = habits::snapshot(pool).await?;

    let mut points: Vec<(String, i32)> = snapshot
        .iter()
        .map(|t| {
            let summary = engine.summarize(&t.habit, &t.dates);
            (t.habit.name.clone(), summary.current_streak)
        })
        .collect();
    points.sort_by(|a, b| b.1.cmp(&a.1));

    let (labels, data): (Vec<String>, Vec<f64>) = points
        .into_iter()
        .map(|(name, streak)| (name, streak as f64))
        .unzip();
    Ok(ChartData { labels, data })
}

/// Completions per day over the trailing `DAILY_CHART_DAYS`, ending today.
pub async fn daily_completions_chart(pool: &SqlitePool, today: NaiveDate) -> AppResult<ChartData> {
    let start = today - Duration::days(DAILY_CHART_DAYS - 1);
    let counts: HashMap<NaiveDate, i64> = ledger::daily_counts(pool, start, today)
        .await?
        .into_iter()
        .collect();

    let mut chart = ChartData::default();
    for offset in 0..DAILY_CHART_DAYS {
        let date = start + Duration::days(offset);
        chart.labels.push(date.format("%b %-d").to_string());
        chart.data.push(counts.get(&date).copied().unwrap_or(0) as f64);
    }
    Ok(chart)
}
