use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::streak::StreakSummary;

pub const MAX_WEEKLY_TARGET: i32 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub frequency: HabitFrequency,
    pub target_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HabitFrequency {
    #[default]
    Daily,
    Weekly,
    MultipleTimesWeek,
}

impl HabitFrequency {
    /// Whether streaks are counted in weeks rather than days.
    pub fn is_weekly(self) -> bool {
        !matches!(self, HabitFrequency::Daily)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateHabitRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be under 2000 characters"))]
    pub description: Option<String>,

    /// Default: "daily"
    pub frequency: Option<HabitFrequency>,

    /// Times per week for `multiple_times_week`; ignored otherwise.
    pub target_count: Option<i32>,
}

/// PUT /api/habits/{id}: partial update, all fields optional
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateHabitRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    /// Absent keeps the stored description; `null` clears it.
    #[serde(default, deserialize_with = "present_or_null")]
    #[validate(length(max = 2000, message = "Description must be under 2000 characters"))]
    pub description: Option<Option<String>>,

    pub frequency: Option<HabitFrequency>,
    pub target_count: Option<i32>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Validated, normalized habit fields ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitDraft {
    pub name: String,
    pub description: Option<String>,
    pub frequency: HabitFrequency,
    pub target_count: i32,
}

impl HabitDraft {
    pub fn new(
        name: String,
        description: Option<String>,
        frequency: HabitFrequency,
        target_count: Option<i32>,
    ) -> AppResult<Self> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Habit name is required".into()));
        }

        let target_count = match frequency {
            HabitFrequency::MultipleTimesWeek => {
                let target = target_count.unwrap_or(1);
                if !(1..=MAX_WEEKLY_TARGET).contains(&target) {
                    return Err(AppError::Validation(format!(
                        "target_count must be between 1 and {} for multiple_times_week habits",
                        MAX_WEEKLY_TARGET
                    )));
                }
                target
            }
            HabitFrequency::Daily | HabitFrequency::Weekly => 1,
        };

        Ok(Self {
            name,
            description,
            frequency,
            target_count,
        })
    }

    pub fn from_create(body: CreateHabitRequest) -> AppResult<Self> {
        body.validate()?;
        Self::new(
            body.name,
            body.description,
            body.frequency.unwrap_or_default(),
            body.target_count,
        )
    }

    /// Merge an update over the stored habit and re-validate the result.
    pub fn merge(existing: &Habit, body: UpdateHabitRequest) -> AppResult<Self> {
        body.validate()?;
        let frequency = body.frequency.unwrap_or(existing.frequency);
        let target_count = body.target_count.or(if frequency == existing.frequency {
            Some(existing.target_count)
        } else {
            None
        });

        Self::new(
            body.name.unwrap_or_else(|| existing.name.clone()),
            body.description
                .unwrap_or_else(|| existing.description.clone()),
            frequency,
            target_count,
        )
    }
}

/// Habit as returned by the API, with fields derived from the ledger.
#[derive(Debug, Serialize)]
pub struct HabitView {
    #[serde(flatten)]
    pub habit: Habit,
    #[serde(flatten)]
    pub streak: StreakSummary,
    pub is_completed_today: bool,
}
