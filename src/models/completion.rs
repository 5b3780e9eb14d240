use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Completion {
    pub id: i64,
    pub habit_id: i64,
    /// Calendar day the habit was done (UTC).
    pub completed_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Query for POST/DELETE /api/habits/{id}/complete
#[derive(Debug, Default, Deserialize)]
pub struct CompletionDateQuery {
    /// Day to complete or uncomplete. Default: today.
    pub date: Option<NaiveDate>,
}
