//! Request/response shapes that are not database rows.
//!
//! Conventions:
//! - `*Response` → serialized to client JSON
//! - Row types live in `models`; derived habit fields in `services::streak`

use serde::Serialize;

// ============================================================================
// Common
// ============================================================================

/// Stable error envelope: every error response uses this shape
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub status: u16,
}

// ============================================================================
// Completions
// ============================================================================

/// Response for POST and DELETE /api/habits/{id}/complete
#[derive(Debug, Serialize)]
pub struct CompletionAck {
    pub message: String,
    pub habit_id: i64,
}

impl CompletionAck {
    pub fn completed(habit_id: i64) -> Self {
        Self {
            message: "Habit completed successfully".into(),
            habit_id,
        }
    }

    pub fn uncompleted(habit_id: i64) -> Self {
        Self {
            message: "Habit uncompleted successfully".into(),
            habit_id,
        }
    }
}

// ============================================================================
// Stats & charts
// ============================================================================

/// GET /api/stats
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_habits: i64,
    pub completed_today: i64,
    pub total_completions: i64,
    pub average_streak: f64,
    pub best_streak: i32,
    /// Mean of the per-habit completion rates, 0-100.
    pub completion_rate: f64,
}

/// GET /api/charts/*
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

// ============================================================================
// Change feed
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Completed,
    Uncompleted,
}

/// Broadcast to WebSocket subscribers after every mutation
#[derive(Debug, Serialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub habit_id: i64,
    pub action: ChangeAction,
}

impl ChangeEvent {
    pub fn habit_changed(habit_id: i64, action: ChangeAction) -> Self {
        Self {
            kind: "habit_changed",
            habit_id,
            action,
        }
    }
}

// ============================================================================
// System
// ============================================================================

/// GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
    pub service: String,
    pub version: String,
}

/// GET /readyz
#[derive(Debug, Serialize)]
pub struct ReadyzResponse {
    pub status: String,
    pub checks: ReadyzChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadyzChecks {
    pub database: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_event_shape() {
        let event = ChangeEvent::habit_changed(7, ChangeAction::Uncompleted);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "habit_changed");
        assert_eq!(json["habit_id"], 7);
        assert_eq!(json["action"], "uncompleted");
    }

    #[test]
    fn test_completion_ack_messages() {
        let json = serde_json::to_value(CompletionAck::completed(3)).unwrap();
        assert_eq!(json["message"], "Habit completed successfully");
        assert_eq!(json["habit_id"], 3);

        let json = serde_json::to_value(CompletionAck::uncompleted(3)).unwrap();
        assert_eq!(json["message"], "Habit uncompleted successfully");
    }

    #[test]
    fn test_error_envelope_shape() {
        let body = ErrorResponse {
            error: ErrorBody {
                code: "not_found".into(),
                message: "Habit 1 not found".into(),
                status: 404,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "not_found");
        assert_eq!(json["error"]["status"], 404);
    }
}
