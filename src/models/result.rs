// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle stage of a taking session. Stored as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResultState {
    New,
    InProgress,
    Finished,
}

impl ResultState {
    pub fn is_finished(self) -> bool {
        self == ResultState::Finished
    }
}

/// Represents the 'results' table in the database.
/// One user's attempt at one exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,

    /// Opaque external key used in URLs.
    pub uuid: String,

    pub user_id: i64,
    pub exam_id: i64,

    pub state: ResultState,

    /// 0 before the first question is answered; equals the exam's
    /// question count once finished.
    pub current_order_number: i64,

    /// Questions answered fully correctly so far.
    pub correct_count: i64,

    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}

/// Projection of a result for listing on the exam detail page.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultSummary {
    pub uuid: String,
    pub state: ResultState,
    pub current_order_number: i64,
    pub correct_count: i64,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}
