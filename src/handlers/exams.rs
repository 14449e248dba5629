// src/handlers/exams.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    config::RESULTS_PAGE_SIZE,
    error::AppError,
    models::{exam::Exam, result::ResultSummary},
    utils::jwt::Claims,
};

/// Query parameters for the exam detail view.
#[derive(Debug, Deserialize)]
pub struct DetailParams {
    pub page: Option<i64>,
}

/// Lists all exams in the catalog. Public.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, Exam>(
        "SELECT id, uuid, title, description, created_at FROM exams ORDER BY id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(exams))
}

/// Exam detail: the exam itself plus a page of the caller's results for it.
///
/// Also exposes two read-side aggregates over all of the caller's results:
/// the best score so far and the latest start, matching what the listing
/// page shows next to each exam.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_uuid): Path<String>,
    Query(params): Query<DetailParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let exam = sqlx::query_as::<_, Exam>(
        "SELECT id, uuid, title, description, created_at FROM exams WHERE uuid = ?",
    )
    .bind(&exam_uuid)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let question_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = ?")
            .bind(exam.id)
            .fetch_one(&pool)
            .await?;

    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * RESULTS_PAGE_SIZE;

    let results = sqlx::query_as::<_, ResultSummary>(
        r#"
        SELECT uuid, state, current_order_number, correct_count, created_at, updated_at
        FROM results
        WHERE exam_id = ? AND user_id = ?
        ORDER BY state, created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(exam.id)
    .bind(user_id)
    .bind(RESULTS_PAGE_SIZE)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let max_points: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(correct_count) FROM results WHERE exam_id = ? AND user_id = ?",
    )
    .bind(exam.id)
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let last_start: Option<chrono::NaiveDateTime> = sqlx::query_scalar(
        "SELECT MAX(updated_at) FROM results WHERE exam_id = ? AND user_id = ?",
    )
    .bind(exam.id)
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "exam": exam,
        "question_count": question_count,
        "results": results,
        "page": page,
        "max_points": max_points,
        "last_start": last_start,
    })))
}
