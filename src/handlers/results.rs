// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::result::ExamResult,
    utils::jwt::{Capability, Claims},
};

/// Fetches a result by external key, scoped to the owning user and exam.
/// Returns NotFound when the result does not exist or belongs to someone else.
pub(crate) async fn load_owned_result(
    pool: &SqlitePool,
    exam_uuid: &str,
    result_uuid: &str,
    user_id: i64,
) -> Result<ExamResult, AppError> {
    sqlx::query_as::<_, ExamResult>(
        r#"
        SELECT r.id, r.uuid, r.user_id, r.exam_id, r.state,
               r.current_order_number, r.correct_count, r.created_at, r.updated_at
        FROM results r
        JOIN exams e ON r.exam_id = e.id
        WHERE r.uuid = ? AND e.uuid = ? AND r.user_id = ?
        "#,
    )
    .bind(result_uuid)
    .bind(exam_uuid)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Result not found".to_string()))
}

/// Starts a new attempt at an exam.
///
/// Creates a Result with state 'new' and position 0, then points the
/// client at the question endpoint for the first question.
pub async fn start_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_uuid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let exam_id: i64 = sqlx::query_scalar("SELECT id FROM exams WHERE uuid = ?")
        .bind(&exam_uuid)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let result_uuid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO results (uuid, user_id, exam_id, state, current_order_number)
        VALUES (?, ?, ?, 'new', 0)
        "#,
    )
    .bind(&result_uuid)
    .bind(user_id)
    .bind(exam_id)
    .execute(&pool)
    .await?;

    tracing::info!("User {} started exam {}", user_id, exam_uuid);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "result_uuid": result_uuid,
            "question_url": format!("/api/exams/{}/results/{}/question", exam_uuid, result_uuid),
        })),
    ))
}

/// Result detail: lifecycle state and the derived score.
pub async fn get_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((exam_uuid, result_uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = load_owned_result(&pool, &exam_uuid, &result_uuid, user_id).await?;

    let question_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = ?")
            .bind(result.exam_id)
            .fetch_one(&pool)
            .await?;

    Ok(Json(serde_json::json!({
        "uuid": result.uuid,
        "state": result.state,
        "current_order_number": result.current_order_number,
        "score": result.correct_count,
        "total_questions": question_count,
        "created_at": result.created_at,
        "updated_at": result.updated_at,
    })))
}

/// Deletes a result. Requires the ViewStatistics capability.
///
/// Unlike the other result routes this is not scoped to the caller:
/// administrators clean up any user's attempts.
pub async fn delete_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((exam_uuid, result_uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.allows(Capability::ViewStatistics) {
        return Err(AppError::PermissionDenied(
            "Deleting results requires the view-statistics capability".to_string(),
        ));
    }

    let deleted = sqlx::query(
        r#"
        DELETE FROM results
        WHERE uuid = ?
          AND exam_id = (SELECT id FROM exams WHERE uuid = ?)
        "#,
    )
    .bind(&result_uuid)
    .bind(&exam_uuid)
    .execute(&pool)
    .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Result deleted" })))
}
