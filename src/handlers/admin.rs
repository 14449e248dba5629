// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{CreateExamRequest, validate_choice_flags, validate_question_orders},
};

/// Creates an exam together with its questions and choices.
/// Admin only. Any structural violation rejects the whole submission.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let order_nums: Vec<i64> = payload.questions.iter().map(|q| q.order_num).collect();
    validate_question_orders(&order_nums)?;

    for question in &payload.questions {
        let flags: Vec<bool> = question.choices.iter().map(|c| c.is_correct).collect();
        validate_choice_flags(&flags).map_err(|e| match e {
            AppError::BadRequest(msg) => {
                AppError::BadRequest(format!("Question {}: {}", question.order_num, msg))
            }
            other => other,
        })?;
    }

    let exam_uuid = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    let exam_id = sqlx::query("INSERT INTO exams (uuid, title, description) VALUES (?, ?, ?)")
        .bind(&exam_uuid)
        .bind(&payload.title)
        .bind(&payload.description)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for question in &payload.questions {
        let question_id =
            sqlx::query("INSERT INTO questions (exam_id, text, order_num) VALUES (?, ?, ?)")
                .bind(exam_id)
                .bind(&question.text)
                .bind(question.order_num)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

        for choice in &question.choices {
            sqlx::query("INSERT INTO choices (question_id, text, is_correct) VALUES (?, ?, ?)")
                .bind(question_id)
                .bind(&choice.text)
                .bind(choice.is_correct)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        "Created exam '{}' ({}) with {} questions",
        payload.title,
        exam_uuid,
        payload.questions.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "uuid": exam_uuid })),
    ))
}

/// Deletes an exam and everything it owns: choices, questions, and any
/// results recorded against it, in a single transaction.
/// Admin only.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Path(exam_uuid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam_id: i64 = sqlx::query_scalar("SELECT id FROM exams WHERE uuid = ?")
        .bind(&exam_uuid)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM choices WHERE question_id IN (SELECT id FROM questions WHERE exam_id = ?)",
    )
    .bind(exam_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM questions WHERE exam_id = ?")
        .bind(exam_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM results WHERE exam_id = ?")
        .bind(exam_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM exams WHERE id = ?")
        .bind(exam_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!("Deleted exam {}", exam_uuid);

    Ok(Json(serde_json::json!({ "message": "Exam deleted" })))
}
