// src/handlers/flow.rs
//
// The question flow controller: serves the next unanswered question of a
// taking session and accepts submitted answers, advancing the session one
// position per accepted submission.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::results::load_owned_result,
    models::{
        exam::{Choice, PublicChoice, Question},
        result::ResultState,
    },
    utils::jwt::Claims,
};

/// DTO for submitting an answer: one boolean per choice of the current
/// question, aligned positionally to the choices as served.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub selected: Vec<bool>,
}

/// Checks the all/none rule on a submitted selection: at least one choice
/// must be picked, and picking every choice is not allowed.
fn check_selection(selected: &[bool]) -> Result<(), AppError> {
    let picked = selected.iter().filter(|s| **s).count();

    if picked == 0 {
        return Err(AppError::InputRejected(
            "At least one choice must be selected".to_string(),
        ));
    }

    if picked == selected.len() {
        return Err(AppError::InputRejected(
            "Selecting all choices is not allowed".to_string(),
        ));
    }

    Ok(())
}

/// All-or-nothing grading: the submission counts as correct only when the
/// selection equals the stored correctness flags exactly.
fn selection_matches_key(selected: &[bool], key: &[bool]) -> bool {
    selected == key
}

async fn load_question_at(
    pool: &SqlitePool,
    exam_id: i64,
    order_num: i64,
) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(
        "SELECT id, exam_id, text, order_num FROM questions WHERE exam_id = ? AND order_num = ?",
    )
    .bind(exam_id)
    .bind(order_num)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))
}

async fn load_choices(pool: &SqlitePool, question_id: i64) -> Result<Vec<Choice>, AppError> {
    let choices = sqlx::query_as::<_, Choice>(
        "SELECT id, question_id, text, is_correct FROM choices WHERE question_id = ? ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;

    Ok(choices)
}

/// Serves the current (next unanswered) question of a session.
///
/// Reading never mutates the session; fetching twice in a row returns the
/// same question. Correctness flags stay on the server.
pub async fn current_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((exam_uuid, result_uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = load_owned_result(&pool, &exam_uuid, &result_uuid, user_id).await?;

    if result.state.is_finished() {
        return Err(AppError::Conflict("Session already complete".to_string()));
    }

    let question = load_question_at(&pool, result.exam_id, result.current_order_number + 1).await?;
    let choices = load_choices(&pool, question.id).await?;

    let question_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = ?")
            .bind(result.exam_id)
            .fetch_one(&pool)
            .await?;

    let choices: Vec<PublicChoice> = choices
        .into_iter()
        .map(|c| PublicChoice {
            id: c.id,
            text: c.text,
        })
        .collect();

    Ok(Json(serde_json::json!({
        "question": {
            "text": question.text,
            "order_num": question.order_num,
        },
        "total_questions": question_count,
        "choices": choices,
    })))
}

/// Accepts an answer for the current question and advances the session.
///
/// * Rejects submissions to finished sessions.
/// * Rejects selections violating the all/none rule without touching state.
/// * Grades all-or-nothing against the stored correctness flags.
/// * Advances with a conditional update keyed on the position read in this
///   request, so a concurrent duplicate submission cannot advance twice.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((exam_uuid, result_uuid)): Path<(String, String)>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = load_owned_result(&pool, &exam_uuid, &result_uuid, user_id).await?;

    if result.state.is_finished() {
        return Err(AppError::Conflict("Session already complete".to_string()));
    }

    let question = load_question_at(&pool, result.exam_id, result.current_order_number + 1).await?;
    let choices = load_choices(&pool, question.id).await?;

    if payload.selected.len() != choices.len() {
        return Err(AppError::BadRequest(format!(
            "Expected {} selection flags, got {}",
            choices.len(),
            payload.selected.len()
        )));
    }

    check_selection(&payload.selected)?;

    let answer_key: Vec<bool> = choices.iter().map(|c| c.is_correct).collect();
    let answer_correct = selection_matches_key(&payload.selected, &answer_key);

    let question_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = ?")
            .bind(result.exam_id)
            .fetch_one(&pool)
            .await?;

    let new_order = result.current_order_number + 1;
    let new_state = if new_order >= question_count {
        ResultState::Finished
    } else {
        ResultState::InProgress
    };

    // Optimistic advance: only applies if nobody moved the session since
    // we read it. A double-submit loses the race and gets a 409.
    let updated = sqlx::query(
        r#"
        UPDATE results
        SET state = ?,
            current_order_number = ?,
            correct_count = correct_count + ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND current_order_number = ?
        "#,
    )
    .bind(new_state)
    .bind(new_order)
    .bind(answer_correct as i64)
    .bind(result.id)
    .bind(result.current_order_number)
    .execute(&pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Answer already submitted for this question".to_string(),
        ));
    }

    let score = result.correct_count + answer_correct as i64;

    let body = if new_state == ResultState::Finished {
        serde_json::json!({
            "state": new_state,
            "current_order_number": new_order,
            "answer_correct": answer_correct,
            "score": score,
            "total_questions": question_count,
            "result_url": format!("/api/exams/{}/results/{}", exam_uuid, result_uuid),
        })
    } else {
        serde_json::json!({
            "state": new_state,
            "current_order_number": new_order,
            "answer_correct": answer_correct,
            "question_url": format!("/api/exams/{}/results/{}/question", exam_uuid, result_uuid),
        })
    };

    Ok(Json(body))
}
