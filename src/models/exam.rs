// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::{
    config::{QUESTION_MAX_LIMIT, QUESTION_MIN_LIMIT},
    error::AppError,
};

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,

    /// Opaque external key used in URLs.
    pub uuid: String,

    pub title: String,

    pub description: Option<String>,

    pub created_at: Option<chrono::NaiveDateTime>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,

    /// The text content of the question.
    pub text: String,

    /// 1-based position within the exam, unique per exam.
    pub order_num: i64,
}

/// Represents the 'choices' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// DTO for sending a choice to a taker (hides the correctness flag).
#[derive(Debug, Serialize)]
pub struct PublicChoice {
    pub id: i64,
    pub text: String,
}

/// DTO for one choice in an authoring submission.
#[derive(Debug, Deserialize, Validate)]
pub struct ChoiceDraft {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    pub is_correct: bool,
}

/// DTO for one question in an authoring submission.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionDraft {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    pub order_num: i64,
    #[validate(nested)]
    pub choices: Vec<ChoiceDraft>,
}

/// DTO for creating a whole exam tree in one submission.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(nested)]
    pub questions: Vec<QuestionDraft>,
}

/// Checks the structural rules on a question set's order numbers:
/// count within bounds, numbering starts at 1, contiguous with step 1.
pub fn validate_question_orders(order_nums: &[i64]) -> Result<(), AppError> {
    let count = order_nums.len();
    if !(QUESTION_MIN_LIMIT..=QUESTION_MAX_LIMIT).contains(&count) {
        return Err(AppError::BadRequest(format!(
            "Question count must be in the range {} to {}",
            QUESTION_MIN_LIMIT, QUESTION_MAX_LIMIT
        )));
    }

    let mut sorted = order_nums.to_vec();
    sorted.sort_unstable();

    if sorted[0] != 1 {
        return Err(AppError::BadRequest(
            "Question numbering must start at 1".to_string(),
        ));
    }

    if sorted[count - 1] > QUESTION_MAX_LIMIT as i64 {
        return Err(AppError::BadRequest(format!(
            "Question numbers cannot exceed {}",
            QUESTION_MAX_LIMIT
        )));
    }

    for pair in sorted.windows(2) {
        // Duplicates give a step of 0, gaps a step > 1.
        if pair[1] - pair[0] != 1 {
            return Err(AppError::BadRequest(
                "Question numbers must be contiguous with a step of 1".to_string(),
            ));
        }
    }

    Ok(())
}

/// Checks the correctness flags of one question's choices:
/// at least one correct, and not every choice correct.
pub fn validate_choice_flags(is_correct: &[bool]) -> Result<(), AppError> {
    let num_correct = is_correct.iter().filter(|c| **c).count();

    if num_correct == 0 {
        return Err(AppError::BadRequest(
            "At least one choice must be correct".to_string(),
        ));
    }

    if num_correct == is_correct.len() {
        return Err(AppError::BadRequest(
            "Not all choices may be correct".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: AppError) -> String {
        match err {
            AppError::BadRequest(msg) => msg,
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn accepts_contiguous_orders() {
        assert!(validate_question_orders(&[1, 2, 3]).is_ok());
        // Submission order does not matter, only the set of values.
        assert!(validate_question_orders(&[3, 1, 2, 4]).is_ok());
    }

    #[test]
    fn rejects_count_out_of_range() {
        let err = validate_question_orders(&[1, 2]).unwrap_err();
        assert!(message(err).contains("range"));

        let too_many: Vec<i64> = (1..=(QUESTION_MAX_LIMIT as i64 + 1)).collect();
        assert!(validate_question_orders(&too_many).is_err());
    }

    #[test]
    fn rejects_numbering_not_starting_at_1() {
        let err = validate_question_orders(&[2, 3, 4]).unwrap_err();
        assert!(message(err).contains("start at 1"));
    }

    #[test]
    fn rejects_order_number_above_limit() {
        let err = validate_question_orders(&[1, 2, QUESTION_MAX_LIMIT as i64 + 1]).unwrap_err();
        assert!(message(err).contains("cannot exceed"));
    }

    #[test]
    fn rejects_gap_in_orders() {
        let err = validate_question_orders(&[1, 2, 4]).unwrap_err();
        assert!(message(err).contains("contiguous"));
    }

    #[test]
    fn rejects_duplicate_orders() {
        let err = validate_question_orders(&[1, 2, 2, 3]).unwrap_err();
        assert!(message(err).contains("contiguous"));
    }

    #[test]
    fn accepts_mixed_choice_flags() {
        assert!(validate_choice_flags(&[true, false, false, false]).is_ok());
        assert!(validate_choice_flags(&[true, true, false]).is_ok());
    }

    #[test]
    fn rejects_no_correct_choice() {
        let err = validate_choice_flags(&[false, false, false]).unwrap_err();
        assert!(message(err).contains("At least one"));
    }

    #[test]
    fn rejects_all_choices_correct() {
        let err = validate_choice_flags(&[true, true, true]).unwrap_err();
        assert!(message(err).contains("Not all"));
    }
}
