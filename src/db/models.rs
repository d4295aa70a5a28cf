use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{DisplayOrder, QuestionType, ResponseSubtype};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) instructions: String,
    pub(crate) display_order: DisplayOrder,
    pub(crate) question_order: Option<Json<Vec<String>>>,
    pub(crate) alloted_time_minutes: Option<i32>,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) window_max_attempts: Option<i32>,
    pub(crate) window_minutes: Option<i32>,
    pub(crate) passing_grade: f64,
    pub(crate) show_assignment_score: bool,
    pub(crate) show_question_score: bool,
    pub(crate) show_submission_feedback: bool,
    pub(crate) show_rubrics_to_learner: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One answer option. `id` is the stable identity carried from authoring
/// through randomization and translation; matching falls back to normalized
/// text for rows authored before ids existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Choice {
    #[serde(default)]
    pub(crate) id: Option<String>,
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) is_correct: bool,
    #[serde(default)]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) response_subtype: Option<ResponseSubtype>,
    pub(crate) scoring: Json<serde_json::Value>,
    pub(crate) choices: Json<Vec<Choice>>,
    pub(crate) randomize_choices: bool,
    pub(crate) grading_context_question_ids: Json<Vec<String>>,
    pub(crate) total_points: f64,
    pub(crate) max_chars: Option<i32>,
    pub(crate) answer: Option<String>,
    pub(crate) order_index: i32,
    pub(crate) is_deleted: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionVariant {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) choices: Option<Json<Vec<Choice>>>,
    pub(crate) scoring: Option<Json<serde_json::Value>>,
    pub(crate) randomize_choices: bool,
    pub(crate) max_chars: Option<i32>,
    pub(crate) answer: Option<String>,
    pub(crate) is_deleted: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssignmentAttempt {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) user_id: String,
    pub(crate) question_order: Json<Vec<String>>,
    pub(crate) random_seed: i64,
    pub(crate) expires_at: Option<PrimitiveDateTime>,
    pub(crate) submitted: bool,
    pub(crate) grade: Option<f64>,
    pub(crate) comments: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptQuestionVariant {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) variant_id: Option<String>,
    pub(crate) choice_snapshot: Json<Vec<Choice>>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) response: Json<serde_json::Value>,
    pub(crate) points: f64,
    pub(crate) feedback: Json<Vec<FeedbackEntry>>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FeedbackEntry {
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) is_correct: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Translation {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) variant_id: Option<String>,
    pub(crate) language: String,
    pub(crate) text: String,
    pub(crate) choices: Option<Json<Vec<Choice>>>,
    pub(crate) created_at: PrimitiveDateTime,
}
