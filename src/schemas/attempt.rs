use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::FeedbackEntry;
use crate::db::types::{QuestionType, ResponseSubtype};

#[derive(Debug, Serialize)]
pub(crate) struct CreateAttemptResponse {
    pub(crate) id: String,
    pub(crate) success: bool,
}

/// One learner answer as submitted. Which fields are populated depends on the
/// question type; a payload with every modality empty is treated as blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ResponsePayload {
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default)]
    pub(crate) choice: Option<String>,
    #[serde(default)]
    pub(crate) choices: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) boolean: Option<bool>,
    #[serde(default)]
    pub(crate) file_url: Option<String>,
    #[serde(default)]
    pub(crate) presentation: Option<PresentationResponse>,
}

impl ResponsePayload {
    pub(crate) fn is_blank(&self) -> bool {
        fn empty(value: &Option<String>) -> bool {
            value.as_deref().map(str::trim).map_or(true, str::is_empty)
        }

        empty(&self.text)
            && empty(&self.url)
            && empty(&self.choice)
            && self.choices.as_ref().map_or(true, |items| items.iter().all(|c| c.trim().is_empty()))
            && self.boolean.is_none()
            && empty(&self.file_url)
            && self.presentation.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PresentationResponse {
    #[serde(default)]
    pub(crate) transcript: Option<String>,
    #[serde(default)]
    pub(crate) slides: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) duration_seconds: Option<f64>,
    #[serde(default)]
    pub(crate) video_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseInput {
    pub(crate) question_id: String,
    pub(crate) response: ResponsePayload,
}

/// Question definition supplied inline by an author preview; mirrors the
/// persisted Question fields the grading path reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthorQuestionInput {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) response_subtype: Option<ResponseSubtype>,
    #[serde(default)]
    pub(crate) choices: Vec<crate::db::models::Choice>,
    #[serde(default)]
    pub(crate) scoring: serde_json::Value,
    pub(crate) total_points: f64,
    #[serde(default)]
    pub(crate) grading_context_question_ids: Vec<String>,
    #[serde(default)]
    pub(crate) answer: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAttemptRequest {
    pub(crate) responses: Vec<ResponseInput>,
    #[validate(length(max = 35, message = "language tag too long"))]
    #[serde(default)]
    pub(crate) language: Option<String>,
    #[serde(default)]
    pub(crate) comments: Option<String>,
    #[serde(default)]
    pub(crate) callback_required: bool,
    #[serde(default)]
    pub(crate) author_questions: Option<Vec<AuthorQuestionInput>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionFeedback {
    pub(crate) question_id: String,
    pub(crate) points: f64,
    pub(crate) total_points: f64,
    pub(crate) feedback: Vec<FeedbackEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAttemptResult {
    pub(crate) id: String,
    pub(crate) submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) grade: Option<f64>,
    pub(crate) total_points_earned: f64,
    pub(crate) total_possible_points: f64,
    pub(crate) feedbacks_for_questions: Vec<QuestionFeedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

/// Choice as shown to a caller; grading fields are stripped for learners.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChoiceView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    pub(crate) text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptQuestionView {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) response_subtype: Option<ResponseSubtype>,
    pub(crate) choices: Vec<ChoiceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) scoring: Option<serde_json::Value>,
    pub(crate) total_points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) feedback: Option<Vec<FeedbackEntry>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptView {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) grade: Option<f64>,
    pub(crate) passing_grade: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) expires_at: Option<String>,
    pub(crate) show_assignment_score: bool,
    pub(crate) show_question_score: bool,
    pub(crate) show_submission_feedback: bool,
    pub(crate) questions: Vec<AttemptQuestionView>,
}
