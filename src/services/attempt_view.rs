use std::collections::HashMap;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::repositories::{assignments, attempt_variants, attempts, questions, responses, translations};
use crate::schemas::attempt::{AttemptQuestionView, AttemptView};
use crate::services::grading::EffectiveQuestion;
use crate::services::{attempt_submission, translation, visibility};

/// Assembles the attempt as the caller is allowed to see it: frozen question
/// order, per-attempt variant and choice snapshot, requested-language
/// translation, then the visibility policy for learners.
pub(crate) async fn load(
    state: &AppState,
    assignment_id: &str,
    attempt_id: &str,
    requested_language: Option<&str>,
    caller_user_id: &str,
    is_author: bool,
) -> Result<AttemptView, ApiError> {
    let language = translation::normalize_language(requested_language);

    let attempt = attempts::find_by_id(state.db(), attempt_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::NotFound(format!("Attempt {attempt_id} not found")))?;

    attempt_submission::ensure_in_assignment(&attempt, assignment_id)?;
    if !is_author && attempt.user_id != caller_user_id {
        return Err(ApiError::Forbidden("Attempt belongs to another user"));
    }

    let assignment = assignments::find_by_id(state.db(), &attempt.assignment_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load assignment"))?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Assignment {} not found", attempt.assignment_id))
        })?;

    let live_questions = questions::list_live_by_assignment(state.db(), &assignment.id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load assignment questions"))?;
    let question_index: HashMap<&str, &crate::db::models::Question> =
        live_questions.iter().map(|question| (question.id.as_str(), question)).collect();

    let variant_rows = attempt_variants::list_by_attempt(state.db(), attempt_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load attempt variants"))?;
    let variant_index: HashMap<&str, &crate::db::models::AttemptQuestionVariant> =
        variant_rows.iter().map(|row| (row.question_id.as_str(), row)).collect();

    let response_rows = responses::list_by_attempt(state.db(), attempt_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load responses"))?;
    let response_index: HashMap<&str, &crate::db::models::QuestionResponse> =
        response_rows.iter().map(|row| (row.question_id.as_str(), row)).collect();

    let mut question_views = Vec::with_capacity(attempt.question_order.0.len());
    for question_id in &attempt.question_order.0 {
        // Questions soft-deleted since the attempt started drop out of view.
        let Some(base) = question_index.get(question_id.as_str()) else {
            continue;
        };

        let row = variant_index.get(question_id.as_str());
        let variant_id = row.and_then(|r| r.variant_id.as_deref());

        let mut effective = match variant_id {
            Some(id) => {
                let variant = questions::find_variant_by_id(state.db(), id)
                    .await
                    .map_err(|err| ApiError::internal(err, "Failed to load question variant"))?
                    .ok_or_else(|| {
                        ApiError::Internal(format!("Variant {id} recorded but missing"))
                    })?;
                EffectiveQuestion::from_variant(base, &variant)
            }
            None => EffectiveQuestion::from_base(base),
        };

        if let Some(row) = row {
            if !row.choice_snapshot.0.is_empty() {
                effective.choices = row.choice_snapshot.0.clone();
            }
        }

        if language != "en" {
            let variant_scoped = match variant_id {
                Some(id) => {
                    translations::find_for_question(state.db(), &base.id, Some(id), &language)
                        .await
                        .map_err(|err| ApiError::internal(err, "Failed to load translation"))?
                }
                None => None,
            };
            let question_scoped =
                translations::find_for_question(state.db(), &base.id, None, &language)
                    .await
                    .map_err(|err| ApiError::internal(err, "Failed to load translation"))?;
            translation::apply(
                &mut effective,
                &language,
                variant_scoped.as_ref(),
                question_scoped.as_ref(),
            );
        }

        let response = response_index.get(question_id.as_str());

        question_views.push(AttemptQuestionView {
            id: effective.id.clone(),
            text: effective.text.clone(),
            question_type: effective.question_type,
            response_subtype: effective.response_subtype,
            choices: effective
                .choices
                .iter()
                .map(|choice| visibility::choice_view(choice, is_author))
                .collect(),
            scoring: Some(effective.scoring.clone()),
            total_points: effective.total_points,
            answer: effective.answer.clone(),
            response: response.map(|row| row.response.0.clone()),
            points: response.map(|row| row.points),
            feedback: response.map(|row| row.feedback.0.clone()),
        });
    }

    let mut view = AttemptView {
        id: attempt.id.clone(),
        assignment_id: assignment.id.clone(),
        submitted: attempt.submitted,
        grade: attempt.grade,
        passing_grade: assignment.passing_grade,
        expires_at: attempt.expires_at.map(format_primitive),
        show_assignment_score: assignment.show_assignment_score,
        show_question_score: assignment.show_question_score,
        show_submission_feedback: assignment.show_submission_feedback,
        questions: question_views,
    };

    if !is_author {
        visibility::apply_to_view(&mut view, &assignment);
    }

    Ok(view)
}
