use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Assignment, Question};
use crate::repositories::{attempt_variants, attempts, questions, responses, translations};
use crate::schemas::attempt::{
    QuestionFeedback, ResponsePayload, SubmitAttemptRequest, SubmitAttemptResult,
};
use crate::services::grading::{
    messages, ContextPair, EffectiveQuestion, GradeOutcome, GradingContext, GradingError,
};
use crate::services::{score, translation, visibility};

/// Attempt id returned for author previews, which never touch storage.
pub(crate) const EPHEMERAL_ATTEMPT_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Whether a submission writes through to storage or only computes a result.
pub(crate) enum SubmissionMode {
    Persisted { user_id: String, outcome_token: Option<String> },
    Ephemeral,
}

/// Plain-text rendering of a prior answer used as grading context for a
/// later question.
fn context_text(payload: &ResponsePayload) -> String {
    payload
        .text
        .clone()
        .or_else(|| payload.url.clone())
        .or_else(|| payload.file_url.clone())
        .or_else(|| payload.choice.clone())
        .or_else(|| payload.choices.as_ref().map(|items| items.join(", ")))
        .or_else(|| payload.boolean.map(|value| value.to_string()))
        .unwrap_or_default()
}

fn aggregate_failure(failures: &[(String, GradingError)]) -> ApiError {
    let ids: Vec<&str> = failures.iter().map(|(id, _)| id.as_str()).collect();
    let details = failures
        .iter()
        .map(|(id, err)| format!("{id}: {err}"))
        .collect::<Vec<_>>()
        .join("; ");

    if failures.iter().any(|(_, err)| err.is_caller_error()) {
        ApiError::BadRequest(format!("grading failed for questions [{}]: {details}", ids.join(", ")))
    } else {
        tracing::error!(question_ids = ?ids, error = %details, "Grading batch failed");
        ApiError::Internal(format!("grading failed for questions [{}]", ids.join(", ")))
    }
}

/// An attempt is only addressable through the assignment it was created
/// under; anything else reads as not-found, not forbidden.
pub(crate) fn ensure_in_assignment(
    attempt: &crate::db::models::AssignmentAttempt,
    assignment_id: &str,
) -> Result<(), ApiError> {
    if attempt.assignment_id != assignment_id {
        return Err(ApiError::NotFound(format!(
            "Attempt {} does not belong to assignment {assignment_id}",
            attempt.id
        )));
    }
    Ok(())
}

fn ensure_unique_question_ids(request: &SubmitAttemptRequest) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for input in &request.responses {
        if !seen.insert(input.question_id.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Duplicate response for question {}",
                input.question_id
            )));
        }
    }
    Ok(())
}

pub(crate) async fn submit(
    state: &AppState,
    attempt_id: &str,
    assignment_id: &str,
    request: SubmitAttemptRequest,
    mode: SubmissionMode,
) -> Result<SubmitAttemptResult, ApiError> {
    ensure_unique_question_ids(&request)?;
    let language = translation::normalize_language(request.language.as_deref());

    match mode {
        SubmissionMode::Persisted { user_id, outcome_token } => {
            submit_persisted(state, attempt_id, assignment_id, request, language, user_id, outcome_token)
                .await
        }
        SubmissionMode::Ephemeral => submit_ephemeral(state, request, language).await,
    }
}

async fn submit_persisted(
    state: &AppState,
    attempt_id: &str,
    assignment_id: &str,
    request: SubmitAttemptRequest,
    language: String,
    user_id: String,
    outcome_token: Option<String>,
) -> Result<SubmitAttemptResult, ApiError> {
    let now = primitive_now_utc();

    let attempt = attempts::find_by_id(state.db(), attempt_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::NotFound(format!("Attempt {attempt_id} not found")))?;

    ensure_in_assignment(&attempt, assignment_id)?;
    if attempt.user_id != user_id {
        return Err(ApiError::Forbidden("Attempt belongs to another user"));
    }
    if attempt.submitted {
        return Err(ApiError::Unprocessable("Attempt is already submitted".to_string()));
    }

    let assignment = assignments_find(state, assignment_id).await?;

    // Past the grace window the attempt becomes terminally submitted with a
    // zero grade and nothing is graded.
    if let Some(expires_at) = attempt.expires_at {
        let grace = state.settings().attempt().expiry_grace_seconds;
        if (now - expires_at).whole_seconds() > grace {
            attempts::mark_submitted(state.db(), attempt_id, 0.0, request.comments.as_deref(), now)
                .await
                .map_err(|err| ApiError::internal(err, "Failed to close expired attempt"))?;

            return Ok(expired_result(attempt_id, &assignment, &language));
        }
    }

    let live_questions = questions::list_live_by_assignment(state.db(), assignment_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load assignment questions"))?;
    let question_index: HashMap<&str, &Question> =
        live_questions.iter().map(|question| (question.id.as_str(), question)).collect();

    let variant_rows = attempt_variants::list_by_attempt(state.db(), attempt_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load attempt variants"))?;
    let variant_index: HashMap<&str, &crate::db::models::AttemptQuestionVariant> =
        variant_rows.iter().map(|row| (row.question_id.as_str(), row)).collect();

    // Resolve each response against the question as the learner saw it.
    let mut effective = Vec::with_capacity(request.responses.len());
    for input in &request.responses {
        let base = question_index.get(input.question_id.as_str()).ok_or_else(|| {
            ApiError::NotFound(format!("Question {} not found", input.question_id))
        })?;

        let row = variant_index.get(input.question_id.as_str());
        let variant_id = row.and_then(|r| r.variant_id.as_deref());

        let mut question = match variant_id {
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

        // The learner answered against the randomized snapshot order.
        if let Some(row) = row {
            if !row.choice_snapshot.0.is_empty() {
                question.choices = row.choice_snapshot.0.clone();
            }
        }

        if language != "en" {
            let variant_scoped = match variant_id {
                Some(id) => translations::find_for_question(state.db(), &base.id, Some(id), &language)
                    .await
                    .map_err(|err| ApiError::internal(err, "Failed to load translation"))?,
                None => None,
            };
            let question_scoped =
                translations::find_for_question(state.db(), &base.id, None, &language)
                    .await
                    .map_err(|err| ApiError::internal(err, "Failed to load translation"))?;
            translation::apply(&mut question, &language, variant_scoped.as_ref(), question_scoped.as_ref());
        }

        effective.push((input, question));
    }

    // Grading context is pre-fetched: persisted answers from this attempt,
    // overlaid with whatever arrived in this same submission.
    let context_ids: Vec<String> = effective
        .iter()
        .flat_map(|(_, question)| question.grading_context_question_ids.iter().cloned())
        .collect();
    let mut context_answers: HashMap<String, String> = HashMap::new();
    if !context_ids.is_empty() {
        let persisted = responses::list_for_questions(state.db(), attempt_id, &context_ids)
            .await
            .map_err(|err| ApiError::internal(err, "Failed to load grading context"))?;
        for row in persisted {
            let text = row
                .response
                .0
                .get("text")
                .and_then(|value| value.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| row.response.0.to_string());
            context_answers.insert(row.question_id, text);
        }
    }
    for input in &request.responses {
        context_answers.insert(input.question_id.clone(), context_text(&input.response));
    }

    let graded = grade_all(
        state,
        &assignment.id,
        &assignment.instructions,
        &language,
        &effective,
        &context_answers,
        &question_index,
    )
    .await?;

    let earned: Vec<f64> = graded.iter().map(|(_, _, outcome)| outcome.points).collect();
    let possible: Vec<f64> =
        live_questions.iter().map(|question| question.total_points).collect();
    let summary = score::aggregate(&earned, &possible);

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|err| ApiError::internal(err, "Failed to open transaction"))?;

    attempts::mark_submitted(&mut *tx, attempt_id, summary.grade, request.comments.as_deref(), now)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to mark attempt submitted"))?;

    for (question_id, _, outcome) in &graded {
        let id = Uuid::new_v4().to_string();
        responses::create(&mut *tx, responses::CreateResponse {
            id: &id,
            attempt_id,
            question_id,
            response: outcome.normalized_response.clone(),
            points: outcome.points,
            feedback: serde_json::to_value(&outcome.feedback)
                .map_err(|err| ApiError::internal(err, "Failed to serialize feedback"))?,
            created_at: now,
        })
        .await
        .map_err(|err| ApiError::internal(err, "Failed to persist response"))?;
    }

    tx.commit().await.map_err(|err| ApiError::internal(err, "Failed to commit submission"))?;

    metrics::counter!("gradeflow_attempts_submitted_total").increment(1);

    if request.callback_required {
        let token = outcome_token.ok_or_else(|| {
            ApiError::BadRequest("Grade callback requested without an outcome token".to_string())
        })?;
        let prior = attempts::best_grade(state.db(), assignment_id, &user_id)
            .await
            .map_err(|err| ApiError::internal(err, "Failed to load prior grades"))?
            .unwrap_or(0.0);
        let best = summary.grade.max(prior);

        state
            .recorder()
            .notify(best, &token)
            .await
            .map_err(|err| ApiError::internal(err, "Grade callback failed"))?;
    }

    let mut feedbacks = feedbacks_from(&graded, &question_index);
    visibility::apply_to_feedbacks(&mut feedbacks, &assignment);

    Ok(SubmitAttemptResult {
        id: attempt_id.to_string(),
        submitted: true,
        grade: assignment.show_assignment_score.then_some(summary.grade),
        total_points_earned: summary.total_points_earned,
        total_possible_points: summary.total_points_possible,
        feedbacks_for_questions: feedbacks,
        message: None,
    })
}

async fn submit_ephemeral(
    state: &AppState,
    request: SubmitAttemptRequest,
    language: String,
) -> Result<SubmitAttemptResult, ApiError> {
    let author_questions = request.author_questions.as_ref().ok_or_else(|| {
        ApiError::BadRequest("Author preview requires an inline question list".to_string())
    })?;

    let question_index: HashMap<&str, EffectiveQuestion> =
        author_questions
            .iter()
            .map(|input| {
                (input.id.as_str(), EffectiveQuestion::from_author(input))
            })
            .collect();

    let mut effective = Vec::with_capacity(request.responses.len());
    for input in &request.responses {
        let question = question_index.get(input.question_id.as_str()).ok_or_else(|| {
            ApiError::NotFound(format!("Question {} not found", input.question_id))
        })?;
        effective.push((input, question.clone()));
    }

    let mut context_answers: HashMap<String, String> = HashMap::new();
    for input in &request.responses {
        context_answers.insert(input.question_id.clone(), context_text(&input.response));
    }
    let question_texts: HashMap<String, String> = question_index
        .values()
        .map(|question| (question.id.clone(), question.text.clone()))
        .collect();

    let mut jobs = Vec::with_capacity(effective.len());
    for (input, question) in &effective {
        let prior_answers = prior_answers_for(question, &context_answers, |id| {
            question_texts.get(id).cloned()
        });
        let ctx = GradingContext {
            assignment_id: EPHEMERAL_ATTEMPT_ID.to_string(),
            instructions: String::new(),
            language: language.clone(),
            prior_answers,
        };
        jobs.push(async move {
            let outcome = state.dispatcher().grade(question, &input.response, &ctx).await;
            (input.question_id.clone(), question.total_points, outcome)
        });
    }
    let graded = collect_graded(join_all(jobs).await)?;

    let earned: Vec<f64> = graded.iter().map(|(_, _, outcome)| outcome.points).collect();
    let possible: Vec<f64> = author_questions.iter().map(|input| input.total_points).collect();
    let summary = score::aggregate(&earned, &possible);

    let feedbacks = graded
        .iter()
        .map(|(question_id, total_points, outcome)| QuestionFeedback {
            question_id: question_id.clone(),
            points: outcome.points,
            total_points: *total_points,
            feedback: outcome.feedback.clone(),
        })
        .collect();

    Ok(SubmitAttemptResult {
        id: EPHEMERAL_ATTEMPT_ID.to_string(),
        submitted: false,
        grade: Some(summary.grade),
        total_points_earned: summary.total_points_earned,
        total_possible_points: summary.total_points_possible,
        feedbacks_for_questions: feedbacks,
        message: None,
    })
}

/// Terminal result for an attempt closed past the grace window. The zero
/// grade is subject to the same score-visibility flag as a graded result.
fn expired_result(attempt_id: &str, assignment: &Assignment, language: &str) -> SubmitAttemptResult {
    SubmitAttemptResult {
        id: attempt_id.to_string(),
        submitted: true,
        grade: assignment.show_assignment_score.then_some(0.0),
        total_points_earned: 0.0,
        total_possible_points: 0.0,
        feedbacks_for_questions: Vec::new(),
        message: Some(messages::submitted_after_deadline(language)),
    }
}

async fn assignments_find(state: &AppState, assignment_id: &str) -> Result<Assignment, ApiError> {
    crate::repositories::assignments::find_by_id(state.db(), assignment_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load assignment"))?
        .ok_or_else(|| ApiError::NotFound(format!("Assignment {assignment_id} not found")))
}

fn prior_answers_for(
    question: &EffectiveQuestion,
    answers: &HashMap<String, String>,
    question_text: impl Fn(&str) -> Option<String>,
) -> Vec<ContextPair> {
    question
        .grading_context_question_ids
        .iter()
        .filter_map(|id| {
            let answer_text = answers.get(id)?.clone();
            Some(ContextPair {
                question_text: question_text(id).unwrap_or_default(),
                answer_text,
            })
        })
        .collect()
}

/// Fans the responses out to the dispatcher and joins on all of them.
async fn grade_all(
    state: &AppState,
    assignment_id: &str,
    instructions: &str,
    language: &str,
    effective: &[(&crate::schemas::attempt::ResponseInput, EffectiveQuestion)],
    context_answers: &HashMap<String, String>,
    question_index: &HashMap<&str, &Question>,
) -> Result<Vec<(String, f64, GradeOutcome)>, ApiError> {
    let mut jobs = Vec::with_capacity(effective.len());
    for (input, question) in effective {
        let prior_answers = prior_answers_for(question, context_answers, |id| {
            question_index.get(id).map(|q| q.text.clone())
        });
        let ctx = GradingContext {
            assignment_id: assignment_id.to_string(),
            instructions: instructions.to_string(),
            language: language.to_string(),
            prior_answers,
        };
        jobs.push(async move {
            let outcome = state.dispatcher().grade(question, &input.response, &ctx).await;
            (input.question_id.clone(), question.total_points, outcome)
        });
    }

    collect_graded(join_all(jobs).await)
}

/// Fan-in barrier: either every response graded, or the whole submission
/// fails with one aggregate error naming the failing questions.
fn collect_graded(
    results: Vec<(String, f64, Result<GradeOutcome, GradingError>)>,
) -> Result<Vec<(String, f64, GradeOutcome)>, ApiError> {
    let mut graded = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for (question_id, total_points, outcome) in results {
        match outcome {
            Ok(outcome) => graded.push((question_id, total_points, outcome)),
            Err(err) => failures.push((question_id, err)),
        }
    }

    if failures.is_empty() {
        Ok(graded)
    } else {
        Err(aggregate_failure(&failures))
    }
}

fn feedbacks_from(
    graded: &[(String, f64, GradeOutcome)],
    question_index: &HashMap<&str, &Question>,
) -> Vec<QuestionFeedback> {
    graded
        .iter()
        .map(|(question_id, total_points, outcome)| QuestionFeedback {
            question_id: question_id.clone(),
            points: outcome.points,
            total_points: question_index
                .get(question_id.as_str())
                .map(|question| question.total_points)
                .unwrap_or(*total_points),
            feedback: outcome.feedback.clone(),
        })
        .collect()
}
