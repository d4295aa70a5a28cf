use rand::rngs::StdRng;
use rand::SeedableRng;
use time::Duration;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::{assignments, attempt_variants, attempts, questions};
use crate::schemas::attempt::CreateAttemptResponse;
use crate::services::randomization;

/// Creates one attempt with a frozen question order and per-question
/// variant/choice snapshot. The whole sequence runs in one transaction under
/// an advisory lock so concurrent calls for the same (assignment, user) pair
/// cannot race past the eligibility gates.
pub(crate) async fn create(
    state: &AppState,
    assignment_id: &str,
    user_id: &str,
) -> Result<CreateAttemptResponse, ApiError> {
    let now = primitive_now_utc();

    let assignment = assignments::find_by_id(state.db(), assignment_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load assignment"))?
        .ok_or_else(|| ApiError::NotFound(format!("Assignment {assignment_id} not found")))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|err| ApiError::internal(err, "Failed to open transaction"))?;

    attempts::acquire_assignment_user_lock(&mut *tx, assignment_id, user_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to acquire attempt lock"))?;

    let ongoing = attempts::find_ongoing(&mut *tx, assignment_id, user_id, now)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to check ongoing attempts"))?;
    if ongoing.is_some() {
        return Err(ApiError::Unprocessable("An ongoing attempt already exists".to_string()));
    }

    if let (Some(cap), Some(minutes)) =
        (assignment.window_max_attempts, assignment.window_minutes)
    {
        let cutoff = now - Duration::minutes(i64::from(minutes));
        let recent = attempts::count_created_since(&mut *tx, assignment_id, user_id, cutoff)
            .await
            .map_err(|err| ApiError::internal(err, "Failed to count recent attempts"))?;
        if recent >= i64::from(cap) {
            return Err(ApiError::Unprocessable(
                "Attempt limit for the current time window exceeded".to_string(),
            ));
        }
    }

    // A null max means unlimited attempts.
    if let Some(max) = assignment.max_attempts {
        let total = attempts::count_for_user(&mut *tx, assignment_id, user_id)
            .await
            .map_err(|err| ApiError::internal(err, "Failed to count attempts"))?;
        if total >= i64::from(max) {
            return Err(ApiError::Unprocessable("Maximum attempts exceeded".to_string()));
        }
    }

    let live_questions = questions::list_live_by_assignment(&mut *tx, assignment_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load assignment questions"))?;

    // The seed is persisted with the attempt so the randomization that the
    // learner saw can be reproduced later.
    let random_seed: i64 = rand::random();
    let mut rng = StdRng::seed_from_u64(random_seed as u64);

    let question_order = randomization::order_questions(&assignment, &live_questions, &mut rng);
    let expires_at = assignment
        .alloted_time_minutes
        .map(|minutes| now + Duration::minutes(i64::from(minutes)));

    let attempt_id = Uuid::new_v4().to_string();
    let created = attempts::create(&mut *tx, attempts::CreateAttempt {
        id: &attempt_id,
        assignment_id,
        user_id,
        question_order: serde_json::to_value(&question_order)
            .map_err(|err| ApiError::internal(err, "Failed to serialize question order"))?,
        random_seed,
        expires_at,
        created_at: now,
        updated_at: now,
    })
    .await
    .map_err(|err| ApiError::internal(err, "Failed to create attempt"))?;
    if !created {
        return Err(ApiError::Unprocessable("Attempt already exists".to_string()));
    }

    for question in &live_questions {
        let variants = questions::list_live_variants(&mut *tx, &question.id)
            .await
            .map_err(|err| ApiError::internal(err, "Failed to load question variants"))?;
        let selection = randomization::select_variant(question, &variants, &mut rng);

        let row_id = Uuid::new_v4().to_string();
        attempt_variants::create(&mut *tx, attempt_variants::CreateAttemptVariant {
            id: &row_id,
            attempt_id: &attempt_id,
            question_id: &question.id,
            variant_id: selection.variant_id.as_deref(),
            choice_snapshot: serde_json::to_value(&selection.choice_snapshot)
                .map_err(|err| ApiError::internal(err, "Failed to serialize choice snapshot"))?,
            created_at: now,
        })
        .await
        .map_err(|err| ApiError::internal(err, "Failed to persist attempt variant"))?;
    }

    tx.commit().await.map_err(|err| ApiError::internal(err, "Failed to commit attempt"))?;

    metrics::counter!("gradeflow_attempts_created_total").increment(1);
    tracing::info!(attempt_id = %attempt_id, assignment_id, "Attempt created");

    Ok(CreateAttemptResponse { id: attempt_id, success: true })
}
