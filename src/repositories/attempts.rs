use time::PrimitiveDateTime;

use crate::db::models::AssignmentAttempt;

pub(crate) const COLUMNS: &str = "\
    id, assignment_id, user_id, question_order, random_seed, expires_at, \
    submitted, grade, comments, created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) assignment_id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) question_order: serde_json::Value,
    pub(crate) random_seed: i64,
    pub(crate) expires_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO assignment_attempts (
            id, assignment_id, user_id, question_order, random_seed, expires_at,
            submitted, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,FALSE,$7,$8)
        ON CONFLICT DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.assignment_id)
    .bind(attempt.user_id)
    .bind(attempt.question_order)
    .bind(attempt.random_seed)
    .bind(attempt.expires_at)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<AssignmentAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentAttempt>(&format!(
        "SELECT {COLUMNS} FROM assignment_attempts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// An ongoing attempt is unsubmitted and either untimed or not yet expired.
pub(crate) async fn find_ongoing(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: &str,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<AssignmentAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentAttempt>(&format!(
        "SELECT {COLUMNS} FROM assignment_attempts \
         WHERE assignment_id = $1 AND user_id = $2 AND submitted = FALSE \
           AND (expires_at IS NULL OR expires_at > $3) \
         LIMIT 1"
    ))
    .bind(assignment_id)
    .bind(user_id)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_for_user(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: &str,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM assignment_attempts WHERE assignment_id = $1 AND user_id = $2",
    )
    .bind(assignment_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn count_created_since(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: &str,
    user_id: &str,
    cutoff: PrimitiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM assignment_attempts \
         WHERE assignment_id = $1 AND user_id = $2 AND created_at >= $3",
    )
    .bind(assignment_id)
    .bind(user_id)
    .bind(cutoff)
    .fetch_one(executor)
    .await
}

pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    grade: f64,
    comments: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE assignment_attempts \
         SET submitted = TRUE, grade = $2, comments = COALESCE($3, comments), updated_at = $4 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(grade)
    .bind(comments)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

/// Highest grade across this user's submitted attempts for the assignment.
pub(crate) async fn best_grade(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: &str,
    user_id: &str,
) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT MAX(grade) FROM assignment_attempts \
         WHERE assignment_id = $1 AND user_id = $2 AND submitted = TRUE",
    )
    .bind(assignment_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Serializes concurrent attempt creation for one (assignment, user) pair
/// within the surrounding transaction.
pub(crate) async fn acquire_assignment_user_lock(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: &str,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(assignment_id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(())
}
