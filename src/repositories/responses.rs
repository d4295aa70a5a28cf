use time::PrimitiveDateTime;

use crate::db::models::QuestionResponse;

pub(crate) const COLUMNS: &str =
    "id, attempt_id, question_id, response, points, feedback, created_at";

pub(crate) struct CreateResponse<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) response: serde_json::Value,
    pub(crate) points: f64,
    pub(crate) feedback: serde_json::Value,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    row: CreateResponse<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO question_responses (
            id, attempt_id, question_id, response, points, feedback, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)",
    )
    .bind(row.id)
    .bind(row.attempt_id)
    .bind(row.question_id)
    .bind(row.response)
    .bind(row.points)
    .bind(row.feedback)
    .bind(row.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<QuestionResponse>, sqlx::Error> {
    sqlx::query_as::<_, QuestionResponse>(&format!(
        "SELECT {COLUMNS} FROM question_responses WHERE attempt_id = $1"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// Prior answers used as grading context for multi-step questions.
pub(crate) async fn list_for_questions(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_ids: &[String],
) -> Result<Vec<QuestionResponse>, sqlx::Error> {
    sqlx::query_as::<_, QuestionResponse>(&format!(
        "SELECT {COLUMNS} FROM question_responses \
         WHERE attempt_id = $1 AND question_id = ANY($2)"
    ))
    .bind(attempt_id)
    .bind(question_ids)
    .fetch_all(executor)
    .await
}
