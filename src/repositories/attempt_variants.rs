use time::PrimitiveDateTime;

use crate::db::models::AttemptQuestionVariant;

pub(crate) const COLUMNS: &str =
    "id, attempt_id, question_id, variant_id, choice_snapshot, created_at";

pub(crate) struct CreateAttemptVariant<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) variant_id: Option<&'a str>,
    pub(crate) choice_snapshot: serde_json::Value,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    row: CreateAttemptVariant<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO attempt_question_variants (
            id, attempt_id, question_id, variant_id, choice_snapshot, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6)",
    )
    .bind(row.id)
    .bind(row.attempt_id)
    .bind(row.question_id)
    .bind(row.variant_id)
    .bind(row.choice_snapshot)
    .bind(row.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<AttemptQuestionVariant>, sqlx::Error> {
    sqlx::query_as::<_, AttemptQuestionVariant>(&format!(
        "SELECT {COLUMNS} FROM attempt_question_variants WHERE attempt_id = $1"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}
