use crate::db::models::Translation;

pub(crate) const COLUMNS: &str =
    "id, question_id, variant_id, language, text, choices, created_at";

pub(crate) async fn find_for_question(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
    variant_id: Option<&str>,
    language: &str,
) -> Result<Option<Translation>, sqlx::Error> {
    sqlx::query_as::<_, Translation>(&format!(
        "SELECT {COLUMNS} FROM translations \
         WHERE question_id = $1 AND variant_id IS NOT DISTINCT FROM $2 AND language = $3"
    ))
    .bind(question_id)
    .bind(variant_id)
    .bind(language)
    .fetch_optional(executor)
    .await
}
