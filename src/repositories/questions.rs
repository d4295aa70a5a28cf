use crate::db::models::{Question, QuestionVariant};

pub(crate) const COLUMNS: &str = "\
    id, assignment_id, text, question_type, response_subtype, scoring, choices, \
    randomize_choices, grading_context_question_ids, total_points, max_chars, \
    answer, order_index, is_deleted, created_at, updated_at";

pub(crate) const VARIANT_COLUMNS: &str = "\
    id, question_id, text, choices, scoring, randomize_choices, max_chars, \
    answer, is_deleted, created_at, updated_at";

/// Live (non-deleted) questions of an assignment in authoring order.
pub(crate) async fn list_live_by_assignment(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions \
         WHERE assignment_id = $1 AND is_deleted = FALSE ORDER BY order_index"
    ))
    .bind(assignment_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_live_variants(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<Vec<QuestionVariant>, sqlx::Error> {
    sqlx::query_as::<_, QuestionVariant>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM question_variants \
         WHERE question_id = $1 AND is_deleted = FALSE ORDER BY created_at"
    ))
    .bind(question_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_variant_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<QuestionVariant>, sqlx::Error> {
    sqlx::query_as::<_, QuestionVariant>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM question_variants WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}
