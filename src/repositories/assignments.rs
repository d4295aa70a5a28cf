use crate::db::models::Assignment;

pub(crate) const COLUMNS: &str = "\
    id, title, instructions, display_order, question_order, alloted_time_minutes, \
    max_attempts, window_max_attempts, window_minutes, passing_grade, \
    show_assignment_score, show_question_score, show_submission_feedback, \
    show_rubrics_to_learner, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}
