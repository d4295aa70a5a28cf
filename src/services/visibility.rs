use serde_json::Value;

use crate::db::models::{Assignment, Choice};
use crate::schemas::attempt::{AttemptView, ChoiceView, QuestionFeedback};

/// Placeholder returned in place of a question's score when the assignment
/// hides per-question scores.
pub(crate) const MASKED_SCORE: f64 = -1.0;

/// Projects a choice for the caller. Learners never see grading fields.
pub(crate) fn choice_view(choice: &Choice, reveal_grading_fields: bool) -> ChoiceView {
    if reveal_grading_fields {
        ChoiceView {
            id: choice.id.clone(),
            text: choice.text.clone(),
            is_correct: Some(choice.is_correct),
            points: Some(choice.points),
            feedback: choice.feedback.clone(),
        }
    } else {
        ChoiceView {
            id: choice.id.clone(),
            text: choice.text.clone(),
            is_correct: None,
            points: None,
            feedback: None,
        }
    }
}

/// Removes rubric detail from a scoring block unless the assignment exposes
/// it. Returns None when nothing displayable remains.
pub(crate) fn visible_scoring(scoring: &Value, show_rubrics: bool) -> Option<Value> {
    let mut scoring = scoring.clone();
    if !show_rubrics {
        if let Some(map) = scoring.as_object_mut() {
            map.remove("rubrics");
        }
    }
    match &scoring {
        Value::Object(map) if map.is_empty() => None,
        Value::Null => None,
        _ => Some(scoring),
    }
}

/// Redacts a full attempt view for a learner per the assignment's display
/// flags. The grading path never goes through here.
pub(crate) fn apply_to_view(view: &mut AttemptView, assignment: &Assignment) {
    if !assignment.show_assignment_score {
        view.grade = None;
    }

    for question in &mut view.questions {
        // The canonical answer never reaches a learner.
        question.answer = None;

        question.scoring = question
            .scoring
            .take()
            .and_then(|scoring| visible_scoring(&scoring, assignment.show_rubrics_to_learner));

        for choice in &mut question.choices {
            choice.is_correct = None;
            choice.points = None;
            choice.feedback = None;
        }

        if question.points.is_some() && !assignment.show_question_score {
            question.points = Some(MASKED_SCORE);
        }
        if !assignment.show_submission_feedback {
            question.feedback = None;
        }
    }
}

/// Redacts the per-question feedback list returned from a submission.
pub(crate) fn apply_to_feedbacks(feedbacks: &mut [QuestionFeedback], assignment: &Assignment) {
    for feedback in feedbacks.iter_mut() {
        if !assignment.show_question_score {
            feedback.points = MASKED_SCORE;
        }
        if !assignment.show_submission_feedback {
            feedback.feedback.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use crate::db::models::FeedbackEntry;
    use crate::db::types::{DisplayOrder, QuestionType};
    use crate::schemas::attempt::AttemptQuestionView;
    use crate::services::grading::testing::choice;

    use super::*;

    fn assignment() -> Assignment {
        Assignment {
            id: "assignment-1".to_string(),
            title: "Quiz".to_string(),
            instructions: String::new(),
            display_order: DisplayOrder::Natural,
            question_order: None,
            alloted_time_minutes: None,
            max_attempts: None,
            window_max_attempts: None,
            window_minutes: None,
            passing_grade: 0.6,
            show_assignment_score: true,
            show_question_score: true,
            show_submission_feedback: true,
            show_rubrics_to_learner: false,
            created_at: datetime!(2026-01-01 00:00:00),
            updated_at: datetime!(2026-01-01 00:00:00),
        }
    }

    fn view() -> AttemptView {
        AttemptView {
            id: "attempt-1".to_string(),
            assignment_id: "assignment-1".to_string(),
            submitted: true,
            grade: Some(0.8),
            passing_grade: 0.6,
            expires_at: None,
            show_assignment_score: true,
            show_question_score: true,
            show_submission_feedback: true,
            questions: vec![AttemptQuestionView {
                id: "question-1".to_string(),
                text: "Pick one".to_string(),
                question_type: QuestionType::SingleCorrect,
                response_subtype: None,
                choices: vec![choice_view(&choice("a", "A", true, 5.0), true)],
                scoring: Some(json!({ "rubrics": ["thorough"], "style": "strict" })),
                total_points: 5.0,
                answer: Some("A".to_string()),
                response: None,
                points: Some(5.0),
                feedback: Some(vec![FeedbackEntry {
                    message: "well done".to_string(),
                    is_correct: Some(true),
                }]),
            }],
        }
    }

    #[test]
    fn answer_and_choice_grading_fields_are_always_stripped() {
        let mut view = view();
        apply_to_view(&mut view, &assignment());

        let question = &view.questions[0];
        assert!(question.answer.is_none());
        assert!(question.choices[0].is_correct.is_none());
        assert!(question.choices[0].points.is_none());
        assert!(question.choices[0].feedback.is_none());
    }

    #[test]
    fn rubrics_are_dropped_unless_exposed() {
        let mut view = view();
        apply_to_view(&mut view, &assignment());
        let scoring = view.questions[0].scoring.as_ref().unwrap();
        assert!(scoring.get("rubrics").is_none());
        assert_eq!(scoring["style"], "strict");

        let mut view = self::view();
        let mut assignment = assignment();
        assignment.show_rubrics_to_learner = true;
        apply_to_view(&mut view, &assignment);
        assert!(view.questions[0].scoring.as_ref().unwrap().get("rubrics").is_some());
    }

    #[test]
    fn hidden_question_score_is_masked_not_removed() {
        let mut view = view();
        let mut assignment = assignment();
        assignment.show_question_score = false;
        apply_to_view(&mut view, &assignment);
        assert_eq!(view.questions[0].points, Some(MASKED_SCORE));
    }

    #[test]
    fn hidden_assignment_score_drops_the_grade() {
        let mut view = view();
        let mut assignment = assignment();
        assignment.show_assignment_score = false;
        apply_to_view(&mut view, &assignment);
        assert!(view.grade.is_none());
    }

    #[test]
    fn hidden_feedback_is_removed_everywhere() {
        let mut assignment = assignment();
        assignment.show_submission_feedback = false;

        let mut view = view();
        apply_to_view(&mut view, &assignment);
        assert!(view.questions[0].feedback.is_none());

        let mut feedbacks = vec![QuestionFeedback {
            question_id: "question-1".to_string(),
            points: 5.0,
            total_points: 5.0,
            feedback: vec![FeedbackEntry { message: "hi".to_string(), is_correct: None }],
        }];
        apply_to_feedbacks(&mut feedbacks, &assignment);
        assert!(feedbacks[0].feedback.is_empty());
    }
}
