use async_trait::async_trait;
use serde_json::json;

use crate::db::models::{Choice, FeedbackEntry};
use crate::schemas::attempt::ResponsePayload;

use super::messages;
use super::normalize::{normalize_text, render_template};
use super::{EffectiveQuestion, GradeOutcome, GradingContext, GradingError, GradingStrategy};

/// Matches a learner selection against the canonical choices: stable id
/// first, normalized text as the fallback.
fn find_choice<'a>(choices: &'a [Choice], selection: &str) -> Option<&'a Choice> {
    let trimmed = selection.trim();
    if let Some(found) =
        choices.iter().find(|choice| choice.id.as_deref() == Some(trimmed))
    {
        return Some(found);
    }

    let normalized = normalize_text(selection);
    choices.iter().find(|choice| normalize_text(&choice.text) == normalized)
}

fn choice_feedback(choice: &Choice, language: &str, fallback: String) -> String {
    match &choice.feedback {
        Some(template) => render_template(
            template,
            &[
                ("answer", choice.text.as_str()),
                ("points", &format!("{}", choice.points)),
                ("language", language),
            ],
        ),
        None => fallback,
    }
}

pub(crate) struct TrueFalseStrategy;

#[async_trait]
impl GradingStrategy for TrueFalseStrategy {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        let learner_value = response.boolean.ok_or_else(|| {
            GradingError::InvalidResponse(
                "true/false question requires a boolean response".to_string(),
            )
        })?;

        // The authored truth lives on the first choice.
        let correct_value = question
            .choices
            .first()
            .map(|choice| choice.is_correct)
            .ok_or_else(|| {
                GradingError::InvalidResponse("true/false question has no choices".to_string())
            })?;

        let matched = learner_value == correct_value;
        let correct_label = if correct_value {
            messages::true_label(&ctx.language)
        } else {
            messages::false_label(&ctx.language)
        };

        Ok(GradeOutcome {
            points: if matched { question.total_points } else { 0.0 },
            feedback: vec![FeedbackEntry {
                message: messages::correct_answer_is(&ctx.language, correct_label),
                is_correct: Some(matched),
            }],
            normalized_response: json!({ "boolean": learner_value }),
        })
    }
}

pub(crate) struct SingleCorrectStrategy;

#[async_trait]
impl GradingStrategy for SingleCorrectStrategy {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        let selection = response
            .choice
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                GradingError::InvalidResponse(
                    "single-choice question requires a selected choice".to_string(),
                )
            })?;

        let Some(matched) = find_choice(&question.choices, selection) else {
            return Ok(GradeOutcome {
                points: 0.0,
                feedback: vec![FeedbackEntry {
                    message: messages::invalid_selection(&ctx.language),
                    is_correct: Some(false),
                }],
                normalized_response: json!({ "choice": normalize_text(selection) }),
            });
        };

        let (points, message) = if matched.is_correct {
            (
                matched.points,
                choice_feedback(
                    matched,
                    &ctx.language,
                    messages::correct_answer_is(&ctx.language, &matched.text),
                ),
            )
        } else {
            let correct_text = question
                .choices
                .iter()
                .find(|choice| choice.is_correct)
                .map(|choice| choice.text.as_str())
                .unwrap_or_default();
            (
                0.0,
                choice_feedback(
                    matched,
                    &ctx.language,
                    messages::correct_answer_is(&ctx.language, correct_text),
                ),
            )
        };

        Ok(GradeOutcome {
            points,
            feedback: vec![FeedbackEntry { message, is_correct: Some(matched.is_correct) }],
            normalized_response: json!({ "choice": normalize_text(&matched.text) }),
        })
    }
}

pub(crate) struct MultipleCorrectStrategy;

#[async_trait]
impl GradingStrategy for MultipleCorrectStrategy {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        let selections = response
            .choices
            .as_deref()
            .filter(|values| !values.is_empty())
            .ok_or_else(|| {
                GradingError::InvalidResponse(
                    "multiple-choice question requires selected choices".to_string(),
                )
            })?;

        let mut earned = 0.0;
        let mut matched_texts: Vec<String> = Vec::new();
        let mut feedback = Vec::new();

        for selection in selections {
            match find_choice(&question.choices, selection) {
                Some(choice) => {
                    if !matched_texts.contains(&choice.text) {
                        earned += choice.points;
                        matched_texts.push(choice.text.clone());
                    }
                }
                None => {
                    feedback.push(FeedbackEntry {
                        message: messages::invalid_selection(&ctx.language),
                        is_correct: Some(false),
                    });
                }
            }
        }

        let max_points: f64 = question
            .choices
            .iter()
            .filter(|choice| choice.is_correct)
            .map(|choice| choice.points)
            .sum();
        let points = earned.clamp(0.0, max_points.max(0.0));

        let missing: Vec<&str> = question
            .choices
            .iter()
            .filter(|choice| choice.is_correct && !matched_texts.contains(&choice.text))
            .map(|choice| choice.text.as_str())
            .collect();

        if missing.is_empty() {
            feedback.push(FeedbackEntry {
                message: messages::all_correct_selected(&ctx.language),
                is_correct: Some(true),
            });
        } else {
            feedback.push(FeedbackEntry {
                message: messages::missing_correct_options(&ctx.language, &missing.join(", ")),
                is_correct: Some(false),
            });
        }

        let normalized: Vec<String> =
            matched_texts.iter().map(|text| normalize_text(text)).collect();

        Ok(GradeOutcome {
            points,
            feedback,
            normalized_response: json!({ "choices": normalized }),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::types::QuestionType;
    use crate::services::grading::testing::{choice, context, question};

    use super::*;

    fn true_false_question(answer: bool) -> EffectiveQuestion {
        question(QuestionType::TrueFalse, vec![choice("c1", "True", answer, 10.0)])
    }

    #[tokio::test]
    async fn true_false_awards_full_points_on_match() {
        let question = true_false_question(true);
        let payload = ResponsePayload { boolean: Some(true), ..Default::default() };

        let outcome =
            TrueFalseStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 10.0);
        assert_eq!(outcome.feedback[0].is_correct, Some(true));
    }

    #[tokio::test]
    async fn true_false_cites_correct_label_on_mismatch() {
        let question = true_false_question(true);
        let payload = ResponsePayload { boolean: Some(false), ..Default::default() };

        let outcome =
            TrueFalseStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 0.0);
        assert!(outcome.feedback[0].message.contains("True"));
        assert_eq!(outcome.feedback[0].is_correct, Some(false));
    }

    #[tokio::test]
    async fn true_false_without_boolean_is_invalid() {
        let question = true_false_question(true);
        let payload = ResponsePayload { text: Some("yes".to_string()), ..Default::default() };

        let error =
            TrueFalseStrategy.grade(&question, &payload, &context()).await.expect_err("error");
        assert!(error.is_caller_error());
    }

    fn capitals() -> EffectiveQuestion {
        question(
            QuestionType::SingleCorrect,
            vec![
                choice("a", "Paris", true, 5.0),
                choice("b", "Lyon", false, 0.0),
                choice("c", "Marseille", false, 0.0),
            ],
        )
    }

    #[tokio::test]
    async fn single_correct_matches_after_normalization() {
        let question = capitals();
        let payload =
            ResponsePayload { choice: Some("  PARIS. ".to_string()), ..Default::default() };

        let outcome =
            SingleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 5.0);
        assert_eq!(outcome.feedback[0].is_correct, Some(true));
    }

    #[tokio::test]
    async fn single_correct_matches_by_stable_id() {
        let question = capitals();
        let payload = ResponsePayload { choice: Some("a".to_string()), ..Default::default() };

        let outcome =
            SingleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 5.0);
    }

    #[tokio::test]
    async fn single_correct_unmatched_selection_reports_invalid() {
        let question = capitals();
        let payload = ResponsePayload { choice: Some("Berlin".to_string()), ..Default::default() };

        let outcome =
            SingleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 0.0);
        assert_eq!(outcome.feedback[0].message, messages::invalid_selection("en"));
    }

    #[tokio::test]
    async fn single_correct_wrong_choice_cites_correct_answer() {
        let question = capitals();
        let payload = ResponsePayload { choice: Some("Lyon".to_string()), ..Default::default() };

        let outcome =
            SingleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 0.0);
        assert!(outcome.feedback[0].message.contains("Paris"));
    }

    #[tokio::test]
    async fn single_correct_choice_template_overrides_generic_message() {
        let mut question = capitals();
        question.choices[0].feedback = Some("Well done, ${answer} earns ${points} pts".to_string());
        let payload = ResponsePayload { choice: Some("paris".to_string()), ..Default::default() };

        let outcome =
            SingleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.feedback[0].message, "Well done, Paris earns 5 pts");
    }

    fn multi() -> EffectiveQuestion {
        question(
            QuestionType::MultipleCorrect,
            vec![
                choice("a", "A", true, 5.0),
                choice("b", "B", true, 5.0),
                choice("c", "C", false, 0.0),
            ],
        )
    }

    #[tokio::test]
    async fn multiple_correct_partial_selection_names_missing_option() {
        let question = multi();
        let payload = ResponsePayload {
            choices: Some(vec!["A".to_string(), "C".to_string()]),
            ..Default::default()
        };

        let outcome =
            MultipleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 5.0);
        let summary = outcome.feedback.last().expect("summary");
        assert!(summary.message.contains('B'));
        assert_eq!(summary.is_correct, Some(false));
    }

    #[tokio::test]
    async fn multiple_correct_full_selection_reports_all_correct() {
        let question = multi();
        let payload = ResponsePayload {
            choices: Some(vec!["a".to_string(), "b".to_string()]),
            ..Default::default()
        };

        let outcome =
            MultipleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 10.0);
        assert_eq!(outcome.feedback.last().map(|entry| entry.is_correct), Some(Some(true)));
    }

    #[tokio::test]
    async fn multiple_correct_clamps_to_correct_point_sum() {
        let mut question = multi();
        // A distractor that would push the raw sum above the correct total.
        question.choices.push(choice("d", "D", false, 20.0));
        let payload = ResponsePayload {
            choices: Some(vec!["a".to_string(), "b".to_string(), "d".to_string()]),
            ..Default::default()
        };

        let outcome =
            MultipleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 10.0);
    }

    #[tokio::test]
    async fn multiple_correct_duplicate_selection_counts_once() {
        let question = multi();
        let payload = ResponsePayload {
            choices: Some(vec!["a".to_string(), "A.".to_string()]),
            ..Default::default()
        };

        let outcome =
            MultipleCorrectStrategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 5.0);
    }
}
