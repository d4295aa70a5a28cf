use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::db::models::{Assignment, Choice, Question, QuestionVariant};
use crate::db::types::DisplayOrder;

/// Resolves the question id sequence frozen onto a new attempt. `RANDOM`
/// shuffles the live set; an explicit question order stable-sorts by index
/// in that list with unknown ids last; otherwise authored order stands.
pub(crate) fn order_questions(
    assignment: &Assignment,
    questions: &[Question],
    rng: &mut StdRng,
) -> Vec<String> {
    let mut ids: Vec<String> = questions.iter().map(|question| question.id.clone()).collect();

    match assignment.display_order {
        DisplayOrder::Random => {
            ids.shuffle(rng);
        }
        DisplayOrder::Natural => {
            if let Some(order) = &assignment.question_order {
                let position = |id: &String| {
                    order.0.iter().position(|candidate| candidate == id).unwrap_or(usize::MAX)
                };
                ids.sort_by_key(position);
            }
        }
    }

    ids
}

/// The entity chosen for one question within one attempt: which variant (if
/// any) and the choice order the learner will see.
#[derive(Debug, Clone)]
pub(crate) struct VariantSelection {
    pub(crate) variant_id: Option<String>,
    pub(crate) choice_snapshot: Vec<Choice>,
}

/// Picks uniformly among the base question and its live variants, then
/// shuffles the chosen entity's choices when it enables randomization.
pub(crate) fn select_variant(
    question: &Question,
    variants: &[QuestionVariant],
    rng: &mut StdRng,
) -> VariantSelection {
    let pick = rng.gen_range(0..=variants.len());

    let (variant_id, mut snapshot, randomize) = if pick == 0 {
        (None, question.choices.0.clone(), question.randomize_choices)
    } else {
        let variant = &variants[pick - 1];
        let choices = variant
            .choices
            .as_ref()
            .map(|choices| choices.0.clone())
            .unwrap_or_else(|| question.choices.0.clone());
        (Some(variant.id.clone()), choices, variant.randomize_choices)
    };

    if randomize {
        snapshot.shuffle(rng);
    }

    VariantSelection { variant_id, choice_snapshot: snapshot }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use sqlx::types::Json;
    use time::macros::datetime;

    use crate::db::types::QuestionType;
    use crate::services::grading::testing::choice;

    use super::*;

    fn assignment(display_order: DisplayOrder, order: Option<Vec<&str>>) -> Assignment {
        Assignment {
            id: "assignment-1".to_string(),
            title: "Quiz".to_string(),
            instructions: String::new(),
            display_order,
            question_order: order
                .map(|ids| Json(ids.into_iter().map(str::to_string).collect())),
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

    fn question(id: &str, order_index: i32, choices: Vec<Choice>, randomize: bool) -> Question {
        Question {
            id: id.to_string(),
            assignment_id: "assignment-1".to_string(),
            text: format!("question {id}"),
            question_type: QuestionType::SingleCorrect,
            response_subtype: None,
            scoring: Json(serde_json::json!({})),
            choices: Json(choices),
            randomize_choices: randomize,
            grading_context_question_ids: Json(Vec::new()),
            total_points: 5.0,
            max_chars: None,
            answer: None,
            order_index,
            is_deleted: false,
            created_at: datetime!(2026-01-01 00:00:00),
            updated_at: datetime!(2026-01-01 00:00:00),
        }
    }

    fn variant(id: &str, choices: Option<Vec<Choice>>, randomize: bool) -> QuestionVariant {
        QuestionVariant {
            id: id.to_string(),
            question_id: "q1".to_string(),
            text: format!("variant {id}"),
            choices: choices.map(Json),
            scoring: None,
            randomize_choices: randomize,
            max_chars: None,
            answer: None,
            is_deleted: false,
            created_at: datetime!(2026-01-01 00:00:00),
            updated_at: datetime!(2026-01-01 00:00:00),
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            question("q1", 0, Vec::new(), false),
            question("q2", 1, Vec::new(), false),
            question("q3", 2, Vec::new(), false),
        ]
    }

    #[test]
    fn random_order_is_a_permutation_of_the_live_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let ordered =
            order_questions(&assignment(DisplayOrder::Random, None), &questions(), &mut rng);

        let mut sorted = ordered.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn random_order_is_deterministic_per_seed() {
        let assignment = assignment(DisplayOrder::Random, None);
        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);

        assert_eq!(
            order_questions(&assignment, &questions(), &mut first),
            order_questions(&assignment, &questions(), &mut second),
        );
    }

    #[test]
    fn explicit_order_sorts_by_index_with_unknown_ids_last() {
        let mut rng = StdRng::seed_from_u64(7);
        let assignment = assignment(DisplayOrder::Natural, Some(vec!["q3", "q1"]));

        let ordered = order_questions(&assignment, &questions(), &mut rng);
        assert_eq!(ordered, vec!["q3", "q1", "q2"]);
    }

    #[test]
    fn natural_order_keeps_authored_sequence() {
        let mut rng = StdRng::seed_from_u64(7);
        let ordered =
            order_questions(&assignment(DisplayOrder::Natural, None), &questions(), &mut rng);
        assert_eq!(ordered, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn variant_pick_stays_within_base_and_live_variants() {
        let question = question("q1", 0, vec![choice("a", "A", true, 5.0)], false);
        let variants = vec![variant("v1", None, false), variant("v2", None, false)];

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = select_variant(&question, &variants, &mut rng);
            assert!(matches!(
                selection.variant_id.as_deref(),
                None | Some("v1") | Some("v2")
            ));
        }
    }

    #[test]
    fn snapshot_is_a_permutation_of_the_canonical_choices() {
        let canonical = vec![
            choice("a", "A", true, 5.0),
            choice("b", "B", false, 0.0),
            choice("c", "C", false, 0.0),
            choice("d", "D", false, 0.0),
        ];
        let question = question("q1", 0, canonical.clone(), true);

        let mut rng = StdRng::seed_from_u64(3);
        let selection = select_variant(&question, &[], &mut rng);

        assert_eq!(selection.choice_snapshot.len(), canonical.len());
        for choice in &canonical {
            assert!(selection.choice_snapshot.iter().any(|c| c.id == choice.id));
        }
    }

    #[test]
    fn variant_without_choices_falls_back_to_base_choices() {
        let canonical = vec![choice("a", "A", true, 5.0)];
        let question = question("q1", 0, canonical.clone(), false);
        let variants = vec![variant("v1", None, false)];

        // Seed picked so the variant is selected.
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = select_variant(&question, &variants, &mut rng);
            if selection.variant_id.is_some() {
                assert_eq!(selection.choice_snapshot, canonical);
                return;
            }
        }
        panic!("no seed selected the variant");
    }

    #[test]
    fn unrandomized_entity_keeps_canonical_choice_order() {
        let canonical = vec![
            choice("a", "A", true, 5.0),
            choice("b", "B", false, 0.0),
        ];
        let question = question("q1", 0, canonical.clone(), false);

        let mut rng = StdRng::seed_from_u64(9);
        let selection = select_variant(&question, &[], &mut rng);
        assert_eq!(selection.choice_snapshot, canonical);
    }
}
