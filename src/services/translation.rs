use crate::db::models::{Choice, Translation};
use crate::services::grading::normalize::normalize_text;
use crate::services::grading::EffectiveQuestion;

/// Reduces a requested language tag to its base subtag: "es-MX" and "es_MX"
/// both resolve to "es". Missing or empty input defaults to English.
pub(crate) fn normalize_language(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .split(['-', '_'])
                .next()
                .unwrap_or(value)
                .to_ascii_lowercase()
        })
        .unwrap_or_else(|| "en".to_string())
}

/// Rewrites each choice's display fields from its translated counterpart,
/// matched by stable id or normalized text. The input order (which may
/// already be randomized) is preserved, so position i still names the same
/// logical choice in both lists. Choices with no translated counterpart keep
/// their source text.
pub(crate) fn translate_choices(ordered: &[Choice], translated: &[Choice]) -> Vec<Choice> {
    ordered
        .iter()
        .map(|choice| {
            let counterpart = translated
                .iter()
                .find(|candidate| {
                    match (&candidate.id, &choice.id) {
                        (Some(a), Some(b)) => a == b,
                        _ => normalize_text(&candidate.text) == normalize_text(&choice.text),
                    }
                });

            match counterpart {
                Some(found) => Choice {
                    id: choice.id.clone(),
                    text: found.text.clone(),
                    is_correct: choice.is_correct,
                    points: choice.points,
                    feedback: found.feedback.clone().or_else(|| choice.feedback.clone()),
                },
                None => choice.clone(),
            }
        })
        .collect()
}

/// Applies the best available translation to an effective question:
/// variant-scoped first, then question-scoped, else untranslated. English
/// source content is never translated.
pub(crate) fn apply(
    question: &mut EffectiveQuestion,
    language: &str,
    variant_scoped: Option<&Translation>,
    question_scoped: Option<&Translation>,
) {
    if language == "en" {
        return;
    }

    let Some(translation) = variant_scoped.or(question_scoped) else {
        return;
    };

    question.text = translation.text.clone();
    if let Some(translated) = &translation.choices {
        question.choices = translate_choices(&question.choices, &translated.0);
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::db::types::QuestionType;
    use crate::services::grading::testing::{choice, question};

    use super::*;

    #[test]
    fn language_normalizes_to_base_subtag() {
        assert_eq!(normalize_language(Some("es-MX")), "es");
        assert_eq!(normalize_language(Some("pt_BR")), "pt");
        assert_eq!(normalize_language(Some("FR")), "fr");
        assert_eq!(normalize_language(Some("  ")), "en");
        assert_eq!(normalize_language(None), "en");
    }

    fn translation(variant_id: Option<&str>, text: &str, choices: Option<Vec<Choice>>) -> Translation {
        Translation {
            id: "t1".to_string(),
            question_id: "question-1".to_string(),
            variant_id: variant_id.map(str::to_string),
            language: "es".to_string(),
            text: text.to_string(),
            choices: choices.map(sqlx::types::Json),
            created_at: datetime!(2026-01-01 00:00:00),
        }
    }

    #[test]
    fn translated_choices_follow_the_randomized_permutation() {
        // Canonical order after randomization: B, A.
        let ordered = vec![choice("b", "Option B", false, 0.0), choice("a", "Option A", true, 5.0)];
        let translated =
            vec![choice("a", "Opción A", false, 0.0), choice("b", "Opción B", false, 0.0)];

        let result = translate_choices(&ordered, &translated);
        assert_eq!(result.len(), ordered.len());
        assert_eq!(result[0].text, "Opción B");
        assert_eq!(result[1].text, "Opción A");
        // Grading fields come from the canonical list, not the translation.
        assert!(result[1].is_correct);
        assert_eq!(result[1].points, 5.0);
    }

    #[test]
    fn choices_without_ids_match_by_normalized_text() {
        let mut ordered = vec![choice("x", "Paris", true, 5.0)];
        ordered[0].id = None;
        let mut translated = vec![choice("x", "París", false, 0.0)];
        translated[0].id = None;

        // No id and no normalized-text match: the source choice stays untouched.
        let result = translate_choices(&ordered, &translated);
        assert_eq!(result[0].text, "Paris");
    }

    #[test]
    fn variant_translation_wins_over_question_translation() {
        let mut effective = question(QuestionType::SingleCorrect, Vec::new());
        let variant_t = translation(Some("v1"), "Texto de variante", None);
        let question_t = translation(None, "Texto base", None);

        apply(&mut effective, "es", Some(&variant_t), Some(&question_t));
        assert_eq!(effective.text, "Texto de variante");
    }

    #[test]
    fn question_translation_used_when_no_variant_translation() {
        let mut effective = question(QuestionType::SingleCorrect, Vec::new());
        let question_t = translation(None, "Texto base", None);

        apply(&mut effective, "es", None, Some(&question_t));
        assert_eq!(effective.text, "Texto base");
    }

    #[test]
    fn english_content_is_never_translated() {
        let mut effective = question(QuestionType::SingleCorrect, Vec::new());
        let original = effective.text.clone();
        let question_t = translation(None, "should not apply", None);

        apply(&mut effective, "en", None, Some(&question_t));
        assert_eq!(effective.text, original);
    }
}
