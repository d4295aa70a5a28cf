//! Learner-facing feedback strings, keyed by the base language subtag the
//! learner answered in. Unknown languages fall back to English.

pub(crate) fn no_response(language: &str) -> String {
    match language {
        "es" => "No se recibió respuesta para esta pregunta.".to_string(),
        "fr" => "Aucune réponse n'a été soumise pour cette question.".to_string(),
        _ => "No response was submitted for this question.".to_string(),
    }
}

pub(crate) fn invalid_selection(language: &str) -> String {
    match language {
        "es" => "La opción seleccionada no coincide con ninguna de las opciones disponibles."
            .to_string(),
        "fr" => "La sélection ne correspond à aucune des options proposées.".to_string(),
        _ => "The selected option does not match any of the available choices.".to_string(),
    }
}

pub(crate) fn correct_answer_is(language: &str, answer: &str) -> String {
    match language {
        "es" => format!("La respuesta correcta es: {answer}"),
        "fr" => format!("La bonne réponse est : {answer}"),
        _ => format!("The correct answer is: {answer}"),
    }
}

pub(crate) fn missing_correct_options(language: &str, names: &str) -> String {
    match language {
        "es" => format!("Faltaron opciones correctas: {names}"),
        "fr" => format!("Options correctes manquantes : {names}"),
        _ => format!("Missing correct option(s): {names}"),
    }
}

pub(crate) fn all_correct_selected(language: &str) -> String {
    match language {
        "es" => "Seleccionaste todas las opciones correctas.".to_string(),
        "fr" => "Vous avez sélectionné toutes les bonnes options.".to_string(),
        _ => "All correct options were selected.".to_string(),
    }
}

pub(crate) fn submitted_after_deadline(language: &str) -> String {
    match language {
        "es" => "El intento se envió después de la fecha límite y no fue calificado.".to_string(),
        "fr" => "La tentative a été soumise après la date limite et n'a pas été notée.".to_string(),
        _ => "The attempt was submitted after the deadline and was not graded.".to_string(),
    }
}

pub(crate) fn true_label(language: &str) -> &'static str {
    match language {
        "es" => "Verdadero",
        "fr" => "Vrai",
        _ => "True",
    }
}

pub(crate) fn false_label(language: &str) -> &'static str {
    match language {
        "es" => "Falso",
        "fr" => "Faux",
        _ => "False",
    }
}
