/// Canonical form used when matching learner input against choice text:
/// trimmed, lowercased, punctuation stripped, whitespace collapsed.
pub(crate) fn normalize_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;

    for ch in value.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else if ch.is_whitespace() {
            pending_space = true;
        }
        // punctuation is dropped without acting as a separator
    }

    out
}

/// Substitutes `${name}` placeholders in a per-choice feedback template.
pub(crate) fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in vars {
        rendered = rendered.replace(&format!("${{{name}}}"), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_text("Paris."), normalize_text("paris"));
        assert_eq!(normalize_text("  The Answer!  "), "the answer");
    }

    #[test]
    fn normalize_collapses_inner_whitespace() {
        assert_eq!(normalize_text("a   b\tc"), "a b c");
    }

    #[test]
    fn normalize_keeps_unicode_letters() {
        assert_eq!(normalize_text("Éclair, s'il vous plaît"), "éclair sil vous plaît");
    }

    #[test]
    fn template_substitutes_placeholders() {
        let rendered =
            render_template("Correct answer: ${answer} (${points} pts)", &[
                ("answer", "Paris"),
                ("points", "5"),
            ]);
        assert_eq!(rendered, "Correct answer: Paris (5 pts)");
    }

    #[test]
    fn template_leaves_unknown_placeholders() {
        assert_eq!(render_template("${unknown}", &[("answer", "x")]), "${unknown}");
    }
}
