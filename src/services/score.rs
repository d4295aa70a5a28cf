/// Aggregate outcome of one submission: the fractional grade plus the raw
/// point totals it was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreSummary {
    pub(crate) grade: f64,
    pub(crate) total_points_earned: f64,
    pub(crate) total_points_possible: f64,
}

/// Sums per-question results into a grade. `possible` comes from the live
/// question set, not the responses, so unanswered questions still count
/// against the learner.
pub(crate) fn aggregate(earned_per_question: &[f64], possible_per_question: &[f64]) -> ScoreSummary {
    let total_points_earned: f64 = earned_per_question.iter().sum();
    let total_points_possible: f64 = possible_per_question.iter().sum();

    let grade = if total_points_possible > 0.0 {
        total_points_earned / total_points_possible
    } else {
        0.0
    };

    ScoreSummary { grade, total_points_earned, total_points_possible }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_is_earned_over_possible() {
        let summary = aggregate(&[5.0, 2.5], &[10.0, 5.0]);
        assert_eq!(summary.grade, 0.5);
        assert_eq!(summary.total_points_earned, 7.5);
        assert_eq!(summary.total_points_possible, 15.0);
    }

    #[test]
    fn zero_possible_points_yields_zero_grade() {
        let summary = aggregate(&[0.0], &[0.0]);
        assert_eq!(summary.grade, 0.0);
        assert!(!summary.grade.is_nan());
    }

    #[test]
    fn empty_inputs_yield_all_zeros() {
        let summary = aggregate(&[], &[]);
        assert_eq!(summary, ScoreSummary {
            grade: 0.0,
            total_points_earned: 0.0,
            total_points_possible: 0.0,
        });
    }

    #[test]
    fn unanswered_questions_still_count_as_possible() {
        let summary = aggregate(&[10.0], &[10.0, 10.0]);
        assert_eq!(summary.grade, 0.5);
    }
}
