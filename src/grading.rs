//! Marks arithmetic and grade bands.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::models::Submission;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradingError {
    #[error("At least one question is required")]
    Empty,
    #[error("Question {0} has a non-numeric mark")]
    NotFinite(usize),
    #[error("Total marks cannot exceed {max}")]
    ExceedsMaximum { total: f64, max: f64 },
}

/// Marks for a single question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuestionMark {
    pub awarded: f64,
    pub out_of: f64,
}

impl QuestionMark {
    fn awarded(&self) -> f64 {
        self.awarded.max(0.0)
    }

    fn out_of(&self) -> f64 {
        self.out_of.max(0.0)
    }
}

/// Per-question marks entered while evaluating one answer sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkSheet {
    pub questions: Vec<QuestionMark>,
}

impl MarkSheet {
    pub fn new(questions: Vec<QuestionMark>) -> Self {
        Self { questions }
    }

    /// Sum of awarded marks; negative entries count as zero.
    pub fn raw_total(&self) -> f64 {
        self.questions.iter().map(QuestionMark::awarded).sum()
    }

    /// Sum of per-question maximums.
    pub fn max_total(&self) -> f64 {
        self.questions.iter().map(QuestionMark::out_of).sum()
    }

    /// The awarded total, never above `max_total`.
    pub fn total(&self) -> f64 {
        self.raw_total().min(self.max_total())
    }

    /// Check the sheet before it is submitted.
    pub fn validate(&self) -> Result<(), GradingError> {
        if self.questions.is_empty() {
            return Err(GradingError::Empty);
        }
        for (index, question) in self.questions.iter().enumerate() {
            if !question.awarded.is_finite() || !question.out_of.is_finite() {
                return Err(GradingError::NotFinite(index + 1));
            }
        }

        let total = self.raw_total();
        let max = self.max_total();
        if total > max {
            return Err(GradingError::ExceedsMaximum { total, max });
        }
        Ok(())
    }
}

/// Letter grade bands over percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    F,
}

impl Grade {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Grade::APlus
        } else if percentage >= 80.0 {
            Grade::A
        } else if percentage >= 70.0 {
            Grade::BPlus
        } else if percentage >= 60.0 {
            Grade::B
        } else if percentage >= 50.0 {
            Grade::C
        } else {
            Grade::F
        }
    }

    /// `None` when there is no positive total to grade against.
    pub fn for_marks(marks: f64, total: f64) -> Option<Self> {
        percentage(marks, total).map(Grade::from_percentage)
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::F => "F",
        }
    }

    /// CSS classes for the grade badge shown next to a result.
    pub fn badge_class(self) -> &'static str {
        match self {
            Grade::APlus | Grade::A => "bg-green-100 text-green-700",
            Grade::BPlus | Grade::B => "bg-blue-100 text-blue-700",
            Grade::C => "bg-yellow-100 text-yellow-700",
            Grade::F => "bg-red-100 text-red-700",
        }
    }
}

/// Label used when a result cannot be graded.
pub const UNGRADED_LABEL: &str = "N/A";

pub fn percentage(marks: f64, total: f64) -> Option<f64> {
    if total > 0.0 {
        Some(marks / total * 100.0)
    } else {
        None
    }
}

/// Mean marks across evaluated submissions, 0 when none are evaluated.
pub fn average_marks(submissions: &[Submission]) -> f64 {
    let marks: Vec<f64> = submissions
        .iter()
        .filter(|s| s.is_evaluated())
        .filter_map(Submission::marks)
        .collect();

    if marks.is_empty() {
        return 0.0;
    }
    marks.iter().sum::<f64>() / marks.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(awarded: f64, out_of: f64) -> QuestionMark {
        QuestionMark { awarded, out_of }
    }

    #[test]
    fn test_grade_band_edges() {
        assert_eq!(Grade::from_percentage(100.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(90.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(89.99), Grade::A);
        assert_eq!(Grade::from_percentage(80.0), Grade::A);
        assert_eq!(Grade::from_percentage(70.0), Grade::BPlus);
        assert_eq!(Grade::from_percentage(60.0), Grade::B);
        assert_eq!(Grade::from_percentage(50.0), Grade::C);
        assert_eq!(Grade::from_percentage(49.9), Grade::F);
        assert_eq!(Grade::from_percentage(0.0), Grade::F);
    }

    #[test]
    fn test_eighty_five_out_of_hundred_is_green_a() {
        let grade = Grade::for_marks(85.0, 100.0).unwrap();
        assert_eq!(grade.label(), "A");
        assert_eq!(grade.badge_class(), "bg-green-100 text-green-700");
    }

    #[test]
    fn test_zero_total_is_ungraded() {
        assert_eq!(Grade::for_marks(10.0, 0.0), None);
        assert_eq!(percentage(5.0, 0.0), None);
    }

    #[test]
    fn test_grade_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
        assert_eq!(serde_json::to_string(&Grade::BPlus).unwrap(), "\"B+\"");
        assert_eq!(serde_json::to_string(&Grade::C).unwrap(), "\"C\"");
    }

    #[test]
    fn test_total_is_sum_of_marks() {
        let sheet = MarkSheet::new(vec![q(7.0, 10.0), q(8.5, 10.0), q(3.0, 5.0)]);
        assert_eq!(sheet.raw_total(), 18.5);
        assert_eq!(sheet.max_total(), 25.0);
        assert_eq!(sheet.total(), 18.5);
        assert!(sheet.validate().is_ok());
    }

    #[test]
    fn test_negative_marks_count_as_zero() {
        let sheet = MarkSheet::new(vec![q(-5.0, 10.0), q(4.0, 10.0)]);
        assert_eq!(sheet.total(), 4.0);

        let all_negative = MarkSheet::new(vec![q(-1.0, 10.0), q(-2.0, 10.0)]);
        assert_eq!(all_negative.total(), 0.0);
    }

    #[test]
    fn test_total_capped_and_rejected_above_maximum() {
        let sheet = MarkSheet::new(vec![q(12.0, 10.0), q(5.0, 5.0)]);
        assert_eq!(sheet.total(), 15.0);
        assert_eq!(
            sheet.validate(),
            Err(GradingError::ExceedsMaximum {
                total: 17.0,
                max: 15.0
            })
        );
    }

    #[test]
    fn test_per_question_overshoot_allowed_when_sum_fits() {
        // Only the overall total is checked at submit time
        let sheet = MarkSheet::new(vec![q(12.0, 10.0), q(2.0, 10.0)]);
        assert!(sheet.validate().is_ok());
        assert_eq!(sheet.total(), 14.0);
    }

    #[test]
    fn test_rejects_empty_and_nan() {
        assert_eq!(MarkSheet::default().validate(), Err(GradingError::Empty));
        let sheet = MarkSheet::new(vec![q(1.0, 10.0), q(f64::NAN, 10.0)]);
        assert_eq!(sheet.validate(), Err(GradingError::NotFinite(2)));
    }
}
