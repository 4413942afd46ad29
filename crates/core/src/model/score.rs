use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("a score needs at least one question")]
    Empty,

    #[error("counts ({sum}) do not add up to total ({total})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("percentage {percentage} does not match {correct}/{total}")]
    PercentageMismatch {
        correct: u32,
        total: u32,
        percentage: u32,
    },
}

/// Final, immutable score for a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    correct: u32,
    incorrect: u32,
    skipped: u32,
    total: u32,
    percentage: u32,
}

/// Classification of a single question after completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    Skipped,
}

/// Coarse label shown next to the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    NeedsImprovement,
    GoodEffort,
    Excellent,
}

impl Rating {
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            0..=39 => Self::NeedsImprovement,
            40..=69 => Self::GoodEffort,
            _ => Self::Excellent,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NeedsImprovement => "Needs Improvement",
            Self::GoodEffort => "Good Effort",
            Self::Excellent => "Excellent!",
        }
    }
}

/// One row of the post-quiz explanation view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub index: usize,
    pub text: String,
    pub chosen: Option<String>,
    pub correct_answer: String,
    pub verdict: Verdict,
}

fn verdict(question: &Question, answer: Option<&str>) -> Verdict {
    match answer {
        Some(a) if question.is_correct(a) => Verdict::Correct,
        Some(_) => Verdict::Incorrect,
        None => Verdict::Skipped,
    }
}

/// `round(100 * correct / total)`, halves rounded up.
fn percentage(correct: u32, total: u32) -> u32 {
    let correct = u64::from(correct);
    let total = u64::from(total);
    let rounded = (200 * correct + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(100)
}

/// Score a session.
///
/// Slots beyond `answers.len()` count as skipped. Returns `None` for an empty
/// question list, where a percentage is undefined.
#[must_use]
pub fn finalize(questions: &[Question], answers: &[Option<String>]) -> Option<QuizScore> {
    if questions.is_empty() {
        return None;
    }

    let mut correct = 0_u32;
    let mut incorrect = 0_u32;
    for (i, question) in questions.iter().enumerate() {
        let answer = answers.get(i).and_then(Option::as_deref);
        match verdict(question, answer) {
            Verdict::Correct => correct = correct.saturating_add(1),
            Verdict::Incorrect => incorrect = incorrect.saturating_add(1),
            Verdict::Skipped => {}
        }
    }

    let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    Some(QuizScore {
        correct,
        incorrect,
        skipped: total - correct - incorrect,
        total,
        percentage: percentage(correct, total),
    })
}

/// Per-question breakdown for the explanation view.
#[must_use]
pub fn review(questions: &[Question], answers: &[Option<String>]) -> Vec<QuestionReview> {
    questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let chosen = answers.get(index).cloned().flatten();
            QuestionReview {
                index,
                text: question.text().to_owned(),
                verdict: verdict(question, chosen.as_deref()),
                chosen,
                correct_answer: question.correct_answer().to_owned(),
            }
        })
        .collect()
}

impl QuizScore {
    /// Rehydrate a score from persisted counts.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError` if the counts are inconsistent.
    pub fn from_persisted(
        correct: u32,
        incorrect: u32,
        total: u32,
        percentage_value: u32,
    ) -> Result<Self, ScoreError> {
        if total == 0 {
            return Err(ScoreError::Empty);
        }
        let sum = correct.saturating_add(incorrect);
        if sum > total {
            return Err(ScoreError::CountMismatch { total, sum });
        }
        if percentage(correct, total) != percentage_value {
            return Err(ScoreError::PercentageMismatch {
                correct,
                total,
                percentage: percentage_value,
            });
        }
        Ok(Self {
            correct,
            incorrect,
            skipped: total - sum,
            total,
            percentage: percentage_value,
        })
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    #[must_use]
    pub fn rating(&self) -> Rating {
        Rating::from_percentage(self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| {
                Question::new(format!("Q{i}"), vec!["right".into(), "wrong".into()], "right")
                    .unwrap()
            })
            .collect()
    }

    fn some(v: &str) -> Option<String> {
        Some(v.to_owned())
    }

    #[test]
    fn classifies_every_slot_once() {
        let qs = questions(4);
        let answers = vec![some("right"), some("wrong"), None, some("right")];
        let score = finalize(&qs, &answers).unwrap();

        assert_eq!(score.correct(), 2);
        assert_eq!(score.incorrect(), 1);
        assert_eq!(score.skipped(), 1);
        assert_eq!(score.total(), 4);
        assert_eq!(
            score.correct() + score.incorrect() + score.skipped(),
            score.total()
        );
        assert_eq!(score.percentage(), 50);
    }

    #[test]
    fn rounds_percentage_half_up() {
        let qs = questions(3);
        let score = finalize(&qs, &[some("right"), None, None]).unwrap();
        assert_eq!(score.percentage(), 33);

        let score = finalize(&qs, &[some("right"), some("right"), None]).unwrap();
        assert_eq!(score.percentage(), 67);

        let qs = questions(8);
        let mut answers = vec![None; 8];
        answers[0] = some("right");
        // 12.5 rounds to 13
        assert_eq!(finalize(&qs, &answers).unwrap().percentage(), 13);
    }

    #[test]
    fn all_skipped_scores_zero() {
        let qs = questions(3);
        let score = finalize(&qs, &[None, None, None]).unwrap();
        assert_eq!(score.percentage(), 0);
        assert_eq!(score.skipped(), score.total());
        assert_eq!(score.rating(), Rating::NeedsImprovement);
    }

    #[test]
    fn empty_question_list_has_no_score() {
        assert_eq!(finalize(&[], &[]), None);
    }

    #[test]
    fn short_answer_list_counts_missing_as_skipped() {
        let qs = questions(3);
        let score = finalize(&qs, &[some("right")]).unwrap();
        assert_eq!(score.skipped(), 2);
    }

    #[test]
    fn rating_thresholds() {
        assert_eq!(Rating::from_percentage(39), Rating::NeedsImprovement);
        assert_eq!(Rating::from_percentage(40), Rating::GoodEffort);
        assert_eq!(Rating::from_percentage(69), Rating::GoodEffort);
        assert_eq!(Rating::from_percentage(70), Rating::Excellent);
        assert_eq!(Rating::Excellent.label(), "Excellent!");
    }

    #[test]
    fn review_reports_choice_and_verdict() {
        let qs = questions(3);
        let rows = review(&qs, &[some("wrong"), None, some("right")]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].verdict, Verdict::Incorrect);
        assert_eq!(rows[0].chosen.as_deref(), Some("wrong"));
        assert_eq!(rows[1].verdict, Verdict::Skipped);
        assert_eq!(rows[2].verdict, Verdict::Correct);
        assert_eq!(rows[2].correct_answer, "right");
    }

    #[test]
    fn persisted_score_is_checked() {
        assert!(QuizScore::from_persisted(2, 1, 4, 50).is_ok());
        assert_eq!(
            QuizScore::from_persisted(3, 2, 4, 75),
            Err(ScoreError::CountMismatch { total: 4, sum: 5 })
        );
        assert!(matches!(
            QuizScore::from_persisted(1, 0, 4, 50),
            Err(ScoreError::PercentageMismatch { .. })
        ));
        assert_eq!(QuizScore::from_persisted(0, 0, 0, 0), Err(ScoreError::Empty));
    }
}
