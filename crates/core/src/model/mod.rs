mod answers;
mod ids;
mod question;
mod quiz;
mod result;
pub mod score;

pub use ids::{ParseIdError, QuizId, ResultId};

pub use answers::AnswerSheet;
pub use question::{Question, QuestionDraft, QuestionError};
pub use quiz::{Quiz, QuizDraft, QuizError, ValidQuiz};
pub use result::{Participant, QuizResult, QuizResultError};
pub use score::{QuestionReview, QuizScore, Rating, ScoreError, Verdict};
