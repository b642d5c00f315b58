use serde::{Deserialize, Serialize};

use super::{round_score, ScoringError};

/// Answer letter of a four-option question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerChoice {
    A,
    B,
    C,
    D,
}

/// Expected answer for one question of a clinical case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAnswerKey {
    pub correct: AnswerChoice,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question_index: usize,
    pub user_answer: Option<AnswerChoice>,
    pub correct_answer: AnswerChoice,
    pub is_correct: bool,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseGrade {
    pub score: i32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub feedback: Vec<QuestionFeedback>,
}

pub fn grade_qcm(selected: AnswerChoice, correct: AnswerChoice) -> bool {
    selected == correct
}

/// Grade a clinical case answer sheet. Unanswered questions count as wrong and
/// answers beyond the key are ignored.
pub fn grade_case(
    answers: &[AnswerChoice],
    answer_key: &[CaseAnswerKey],
) -> Result<CaseGrade, ScoringError> {
    if answer_key.is_empty() {
        return Err(ScoringError::EmptyAnswerKey);
    }

    let feedback: Vec<QuestionFeedback> = answer_key
        .iter()
        .enumerate()
        .map(|(index, key)| {
            let user_answer = answers.get(index).copied();
            QuestionFeedback {
                question_index: index,
                user_answer,
                correct_answer: key.correct,
                is_correct: user_answer == Some(key.correct),
                rationale: key.rationale.clone(),
            }
        })
        .collect();

    let correct_count = feedback.iter().filter(|item| item.is_correct).count();
    let total_questions = answer_key.len();
    let score = round_score(correct_count as f64 / total_questions as f64 * 100.0);

    Ok(CaseGrade {
        score,
        correct_count,
        total_questions,
        feedback,
    })
}
