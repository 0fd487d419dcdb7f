//! Core data model types for quizmate.
//!
//! Two layers live here: the content bundle exactly as the external generator
//! emits it (loosely typed, indices as plain integers), and the validated
//! `Question` the engine works with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic label used when a question carries none.
pub const GENERAL_TOPIC: &str = "General";

/// Normalize an optional topic to its reporting label.
///
/// Missing, empty, and whitespace-only topics all map to [`GENERAL_TOPIC`].
pub fn topic_label(topic: Option<&str>) -> &str {
    match topic.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => GENERAL_TOPIC,
    }
}

// ---------------------------------------------------------------------------
// Generator output
// ---------------------------------------------------------------------------

/// Everything the content generator produced for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBundle {
    /// Generator-side session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Document title, used as the quiz subject.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub multiple_choice_questions: Vec<MultipleChoiceQuestion>,
    #[serde(default)]
    pub multi_select_questions: Vec<MultiSelectQuestion>,
    #[serde(default)]
    pub true_false_questions: Vec<TrueFalseQuestion>,
    /// Free-text questions. Reviewed separately, never part of the timed quiz.
    #[serde(default)]
    pub short_answer_questions: Vec<ShortAnswerQuestion>,
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub study_notes: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_terms: Vec<String>,
    /// How the user asked to be quizzed.
    #[serde(default)]
    pub quiz_mode: QuizMode,
}

impl ContentBundle {
    /// Number of questions that can be auto-graded.
    pub fn gradable_count(&self) -> usize {
        self.multiple_choice_questions.len()
            + self.multi_select_questions.len()
            + self.true_false_questions.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_answer: i64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub page_reference: Option<u32>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSelectQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based indices into `options`; order is not significant.
    pub correct_answers: Vec<i64>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub page_reference: Option<u32>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub marks: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrueFalseQuestion {
    pub question: String,
    pub correct_answer: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub page_reference: Option<u32>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortAnswerQuestion {
    pub question: String,
    pub sample_answer: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub page_reference: Option<u32>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Quiz presentation preferences chosen at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizMode {
    #[serde(rename = "type", default)]
    pub kind: QuizModeKind,
    /// 0 means untimed.
    #[serde(default)]
    pub time_limit_minutes: u32,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default = "default_true")]
    pub instant_feedback: bool,
}

impl Default for QuizMode {
    fn default() -> Self {
        Self {
            kind: QuizModeKind::default(),
            time_limit_minutes: 0,
            shuffle_questions: false,
            instant_feedback: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizModeKind {
    Quickfire,
    TimedTest,
    #[default]
    LearningMode,
}

// ---------------------------------------------------------------------------
// Validated questions
// ---------------------------------------------------------------------------

/// Question difficulty as reported by the generator.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// One level easier, saturating at `Easy`.
    pub fn step_down(self) -> Self {
        match self {
            Difficulty::Hard => Difficulty::Medium,
            _ => Difficulty::Easy,
        }
    }

    /// One level harder, saturating at `Hard`.
    pub fn step_up(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// The variant tag of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    MultiSelect,
    TrueFalse,
    ShortAnswer,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple choice"),
            QuestionType::MultiSelect => write!(f, "multi-select"),
            QuestionType::TrueFalse => write!(f, "true/false"),
            QuestionType::ShortAnswer => write!(f, "short answer"),
        }
    }
}

/// A validated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub explanation: String,
    pub topic: Option<String>,
    pub page_reference: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub kind: QuestionKind,
}

/// Type-specific payload of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_index: usize,
    },
    MultiSelect {
        options: Vec<String>,
        correct_indices: Vec<usize>,
        marks: Option<u32>,
    },
    TrueFalse {
        correct: bool,
    },
    ShortAnswer {
        sample_answer: String,
        key_points: Vec<String>,
    },
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::MultiSelect { .. } => QuestionType::MultiSelect,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
        }
    }

    /// Topic used for statistics.
    pub fn topic_label(&self) -> &str {
        topic_label(self.topic.as_deref())
    }

    /// Options shown to the user. True/false questions get a fixed pair.
    pub fn options(&self) -> Vec<String> {
        match &self.kind {
            QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::MultiSelect { options, .. } => options.clone(),
            QuestionKind::TrueFalse { .. } => vec!["True".into(), "False".into()],
            QuestionKind::ShortAnswer { .. } => Vec::new(),
        }
    }

    pub fn marks(&self) -> Option<u32> {
        match self.kind {
            QuestionKind::MultiSelect { marks, .. } => marks,
            _ => None,
        }
    }
}

/// Option label for a zero-based index: `0 -> "A"`, `25 -> "Z"`, `26 -> "27"`.
pub fn option_label(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        (index + 1).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Hard.to_string(), "hard");
        assert_eq!("Medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" EASY ".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_steps_saturate() {
        assert_eq!(Difficulty::Easy.step_down(), Difficulty::Easy);
        assert_eq!(Difficulty::Medium.step_down(), Difficulty::Easy);
        assert_eq!(Difficulty::Medium.step_up(), Difficulty::Hard);
        assert_eq!(Difficulty::Hard.step_up(), Difficulty::Hard);
    }

    #[test]
    fn blank_topics_fall_back_to_general() {
        assert_eq!(topic_label(None), GENERAL_TOPIC);
        assert_eq!(topic_label(Some("   ")), GENERAL_TOPIC);
        assert_eq!(topic_label(Some(" Cells ")), "Cells");
    }

    #[test]
    fn option_labels() {
        assert_eq!(option_label(0), "A");
        assert_eq!(option_label(2), "C");
        assert_eq!(option_label(26), "27");
    }

    #[test]
    fn bundle_defaults_when_fields_missing() {
        let bundle: ContentBundle = serde_json::from_str(
            r#"{"true_false_questions": [{"question": "Sky is blue", "correct_answer": true}]}"#,
        )
        .unwrap();
        assert_eq!(bundle.gradable_count(), 1);
        assert!(bundle.flashcards.is_empty());
        assert_eq!(bundle.quiz_mode, QuizMode::default());
        assert!(bundle.quiz_mode.instant_feedback);
        assert_eq!(bundle.true_false_questions[0].explanation, "");
    }

    #[test]
    fn quiz_mode_parses_generator_names() {
        let mode: QuizMode =
            serde_json::from_str(r#"{"type": "timed_test", "time_limit_minutes": 15}"#).unwrap();
        assert_eq!(mode.kind, QuizModeKind::TimedTest);
        assert_eq!(mode.time_limit_minutes, 15);
        assert!(!mode.shuffle_questions);
    }
}
