//! The question bank: one ordered, indexable sequence built from a bundle.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::model::{ContentBundle, Difficulty, Question, QuestionType, GENERAL_TOPIC};
use crate::parser::extract_entries;

/// A question together with where it came from in the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankEntry {
    pub question_type: QuestionType,
    /// Position inside the bundle array of that type.
    pub original_index: usize,
    pub question: Question,
}

impl BankEntry {
    pub fn new(question_type: QuestionType, original_index: usize, question: Question) -> Self {
        Self {
            question_type,
            original_index,
            question,
        }
    }
}

/// Gradable questions in fixed type precedence: multiple-choice, multi-select,
/// true/false. Short-answer questions never enter the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    entries: Vec<BankEntry>,
    subject: String,
    source_session: Option<String>,
}

impl QuestionBank {
    /// Validate a bundle and merge its gradable questions.
    ///
    /// Fails with [`QuizError::ContentValidation`] if any question is
    /// structurally broken. An empty bundle produces an empty bank; it is the
    /// session that refuses to start on one.
    pub fn from_bundle(bundle: &ContentBundle) -> Result<Self, QuizError> {
        let entries = extract_entries(bundle)
            .map_err(|issues| QuizError::ContentValidation { issues })?;

        let subject = bundle
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(GENERAL_TOPIC)
            .to_string();

        let source_session = bundle
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        tracing::debug!(count = entries.len(), %subject, "question bank built");
        Ok(Self {
            entries,
            subject,
            source_session,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at position `index`.
    pub fn get(&self, index: usize) -> Result<&BankEntry, QuizError> {
        self.entries.get(index).ok_or(QuizError::IndexOutOfRange {
            index,
            count: self.entries.len(),
        })
    }

    pub fn entries(&self) -> &[BankEntry] {
        &self.entries
    }

    /// What the quiz is about: the bundle title, or "General".
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The generator session the bundle came from, if it declared one.
    /// Retakes of the same bundle share it.
    pub fn source_session(&self) -> Option<&str> {
        self.source_session.as_deref()
    }

    /// Most frequent difficulty among the questions; ties go to the one seen
    /// first. Medium when no question declares one.
    pub fn predominant_difficulty(&self) -> Difficulty {
        let mut counts: Vec<(Difficulty, usize)> = Vec::new();
        for d in self.entries.iter().filter_map(|e| e.question.difficulty) {
            match counts.iter_mut().find(|(seen, _)| *seen == d) {
                Some((_, n)) => *n += 1,
                None => counts.push((d, 1)),
            }
        }

        let mut best: Option<(Difficulty, usize)> = None;
        for (d, n) in counts {
            if best.map_or(true, |(_, top)| n > top) {
                best = Some((d, n));
            }
        }
        best.map(|(d, _)| d).unwrap_or_default()
    }
}

/// Return a copy of `bundle` with each question array permuted by `seed`.
///
/// This is the explicit shuffle step callers run before building a bank when
/// the quiz mode asks for it. The same seed always yields the same order.
pub fn shuffle_bundle(bundle: &ContentBundle, seed: u64) -> ContentBundle {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled = bundle.clone();
    shuffled.multiple_choice_questions.shuffle(&mut rng);
    shuffled.multi_select_questions.shuffle(&mut rng);
    shuffled.true_false_questions.shuffle(&mut rng);
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MultiSelectQuestion, MultipleChoiceQuestion, TrueFalseQuestion};

    fn mc(text: &str, difficulty: Option<&str>) -> MultipleChoiceQuestion {
        MultipleChoiceQuestion {
            question: text.into(),
            options: vec!["a".into(), "b".into()],
            correct_answer: 0,
            explanation: String::new(),
            difficulty: difficulty.map(String::from),
            page_reference: None,
            topic: None,
        }
    }

    fn tf(text: &str) -> TrueFalseQuestion {
        TrueFalseQuestion {
            question: text.into(),
            correct_answer: true,
            explanation: String::new(),
            difficulty: Some("hard".into()),
            page_reference: None,
            topic: None,
        }
    }

    fn ms(text: &str) -> MultiSelectQuestion {
        MultiSelectQuestion {
            question: text.into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answers: vec![0, 2],
            explanation: String::new(),
            difficulty: None,
            page_reference: None,
            topic: None,
            marks: None,
        }
    }

    fn bundle() -> ContentBundle {
        ContentBundle {
            title: Some("Chemistry".into()),
            true_false_questions: vec![tf("tf0"), tf("tf1")],
            multiple_choice_questions: vec![mc("mc0", Some("easy")), mc("mc1", Some("hard"))],
            multi_select_questions: vec![ms("ms0")],
            ..Default::default()
        }
    }

    #[test]
    fn merges_in_type_precedence() {
        let bank = QuestionBank::from_bundle(&bundle()).unwrap();
        let texts: Vec<_> = bank.entries().iter().map(|e| e.question.text.as_str()).collect();
        assert_eq!(texts, vec!["mc0", "mc1", "ms0", "tf0", "tf1"]);
        assert_eq!(bank.get(4).unwrap().original_index, 1);
        assert_eq!(bank.get(4).unwrap().question_type, QuestionType::TrueFalse);
    }

    #[test]
    fn get_out_of_range() {
        let bank = QuestionBank::from_bundle(&bundle()).unwrap();
        assert_eq!(
            bank.get(5).unwrap_err(),
            QuizError::IndexOutOfRange { index: 5, count: 5 }
        );
    }

    #[test]
    fn empty_bundle_gives_empty_bank() {
        let bank = QuestionBank::from_bundle(&ContentBundle::default()).unwrap();
        assert!(bank.is_empty());
        assert_eq!(bank.subject(), GENERAL_TOPIC);
        assert_eq!(bank.predominant_difficulty(), Difficulty::Medium);
        assert_eq!(bank.source_session(), None);
    }

    #[test]
    fn source_session_is_carried_over() {
        let mut b = bundle();
        b.session_id = Some(" upload-42 ".into());
        let bank = QuestionBank::from_bundle(&b).unwrap();
        assert_eq!(bank.source_session(), Some("upload-42"));

        b.session_id = Some("   ".into());
        let bank = QuestionBank::from_bundle(&b).unwrap();
        assert_eq!(bank.source_session(), None);
    }

    #[test]
    fn malformed_bundle_is_rejected() {
        let mut b = bundle();
        b.multiple_choice_questions[1].correct_answer = 9;
        let err = QuestionBank::from_bundle(&b).unwrap_err();
        match err {
            QuizError::ContentValidation { issues } => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].index, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn predominant_difficulty_counts_entries() {
        let bank = QuestionBank::from_bundle(&bundle()).unwrap();
        // easy x1, hard x3 (mc1 + two true/false)
        assert_eq!(bank.predominant_difficulty(), Difficulty::Hard);
    }

    #[test]
    fn building_twice_is_stable() {
        let a = QuestionBank::from_bundle(&bundle()).unwrap();
        let b = QuestionBank::from_bundle(&bundle()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_is_seeded_and_keeps_content() {
        let mut b = bundle();
        b.true_false_questions = (0..20).map(|i| tf(&format!("tf{i}"))).collect();

        let first = shuffle_bundle(&b, 7);
        let again = shuffle_bundle(&b, 7);
        let texts = |c: &ContentBundle| -> Vec<String> {
            c.true_false_questions.iter().map(|q| q.question.clone()).collect()
        };
        assert_eq!(texts(&first), texts(&again));

        let mut sorted = texts(&first);
        sorted.sort();
        let mut original = texts(&b);
        original.sort();
        assert_eq!(sorted, original);
    }
}
