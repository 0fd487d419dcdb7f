//! Answer evaluation, dispatched on the question variant.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{option_label, Question, QuestionKind};

/// A user's answer. The shape must match the question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Single option index (multiple choice).
    Choice(usize),
    /// Set of option indices (multi-select). Order is not significant.
    Choices(Vec<usize>),
    /// True/false.
    Boolean(bool),
}

impl AnswerValue {
    fn shape(&self) -> &'static str {
        match self {
            AnswerValue::Choice(_) => "single choice",
            AnswerValue::Choices(_) => "multi-select",
            AnswerValue::Boolean(_) => "true/false",
        }
    }
}

fn check_option(index: usize, options: &[String]) -> Result<(), ValidationError> {
    if index >= options.len() {
        return Err(ValidationError::OptionOutOfRange {
            index,
            option_count: options.len(),
        });
    }
    Ok(())
}

/// Check that `value` has the right shape for `question` and that every
/// index is in range and distinct.
///
/// An empty multi-select set passes here; whether it can be submitted is a
/// session concern.
pub fn check_selection(question: &Question, value: &AnswerValue) -> Result<(), ValidationError> {
    match (&question.kind, value) {
        (QuestionKind::MultipleChoice { options, .. }, AnswerValue::Choice(i)) => {
            check_option(*i, options)
        }
        (QuestionKind::MultiSelect { options, .. }, AnswerValue::Choices(selected)) => {
            let mut seen = HashSet::with_capacity(selected.len());
            for &i in selected {
                check_option(i, options)?;
                if !seen.insert(i) {
                    return Err(ValidationError::DuplicateSelection(i));
                }
            }
            Ok(())
        }
        (QuestionKind::TrueFalse { .. }, AnswerValue::Boolean(_)) => Ok(()),
        (QuestionKind::ShortAnswer { .. }, _) => Err(ValidationError::NotAutoGraded),
        (kind, value) => Err(ValidationError::ShapeMismatch {
            expected: expected_shape(kind),
            found: value.shape(),
        }),
    }
}

fn expected_shape(kind: &QuestionKind) -> &'static str {
    match kind {
        QuestionKind::MultipleChoice { .. } => "single choice",
        QuestionKind::MultiSelect { .. } => "multi-select",
        QuestionKind::TrueFalse { .. } => "true/false",
        QuestionKind::ShortAnswer { .. } => "free text",
    }
}

/// Decide whether `value` answers `question` correctly.
///
/// - multiple choice: exact index match
/// - multi-select: same set of indices, any order, no partial credit
/// - true/false: same boolean
pub fn evaluate(question: &Question, value: &AnswerValue) -> Result<bool, ValidationError> {
    check_selection(question, value)?;

    let correct = match (&question.kind, value) {
        (QuestionKind::MultipleChoice { correct_index, .. }, AnswerValue::Choice(i)) => {
            i == correct_index
        }
        (
            QuestionKind::MultiSelect {
                correct_indices, ..
            },
            AnswerValue::Choices(selected),
        ) => {
            let chosen: HashSet<_> = selected.iter().collect();
            let expected: HashSet<_> = correct_indices.iter().collect();
            selected.len() == correct_indices.len() && chosen == expected
        }
        (QuestionKind::TrueFalse { correct }, AnswerValue::Boolean(b)) => b == correct,
        // check_selection already rejected every other pairing
        _ => false,
    };
    Ok(correct)
}

fn render_option(index: usize, options: &[String]) -> String {
    match options.get(index) {
        Some(text) => format!("{}. {}", option_label(index), text),
        None => option_label(index),
    }
}

fn render_bool(b: bool) -> String {
    if b { "True" } else { "False" }.to_string()
}

/// Human-readable correct answer, e.g. `"B. Paris"` or `"A. x, C. z"`.
pub fn render_correct_answer(question: &Question) -> String {
    match &question.kind {
        QuestionKind::MultipleChoice {
            options,
            correct_index,
        } => render_option(*correct_index, options),
        QuestionKind::MultiSelect {
            options,
            correct_indices,
            ..
        } => {
            let mut sorted = correct_indices.clone();
            sorted.sort_unstable();
            sorted
                .into_iter()
                .map(|i| render_option(i, options))
                .collect::<Vec<_>>()
                .join(", ")
        }
        QuestionKind::TrueFalse { correct } => render_bool(*correct),
        QuestionKind::ShortAnswer { sample_answer, .. } => sample_answer.clone(),
    }
}

/// Human-readable form of a user's answer against its question.
pub fn render_answer(question: &Question, value: &AnswerValue) -> String {
    let options = question.options();
    match value {
        AnswerValue::Choice(i) => render_option(*i, &options),
        AnswerValue::Choices(selected) => selected
            .iter()
            .map(|&i| render_option(i, &options))
            .collect::<Vec<_>>()
            .join(", "),
        AnswerValue::Boolean(b) => render_bool(*b),
    }
}
