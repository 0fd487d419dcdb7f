//! Content bundle loading and validation.
//!
//! Bundles arrive as the generator's JSON. Structural problems (bad indices,
//! missing options) are fatal and stop a bank from being built; softer
//! problems are reported as warnings by [`validate_bundle`].

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bank::BankEntry;
use crate::model::{
    ContentBundle, Difficulty, MultiSelectQuestion, MultipleChoiceQuestion, Question,
    QuestionKind, QuestionType, TrueFalseQuestion,
};

const MULTIPLE_CHOICE: &str = "multiple_choice_questions";
const MULTI_SELECT: &str = "multi_select_questions";
const TRUE_FALSE: &str = "true_false_questions";

/// Parse a bundle JSON file.
pub fn load_bundle(path: &Path) -> Result<ContentBundle> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content bundle: {}", path.display()))?;

    parse_bundle_str(&content, path)
}

/// Parse a bundle from a JSON string (useful for testing).
pub fn parse_bundle_str(content: &str, source_path: &Path) -> Result<ContentBundle> {
    serde_json::from_str(content)
        .with_context(|| format!("failed to parse bundle JSON: {}", source_path.display()))
}

/// A structural defect that makes a bundle unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentIssue {
    /// Bundle array the question lives in.
    pub section: String,
    /// Index within that array.
    pub index: usize,
    pub message: String,
}

impl ContentIssue {
    pub fn new(section: &str, index: usize, message: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            index,
            message: message.into(),
        }
    }
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.section, self.index, self.message)
    }
}

/// Convert the gradable arrays of a bundle into bank entries.
///
/// Order is fixed: multiple-choice, then multi-select, then true/false.
/// Every structural issue is collected before returning, so the caller sees
/// the whole list at once.
pub(crate) fn extract_entries(bundle: &ContentBundle) -> Result<Vec<BankEntry>, Vec<ContentIssue>> {
    let mut issues = Vec::new();
    let mut entries = Vec::with_capacity(bundle.gradable_count());

    for (i, q) in bundle.multiple_choice_questions.iter().enumerate() {
        if let Some(question) = convert_multiple_choice(i, q, &mut issues) {
            entries.push(BankEntry::new(QuestionType::MultipleChoice, i, question));
        }
    }
    for (i, q) in bundle.multi_select_questions.iter().enumerate() {
        if let Some(question) = convert_multi_select(i, q, &mut issues) {
            entries.push(BankEntry::new(QuestionType::MultiSelect, i, question));
        }
    }
    for (i, q) in bundle.true_false_questions.iter().enumerate() {
        if let Some(question) = convert_true_false(i, q, &mut issues) {
            entries.push(BankEntry::new(QuestionType::TrueFalse, i, question));
        }
    }

    if issues.is_empty() {
        Ok(entries)
    } else {
        Err(issues)
    }
}

/// Structural issues only, without building entries.
pub fn check_structure(bundle: &ContentBundle) -> Vec<ContentIssue> {
    extract_entries(bundle).err().unwrap_or_default()
}

fn parse_difficulty(raw: Option<&str>) -> Option<Difficulty> {
    raw.and_then(|d| d.parse().ok())
}

fn check_text(section: &str, index: usize, text: &str, issues: &mut Vec<ContentIssue>) -> bool {
    if text.trim().is_empty() {
        issues.push(ContentIssue::new(section, index, "question text is empty"));
        return false;
    }
    true
}

fn check_index(
    section: &str,
    index: usize,
    raw: i64,
    option_count: usize,
    issues: &mut Vec<ContentIssue>,
) -> Option<usize> {
    match usize::try_from(raw) {
        Ok(i) if i < option_count => Some(i),
        _ => {
            issues.push(ContentIssue::new(
                section,
                index,
                format!("correct answer {raw} out of range ({option_count} options)"),
            ));
            None
        }
    }
}

fn convert_multiple_choice(
    index: usize,
    q: &MultipleChoiceQuestion,
    issues: &mut Vec<ContentIssue>,
) -> Option<Question> {
    let text_ok = check_text(MULTIPLE_CHOICE, index, &q.question, issues);
    if q.options.is_empty() {
        issues.push(ContentIssue::new(MULTIPLE_CHOICE, index, "options are empty"));
        return None;
    }
    let correct_index = check_index(
        MULTIPLE_CHOICE,
        index,
        q.correct_answer,
        q.options.len(),
        issues,
    )?;
    if !text_ok {
        return None;
    }

    Some(Question {
        text: q.question.clone(),
        explanation: q.explanation.clone(),
        topic: q.topic.clone(),
        page_reference: q.page_reference,
        difficulty: parse_difficulty(q.difficulty.as_deref()),
        kind: QuestionKind::MultipleChoice {
            options: q.options.clone(),
            correct_index,
        },
    })
}

fn convert_multi_select(
    index: usize,
    q: &MultiSelectQuestion,
    issues: &mut Vec<ContentIssue>,
) -> Option<Question> {
    let before = issues.len();
    check_text(MULTI_SELECT, index, &q.question, issues);
    if q.options.is_empty() {
        issues.push(ContentIssue::new(MULTI_SELECT, index, "options are empty"));
        return None;
    }
    if q.correct_answers.is_empty() {
        issues.push(ContentIssue::new(MULTI_SELECT, index, "correct answers are empty"));
        return None;
    }

    let mut correct_indices = Vec::with_capacity(q.correct_answers.len());
    let mut seen = HashSet::new();
    for &raw in &q.correct_answers {
        let Some(i) = check_index(MULTI_SELECT, index, raw, q.options.len(), issues) else {
            continue;
        };
        if !seen.insert(i) {
            issues.push(ContentIssue::new(
                MULTI_SELECT,
                index,
                format!("correct answer {i} listed more than once"),
            ));
            continue;
        }
        correct_indices.push(i);
    }
    if issues.len() > before {
        return None;
    }

    Some(Question {
        text: q.question.clone(),
        explanation: q.explanation.clone(),
        topic: q.topic.clone(),
        page_reference: q.page_reference,
        difficulty: parse_difficulty(q.difficulty.as_deref()),
        kind: QuestionKind::MultiSelect {
            options: q.options.clone(),
            correct_indices,
            marks: q.marks,
        },
    })
}

fn convert_true_false(
    index: usize,
    q: &TrueFalseQuestion,
    issues: &mut Vec<ContentIssue>,
) -> Option<Question> {
    if !check_text(TRUE_FALSE, index, &q.question, issues) {
        return None;
    }

    Some(Question {
        text: q.question.clone(),
        explanation: q.explanation.clone(),
        topic: q.topic.clone(),
        page_reference: q.page_reference,
        difficulty: parse_difficulty(q.difficulty.as_deref()),
        kind: QuestionKind::TrueFalse {
            correct: q.correct_answer,
        },
    })
}

/// A non-fatal finding from bundle validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// `section[index]` of the offending question, if any.
    pub location: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn at(section: &str, index: usize, message: impl Into<String>) -> Self {
        Self {
            location: Some(format!("{section}[{index}]")),
            message: message.into(),
        }
    }
}

/// Validate a bundle for problems that do not block a quiz.
pub fn validate_bundle(bundle: &ContentBundle) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bundle.gradable_count() == 0 {
        warnings.push(ValidationWarning {
            location: None,
            message: "bundle has no gradable questions".into(),
        });
    }

    // (section, index, text, explanation, difficulty)
    let gradable = bundle
        .multiple_choice_questions
        .iter()
        .enumerate()
        .map(|(i, q)| (MULTIPLE_CHOICE, i, &q.question, &q.explanation, &q.difficulty))
        .chain(
            bundle
                .multi_select_questions
                .iter()
                .enumerate()
                .map(|(i, q)| (MULTI_SELECT, i, &q.question, &q.explanation, &q.difficulty)),
        )
        .chain(
            bundle
                .true_false_questions
                .iter()
                .enumerate()
                .map(|(i, q)| (TRUE_FALSE, i, &q.question, &q.explanation, &q.difficulty)),
        );

    let mut seen_text = HashSet::new();
    for (section, index, text, explanation, difficulty) in gradable {
        let normalized = text.trim().to_lowercase();
        if !normalized.is_empty() && !seen_text.insert(normalized) {
            warnings.push(ValidationWarning::at(
                section,
                index,
                format!("duplicate question text: {}", text.trim()),
            ));
        }
        if explanation.trim().is_empty() {
            warnings.push(ValidationWarning::at(section, index, "explanation is empty"));
        }
        if let Some(raw) = difficulty {
            if raw.parse::<Difficulty>().is_err() {
                warnings.push(ValidationWarning::at(
                    section,
                    index,
                    format!("unrecognised difficulty '{raw}', treated as unset"),
                ));
            }
        }
    }

    for (i, q) in bundle.multiple_choice_questions.iter().enumerate() {
        if q.options.len() == 1 {
            warnings.push(ValidationWarning::at(
                MULTIPLE_CHOICE,
                i,
                "only one option: the answer is given away",
            ));
        }
    }

    if !bundle.short_answer_questions.is_empty() {
        warnings.push(ValidationWarning {
            location: None,
            message: format!(
                "{} short-answer question(s) are reviewed separately and not part of the quiz",
                bundle.short_answer_questions.len()
            ),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_BUNDLE: &str = r#"{
  "session_id": "doc-42",
  "title": "Cell Biology",
  "multiple_choice_questions": [
    {
      "question": "Which organelle produces ATP?",
      "options": ["Nucleus", "Mitochondrion", "Ribosome", "Golgi"],
      "correct_answer": 1,
      "explanation": "Mitochondria run oxidative phosphorylation.",
      "difficulty": "medium",
      "page_reference": 3,
      "topic": "Organelles"
    }
  ],
  "multi_select_questions": [
    {
      "question": "Which are prokaryotes?",
      "options": ["E. coli", "Yeast", "Archaea"],
      "correct_answers": [0, 2],
      "explanation": "Bacteria and archaea lack a nucleus.",
      "difficulty": "hard",
      "marks": 2
    }
  ],
  "true_false_questions": [
    {
      "question": "Plant cells have a cell wall.",
      "correct_answer": true,
      "explanation": "Cellulose walls."
    }
  ],
  "short_answer_questions": [
    {
      "question": "Describe osmosis.",
      "sample_answer": "Diffusion of water across a membrane.",
      "key_points": ["water", "membrane"]
    }
  ],
  "flashcards": [{"front": "ATP", "back": "Energy currency"}],
  "key_terms": ["ATP"]
}"#;

    fn parse(json: &str) -> ContentBundle {
        parse_bundle_str(json, &PathBuf::from("bundle.json")).unwrap()
    }

    #[test]
    fn parse_valid_bundle() {
        let bundle = parse(VALID_BUNDLE);
        assert_eq!(bundle.title.as_deref(), Some("Cell Biology"));
        assert_eq!(bundle.gradable_count(), 3);
        assert_eq!(bundle.short_answer_questions.len(), 1);
        assert_eq!(bundle.flashcards.len(), 1);
    }

    #[test]
    fn extract_keeps_type_precedence_and_original_indices() {
        let entries = extract_entries(&parse(VALID_BUNDLE)).unwrap();
        let tags: Vec<_> = entries
            .iter()
            .map(|e| (e.question_type, e.original_index))
            .collect();
        assert_eq!(
            tags,
            vec![
                (QuestionType::MultipleChoice, 0),
                (QuestionType::MultiSelect, 0),
                (QuestionType::TrueFalse, 0),
            ]
        );
        assert_eq!(entries[0].question.difficulty, Some(Difficulty::Medium));
        assert_eq!(entries[1].question.marks(), Some(2));
    }

    #[test]
    fn out_of_range_and_negative_indices_are_structural() {
        let bundle = parse(
            r#"{
  "multiple_choice_questions": [
    {"question": "Q1", "options": ["a", "b"], "correct_answer": 2},
    {"question": "Q2", "options": ["a", "b"], "correct_answer": -1}
  ],
  "multi_select_questions": [
    {"question": "Q3", "options": ["a", "b"], "correct_answers": [0, 5]}
  ]
}"#,
        );
        let issues = check_structure(&bundle);
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].section, MULTIPLE_CHOICE);
        assert_eq!(issues[1].index, 1);
        assert!(issues[2].message.contains("5 out of range"));
    }

    #[test]
    fn empty_options_and_answers_are_structural() {
        let bundle = parse(
            r#"{
  "multiple_choice_questions": [{"question": "Q", "options": [], "correct_answer": 0}],
  "multi_select_questions": [{"question": "Q", "options": ["a"], "correct_answers": []}],
  "true_false_questions": [{"question": "  ", "correct_answer": false}]
}"#,
        );
        let issues = check_structure(&bundle);
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "options are empty",
                "correct answers are empty",
                "question text is empty"
            ]
        );
    }

    #[test]
    fn duplicate_correct_answers_are_rejected() {
        let bundle = parse(
            r#"{"multi_select_questions": [
  {"question": "Q", "options": ["a", "b", "c"], "correct_answers": [0, 2, 0]}
]}"#,
        );
        let issues = check_structure(&bundle);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("more than once"));
    }

    #[test]
    fn warnings_for_soft_problems() {
        let bundle = parse(
            r#"{
  "multiple_choice_questions": [
    {"question": "Same?", "options": ["only"], "correct_answer": 0, "difficulty": "brutal"}
  ],
  "true_false_questions": [
    {"question": "same?", "correct_answer": true, "explanation": "yes"}
  ],
  "short_answer_questions": [{"question": "Why?", "sample_answer": "Because."}]
}"#,
        );
        let warnings = validate_bundle(&bundle);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));
        assert!(has("duplicate question text"));
        assert!(has("explanation is empty"));
        assert!(has("unrecognised difficulty 'brutal'"));
        assert!(has("only one option"));
        assert!(has("1 short-answer question(s)"));
    }

    #[test]
    fn clean_bundle_has_only_short_answer_note() {
        let warnings = validate_bundle(&parse(VALID_BUNDLE));
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].location.is_none());
    }

    #[test]
    fn parse_malformed_json() {
        let result = parse_bundle_str("{ not json", &PathBuf::from("bad.json"));
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, VALID_BUNDLE).unwrap();

        let bundle = load_bundle(&path).unwrap();
        assert_eq!(bundle.session_id.as_deref(), Some("doc-42"));
    }
}
