//! Terminal answer parsing.
//!
//! Options are entered as a letter (`b`) or a 1-based number (`2`);
//! multi-select takes a comma or space separated list (`a,c`);
//! true/false takes `t`/`f`, `true`/`false`, or the option letter.

use quizmate_core::evaluator::AnswerValue;
use quizmate_core::model::{option_label, QuestionType};
use quizmate_core::session::QuestionView;

/// Turn one line of user input into an answer for `view`.
pub fn parse_answer(raw: &str, view: &QuestionView) -> Result<AnswerValue, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("please enter an answer".to_string());
    }

    match view.question_type {
        QuestionType::MultipleChoice => parse_option(raw, view.options.len()).map(AnswerValue::Choice),
        QuestionType::MultiSelect => {
            let indices = raw
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(|t| parse_option(t, view.options.len()))
                .collect::<Result<Vec<_>, _>>()?;
            if indices.is_empty() {
                return Err("select at least one option".to_string());
            }
            Ok(AnswerValue::Choices(indices))
        }
        QuestionType::TrueFalse => match raw.to_ascii_lowercase().as_str() {
            "t" | "true" | "a" | "1" => Ok(AnswerValue::Boolean(true)),
            "f" | "false" | "b" | "2" => Ok(AnswerValue::Boolean(false)),
            _ => Err("answer t (true) or f (false)".to_string()),
        },
        QuestionType::ShortAnswer => Err("short-answer questions are not graded here".to_string()),
    }
}

/// A letter or 1-based number naming one of `count` options.
fn parse_option(token: &str, count: usize) -> Result<usize, String> {
    let out_of_range = || match count {
        0 => "this question has no options".to_string(),
        _ => format!(
            "choose an option between A and {}",
            option_label(count - 1)
        ),
    };

    let index = if let Ok(n) = token.parse::<usize>() {
        n.checked_sub(1).ok_or_else(out_of_range)?
    } else {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                (c.to_ascii_uppercase() as u8 - b'A') as usize
            }
            _ => return Err(format!("'{token}' is not an option")),
        }
    };

    if index >= count {
        return Err(out_of_range());
    }
    Ok(index)
}
