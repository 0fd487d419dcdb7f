//! The `quizmate validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizmate_core::parser;

pub fn execute(bundle_path: PathBuf) -> Result<()> {
    let bundle = parser::load_bundle(&bundle_path)?;

    let title = bundle.title.as_deref().unwrap_or("(untitled)");
    println!(
        "Bundle: {title} ({} gradable questions: {} multiple choice, {} multi-select, {} true/false)",
        bundle.gradable_count(),
        bundle.multiple_choice_questions.len(),
        bundle.multi_select_questions.len(),
        bundle.true_false_questions.len(),
    );
    if !bundle.flashcards.is_empty() {
        println!("  {} flashcard(s)", bundle.flashcards.len());
    }

    let warnings = parser::validate_bundle(&bundle);
    for w in &warnings {
        let prefix = w
            .location
            .as_ref()
            .map(|loc| format!("  [{loc}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    let issues = parser::check_structure(&bundle);
    for issue in &issues {
        println!("  ERROR: {issue}");
    }

    if !issues.is_empty() {
        anyhow::bail!(
            "{} structural issue(s) found in {}",
            issues.len(),
            bundle_path.display()
        );
    }

    if warnings.is_empty() {
        println!("Bundle valid.");
    } else {
        println!("\nBundle valid with {} warning(s).", warnings.len());
    }

    Ok(())
}
