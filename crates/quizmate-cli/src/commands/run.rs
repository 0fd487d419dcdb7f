//! The `quizmate run` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use quizmate_core::bank::{shuffle_bundle, QuestionBank};
use quizmate_core::model::{option_label, QuestionType, QuizMode};
use quizmate_core::parser;
use quizmate_core::report::CompletionSummary;
use quizmate_core::session::{Advance, FeedbackView, QuestionView, QuizSession, SessionOptions};
use quizmate_core::streak::StreakTier;
use quizmate_core::traits::RecommendationGateway;
use quizmate_gateway::analyzer::GapAnalysis;
use quizmate_gateway::config::load_config_from;
use quizmate_gateway::{create_gateway, GatewayConfig, PerformanceAnalyzer};

use crate::input::parse_answer;

pub async fn execute(
    bundle_path: PathBuf,
    config_path: Option<PathBuf>,
    shuffle: bool,
    seed: Option<u64>,
    offline: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let mut bundle = parser::load_bundle(&bundle_path)?;

    if shuffle || seed.is_some() || config.shuffle || bundle.quiz_mode.shuffle_questions {
        let seed = seed.unwrap_or_else(rand::random);
        eprintln!("Shuffling questions (seed {seed})");
        bundle = shuffle_bundle(&bundle, seed);
    }

    let bank = QuestionBank::from_bundle(&bundle)
        .with_context(|| format!("cannot build a quiz from {}", bundle_path.display()))?;
    tracing::info!(
        bundle = %bundle_path.display(),
        questions = bank.len(),
        "question bank ready"
    );

    // The local analyzer is kept typed so its gap analysis can be shown.
    let mut analyzer = None;
    let gateway: Option<Arc<dyn RecommendationGateway>> = if offline || config.offline {
        None
    } else if config.gateway == GatewayConfig::Local {
        let local = Arc::new(PerformanceAnalyzer::new());
        analyzer = Some(local.clone());
        Some(local)
    } else {
        create_gateway(&config.gateway)?
    };

    let options = SessionOptions {
        gateway_timeout: config.gateway.timeout(),
        ..SessionOptions::from_mode(&bundle.quiz_mode)
    };
    let mut session = QuizSession::new(bank).with_options(options);

    {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        play(
            &mut session,
            &bundle.quiz_mode,
            &mut stdin.lock(),
            &mut stdout.lock(),
        )?;
    }

    let history_key = session.recommendation_request()?.session_id;
    if let Some(gateway) = gateway {
        eprintln!("Requesting recommendations from {} gateway...", gateway.name());
        session.request_recommendations(gateway)?;
    }
    let summary = session.resolve_recommendations().await?;

    print_summary(summary);
    if let Some(gaps) = analyzer.and_then(|a| a.gap_analysis(&history_key)) {
        print_gaps(&mut std::io::stdout().lock(), &gaps)?;
    }

    if let Some(path) = output {
        summary.save_json(&path)?;
        eprintln!("Summary saved to: {}", path.display());
    }

    Ok(())
}

/// Drive `session` from start to completion over a line-based terminal.
pub fn play<R: BufRead, W: Write>(
    session: &mut QuizSession,
    mode: &QuizMode,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let mut view = session.start()?;

    loop {
        print_question(out, &view)?;

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                anyhow::bail!("input ended before the quiz was finished");
            }

            let selected = parse_answer(&line, &view)
                .and_then(|value| session.select_answer(value).map_err(|e| e.to_string()));
            match selected {
                Ok(()) if session.selection().is_some() => break,
                Ok(()) => writeln!(out, "  select at least one option")?,
                Err(msg) => writeln!(out, "  {msg}")?,
            }
        }

        let feedback = session.submit()?;
        print_feedback(out, &feedback, mode.instant_feedback)?;

        match session.advance()? {
            Advance::Next(next) => view = next,
            Advance::Completed(_) => break,
        }
    }

    Ok(())
}

fn print_question<W: Write>(out: &mut W, view: &QuestionView) -> Result<()> {
    let mut header = format!("\nQuestion {}/{} [{}]", view.index + 1, view.total, view.topic);
    if let Some(difficulty) = view.difficulty {
        header.push_str(&format!(" ({difficulty})"));
    }
    if let Some(remaining) = view.time_remaining_secs {
        let secs = remaining.ceil() as u64;
        header.push_str(&format!(" - time left {}:{:02}", secs / 60, secs % 60));
    }
    writeln!(out, "{header}")?;
    writeln!(out, "{}", view.text)?;

    match view.question_type {
        QuestionType::TrueFalse => writeln!(out, "  (t)rue / (f)alse")?,
        _ => {
            for (i, option) in view.options.iter().enumerate() {
                writeln!(out, "  {}. {}", option_label(i), option)?;
            }
        }
    }

    if view.question_type == QuestionType::MultiSelect {
        match view.marks {
            Some(marks) => writeln!(out, "Select all that apply ({marks} marks), e.g. A,C")?,
            None => writeln!(out, "Select all that apply, e.g. A,C")?,
        }
    }
    if view.time_remaining_secs == Some(0.0) {
        writeln!(out, "Time is up! Finish when you are ready.")?;
    }
    Ok(())
}

fn print_feedback<W: Write>(out: &mut W, feedback: &FeedbackView, instant: bool) -> Result<()> {
    if !instant {
        writeln!(out, "Answer recorded.")?;
        return Ok(());
    }

    if feedback.is_correct {
        let tier = match feedback.streak_tier {
            StreakTier::High => " - on fire!",
            StreakTier::Medium => " - hot streak",
            StreakTier::None => "",
        };
        writeln!(out, "Correct! Streak: {}{tier}", feedback.streak)?;
    } else {
        writeln!(
            out,
            "Incorrect. You answered {}; the correct answer is {}.",
            feedback.user_answer_rendering, feedback.correct_answer_rendering
        )?;
    }

    if !feedback.explanation.trim().is_empty() {
        writeln!(out, "  {}", feedback.explanation.trim())?;
    }
    if let Some(page) = feedback.page_reference {
        writeln!(out, "  (see page {page})")?;
    }
    Ok(())
}

fn print_gaps<W: Write>(out: &mut W, gaps: &GapAnalysis) -> Result<()> {
    if !gaps.gaps_identified {
        return Ok(());
    }

    writeln!(out, "\nLearning gaps: {}", gaps.struggling_topics.join(", "))?;
    for focus in &gaps.remedial_focus {
        writeln!(
            out,
            "  - {}: {:.0}% now, aim for {:.0}%",
            focus.topic, focus.current_accuracy, focus.target_accuracy
        )?;
    }
    writeln!(out, "  {}", gaps.overall_recommendation)?;
    Ok(())
}

fn print_summary(summary: &CompletionSummary) {
    use comfy_table::{Cell, Table};

    println!("\nQuiz complete: {}", summary.subject);
    println!(
        "Score: {}% ({}/{} correct)",
        summary.score, summary.correct_count, summary.total_questions
    );
    println!(
        "Time: {:.1}s total, {:.1}s per question",
        summary.total_time_secs, summary.average_time_secs
    );
    println!("Best streak: {}", summary.best_streak);

    let mut table = Table::new();
    table.set_header(vec!["Topic", "Correct", "Total", "Accuracy", "Status"]);
    for row in &summary.topic_performance {
        let stat = row.stat();
        table.add_row(vec![
            Cell::new(&row.topic),
            Cell::new(row.correct),
            Cell::new(row.total),
            Cell::new(format!("{:.0}%", stat.accuracy() * 100.0)),
            Cell::new(if stat.is_weak() { "needs review" } else { "ok" }),
        ]);
    }
    println!("\n{table}");

    if summary.weak_topics.is_empty() {
        println!("No weak topics.");
    } else {
        println!("Weak topics: {}", summary.weak_topics.join(", "));
    }

    if let Some(rec) = &summary.recommendation {
        println!("\nRecommendations");
        if !rec.strengths.is_empty() {
            println!("  Strengths: {}", rec.strengths.join("; "));
        }
        if !rec.areas_for_improvement.is_empty() {
            println!("  Improve: {}", rec.areas_for_improvement.join("; "));
        }
        for action in &rec.recommended_actions {
            println!("  - {action}");
        }
        println!("  Next difficulty: {}", rec.next_difficulty);
        if !rec.encouragement_message.is_empty() {
            println!("  {}", rec.encouragement_message);
        }
    }

    if let Some(warning) = &summary.warning {
        println!("\nWarning: {warning}");
    }
}
