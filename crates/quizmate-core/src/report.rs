//! Completion summary with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Difficulty;
use crate::session::Answer;
use crate::statistics::{compute_accuracy, compute_topic_performance, TopicPerformance};
use crate::traits::RecommendationResponse;

/// Everything known about a finished session.
///
/// The numeric fields are fixed at completion. A recommendation call may
/// later fill in `recommendation` or `warning`, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub session_id: Uuid,
    /// Document title, or "General".
    pub subject: String,
    /// Predominant difficulty of the bank.
    pub difficulty: Difficulty,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Percentage of correct answers, 0..=100.
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub total_time_secs: f64,
    pub average_time_secs: f64,
    pub topic_performance: Vec<TopicPerformance>,
    pub weak_topics: Vec<String>,
    pub best_streak: u32,
    pub answers: Vec<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendationResponse>,
    /// Set when the recommendation service could not be used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CompletionSummary {
    /// Save the summary as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize summary")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        Ok(())
    }

    /// Load a summary from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read summary from {}", path.display()))?;
        let summary: CompletionSummary =
            serde_json::from_str(&content).context("failed to parse summary JSON")?;
        Ok(summary)
    }

    /// Returns true if the stored numbers agree with the stored answers.
    pub fn is_consistent(&self) -> bool {
        self.score == compute_accuracy(&self.answers)
            && self.topic_performance == compute_topic_performance(&self.answers)
            && self.answers.len() == self.total_questions as usize
    }

    /// Elapsed wall time between start and completion, in seconds.
    pub fn wall_time_secs(&self) -> f64 {
        crate::clock::elapsed_secs(self.started_at, self.ended_at)
    }

    /// Format the summary as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## Quiz results: {}\n\n", self.subject));
        md.push_str(&format!(
            "**Score:** {}% ({}/{} correct)\n\n",
            self.score, self.correct_count, self.total_questions
        ));
        md.push_str(&format!(
            "**Time:** {:.1}s total, {:.1}s per question. **Best streak:** {}\n\n",
            self.total_time_secs, self.average_time_secs, self.best_streak
        ));

        if !self.topic_performance.is_empty() {
            md.push_str("| Topic | Correct | Total | Accuracy |\n");
            md.push_str("|-------|---------|-------|----------|\n");
            for row in &self.topic_performance {
                md.push_str(&format!(
                    "| {} | {} | {} | {:.0}% |\n",
                    row.topic,
                    row.correct,
                    row.total,
                    row.stat().accuracy() * 100.0
                ));
            }
            md.push('\n');
        }

        if !self.weak_topics.is_empty() {
            md.push_str(&format!("**Review:** {}\n\n", self.weak_topics.join(", ")));
        }

        if let Some(rec) = &self.recommendation {
            md.push_str("### Recommendations\n\n");
            for action in &rec.recommended_actions {
                md.push_str(&format!("- {action}\n"));
            }
            md.push_str(&format!("\nNext difficulty: {}\n", rec.next_difficulty));
            if !rec.encouragement_message.is_empty() {
                md.push_str(&format!("\n_{}_\n", rec.encouragement_message));
            }
        }

        if let Some(warning) = &self.warning {
            md.push_str(&format!("\n> Warning: {warning}\n"));
        }

        md
    }
}
