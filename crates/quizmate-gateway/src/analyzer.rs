//! In-process performance analysis and adaptive difficulty.
//!
//! Keeps every attempt it is shown, keyed by session id, and derives its
//! recommendations from that history. Nothing is persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quizmate_core::error::GatewayError;
use quizmate_core::model::Difficulty;
use quizmate_core::statistics::TopicStat;
use quizmate_core::traits::{RecommendationGateway, RecommendationRequest, RecommendationResponse};

/// Topic accuracy (percent) at or above which a topic counts as a strength.
pub const STRENGTH_THRESHOLD: f64 = 70.0;
/// Topic accuracy (percent) below which a topic counts as a learning gap.
pub const GAP_THRESHOLD: f64 = 50.0;
const MAX_ACTIONS: usize = 5;
const MAX_PRIORITY_TOPICS: usize = 3;
const PROGRESSION_WINDOW: usize = 3;
/// Attempts kept per session before the oldest are dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

const NO_STRENGTHS: &str = "Keep practicing - improvement is coming!";
const NO_WEAKNESSES: &str = "No significant weak areas - excellent work!";

/// One analysed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub recorded_at: DateTime<Utc>,
    pub topic: String,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score_percentage: f64,
    pub questions_by_topic: BTreeMap<String, TopicStat>,
}

impl From<&RecommendationRequest> for AttemptRecord {
    fn from(request: &RecommendationRequest) -> Self {
        Self {
            recorded_at: Utc::now(),
            topic: request.topic.clone(),
            difficulty: request.difficulty,
            total_questions: request.total_questions,
            correct_answers: request.correct_answers,
            score_percentage: request.score_percentage,
            questions_by_topic: request.questions_by_topic.clone(),
        }
    }
}

/// Remedial work suggested for one struggling topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemedialFocus {
    pub topic: String,
    pub current_accuracy: f64,
    pub target_accuracy: f64,
    pub recommendation: String,
}

/// Topics the learner keeps getting wrong across a session's attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub gaps_identified: bool,
    pub struggling_topics: Vec<String>,
    pub prerequisite_gaps: Vec<String>,
    pub remedial_focus: Vec<RemedialFocus>,
    pub overall_recommendation: String,
}

/// Rule-based analyzer implementing [`RecommendationGateway`] without a
/// network round-trip.
///
/// History lives for as long as the analyzer does. Each session keeps at
/// most `history_limit` attempts (oldest dropped first); the number of
/// sessions is not bounded.
#[derive(Debug)]
pub struct PerformanceAnalyzer {
    history: Mutex<HashMap<String, Vec<AttemptRecord>>>,
    history_limit: usize,
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self {
            history: Mutex::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` attempts per session (at least one).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Record `request` as an attempt and analyse the session's history.
    pub fn analyze(&self, request: &RecommendationRequest) -> RecommendationResponse {
        let attempts = {
            let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            let attempts = history.entry(request.session_id.clone()).or_default();
            attempts.push(AttemptRecord::from(request));
            if attempts.len() > self.history_limit {
                let excess = attempts.len() - self.history_limit;
                attempts.drain(..excess);
            }
            attempts.clone()
        };

        let score = request.score_percentage;
        let accuracy = topic_accuracy(&attempts);
        let areas_for_improvement = weaknesses(&accuracy);
        let next_difficulty = next_difficulty(score, request.difficulty);

        let response = RecommendationResponse {
            strengths: strengths(&accuracy),
            recommended_actions: recommended_actions(score, &accuracy, next_difficulty),
            areas_for_improvement,
            next_difficulty: next_difficulty.to_string(),
            encouragement_message: encouragement(score, attempts.len()).to_string(),
            difficulty_progression: Some(difficulty_progression(&attempts).to_string()),
            accuracy_by_topic: accuracy.into_iter().collect(),
        };
        tracing::debug!(
            session_id = %request.session_id,
            attempts = attempts.len(),
            next_difficulty = %response.next_difficulty,
            "performance analysed"
        );
        response
    }

    /// Attempts recorded for `session_id`, oldest first.
    pub fn attempts(&self, session_id: &str) -> Vec<AttemptRecord> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Learning gaps across every attempt of `session_id`, or `None` if the
    /// session has no attempts yet.
    pub fn gap_analysis(&self, session_id: &str) -> Option<GapAnalysis> {
        let attempts = self.attempts(session_id);
        if attempts.is_empty() {
            return None;
        }

        let struggling: Vec<(String, f64)> = topic_accuracy(&attempts)
            .into_iter()
            .filter(|(_, accuracy)| *accuracy < GAP_THRESHOLD)
            .collect();

        Some(GapAnalysis {
            gaps_identified: !struggling.is_empty(),
            struggling_topics: struggling.iter().map(|(t, _)| t.clone()).collect(),
            prerequisite_gaps: struggling
                .iter()
                .map(|(t, _)| format!("Consider reviewing foundational concepts for {t}"))
                .collect(),
            remedial_focus: struggling
                .iter()
                .map(|(topic, accuracy)| RemedialFocus {
                    topic: topic.clone(),
                    current_accuracy: *accuracy,
                    target_accuracy: STRENGTH_THRESHOLD,
                    recommendation: format!("Generate additional easy-level questions for {topic}"),
                })
                .collect(),
            overall_recommendation: gap_recommendation(struggling.len()).to_string(),
        })
    }
}

#[async_trait]
impl RecommendationGateway for PerformanceAnalyzer {
    fn name(&self) -> &str {
        "local"
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, GatewayError> {
        Ok(self.analyze(request))
    }
}

/// Percent accuracy per topic summed over all attempts, in first-seen order.
/// Topics with no answered questions are left out.
fn topic_accuracy(attempts: &[AttemptRecord]) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, TopicStat)> = Vec::new();
    for attempt in attempts {
        for (topic, stat) in &attempt.questions_by_topic {
            match totals.iter_mut().find(|(t, _)| t == topic) {
                Some((_, sum)) => {
                    sum.correct += stat.correct;
                    sum.total += stat.total;
                }
                None => totals.push((topic.clone(), *stat)),
            }
        }
    }
    totals
        .into_iter()
        .filter(|(_, stat)| stat.total > 0)
        .map(|(topic, stat)| (topic, stat.accuracy() * 100.0))
        .collect()
}

fn describe(topic: &str, accuracy: f64) -> String {
    format!("{topic} ({accuracy:.0}% accuracy)")
}

fn strengths(accuracy: &[(String, f64)]) -> Vec<String> {
    let found: Vec<String> = accuracy
        .iter()
        .filter(|(_, a)| *a >= STRENGTH_THRESHOLD)
        .map(|(t, a)| describe(t, *a))
        .collect();
    if found.is_empty() {
        vec![NO_STRENGTHS.to_string()]
    } else {
        found
    }
}

fn weaknesses(accuracy: &[(String, f64)]) -> Vec<String> {
    let found: Vec<String> = accuracy
        .iter()
        .filter(|(_, a)| *a < STRENGTH_THRESHOLD)
        .map(|(t, a)| describe(t, *a))
        .collect();
    if found.is_empty() {
        vec![NO_WEAKNESSES.to_string()]
    } else {
        found
    }
}

/// Below 50 steps down, 85 and above steps up, anything between holds.
pub fn next_difficulty(score: f64, current: Difficulty) -> Difficulty {
    if score < 50.0 {
        current.step_down()
    } else if score < 85.0 {
        current
    } else {
        current.step_up()
    }
}

fn recommended_actions(
    score: f64,
    accuracy: &[(String, f64)],
    next: Difficulty,
) -> Vec<String> {
    let mut actions: Vec<String> = if score < 50.0 {
        vec![
            "Focus on foundational concepts before moving forward".into(),
            "Review study notes and key terms for weak topics".into(),
            "Practice with easier questions to build confidence".into(),
            "Consider creating flashcards for key concepts".into(),
        ]
    } else if score < 70.0 {
        vec![
            "Review incorrect answers and their explanations carefully".into(),
            "Focus extra study time on weak areas".into(),
            "Try answering similar questions to reinforce understanding".into(),
            "Use flashcards for active recall practice".into(),
        ]
    } else if score < 85.0 {
        vec![
            "Excellent progress! Continue with current study approach".into(),
            "Challenge yourself with harder questions on strong topics".into(),
            "Help solidify understanding by teaching concepts to others".into(),
            "Explore advanced applications of the material".into(),
        ]
    } else {
        vec![
            "Outstanding performance! You've mastered this material".into(),
            format!("Ready for {next} level challenges"),
            "Consider exploring advanced topics and real-world applications".into(),
            "Practice teaching these concepts to reinforce mastery".into(),
        ]
    };

    let weak: Vec<&str> = accuracy
        .iter()
        .filter(|(_, a)| *a < STRENGTH_THRESHOLD)
        .take(MAX_PRIORITY_TOPICS)
        .map(|(t, _)| t.as_str())
        .collect();
    if !weak.is_empty() {
        actions.push(format!("Prioritize reviewing: {}", weak.join(", ")));
    }

    actions.truncate(MAX_ACTIONS);
    actions
}

/// Picks from the score band's pool, rotating with the attempt count.
fn encouragement(score: f64, attempt_count: usize) -> &'static str {
    let pool: [&'static str; 3] = if score < 50.0 {
        [
            "Don't give up! Every expert was once a beginner. Keep practicing and you'll improve!",
            "Learning takes time. Your effort today builds tomorrow's success. Stay determined!",
            "This is just the beginning of your journey. Keep pushing forward! You've got this!",
        ]
    } else if score < 70.0 {
        [
            "You're making good progress! Keep working hard and success will follow!",
            "Good effort! With more practice, you'll master this material. Stay focused!",
            "You're on the right track! Continue studying and you'll see improvement!",
        ]
    } else if score < 85.0 {
        [
            "Great job! Your hard work is paying off. Keep up the excellent effort!",
            "Well done! You're showing strong understanding of the material!",
            "Impressive performance! You're well on your way to mastery!",
        ]
    } else {
        [
            "Exceptional work! You've demonstrated excellent mastery of this material!",
            "Outstanding! Your dedication and understanding are truly impressive!",
            "Brilliant performance! You're excelling at this level. Keep soaring!",
        ]
    };
    pool[attempt_count.saturating_sub(1) % pool.len()]
}

/// Label for the difficulty trend over the last few attempts.
fn difficulty_progression(attempts: &[AttemptRecord]) -> &'static str {
    if attempts.len() <= 1 {
        return "first_attempt";
    }

    let recent = &attempts[attempts.len().saturating_sub(PROGRESSION_WINDOW)..];
    let first = recent[0].difficulty;
    let last = recent[recent.len() - 1].difficulty;

    if recent.iter().all(|a| a.difficulty == Difficulty::Hard) {
        "consistently_challenging"
    } else if recent.iter().all(|a| a.difficulty == Difficulty::Easy) {
        "building_foundation"
    } else if last == Difficulty::Hard && first != Difficulty::Hard {
        "progressing_well"
    } else {
        "mixed_performance"
    }
}

fn gap_recommendation(gap_count: usize) -> &'static str {
    match gap_count {
        0 => "No significant learning gaps detected. Continue with current study approach.",
        1 | 2 => "Focus on strengthening understanding in identified weak areas before proceeding.",
        _ => "Consider reviewing foundational material. Multiple gaps suggest need for comprehensive review.",
    }
}
