//! The quiz session state machine.
//!
//! ```text
//! NotStarted -> Presenting <-> AwaitingSubmit -> ShowingFeedback -> Presenting (next)
//!                                                               \-> Completed
//! ```
//!
//! Every mutating method takes `&mut self`, so one session has exactly one
//! writer. A rejected call returns an error and leaves the session exactly as
//! it was.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bank::{BankEntry, QuestionBank};
use crate::clock::{elapsed_secs, Clock, SystemClock};
use crate::error::{QuizError, StateError};
use crate::evaluator::{
    check_selection, evaluate, render_answer, render_correct_answer, AnswerValue,
};
use crate::model::{Difficulty, QuestionType, QuizMode};
use crate::report::CompletionSummary;
use crate::statistics::{compute_session_stats, questions_by_topic};
use crate::streak::{StreakTier, StreakTracker};
use crate::traits::{
    RecommendationGateway, RecommendationRequest, RecommendationTask, DEFAULT_GATEWAY_TIMEOUT,
};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    /// A question is shown with no answer selected.
    Presenting,
    /// A tentative answer is selected.
    AwaitingSubmit,
    /// The answer is committed and its feedback is shown.
    ShowingFeedback,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::NotStarted => "not started",
            SessionStatus::Presenting => "presenting",
            SessionStatus::AwaitingSubmit => "awaiting submit",
            SessionStatus::ShowingFeedback => "showing feedback",
            SessionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A committed answer. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_index: usize,
    pub question_type: QuestionType,
    pub user_answer: AnswerValue,
    pub is_correct: bool,
    pub time_taken_secs: f64,
    /// Topic copied from the question, or "General".
    pub topic: String,
}

/// What the presentation layer renders for the current question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    /// Zero-based position in the bank.
    pub index: usize,
    pub total: usize,
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    pub topic: String,
    pub difficulty: Option<Difficulty>,
    pub page_reference: Option<u32>,
    pub marks: Option<u32>,
    /// Current streak going into this question.
    pub streak: u32,
    /// Seconds left on a timed quiz.
    pub time_remaining_secs: Option<f64>,
}

/// Result of a submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackView {
    pub is_correct: bool,
    pub correct_answer_rendering: String,
    pub user_answer_rendering: String,
    pub explanation: String,
    pub page_reference: Option<u32>,
    pub streak: u32,
    pub streak_tier: StreakTier,
    /// No questions remain after this one.
    pub is_last: bool,
}

/// Result of an advance.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next(QuestionView),
    Completed(CompletionSummary),
}

/// Per-session knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Advisory time limit for the whole quiz.
    pub time_limit: Option<Duration>,
    /// Bound on the recommendation call.
    pub gateway_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            time_limit: None,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl SessionOptions {
    /// Options matching a bundle's quiz mode.
    pub fn from_mode(mode: &QuizMode) -> Self {
        let time_limit = (mode.time_limit_minutes > 0)
            .then(|| Duration::from_secs(u64::from(mode.time_limit_minutes) * 60));
        Self {
            time_limit,
            ..Self::default()
        }
    }
}

/// One user's pass through a question bank.
pub struct QuizSession {
    id: Uuid,
    bank: QuestionBank,
    clock: Arc<dyn Clock>,
    options: SessionOptions,
    status: SessionStatus,
    current_index: usize,
    selection: Option<AnswerValue>,
    answers: Vec<Answer>,
    streak: StreakTracker,
    started_at: Option<DateTime<Utc>>,
    presented_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    score: Option<u32>,
    summary: Option<CompletionSummary>,
    pending: Option<RecommendationTask>,
}

impl QuizSession {
    /// A session over `bank` in the `NotStarted` state.
    pub fn new(bank: QuestionBank) -> Self {
        Self {
            id: Uuid::new_v4(),
            bank,
            clock: Arc::new(SystemClock::new()),
            options: SessionOptions::default(),
            status: SessionStatus::NotStarted,
            current_index: 0,
            selection: None,
            answers: Vec::new(),
            streak: StreakTracker::new(),
            started_at: None,
            presented_at: None,
            ended_at: None,
            score: None,
            summary: None,
            pending: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Create and start a session in one step.
    pub fn begin(bank: QuestionBank) -> Result<Self, QuizError> {
        let mut session = Self::new(bank);
        session.start()?;
        Ok(session)
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Committed answers in submission order.
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// The tentative selection for the current question.
    pub fn selection(&self) -> Option<&AnswerValue> {
        self.selection.as_ref()
    }

    pub fn streak(&self) -> u32 {
        self.streak.current()
    }

    pub fn streak_tier(&self) -> StreakTier {
        self.streak.tier()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Final score, set once at completion.
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    pub fn summary(&self) -> Option<&CompletionSummary> {
        self.summary.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Seconds left before the advisory time limit, if one is set.
    pub fn time_remaining(&self) -> Option<f64> {
        let limit = self.options.time_limit?;
        let start = self.started_at?;
        let end = self.ended_at.unwrap_or_else(|| self.clock.now());
        Some((limit.as_secs_f64() - elapsed_secs(start, end)).max(0.0))
    }

    // -- transitions --------------------------------------------------------

    /// `NotStarted -> Presenting(0)`.
    pub fn start(&mut self) -> Result<QuestionView, QuizError> {
        match self.status {
            SessionStatus::NotStarted => {}
            SessionStatus::Completed => return Err(QuizError::SessionClosed),
            _ => return Err(StateError::AlreadyStarted.into()),
        }
        if self.bank.is_empty() {
            return Err(QuizError::EmptyQuestionSet);
        }

        let now = self.clock.now();
        self.started_at = Some(now);
        self.presented_at = Some(now);
        self.current_index = 0;
        self.status = SessionStatus::Presenting;

        tracing::info!(
            session_id = %self.id,
            questions = self.bank.len(),
            subject = %self.bank.subject(),
            "quiz session started"
        );
        self.current_question()
    }

    /// The question currently shown.
    pub fn current_question(&self) -> Result<QuestionView, QuizError> {
        self.ensure_open()?;
        let entry = self.bank.get(self.current_index)?;
        Ok(self.view(self.current_index, entry))
    }

    /// Store a tentative answer for the current question.
    ///
    /// Selecting again replaces the previous selection. An empty multi-select
    /// set clears it.
    pub fn select_answer(&mut self, value: AnswerValue) -> Result<(), QuizError> {
        self.ensure_open()?;
        if self.status == SessionStatus::ShowingFeedback {
            return Err(StateError::AlreadySubmitted.into());
        }

        let entry = self.bank.get(self.current_index)?;
        check_selection(&entry.question, &value)?;

        if matches!(&value, AnswerValue::Choices(v) if v.is_empty()) {
            self.selection = None;
            self.status = SessionStatus::Presenting;
        } else {
            self.selection = Some(value);
            self.status = SessionStatus::AwaitingSubmit;
        }
        Ok(())
    }

    /// Commit the tentative answer: `AwaitingSubmit -> ShowingFeedback`.
    pub fn submit(&mut self) -> Result<FeedbackView, QuizError> {
        self.ensure_open()?;
        match self.status {
            SessionStatus::AwaitingSubmit => {}
            SessionStatus::ShowingFeedback => return Err(StateError::AlreadySubmitted.into()),
            _ => return Err(StateError::NoSelection.into()),
        }
        let value = self.selection.as_ref().ok_or(StateError::NoSelection)?;
        let entry = self.bank.get(self.current_index)?;
        let is_correct = evaluate(&entry.question, value)?;

        let now = self.clock.now();
        let time_taken_secs = self
            .presented_at
            .map(|shown| elapsed_secs(shown, now))
            .unwrap_or(0.0);

        let answer = Answer {
            question_index: self.current_index,
            question_type: entry.question_type,
            user_answer: value.clone(),
            is_correct,
            time_taken_secs,
            topic: entry.question.topic_label().to_string(),
        };
        let feedback = FeedbackView {
            is_correct,
            correct_answer_rendering: render_correct_answer(&entry.question),
            user_answer_rendering: render_answer(&entry.question, value),
            explanation: entry.question.explanation.clone(),
            page_reference: entry.question.page_reference,
            streak: 0,
            streak_tier: StreakTier::None,
            is_last: self.current_index + 1 == self.bank.len(),
        };

        self.answers.push(answer);
        self.selection = None;
        let streak = self.streak.record(is_correct);
        self.status = SessionStatus::ShowingFeedback;

        tracing::debug!(
            session_id = %self.id,
            index = self.current_index,
            is_correct,
            streak,
            time_taken_secs,
            "answer submitted"
        );
        Ok(FeedbackView {
            streak,
            streak_tier: self.streak.tier(),
            ..feedback
        })
    }

    /// Move past the feedback: to the next question, or to `Completed`.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        self.ensure_open()?;
        if self.status != SessionStatus::ShowingFeedback {
            return Err(StateError::NotSubmitted.into());
        }

        let next = self.current_index + 1;
        if next < self.bank.len() {
            self.current_index = next;
            self.presented_at = Some(self.clock.now());
            self.status = SessionStatus::Presenting;
            return self.current_question().map(Advance::Next);
        }

        Ok(Advance::Completed(self.complete()))
    }

    fn complete(&mut self) -> CompletionSummary {
        let ended_at = self.clock.now();
        let started_at = self.started_at.unwrap_or(ended_at);
        let stats = compute_session_stats(&self.answers);

        let summary = CompletionSummary {
            session_id: self.id,
            subject: self.bank.subject().to_string(),
            difficulty: self.bank.predominant_difficulty(),
            started_at,
            ended_at,
            score: stats.accuracy,
            correct_count: stats.correct_count,
            total_questions: self.bank.len() as u32,
            total_time_secs: stats.total_time_secs,
            average_time_secs: stats.average_time_secs,
            topic_performance: stats.topic_performance,
            weak_topics: stats.weak_topics,
            best_streak: self.streak.best(),
            answers: self.answers.clone(),
            recommendation: None,
            warning: None,
        };

        self.ended_at = Some(ended_at);
        self.score = Some(summary.score);
        self.status = SessionStatus::Completed;
        self.summary = Some(summary.clone());

        tracing::info!(
            session_id = %self.id,
            score = summary.score,
            correct = summary.correct_count,
            total = summary.total_questions,
            weak_topics = summary.weak_topics.len(),
            "quiz session completed"
        );
        summary
    }

    // -- recommendations ----------------------------------------------------

    /// The request sent to the recommendation service for this session.
    pub fn recommendation_request(&self) -> Result<RecommendationRequest, QuizError> {
        let summary = self.summary.as_ref().ok_or(StateError::NotCompleted)?;
        let session_id = match self.bank.source_session() {
            Some(source) => source.to_string(),
            None => self.id.to_string(),
        };
        Ok(RecommendationRequest {
            session_id,
            topic: summary.subject.clone(),
            difficulty: summary.difficulty,
            total_questions: summary.total_questions,
            correct_answers: summary.correct_count,
            score_percentage: f64::from(summary.score),
            questions_by_topic: questions_by_topic(&summary.topic_performance),
        })
    }

    /// Fire the recommendation call in the background.
    ///
    /// Only valid once completed. The summary is already final at this point;
    /// the call can add an annotation or a warning, never change a number.
    /// Requires a Tokio runtime to make progress.
    pub fn request_recommendations(
        &mut self,
        gateway: Arc<dyn RecommendationGateway>,
    ) -> Result<(), QuizError> {
        let request = self.recommendation_request()?;
        self.pending = Some(RecommendationTask::spawn(
            gateway,
            request,
            self.options.gateway_timeout,
        ));
        Ok(())
    }

    /// Returns `true` while a recommendation call is outstanding.
    pub fn has_pending_recommendations(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for an outstanding recommendation call and fold its outcome into
    /// the summary. Without an outstanding call this just returns the summary.
    pub async fn resolve_recommendations(&mut self) -> Result<&CompletionSummary, QuizError> {
        if self.summary.is_none() {
            return Err(StateError::NotCompleted.into());
        }

        if let Some(task) = self.pending.take() {
            let gateway = task.gateway().to_string();
            let outcome = task.join().await;
            if let Some(summary) = self.summary.as_mut() {
                match outcome {
                    Ok(response) => {
                        tracing::debug!(session_id = %self.id, %gateway, "recommendations received");
                        summary.recommendation = Some(response);
                    }
                    Err(e) => {
                        tracing::warn!(session_id = %self.id, %gateway, "recommendations unavailable: {e}");
                        summary.warning = Some(format!("recommendations unavailable: {e}"));
                    }
                }
            }
        }

        self.summary.as_ref().ok_or(QuizError::State(StateError::NotCompleted))
    }

    /// Discard the session. An in-flight recommendation call is abandoned.
    pub fn reset(self) {
        tracing::debug!(session_id = %self.id, status = %self.status, "quiz session reset");
    }

    // -- helpers ------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), QuizError> {
        match self.status {
            SessionStatus::NotStarted => Err(StateError::NotStarted.into()),
            SessionStatus::Completed => Err(QuizError::SessionClosed),
            _ => Ok(()),
        }
    }

    fn view(&self, index: usize, entry: &BankEntry) -> QuestionView {
        let question = &entry.question;
        QuestionView {
            index,
            total: self.bank.len(),
            question_type: entry.question_type,
            text: question.text.clone(),
            options: question.options(),
            topic: question.topic_label().to_string(),
            difficulty: question.difficulty,
            page_reference: question.page_reference,
            marks: question.marks(),
            streak: self.streak.current(),
            time_remaining_secs: self.time_remaining(),
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("current_index", &self.current_index)
            .field("answers", &self.answers.len())
            .field("questions", &self.bank.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{fixed_now, ManualClock};
    use crate::error::{GatewayError, ValidationError};
    use crate::model::{
        ContentBundle, MultiSelectQuestion, MultipleChoiceQuestion, TrueFalseQuestion,
    };
    use crate::statistics::{compute_accuracy, TopicPerformance};
    use crate::traits::RecommendationResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn mc(correct: i64, topic: Option<&str>) -> MultipleChoiceQuestion {
        MultipleChoiceQuestion {
            question: "Pick one".into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: correct,
            explanation: "because b".into(),
            difficulty: Some("medium".into()),
            page_reference: Some(4),
            topic: topic.map(String::from),
        }
    }

    fn tf(correct: bool, topic: Option<&str>) -> TrueFalseQuestion {
        TrueFalseQuestion {
            question: "True?".into(),
            correct_answer: correct,
            explanation: String::new(),
            difficulty: None,
            page_reference: None,
            topic: topic.map(String::from),
        }
    }

    fn ms(correct: Vec<i64>, topic: Option<&str>) -> MultiSelectQuestion {
        MultiSelectQuestion {
            question: "Pick some".into(),
            options: vec!["x".into(), "y".into(), "z".into()],
            correct_answers: correct,
            explanation: String::new(),
            difficulty: None,
            page_reference: None,
            topic: topic.map(String::from),
            marks: Some(2),
        }
    }

    /// Q0 MC(correct=1), Q1 TF(true), Q2 MS([0,2]).
    fn three_question_bank() -> QuestionBank {
        QuestionBank::from_bundle(&ContentBundle {
            multiple_choice_questions: vec![mc(1, None)],
            true_false_questions: vec![tf(true, None)],
            multi_select_questions: vec![ms(vec![0, 2], None)],
            ..Default::default()
        })
        .unwrap()
    }

    fn session_with_clock(bank: QuestionBank) -> (QuizSession, ManualClock) {
        let clock = ManualClock::new(fixed_now());
        let session = QuizSession::new(bank).with_clock(Arc::new(clock.clone()));
        (session, clock)
    }

    fn answer_all(session: &mut QuizSession, values: Vec<AnswerValue>) -> CompletionSummary {
        let mut summary = None;
        for value in values {
            session.select_answer(value).unwrap();
            session.submit().unwrap();
            if let Advance::Completed(s) = session.advance().unwrap() {
                summary = Some(s);
            }
        }
        summary.expect("session should complete")
    }

    #[test]
    fn bank_order_is_mc_then_multi_then_true_false() {
        let bank = three_question_bank();
        let types: Vec<_> = bank.entries().iter().map(|e| e.question_type).collect();
        assert_eq!(
            types,
            vec![
                QuestionType::MultipleChoice,
                QuestionType::MultiSelect,
                QuestionType::TrueFalse
            ]
        );
    }

    #[test]
    fn all_correct_scenario() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        // bank order is MC, MS, TF
        let summary = answer_all(
            &mut session,
            vec![
                AnswerValue::Choice(1),
                AnswerValue::Choices(vec![2, 0]),
                AnswerValue::Boolean(true),
            ],
        );

        assert_eq!(summary.score, 100);
        assert_eq!(
            summary.topic_performance,
            vec![TopicPerformance {
                topic: "General".into(),
                correct: 3,
                total: 3
            }]
        );
        assert!(summary.weak_topics.is_empty());
        assert_eq!(session.score(), Some(100));
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[test]
    fn all_wrong_scenario() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        let summary = answer_all(
            &mut session,
            vec![
                AnswerValue::Choice(0),
                AnswerValue::Choices(vec![0]),
                AnswerValue::Boolean(false),
            ],
        );

        assert_eq!(summary.score, 0);
        assert_eq!(summary.weak_topics, vec!["General".to_string()]);
        assert_eq!(summary.best_streak, 0);
    }

    #[test]
    fn score_matches_recomputed_accuracy() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        let summary = answer_all(
            &mut session,
            vec![
                AnswerValue::Choice(1),
                AnswerValue::Choices(vec![0]),
                AnswerValue::Boolean(true),
            ],
        );
        assert_eq!(summary.score, 67);
        assert_eq!(summary.score, compute_accuracy(session.answers()));
        let total: u32 = summary.topic_performance.iter().map(|t| t.total).sum();
        assert_eq!(total as usize, session.answers().len());
    }

    #[test]
    fn double_submit_is_rejected() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        session.select_answer(AnswerValue::Choice(1)).unwrap();
        session.submit().unwrap();

        let err = session.submit().unwrap_err();
        assert_eq!(err, QuizError::State(StateError::AlreadySubmitted));
        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.status(), SessionStatus::ShowingFeedback);
    }

    #[test]
    fn advance_without_submit_is_rejected() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        assert_eq!(
            session.advance().unwrap_err(),
            QuizError::State(StateError::NotSubmitted)
        );

        session.select_answer(AnswerValue::Choice(0)).unwrap();
        assert_eq!(
            session.advance().unwrap_err(),
            QuizError::State(StateError::NotSubmitted)
        );
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn submit_without_selection_is_rejected() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        assert_eq!(
            session.submit().unwrap_err(),
            QuizError::State(StateError::NoSelection)
        );
        assert!(session.answers().is_empty());
    }

    #[test]
    fn empty_multi_select_clears_selection() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        session.select_answer(AnswerValue::Choice(1)).unwrap();
        session.submit().unwrap();
        session.advance().unwrap();

        session.select_answer(AnswerValue::Choices(vec![0])).unwrap();
        assert_eq!(session.status(), SessionStatus::AwaitingSubmit);
        session.select_answer(AnswerValue::Choices(vec![])).unwrap();
        assert_eq!(session.status(), SessionStatus::Presenting);
        assert!(session.selection().is_none());
        assert!(session.submit().is_err());
    }

    #[test]
    fn invalid_selection_leaves_state_unchanged() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        session.select_answer(AnswerValue::Choice(2)).unwrap();

        let err = session.select_answer(AnswerValue::Choice(7)).unwrap_err();
        assert_eq!(
            err,
            QuizError::InvalidAnswerValue(ValidationError::OptionOutOfRange {
                index: 7,
                option_count: 3
            })
        );
        assert!(session
            .select_answer(AnswerValue::Boolean(true))
            .is_err());
        assert_eq!(session.selection(), Some(&AnswerValue::Choice(2)));
        assert_eq!(session.status(), SessionStatus::AwaitingSubmit);
        assert!(session.answers().is_empty());
    }

    #[test]
    fn duplicate_selection_is_invalid() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        session.select_answer(AnswerValue::Choice(1)).unwrap();
        session.submit().unwrap();
        session.advance().unwrap();

        let err = session
            .select_answer(AnswerValue::Choices(vec![0, 2, 0]))
            .unwrap_err();
        assert_eq!(
            err,
            QuizError::InvalidAnswerValue(ValidationError::DuplicateSelection(0))
        );
    }

    #[test]
    fn select_after_submit_is_rejected() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        session.select_answer(AnswerValue::Choice(0)).unwrap();
        session.submit().unwrap();
        assert_eq!(
            session.select_answer(AnswerValue::Choice(1)).unwrap_err(),
            QuizError::State(StateError::AlreadySubmitted)
        );
        assert_eq!(session.answers()[0].user_answer, AnswerValue::Choice(0));
    }

    #[test]
    fn completed_session_is_closed() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        answer_all(
            &mut session,
            vec![
                AnswerValue::Choice(1),
                AnswerValue::Choices(vec![0, 2]),
                AnswerValue::Boolean(true),
            ],
        );

        assert_eq!(session.start().unwrap_err(), QuizError::SessionClosed);
        assert_eq!(
            session.select_answer(AnswerValue::Choice(0)).unwrap_err(),
            QuizError::SessionClosed
        );
        assert_eq!(session.submit().unwrap_err(), QuizError::SessionClosed);
        assert_eq!(session.advance().unwrap_err(), QuizError::SessionClosed);
        assert_eq!(session.answers().len(), 3);
        assert_eq!(session.score(), Some(100));
    }

    #[test]
    fn calls_before_start_are_rejected() {
        let mut session = QuizSession::new(three_question_bank());
        assert_eq!(
            session.current_question().unwrap_err(),
            QuizError::State(StateError::NotStarted)
        );
        assert_eq!(
            session.select_answer(AnswerValue::Choice(0)).unwrap_err(),
            QuizError::State(StateError::NotStarted)
        );
        session.start().unwrap();
        assert_eq!(
            session.start().unwrap_err(),
            QuizError::State(StateError::AlreadyStarted)
        );
    }

    #[test]
    fn empty_bank_cannot_start() {
        let bank = QuestionBank::from_bundle(&ContentBundle::default()).unwrap();
        let err = QuizSession::begin(bank).unwrap_err();
        assert_eq!(err, QuizError::EmptyQuestionSet);
    }

    #[test]
    fn answers_record_order_topic_and_streak() {
        let bank = QuestionBank::from_bundle(&ContentBundle {
            multiple_choice_questions: vec![
                mc(1, Some("Algebra")),
                mc(1, Some("Geometry")),
                mc(1, None),
                mc(1, Some("Algebra")),
            ],
            ..Default::default()
        })
        .unwrap();
        let mut session = QuizSession::begin(bank).unwrap();

        let mut streaks = Vec::new();
        for choice in [1, 1, 0, 1] {
            session.select_answer(AnswerValue::Choice(choice)).unwrap();
            streaks.push(session.submit().unwrap().streak);
            session.advance().unwrap();
        }
        assert_eq!(streaks, vec![1, 2, 0, 1]);

        let indices: Vec<_> = session.answers().iter().map(|a| a.question_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let topics: Vec<_> = session.answers().iter().map(|a| a.topic.as_str()).collect();
        assert_eq!(topics, vec!["Algebra", "Geometry", "General", "Algebra"]);

        let summary = session.summary().unwrap();
        assert_eq!(summary.weak_topics, vec!["General".to_string()]);
        assert_eq!(summary.best_streak, 2);
    }

    #[test]
    fn feedback_renders_correct_answer() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        session.select_answer(AnswerValue::Choice(0)).unwrap();
        let feedback = session.submit().unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.correct_answer_rendering, "B. b");
        assert_eq!(feedback.user_answer_rendering, "A. a");
        assert_eq!(feedback.explanation, "because b");
        assert_eq!(feedback.page_reference, Some(4));
        assert!(!feedback.is_last);
    }

    #[test]
    fn timing_uses_clock_and_clamps_backward_jumps() {
        let (mut session, clock) = session_with_clock(three_question_bank());
        session.start().unwrap();

        clock.advance_secs(12);
        session.select_answer(AnswerValue::Choice(1)).unwrap();
        session.submit().unwrap();
        session.advance().unwrap();

        clock.advance_secs(-30);
        session.select_answer(AnswerValue::Choices(vec![0, 2])).unwrap();
        session.submit().unwrap();
        session.advance().unwrap();

        clock.advance_secs(5);
        session.select_answer(AnswerValue::Boolean(true)).unwrap();
        session.submit().unwrap();
        let summary = match session.advance().unwrap() {
            Advance::Completed(summary) => summary,
            Advance::Next(_) => panic!("expected completion"),
        };

        let times: Vec<_> = session.answers().iter().map(|a| a.time_taken_secs).collect();
        assert_eq!(times, vec![12.0, 0.0, 5.0]);
        assert_eq!(summary.total_time_secs, 17.0);
        assert_eq!(session.started_at(), Some(fixed_now()));
    }

    #[test]
    fn time_limit_counts_down() {
        let clock = ManualClock::new(fixed_now());
        let mode = QuizMode {
            time_limit_minutes: 1,
            ..QuizMode::default()
        };
        let mut session = QuizSession::new(three_question_bank())
            .with_clock(Arc::new(clock.clone()))
            .with_options(SessionOptions::from_mode(&mode));

        let view = session.start().unwrap();
        assert_eq!(view.time_remaining_secs, Some(60.0));
        clock.advance_secs(45);
        assert_eq!(session.time_remaining(), Some(15.0));
        clock.advance_secs(30);
        assert_eq!(session.time_remaining(), Some(0.0));
    }

    #[test]
    fn untimed_sessions_report_no_limit() {
        let session = QuizSession::begin(three_question_bank()).unwrap();
        assert_eq!(session.time_remaining(), None);
        assert_eq!(session.current_question().unwrap().time_remaining_secs, None);
    }

    #[test]
    fn question_view_describes_current_entry() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        let view = session.current_question().unwrap();
        assert_eq!(view.index, 0);
        assert_eq!(view.total, 3);
        assert_eq!(view.question_type, QuestionType::MultipleChoice);
        assert_eq!(view.options.len(), 3);
        assert_eq!(view.difficulty, Some(Difficulty::Medium));

        session.select_answer(AnswerValue::Choice(1)).unwrap();
        session.submit().unwrap();
        let next = match session.advance().unwrap() {
            Advance::Next(view) => view,
            Advance::Completed(_) => panic!("expected next question"),
        };
        assert_eq!(next.question_type, QuestionType::MultiSelect);
        assert_eq!(next.marks, Some(2));
        assert_eq!(next.streak, 1);
    }

    // -- recommendations ----------------------------------------------------

    struct StubGateway {
        fail: bool,
        calls: AtomicU32,
    }

    impl StubGateway {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl RecommendationGateway for StubGateway {
        fn name(&self) -> &str {
            "stub"
        }

        async fn recommend(
            &self,
            request: &RecommendationRequest,
        ) -> Result<RecommendationResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GatewayError::Network("connection refused".into()));
            }
            Ok(RecommendationResponse {
                strengths: vec![format!("{} questions done", request.total_questions)],
                areas_for_improvement: vec![],
                recommended_actions: vec![],
                next_difficulty: "hard".into(),
                encouragement_message: "Great job!".into(),
                difficulty_progression: None,
                accuracy_by_topic: Default::default(),
            })
        }
    }

    fn completed_session() -> QuizSession {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        answer_all(
            &mut session,
            vec![
                AnswerValue::Choice(1),
                AnswerValue::Choices(vec![0, 2]),
                AnswerValue::Boolean(false),
            ],
        );
        session
    }

    #[test]
    fn recommendation_request_packages_the_attempt() {
        let session = completed_session();
        let request = session.recommendation_request().unwrap();
        assert_eq!(request.session_id, session.id().to_string());
        assert_eq!(request.topic, "General");
        assert_eq!(request.difficulty, Difficulty::Medium);
        assert_eq!(request.total_questions, 3);
        assert_eq!(request.correct_answers, 2);
        assert_eq!(request.score_percentage, 67.0);
        assert_eq!(request.questions_by_topic["General"].total, 3);
    }

    #[tokio::test]
    async fn recommendations_require_completion() {
        let mut session = QuizSession::begin(three_question_bank()).unwrap();
        let err = session
            .request_recommendations(StubGateway::new(false))
            .unwrap_err();
        assert_eq!(err, QuizError::State(StateError::NotCompleted));
        assert!(session.resolve_recommendations().await.is_err());
    }

    #[tokio::test]
    async fn recommendations_annotate_summary() {
        let mut session = completed_session();
        let gateway = StubGateway::new(false);
        session.request_recommendations(gateway.clone()).unwrap();

        let summary = session.resolve_recommendations().await.unwrap();
        let recommendation = summary.recommendation.as_ref().unwrap();
        assert_eq!(recommendation.next_difficulty, "hard");
        assert_eq!(recommendation.strengths, vec!["3 questions done".to_string()]);
        assert!(summary.warning.is_none());
        assert_eq!(summary.score, 67);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert!(!session.has_pending_recommendations());
    }

    #[tokio::test]
    async fn gateway_failure_becomes_warning() {
        let mut session = completed_session();
        let before = session.summary().unwrap().clone();
        session
            .request_recommendations(StubGateway::new(true))
            .unwrap();

        let summary = session.resolve_recommendations().await.unwrap();
        assert!(summary.recommendation.is_none());
        assert!(summary
            .warning
            .as_deref()
            .unwrap()
            .contains("connection refused"));
        assert_eq!(summary.score, before.score);
        assert_eq!(summary.topic_performance, before.topic_performance);
        assert_eq!(summary.weak_topics, before.weak_topics);
        assert_eq!(session.score(), Some(67));
    }

    #[tokio::test]
    async fn resolving_without_request_returns_plain_summary() {
        let mut session = completed_session();
        let summary = session.resolve_recommendations().await.unwrap();
        assert!(summary.recommendation.is_none());
        assert!(summary.warning.is_none());
    }

    /// Answers after `delay`, recording whether it ever got that far.
    struct SlowGateway {
        delay: Duration,
        started: AtomicBool,
        finished: AtomicBool,
    }

    #[async_trait]
    impl RecommendationGateway for SlowGateway {
        fn name(&self) -> &str {
            "slow"
        }

        async fn recommend(
            &self,
            _request: &RecommendationRequest,
        ) -> Result<RecommendationResponse, GatewayError> {
            self.started.store(true, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            Err(GatewayError::Timeout(self.delay.as_secs()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reset_abandons_pending_call() {
        let gateway = Arc::new(SlowGateway {
            delay: Duration::from_secs(10),
            started: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        });
        let mut session = completed_session();
        session.request_recommendations(gateway.clone()).unwrap();
        assert!(session.has_pending_recommendations());

        tokio::task::yield_now().await;
        assert!(gateway.started.load(Ordering::SeqCst));

        session.reset();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!gateway.finished.load(Ordering::SeqCst));
        // the aborted task dropped its handle on the gateway
        assert_eq!(Arc::strong_count(&gateway), 1);
    }
}
