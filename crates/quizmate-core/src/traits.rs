//! The recommendation gateway contract.
//!
//! Implemented by the `quizmate-gateway` crate. The session only ever calls a
//! gateway after it has completed, from a spawned task, so nothing here can
//! block or re-enter a state transition.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::GatewayError;
use crate::model::Difficulty;
use crate::statistics::TopicStat;

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// An adaptive-difficulty / performance-analysis backend.
#[async_trait]
pub trait RecommendationGateway: Send + Sync {
    /// Human-readable gateway name (e.g. "http").
    fn name(&self) -> &str;

    /// Analyze one finished quiz attempt.
    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, GatewayError>;
}

/// What the core sends once a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub session_id: String,
    /// Subject of the quiz (document title or "General").
    pub topic: String,
    /// Predominant difficulty of the questions asked.
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score_percentage: f64,
    /// `{topic: {correct, total}}`.
    pub questions_by_topic: BTreeMap<String, TopicStat>,
}

/// Opaque annotation shown next to the completion summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    /// Suggested difficulty for the next quiz, as the service spells it.
    pub next_difficulty: String,
    #[serde(default)]
    pub encouragement_message: String,
    #[serde(default)]
    pub difficulty_progression: Option<String>,
    /// Percent accuracy per topic across the user's attempts.
    #[serde(default)]
    pub accuracy_by_topic: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// In-flight call
// ---------------------------------------------------------------------------

/// Default bound on a recommendation call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

type GatewayResult = Result<RecommendationResponse, GatewayError>;

enum TaskState {
    Running(JoinHandle<GatewayResult>),
    Failed(GatewayError),
    Finished,
}

/// A recommendation call running on the Tokio runtime.
///
/// Dropping the task aborts the call; nothing is retried.
pub struct RecommendationTask {
    gateway: String,
    state: TaskState,
}

impl RecommendationTask {
    /// Issue `request` on a background task bounded by `timeout`.
    ///
    /// Outside a Tokio runtime the task resolves immediately to an error
    /// instead of panicking.
    pub fn spawn(
        gateway: Arc<dyn RecommendationGateway>,
        request: RecommendationRequest,
        timeout: Duration,
    ) -> Self {
        let name = gateway.name().to_string();
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                return Self {
                    gateway: name,
                    state: TaskState::Failed(GatewayError::Network(format!(
                        "no async runtime available: {e}"
                    ))),
                };
            }
        };

        tracing::debug!(gateway = %name, session_id = %request.session_id, "dispatching recommendation request");
        let handle = runtime.spawn(async move {
            match tokio::time::timeout(timeout, gateway.recommend(&request)).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout(timeout.as_secs())),
            }
        });

        Self {
            gateway: name,
            state: TaskState::Running(handle),
        }
    }

    /// Name of the gateway being called.
    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Returns `true` once the call has produced a result.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            TaskState::Running(handle) => handle.is_finished(),
            TaskState::Failed(_) | TaskState::Finished => true,
        }
    }

    /// Wait for the call to finish.
    pub async fn join(mut self) -> GatewayResult {
        match std::mem::replace(&mut self.state, TaskState::Finished) {
            TaskState::Running(handle) => match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(GatewayError::Abandoned),
                Err(e) => Err(GatewayError::Network(format!(
                    "recommendation task failed: {e}"
                ))),
            },
            TaskState::Failed(err) => Err(err),
            TaskState::Finished => Err(GatewayError::Abandoned),
        }
    }

    /// Cancel the call without waiting.
    pub fn abandon(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let TaskState::Running(handle) = std::mem::replace(&mut self.state, TaskState::Finished)
        {
            if !handle.is_finished() {
                tracing::debug!(gateway = %self.gateway, "abandoning in-flight recommendation request");
            }
            handle.abort();
        }
    }
}

impl Drop for RecommendationTask {
    fn drop(&mut self) {
        self.abort();
    }
}

impl std::fmt::Debug for RecommendationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationTask")
            .field("gateway", &self.gateway)
            .field("finished", &self.is_finished())
            .finish()
    }
}
