//! Mock gateway for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use quizmate_core::error::GatewayError;
use quizmate_core::traits::{RecommendationGateway, RecommendationRequest, RecommendationResponse};

/// A mock gateway for exercising sessions without a real service.
///
/// Returns a canned response or a canned failure, optionally after a delay.
pub struct MockGateway {
    outcome: Result<RecommendationResponse, GatewayError>,
    delay: Option<Duration>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<RecommendationRequest>>,
}

impl MockGateway {
    /// A mock that always returns `response`.
    pub fn with_response(response: RecommendationResponse) -> Self {
        Self::with_outcome(Ok(response))
    }

    /// A mock that always fails with `error`.
    pub fn failing(error: GatewayError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<RecommendationResponse, GatewayError>) -> Self {
        Self {
            outcome,
            delay: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of calls made to this gateway.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this gateway.
    pub fn last_request(&self) -> Option<RecommendationRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::with_response(RecommendationResponse {
            strengths: vec!["mock strength".into()],
            areas_for_improvement: vec![],
            recommended_actions: vec!["mock action".into()],
            next_difficulty: "medium".into(),
            encouragement_message: "mock encouragement".into(),
            difficulty_progression: None,
            accuracy_by_topic: Default::default(),
        })
    }
}

#[async_trait]
impl RecommendationGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, GatewayError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}
