//! quizmate-gateway: Recommendation gateway implementations.
//!
//! Implements the `RecommendationGateway` trait for a remote analysis
//! service over HTTP and for an in-process performance analyzer, plus the
//! configuration that selects between them.

pub mod analyzer;
pub mod config;
pub mod http;
pub mod mock;

pub use analyzer::PerformanceAnalyzer;
pub use config::{create_gateway, load_config, GatewayConfig, QuizmateConfig};
pub use http::HttpGateway;
pub use mock::MockGateway;
pub use quizmate_core::error::GatewayError;
