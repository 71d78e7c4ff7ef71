// Route table for the agentcheck API

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    let api = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/test-categories", get(handlers::test_categories))
        .route("/predefined-test-cases", get(handlers::predefined_test_cases))
        .route("/quick-test", post(handlers::quick_test))
        .route("/execute-tests", post(handlers::execute_tests))
        .route("/generate-test-suite", post(handlers::generate_test_suite))
        .route("/executions", get(handlers::list_executions))
        .route("/executions/:execution_id", get(handlers::get_execution))
        .route("/executions/:execution_id/report", get(handlers::get_execution_report))
        .route("/stats", get(handlers::system_stats));

    Router::new()
        .nest("/api/v1", api)
        .route("/metrics", get(handlers::metrics))
}
