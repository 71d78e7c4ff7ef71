// HTTP route handlers for the agentcheck API

use agentcheck_common::types::{
    CategoryInfo, Execution, SystemStats, TestCase, TestCategory, TestReport, TestResult, TestSuite,
};
use agentcheck_engine::catalog::DEFAULT_CASES_PER_CATEGORY;
use agentcheck_engine::Credentials;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteTestsRequest {
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub model: Option<String>,
    /// Optional; the server-configured key is used when omitted
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuickTestRequest {
    pub prompt: String,
    pub web_page_url: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateSuiteRequest {
    pub categories: Vec<String>,
    #[serde(default)]
    pub cases_per_category: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryInfo>,
}

#[derive(Debug, Serialize)]
pub struct PredefinedCasesResponse {
    pub test_cases: BTreeMap<TestCategory, Vec<TestCase>>,
}

#[derive(Debug, Serialize)]
pub struct ExecutionsResponse {
    pub executions: Vec<Execution>,
}

/// Client-supplied key when present, else the server-owned key
fn resolve_credentials(state: &AppState, supplied: Option<String>) -> Result<Credentials, ApiError> {
    match supplied {
        Some(key) => Ok(Credentials::new(key)?),
        None => {
            let key = state.config.server_api_key().ok_or_else(|| {
                ApiError::Validation(
                    "API key is required: none supplied and none configured on the server"
                        .to_string(),
                )
            })?;
            Ok(Credentials::new(key)?)
        }
    }
}

fn parse_execution_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation("Invalid execution ID format".to_string()))
}

/// GET /api/v1/
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "AI Agent Testing System API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/v1/health
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": "agentcheck",
        })),
    )
}

/// GET /api/v1/test-categories
pub async fn test_categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: TestCategory::ALL.into_iter().map(CategoryInfo::from).collect(),
    })
}

/// GET /api/v1/predefined-test-cases
pub async fn predefined_test_cases(
    State(state): State<Arc<AppState>>,
) -> Json<PredefinedCasesResponse> {
    let test_cases = TestCategory::ALL
        .into_iter()
        .map(|c| (c, state.catalog.cases_for(c, DEFAULT_CASES_PER_CATEGORY)))
        .collect();
    Json(PredefinedCasesResponse { test_cases })
}

/// POST /api/v1/quick-test - Run one ad-hoc prompt against a web page
pub async fn quick_test(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuickTestRequest>, JsonRejection>,
) -> Result<Json<TestResult>, ApiError> {
    let Json(request) = payload?;
    let credentials = resolve_credentials(&state, request.api_key)?;
    let model = request
        .model
        .unwrap_or_else(|| state.config.quick_test_model.clone());

    info!(model = %model, web_page_url = %request.web_page_url, "Quick test requested");

    let result = state
        .executor
        .quick_test(&request.prompt, &request.web_page_url, &model, &credentials)
        .await?;
    metrics::observe_quick_test(&result);

    Ok(Json(result))
}

/// POST /api/v1/execute-tests - Run a suite and return the recorded execution
pub async fn execute_tests(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteTestsRequest>, JsonRejection>,
) -> Result<Json<Execution>, ApiError> {
    let Json(request) = payload?;
    let credentials = resolve_credentials(&state, request.api_key)?;
    let model = request
        .model
        .unwrap_or_else(|| state.config.default_model.clone());

    info!(
        model = %model,
        test_cases = request.test_cases.len(),
        "Executing test cases"
    );

    let execution = state
        .executor
        .execute_suite(request.test_cases, &model, &credentials)
        .await?;
    metrics::observe_execution("suite", &execution);

    Ok(Json(execution))
}

/// POST /api/v1/generate-test-suite - Build a suite from the predefined catalog
pub async fn generate_test_suite(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateSuiteRequest>, JsonRejection>,
) -> Result<Json<TestSuite>, ApiError> {
    let Json(request) = payload?;

    let categories = request
        .categories
        .iter()
        .map(|raw| {
            TestCategory::parse(raw).ok_or_else(|| {
                let valid: Vec<&str> = TestCategory::ALL.iter().map(|c| c.as_str()).collect();
                ApiError::Validation(format!(
                    "Invalid category: {}. Valid categories: {}",
                    raw,
                    valid.join(", ")
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if categories.is_empty() {
        return Err(ApiError::Validation("At least one category is required".to_string()));
    }

    let per_category = request
        .cases_per_category
        .unwrap_or(DEFAULT_CASES_PER_CATEGORY);
    let suite = state.catalog.generate_suite(&categories, per_category);

    info!(
        suite_id = %suite.id,
        test_cases = suite.test_cases.len(),
        "Generated test suite"
    );

    Ok(Json(suite))
}

/// GET /api/v1/executions
pub async fn list_executions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExecutionsResponse>, ApiError> {
    let executions = state.executor.executions().await?;
    Ok(Json(ExecutionsResponse { executions }))
}

/// GET /api/v1/executions/{execution_id}
pub async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(execution_id): Path<String>,
) -> Result<Json<Execution>, ApiError> {
    let id = parse_execution_id(&execution_id)?;
    Ok(Json(state.executor.execution(id).await?))
}

/// GET /api/v1/executions/{execution_id}/report
pub async fn get_execution_report(
    State(state): State<Arc<AppState>>,
    Path(execution_id): Path<String>,
) -> Result<Json<TestReport>, ApiError> {
    let id = parse_execution_id(&execution_id)?;
    Ok(Json(state.executor.report(id).await?))
}

/// GET /api/v1/stats
pub async fn system_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemStats>, ApiError> {
    Ok(Json(state.executor.stats().await?))
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let body = metrics::render().map_err(ApiError::Internal)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
