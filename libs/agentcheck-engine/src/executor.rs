/// Test Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Coordinate agent invocation and scoring to produce recorded executions.
///
/// **Architecture:**
/// 1. Use an `AgentInvoker` to call the model (engine.rs)
/// 2. Use a `Scorer` to judge replies (evaluator.rs)
/// 3. Aggregate results and append them to the `ExecutionStore` (store.rs)
///
/// This module is the glue layer - it knows nothing about:
/// - How the provider is reached (engine's job)
/// - How similarity is scored (evaluator's job)
/// - Where history lives (store's job)
///
/// Test cases in a suite are independent. They are dispatched concurrently
/// up to `max_concurrency`, each bounded by its own timeout, and results are
/// returned in input order regardless of completion order.

use crate::engine::{system_prompt, AgentInvoker, Credentials, InvocationRequest};
use crate::error::{ExecutorError, ProviderError};
use crate::evaluator::{aggregate_results, build_report, evaluate_reply, system_stats, PatternScorer, Scorer};
use crate::store::ExecutionStore;
use agentcheck_common::types::{
    Execution, ResultMetadata, SystemStats, TestCase, TestCategory, TestReport, TestResult,
    TestStatus, ValidationError, DEFAULT_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS, MIN_TIMEOUT_SECONDS,
};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Minimum accuracy score for a test with an expectation to pass
    pub pass_threshold: f64,
    /// Provider calls in flight per suite
    pub max_concurrency: usize,
    pub max_test_cases: usize,
    /// Timeout applied to quick tests
    pub default_timeout: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            pass_threshold: 0.7,
            max_concurrency: 4,
            max_test_cases: 100,
            default_timeout: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

pub struct TestExecutor {
    invoker: Arc<dyn AgentInvoker>,
    scorer: Arc<dyn Scorer>,
    store: Arc<dyn ExecutionStore>,
    settings: ExecutorSettings,
}

impl TestExecutor {
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        store: Arc<dyn ExecutionStore>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            invoker,
            scorer: Arc::new(PatternScorer),
            store,
            settings,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Run one test case: a single provider attempt bounded by the case's
    /// timeout. Provider failures and timeouts become `error` results.
    #[instrument(skip_all, fields(category = %test_case.category, model = model))]
    pub async fn execute_single(
        &self,
        test_case: &TestCase,
        model: &str,
        credentials: &Credentials,
    ) -> TestResult {
        let test_case_id = test_case
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let request = InvocationRequest {
            model,
            system_prompt: system_prompt(test_case.category),
            prompt: &test_case.prompt,
        };

        let start = Instant::now();
        let outcome = match tokio::time::timeout(
            Duration::from_secs(test_case.timeout),
            self.invoker.invoke(request, credentials),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout(test_case.timeout)),
        };
        let response_time = start.elapsed().as_secs_f64();

        let mut metadata = ResultMetadata {
            model: model.to_string(),
            category: test_case.category,
            tokens_used: None,
        };

        match outcome {
            Ok(reply) => {
                let judgement = evaluate_reply(
                    test_case,
                    &reply.content,
                    self.scorer.as_ref(),
                    self.settings.pass_threshold,
                );
                metadata.tokens_used = reply.tokens_used;

                debug!(
                    test_case_id = %test_case_id,
                    status = %judgement.status,
                    accuracy = ?judgement.accuracy_score,
                    response_time,
                    "Test case completed"
                );

                TestResult {
                    test_case_id,
                    status: judgement.status,
                    response_time,
                    accuracy_score: judgement.accuracy_score,
                    actual_response: Some(reply.content),
                    error_message: judgement.error_message,
                    metadata,
                }
            }
            Err(e) => {
                warn!(
                    test_case_id = %test_case_id,
                    error = %e,
                    response_time,
                    "Test case errored"
                );

                TestResult {
                    test_case_id,
                    status: TestStatus::Error,
                    response_time,
                    accuracy_score: None,
                    actual_response: None,
                    error_message: Some(e.to_string()),
                    metadata,
                }
            }
        }
    }

    fn validate_suite(&self, test_cases: &[TestCase], model: &str) -> Result<(), ValidationError> {
        if model.trim().is_empty() {
            return Err(ValidationError::new("Model is required"));
        }
        if test_cases.is_empty() {
            return Err(ValidationError::new("At least one test case is required"));
        }
        if test_cases.len() > self.settings.max_test_cases {
            return Err(ValidationError(format!(
                "Too many test cases: {} (maximum {})",
                test_cases.len(),
                self.settings.max_test_cases
            )));
        }
        for (idx, tc) in test_cases.iter().enumerate() {
            tc.validate()
                .map_err(|e| ValidationError(format!("Test case {}: {}", idx + 1, e)))?;
        }
        Ok(())
    }

    /// Run a suite and record it.
    ///
    /// Every test case yields exactly one result, positioned like its input.
    /// Only validation and store failures fail the call as a whole.
    #[instrument(skip_all, fields(model = model, test_cases = test_cases.len()))]
    pub async fn execute_suite(
        &self,
        mut test_cases: Vec<TestCase>,
        model: &str,
        credentials: &Credentials,
    ) -> Result<Execution, ExecutorError> {
        self.validate_suite(&test_cases, model)?;

        for tc in &mut test_cases {
            tc.id.get_or_insert_with(|| Uuid::new_v4().to_string());
        }

        info!(
            concurrency = self.settings.max_concurrency,
            "Executing test suite"
        );

        let start = Instant::now();
        let mut slots: Vec<Option<TestResult>> = vec![None; test_cases.len()];
        let pending: Vec<_> = test_cases
            .iter()
            .enumerate()
            .map(|(idx, tc)| async move { (idx, self.execute_single(tc, model, credentials).await) })
            .collect();
        let mut completed = stream::iter(pending)
            .buffer_unordered(self.settings.max_concurrency.max(1));
        while let Some((idx, result)) = completed.next().await {
            slots[idx] = Some(result);
        }
        let execution_time = start.elapsed().as_secs_f64();

        // Every dispatched case yields exactly one result
        let results: Vec<TestResult> = slots.into_iter().flatten().collect();

        let execution = aggregate_results(results, model, execution_time);
        let recorded = self.store.record(execution).await?;

        info!(
            execution_id = ?recorded.execution_id,
            total = recorded.total_tests,
            passed = recorded.passed_tests,
            failed = recorded.failed_tests,
            errors = recorded.count_status(TestStatus::Error),
            execution_time,
            "Test suite completed"
        );

        Ok(recorded)
    }

    /// Run an ad-hoc prompt against a web page and record it as a
    /// one-result execution
    #[instrument(skip_all, fields(model = model))]
    pub async fn quick_test(
        &self,
        prompt: &str,
        web_page_url: &str,
        model: &str,
        credentials: &Credentials,
    ) -> Result<TestResult, ExecutorError> {
        if web_page_url.trim().is_empty() {
            return Err(ValidationError::new("Web page URL is required").into());
        }
        if prompt.trim().is_empty() {
            return Err(ValidationError::new("Prompt is required").into());
        }
        if model.trim().is_empty() {
            return Err(ValidationError::new("Model is required").into());
        }

        let mut test_case = TestCase::new(
            format!("Web Page: {}\n\nTest Prompt: {}", web_page_url.trim(), prompt),
            TestCategory::PromptUnderstanding,
            "Quick test",
        )
        .with_timeout(
            self.settings
                .default_timeout
                .clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS),
        );
        test_case.id = Some(Uuid::new_v4().to_string());

        let result = self.execute_single(&test_case, model, credentials).await;

        let execution = aggregate_results(vec![result.clone()], model, result.response_time);
        let recorded = self.store.record(execution).await?;

        info!(
            execution_id = ?recorded.execution_id,
            status = %result.status,
            response_time = result.response_time,
            "Quick test completed"
        );

        Ok(result)
    }

    pub async fn executions(&self) -> Result<Vec<Execution>, ExecutorError> {
        Ok(self.store.list().await?)
    }

    pub async fn execution(&self, execution_id: Uuid) -> Result<Execution, ExecutorError> {
        self.store
            .get(execution_id)
            .await?
            .ok_or(ExecutorError::NotFound(execution_id))
    }

    pub async fn report(&self, execution_id: Uuid) -> Result<TestReport, ExecutorError> {
        let execution = self.execution(execution_id).await?;
        build_report(&execution).ok_or(ExecutorError::NotFound(execution_id))
    }

    pub async fn stats(&self) -> Result<SystemStats, ExecutorError> {
        let executions = self.store.list().await?;
        Ok(system_stats(&executions))
    }
}
