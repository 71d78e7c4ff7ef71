// Prometheus metrics for test runs

use agentcheck_common::types::{Execution, TestResult};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    static ref EXECUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "agentcheck_executions_total",
        "Recorded executions by kind",
        &["kind"]
    )
    .expect("executions counter registers once");
    static ref TEST_RESULTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "agentcheck_test_results_total",
        "Test results by status and category",
        &["status", "category"]
    )
    .expect("results counter registers once");
    static ref RESPONSE_TIME_SECONDS: Histogram = register_histogram!(
        "agentcheck_response_time_seconds",
        "Provider response time per test case",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .expect("response time histogram registers once");
}

/// Force registration so every series is exported from the first scrape
pub fn register() {
    lazy_static::initialize(&EXECUTIONS_TOTAL);
    lazy_static::initialize(&TEST_RESULTS_TOTAL);
    lazy_static::initialize(&RESPONSE_TIME_SECONDS);
}

pub fn observe_result(result: &TestResult) {
    let status = result.status.to_string();
    TEST_RESULTS_TOTAL
        .with_label_values(&[status.as_str(), result.metadata.category.as_str()])
        .inc();
    RESPONSE_TIME_SECONDS.observe(result.response_time);
}

pub fn observe_execution(kind: &str, execution: &Execution) {
    EXECUTIONS_TOTAL.with_label_values(&[kind]).inc();
    for result in &execution.results {
        observe_result(result);
    }
}

pub fn observe_quick_test(result: &TestResult) {
    EXECUTIONS_TOTAL.with_label_values(&["quick"]).inc();
    observe_result(result);
}

/// Render all registered metrics in the text exposition format
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcheck_common::types::{ResultMetadata, TestCategory, TestStatus};

    #[test]
    fn test_render_includes_observed_series() {
        register();
        observe_result(&TestResult {
            test_case_id: "tc".to_string(),
            status: TestStatus::Failed,
            response_time: 0.42,
            accuracy_score: Some(0.1),
            actual_response: Some("nope".to_string()),
            error_message: None,
            metadata: ResultMetadata {
                model: "m".to_string(),
                category: TestCategory::Performance,
                tokens_used: None,
            },
        });

        let text = render().unwrap();
        assert!(text.contains("agentcheck_test_results_total"));
        assert!(text.contains("status=\"failed\""));
        assert!(text.contains("agentcheck_response_time_seconds_bucket"));
    }
}
