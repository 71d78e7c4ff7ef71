/// Test Evaluator - Scoring and aggregation
///
/// **Core Responsibility:**
/// Judge a raw agent reply against a test case and roll judged results up
/// into execution-level counts.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP or the provider
/// - Knows nothing about the execution store
/// - Pure functions: (test case, reply) → judgement, (results) → aggregates
///
/// **Status Rules:**
/// - No expected response: Passed, accuracy score absent
/// - Expected response: Passed when score >= threshold, else Failed
/// - Provider failures and timeouts never reach this module (executor maps
///   them to Error)

use agentcheck_common::types::{
    Execution, ExecutionSummary, SystemStats, TestCase, TestCategory, TestReport, TestResult,
    TestStatus,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};

/// Computes a similarity in [0, 1] between an expected pattern and a reply
pub trait Scorer: Send + Sync {
    fn score(&self, expected: &str, actual: &str) -> f64;
}

/// Case-insensitive pattern scorer.
///
/// Full score when the expected pattern appears verbatim (ignoring case);
/// otherwise the fraction of the pattern's words that appear in the reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternScorer;

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Scorer for PatternScorer {
    fn score(&self, expected: &str, actual: &str) -> f64 {
        let expected_lower = expected.trim().to_lowercase();
        if expected_lower.is_empty() {
            return 1.0;
        }
        if actual.to_lowercase().contains(&expected_lower) {
            return 1.0;
        }

        let wanted = words(expected);
        if wanted.is_empty() {
            return 0.0;
        }
        let found = words(actual);
        let hits = wanted.iter().filter(|w| found.contains(*w)).count();
        hits as f64 / wanted.len() as f64
    }
}

/// Verdict on one completed provider call
#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    pub status: TestStatus,
    pub accuracy_score: Option<f64>,
    pub error_message: Option<String>,
}

/// Apply the pass/fail policy to a reply that completed without error
pub fn evaluate_reply(
    test_case: &TestCase,
    actual: &str,
    scorer: &dyn Scorer,
    pass_threshold: f64,
) -> Judgement {
    let expected = match test_case.expectation() {
        Some(expected) => expected,
        None => {
            return Judgement {
                status: TestStatus::Passed,
                accuracy_score: None,
                error_message: None,
            }
        }
    };

    let score = scorer.score(expected, actual).clamp(0.0, 1.0);

    if score >= pass_threshold {
        Judgement {
            status: TestStatus::Passed,
            accuracy_score: Some(score),
            error_message: None,
        }
    } else {
        Judgement {
            status: TestStatus::Failed,
            accuracy_score: Some(score),
            error_message: Some(format!(
                "Response doesn't match expected pattern (score {:.2} below threshold {:.2})",
                score, pass_threshold
            )),
        }
    }
}

fn category_breakdown(results: &[TestResult]) -> BTreeMap<TestCategory, usize> {
    let mut breakdown = BTreeMap::new();
    for result in results {
        *breakdown.entry(result.metadata.category).or_insert(0) += 1;
    }
    breakdown
}

fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}

fn average_response_time(results: &[TestResult]) -> f64 {
    if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.response_time).sum::<f64>() / results.len() as f64
    }
}

/// Aggregate judged results into an unrecorded execution
///
/// Counts are taken by scanning `results`; the id is left for the store to
/// assign.
pub fn aggregate_results(
    results: Vec<TestResult>,
    model: &str,
    execution_time: f64,
) -> Execution {
    let total_tests = results.len();
    let passed_tests = results
        .iter()
        .filter(|r| r.status == TestStatus::Passed)
        .count();
    let failed_tests = results
        .iter()
        .filter(|r| r.status == TestStatus::Failed)
        .count();

    let summary = ExecutionSummary {
        category_breakdown: category_breakdown(&results),
        success_rate: success_rate(passed_tests, total_tests),
        average_response_time: average_response_time(&results),
        model_used: model.to_string(),
    };

    Execution {
        execution_id: None,
        total_tests,
        passed_tests,
        failed_tests,
        execution_time,
        results,
        summary,
        created_at: Utc::now(),
    }
}

/// Detailed report for a recorded execution; `None` if it has no id yet
pub fn build_report(execution: &Execution) -> Option<TestReport> {
    let execution_id = execution.execution_id?;

    let mut status_breakdown = BTreeMap::new();
    for result in &execution.results {
        *status_breakdown.entry(result.status).or_insert(0) += 1;
    }

    Some(TestReport {
        execution_id,
        execution_date: execution.created_at,
        total_tests: execution.total_tests,
        passed_tests: execution.passed_tests,
        failed_tests: execution.failed_tests,
        success_rate: success_rate(execution.passed_tests, execution.total_tests),
        average_response_time: average_response_time(&execution.results),
        category_breakdown: category_breakdown(&execution.results),
        status_breakdown,
        detailed_results: execution.results.clone(),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// System-wide totals across recorded executions
pub fn system_stats(executions: &[Execution]) -> SystemStats {
    let total_executions = executions.len();
    let total_tests: usize = executions.iter().map(|e| e.total_tests).sum();
    let total_passed: usize = executions.iter().map(|e| e.passed_tests).sum();
    let total_failed: usize = executions.iter().map(|e| e.failed_tests).sum();

    let average_execution_time = if total_executions == 0 {
        0.0
    } else {
        executions.iter().map(|e| e.execution_time).sum::<f64>() / total_executions as f64
    };

    SystemStats {
        total_executions,
        total_tests,
        total_passed,
        total_failed,
        average_success_rate: round2(success_rate(total_passed, total_tests)),
        average_execution_time: round2(average_execution_time),
        system_status: "operational".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcheck_common::types::ResultMetadata;
    use uuid::Uuid;

    /// Helper to create a result with a given status
    fn make_result(status: TestStatus, category: TestCategory, response_time: f64) -> TestResult {
        TestResult {
            test_case_id: Uuid::new_v4().to_string(),
            status,
            response_time,
            accuracy_score: None,
            actual_response: Some("reply".to_string()),
            error_message: None,
            metadata: ResultMetadata {
                model: "test-model".to_string(),
                category,
                tokens_used: None,
            },
        }
    }

    fn case_expecting(expected: &str) -> TestCase {
        TestCase::new("What is 2+2?", TestCategory::ResponseAccuracy, "math")
            .with_expected_response(expected)
    }

    #[test]
    fn test_pattern_scorer_containment() {
        let scorer = PatternScorer;
        assert_eq!(scorer.score("Paris", "The capital of France is paris."), 1.0);
        assert_eq!(scorer.score("4", "2+2 = 4"), 1.0);
        assert_eq!(scorer.score("", "anything"), 1.0);
    }

    #[test]
    fn test_pattern_scorer_partial_words() {
        let scorer = PatternScorer;
        let score = scorer.score("red green blue yellow", "I like green and blue.");
        assert!((score - 0.5).abs() < 1e-9);
        assert_eq!(scorer.score("Paris", "London"), 0.0);
        assert_eq!(scorer.score("?!", "no words match"), 0.0);
    }

    #[test]
    fn test_no_expectation_always_passes() {
        let tc = TestCase::new("Hello", TestCategory::PromptUnderstanding, "greeting");
        for reply in ["Hi there!", "", "   "] {
            let judgement = evaluate_reply(&tc, reply, &PatternScorer, 0.7);
            assert_eq!(judgement.status, TestStatus::Passed);
            assert_eq!(judgement.accuracy_score, None);
            assert_eq!(judgement.error_message, None);
        }
    }

    #[test]
    fn test_expectation_met() {
        let judgement = evaluate_reply(&case_expecting("4"), "The answer is 4.", &PatternScorer, 0.7);
        assert_eq!(judgement.status, TestStatus::Passed);
        assert_eq!(judgement.accuracy_score, Some(1.0));
    }

    #[test]
    fn test_expectation_missed() {
        let judgement = evaluate_reply(&case_expecting("4"), "five", &PatternScorer, 0.7);
        assert_eq!(judgement.status, TestStatus::Failed);
        assert_eq!(judgement.accuracy_score, Some(0.0));
        assert!(judgement.error_message.unwrap().contains("expected pattern"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        struct Fixed(f64);
        impl Scorer for Fixed {
            fn score(&self, _: &str, _: &str) -> f64 {
                self.0
            }
        }

        let tc = case_expecting("anything");
        assert_eq!(evaluate_reply(&tc, "x", &Fixed(0.7), 0.7).status, TestStatus::Passed);
        assert_eq!(evaluate_reply(&tc, "x", &Fixed(0.69), 0.7).status, TestStatus::Failed);
        assert_eq!(evaluate_reply(&tc, "x", &Fixed(0.69), 0.5).status, TestStatus::Passed);
        // Out-of-range scorers are clamped
        assert_eq!(evaluate_reply(&tc, "x", &Fixed(3.0), 0.7).accuracy_score, Some(1.0));
    }

    #[test]
    fn test_aggregate_counts() {
        let results = vec![
            make_result(TestStatus::Passed, TestCategory::PromptUnderstanding, 1.0),
            make_result(TestStatus::Failed, TestCategory::ResponseAccuracy, 2.0),
            make_result(TestStatus::Error, TestCategory::ResponseAccuracy, 3.0),
            make_result(TestStatus::Pending, TestCategory::Performance, 0.0),
        ];

        let execution = aggregate_results(results, "gpt-3.5-turbo", 3.5);

        assert_eq!(execution.execution_id, None);
        assert_eq!(execution.total_tests, 4);
        assert_eq!(execution.passed_tests, 1);
        assert_eq!(execution.failed_tests, 1);
        assert_eq!(
            execution.total_tests,
            execution.passed_tests
                + execution.failed_tests
                + execution.count_status(TestStatus::Error)
                + execution.count_status(TestStatus::Pending)
        );
        assert_eq!(execution.execution_time, 3.5);
        assert_eq!(execution.summary.success_rate, 25.0);
        assert_eq!(execution.summary.average_response_time, 1.5);
        assert_eq!(execution.summary.model_used, "gpt-3.5-turbo");
        assert_eq!(
            execution.summary.category_breakdown.get(&TestCategory::ResponseAccuracy),
            Some(&2)
        );
        assert_eq!(
            execution.summary.category_breakdown.get(&TestCategory::TaskExecution),
            None
        );
    }

    #[test]
    fn test_aggregate_empty() {
        let execution = aggregate_results(Vec::new(), "m", 0.0);
        assert_eq!(execution.total_tests, 0);
        assert_eq!(execution.summary.success_rate, 0.0);
        assert_eq!(execution.summary.average_response_time, 0.0);
    }

    #[test]
    fn test_report_requires_id() {
        let mut execution = aggregate_results(
            vec![
                make_result(TestStatus::Passed, TestCategory::TaskExecution, 0.5),
                make_result(TestStatus::Error, TestCategory::TaskExecution, 1.5),
            ],
            "m",
            1.5,
        );
        assert!(build_report(&execution).is_none());

        let id = Uuid::new_v4();
        execution.execution_id = Some(id);
        let report = build_report(&execution).unwrap();
        assert_eq!(report.execution_id, id);
        assert_eq!(report.execution_date, execution.created_at);
        assert_eq!(report.success_rate, 50.0);
        assert_eq!(report.average_response_time, 1.0);
        assert_eq!(report.status_breakdown.get(&TestStatus::Error), Some(&1));
        assert_eq!(report.category_breakdown.get(&TestCategory::TaskExecution), Some(&2));
        assert_eq!(report.detailed_results, execution.results);
    }

    #[test]
    fn test_system_stats() {
        let a = aggregate_results(
            vec![
                make_result(TestStatus::Passed, TestCategory::Performance, 1.0),
                make_result(TestStatus::Failed, TestCategory::Performance, 1.0),
            ],
            "m",
            2.0,
        );
        let b = aggregate_results(
            vec![make_result(TestStatus::Passed, TestCategory::Performance, 1.0)],
            "m",
            1.0,
        );

        let stats = system_stats(&[a, b]);
        assert_eq!(stats.total_executions, 2);
        assert_eq!(stats.total_tests, 3);
        assert_eq!(stats.total_passed, 2);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.average_success_rate, 66.67);
        assert_eq!(stats.average_execution_time, 1.5);
        assert_eq!(stats.system_status, "operational");

        let empty = system_stats(&[]);
        assert_eq!(empty.total_executions, 0);
        assert_eq!(empty.average_success_rate, 0.0);
    }
}
