use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Bounds for a single test case's timeout, in seconds
pub const MIN_TIMEOUT_SECONDS: u64 = 5;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Rejected input: raised before any provider call is made
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// What aspect of agent behaviour a test case probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    PromptUnderstanding,
    ResponseAccuracy,
    FallbackHandling,
    TaskExecution,
    Performance,
}

impl TestCategory {
    pub const ALL: [TestCategory; 5] = [
        TestCategory::PromptUnderstanding,
        TestCategory::ResponseAccuracy,
        TestCategory::FallbackHandling,
        TestCategory::TaskExecution,
        TestCategory::Performance,
    ];

    /// Wire value, e.g. `prompt_understanding`
    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::PromptUnderstanding => "prompt_understanding",
            TestCategory::ResponseAccuracy => "response_accuracy",
            TestCategory::FallbackHandling => "fallback_handling",
            TestCategory::TaskExecution => "task_execution",
            TestCategory::Performance => "performance",
        }
    }

    /// Parse from the wire value; `None` for anything outside the closed set
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Upper-case constant name, e.g. `PROMPT_UNDERSTANDING`
    pub fn constant_name(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Title-cased label, e.g. `Prompt Understanding`
    pub fn description(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

/// One unit of input submitted for execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<String>,
    pub category: TestCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_timeout", alias = "timeout_seconds")]
    pub timeout: u64,
}

impl TestCase {
    pub fn new(
        prompt: impl Into<String>,
        category: TestCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            prompt: prompt.into(),
            expected_response: None,
            category,
            description: description.into(),
            timeout: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn with_expected_response(mut self, expected: impl Into<String>) -> Self {
        self.expected_response = Some(expected.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Expected pattern, ignoring blank values sent by form clients
    pub fn expectation(&self) -> Option<&str> {
        self.expected_response
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::new("Prompt is required"));
        }
        if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&self.timeout) {
            return Err(ValidationError(format!(
                "Timeout must be between {} and {} seconds, got {}",
                MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS, self.timeout
            )));
        }
        Ok(())
    }
}

/// Outcome classification of one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Pending,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Error => "error",
            TestStatus::Pending => "pending",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub model: String,
    pub category: TestCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

/// Outcome of executing one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_case_id: String,
    pub status: TestStatus,
    /// Wall-clock seconds spent on the provider call
    pub response_time: f64,
    pub accuracy_score: Option<f64>,
    pub actual_response: Option<String>,
    pub error_message: Option<String>,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub category_breakdown: BTreeMap<TestCategory, usize>,
    /// Percentage of passed tests, 0-100
    pub success_rate: f64,
    pub average_response_time: f64,
    pub model_used: String,
}

/// Aggregate record of one suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Assigned by the execution store on record
    pub execution_id: Option<Uuid>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub execution_time: f64,
    pub results: Vec<TestResult>,
    pub summary: ExecutionSummary,
    pub created_at: DateTime<Utc>,
}

impl Execution {
    pub fn count_status(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Detailed view of a stored execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub execution_id: Uuid,
    pub execution_date: DateTime<Utc>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub success_rate: f64,
    pub average_response_time: f64,
    pub category_breakdown: BTreeMap<TestCategory, usize>,
    pub status_breakdown: BTreeMap<TestStatus, usize>,
    pub detailed_results: Vec<TestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_executions: usize,
    pub total_tests: usize,
    pub total_passed: usize,
    pub total_failed: usize,
    pub average_success_rate: f64,
    pub average_execution_time: f64,
    pub system_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub value: TestCategory,
    pub name: String,
    pub description: String,
}

impl From<TestCategory> for CategoryInfo {
    fn from(category: TestCategory) -> Self {
        Self {
            value: category,
            name: category.constant_name(),
            description: category.description(),
        }
    }
}
