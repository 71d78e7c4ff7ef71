// HTTP client for the agentcheck API

use agentcheck_common::types::{
    CategoryInfo, Execution, SystemStats, TestCase, TestCategory, TestReport, TestResult, TestSuite,
};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const API_PREFIX: &str = "/api/v1";

/// Suites may run many slow cases; leave room above the per-case ceiling
const REQUEST_TIMEOUT_SECS: u64 = 900;

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    categories: Vec<CategoryInfo>,
}

#[derive(Debug, Deserialize)]
struct PredefinedCasesResponse {
    test_cases: BTreeMap<TestCategory, Vec<TestCase>>,
}

#[derive(Debug, Deserialize)]
struct ExecutionsResponse {
    executions: Vec<Execution>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Serialize)]
struct QuickTestBody<'a> {
    prompt: &'a str,
    web_page_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Serialize)]
struct ExecuteTestsBody<'a> {
    test_cases: &'a [TestCase],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Serialize)]
struct GenerateSuiteBody<'a> {
    categories: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    cases_per_category: Option<usize>,
}

/// Turn a non-success response body into a readable message
pub fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => match err.kind {
            Some(kind) => format!("{} ({}): {}", status, kind, err.error),
            None => format!("{}: {}", status, err.error),
        },
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req
            .send()
            .await
            .with_context(|| format!("Failed to reach agentcheck API at {}", self.base_url))?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response body")?;

        if !status.is_success() {
            bail!("{}", describe_failure(status, &body));
        }

        serde_json::from_str(&body).context("Unexpected response from agentcheck API")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.http.get(self.url(path))).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/health").await
    }

    pub async fn categories(&self) -> Result<Vec<CategoryInfo>> {
        Ok(self.get::<CategoriesResponse>("/test-categories").await?.categories)
    }

    pub async fn predefined_cases(&self) -> Result<BTreeMap<TestCategory, Vec<TestCase>>> {
        Ok(self
            .get::<PredefinedCasesResponse>("/predefined-test-cases")
            .await?
            .test_cases)
    }

    pub async fn quick_test(
        &self,
        prompt: &str,
        web_page_url: &str,
        model: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<TestResult> {
        let req = self.http.post(self.url("/quick-test")).json(&QuickTestBody {
            prompt,
            web_page_url,
            model,
            api_key,
        });
        self.send_json(req).await
    }

    pub async fn execute_tests(
        &self,
        test_cases: &[TestCase],
        model: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Execution> {
        let req = self.http.post(self.url("/execute-tests")).json(&ExecuteTestsBody {
            test_cases,
            model,
            api_key,
        });
        self.send_json(req).await
    }

    pub async fn generate_suite(
        &self,
        categories: &[String],
        cases_per_category: Option<usize>,
    ) -> Result<TestSuite> {
        let req = self
            .http
            .post(self.url("/generate-test-suite"))
            .json(&GenerateSuiteBody {
                categories,
                cases_per_category,
            });
        self.send_json(req).await
    }

    pub async fn executions(&self) -> Result<Vec<Execution>> {
        Ok(self.get::<ExecutionsResponse>("/executions").await?.executions)
    }

    pub async fn execution(&self, execution_id: &str) -> Result<Execution> {
        self.get(&format!("/executions/{}", execution_id)).await
    }

    pub async fn report(&self, execution_id: &str) -> Result<TestReport> {
        self.get(&format!("/executions/{}/report", execution_id)).await
    }

    pub async fn stats(&self) -> Result<SystemStats> {
        self.get("/stats").await
    }
}
