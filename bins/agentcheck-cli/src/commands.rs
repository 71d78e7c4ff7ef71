// CLI commands for running and inspecting agent test executions
use agentcheck_common::types::{Execution, TestCase, TestResult, TestStatus};
use agentcheck_engine::catalog::TestCatalog;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::client::ApiClient;

/// Accepted shapes for a suite file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuiteFile {
    Cases(Vec<TestCase>),
    Wrapped { test_cases: Vec<TestCase> },
}

/// Read test cases from a suite file
pub fn load_suite_file(path: &Path) -> Result<Vec<TestCase>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let suite: SuiteFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(match suite {
        SuiteFile::Cases(cases) => cases,
        SuiteFile::Wrapped { test_cases } => test_cases,
    })
}

/// Problems the server would reject the suite for, one line each
pub fn suite_problems(test_cases: &[TestCase], max_test_cases: usize) -> Vec<String> {
    let mut problems = Vec::new();

    if test_cases.is_empty() {
        problems.push("No test cases provided".to_string());
    }
    if test_cases.len() > max_test_cases {
        problems.push(format!(
            "Too many test cases: {} (maximum {})",
            test_cases.len(),
            max_test_cases
        ));
    }
    for (idx, tc) in test_cases.iter().enumerate() {
        if let Err(e) = tc.validate() {
            problems.push(format!("Test case {}: {}", idx + 1, e));
        }
    }

    problems
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn status_icon(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "✅",
        TestStatus::Failed => "❌",
        TestStatus::Error => "💥",
        TestStatus::Pending => "⏳",
    }
}

fn print_result_row(result: &TestResult) {
    let score = result
        .accuracy_score
        .map(|s| format!("{:.2}", s))
        .unwrap_or_else(|| "-".to_string());
    let detail = result
        .error_message
        .as_deref()
        .or(result.actual_response.as_deref())
        .unwrap_or("");

    println!(
        "{} {:<10} {:<22} {:>7.2}s {:>6}  {}",
        status_icon(result.status),
        result.status,
        result.metadata.category,
        result.response_time,
        score,
        truncate(detail, 60)
    );
}

fn print_execution(execution: &Execution) {
    let id = execution
        .execution_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!("📋 Execution {}", id);
    println!("   Model:    {}", execution.summary.model_used);
    println!("   Created:  {}", execution.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "   Results:  {} passed, {} failed, {} errored of {}",
        execution.passed_tests,
        execution.failed_tests,
        execution.count_status(TestStatus::Error),
        execution.total_tests
    );
    println!(
        "   Success:  {:.1}%   Avg response: {:.2}s   Wall time: {:.2}s",
        execution.summary.success_rate,
        execution.summary.average_response_time,
        execution.execution_time
    );

    println!();
    println!(
        "   {:<10} {:<22} {:>8} {:>6}  {}",
        "STATUS", "CATEGORY", "TIME", "SCORE", "DETAIL"
    );
    println!("{}", "─".repeat(100));
    for result in &execution.results {
        print_result_row(result);
    }
}

pub async fn health(client: &ApiClient) -> Result<()> {
    let health = client.health().await?;
    println!("✅ {} is {}", health.service, health.status);
    Ok(())
}

pub async fn list_categories(client: &ApiClient) -> Result<()> {
    let categories = client.categories().await?;

    println!("📋 Test categories:\n");
    println!("{:<24} {:<24} {}", "VALUE", "NAME", "DESCRIPTION");
    println!("{}", "─".repeat(72));
    for info in &categories {
        println!("{:<24} {:<24} {}", info.value, info.name, info.description);
    }
    Ok(())
}

pub async fn list_predefined_cases(client: &ApiClient) -> Result<()> {
    let catalog = client.predefined_cases().await?;

    for (category, cases) in &catalog {
        println!("\n📂 {} ({} cases)", category, cases.len());
        for tc in cases {
            match tc.expectation() {
                Some(expected) => println!(
                    "   • {}  [expects: {}]",
                    truncate(&tc.prompt, 60),
                    truncate(expected, 30)
                ),
                None => println!("   • {}", truncate(&tc.prompt, 60)),
            }
        }
    }
    Ok(())
}

pub async fn quick_test(
    client: &ApiClient,
    prompt: &str,
    web_page_url: &str,
    model: Option<&str>,
    api_key: Option<&str>,
) -> Result<()> {
    println!("🚀 Quick test against {}", web_page_url);

    let result = client.quick_test(prompt, web_page_url, model, api_key).await?;

    println!(
        "{} {} in {:.2}s (model {})",
        status_icon(result.status),
        result.status,
        result.response_time,
        result.metadata.model
    );
    if let Some(response) = &result.actual_response {
        println!("\n{}", response);
    }
    if let Some(error) = &result.error_message {
        println!("\n⚠️  {}", error);
    }
    Ok(())
}

pub async fn run_suite(
    client: &ApiClient,
    file: &str,
    model: Option<&str>,
    api_key: Option<&str>,
) -> Result<()> {
    let test_cases = load_suite_file(Path::new(file))?;
    println!("🚀 Executing {} test case(s) from {}", test_cases.len(), file);

    let execution = client.execute_tests(&test_cases, model, api_key).await?;
    print_execution(&execution);

    if let Some(id) = execution.execution_id {
        println!("\n📋 Report: agentcheck-cli report {}", id);
    }
    Ok(())
}

pub fn validate_suite(file: &str, max_test_cases: usize) -> Result<()> {
    let test_cases = load_suite_file(Path::new(file))?;
    let problems = suite_problems(&test_cases, max_test_cases);

    if problems.is_empty() {
        println!("✅ {} test case(s) look valid", test_cases.len());
        return Ok(());
    }

    for problem in &problems {
        println!("❌ {}", problem);
    }
    bail!("{} problem(s) found in {}", problems.len(), file)
}

pub async fn generate_suite(
    client: &ApiClient,
    categories: &[String],
    per_category: Option<usize>,
    output: Option<&str>,
) -> Result<()> {
    let suite = client.generate_suite(categories, per_category).await?;
    let json = serde_json::to_string_pretty(&suite)?;

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path))?;
            println!("✅ {} ({} test cases) written to {}", suite.name, suite.test_cases.len(), path);
            println!("\n💡 Run it with: agentcheck-cli run --file {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn list_executions(client: &ApiClient) -> Result<()> {
    let executions = client.executions().await?;

    if executions.is_empty() {
        println!("No executions recorded yet.");
        println!("\n💡 Run a suite with: agentcheck-cli run --file <suite.json>");
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:>6} {:>6} {:>8}  {}",
        "ID", "CREATED", "TESTS", "PASS", "RATE", "MODEL"
    );
    println!("{}", "─".repeat(100));
    for execution in &executions {
        let id = execution
            .execution_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<38} {:<20} {:>6} {:>6} {:>7.1}%  {}",
            id,
            execution.created_at.format("%Y-%m-%d %H:%M:%S"),
            execution.total_tests,
            execution.passed_tests,
            execution.summary.success_rate,
            execution.summary.model_used
        );
    }

    println!("\n✅ Total: {} execution(s)", executions.len());
    Ok(())
}

pub async fn show_execution(client: &ApiClient, execution_id: &str) -> Result<()> {
    let execution = client.execution(execution_id).await?;
    print_execution(&execution);
    Ok(())
}

pub async fn show_report(client: &ApiClient, execution_id: &str) -> Result<()> {
    let report = client.report(execution_id).await?;

    println!("📊 Report for {}", report.execution_id);
    println!("   Date:     {}", report.execution_date.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "   Results:  {}/{} passed ({:.1}%)",
        report.passed_tests, report.total_tests, report.success_rate
    );
    println!("   Avg response: {:.2}s", report.average_response_time);

    println!("\n   By category:");
    for (category, count) in &report.category_breakdown {
        println!("     {:<24} {}", category, count);
    }
    println!("\n   By status:");
    for (status, count) in &report.status_breakdown {
        println!("     {} {:<10} {}", status_icon(*status), status, count);
    }

    println!();
    for result in &report.detailed_results {
        print_result_row(result);
    }
    Ok(())
}

pub async fn show_stats(client: &ApiClient) -> Result<()> {
    let stats = client.stats().await?;

    println!("📊 System statistics ({})", stats.system_status);
    println!("   Executions:          {}", stats.total_executions);
    println!(
        "   Tests:               {} ({} passed, {} failed)",
        stats.total_tests, stats.total_passed, stats.total_failed
    );
    println!("   Avg success rate:    {:.2}%", stats.average_success_rate);
    println!("   Avg execution time:  {:.2}s", stats.average_execution_time);
    Ok(())
}

pub fn init_catalog(path: &str, force: bool) -> Result<()> {
    let target = Path::new(path);
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path);
    }

    TestCatalog::builtin().save(target)?;
    println!("✅ Built-in catalog written to {}", path);
    println!("\n💡 Point the API at it with TEST_CATALOG_PATH={}", path);
    Ok(())
}
