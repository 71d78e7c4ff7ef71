// Predefined test case catalog
// Loads from config/test_cases.json, falling back to the built-in set

use agentcheck_common::types::{TestCase, TestCategory, TestSuite};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

pub const DEFAULT_CASES_PER_CATEGORY: usize = 5;

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    test_cases: BTreeMap<TestCategory, Vec<TestCase>>,
}

/// Predefined test cases, grouped by category
#[derive(Debug, Clone)]
pub struct TestCatalog {
    cases: BTreeMap<TestCategory, Vec<TestCase>>,
}

fn case(prompt: &str, description: &str, category: TestCategory) -> TestCase {
    TestCase::new(prompt, category, description)
}

impl TestCatalog {
    /// Catalog compiled into the binary
    pub fn builtin() -> Self {
        use TestCategory::*;

        let mut cases = BTreeMap::new();
        cases.insert(
            PromptUnderstanding,
            vec![
                case("Hello, how are you?", "Basic greeting understanding", PromptUnderstanding),
                case("What's the weather like?", "Ambiguous query handling", PromptUnderstanding),
                case("Can you help me with my homework?", "Request for assistance", PromptUnderstanding),
            ],
        );
        cases.insert(
            ResponseAccuracy,
            vec![
                case("What is 2+2?", "Basic math accuracy", ResponseAccuracy)
                    .with_expected_response("4"),
                case(
                    "Who is the current president of the United States?",
                    "Factual information accuracy",
                    ResponseAccuracy,
                ),
                case("What is the capital of France?", "Geographic knowledge", ResponseAccuracy)
                    .with_expected_response("Paris"),
            ],
        );
        cases.insert(
            FallbackHandling,
            vec![
                case("What is the meaning of life?", "Philosophical question handling", FallbackHandling),
                case("Tell me about the future", "Speculative question handling", FallbackHandling),
                case("What's the secret to eternal youth?", "Impossible question handling", FallbackHandling),
            ],
        );
        cases.insert(
            TaskExecution,
            vec![
                case("Write a short poem about cats", "Creative task execution", TaskExecution),
                case("Explain quantum physics in simple terms", "Complex topic explanation", TaskExecution),
                case("Give me a recipe for chocolate chip cookies", "Instruction provision", TaskExecution),
            ],
        );
        cases.insert(
            Performance,
            vec![
                case("Summarize the benefits of exercise", "Concise summarization", Performance),
                case("List 5 ways to save money", "Structured response generation", Performance),
                case("Explain photosynthesis in one sentence", "Brevity requirement", Performance),
            ],
        );

        Self { cases }
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let file: CatalogFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        for (category, cases) in &file.test_cases {
            for (idx, tc) in cases.iter().enumerate() {
                if tc.category != *category {
                    bail!(
                        "Test case {} under '{}' declares category '{}'",
                        idx + 1,
                        category,
                        tc.category
                    );
                }
                tc.validate()
                    .with_context(|| format!("Invalid test case {} under '{}'", idx + 1, category))?;
            }
        }

        if file.test_cases.values().all(Vec::is_empty) {
            bail!("No test cases defined in {}", path.display());
        }

        Ok(Self {
            cases: file.test_cases,
        })
    }

    /// Load from `path` when it exists, otherwise use the built-in catalog
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::builtin())
        }
    }

    /// Write the catalog as JSON, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let file = CatalogFile {
            test_cases: self.cases.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn all(&self) -> &BTreeMap<TestCategory, Vec<TestCase>> {
        &self.cases
    }

    /// Up to `count` cases for a category
    pub fn cases_for(&self, category: TestCategory, count: usize) -> Vec<TestCase> {
        self.cases
            .get(&category)
            .map(|cases| cases.iter().take(count).cloned().collect())
            .unwrap_or_default()
    }

    /// Assemble a named suite from the catalog, assigning ids to each case
    pub fn generate_suite(&self, categories: &[TestCategory], cases_per_category: usize) -> TestSuite {
        let test_cases: Vec<TestCase> = categories
            .iter()
            .flat_map(|category| self.cases_for(*category, cases_per_category))
            .map(|mut tc| {
                tc.id.get_or_insert_with(|| Uuid::new_v4().to_string());
                tc
            })
            .collect();

        TestSuite {
            id: Uuid::new_v4(),
            name: format!("Generated Test Suite - {}", Utc::now().format("%Y-%m-%d %H:%M")),
            description: format!(
                "Auto-generated test suite with {} test cases across {} categories",
                test_cases.len(),
                categories.len()
            ),
            test_cases,
        }
    }
}
