// Service configuration, read from the environment

use std::str::FromStr;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_QUICK_TEST_MODEL: &str = "qwen/qwen-2.5-72b-instruct:free";
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.7;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct Config {
    pub openrouter_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub provider_base_url: String,
    pub default_model: String,
    pub quick_test_model: String,
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_test_cases: usize,
    pub test_timeout_seconds: u64,
    pub pass_threshold: f64,
    pub max_concurrent_tests: usize,
    pub catalog_path: String,
}

// Keys stay out of log output
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openrouter_api_key", &self.openrouter_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("provider_base_url", &self.provider_base_url)
            .field("default_model", &self.default_model)
            .field("quick_test_model", &self.quick_test_model)
            .field("redis_url", &self.redis_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .field("max_test_cases", &self.max_test_cases)
            .field("test_timeout_seconds", &self.test_timeout_seconds)
            .field("pass_threshold", &self.pass_threshold)
            .field("max_concurrent_tests", &self.max_concurrent_tests)
            .field("catalog_path", &self.catalog_path)
            .finish()
    }
}

impl Config {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let pass_threshold: f64 = parse_or(&lookup, "PASS_THRESHOLD", DEFAULT_PASS_THRESHOLD)?;
        if !(0.0..=1.0).contains(&pass_threshold) {
            return Err(ConfigError::Invalid {
                key: "PASS_THRESHOLD",
                value: pass_threshold.to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }

        let max_concurrent_tests: usize = parse_or(&lookup, "MAX_CONCURRENT_TESTS", 4)?;
        if max_concurrent_tests == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_CONCURRENT_TESTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let cors_origins = match non_empty("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            openrouter_api_key: non_empty("OPENROUTER_API_KEY"),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            provider_base_url: non_empty("PROVIDER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string()),
            default_model: non_empty("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            quick_test_model: non_empty("QUICK_TEST_MODEL")
                .unwrap_or_else(|| DEFAULT_QUICK_TEST_MODEL.to_string()),
            redis_url: non_empty("REDIS_URL"),
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8000)?,
            cors_origins,
            max_test_cases: parse_or(&lookup, "MAX_TEST_CASES", 100)?,
            test_timeout_seconds: parse_or(&lookup, "TEST_TIMEOUT", 30)?,
            pass_threshold,
            max_concurrent_tests,
            catalog_path: non_empty("TEST_CATALOG_PATH")
                .unwrap_or_else(|| "config/test_cases.json".to_string()),
        })
    }

    /// Server-owned provider key: OpenRouter first, then OpenAI
    pub fn server_api_key(&self) -> Option<&str> {
        self.openrouter_api_key
            .as_deref()
            .or(self.openai_api_key.as_deref())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.provider_base_url, DEFAULT_PROVIDER_BASE_URL);
        assert_eq!(config.default_model, "gpt-3.5-turbo");
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_test_cases, 100);
        assert_eq!(config.pass_threshold, 0.7);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.server_api_key(), None);
        assert_eq!(config.cors_origins.len(), 4);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_server_key_precedence() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-openai")]).unwrap();
        assert_eq!(config.server_api_key(), Some("sk-openai"));

        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("OPENROUTER_API_KEY", "sk-or"),
        ])
        .unwrap();
        assert_eq!(config.server_api_key(), Some("sk-or"));

        let config = config_from(&[("OPENROUTER_API_KEY", "  ")]).unwrap();
        assert_eq!(config.server_api_key(), None);
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("PASS_THRESHOLD", "1.5")]).is_err());
        assert!(config_from(&[("MAX_CONCURRENT_TESTS", "0")]).is_err());
        let config = config_from(&[("PASS_THRESHOLD", "0.9")]).unwrap();
        assert_eq!(config.pass_threshold, 0.9);
    }

    #[test]
    fn test_cors_list() {
        let config = config_from(&[("CORS_ORIGINS", "http://a.test, http://b.test,")]).unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = config_from(&[("OPENROUTER_API_KEY", "sk-secret-value")]).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("<redacted>"));
    }
}
