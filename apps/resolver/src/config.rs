use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// What the decision stage does when the oracle call for one row fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the batch, naming the row that failed.
    #[default]
    FailFast,
    /// Record a placeholder decision for the row and keep going.
    BestEffort,
}

impl FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Ok(Self::FailFast),
            "best-effort" | "besteffort" | "best_effort" => Ok(Self::BestEffort),
            other => bail!("unknown failure policy '{other}' (expected fail-fast or best-effort)"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub decision_model: String,
    pub vision_model: String,
    pub failure_policy: FailurePolicy,
    /// Upper bound on in-flight decision calls. 1 keeps the batch sequential.
    pub decision_concurrency: usize,
    /// Directory holding the pdfium shared library. Falls back to the system library.
    pub pdfium_library_path: Option<PathBuf>,
    pub render_target_width: u16,
    pub output_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let decision_concurrency = parse_env("DECISION_CONCURRENCY", 1usize)?;
        if decision_concurrency == 0 {
            bail!("DECISION_CONCURRENCY must be at least 1");
        }

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            decision_model: std::env::var("DECISION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            vision_model: std::env::var("VISION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            failure_policy: parse_env("DECISION_FAILURE_POLICY", FailurePolicy::FailFast)?,
            decision_concurrency,
            pdfium_library_path: std::env::var("PDFIUM_LIBRARY_PATH").ok().map(PathBuf::from),
            render_target_width: parse_env("RENDER_TARGET_WIDTH", 1600u16)?,
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./output")),
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_policy_parses_both_spellings() {
        assert_eq!(
            "fail-fast".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::FailFast
        );
        assert_eq!(
            " Best_Effort ".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::BestEffort
        );
    }

    #[test]
    fn test_failure_policy_rejects_unknown() {
        assert!("sometimes".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_failure_policy_default_is_fail_fast() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::FailFast);
    }
}
