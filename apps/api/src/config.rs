use anyhow::{bail, Context, Result};

/// Table used for tracking records when `TRACKING_TABLE` is unset.
pub const DEFAULT_TRACKING_TABLE: &str = "analysis_tracking";
pub const DEFAULT_INFERENCE_MODEL: &str = "claude-sonnet-4-5";

/// Upper bound for `ESTIMATED_COMPLETION_SECS`: one day.
pub const MAX_ESTIMATED_COMPLETION_SECS: i64 = 86_400;

/// Identifiers the service needs to be considered healthy.
/// Their absence does not stop startup; it is reported by `GET /health`.
pub const REQUIRED_ENV_VARS: &[&str] = &["TRACKING_TABLE", "RAW_INPUTS_BUCKET", "PROCESS_FUNCTION"];

/// Application configuration loaded from environment variables.
/// Startup fails only if the database URL is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub tracking_table: Option<String>,
    pub raw_inputs_bucket: Option<String>,
    pub process_function: Option<String>,
    pub s3_endpoint: Option<String>,
    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub inference_model: String,
    pub estimated_completion_secs: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: optional_env("REDIS_URL"),
            tracking_table: optional_env("TRACKING_TABLE"),
            raw_inputs_bucket: optional_env("RAW_INPUTS_BUCKET"),
            process_function: optional_env("PROCESS_FUNCTION"),
            s3_endpoint: optional_env("S3_ENDPOINT"),
            aws_region: optional_env("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: optional_env("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional_env("AWS_SECRET_ACCESS_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            inference_model: optional_env("INFERENCE_MODEL")
                .unwrap_or_else(|| DEFAULT_INFERENCE_MODEL.to_string()),
            estimated_completion_secs: parse_estimated_completion(
                optional_env("ESTIMATED_COMPLETION_SECS").as_deref().unwrap_or("30"),
            )?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Names of required identifiers that are not configured.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let values = [
            &self.tracking_table,
            &self.raw_inputs_bucket,
            &self.process_function,
        ];
        REQUIRED_ENV_VARS
            .iter()
            .zip(values)
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn tracking_table_name(&self) -> &str {
        self.tracking_table
            .as_deref()
            .unwrap_or(DEFAULT_TRACKING_TABLE)
    }

    /// The live inference engine is used only with a real API key.
    /// Placeholder values left over from templates count as unset.
    pub fn inference_api_key(&self) -> Option<&str> {
        self.anthropic_api_key
            .as_deref()
            .filter(|key| !key.to_ascii_uppercase().starts_with("PLACEHOLDER"))
    }
}

fn parse_estimated_completion(raw: &str) -> Result<i64> {
    let secs = raw
        .parse::<i64>()
        .context("ESTIMATED_COMPLETION_SECS must be an integer")?;
    if !(0..=MAX_ESTIMATED_COMPLETION_SECS).contains(&secs) {
        bail!(
            "ESTIMATED_COMPLETION_SECS must be between 0 and {MAX_ESTIMATED_COMPLETION_SECS}, got {secs}"
        );
    }
    Ok(secs)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an env var, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        redis_url: None,
        tracking_table: Some("analysis_tracking".to_string()),
        raw_inputs_bucket: Some("raw-inputs".to_string()),
        process_function: Some("process-analysis".to_string()),
        s3_endpoint: None,
        aws_region: "us-east-1".to_string(),
        aws_access_key_id: None,
        aws_secret_access_key: None,
        anthropic_api_key: None,
        inference_model: DEFAULT_INFERENCE_MODEL.to_string(),
        estimated_completion_secs: 30,
        port: 8080,
        rust_log: "info".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_lists_unset_identifiers() {
        let mut config = test_config();
        assert!(config.missing_required().is_empty());

        config.raw_inputs_bucket = None;
        config.process_function = None;
        assert_eq!(
            config.missing_required(),
            vec!["RAW_INPUTS_BUCKET", "PROCESS_FUNCTION"]
        );
    }

    #[test]
    fn test_placeholder_api_key_is_ignored() {
        let mut config = test_config();
        config.anthropic_api_key = Some("PLACEHOLDER_AGENT_ID".to_string());
        assert!(config.inference_api_key().is_none());

        config.anthropic_api_key = Some("sk-ant-real".to_string());
        assert_eq!(config.inference_api_key(), Some("sk-ant-real"));
    }

    #[test]
    fn test_tracking_table_defaults_when_unset() {
        let mut config = test_config();
        config.tracking_table = None;
        assert_eq!(config.tracking_table_name(), DEFAULT_TRACKING_TABLE);
    }

    #[test]
    fn test_estimated_completion_is_bounded() {
        assert_eq!(parse_estimated_completion("30").unwrap(), 30);
        assert_eq!(parse_estimated_completion("0").unwrap(), 0);
        assert_eq!(parse_estimated_completion("86400").unwrap(), 86_400);

        assert!(parse_estimated_completion("-1").is_err());
        assert!(parse_estimated_completion("86401").is_err());
        assert!(parse_estimated_completion("9223372036854775807").is_err());
        assert!(parse_estimated_completion("soon").is_err());
    }
}
