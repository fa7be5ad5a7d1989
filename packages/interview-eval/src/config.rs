//! Run configuration.
//!
//! Built once at startup from command-line options and environment
//! variables, then passed by reference and never mutated.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};

use crate::client::{RetryPolicy, DEFAULT_CLAUDE_MODEL, DEFAULT_OPENAI_MODEL};
use crate::error::{EvalError, Result};
use crate::prompts::PromptMode;

pub const DEFAULT_OUTPUT_PATH: &str = "evaluation_results.json";
pub const DEFAULT_TRANSCRIPT_COLUMN: &str = "question_cand_answer";
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const PROVIDER_ENV: &str = "INTERVIEW_EVAL_PROVIDER";
pub const MODEL_ENV: &str = "INTERVIEW_EVAL_MODEL";
pub const PROMPT_MODE_ENV: &str = "INTERVIEW_EVAL_PROMPT_MODE";

// =============================================================================
// Provider
// =============================================================================

/// Which remote LLM service evaluates the transcripts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "claude", alias = "anthropic")]
    Claude,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
            Self::Claude => DEFAULT_CLAUDE_MODEL,
        }
    }

    /// Credential variables, most specific first.
    pub fn key_vars(self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Claude => &["CLAUDE_API_KEY", "ANTHROPIC_API_KEY"],
        }
    }

    pub fn base_url_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_BASE_URL",
            Self::Claude => "ANTHROPIC_BASE_URL",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Claude => f.write_str("claude"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "claude" | "anthropic" => Ok(Self::Claude),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// An API key that never shows up in logs or debug output.
pub struct ApiKey(SecretBox<str>);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Only call this when building the HTTP client.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

// =============================================================================
// Config
// =============================================================================

/// Options supplied on the command line; `None` falls back to the
/// environment, then to defaults.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub prompt_mode: Option<PromptMode>,
    pub column: Option<String>,
    pub concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one evaluation run.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub model: String,
    pub prompt_mode: PromptMode,
    pub api_key: ApiKey,
    pub base_url: Option<String>,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub transcript_column: String,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from options and process environment variables.
    pub fn from_env(options: RunOptions) -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::load(options, |key| std::env::var(key).ok())
    }

    /// Resolve configuration using `env` to look up variables.
    ///
    /// Fails with [`EvalError::Configuration`] when the selected provider has
    /// no credential, before anything touches the input file or network.
    pub fn load<F>(options: RunOptions, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let provider = match options.provider {
            Some(provider) => provider,
            None => env(PROVIDER_ENV)
                .map(|v| v.parse::<Provider>().map_err(EvalError::Configuration))
                .transpose()?
                .unwrap_or_default(),
        };

        let prompt_mode = match options.prompt_mode {
            Some(mode) => mode,
            None => env(PROMPT_MODE_ENV)
                .map(|v| v.parse::<PromptMode>().map_err(EvalError::Configuration))
                .transpose()?
                .unwrap_or_default(),
        };

        let model = options
            .model
            .or_else(|| env(MODEL_ENV))
            .unwrap_or_else(|| provider.default_model().to_string());

        let api_key = provider
            .key_vars()
            .iter()
            .find_map(|var| env(*var))
            .map(ApiKey::new)
            .ok_or_else(|| {
                EvalError::Configuration(format!(
                    "{} not set (required for provider '{}')",
                    provider.key_vars().join(" or "),
                    provider
                ))
            })?;

        let concurrency = options.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(EvalError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let retry = match options.max_attempts {
            Some(0) => {
                return Err(EvalError::Configuration(
                    "max attempts must be at least 1".to_string(),
                ))
            }
            Some(n) => RetryPolicy::default().with_max_attempts(n),
            None => RetryPolicy::default(),
        };

        Ok(Self {
            provider,
            model,
            prompt_mode,
            api_key,
            base_url: env(provider.base_url_var()),
            input_path: options.input,
            output_path: options
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            transcript_column: options
                .column
                .unwrap_or_else(|| DEFAULT_TRANSCRIPT_COLUMN.to_string()),
            concurrency,
            retry,
            request_timeout: Duration::from_secs(
                options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn options() -> RunOptions {
        RunOptions {
            input: PathBuf::from("interviews.csv"),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_to_openai_rubric() {
        let config = Config::load(options(), env_of(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.prompt_mode, PromptMode::Rubric);
        assert_eq!(config.api_key.expose(), "sk-test");
        assert_eq!(config.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert_eq!(config.transcript_column, DEFAULT_TRANSCRIPT_COLUMN);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let err = Config::load(options(), env_of(&[])).unwrap_err();
        match err {
            EvalError::Configuration(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let err = Config::load(options(), env_of(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn test_only_selected_provider_key_is_required() {
        let opts = RunOptions {
            provider: Some(Provider::Claude),
            ..options()
        };
        let config = Config::load(opts.clone(), env_of(&[("CLAUDE_API_KEY", "sk-ant")])).unwrap();
        assert_eq!(config.provider, Provider::Claude);
        assert_eq!(config.model, DEFAULT_CLAUDE_MODEL);

        let err = Config::load(opts, env_of(&[("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        match err {
            EvalError::Configuration(msg) => assert!(msg.contains("CLAUDE_API_KEY")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_claude_falls_back_to_anthropic_key() {
        let opts = RunOptions {
            provider: Some(Provider::Claude),
            ..options()
        };
        let config = Config::load(opts, env_of(&[("ANTHROPIC_API_KEY", "sk-ant-2")])).unwrap();
        assert_eq!(config.api_key.expose(), "sk-ant-2");
    }

    #[test]
    fn test_environment_selects_provider_model_and_mode() {
        let config = Config::load(
            options(),
            env_of(&[
                (PROVIDER_ENV, "anthropic"),
                (MODEL_ENV, "claude-3-5-haiku-latest"),
                (PROMPT_MODE_ENV, "fine-tuned"),
                ("CLAUDE_API_KEY", "sk-ant"),
                ("ANTHROPIC_BASE_URL", "http://localhost:9999"),
            ]),
        )
        .unwrap();

        assert_eq!(config.provider, Provider::Claude);
        assert_eq!(config.model, "claude-3-5-haiku-latest");
        assert_eq!(config.prompt_mode, PromptMode::FineTuned);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:9999"));
    }

    #[test]
    fn test_options_override_environment() {
        let opts = RunOptions {
            provider: Some(Provider::OpenAi),
            model: Some("ft:gpt-4o-2024-08-06:acme::abc".to_string()),
            prompt_mode: Some(PromptMode::FineTuned),
            ..options()
        };
        let config = Config::load(
            opts,
            env_of(&[
                (PROVIDER_ENV, "claude"),
                (MODEL_ENV, "claude-3-opus"),
                ("OPENAI_API_KEY", "sk-test"),
            ]),
        )
        .unwrap();

        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.model, "ft:gpt-4o-2024-08-06:acme::abc");
        assert_eq!(config.prompt_mode, PromptMode::FineTuned);
    }

    #[test]
    fn test_invalid_provider_in_environment() {
        let err = Config::load(
            options(),
            env_of(&[(PROVIDER_ENV, "mistral"), ("OPENAI_API_KEY", "sk")]),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn test_zero_concurrency_and_attempts_rejected() {
        let env = env_of(&[("OPENAI_API_KEY", "sk")]);

        let err = Config::load(
            RunOptions {
                concurrency: Some(0),
                ..options()
            },
            &env,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));

        let err = Config::load(
            RunOptions {
                max_attempts: Some(0),
                ..options()
            },
            &env,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn test_api_key_is_redacted() {
        let config = Config::load(options(), env_of(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
