use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,

    // LLM providers (either may be absent; agents configured for a
    // missing provider fail their calls)
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,

    // Source verification providers (each optional; absence forces
    // fall-through in the tier walk)
    pub google_books_api_key: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
    pub tavily_api_key: Option<String>,

    // Chat limits
    pub max_question_length: usize,
    pub max_conversation_history: usize,

    // Timeouts (seconds)
    pub router_timeout_secs: u64,
    pub agent_timeout_secs: u64,
    pub pipeline_timeout_secs: u64,
    pub context_timeout_secs: u64,

    // Dedup thresholds. The divergence is intentional: auto-suggest
    // skips near-topics, the scheduler only reuses near-identical claims.
    pub scheduler_dedup_threshold: f64,
    pub autosuggest_dedup_threshold: f64,
    pub autosuggest_max_topics: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::validate_env_vars();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            google_books_api_key: env::var("GOOGLE_BOOKS_API_KEY").ok(),
            semantic_scholar_api_key: env::var("SEMANTIC_SCHOLAR_API_KEY").ok(),
            tavily_api_key: env::var("TAVILY_API_KEY").ok(),
            max_question_length: parse_or("MAX_QUESTION_LENGTH", 2000),
            max_conversation_history: parse_or("MAX_CONVERSATION_HISTORY", 50),
            router_timeout_secs: parse_or("ROUTER_TIMEOUT_SECS", 15),
            agent_timeout_secs: parse_or("AGENT_TIMEOUT_SECS", 60),
            pipeline_timeout_secs: parse_or("PIPELINE_TIMEOUT_SECS", 180),
            context_timeout_secs: parse_or("CONTEXT_TIMEOUT_SECS", 10),
            scheduler_dedup_threshold: parse_or("SCHEDULER_DEDUP_THRESHOLD", 0.92),
            autosuggest_dedup_threshold: parse_or("AUTOSUGGEST_DEDUP_THRESHOLD", 0.85),
            autosuggest_max_topics: parse_or("AUTOSUGGEST_MAX_TOPICS", 10),
        })
    }

    /// Defaults for tests: no external keys, short timeouts.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            port: 0,
            openai_api_key: None,
            anthropic_api_key: None,
            google_books_api_key: None,
            semantic_scholar_api_key: None,
            tavily_api_key: None,
            max_question_length: 2000,
            max_conversation_history: 50,
            router_timeout_secs: 5,
            agent_timeout_secs: 10,
            pipeline_timeout_secs: 30,
            context_timeout_secs: 5,
            scheduler_dedup_threshold: 0.92,
            autosuggest_dedup_threshold: 0.85,
            autosuggest_max_topics: 10,
        }
    }

    /// Validate environment variables and print warnings
    fn validate_env_vars() {
        let required_vars = ["DATABASE_URL"];
        let optional_vars = [
            ("PORT", "8080"),
            ("OPENAI_API_KEY", "embeddings + openai agents disabled"),
            ("ANTHROPIC_API_KEY", "anthropic agents disabled"),
            ("GOOGLE_BOOKS_API_KEY", "book tier skipped"),
            ("SEMANTIC_SCHOLAR_API_KEY", "unauthenticated rate limits"),
            ("TAVILY_API_KEY", "web tier skipped"),
        ];

        for var in &required_vars {
            if env::var(var).is_err() {
                tracing::error!("required environment variable {} is missing", var);
            }
        }
        for (var, consequence) in &optional_vars {
            if env::var(var).is_err() {
                tracing::warn!("{} not set ({})", var, consequence);
            }
        }
    }
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
