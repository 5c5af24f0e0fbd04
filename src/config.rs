//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.compliance-rag.toml` in current directory
//! 4. `~/.config/compliance-rag/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [llm]
//! provider = "ollama"          # openai, anthropic, ollama
//! model = "llama3.2:3b"
//! ollama_url = "http://localhost:11434"
//! temperature = 0.1
//! timeout_secs = 120
//!
//! [database]
//! host = "localhost"
//! port = 5432
//! user = "postgres"
//! dbname = "complykaro"
//! schema = "public"
//!
//! [retry]
//! max_retries = 1
//! initial_delay_ms = 500
//!
//! [pipeline]
//! synthesis = "free_text"      # or "structured"
//! schema_table_limit = 3
//! sample_rows = 3
//! ```
//!
//! Secrets never live in config files: a `password` under `[database]`, or a
//! `url` carrying a password, is rejected. Use `DATABASE_PASSWORD` or
//! `DATABASE_URL` from the environment instead.
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `LLM_API_KEY` | API key for OpenAI/Anthropic |
//! | `LLM_PROVIDER` | Provider name |
//! | `LLM_MODEL` | Model identifier |
//! | `OLLAMA_URL` | Ollama base URL |
//! | `DATABASE_URL` | PostgreSQL connection URL |
//! | `DATABASE_PASSWORD` | PostgreSQL password |

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration
};

use serde::Deserialize;
use tokio_postgres::config::Host;

use crate::error::{AppResult, config_error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm:      LlmConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retry:    RetryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider:     Option<String>,
    pub api_key:      Option<String>,
    pub model:        Option<String>,
    pub ollama_url:   Option<String>,
    pub temperature:  f32,
    pub timeout_secs: u64
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider:     None,
            api_key:      None,
            model:        None,
            ollama_url:   Some(String::from("http://localhost:11434")),
            temperature:  0.1,
            timeout_secs: 120
        }
    }
}

/// PostgreSQL knowledge base configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the discrete fields
    pub url:                    Option<String>,
    pub host:                   String,
    pub port:                   u16,
    pub user:                   String,
    pub dbname:                 String,
    /// Schema whose tables are exposed to the model
    pub schema:                 String,
    /// Only ever populated from `DATABASE_PASSWORD`
    pub password:               Option<String>,
    pub connect_timeout_secs:   u64,
    pub statement_timeout_secs: u64
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url:                    None,
            host:                   String::from("localhost"),
            port:                   5432,
            user:                   String::from("postgres"),
            dbname:                 String::from("postgres"),
            schema:                 String::from("public"),
            password:               None,
            connect_timeout_secs:   10,
            statement_timeout_secs: 30
        }
    }
}

/// Largest `statement_timeout` PostgreSQL accepts, in whole seconds
pub const MAX_STATEMENT_TIMEOUT_SECS: u64 = i32::MAX as u64 / 1000;

impl DatabaseConfig {
    /// Reject settings no connection attempt could fix
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=MAX_STATEMENT_TIMEOUT_SECS).contains(&self.statement_timeout_secs) {
            return Err(config_error(format!(
                "database.statement_timeout_secs must be between 1 and {}",
                MAX_STATEMENT_TIMEOUT_SECS
            )));
        }
        self.pg_config().map(|_| ())
    }

    /// Build the driver configuration, merging the environment password in
    pub fn pg_config(&self) -> AppResult<tokio_postgres::Config> {
        let mut pg = match &self.url {
            Some(url) => url
                .parse::<tokio_postgres::Config>()
                .map_err(|e| config_error(format!("Invalid database URL: {}", e)))?,
            None => {
                let mut pg = tokio_postgres::Config::new();
                pg.host(&self.host)
                    .port(self.port)
                    .user(&self.user)
                    .dbname(&self.dbname);
                pg
            }
        };
        if let Some(password) = &self.password {
            pg.password(password);
        }
        pg.connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .application_name("compliance-rag");
        Ok(pg)
    }

    /// Human-readable target without credentials (`user@host:port/db`)
    pub fn display_target(&self) -> String {
        let Some(url) = &self.url else {
            return format!("{}@{}:{}/{}", self.user, self.host, self.port, self.dbname);
        };
        match url.parse::<tokio_postgres::Config>() {
            Ok(pg) => {
                let host = pg
                    .get_hosts()
                    .first()
                    .map(|h| match h {
                        Host::Tcp(name) => name.clone(),
                        #[allow(unreachable_patterns)]
                        _ => String::from("local socket")
                    })
                    .unwrap_or_else(|| String::from("localhost"));
                let port = pg.get_ports().first().copied().unwrap_or(5432);
                format!(
                    "{}@{}:{}/{}",
                    pg.get_user().unwrap_or("postgres"),
                    host,
                    port,
                    pg.get_dbname().unwrap_or("postgres")
                )
            }
            Err(_) => String::from("<invalid database URL>")
        }
    }
}

/// Retry configuration for LLM requests and the startup connect
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries:      u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms:     u64,
    pub backoff_factor:   f64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries:      1,
            initial_delay_ms: 500,
            max_delay_ms:     5000,
            backoff_factor:   2.0
        }
    }
}

/// How the model is asked for SQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    /// Model writes SQL text, sanitized afterwards
    #[default]
    FreeText,
    /// Model writes a JSON query plan, SQL is rendered locally
    Structured
}

/// Per-turn pipeline settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub synthesis:          SynthesisMode,
    /// Number of tables described to the model
    pub schema_table_limit: usize,
    /// Example rows shown per described table
    pub sample_rows:        usize,
    /// Limit appended when generated SQL has none
    pub default_limit:      u32,
    /// Limit used by the fallback query
    pub fallback_limit:     u32
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            synthesis:          SynthesisMode::FreeText,
            schema_table_limit: 3,
            sample_rows:        3,
            default_limit:      20,
            fallback_limit:     5
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file in current directory (.compliance-rag.toml)
    /// 3. Config file in home directory (~/.config/compliance-rag/config.toml)
    /// 4. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("compliance-rag")
                .join("config.toml");
            if home_config.exists() {
                config = Self::load_from(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".compliance-rag.toml");
        if local_config.exists() {
            config = Self::load_from(&local_config)?;
        }

        config.apply_env();
        Ok(config)
    }

    /// Load a single config file without consulting the environment
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse config file contents, rejecting inline database credentials
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| config_error(format!("Invalid config file: {}", e)))?;
        if config.database.password.is_some() {
            return Err(config_error(
                "Database password must not be stored in a config file; set DATABASE_PASSWORD"
            ));
        }
        if let Some(url) = &config.database.url {
            let pg = url
                .parse::<tokio_postgres::Config>()
                .map_err(|e| config_error(format!("Invalid database URL: {}", e)))?;
            if pg.get_password().is_some() {
                return Err(config_error(
                    "Database URL in a config file must not carry a password; set DATABASE_PASSWORD"
                ));
            }
        }
        config.database.validate()?;
        Ok(config)
    }

    /// Override with environment variables
    pub fn apply_env(&mut self) {
        if let Ok(api_key) = env::var("LLM_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(provider) = env::var("LLM_PROVIDER") {
            self.llm.provider = Some(provider);
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = Some(model);
        }

        if let Ok(url) = env::var("OLLAMA_URL") {
            self.llm.ollama_url = Some(url);
        }

        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }

        if let Ok(password) = env::var("DATABASE_PASSWORD") {
            self.database.password = Some(password);
        }
    }
}
