use clap::{Parser, Subcommand, ValueEnum};

/// Compliance RAG - answer compliance questions from a PostgreSQL knowledge base
#[derive(Parser, Debug)]
#[command(name = "compliance-rag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// LLM provider to use
    #[arg(short, long, value_enum, global = true)]
    pub provider: Option<Provider>,

    /// Model name
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// API key for OpenAI or Anthropic
    #[arg(short, long, env = "LLM_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Ollama base URL
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub database_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log pipeline stages and generated SQL to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Interactive question loop (default)
    Chat,

    /// Answer a single question and exit
    Ask {
        /// Question in plain language
        question: String,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: Format
    },

    /// List usable tables with their schema
    Tables
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Ollama
}

impl Provider {
    /// Provider name as understood by the config layer
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
