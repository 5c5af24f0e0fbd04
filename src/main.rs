//! # Compliance RAG
//!
//! Answers natural-language compliance questions from a PostgreSQL knowledge
//! base.
//!
//! Each question goes through one retrieval-augmented turn: a language model
//! writes a `SELECT` over the described tables, the statement is sanitized and
//! bounded, executed read-only, and the rows become the context for a second
//! model call that writes the answer.
//!
//! # Quick Start
//!
//! ```bash
//! # Interactive loop against a local Ollama model
//! export DATABASE_URL="postgres://postgres@localhost/complykaro"
//! export DATABASE_PASSWORD="..."
//! compliance-rag
//!
//! # One question, machine-readable
//! compliance-rag ask "What compliance needed for fire incident?" -f json
//!
//! # Hosted model
//! export LLM_API_KEY="sk-..."
//! compliance-rag --provider open-ai chat
//!
//! # What the model gets to see
//! compliance-rag tables
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from (in order of precedence):
//!
//! 1. Command-line arguments
//! 2. Environment variables (`LLM_API_KEY`, `DATABASE_URL`, etc.)
//! 3. `.compliance-rag.toml` in current directory
//! 4. `~/.config/compliance-rag/config.toml`
//!
//! ## Example Configuration
//!
//! ```toml
//! [llm]
//! provider = "ollama"
//! model = "llama3.2:3b"
//!
//! [database]
//! host = "localhost"
//! dbname = "complykaro"
//!
//! [pipeline]
//! synthesis = "structured"
//! ```
//!
//! # Logging
//!
//! Diagnostics go to stderr through `tracing`. The default level is `warn`,
//! `--verbose` shows pipeline stages and generated SQL, and `RUST_LOG`
//! overrides both.
//!
//! # Exit Codes
//!
//! - `0` - Normal exit, including a database or model that was unreachable at
//!   startup (reported with a hint)
//! - `1` - Configuration errors and failed one-shot answers

use std::process;

use clap::Parser;
use compliance_rag::{
    app::{apply_cli_overrides, run},
    cli::Cli,
    config::Config,
    error::{AppResult, describe}
};
use tokio::main;
use tracing_subscriber::EnvFilter;

#[main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match start(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", describe(&e));
            process::exit(1);
        }
    }
}

async fn start(cli: Cli) -> AppResult<i32> {
    let mut config = Config::load()?;
    apply_cli_overrides(&mut config, &cli);
    run(cli, config).await
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "compliance_rag=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
