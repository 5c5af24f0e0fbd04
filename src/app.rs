//! Application logic for the compliance RAG CLI.
//!
//! This module contains the command handlers separated from the main entry
//! point to enable testing.

use std::io::{self, Write};

use tokio::io::BufReader;

use crate::{
    cli::{Cli, Commands, Format},
    config::Config,
    error::{AppResult, write_error},
    llm::LlmProvider,
    output::{
        OutputFormat, OutputOptions, format_banner, format_startup_error, format_tables,
        format_turn_report, spinner
    },
    repl,
    schema::SchemaInspector,
    session::{Session, StartupError},
    store::KnowledgeStore
};

/// Convert CLI format to internal OutputFormat
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Create output options from parameters
pub fn create_output_options(format: Format, no_color: bool) -> OutputOptions {
    OutputOptions {
        format:  convert_format(format),
        colored: !no_color
    }
}

/// Layer command-line flags over the loaded configuration
pub fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(provider) = cli.provider {
        config.llm.provider = Some(provider.as_str().to_string());
    }
    if let Some(model) = &cli.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(api_key) = &cli.api_key {
        config.llm.api_key = Some(api_key.clone());
    }
    if let Some(url) = &cli.ollama_url {
        config.llm.ollama_url = Some(url.clone());
    }
    if let Some(url) = &cli.database_url {
        config.database.url = Some(url.clone());
    }
}

/// Run the selected command; returns the process exit code
///
/// A session that cannot start is reported with a hint and still exits 0.
pub async fn run(cli: Cli, config: Config) -> AppResult<i32> {
    let command = cli.command.clone().unwrap_or(Commands::Chat);
    let format = match &command {
        Commands::Ask {
            format, ..
        } => *format,
        _ => Format::Text
    };
    let opts = create_output_options(format, cli.no_color);

    let provider = LlmProvider::from_config(&config.llm)?;
    config.database.validate()?;
    let session = match Session::open(config, provider).await {
        Ok(session) => session,
        Err(e) => {
            println!("{}", format_startup_error(&e, &opts));
            return Ok(0);
        }
    };

    let result = match command {
        Commands::Chat => run_chat(&session, &opts).await,
        Commands::Ask {
            question, ..
        } => run_ask(&session, &question, &opts).await,
        Commands::Tables => run_tables(&session, &opts).await
    };
    session.close();
    result.map(|_| 0)
}

/// Banner, then the interactive loop on stdin
///
/// A knowledge base that cannot list its tables ends the session before the
/// loop starts.
pub async fn run_chat(session: &Session, opts: &OutputOptions) -> AppResult<()> {
    let tables = match startup_tables(session.store()).await {
        Ok(tables) => tables,
        Err(e) => {
            println!("{}", format_startup_error(&e, opts));
            return Ok(());
        }
    };
    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "{}",
        format_banner(session.model().model_name(), &tables, opts)
    )
    .map_err(write_error)?;

    let pipeline = session.pipeline();
    repl::run(&pipeline, BufReader::new(tokio::io::stdin()), &mut stdout, opts).await
}

/// Tables shown in the banner; a failed listing counts as an unreachable database
pub async fn startup_tables<S: KnowledgeStore>(store: &S) -> Result<Vec<String>, StartupError> {
    SchemaInspector::new(store)
        .list_tables()
        .await
        .map_err(StartupError::Database)
}

/// One turn, printed as a report
pub async fn run_ask(session: &Session, question: &str, opts: &OutputOptions) -> AppResult<()> {
    let pb = spinner("Searching database...");
    let report = session.pipeline().ask(question).await;
    pb.finish_and_clear();
    println!("{}", format_turn_report(&report?, opts));
    Ok(())
}

/// Every usable table with its rendered description
pub async fn run_tables(session: &Session, opts: &OutputOptions) -> AppResult<()> {
    let tables = SchemaInspector::new(session.store()).list_tables().await?;
    let schema = SchemaInspector::with_limit(session.store(), tables.len())
        .describe(&tables)
        .await?;
    println!("{}", format_tables(&tables, &schema, opts));
    Ok(())
}
