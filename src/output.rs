use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{pipeline::TurnReport, schema::Schema, session::StartupError};

/// Output format for one-shot answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true
        }
    }
}

const RULE: &str = "--------------------------------------------------";
const SOURCE_LINE: &str = "Source: PostgreSQL Database";

fn paint(text: &str, opts: &OutputOptions, style: fn(&str) -> colored::ColoredString) -> String {
    if opts.colored {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

/// Spinner on stderr while a turn waits on the model or database
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Startup banner with the connected model and usable tables
pub fn format_banner(model: &str, tables: &[String], opts: &OutputOptions) -> String {
    let mut out = String::new();
    out.push_str(&paint("Compliance RAG Assistant", opts, |s| s.bold()));
    out.push_str("\nDatabase-driven knowledge base\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&paint("PostgreSQL connected", opts, |s| s.green()));
    out.push('\n');
    out.push_str(&format!("Available tables: {}\n", format_table_list(tables)));
    out.push_str(&paint(&format!("{} ready", model), opts, |s| s.green()));
    out.push_str("\n\nAsk compliance questions (type 'quit' to exit):\n");
    out.push_str("Example: 'What compliance needed for fire incident?'\n");
    out.push_str("Example: 'Show public company requirements'\n");
    out.push_str(RULE);
    out
}

fn format_table_list(tables: &[String]) -> String {
    if tables.is_empty() {
        String::from("(none)")
    } else {
        tables.join(", ")
    }
}

/// Line shown before the answer of an interactive turn
pub fn format_sql(sql: &str, opts: &OutputOptions) -> String {
    format!("{} {}", paint("Generated SQL:", opts, |s| s.cyan()), sql)
}

/// Answer block with the source attribution line
pub fn format_answer(answer: &str, opts: &OutputOptions) -> String {
    let mut out = String::new();
    out.push_str(&paint("Answer:", opts, |s| s.green().bold()));
    out.push('\n');
    out.push_str(&"-".repeat(40));
    out.push('\n');
    out.push_str(answer.trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(40));
    out.push('\n');
    out.push_str(&paint(SOURCE_LINE, opts, |s| s.dimmed()));
    out.push('\n');
    out.push_str(RULE);
    out
}

/// Per-turn failure that does not end the loop
pub fn format_turn_error(message: &str, opts: &OutputOptions) -> String {
    format!("{} {}", paint("Error:", opts, |s| s.red().bold()), message)
}

/// Diagnostic plus hint for a session that could not start
pub fn format_startup_error(error: &StartupError, opts: &OutputOptions) -> String {
    format!(
        "{} {}\n{}",
        paint("Error:", opts, |s| s.red().bold()),
        error,
        paint(&format!("Hint: {}", error.hint()), opts, |s| s.yellow())
    )
}

/// Full report of a one-shot turn in the requested format
pub fn format_turn_report(report: &TurnReport, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(report).unwrap_or_default(),
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!(
                "{} {}\n",
                paint("Question:", opts, |s| s.bold()),
                report.question
            ));
            let sql = report.sql.as_ref().map_or("(none)", |s| s.as_str());
            out.push_str(&format_sql(sql, opts));
            out.push_str("\n\n");
            out.push_str(&format_answer(&report.answer, opts));
            out
        }
    }
}

/// Usable tables followed by the described schema
pub fn format_tables(tables: &[String], schema: &Schema, opts: &OutputOptions) -> String {
    let mut out = format!(
        "{} {}\n",
        paint("Available tables:", opts, |s| s.bold()),
        format_table_list(tables)
    );
    for table in &schema.tables {
        out.push('\n');
        out.push_str(&table.to_prompt_text());
        out.push('\n');
    }
    out
}
