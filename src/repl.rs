//! Interactive question loop.
//!
//! One line is one question. The loop ends on `quit`, `exit`, `bye` (any
//! case) or end of input; no turn failure ends it.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{
    error::{AppResult, describe, file_read_error, write_error},
    llm::LanguageModel,
    output::{OutputOptions, format_answer, format_sql, format_turn_error, spinner},
    pipeline::Pipeline,
    store::KnowledgeStore
};

/// Words that end the session, compared case-insensitively
pub const EXIT_TOKENS: [&str; 3] = ["quit", "exit", "bye"];

/// What one line of input asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Exit,
    /// Blank line, prompt again
    Skip,
    Question(&'a str)
}

pub fn classify_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::Skip
    } else if EXIT_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
    {
        Input::Exit
    } else {
        Input::Question(trimmed)
    }
}

/// Read questions from `input` until an exit token or EOF
///
/// # Errors
///
/// Only I/O failures on `input` or `out`.
pub async fn run<M, S, R, W>(
    pipeline: &Pipeline<'_, M, S>,
    input: R,
    out: &mut W,
    opts: &OutputOptions
) -> AppResult<()>
where
    M: LanguageModel,
    S: KnowledgeStore,
    R: AsyncBufRead + Unpin,
    W: Write
{
    let mut lines = input.lines();
    loop {
        write!(out, "\nYour question: ").map_err(write_error)?;
        out.flush().map_err(write_error)?;

        let line = lines
            .next_line()
            .await
            .map_err(|e| file_read_error("stdin", e))?;
        let question = match line.as_deref().map(classify_input) {
            None | Some(Input::Exit) => break,
            Some(Input::Skip) => continue,
            Some(Input::Question(q)) => q.to_string()
        };

        let pb = spinner("Searching database...");
        let retrieval = pipeline.retrieve(&question).await;
        pb.finish_and_clear();
        if let Some(sql) = &retrieval.sql {
            writeln!(out, "\n{}", format_sql(sql.as_str(), opts)).map_err(write_error)?;
        }

        let pb = spinner("Composing answer...");
        let composed = pipeline.compose(retrieval).await;
        pb.finish_and_clear();
        match composed {
            Ok(report) => {
                writeln!(out, "\n{}", format_answer(&report.answer, opts)).map_err(write_error)?
            }
            Err(e) => {
                writeln!(out, "\n{}", format_turn_error(&describe(&e), opts)).map_err(write_error)?
            }
        }
    }
    writeln!(out, "\nGoodbye!").map_err(write_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_tokens_any_case() {
        assert_eq!(classify_input("  QUIT \n"), Input::Exit);
        assert_eq!(classify_input("Bye"), Input::Exit);
        assert_eq!(classify_input("exit"), Input::Exit);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(classify_input(""), Input::Skip);
        assert_eq!(classify_input("   \t"), Input::Skip);
    }

    #[test]
    fn test_question_is_trimmed() {
        assert_eq!(
            classify_input("  what about quitting?  "),
            Input::Question("what about quitting?")
        );
    }
}
