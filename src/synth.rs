//! SQL synthesis from a natural-language question.

use tracing::{debug, warn};

use crate::{
    config::SynthesisMode,
    error::AppResult,
    llm::LanguageModel,
    plan::{PlanError, QueryPlan, build_plan_prompt},
    schema::Schema,
    validate::DEFAULT_LIMIT
};

/// Returned without consulting the model when no table is usable
pub const EMPTY_SCHEMA_SQL: &str = "SELECT 1;";

/// What the synthesizer produced for one question.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// SQL text to be sanitized; raw model output in free-text mode
    Sql(String),
    /// Structured plan that failed checking; the fallback query applies
    PlanRejected { completion: String, reason: PlanError }
}

impl Candidate {
    /// Raw text for display and reports
    pub fn text(&self) -> &str {
        match self {
            Self::Sql(sql) => sql,
            Self::PlanRejected {
                completion, ..
            } => completion
        }
    }
}

/// Constrained instruction prompt for free-text SQL generation
pub fn build_sql_prompt(question: &str, schema_text: &str) -> String {
    format!(
        "Database Schema:\n{schema}\n\n\
         User Question: \"{question}\"\n\n\
         Generate ONLY a SELECT query that answers this question.\n\
         Requirements:\n\
         - Use ILIKE for text search (case-insensitive)\n\
         - Add LIMIT {limit}\n\
         - No DELETE/UPDATE/DROP\n\
         - Return relevant columns only\n\n\
         SQL Query:",
        schema = schema_text,
        question = question,
        limit = DEFAULT_LIMIT
    )
}

/// Asks a language model for one SELECT statement.
pub struct SqlSynthesizer<'a, M> {
    model:     &'a M,
    mode:      SynthesisMode,
    max_limit: u32
}

impl<'a, M: LanguageModel> SqlSynthesizer<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self::with_mode(model, SynthesisMode::FreeText, DEFAULT_LIMIT)
    }

    pub fn with_mode(model: &'a M, mode: SynthesisMode, max_limit: u32) -> Self {
        Self {
            model,
            mode,
            max_limit
        }
    }

    /// Produce a candidate for `question` over the described `schema`
    ///
    /// `tables` is the full listing; when it is empty the model is not called.
    pub async fn synthesize(
        &self,
        question: &str,
        tables: &[String],
        schema: &Schema
    ) -> AppResult<Candidate> {
        if tables.is_empty() {
            debug!("no usable tables, returning sentinel query");
            return Ok(Candidate::Sql(EMPTY_SCHEMA_SQL.to_string()));
        }
        let schema_text = schema.to_prompt_text();

        match self.mode {
            SynthesisMode::FreeText => {
                let prompt = build_sql_prompt(question, &schema_text);
                let raw = self.model.invoke(&prompt).await?;
                debug!(candidate = %raw, "model proposed SQL");
                Ok(Candidate::Sql(raw))
            }
            SynthesisMode::Structured => {
                let prompt = build_plan_prompt(question, &schema_text, self.max_limit);
                let completion = self.model.invoke(&prompt).await?;
                let rendered =
                    QueryPlan::parse(&completion).and_then(|plan| plan.to_sql(schema, self.max_limit));
                match rendered {
                    Ok(sql) => {
                        debug!(%sql, "rendered SQL from query plan");
                        Ok(Candidate::Sql(sql))
                    }
                    Err(reason) => {
                        warn!(%reason, "query plan rejected");
                        Ok(Candidate::PlanRejected {
                            completion,
                            reason
                        })
                    }
                }
            }
        }
    }
}
