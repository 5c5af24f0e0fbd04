//! One question in, one grounded answer out.
//!
//! A turn runs `Synthesize → Validate → Execute → Compose`, strictly in
//! sequence. Failures before composition never end the turn: they become the
//! context the answer is composed from. Only a composition failure is
//! returned to the caller.
//!
//! The turn is split in two so a front end can show the SQL before the
//! answer arrives: [`Pipeline::retrieve`] covers everything up to the
//! database result, [`Pipeline::compose`] asks for the answer.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    composer::AnswerComposer,
    config::PipelineConfig,
    error::{AppError, AppResult, describe},
    executor::QueryExecutor,
    llm::LanguageModel,
    schema::SchemaInspector,
    store::KnowledgeStore,
    synth::{Candidate, SqlSynthesizer},
    validate::{SqlValidator, ValidatedSql}
};

/// Position in the per-turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Idle,
    Synthesize,
    Validate,
    Execute,
    Compose
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnStage::Idle => "idle",
            TurnStage::Synthesize => "synthesize",
            TurnStage::Validate => "validate",
            TurnStage::Execute => "execute",
            TurnStage::Compose => "compose"
        };
        f.write_str(name)
    }
}

/// Everything a turn gathered before composing the answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub question:  String,
    /// Raw model output; absent when synthesis never produced any
    pub candidate: Option<String>,
    /// Statement that was executed
    pub sql:       Option<ValidatedSql>,
    /// Rows, the no-records message or an error description
    pub context:   String
}

impl Retrieval {
    pub fn into_report(self, answer: String) -> TurnReport {
        TurnReport {
            question:  self.question,
            candidate: self.candidate,
            sql:       self.sql,
            context:   self.context,
            answer
        }
    }
}

/// Complete record of one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    pub question:  String,
    pub candidate: Option<String>,
    pub sql:       Option<ValidatedSql>,
    pub context:   String,
    pub answer:    String
}

/// Turn orchestrator over a model and a store.
pub struct Pipeline<'a, M, S> {
    model:  &'a M,
    store:  &'a S,
    config: PipelineConfig
}

impl<'a, M: LanguageModel, S: KnowledgeStore> Pipeline<'a, M, S> {
    pub fn new(model: &'a M, store: &'a S, config: PipelineConfig) -> Self {
        Self {
            model,
            store,
            config
        }
    }

    /// Run a full turn
    ///
    /// # Errors
    ///
    /// Fails only when the answer cannot be composed.
    pub async fn ask(&self, question: &str) -> AppResult<TurnReport> {
        let retrieval = self.retrieve(question).await;
        self.compose(retrieval).await
    }

    /// Synthesize, validate and execute; never fails
    pub async fn retrieve(&self, question: &str) -> Retrieval {
        let question = question.trim().to_string();
        let inspector = SchemaInspector::with_limit(self.store, self.config.schema_table_limit);

        debug!(stage = %TurnStage::Synthesize, %question, "turn started");
        let tables = match inspector.list_tables().await {
            Ok(tables) => tables,
            Err(e) => return unclassified(question, &e)
        };
        let schema = match inspector.describe(&tables).await {
            Ok(schema) => schema,
            Err(e) => return unclassified(question, &e)
        };
        let synthesizer =
            SqlSynthesizer::with_mode(self.model, self.config.synthesis, self.config.default_limit);
        let candidate = match synthesizer.synthesize(&question, &tables, &schema).await {
            Ok(candidate) => candidate,
            Err(e) => return unclassified(question, &e)
        };

        debug!(stage = %TurnStage::Validate, "checking candidate SQL");
        let validator = SqlValidator::with_limits(
            tables.first().map(String::as_str),
            self.config.default_limit,
            self.config.fallback_limit
        );
        let sql = match &candidate {
            Candidate::Sql(text) => validator.validate(text),
            Candidate::PlanRejected {
                ..
            } => validator.fallback()
        };
        debug!(%sql, "validated SQL");

        debug!(stage = %TurnStage::Execute, "running query");
        let context = QueryExecutor::new(self.store).execute(&sql).await;

        Retrieval {
            question,
            candidate: Some(candidate.text().to_string()),
            sql:       Some(sql),
            context
        }
    }

    /// Ask the model for the answer grounded in `retrieval`
    pub async fn compose(&self, retrieval: Retrieval) -> AppResult<TurnReport> {
        debug!(stage = %TurnStage::Compose, "composing answer");
        let answer = AnswerComposer::new(self.model)
            .compose(&retrieval.context, &retrieval.question)
            .await?;
        debug!(stage = %TurnStage::Idle, "turn finished");
        Ok(retrieval.into_report(answer))
    }
}

fn unclassified(question: String, error: &AppError) -> Retrieval {
    let message = describe(error);
    warn!(error = %message, "turn failed before execution, continuing with error context");
    Retrieval {
        question,
        candidate: None,
        sql:       None,
        context:   format!("Error: {}", message)
    }
}
