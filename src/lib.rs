//! # Compliance RAG Library
//!
//! Retrieval-augmented question answering over a relational knowledge base.
//!
//! A turn flows through [`schema::SchemaInspector`] →
//! [`synth::SqlSynthesizer`] → [`validate::SqlValidator`] →
//! [`executor::QueryExecutor`] → [`composer::AnswerComposer`], driven by
//! [`pipeline::Pipeline`]. Components reach the outside world only through
//! the [`llm::LanguageModel`] and [`store::KnowledgeStore`] traits.

pub mod app;
pub mod cli;
pub mod composer;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod repl;
pub mod schema;
pub mod session;
pub mod store;
pub mod synth;
pub mod validate;
