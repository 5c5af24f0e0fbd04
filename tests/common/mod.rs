// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

//! In-memory stand-ins for the model and the knowledge base.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering}
    }
};

use compliance_rag::{
    error::{AppResult, connectivity_error, llm_api_error, unknown_table_error},
    llm::LanguageModel,
    schema::{ColumnSchema, TableSchema},
    store::{CellValue, KnowledgeStore, QueryFailure, RowSet}
};

/// Replies with scripted completions in order, recording every prompt.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<AppResult<String>>>,
    prompts: Mutex<Vec<String>>,
    calls:   AtomicUsize
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Self {
        let model = Self::default();
        for reply in replies {
            model.push(Ok(reply.to_string()));
        }
        model
    }

    pub fn push(&self, reply: AppResult<String>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LanguageModel for ScriptedModel {
    async fn invoke(&self, prompt: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(llm_api_error("no scripted reply")))
    }
}

/// Fixed tables and one canned query outcome.
pub struct MemoryStore {
    pub tables:      Vec<TableSchema>,
    pub unreachable: bool,
    outcome:         Mutex<Result<RowSet, QueryFailure>>,
    executed:        Mutex<Vec<String>>,
    described:       Mutex<Vec<String>>
}

impl MemoryStore {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        Self {
            tables,
            unreachable: false,
            outcome: Mutex::new(Ok(RowSet::default())),
            executed: Mutex::new(Vec::new()),
            described: Mutex::new(Vec::new())
        }
    }

    /// Store holding `incidents` and `filings`, the way the knowledge base is laid out
    pub fn compliance() -> Self {
        Self::new(vec![
            table("incidents", &[("id", "integer"), ("description", "text")]),
            table("filings", &[("form", "text"), ("section", "text")])
        ])
    }

    pub fn with_outcome(self, outcome: Result<RowSet, QueryFailure>) -> Self {
        *self.outcome.lock().unwrap() = outcome;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn described(&self) -> Vec<String> {
        self.described.lock().unwrap().clone()
    }
}

impl KnowledgeStore for MemoryStore {
    async fn list_tables(&self) -> AppResult<Vec<String>> {
        if self.unreachable {
            return Err(connectivity_error("Database", "connection refused"));
        }
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn describe_table(&self, name: &str) -> AppResult<TableSchema> {
        self.described.lock().unwrap().push(name.to_string());
        self.tables
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| unknown_table_error(name))
    }

    async fn run(&self, sql: &str) -> Result<RowSet, QueryFailure> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.outcome.lock().unwrap().clone()
    }
}

pub fn table(name: &str, columns: &[(&str, &str)]) -> TableSchema {
    TableSchema {
        name:    name.to_string(),
        columns: columns
            .iter()
            .map(|(column, data_type)| ColumnSchema {
                name:        column.to_string(),
                data_type:   data_type.to_string(),
                is_nullable: true
            })
            .collect(),
        sample:  RowSet::default()
    }
}

pub fn rows(columns: &[&str], rows: Vec<Vec<CellValue>>) -> RowSet {
    RowSet {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows
    }
}
