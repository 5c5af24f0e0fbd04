//! Structured query plans.
//!
//! In structured synthesis mode the model never writes SQL. It describes the
//! query as JSON (target table, wanted columns, text filters), the plan is
//! checked against the described schema, and SQL is rendered here with quoted
//! identifiers and escaped literals.
//!
//! # Example
//!
//! ```
//! use compliance_rag::{
//!     plan::QueryPlan,
//!     schema::{ColumnSchema, Schema, TableSchema}
//! };
//!
//! let schema = Schema {
//!     tables: vec![TableSchema {
//!         name:    "incidents".into(),
//!         columns: vec![ColumnSchema {
//!             name:        "description".into(),
//!             data_type:   "text".into(),
//!             is_nullable: true
//!         }],
//!         sample:  Default::default()
//!     }]
//! };
//!
//! let plan = QueryPlan::parse(
//!     r#"{"table": "incidents", "filters": [{"column": "description", "pattern": "fire"}]}"#
//! )
//! .unwrap();
//! let sql = plan.to_sql(&schema, 20).unwrap();
//! assert_eq!(
//!     sql,
//!     r#"SELECT * FROM "incidents" WHERE CAST("description" AS TEXT) ILIKE '%fire%' LIMIT 20"#
//! );
//! ```

use std::fmt;

use serde::Deserialize;
use sqlparser::{ast::Statement, dialect::PostgreSqlDialect, parser::Parser};

use crate::{schema::Schema, store::quote_ident};

/// Model-authored description of a single-table lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryPlan {
    pub table:   String,
    /// Empty means all columns
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    pub limit:   Option<u32>
}

/// Case-insensitive containment test on one column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Filter {
    pub column:  String,
    pub pattern: String
}

/// Why a plan could not be turned into SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// Completion holds no JSON object
    NoJson,
    /// JSON does not match the plan shape
    Malformed(String),
    /// Table is not among the described tables
    UnknownTable(String),
    /// Column does not exist in the plan's table
    UnknownColumn { table: String, column: String },
    /// Rendered SQL did not parse as one query
    Unparseable(String)
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJson => write!(f, "no JSON object in model output"),
            Self::Malformed(e) => write!(f, "malformed query plan: {}", e),
            Self::UnknownTable(t) => write!(f, "unknown table '{}'", t),
            Self::UnknownColumn {
                table,
                column
            } => write!(f, "unknown column '{}' in table '{}'", column, table),
            Self::Unparseable(e) => write!(f, "rendered SQL does not parse: {}", e)
        }
    }
}

impl std::error::Error for PlanError {}

impl QueryPlan {
    /// Parse the first JSON object found in a completion
    pub fn parse(completion: &str) -> Result<Self, PlanError> {
        let start = completion.find('{').ok_or(PlanError::NoJson)?;
        let end = completion.rfind('}').ok_or(PlanError::NoJson)?;
        if end < start {
            return Err(PlanError::NoJson);
        }
        serde_json::from_str(&completion[start..=end])
            .map_err(|e| PlanError::Malformed(e.to_string()))
    }

    /// Reject tables and columns outside the described schema
    pub fn check(&self, schema: &Schema) -> Result<(), PlanError> {
        let table = schema
            .table(&self.table)
            .ok_or_else(|| PlanError::UnknownTable(self.table.clone()))?;
        let referenced = self
            .columns
            .iter()
            .chain(self.filters.iter().map(|f| &f.column));
        for column in referenced {
            if !table.has_column(column) {
                return Err(PlanError::UnknownColumn {
                    table:  self.table.clone(),
                    column: column.clone()
                });
            }
        }
        Ok(())
    }

    /// Render SQL without checking the schema
    pub fn render(&self, max_limit: u32) -> String {
        let projection = if self.columns.is_empty() {
            String::from("*")
        } else {
            self.columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}", projection, quote_ident(&self.table));
        if !self.filters.is_empty() {
            let predicates: Vec<String> = self
                .filters
                .iter()
                .map(|f| {
                    format!(
                        "CAST({} AS TEXT) ILIKE '%{}%'",
                        quote_ident(&f.column),
                        f.pattern.trim_matches('%').replace('\'', "''")
                    )
                })
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        let limit = self.limit.unwrap_or(max_limit).clamp(1, max_limit.max(1));
        sql.push_str(&format!(" LIMIT {}", limit));
        sql
    }

    /// Check, render and confirm the result parses as exactly one query
    pub fn to_sql(&self, schema: &Schema, max_limit: u32) -> Result<String, PlanError> {
        self.check(schema)?;
        let sql = self.render(max_limit);
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, &sql)
            .map_err(|e| PlanError::Unparseable(e.to_string()))?;
        match statements.as_slice() {
            [Statement::Query(_)] => Ok(sql),
            _ => Err(PlanError::Unparseable(String::from(
                "expected a single SELECT statement"
            )))
        }
    }
}

/// Instruction prompt asking for a JSON plan instead of SQL
pub fn build_plan_prompt(question: &str, schema_text: &str, max_limit: u32) -> String {
    format!(
        "Database Schema:\n{schema}\n\n\
         User Question: \"{question}\"\n\n\
         Describe the lookup that answers this question as a JSON object and nothing else:\n\
         {{\"table\": \"<table>\", \"columns\": [\"<column>\", ...], \
         \"filters\": [{{\"column\": \"<column>\", \"pattern\": \"<words to match>\"}}], \
         \"limit\": {max_limit}}}\n\
         Requirements:\n\
         - Use exactly one table from the schema above\n\
         - List only relevant columns; use [] for all columns\n\
         - Patterns are plain words matched case-insensitively, without wildcards\n\
         - limit must not exceed {max_limit}\n\n\
         JSON:",
        schema = schema_text,
        question = question,
        max_limit = max_limit
    )
}
