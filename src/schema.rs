//! Knowledge base schema snapshot shown to the model.
//!
//! Each turn takes a fresh, read-only snapshot: the usable table names and a
//! description of only the first few of them, so prompts stay small.
//!
//! # Example
//!
//! ```
//! use compliance_rag::schema::{ColumnSchema, Schema, TableSchema};
//!
//! let incidents = TableSchema {
//!     name:    "incidents".into(),
//!     columns: vec![ColumnSchema {
//!         name:        "description".into(),
//!         data_type:   "text".into(),
//!         is_nullable: false
//!     }],
//!     sample:  Default::default()
//! };
//!
//! let schema = Schema {
//!     tables: vec![incidents]
//! };
//! let text = schema.to_prompt_text();
//! assert!(text.contains("CREATE TABLE incidents"));
//! assert!(text.contains("description text NOT NULL"));
//! ```

use tracing::debug;

use crate::{
    error::AppResult,
    store::{KnowledgeStore, RowSet}
};

/// Default number of tables described per turn
pub const DEFAULT_TABLE_LIMIT: usize = 3;

/// Column metadata read from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name:        String,
    /// SQL data type as reported by the database (e.g. "text", "integer")
    pub data_type:   String,
    pub is_nullable: bool
}

/// One described table: its columns and a few example rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name:    String,
    pub columns: Vec<ColumnSchema>,
    pub sample:  RowSet
}

impl TableSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }

    /// `CREATE TABLE` block followed by sample rows in a SQL comment
    pub fn to_prompt_text(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let null_str = if c.is_nullable { "" } else { " NOT NULL" };
                format!("\t{} {}{}", c.name, c.data_type, null_str)
            })
            .collect();
        let mut text = format!("CREATE TABLE {} (\n{}\n)", self.name, columns.join(",\n"));

        if !self.sample.is_empty() {
            text.push_str(&format!(
                "\n\n/*\n{} rows from {} table:\n{}\n",
                self.sample.rows.len(),
                self.name,
                self.sample.columns.join("\t")
            ));
            for row in &self.sample.rows {
                let cells: Vec<String> = row.iter().map(|c| c.render()).collect();
                text.push_str(&cells.join("\t"));
                text.push('\n');
            }
            text.push_str("*/");
        }
        text
    }
}

/// Described subset of the knowledge base, in listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableSchema>
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn to_prompt_text(&self) -> String {
        self.tables
            .iter()
            .map(TableSchema::to_prompt_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Reads table names and schema descriptions from a store.
pub struct SchemaInspector<'a, S> {
    store: &'a S,
    limit: usize
}

impl<'a, S: KnowledgeStore> SchemaInspector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_limit(store, DEFAULT_TABLE_LIMIT)
    }

    pub fn with_limit(store: &'a S, limit: usize) -> Self {
        Self {
            store,
            limit
        }
    }

    /// Usable table names in store order
    pub async fn list_tables(&self) -> AppResult<Vec<String>> {
        self.store.list_tables().await
    }

    /// Describe the first `limit` of `tables`
    pub async fn describe(&self, tables: &[String]) -> AppResult<Schema> {
        let mut described = Vec::with_capacity(self.limit.min(tables.len()));
        for name in tables.iter().take(self.limit) {
            described.push(self.store.describe_table(name).await?);
        }
        debug!(
            described = described.len(),
            available = tables.len(),
            "schema snapshot taken"
        );
        Ok(Schema {
            tables: described
        })
    }
}
