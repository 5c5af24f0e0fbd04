use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::{Row, types::Type};

/// Longest text cell passed to the model before truncation
pub const MAX_CELL_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(Decimal),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
    /// Type the reader does not decode; holds the type name
    Unknown(String)
}

impl CellValue {
    /// Literal-style rendering used in the answer prompt
    pub fn render(&self) -> String {
        match self {
            CellValue::Null => String::from("NULL"),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Numeric(n) => n.to_string(),
            CellValue::Text(s) => quote(s),
            CellValue::Date(d) => quote(&d.to_string()),
            CellValue::Time(t) => quote(&t.to_string()),
            CellValue::DateTime(dt) => quote(&dt.to_string()),
            CellValue::TimestampTz(dt) => quote(&dt.to_string()),
            CellValue::Json(j) => truncate(&j.to_string()),
            CellValue::Unknown(type_name) => format!("<{}>", type_name)
        }
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_CHARS {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(MAX_CELL_CHARS).collect();
    cut.push_str("...");
    cut
}

fn quote(s: &str) -> String {
    format!("'{}'", truncate(s).replace('\'', "\\'"))
}

/// Rows returned by one query, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows:    Vec<Vec<CellValue>>
}

impl RowSet {
    pub fn from_rows(rows: &[Row]) -> Self {
        let Some(first) = rows.first() else {
            return Self::default();
        };
        let columns = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = rows
            .iter()
            .map(|row| {
                row.columns()
                    .iter()
                    .enumerate()
                    .map(|(i, col)| extract_value(row, i, col.type_()))
                    .collect()
            })
            .collect();
        Self {
            columns,
            rows
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as `[('a', 1), ('b', NULL)]`; empty string when there are no rows
    ///
    /// A one-column row keeps the trailing comma, `('a',)`.
    pub fn to_context_text(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        let mut out = String::from("[");
        for (r, row) in self.rows.iter().enumerate() {
            if r > 0 {
                out.push_str(", ");
            }
            let cells: Vec<String> = row.iter().map(CellValue::render).collect();
            let _ = match cells.as_slice() {
                [single] => write!(out, "({},)", single),
                _ => write!(out, "({})", cells.join(", "))
            };
        }
        out.push(']');
        out
    }
}

fn extract_value(row: &Row, idx: usize, pg_type: &Type) -> CellValue {
    match *pg_type {
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Bool)
            .unwrap_or(CellValue::Null),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(|v| CellValue::Int(v.into()))
            .unwrap_or(CellValue::Null),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(|v| CellValue::Int(v.into()))
            .unwrap_or(CellValue::Null),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Int)
            .unwrap_or(CellValue::Null),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(|v| CellValue::Float(v.into()))
            .unwrap_or(CellValue::Null),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Float)
            .unwrap_or(CellValue::Null),
        // NaN and values beyond 28 digits do not fit a Decimal
        Type::NUMERIC => match row.try_get::<_, Option<Decimal>>(idx) {
            Ok(Some(n)) => CellValue::Numeric(n),
            Ok(None) => CellValue::Null,
            Err(_) => CellValue::Unknown(pg_type.name().to_string())
        },
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Time)
            .unwrap_or(CellValue::Null),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Null),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .ok()
            .flatten()
            .map(CellValue::TimestampTz)
            .unwrap_or(CellValue::Null),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Json)
            .unwrap_or(CellValue::Null),
        _ => match row.try_get::<_, Option<String>>(idx) {
            Ok(Some(text)) => CellValue::Text(text),
            Ok(None) => CellValue::Null,
            Err(_) => CellValue::Unknown(pg_type.name().to_string())
        }
    }
}
