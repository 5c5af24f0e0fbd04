// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

mod common;

use common::table;
use compliance_rag::{
    plan::{Filter, PlanError, QueryPlan, build_plan_prompt},
    schema::Schema
};

fn schema() -> Schema {
    Schema {
        tables: vec![table(
            "filings",
            &[("form", "text"), ("section", "text"), ("due_days", "integer")]
        )]
    }
}

fn plan(table: &str, columns: &[&str], filters: &[(&str, &str)], limit: Option<u32>) -> QueryPlan {
    QueryPlan {
        table:   table.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        filters: filters
            .iter()
            .map(|(column, pattern)| Filter {
                column:  column.to_string(),
                pattern: pattern.to_string()
            })
            .collect(),
        limit
    }
}

#[test]
fn test_valid_plan_renders_deterministic_sql() {
    let sql = plan(
        "filings",
        &["form", "due_days"],
        &[("section", "139"), ("form", "ADT")],
        Some(5)
    )
    .to_sql(&schema(), 20)
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "form", "due_days" FROM "filings" WHERE CAST("section" AS TEXT) ILIKE '%139%' AND CAST("form" AS TEXT) ILIKE '%ADT%' LIMIT 5"#
    );
}

#[test]
fn test_unknown_table_is_rejected() {
    let result = plan("board_minutes", &[], &[], None).to_sql(&schema(), 20);
    assert_eq!(
        result,
        Err(PlanError::UnknownTable(String::from("board_minutes")))
    );
}

#[test]
fn test_unknown_filter_column_is_rejected() {
    let result = plan("filings", &[], &[("penalty", "fine")], None).to_sql(&schema(), 20);
    assert_eq!(
        result,
        Err(PlanError::UnknownColumn {
            table:  String::from("filings"),
            column: String::from("penalty")
        })
    );
}

#[test]
fn test_injection_attempt_stays_inside_literal() {
    let sql = plan("filings", &[], &[("form", "x'; DROP TABLE filings; --")], None)
        .to_sql(&schema(), 20)
        .unwrap();
    assert!(sql.contains("ILIKE '%x''; DROP TABLE filings; --%'"));
}

#[test]
fn test_limit_is_clamped() {
    let p = plan("filings", &[], &[], Some(0));
    assert!(p.render(20).ends_with("LIMIT 1"));
    let p = plan("filings", &[], &[], Some(1000));
    assert!(p.render(20).ends_with("LIMIT 20"));
}

#[test]
fn test_parse_malformed_json() {
    assert!(matches!(
        QueryPlan::parse(r#"{"columns": ["form"]}"#),
        Err(PlanError::Malformed(_))
    ));
    assert_eq!(QueryPlan::parse("} nothing {"), Err(PlanError::NoJson));
}

#[test]
fn test_plan_prompt_names_the_bound() {
    let prompt = build_plan_prompt("q", "CREATE TABLE filings ()", 20);
    assert!(prompt.contains("limit must not exceed 20"));
    assert!(prompt.contains("\"table\""));
    assert!(prompt.ends_with("JSON:"));
}
