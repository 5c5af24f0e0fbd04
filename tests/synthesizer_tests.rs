// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

mod common;

use common::{ScriptedModel, table};
use compliance_rag::{
    config::SynthesisMode,
    error::llm_api_error,
    plan::PlanError,
    schema::Schema,
    synth::{Candidate, EMPTY_SCHEMA_SQL, SqlSynthesizer, build_sql_prompt}
};

fn schema() -> Schema {
    Schema {
        tables: vec![
            table("incidents", &[("id", "integer"), ("description", "text")]),
            table("filings", &[("form", "text")])
        ]
    }
}

fn names() -> Vec<String> {
    vec![String::from("incidents"), String::from("filings")]
}

#[tokio::test]
async fn test_empty_tables_skip_the_model() {
    let model = ScriptedModel::new(&["SELECT * FROM nowhere"]);
    let synth = SqlSynthesizer::new(&model);
    let candidate = synth
        .synthesize("anything?", &[], &Schema::default())
        .await
        .unwrap();
    assert_eq!(candidate, Candidate::Sql(String::from(EMPTY_SCHEMA_SQL)));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_free_text_returns_completion_verbatim() {
    let raw = "```sql\nSELECT * FROM incidents WHERE description ILIKE '%fire%'\n```";
    let model = ScriptedModel::new(&[raw]);
    let synth = SqlSynthesizer::new(&model);
    let candidate = synth
        .synthesize("What compliance needed for fire incident?", &names(), &schema())
        .await
        .unwrap();
    assert_eq!(candidate.text(), raw);
    assert_eq!(model.calls(), 1);

    let prompt = &model.prompts()[0];
    assert!(prompt.contains("CREATE TABLE incidents"));
    assert!(prompt.contains("What compliance needed for fire incident?"));
    assert!(prompt.contains("ILIKE"));
    assert!(prompt.contains("LIMIT 20"));
}

#[tokio::test]
async fn test_model_failure_is_returned() {
    let model = ScriptedModel::default();
    model.push(Err(llm_api_error("model offline")));
    let synth = SqlSynthesizer::new(&model);
    let result = synth.synthesize("q", &names(), &schema()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_structured_plan_renders_sql() {
    let model = ScriptedModel::new(&[
        r#"{"table": "incidents", "columns": ["description"], "filters": [{"column": "description", "pattern": "fire"}]}"#
    ]);
    let synth = SqlSynthesizer::with_mode(&model, SynthesisMode::Structured, 20);
    let candidate = synth.synthesize("fire?", &names(), &schema()).await.unwrap();
    assert_eq!(
        candidate,
        Candidate::Sql(String::from(
            r#"SELECT "description" FROM "incidents" WHERE CAST("description" AS TEXT) ILIKE '%fire%' LIMIT 20"#
        ))
    );
    assert!(model.prompts()[0].contains("JSON"));
}

#[tokio::test]
async fn test_structured_plan_with_unknown_column_is_rejected() {
    let completion = r#"{"table": "filings", "columns": ["penalty"]}"#;
    let model = ScriptedModel::new(&[completion]);
    let synth = SqlSynthesizer::with_mode(&model, SynthesisMode::Structured, 20);
    let candidate = synth.synthesize("penalties?", &names(), &schema()).await.unwrap();
    assert_eq!(
        candidate,
        Candidate::PlanRejected {
            completion: String::from(completion),
            reason:     PlanError::UnknownColumn {
                table:  String::from("filings"),
                column: String::from("penalty")
            }
        }
    );
    assert_eq!(candidate.text(), completion);
}

#[test]
fn test_sql_prompt_forbids_mutations() {
    let prompt = build_sql_prompt("q", "CREATE TABLE t (\n\tid integer\n)");
    assert!(prompt.contains("No DELETE/UPDATE/DROP"));
    assert!(prompt.contains("Generate ONLY a SELECT query"));
    assert!(prompt.ends_with("SQL Query:"));
}
