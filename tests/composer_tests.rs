// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

mod common;

use common::ScriptedModel;
use compliance_rag::{
    composer::{AnswerComposer, build_answer_prompt},
    executor::NO_RECORDS_MESSAGE
};

#[tokio::test]
async fn test_answer_is_returned_unmodified() {
    let model = ScriptedModel::new(&["  File ADT-1 within 15 days.\n"]);
    let answer = AnswerComposer::new(&model)
        .compose("[('Auditor appointment', 'Section 139')]", "How do I appoint an auditor?")
        .await
        .unwrap();
    assert_eq!(answer, "  File ADT-1 within 15 days.\n");
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_prompt_embeds_context_and_question() {
    let model = ScriptedModel::new(&["ok"]);
    AnswerComposer::new(&model)
        .compose(NO_RECORDS_MESSAGE, "Show public company requirements")
        .await
        .unwrap();
    let prompt = &model.prompts()[0];
    assert!(prompt.contains(&format!("DATABASE QUERY RESULTS:\n{}", NO_RECORDS_MESSAGE)));
    assert!(prompt.contains("USER QUESTION: Show public company requirements"));
}

#[tokio::test]
async fn test_blank_answer_is_an_error() {
    let model = ScriptedModel::new(&["   \n"]);
    let result = AnswerComposer::new(&model).compose("[]", "q").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_model_failure_is_not_retried_here() {
    let model = ScriptedModel::default();
    let result = AnswerComposer::new(&model).compose("[]", "q").await;
    assert!(result.is_err());
    assert_eq!(model.calls(), 1);
}

#[test]
fn test_template_sections() {
    let prompt = build_answer_prompt("ctx", "q");
    assert!(prompt.contains("Companies Act 2013"));
    assert!(prompt.contains("What compliance action is required"));
    assert!(prompt.contains("Specific steps to take"));
    assert!(prompt.contains("Applicable legal section"));
    assert!(prompt.contains("Penalties for non-compliance"));
    assert!(prompt.contains("If no relevant records found"));
    assert!(prompt.ends_with("Answer:"));
}

#[test]
fn test_placeholders_in_context_are_not_expanded() {
    let prompt = build_answer_prompt("{question}", "real question");
    assert!(prompt.contains("DATABASE QUERY RESULTS:\n{question}"));
    assert!(prompt.contains("USER QUESTION: real question"));
}
