//! Grounded answer composition.

use crate::{
    error::{AppResult, llm_api_error},
    llm::LanguageModel
};

/// Fill the fixed grounding template with the database context and question
pub fn build_answer_prompt(db_context: &str, question: &str) -> String {
    format!(
        "You are a Companies Act 2013 compliance expert.\n\n\
         DATABASE QUERY RESULTS:\n{db_context}\n\n\
         USER QUESTION: {question}\n\n\
         Based on the database records above, provide a professional answer covering:\n\
         1. What compliance action is required\n\
         2. Specific steps to take\n\
         3. Applicable legal section\n\
         4. Penalties for non-compliance\n\n\
         If no relevant records found, state that clearly and suggest the user check \
         database entries.\n\n\
         Answer:"
    )
}

/// Asks the model for an answer grounded in retrieved rows.
pub struct AnswerComposer<'a, M> {
    model: &'a M
}

impl<'a, M: LanguageModel> AnswerComposer<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self {
            model
        }
    }

    /// One model call; the completion is returned unmodified
    ///
    /// # Errors
    ///
    /// Fails when the model call fails or the completion is blank.
    pub async fn compose(&self, db_context: &str, question: &str) -> AppResult<String> {
        let prompt = build_answer_prompt(db_context, question);
        let answer = self.model.invoke(&prompt).await?;
        if answer.trim().is_empty() {
            return Err(llm_api_error("Empty answer from model"));
        }
        Ok(answer)
    }
}
