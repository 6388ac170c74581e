//! Guiding question derivation.

use crate::config::Prompts;
use crate::error::{DuettError, Result, Stage};
use crate::external::CallPolicy;
use crate::llm::{preview, ChatPrompt, LanguageModel};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Split a model response into questions.
///
/// Each non-blank line is one question, kept verbatim. Repeated lines keep
/// their first occurrence. A response without any usable line is an error.
pub fn parse_questions(response: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut questions = Vec::new();

    for line in response.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if seen.insert(line) {
            questions.push(line.to_string());
        } else {
            debug!("Dropping repeated question: {}", line);
        }
    }

    if questions.is_empty() {
        return Err(DuettError::model_output(
            Stage::Questions,
            format!("no questions in response: {:?}", preview(response, 200)),
        ));
    }

    Ok(questions)
}

/// Asks the model for the questions a listener needs answered.
pub struct QuestionDeriver {
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
    policy: CallPolicy,
    max_questions: usize,
}

impl QuestionDeriver {
    /// Create a new question deriver.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
            policy: CallPolicy::default(),
            max_questions: 10,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the timeout and retry policy for the model call.
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap the number of questions kept from the response.
    pub fn with_max_questions(mut self, max_questions: usize) -> Self {
        self.max_questions = max_questions.max(1);
        self
    }

    /// Render the question prompt for a document.
    pub fn build_prompt(&self, document: &str) -> ChatPrompt {
        let mut vars = HashMap::new();
        vars.insert("document".to_string(), document.to_string());

        let user = self.prompts.render_with_custom(&self.prompts.questions.user, &vars);
        ChatPrompt::user(user).with_system(self.prompts.questions.system.clone())
    }

    /// Derive questions from the full document text with one model call.
    #[instrument(skip(self, document), fields(document_chars = document.len()))]
    pub async fn derive(&self, document: &str) -> Result<Vec<String>> {
        let prompt = self.build_prompt(document);

        info!("Deriving questions with {}", self.model.model());
        let response = self
            .policy
            .run(Stage::Questions, "question derivation", || {
                self.model.complete(&prompt)
            })
            .await?;

        let mut questions = parse_questions(&response)?;
        if questions.len() > self.max_questions {
            warn!(
                "Model returned {} questions, keeping the first {}",
                questions.len(),
                self.max_questions
            );
            questions.truncate(self.max_questions);
        }

        info!("Derived {} questions", questions.len());
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedModel {
        response: String,
        prompts: Mutex<Vec<ChatPrompt>>,
    }

    impl CannedModel {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(self.response.clone())
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_parse_drops_empty_lines() {
        assert_eq!(parse_questions("Q1\n\nQ2\n").unwrap(), vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_parse_keeps_lines_verbatim() {
        let questions = parse_questions("  What is attention?\r\n1. Why scale?\n   \n").unwrap();
        assert_eq!(questions, vec!["  What is attention?", "1. Why scale?"]);
    }

    #[test]
    fn test_parse_collapses_repeats() {
        let questions = parse_questions("Why?\nHow?\nWhy?\n").unwrap();
        assert_eq!(questions, vec!["Why?", "How?"]);
    }

    #[test]
    fn test_parse_empty_response_is_an_error() {
        for response in ["", "\n\n", "   \n\t\n"] {
            let err = parse_questions(response).unwrap_err();
            assert!(matches!(
                err,
                DuettError::ModelOutputParse {
                    stage: Stage::Questions,
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_derive_makes_one_call_over_full_text() {
        let model = CannedModel::new("What is the method?\nWhat did it show?\n");
        let deriver = QuestionDeriver::new(model.clone());

        let questions = deriver.derive("The full paper text.").await.unwrap();

        assert_eq!(questions, vec!["What is the method?", "What did it show?"]);
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].user.contains("The full paper text."));
        assert!(prompts[0].user.contains("5-10 key questions"));
    }

    #[tokio::test]
    async fn test_derive_caps_question_count() {
        let response: String = (1..=14).map(|i| format!("Question {}?\n", i)).collect();
        let deriver = QuestionDeriver::new(CannedModel::new(&response)).with_max_questions(10);

        let questions = deriver.derive("text").await.unwrap();
        assert_eq!(questions.len(), 10);
        assert_eq!(questions[9], "Question 10?");
    }
}
