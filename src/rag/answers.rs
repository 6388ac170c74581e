//! Grounded answer synthesis.

use super::RetrievedContext;
use crate::config::Prompts;
use crate::error::{DuettError, Result, Stage};
use crate::external::CallPolicy;
use crate::llm::{ChatPrompt, LanguageModel};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answers to every question as one free-text block.
///
/// Not parsed further; the script compiler reinjects it into its prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSet(pub String);

impl AnswerSet {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnswerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format each question with its 1-based index and its context, nearest first.
pub fn format_question_blocks(contexts: &[RetrievedContext]) -> String {
    let mut blocks = String::new();

    for (i, context) in contexts.iter().enumerate() {
        let _ = writeln!(blocks, "\n**Question {}:** {}", i + 1, context.question);
        blocks.push_str("**Context:**\n");

        if context.chunks.is_empty() {
            blocks.push_str("- (no supporting context found)\n");
        }
        for chunk in &context.chunks {
            let _ = writeln!(blocks, "- {}", chunk.text);
        }
    }

    blocks
}

/// Answers all questions in a single model call.
pub struct AnswerSynthesizer {
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
    policy: CallPolicy,
}

impl AnswerSynthesizer {
    /// Create a new answer synthesizer.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
            policy: CallPolicy::default(),
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

    /// Render the consolidated prompt for all questions.
    pub fn build_prompt(&self, contexts: &[RetrievedContext]) -> ChatPrompt {
        let mut vars = HashMap::new();
        vars.insert(
            "question_blocks".to_string(),
            format_question_blocks(contexts),
        );

        let user = self.prompts.render_with_custom(&self.prompts.answers.user, &vars);
        ChatPrompt::user(user).with_system(self.prompts.answers.system.clone())
    }

    /// Answer every question with one model call.
    #[instrument(skip(self, contexts), fields(questions = contexts.len()))]
    pub async fn synthesize(&self, contexts: &[RetrievedContext]) -> Result<AnswerSet> {
        if contexts.is_empty() {
            return Err(DuettError::InvalidInput(
                "no questions to answer".to_string(),
            ));
        }

        let prompt = self.build_prompt(contexts);
        debug!("Answer prompt is {} characters", prompt.user.len());

        let response = self
            .policy
            .run(Stage::Answers, "answer synthesis", || {
                self.model.complete(&prompt)
            })
            .await?;

        if response.trim().is_empty() {
            return Err(DuettError::model_output(
                Stage::Answers,
                "model returned no answers",
            ));
        }

        info!("Synthesized answers ({} characters)", response.len());
        Ok(AnswerSet(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingModel {
        response: String,
        prompts: Mutex<Vec<ChatPrompt>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(self.response.clone())
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    fn model(response: &str) -> Arc<RecordingModel> {
        Arc::new(RecordingModel {
            response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn contexts() -> Vec<RetrievedContext> {
        vec![
            RetrievedContext {
                question: "What is attention?".to_string(),
                chunks: vec![
                    Chunk::new("Attention weighs tokens.".into(), 2, 50),
                    Chunk::new("Transformers use attention.".into(), 0, 0),
                ],
            },
            RetrievedContext {
                question: "Who wrote it?".to_string(),
                chunks: Vec::new(),
            },
        ]
    }

    #[test]
    fn test_blocks_keep_question_and_chunk_order() {
        let blocks = format_question_blocks(&contexts());

        let q1 = blocks.find("**Question 1:** What is attention?").unwrap();
        let c2 = blocks.find("- Attention weighs tokens.").unwrap();
        let c0 = blocks.find("- Transformers use attention.").unwrap();
        let q2 = blocks.find("**Question 2:** Who wrote it?").unwrap();
        assert!(q1 < c2 && c2 < c0 && c0 < q2);
        assert!(blocks[q2..].contains("(no supporting context found)"));
    }

    #[tokio::test]
    async fn test_one_call_for_all_questions() {
        let model = model("Q1: ...\nQ2: ...");
        let synthesizer = AnswerSynthesizer::new(model.clone());

        let answers = synthesizer.synthesize(&contexts()).await.unwrap();

        assert_eq!(answers.as_str(), "Q1: ...\nQ2: ...");
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].user.contains("Key Terms"));
        assert!(prompts[0].user.contains("**Question 2:** Who wrote it?"));
    }

    #[tokio::test]
    async fn test_blank_answers_are_rejected() {
        let synthesizer = AnswerSynthesizer::new(model("  \n"));
        let result = synthesizer.synthesize(&contexts()).await;
        assert!(matches!(result, Err(DuettError::ModelOutputParse { .. })));
    }
}
