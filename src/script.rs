//! Two-host script compilation.
//!
//! The compiler only asks for its constraints (word ceiling, line format,
//! spelled-out numbers); it does not enforce them. Violations are logged and
//! left for the audio stage to accept or reject.

use crate::audio::speaker_token;
use crate::config::{Prompts, ScriptSettings};
use crate::error::{DuettError, Result, Stage};
use crate::external::CallPolicy;
use crate::llm::{ChatPrompt, LanguageModel};
use crate::rag::AnswerSet;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The raw dialogue returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    text: String,
}

impl Script {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Spoken words, excluding the leading speaker tag of each line.
    pub fn word_count(&self) -> usize {
        self.text
            .lines()
            .map(|line| {
                let dialogue = match line.split_once(':') {
                    Some((tag, rest)) if is_speaker_tag(tag) => rest,
                    _ => line,
                };
                dialogue.split_whitespace().count()
            })
            .sum()
    }
}

fn is_speaker_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_uppercase())
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Turns the answer set into a dialogue between two named hosts.
pub struct ScriptCompiler {
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
    policy: CallPolicy,
    settings: ScriptSettings,
    speakers: [String; 2],
}

impl ScriptCompiler {
    /// Create a new script compiler with default hosts and limits.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
            policy: CallPolicy::default(),
            settings: ScriptSettings::default(),
            speakers: ["Sarah".to_string(), "Michael".to_string()],
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

    /// Set the word ceiling and intro/outro budgets.
    pub fn with_settings(mut self, settings: ScriptSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the display names of the two hosts.
    pub fn with_speakers(mut self, speaker_a: &str, speaker_b: &str) -> Self {
        self.speakers = [speaker_a.trim().to_string(), speaker_b.trim().to_string()];
        self
    }

    /// Render the script prompt for an answer set.
    pub fn build_prompt(&self, answers: &AnswerSet) -> ChatPrompt {
        let [speaker_a, speaker_b] = &self.speakers;

        let mut vars = HashMap::new();
        vars.insert("answers".to_string(), answers.to_string());
        vars.insert("speaker_a".to_string(), speaker_a.clone());
        vars.insert("speaker_b".to_string(), speaker_b.clone());
        vars.insert("speaker_a_token".to_string(), speaker_token(speaker_a));
        vars.insert("speaker_b_token".to_string(), speaker_token(speaker_b));
        vars.insert("word_limit".to_string(), self.settings.word_limit.to_string());
        vars.insert(
            "target_minutes".to_string(),
            self.settings.target_minutes.to_string(),
        );
        vars.insert(
            "intro_seconds".to_string(),
            self.settings.intro_seconds.to_string(),
        );
        vars.insert(
            "outro_seconds".to_string(),
            self.settings.outro_seconds.to_string(),
        );

        let user = self.prompts.render_with_custom(&self.prompts.script.user, &vars);
        ChatPrompt::user(user).with_system(self.prompts.script.system.clone())
    }

    /// Compile the script with one model call.
    #[instrument(skip(self, answers))]
    pub async fn compile(&self, answers: &AnswerSet) -> Result<Script> {
        let prompt = self.build_prompt(answers);

        let response = self
            .policy
            .run(Stage::Script, "script compilation", || {
                self.model.complete(&prompt)
            })
            .await?;

        if response.trim().is_empty() {
            return Err(DuettError::model_output(
                Stage::Script,
                "model returned an empty script",
            ));
        }

        let script = Script::new(response);
        let words = script.word_count();
        if words > self.settings.word_limit {
            warn!(
                "Script has {} words, over the {} word limit",
                words, self.settings.word_limit
            );
        }

        info!("Compiled script ({} words)", words);
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VoiceTable;
    use crate::config::SpeechSettings;
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

    #[test]
    fn test_word_count_ignores_speaker_tags() {
        let script = Script::new("SARAH: Hello there.\nMICHAEL: Hi Sarah, welcome back.\n");
        assert_eq!(script.word_count(), 6);

        let untagged = Script::new("Note: this line has no host");
        assert_eq!(untagged.word_count(), 6);
    }

    #[test]
    fn test_prompt_carries_constraints() {
        let compiler = ScriptCompiler::new(model("x"))
            .with_speakers("Ada", "Brian")
            .with_settings(ScriptSettings {
                word_limit: 450,
                ..ScriptSettings::default()
            });

        let prompt = compiler.build_prompt(&AnswerSet("Answer text".to_string()));

        assert!(prompt.user.contains("Maximum 450 words"));
        assert!(prompt.user.contains("between Ada and Brian"));
        assert!(prompt.user.contains("ADA: [dialogue]"));
        assert!(prompt.user.contains("BRIAN: [dialogue]"));
        assert!(prompt.user.contains("20-second intro"));
        assert!(prompt.user.contains("Answer text"));
        assert!(!prompt.user.contains("{{"));
    }

    #[test]
    fn test_prompt_tokens_match_voice_table() {
        let mut speech = SpeechSettings::default();
        speech.speaker_a.name = "  Ada ".to_string();
        speech.speaker_b.name = "Brian\n".to_string();
        let table = VoiceTable::from_settings(&speech).unwrap();

        let compiler = ScriptCompiler::new(model("x"))
            .with_speakers(&speech.speaker_a.name, &speech.speaker_b.name);
        let prompt = compiler.build_prompt(&AnswerSet("a".to_string()));

        for token in table.tokens() {
            assert!(prompt.user.contains(&format!("{}: [dialogue]", token)));
        }
        assert!(prompt.user.contains("between Ada and Brian"));
        assert!(!prompt.user.contains("  ADA"));
    }

    #[tokio::test]
    async fn test_over_length_script_is_passed_through() {
        let long = format!("SARAH: {}\n", "word ".repeat(40));
        let model = model(&long);
        let compiler = ScriptCompiler::new(model.clone()).with_settings(ScriptSettings {
            word_limit: 10,
            ..ScriptSettings::default()
        });

        let script = compiler.compile(&AnswerSet("a".into())).await.unwrap();

        assert_eq!(script.text(), long);
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_script_is_rejected() {
        let compiler = ScriptCompiler::new(model("\n \n"));
        let result = compiler.compile(&AnswerSet("a".into())).await;
        assert!(matches!(
            result,
            Err(DuettError::ModelOutputParse {
                stage: Stage::Script,
                ..
            })
        ));
    }
}
