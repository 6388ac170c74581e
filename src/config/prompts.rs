//! Prompt templates for Duett.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub questions: QuestionPrompts,
    pub answers: AnswerPrompts,
    pub script: ScriptPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for deriving guiding questions from the full document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QuestionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a podcast producer preparing an episode about a document. You read carefully and find what a listener must understand."#.to_string(),

            user: r#"Create an engaging podcast conversation between two hosts discussing this document.

Before any script writing, read through the document and identify 5-10 key questions that the listener needs to understand.

These will form the basis of the podcast script.

Do not try to find the answers, just identify the questions.

Return the questions separated by new lines.

Questions should be plain text with no formatting or question numbers.

Document text:
{{document}}"#.to_string(),
        }
    }
}

/// Prompts for answering every question in one grounded call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You answer questions about a document using only the excerpts you are given. When the excerpts do not cover a question, say so briefly instead of inventing an answer."#.to_string(),

            user: r#"Answer each question using the provided context. For each question, provide:

1. Key Terms (1 sentence): Define any technical terms in the question
2. Simple Answer (2-3 sentences): Explain in plain English
3. Detailed Answer (3-4 sentences): Technical explanation with evidence from context

Rules:
- Be concise - no repetition across the three parts
- Prioritize information from context chunks
- Skip obvious definitions
- Format answers in this way: Question: Answer

Questions and Context:
{{question_blocks}}

Generate the answers now:"#.to_string(),
        }
    }
}

/// Prompts for compiling the two-host script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ScriptPrompts {
    fn default() -> Self {
        Self {
            system: r#"You write tight, natural dialogue for two podcast hosts. Every line you write is read aloud by a speech engine, so you only write plain spoken text."#.to_string(),

            user: r#"Create a concise {{target_minutes}}-minute podcast script between {{speaker_a}} and {{speaker_b}} discussing a document.

CRITICAL CONSTRAINTS:
- Maximum {{word_limit}} words total (strictly enforce this)
- No repetition - each point mentioned ONCE only
- Plain text only - no special symbols, asterisks, or formatting marks
- Spell out ALL acronyms on first use (e.g., "Natural Language Processing or NLP")
- Spell out numbers and years e.g. 0.24 should be 'zero point two-four' and 1999 should be 'nineteen-ninety-nine'

FORMAT (every line starts with the speaker name in capitals, then a colon):
{{speaker_a_token}}: [dialogue]
{{speaker_b_token}}: [dialogue]

CONTENT RULES:
1. {{intro_seconds}}-second intro: Quick hello and document topic
2. Cover KEY insights only (skip minor details)
3. Use plain English - avoid jargon
4. No rehashing - if a concept is explained, move on
5. {{outro_seconds}}-second outro: One main takeaway

STYLE:
- Direct and punchy
- Cut filler words
- Assume intelligent audience (no over-explaining)
- Natural speech patterns

QUESTIONS AND ANSWERS (use selectively, not all):
{{answers}}

Generate {{word_limit}} words or less:"#.to_string(),
        }
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"))
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let questions_path = custom_path.join("questions.toml");
            if questions_path.exists() {
                let content = std::fs::read_to_string(&questions_path)?;
                prompts.questions = toml::from_str(&content)?;
            }

            let answers_path = custom_path.join("answers.toml");
            if answers_path.exists() {
                let content = std::fs::read_to_string(&answers_path)?;
                prompts.answers = toml::from_str(&content)?;
            }

            let script_path = custom_path.join("script.toml");
            if script_path.exists() {
                let content = std::fs::read_to_string(&script_path)?;
                prompts.script = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in a single pass, so values that happen to
    /// contain `{{name}}` are left untouched. Unknown placeholders are kept.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        placeholder_pattern()
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
