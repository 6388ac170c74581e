//! Script line parsing.

use super::voices::{Speaker, VoiceTable};
use crate::error::{DuettError, Result, Stage};
use regex::Regex;
use std::sync::OnceLock;

/// One spoken line of the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-based line number in the raw script.
    pub line: usize,
    pub speaker: Speaker,
    /// Speaker token as written in the script.
    pub name: String,
    /// Voice resolved from the voice table.
    pub voice: String,
    /// Dialogue text with the speaker tag removed.
    pub text: String,
}

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Z]+):(.+)$").expect("line pattern is valid"))
}

/// Parse every non-empty line of a script into speaker-tagged lines.
///
/// Any line without a known `SPEAKER: text` prefix fails the whole script;
/// lines are never skipped, so the conversation cannot be silently shortened.
pub fn parse_script(script: &str, voices: &VoiceTable) -> Result<Vec<ScriptLine>> {
    let mut lines = Vec::new();

    for (index, raw) in script.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fail = |reason: String| DuettError::ScriptLineParse {
            line: index + 1,
            raw: raw.to_string(),
            reason,
        };

        let caps = line_pattern()
            .captures(trimmed)
            .ok_or_else(|| fail("expected SPEAKER: text".to_string()))?;

        let token = &caps[1];
        let text = caps[2].trim();
        if text.is_empty() {
            return Err(fail("line has no dialogue".to_string()));
        }

        let entry = voices.resolve(token).ok_or_else(|| {
            fail(format!(
                "unknown speaker {}, expected one of {}",
                token,
                voices.tokens().join(", ")
            ))
        })?;

        lines.push(ScriptLine {
            line: index + 1,
            speaker: entry.speaker,
            name: entry.token.clone(),
            voice: entry.voice.clone(),
            text: text.to_string(),
        });
    }

    if lines.is_empty() {
        return Err(DuettError::model_output(
            Stage::Audio,
            "script has no dialogue lines",
        ));
    }

    Ok(lines)
}
