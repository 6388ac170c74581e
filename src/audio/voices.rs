//! Speaker-to-voice mapping.

use crate::config::{SpeakerSettings, SpeechSettings};
use crate::error::{DuettError, Result};
use std::fmt;

/// Host role in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    A,
    B,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::A => write!(f, "SPEAKER_A"),
            Speaker::B => write!(f, "SPEAKER_B"),
        }
    }
}

/// One row of the voice table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceEntry {
    pub speaker: Speaker,
    /// Upper-case token that starts the host's script lines, e.g. `SARAH`.
    pub token: String,
    /// Voice identifier for the speech synthesizer.
    pub voice: String,
}

/// Explicit table from script speaker tokens to voices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTable {
    entries: Vec<VoiceEntry>,
}

impl VoiceTable {
    /// Build a table, checking that tokens are upper-case ASCII words and unique.
    pub fn new(entries: Vec<VoiceEntry>) -> Result<Self> {
        for (i, entry) in entries.iter().enumerate() {
            if entry.token.is_empty() || !entry.token.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(DuettError::Config(format!(
                    "speaker token {:?} must be a single word of letters A-Z",
                    entry.token
                )));
            }
            if entry.voice.trim().is_empty() {
                return Err(DuettError::Config(format!(
                    "speaker {} has no voice",
                    entry.token
                )));
            }
            if entries[..i].iter().any(|e| e.token == entry.token) {
                return Err(DuettError::Config(format!(
                    "speaker token {} is used twice",
                    entry.token
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Build the two-host table from speech settings.
    pub fn from_settings(settings: &SpeechSettings) -> Result<Self> {
        Self::new(vec![
            entry(Speaker::A, &settings.speaker_a),
            entry(Speaker::B, &settings.speaker_b),
        ])
    }

    /// Find the entry for a speaker token.
    pub fn resolve(&self, token: &str) -> Option<&VoiceEntry> {
        self.entries.iter().find(|e| e.token == token)
    }

    /// The entry for a host role.
    pub fn for_speaker(&self, speaker: Speaker) -> Option<&VoiceEntry> {
        self.entries.iter().find(|e| e.speaker == speaker)
    }

    pub fn entries(&self) -> &[VoiceEntry] {
        &self.entries
    }

    /// Known tokens, for error messages.
    pub fn tokens(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.token.as_str()).collect()
    }
}

impl Default for VoiceTable {
    fn default() -> Self {
        let settings = SpeechSettings::default();
        Self {
            entries: vec![
                entry(Speaker::A, &settings.speaker_a),
                entry(Speaker::B, &settings.speaker_b),
            ],
        }
    }
}

/// Script token for a host's display name: `" Sarah "` starts lines as `SARAH:`.
pub fn speaker_token(name: &str) -> String {
    name.trim().to_uppercase()
}

fn entry(speaker: Speaker, settings: &SpeakerSettings) -> VoiceEntry {
    VoiceEntry {
        speaker,
        token: speaker_token(&settings.name),
        voice: settings.voice.clone(),
    }
}
