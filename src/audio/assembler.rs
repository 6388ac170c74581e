//! Line-by-line synthesis and concatenation.

use super::lines::{parse_script, ScriptLine};
use super::synthesis::{SpeechOptions, SpeechSynthesizer};
use super::voices::VoiceTable;
use super::{AudioSegment, PodcastAudio};
use crate::error::{Result, Stage};
use crate::external::CallPolicy;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Renders a script into one continuous waveform.
pub struct AudioAssembler {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voices: VoiceTable,
    options: SpeechOptions,
    policy: CallPolicy,
    max_concurrent: usize,
}

impl AudioAssembler {
    /// Create an assembler with the default hosts.
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            voices: VoiceTable::default(),
            options: SpeechOptions::default(),
            policy: CallPolicy::default(),
            max_concurrent: 1,
        }
    }

    pub fn with_voices(mut self, voices: VoiceTable) -> Self {
        self.voices = voices;
        self
    }

    pub fn with_options(mut self, options: SpeechOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the timeout and retry policy for each synthesis call.
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Synthesize up to `n` lines at once. Output order is unaffected.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn voices(&self) -> &VoiceTable {
        &self.voices
    }

    /// Parse a script and render it. No audio is synthesized if any line fails to parse.
    pub async fn render(&self, script: &str) -> Result<(Vec<ScriptLine>, PodcastAudio)> {
        let lines = parse_script(script, &self.voices)?;
        let audio = self.assemble(&lines).await?;
        Ok((lines, audio))
    }

    /// Synthesize every line in order and concatenate the results.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn assemble(&self, lines: &[ScriptLine]) -> Result<PodcastAudio> {
        let segments: Vec<(usize, AudioSegment)> = futures::stream::iter(lines)
            .map(|line| async move {
                debug!("Line {}: {} ({} chars)", line.line, line.name, line.text.len());
                let segment = self
                    .policy
                    .run(Stage::Audio, "speech synthesis", || {
                        self.synthesizer
                            .synthesize(&line.text, &line.voice, &self.options)
                    })
                    .await?;
                Ok::<_, crate::error::DuettError>((line.line, segment))
            })
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        let audio = PodcastAudio::concat(segments)?;
        info!(
            "Assembled {} lines into {:.1}s of audio",
            lines.len(),
            audio.duration_seconds()
        );
        Ok(audio)
    }
}
