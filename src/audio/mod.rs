//! Script parsing, speech synthesis, and waveform assembly.

mod assembler;
mod lines;
mod synthesis;
mod voices;

pub use assembler::AudioAssembler;
pub use lines::{parse_script, ScriptLine};
pub use synthesis::{
    decode_pcm16, OpenAISpeech, SpeechOptions, SpeechSynthesizer, OPENAI_PCM_SAMPLE_RATE,
};
pub use voices::{speaker_token, Speaker, VoiceEntry, VoiceTable};

use crate::error::{DuettError, Result};
use std::io::Cursor;
use std::path::Path;
use tracing::info;

/// Mono audio for one script line.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

/// The finished episode as one mono waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct PodcastAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PodcastAudio {
    /// Concatenate segments in order. Every segment must share the first one's rate.
    ///
    /// Each segment is paired with the script line it came from, for error reporting.
    pub fn concat(segments: Vec<(usize, AudioSegment)>) -> Result<Self> {
        let Some(sample_rate) = segments.first().map(|(_, s)| s.sample_rate) else {
            return Err(DuettError::InvalidInput(
                "no audio segments to assemble".to_string(),
            ));
        };

        let total = segments.iter().map(|(_, s)| s.samples.len()).sum();
        let mut samples = Vec::with_capacity(total);

        for (line, segment) in segments {
            if segment.sample_rate != sample_rate {
                return Err(DuettError::SampleRateMismatch {
                    line,
                    expected: sample_rate,
                    found: segment.sample_rate,
                });
            }
            samples.extend(segment.samples);
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn write_samples<W>(&self, mut writer: hound::WavWriter<W>) -> Result<()>
    where
        W: std::io::Write + std::io::Seek,
    {
        for &sample in &self.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * f32::from(i16::MAX)) as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Encode as a 16-bit mono WAV file in memory.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        let writer = hound::WavWriter::new(&mut cursor, self.wav_spec())?;
        self.write_samples(writer)?;
        Ok(cursor.into_inner())
    }

    /// Write a 16-bit mono WAV file, creating parent directories.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = hound::WavWriter::create(path, self.wav_spec())?;
        self.write_samples(writer)?;
        info!(
            "Wrote {:.1}s of audio to {}",
            self.duration_seconds(),
            path.display()
        );
        Ok(())
    }
}
