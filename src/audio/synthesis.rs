//! Speech synthesis backends.

use super::AudioSegment;
use crate::error::{DuettError, Result, Stage};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Raw PCM from the OpenAI speech endpoint is 24 kHz, 16-bit, mono.
pub const OPENAI_PCM_SAMPLE_RATE: u32 = 24_000;

/// Per-call synthesis options shared by every line.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOptions {
    pub speed: f32,
    pub language: String,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            language: "en-us".to_string(),
        }
    }
}

/// Trait for turning one line of text into audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice.
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        options: &SpeechOptions,
    ) -> Result<AudioSegment>;
}

/// OpenAI text-to-speech, requested as raw PCM so no decoder is needed.
///
/// Models that take `instructions` (the `gpt-4o` TTS family) are told which
/// language to speak. Older models pick the language from the text, so a
/// non-English setting only produces a warning for them.
pub struct OpenAISpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
    language_warned: AtomicBool,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
}

impl OpenAISpeech {
    /// Create a synthesizer for the given model.
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(DuettError::Config(
                "OpenAI API key required for speech synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: crate::openai::create_http_client(timeout)?,
            api_key,
            model: model.to_string(),
            url: OPENAI_SPEECH_URL.to_string(),
            language_warned: AtomicBool::new(false),
        })
    }

    /// Point the synthesizer at a compatible endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn accepts_instructions(&self) -> bool {
        self.model.starts_with("gpt-4o")
    }

    fn request<'a>(
        &'a self,
        text: &'a str,
        voice: &'a str,
        options: &SpeechOptions,
    ) -> SpeechRequest<'a> {
        let instructions = if self.accepts_instructions() {
            Some(format!(
                "Speak in the language identified by \"{}\", with natural pronunciation.",
                options.language
            ))
        } else {
            if !is_english(&options.language) && !self.language_warned.swap(true, Ordering::Relaxed)
            {
                warn!(
                    "Speech model {} cannot be told the language; speech.language = {} is ignored",
                    self.model, options.language
                );
            }
            None
        };

        SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            speed: options.speed,
            response_format: "pcm",
            instructions,
        }
    }
}

fn is_english(language: &str) -> bool {
    let primary = language.split(['-', '_']).next().unwrap_or_default();
    primary.eq_ignore_ascii_case("en")
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeech {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        options: &SpeechOptions,
    ) -> Result<AudioSegment> {
        debug!(
            "Synthesizing {} characters with voice {} ({})",
            text.len(),
            voice,
            options.language
        );

        let request = self.request(text, voice, options);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DuettError::external(Stage::Audio, format!("speech request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DuettError::from_status(
                Stage::Audio,
                status.as_u16(),
                format!("speech API error {}: {}", status, api_error_message(&body)),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DuettError::external(Stage::Audio, format!("speech body: {}", e)))?;

        Ok(AudioSegment::new(
            decode_pcm16(&bytes),
            OPENAI_PCM_SAMPLE_RATE,
        ))
    }
}

/// Pull `error.message` out of an OpenAI error body, or return the body as is.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Decode little-endian signed 16-bit PCM into samples in [-1.0, 1.0).
///
/// A trailing odd byte is dropped.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioAssembler;
    use crate::external::CallPolicy;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_decode_pcm16() {
        let bytes = [0x00, 0x00, 0x00, 0x40, 0x00, 0x80, 0xff, 0x7f, 0x01];
        let samples = decode_pcm16(&bytes);

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 0.5);
        assert_eq!(samples[2], -1.0);
        assert!(samples[3] < 1.0 && samples[3] > 0.999);
    }

    #[test]
    fn test_requires_api_key() {
        let result = OpenAISpeech::new(String::new(), "tts-1", Duration::from_secs(5));
        assert!(matches!(result, Err(DuettError::Config(_))));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"message":"Invalid voice","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Invalid voice");
        assert_eq!(api_error_message(" upstream timeout \n"), "upstream timeout");
    }

    fn speech_for(model: &str) -> OpenAISpeech {
        OpenAISpeech::new("sk-test".to_string(), model, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_request_asks_for_pcm() {
        let speech = speech_for("tts-1");
        let request = speech.request("Hello", "nova", &SpeechOptions::default());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"], "pcm");
        assert_eq!(json["voice"], "nova");
        assert!(json.get("instructions").is_none());
    }

    #[test]
    fn test_language_reaches_instruction_models() {
        let speech = speech_for("gpt-4o-mini-tts");
        let options = SpeechOptions {
            speed: 1.0,
            language: "de-de".to_string(),
        };
        let json = serde_json::to_value(speech.request("Hallo", "onyx", &options)).unwrap();
        assert!(json["instructions"].as_str().unwrap().contains("de-de"));
    }

    #[test]
    fn test_language_warning_is_given_once() {
        let speech = speech_for("tts-1");
        let options = SpeechOptions {
            speed: 1.0,
            language: "fr-fr".to_string(),
        };
        speech.request("Bonjour", "nova", &options);
        assert!(speech.language_warned.load(Ordering::Relaxed));

        let english = speech_for("tts-1");
        english.request("Hello", "nova", &SpeechOptions::default());
        assert!(!english.language_warned.load(Ordering::Relaxed));
    }

    #[test]
    fn test_is_english() {
        assert!(is_english("en-us"));
        assert!(is_english("EN_gb"));
        assert!(is_english("en"));
        assert!(!is_english("es-es"));
    }

    fn local_speech(url: String) -> OpenAISpeech {
        OpenAISpeech {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..speech_for("tts-1")
        }
        .with_url(url)
    }

    fn quick_retries() -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    /// Read one request, headers and body, so the reply is not cut short.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Answer every request with `status` and count how many arrive.
    async fn status_server(status: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let seen = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                seen.fetch_add(1, Ordering::SeqCst);
                let body = r#"{"error":{"message":"refused by local server"}}"#;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/v1/audio/speech", addr), requests)
    }

    #[tokio::test]
    async fn test_unauthorized_line_is_requested_once() {
        let (url, requests) = status_server("401 Unauthorized").await;
        let assembler =
            AudioAssembler::new(Arc::new(local_speech(url))).with_policy(quick_retries());

        let err = assembler.render("SARAH: Hello.").await.unwrap_err();

        assert!(!err.is_transient());
        assert!(err.to_string().contains("refused by local server"));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_service_is_retried() {
        let (url, requests) = status_server("503 Service Unavailable").await;
        let assembler =
            AudioAssembler::new(Arc::new(local_speech(url))).with_policy(quick_retries());

        let err = assembler.render("SARAH: Hello.").await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(requests.load(Ordering::SeqCst), 3);
    }
}
