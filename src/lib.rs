//! Duett - documents into two-host podcasts
//!
//! Duett reads a document and produces a short audio conversation between
//! two hosts that explains it.
//!
//! # Overview
//!
//! A run goes through six stages, each feeding the next:
//!
//! 1. Extract plain text from a PDF or text file
//! 2. Split the text into overlapping chunks and index their embeddings
//! 3. Ask the language model which questions a listener needs answered
//! 4. Retrieve supporting chunks per question and answer them in one call
//! 5. Turn the answers into a two-host script under a word limit
//! 6. Synthesize each script line with the host's voice and join the audio
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `document` - Text extraction
//! - `chunking` - Overlapping text chunks
//! - `embedding` - Embedding generation
//! - `vector_store` - Exact nearest-neighbor index over chunks
//! - `llm` - Chat model access
//! - `rag` - Questions, retrieval and grounded answers
//! - `script` - Script compilation
//! - `audio` - Script parsing, speech synthesis and WAV output
//! - `external` - Timeouts and retries for external calls
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use duett::config::Settings;
//! use duett::orchestrator::{Orchestrator, SilentObserver};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let podcast = orchestrator
//!         .run(Path::new("paper.pdf"), &SilentObserver)
//!         .await?;
//!     podcast.audio.write_wav(Path::new("paper.wav"))?;
//!     println!("{} questions, {} lines", podcast.questions.len(), podcast.lines.len());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod external;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod script;
pub mod vector_store;

pub use error::{DuettError, Result};
