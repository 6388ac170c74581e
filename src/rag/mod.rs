//! RAG (Retrieval-Augmented Generation) over a single document.
//!
//! Derives guiding questions from the full text, retrieves supporting chunks
//! for each one, and answers them all in one grounded model call.

mod answers;
mod questions;
mod retriever;

pub use answers::{format_question_blocks, AnswerSet, AnswerSynthesizer};
pub use questions::{parse_questions, QuestionDeriver};
pub use retriever::{RetrievedContext, Retriever};
