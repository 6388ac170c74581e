//! Pipeline orchestrator for Duett.
//!
//! Runs the six stages in order, handing each stage's output to the next,
//! and tags any failure with the stage it came from.

use crate::audio::{
    AudioAssembler, OpenAISpeech, PodcastAudio, ScriptLine, SpeechOptions, SpeechSynthesizer,
    VoiceTable,
};
use crate::chunking::{Chunker, ChunkingConfig, RecursiveChunker};
use crate::config::{Prompts, Settings};
use crate::document::{AutoExtractor, DocumentExtractor};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{DuettError, Result, Stage};
use crate::external::CallPolicy;
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::rag::{AnswerSet, AnswerSynthesizer, QuestionDeriver, Retriever};
use crate::script::{Script, ScriptCompiler};
use crate::vector_store::Indexer;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Receives progress while a run is in flight.
///
/// All methods have empty defaults.
pub trait PipelineObserver: Send + Sync {
    /// A stage is about to start.
    fn stage_started(&self, _stage: Stage) {}

    /// A stage finished; `summary` is a short human-readable result.
    fn stage_finished(&self, _stage: Stage, _summary: &str) {}

    /// Questions are available.
    fn questions_ready(&self, _questions: &[String]) {}

    /// The script is available, before audio synthesis starts.
    fn script_ready(&self, _script: &Script) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl PipelineObserver for SilentObserver {}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct Podcast {
    pub questions: Vec<String>,
    pub answers: AnswerSet,
    pub script: Script,
    pub lines: Vec<ScriptLine>,
    pub audio: PodcastAudio,
    pub chunk_count: usize,
}

/// The main orchestrator for the Duett pipeline.
pub struct Orchestrator {
    settings: Settings,
    extractor: Arc<dyn DocumentExtractor>,
    chunker: RecursiveChunker,
    indexer: Indexer,
    questions: QuestionDeriver,
    retriever: Retriever,
    answers: AnswerSynthesizer,
    compiler: ScriptCompiler,
    assembler: AudioAssembler,
}

impl Orchestrator {
    /// Create an orchestrator backed by OpenAI and the local extractors.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let timeout = Duration::from_secs(settings.general.request_timeout_secs.max(1));

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_timeout(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
            timeout,
        )?);

        info!("Using {} for questions, answers and script", settings.llm.model);
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAIChatModel::with_config(
            &settings.llm.model,
            settings.llm.temperature,
            timeout,
        )?);

        let api_key = crate::openai::api_key().ok_or_else(|| {
            DuettError::Config("OPENAI_API_KEY environment variable is not set".to_string())
        })?;
        let synthesizer: Arc<dyn SpeechSynthesizer> =
            Arc::new(OpenAISpeech::new(api_key, &settings.speech.model, timeout)?);

        Self::with_components(
            settings,
            prompts,
            Arc::new(AutoExtractor::new()),
            embedder,
            model,
            synthesizer,
        )
    }

    /// Create an orchestrator with custom components.
    ///
    /// The embedder is shared between indexing and retrieval so chunk and
    /// question vectors come from the same model.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        extractor: Arc<dyn DocumentExtractor>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Result<Self> {
        settings.validate()?;

        let policy = CallPolicy::new(
            settings.general.request_timeout_secs,
            settings.general.max_retries,
        );

        let chunker = RecursiveChunker::new(ChunkingConfig::new(
            settings.chunking.chunk_size,
            settings.chunking.chunk_overlap,
        )?)?;

        let indexer = Indexer::new(embedder.clone()).with_policy(policy.clone());

        let questions = QuestionDeriver::new(model.clone())
            .with_prompts(prompts.clone())
            .with_policy(policy.clone())
            .with_max_questions(settings.rag.max_questions);

        let retriever = Retriever::new(embedder)
            .with_policy(policy.clone())
            .with_top_k(settings.rag.top_k_per_question);

        let answers = AnswerSynthesizer::new(model.clone())
            .with_prompts(prompts.clone())
            .with_policy(policy.clone());

        let compiler = ScriptCompiler::new(model)
            .with_prompts(prompts)
            .with_policy(policy.clone())
            .with_settings(settings.script.clone())
            .with_speakers(
                &settings.speech.speaker_a.name,
                &settings.speech.speaker_b.name,
            );

        let assembler = AudioAssembler::new(synthesizer)
            .with_voices(VoiceTable::from_settings(&settings.speech)?)
            .with_options(SpeechOptions {
                speed: settings.speech.speed,
                language: settings.speech.language.clone(),
            })
            .with_policy(policy)
            .with_max_concurrent(settings.speech.max_concurrent);

        Ok(Self {
            settings,
            extractor,
            chunker,
            indexer,
            questions,
            retriever,
            answers,
            compiler,
            assembler,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the full pipeline on one document.
    ///
    /// Stages run strictly in order; the first failure stops the run and is
    /// returned as [`DuettError::Stage`].
    #[instrument(skip(self, observer), fields(path = %path.display()))]
    pub async fn run(&self, path: &Path, observer: &dyn PipelineObserver) -> Result<Podcast> {
        let text = stage(Stage::Extraction, observer, self.extractor.extract(path)).await?;
        observer.stage_finished(
            Stage::Extraction,
            &format!("{} characters", text.chars().count()),
        );

        let index = stage(Stage::Indexing, observer, async {
            let chunks = self.chunker.split(&text);
            info!("Split document into {} chunks", chunks.len());
            self.indexer.build(chunks).await
        })
        .await?;
        let chunk_count = index.len();
        observer.stage_finished(Stage::Indexing, &format!("{} chunks", chunk_count));

        let questions = stage(Stage::Questions, observer, self.questions.derive(&text)).await?;
        observer.stage_finished(
            Stage::Questions,
            &format!("{} questions", questions.len()),
        );
        observer.questions_ready(&questions);

        let answers = stage(Stage::Answers, observer, async {
            let contexts = self.retriever.retrieve(&index, &questions).await?;
            self.answers.synthesize(&contexts).await
        })
        .await?;
        observer.stage_finished(Stage::Answers, "answers ready");

        let script = stage(Stage::Script, observer, self.compiler.compile(&answers)).await?;
        observer.stage_finished(
            Stage::Script,
            &format!("{} words", script.word_count()),
        );
        observer.script_ready(&script);

        let (lines, audio) =
            stage(Stage::Audio, observer, self.assembler.render(script.text())).await?;
        observer.stage_finished(
            Stage::Audio,
            &format!("{:.1}s of audio", audio.duration_seconds()),
        );

        Ok(Podcast {
            questions,
            answers,
            script,
            lines,
            audio,
            chunk_count,
        })
    }
}

async fn stage<T, F>(stage: Stage, observer: &dyn PipelineObserver, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    observer.stage_started(stage);
    info!(
        "Stage {}/{}: {}",
        stage.number(),
        Stage::ALL.len(),
        stage.label()
    );
    work.await.map_err(|e| e.in_stage(stage))
}
