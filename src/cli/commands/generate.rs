//! Generate command implementation.

use crate::cli::output::format_duration;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Stage;
use crate::orchestrator::{Orchestrator, PipelineObserver};
use crate::script::Script;
use anyhow::Result;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Shows a spinner per stage and prints questions and script as they arrive.
#[derive(Default)]
struct ProgressObserver {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressObserver {
    fn take_spinner(&self) -> Option<ProgressBar> {
        self.spinner.lock().ok().and_then(|mut s| s.take())
    }

    /// Stop the running spinner without a result (after a failure).
    fn clear(&self) {
        if let Some(spinner) = self.take_spinner() {
            spinner.finish_and_clear();
        }
    }
}

impl PipelineObserver for ProgressObserver {
    fn stage_started(&self, stage: Stage) {
        let spinner = Output::spinner(&format!(
            "[{}/{}] {}...",
            stage.number(),
            Stage::ALL.len(),
            stage.label()
        ));
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = slot.replace(spinner) {
                previous.finish_and_clear();
            }
        }
    }

    fn stage_finished(&self, stage: Stage, summary: &str) {
        self.clear();
        Output::success(&format!(
            "[{}/{}] {} ({})",
            stage.number(),
            Stage::ALL.len(),
            stage.label(),
            summary
        ));
    }

    fn questions_ready(&self, questions: &[String]) {
        Output::header("Questions");
        for (i, question) in questions.iter().enumerate() {
            Output::numbered(i + 1, question);
        }
        println!();
    }

    fn script_ready(&self, script: &Script) {
        Output::header("Script");
        for line in script.text().lines().filter(|l| !l.trim().is_empty()) {
            Output::dialogue(line.trim());
        }
        println!();
    }
}

/// Apply command-line overrides on top of the loaded settings.
pub fn apply_overrides(
    settings: &mut Settings,
    top_k: Option<usize>,
    word_limit: Option<usize>,
    model: Option<String>,
) -> crate::error::Result<()> {
    if let Some(k) = top_k {
        settings.rag.top_k_per_question = k;
    }
    if let Some(limit) = word_limit {
        settings.script.word_limit = limit;
    }
    if let Some(model) = model {
        settings.llm.model = model;
    }
    settings.validate()
}

/// Where the WAV file goes: the explicit path, or the document's name in the output directory.
pub fn output_path(document: &Path, output: Option<&str>, settings: &Settings) -> PathBuf {
    match output {
        Some(path) => Settings::expand_path(path),
        None => {
            let stem = document
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .unwrap_or("podcast");
            settings.output_dir().join(format!("{}.wav", stem))
        }
    }
}

/// Run the generate command.
pub async fn run_generate(
    document: &str,
    output: Option<String>,
    script_out: Option<String>,
    top_k: Option<usize>,
    word_limit: Option<usize>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    let document = Settings::expand_path(document);

    // Pre-flight checks
    if let Err(e) = preflight::check_generate(&document) {
        Output::error(&format!("{}", e));
        Output::info("Run 'duett doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    apply_overrides(&mut settings, top_k, word_limit, model)?;
    let wav_path = output_path(&document, output.as_deref(), &settings);

    Output::info(&format!("Processing: {}", document.display()));

    let orchestrator = Orchestrator::new(settings)?;
    let observer = ProgressObserver::default();

    let podcast = match orchestrator.run(&document, &observer).await {
        Ok(podcast) => podcast,
        Err(e) => {
            observer.clear();
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    podcast.audio.write_wav(&wav_path)?;

    if let Some(path) = script_out {
        let path = Settings::expand_path(&path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, podcast.script.text())?;
        Output::info(&format!("Script written to {}", path.display()));
    }

    Output::header("Summary");
    Output::kv("Chunks", &podcast.chunk_count.to_string());
    Output::kv("Questions", &podcast.questions.len().to_string());
    Output::kv("Script lines", &podcast.lines.len().to_string());
    Output::kv("Words", &podcast.script.word_count().to_string());
    Output::kv(
        "Duration",
        &format_duration(podcast.audio.duration_seconds()),
    );
    println!();
    Output::success(&format!("Podcast saved to {}", wav_path.display()));

    Ok(())
}
