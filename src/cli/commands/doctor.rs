//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::path::Path;
use std::process::Command;

/// Outcome of one diagnostic check.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn new(status: CheckStatus, name: &str, message: impl Into<String>, hint: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            hint: hint.map(str::to_string),
        }
    }

    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Ok, name, message, None)
    }

    fn warning(name: &str, message: impl Into<String>, hint: &str) -> Self {
        Self::new(CheckStatus::Warning, name, message, Some(hint))
    }

    fn error(name: &str, message: impl Into<String>, hint: &str) -> Self {
        Self::new(CheckStatus::Error, name, message, Some(hint))
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };
        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);
        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks and exit non-zero if any failed.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Duett Doctor");
    println!("\nChecking system requirements and configuration...\n");

    let sections = [
        ("External Tools", vec![check_pdftotext()]),
        ("API Configuration", vec![check_openai_api_key()]),
        ("Directories", check_directories(settings)),
        (
            "Configuration",
            vec![check_config_file(config_path), check_voices(settings)],
        ),
    ];

    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        checks.iter().for_each(CheckResult::print);
        println!();
    }

    let count = |status: CheckStatus| {
        sections
            .iter()
            .flat_map(|(_, checks)| checks)
            .filter(|c| c.status == status)
            .count()
    };

    match (count(CheckStatus::Error), count(CheckStatus::Warning)) {
        (0, 0) => Output::success("All checks passed! Duett is ready to use."),
        (0, warnings) => Output::warning(&format!("All checks passed with {} warning(s).", warnings)),
        (errors, _) => {
            Output::error(&format!(
                "{} error(s) found. Please fix them before generating a podcast.",
                errors
            ));
            std::process::exit(1);
        }
    }

    Ok(())
}

/// `pdftotext` is only needed for PDF input, so a missing binary is a warning.
fn check_pdftotext() -> CheckResult {
    match Command::new("pdftotext").arg("-v").output() {
        Ok(output) => {
            // pdftotext prints its version to stderr
            let text = if output.stderr.is_empty() {
                output.stdout
            } else {
                output.stderr
            };
            let version = String::from_utf8_lossy(&text)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            let version_display: String = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };
            CheckResult::ok("pdftotext", version_display)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::warning(
            "pdftotext",
            "not found (needed for PDF documents)",
            install_hint_poppler(),
        ),
        Err(e) => CheckResult::error("pdftotext", format!("error: {}", e), install_hint_poppler()),
    }
}

/// Check the OpenAI API key without printing it.
fn check_openai_api_key() -> CheckResult {
    const NAME: &str = "OPENAI_API_KEY";
    const HINT: &str = "Set with: export OPENAI_API_KEY='sk-...'";

    match std::env::var(NAME) {
        Err(_) => CheckResult::error(NAME, "not set", HINT),
        Ok(key) if key.trim().is_empty() => CheckResult::error(NAME, "empty", HINT),
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            CheckResult::ok(NAME, format!("configured (sk-...{})", tail))
        }
        Ok(_) => CheckResult::warning(NAME, "set but format looks unusual", "Expected format: sk-..."),
    }
}

/// Check the output and custom prompt directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let output_dir = settings.output_dir();
    if output_dir.exists() {
        results.push(CheckResult::ok(
            "Output directory",
            output_dir.display().to_string(),
        ));
    } else {
        results.push(CheckResult::warning(
            "Output directory",
            format!("{} (will be created)", output_dir.display()),
            "Directory will be created on first use",
        ));
    }

    if let Some(dir) = &settings.prompts.custom_dir {
        let prompts_dir = Settings::expand_path(dir);
        if prompts_dir.is_dir() {
            results.push(CheckResult::ok(
                "Custom prompts",
                prompts_dir.display().to_string(),
            ));
        } else {
            results.push(CheckResult::error(
                "Custom prompts",
                format!("{} does not exist", prompts_dir.display()),
                "Create it or remove prompts.custom_dir from the config",
            ));
        }
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: duett init (or duett config edit)",
        )
    }
}

/// Check that both hosts map to usable script tokens and voices.
fn check_voices(settings: &Settings) -> CheckResult {
    match crate::audio::VoiceTable::from_settings(&settings.speech) {
        Ok(table) => {
            let voices: Vec<String> = table
                .entries()
                .iter()
                .map(|e| format!("{} -> {}", e.token, e.voice))
                .collect();
            CheckResult::ok("Voices", voices.join(", "))
        }
        Err(e) => CheckResult::error(
            "Voices",
            e.to_string(),
            "Set speech.speaker_a and speech.speaker_b to single-word names",
        ),
    }
}

/// Platform-specific install hint for poppler.
fn install_hint_poppler() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install poppler"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install poppler-utils (or your package manager)"
    } else {
        "Install from: https://poppler.freedesktop.org"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeakerSettings;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_check_voices() {
        let settings = Settings::default();
        let result = check_voices(&settings);
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.message.contains("SARAH -> nova"));

        let mut bad = Settings::default();
        bad.speech.speaker_b = SpeakerSettings {
            name: "Dr. Who".to_string(),
            voice: "echo".to_string(),
        };
        assert_eq!(check_voices(&bad).status, CheckStatus::Error);
    }

    #[test]
    fn test_missing_config_is_a_warning() {
        let result = check_config_file(Path::new("/definitely/not/here/config.toml"));
        assert_eq!(result.status, CheckStatus::Warning);
    }
}
