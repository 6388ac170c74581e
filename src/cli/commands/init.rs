//! Init command - interactive first-run setup.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::io::{self, Write};
use std::path::Path;

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Duett Setup");
    println!();
    println!("Welcome to Duett! Let's make sure everything is configured correctly.\n");

    // Step 1: Check prerequisites
    println!("{}", style("Step 1: Checking prerequisites").bold().cyan());
    println!();

    if pdftotext_installed() {
        Output::success("pdftotext is installed, PDF documents are supported!");
    } else {
        Output::warning("pdftotext was not found. Plain-text documents will still work.");
        println!("    {} {}", style("→").dim(), style(install_hint()).dim());
        println!();

        if !prompt_continue("Continue anyway?")? {
            println!();
            Output::info("Setup cancelled. Install poppler and run 'duett init' again.");
            return Ok(());
        }
    }

    println!();

    // Step 2: Check API key
    println!("{}", style("Step 2: Checking API configuration").bold().cyan());
    println!();

    if crate::openai::api_key().is_none() {
        Output::warning("OPENAI_API_KEY environment variable is not set.");
        println!();
        println!("  Duett uses OpenAI for embeddings, the script and the voices.");
        println!("  Get your API key from: {}", style("https://platform.openai.com/api-keys").underlined());
        println!();
        println!("  Set it in your shell configuration (~/.bashrc, ~/.zshrc, etc.):");
        println!("  {}", style("export OPENAI_API_KEY='sk-...'").green());
        println!();

        if !prompt_continue("Continue without API key?")? {
            println!();
            Output::info("Setup cancelled. Set your API key and run 'duett init' again.");
            return Ok(());
        }
    } else {
        Output::success("OpenAI API key is configured!");
    }

    println!();

    // Step 3: Create directories
    println!("{}", style("Step 3: Setting up directories").bold().cyan());
    println!();

    let output_dir = settings.output_dir();
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir)?;
        Output::success(&format!("Created output directory: {}", output_dir.display()));
    } else {
        Output::info(&format!("Output directory exists: {}", output_dir.display()));
    }

    println!();

    // Step 4: Create config file
    println!("{}", style("Step 4: Configuration file").bold().cyan());
    println!();

    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else if prompt_continue("Create default configuration file?")? {
        settings.save_to(&config_path.to_path_buf())?;
        Output::success(&format!("Created config file: {}", config_path.display()));
        println!();
        println!("  Edit your config with: {}", style("duett config edit").green());
    } else {
        Output::info("Skipped config file creation. Using defaults.");
    }

    println!();

    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Check system status", style("duett doctor").cyan());
    println!("  {} Turn a paper into a podcast", style("duett generate <file.pdf>").cyan());
    println!("  {} Pick different voices", style("duett config set speech.speaker_a.voice shimmer").cyan());
    println!();
    println!("For more help: {}", style("duett --help").cyan());

    Ok(())
}

fn pdftotext_installed() -> bool {
    std::process::Command::new("pdftotext")
        .arg("-v")
        .output()
        .is_ok()
}

/// Get platform-specific install hint.
fn install_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install poppler"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install poppler-utils"
    } else {
        "Install from: https://poppler.freedesktop.org"
    }
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} ", style("?").cyan(), message);
    print!("{} ", style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
