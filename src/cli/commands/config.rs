//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: &Path) -> Result<()> {
    let config_path = config_path.to_path_buf();

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_value(&settings, key, value)?;
            updated.save_to(&config_path)?;
            Output::success(&format!("Set {} = {}", key, value));
        }

        ConfigAction::Edit => {
            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save_to(&config_path)?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => match Settings::load_from(Some(&config_path)) {
                    Ok(_) => Output::success("Config saved."),
                    Err(e) => Output::warning(&format!("Config saved but is invalid: {}", e)),
                },
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Return a copy of `settings` with the dotted `key` set to `value`.
///
/// The value keeps the type of the field it replaces; the result must
/// deserialize and validate like a loaded config file.
pub fn set_value(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let mut root = toml::Value::try_from(settings)
        .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

    let mut parts: Vec<&str> = key.split('.').collect();
    let field = parts
        .pop()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| anyhow!("Empty configuration key"))?;

    let mut table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config is not a table"))?;
    for part in &parts {
        table = table
            .get_mut(*part)
            .and_then(|v| v.as_table_mut())
            .ok_or_else(|| anyhow!("Unknown configuration key: {}", key))?;
    }

    let new_value = match table.get(field) {
        Some(toml::Value::String(_)) | None => toml::Value::String(value.to_string()),
        Some(_) => parse_literal(value)
            .ok_or_else(|| anyhow!("Invalid value for {}: {}", key, value))?,
    };
    table.insert(field.to_string(), new_value);

    let updated: Settings = root
        .try_into()
        .map_err(|e| anyhow!("Invalid value for {}: {}", key, e))?;

    // Unknown keys are dropped by deserialization; make sure this one stuck.
    let check = toml::Value::try_from(&updated)
        .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
    if lookup(&check, key).is_none() {
        return Err(anyhow!("Unknown configuration key: {}", key));
    }

    updated.validate()?;
    Ok(updated)
}

fn parse_literal(value: &str) -> Option<toml::Value> {
    let doc: toml::Table = toml::from_str(&format!("v = {}", value)).ok()?;
    doc.get("v").cloned()
}

fn lookup<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.').try_fold(value, |v, part| v.get(part))
}

/// Path of the config file in use.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(path) => Settings::expand_path(path),
        None => Settings::default_config_path(),
    }
}
