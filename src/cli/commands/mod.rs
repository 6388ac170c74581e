//! CLI command implementations.

mod config;
mod doctor;
mod generate;
mod init;

pub use config::{resolve_config_path, run_config, set_value};
pub use doctor::run_doctor;
pub use generate::{apply_overrides, output_path, run_generate};
pub use init::run_init;
