mod config;
pub mod database;
mod memory;
mod repository;

pub use config::{DurationSettings, LogSettings, Settings, StorageBackend, StorageSettings};
pub use database::SqliteRepository;
pub use memory::InMemoryRepository;
pub use repository::Repository;

use std::path::PathBuf;

/// Returns `~/.config/pomo[-dev]/` based on POMO_ENV.
///
/// Set POMO_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMO_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomo-dev")
    } else {
        base_dir.join("pomo")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
