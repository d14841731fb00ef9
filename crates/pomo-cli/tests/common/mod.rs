//! Common utilities for CLI E2E tests.

use std::path::{Path, PathBuf};
use std::process::Command;

/// A settings file in a private temp dir, pointing at its own SQLite file.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
}

impl Sandbox {
    pub fn new(backend: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = dir.path().join("pomo.db");
        let settings = format!(
            "[storage]\nbackend = \"{backend}\"\npath = \"{}\"\n",
            db.display().to_string().replace('\\', "\\\\")
        );
        std::fs::write(dir.path().join("config.toml"), settings)
            .expect("Failed to write settings");
        Self { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn run(&self, args: &[&str]) -> (String, String, i32) {
        run_cli(&self.config_path(), args)
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        if code != 0 && !stderr.is_empty() {
            eprintln!("CLI error output: {}", stderr);
        }
        assert_eq!(code, 0, "CLI command failed with code {}: {:?}", code, args);
        stdout
    }
}

/// Invoke the CLI with `--config <config>` and return the output.
pub fn run_cli(config: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_pomo-cli"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("POMO_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Parse every stdout line as a JSON event.
pub fn parse_events(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("Failed to parse JSON event"))
        .collect()
}

/// Check if string contains substring
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "Expected '{}' to contain '{}'",
        haystack, needle
    );
}
