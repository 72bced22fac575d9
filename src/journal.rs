//! Append-only text logs: `results.log` (one line per notified post) and
//! `errors.log` (one entry per fault that reached the top level).

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

pub const TS_FORMAT: &str = "%m-%d-%Y %I:%M:%S %p";

pub fn timestamp(now: DateTime<Local>) -> String {
    now.format(TS_FORMAT).to_string()
}

/// `<ts> - <source> - <title>`
pub fn result_line(now: DateTime<Local>, source: &str, title: &str) -> String {
    format!("{} - {} - {}", timestamp(now), source, title)
}

/// `<ts>: <message>\n<detail>\n\n`
pub fn error_entry(now: DateTime<Local>, message: &str, detail: &str) -> String {
    format!("{}: {}\n{}\n\n", timestamp(now), message, detail)
}

#[derive(Debug, Clone)]
pub struct Journal {
    results: PathBuf,
    errors: PathBuf,
}

impl Journal {
    pub fn new(results: impl Into<PathBuf>, errors: impl Into<PathBuf>) -> Self {
        Self {
            results: results.into(),
            errors: errors.into(),
        }
    }

    pub fn results_path(&self) -> &Path {
        &self.results
    }

    pub fn errors_path(&self) -> &Path {
        &self.errors
    }

    /// Appends `<line> (<permalink>)`.
    pub async fn append_result(&self, line: &str, permalink: &str) -> Result<()> {
        append(&self.results, &format!("{line} ({permalink})\n")).await
    }

    pub async fn append_error(&self, message: &str, detail: &str) -> Result<()> {
        append(&self.errors, &error_entry(Local::now(), message, detail)).await
    }
}

async fn append(path: &Path, text: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    f.write_all(text.as_bytes())
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    f.flush().await?;
    Ok(())
}
