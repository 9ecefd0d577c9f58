use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use rowscribe_core::{RedactedUrl, StatementSet};

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub command: &'static str,
    pub run_dir: PathBuf,
    /// Command options as recorded in `config.json`; never carries secrets.
    pub options: Value,
    pub connection: Option<RedactedUrl>,
    pub translator: Option<RedactedUrl>,
}

impl RunContext {
    pub fn new(command: &'static str, run_dir: impl Into<PathBuf>, options: Value) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            command,
            run_dir: run_dir.into(),
            options,
            connection: None,
            translator: None,
        }
    }
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub command: String,
    pub options: Value,
    pub connection: Option<RedactedUrl>,
    pub translator: Option<RedactedUrl>,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub statements_path: PathBuf,
    pub result_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));
    create_dir_all(&root)?;

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        command: ctx.command.to_string(),
        options: ctx.options.clone(),
        connection: ctx.connection.clone(),
        translator: ctx.translator.clone(),
        git: collect_git_info(),
    };
    write_json(&root.join("config.json"), &config)?;

    let logs_path = root.join("logs.ndjson");
    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        logs_path,
        statements_path: root.join("statements.sql"),
        result_path: root.join("result.json"),
        root,
    })
}

/// Write the SQL script into the run and, optionally, to `out`.
pub fn write_statements(
    paths: &RunPaths,
    statements: &StatementSet,
    out_path: Option<&Path>,
) -> RegistryResult<()> {
    let mut script = statements.to_sql_text();
    if !script.is_empty() {
        script.push('\n');
    }
    write_text(&paths.statements_path, &script)?;

    if let Some(out_path) = out_path {
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        write_text(out_path, &script)?;
    }
    Ok(())
}

pub fn write_result<T: Serialize>(paths: &RunPaths, value: &T) -> RegistryResult<()> {
    write_json(&paths.result_path, value)
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_text(path: &Path, text: &str) -> RegistryResult<()> {
    let mut file = OpenOptions::new().create(true).truncate(true).write(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new().create(true).truncate(true).write(true).open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
