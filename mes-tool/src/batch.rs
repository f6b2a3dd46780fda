//! Per-file export/build jobs and the folder driver around them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use glob::{glob_with, MatchOptions, Pattern};
use mes_nls::Codec;
use mes_script::Script;

use crate::config::ToolConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(PathBuf),
    Skipped(String),
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `path` itself if it is a file, otherwise its `*.<extension>` files in name order.
pub fn collect_scripts(path: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let dir = path
        .to_str()
        .ok_or_else(|| anyhow!("folder path is not valid UTF-8: {}", path.display()))?;
    let pattern = format!("{}/*.{}", Pattern::escape(dir), Pattern::escape(extension));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut files = Vec::new();
    for entry in glob_with(&pattern, options)? {
        let entry = entry?;
        if entry.is_file() {
            files.push(entry);
        }
    }
    files.sort();
    Ok(files)
}

/// Run `job` on every file. A failing file is logged and does not stop the others.
pub fn run_batch<F>(files: &[PathBuf], mut job: F) -> BatchSummary
where
    F: FnMut(&Path) -> Result<Outcome>,
{
    let mut summary = BatchSummary::default();

    for file in files {
        match job(file) {
            Ok(Outcome::Written(out)) => {
                log::info!("{} -> {}", file.display(), out.display());
                summary.written += 1;
            }
            Ok(Outcome::Skipped(why)) => {
                log::warn!("{}: skipped, {}", file.display(), why);
                summary.skipped += 1;
            }
            Err(e) => {
                log::error!("{}: {:#}", file.display(), e);
                summary.failed.push((file.clone(), e));
            }
        }
    }

    summary
}

pub fn text_path(script: &Path, config: &ToolConfig) -> PathBuf {
    script.with_extension(&config.text_extension)
}

pub fn rebuild_path(script: &Path, config: &ToolConfig) -> Result<PathBuf> {
    let name = script
        .file_name()
        .ok_or_else(|| anyhow!("not a file: {}", script.display()))?;
    let dir = script.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(&config.rebuild_dir).join(name))
}

pub fn load_script(path: &Path) -> Result<Script> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Script::load(&bytes).with_context(|| format!("loading {}", path.display()))
}

pub fn export_file(path: &Path, codec: &Codec, config: &ToolConfig) -> Result<Outcome> {
    let script = load_script(path)?;
    let artifact = script.export_text(codec)?;
    if artifact.is_empty() {
        return Ok(Outcome::Skipped("no text to export".to_string()));
    }

    let out = text_path(path, config);
    fs::write(&out, artifact.to_string())
        .with_context(|| format!("writing {}", out.display()))?;
    log::debug!("{}: {} strings exported", path.display(), artifact.len());
    Ok(Outcome::Written(out))
}

pub fn build_file(path: &Path, codec: &Codec, config: &ToolConfig) -> Result<Outcome> {
    let text_file = text_path(path, config);
    if !text_file.exists() {
        return Ok(Outcome::Skipped(format!(
            "no text file {}",
            text_file.display()
        )));
    }

    let mut script = load_script(path)?;
    let text = fs::read_to_string(&text_file)
        .with_context(|| format!("reading {}", text_file.display()))?;
    let report = script
        .import_and_relocate(&text, codec)
        .with_context(|| format!("importing {}", text_file.display()))?;

    if !report.ignored_addresses.is_empty() {
        log::warn!(
            "{}: {} lines did not match a string and were ignored",
            text_file.display(),
            report.ignored_addresses.len()
        );
    }
    log::debug!(
        "{}: {} strings replaced, {} jump entries patched",
        path.display(),
        report.translated,
        report.patched_entries
    );

    let out = rebuild_path(path, config)?;
    if let Some(dir) = out.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(&out, script.save()).with_context(|| format!("writing {}", out.display()))?;
    Ok(Outcome::Written(out))
}
