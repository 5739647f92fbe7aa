//! Report export operations.
//!
//! Reports are saved next to each other in a user chosen directory, one
//! timestamped file per export, either as the plain text rendering or as raw
//! JSON for sharing.

use crate::format::{render_text, to_json};
use crate::model::ModReport;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }

    pub fn render(&self, report: &ModReport) -> Result<String> {
        match self {
            ReportFormat::Text => Ok(render_text(report)),
            ReportFormat::Json => to_json(report).context("Failed to serialize report"),
        }
    }
}

/// Save a report to `dir` as `<mod name>_report_<timestamp>.<ext>`.
/// Creates the directory if needed and returns the written file's path.
pub fn save_report(report: &ModReport, dir: &Path, format: ReportFormat) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .context(format!("Failed to create report directory: {:?}", dir))?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let file_name = format!(
        "{}_report_{}.{}",
        sanitize_file_name(&report.name),
        timestamp,
        format.extension()
    );
    let path = dir.join(file_name);

    let content = format.render(report)?;
    fs::write(&path, content).context(format!("Failed to write report: {:?}", path))?;

    log::info!("Saved report for {} to {:?}", report.mod_id, path);
    Ok(path)
}

/// Replace characters that are not safe in file names on any platform.
fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        "mod".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report() -> ModReport {
        ModReport {
            mod_id: "m1".into(),
            name: "Cool Mod: Remastered".into(),
            version: "1.0".into(),
            md5: "N/A".into(),
            archive_name: "N/A".into(),
            source: "N/A".into(),
            managed_game: "skyrimse".into(),
            intended_game: "N/A".into(),
            deployment_method: "N/A".into(),
            deployment_time: "N/A".into(),
            mod_type: "default".into(),
            files: Vec::new(),
            plugins: None,
            load_order: None,
            installer_choices: None,
        }
    }

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_file_name("Cool Mod: Remastered"), "Cool_Mod-_Remastered");
        assert_eq!(sanitize_file_name("a/b\\c"), "a-b-c");
        assert_eq!(sanitize_file_name("   "), "mod");
    }

    #[test]
    fn saves_text_report() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("reports");

        let path = save_report(&report(), &out, ReportFormat::Text).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Cool_Mod-_Remastered_report_"));
        assert!(name.ends_with(".txt"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Report for Cool Mod: Remastered"));
    }

    #[test]
    fn saves_json_report() {
        let dir = TempDir::new().unwrap();

        let path = save_report(&report(), dir.path(), ReportFormat::Json).unwrap();

        assert_eq!(path.extension().unwrap(), "json");
        let parsed: ModReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, report());
    }
}
