//! Plain text and JSON renderings of a [`ModReport`].

use crate::model::{FileCategory, FileEntry, ModReport};

/// Shown in place of the lines of an empty section.
pub const EMPTY_SECTION: &str = "<None>";

/// Prefix for load order entries provided by the reported mod.
pub const OWNED_MARKER: &str = "* ";

/// Renders the report as plain text suitable for the clipboard or a file.
pub fn render_text(report: &ModReport) -> String {
    let mut out = String::new();

    heading(&mut out, &format!("Report for {}", report.name), '=');
    let fields = [
        ("Mod ID", &report.mod_id),
        ("Version", &report.version),
        ("MD5", &report.md5),
        ("Archive", &report.archive_name),
        ("Source", &report.source),
        ("Managed game", &report.managed_game),
        ("Intended game", &report.intended_game),
        ("Deployment method", &report.deployment_method),
        ("Last deployment", &report.deployment_time),
        ("Mod type", &report.mod_type),
    ];
    for (label, value) in fields {
        out.push_str(&format!("{}: {}\n", label, value));
    }
    out.push('\n');

    if let Some(choices) = &report.installer_choices {
        let rendered =
            serde_json::to_string_pretty(choices).unwrap_or_else(|_| choices.to_string());
        section(&mut out, "Installer choices", rendered.lines().map(String::from).collect());
    }

    for category in FileCategory::ALL {
        let lines = report.files_in(category).map(|f| file_line(category, f)).collect();
        section(&mut out, category.title(), lines);
    }

    if let Some(plugins) = &report.plugins {
        let lines = plugins
            .iter()
            .map(|p| {
                let state = if p.enabled { "enabled" } else { "disabled" };
                let position = if p.load_order >= 0 {
                    p.load_order.to_string()
                } else {
                    "-".to_string()
                };
                format!("{} ({}, load order {})", p.name, state, position)
            })
            .collect();
        section(&mut out, "Plugins", lines);
    }

    if let Some(load_order) = &report.load_order {
        let lines = load_order
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let marker = if entry.is_owned_by(&report.mod_id) {
                    OWNED_MARKER
                } else {
                    "  "
                };
                let position = entry.position.unwrap_or(index as i32);
                let disabled = if entry.enabled { "" } else { " (disabled)" };
                format!("{}{:>3} {}{}", marker, position, entry.display_name(), disabled)
            })
            .collect();
        section(&mut out, "Load order", lines);
    }

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

/// Serializes the report as pretty-printed JSON.
pub fn to_json(report: &ModReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

fn file_line(category: FileCategory, file: &FileEntry) -> String {
    let digest = file.md5sum.as_deref().unwrap_or("-");
    match category {
        FileCategory::Deployed => format!("{} ({})", file.path, digest),
        FileCategory::Overwritten => format!(
            "{} ({}) by {}",
            file.path,
            digest,
            file.overwritten_by.as_deref().unwrap_or("?")
        ),
        FileCategory::NotDeployed | FileCategory::Missing => file.path.clone(),
        FileCategory::Unreadable => format!(
            "{} ({})",
            file.path,
            file.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn heading(out: &mut String, title: &str, underline: char) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&underline.to_string().repeat(title.chars().count()));
    out.push('\n');
}

fn section(out: &mut String, title: &str, lines: Vec<String>) {
    heading(out, title, '-');
    if lines.is_empty() {
        out.push_str(EMPTY_SECTION);
        out.push('\n');
    }
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
}
