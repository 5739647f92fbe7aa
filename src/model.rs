//! Report data model and the host-state input it is built from.
//!
//! Everything the report needs from the mod manager is passed in as a
//! [`HostState`] value. Field names serialize in camelCase so host state and
//! finished reports can be exchanged as JSON with the host process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Placeholder for any metadata attribute the mod or its download lacks.
pub const NOT_AVAILABLE: &str = "N/A";

/// `md5sum` value used when digest generation was switched off.
pub const MD5_NOT_CALCULATED: &str = "not calculated";

/// Error code recorded for a deployed file that is absent from the deploy target.
pub const MISSING_FILE_CODE: &str = "ENOENT";

/// Status of one file installed by the reported mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Path relative to the mod's staging directory.
    pub path: String,
    pub deployed: bool,
    /// Mod that currently owns the deployed copy, when it isn't this mod.
    pub overwritten_by: Option<String>,
    /// Digest of the deployed copy. `None` if hashing failed.
    pub md5sum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mutually exclusive buckets the formatter sorts file entries into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Deployed,
    Overwritten,
    NotDeployed,
    Missing,
    Unreadable,
}

impl FileCategory {
    /// All categories, in the order they are rendered.
    pub const ALL: [FileCategory; 5] = [
        FileCategory::Deployed,
        FileCategory::Overwritten,
        FileCategory::NotDeployed,
        FileCategory::Missing,
        FileCategory::Unreadable,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            FileCategory::Deployed => "Deployed files",
            FileCategory::Overwritten => "Files overwritten by other mods",
            FileCategory::NotDeployed => "Files not deployed",
            FileCategory::Missing => "Deployed files missing from the game directory",
            FileCategory::Unreadable => "Deployed files that could not be read",
        }
    }
}

impl FileEntry {
    /// Classifies the entry. Every entry lands in exactly one category.
    pub fn category(&self) -> FileCategory {
        if !self.deployed {
            return FileCategory::NotDeployed;
        }
        match (&self.error, &self.overwritten_by) {
            (Some(code), _) if code == MISSING_FILE_CODE => FileCategory::Missing,
            (Some(_), _) => FileCategory::Unreadable,
            (None, Some(_)) => FileCategory::Overwritten,
            (None, None) => FileCategory::Deployed,
        }
    }
}

/// A game plugin shipped at the top level of the mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    pub name: String,
    /// Position in the load order, `-1` when the plugin isn't loaded.
    pub load_order: i32,
    pub enabled: bool,
}

/// One line of a game's load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOrderEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Mod providing this entry, if known.
    #[serde(default)]
    pub mod_id: Option<String>,
    /// Position in the game's load order. Lists without positions are
    /// numbered by their order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

impl LoadOrderEntry {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_owned_by(&self, mod_id: &str) -> bool {
        self.mod_id.as_deref() == Some(mod_id)
    }
}

fn default_true() -> bool {
    true
}

/// The assembled diagnostic report for a single mod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModReport {
    pub mod_id: String,
    pub name: String,
    pub version: String,
    pub md5: String,
    pub archive_name: String,
    pub source: String,
    pub managed_game: String,
    pub intended_game: String,
    pub deployment_method: String,
    pub deployment_time: String,
    pub mod_type: String,
    pub files: Vec<FileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_order: Option<Vec<LoadOrderEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_choices: Option<serde_json::Value>,
}

impl ModReport {
    pub fn files_in(&self, category: FileCategory) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(move |f| f.category() == category)
    }
}

// ============================================================================
// Host state
// ============================================================================

/// Snapshot of the host application's state needed to report on a mod.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostState {
    /// Game currently managed by the host.
    pub game_id: String,
    /// Root directory mods are installed (staged) into.
    pub staging_path: PathBuf,
    pub deployment_method: Option<String>,
    pub mods: HashMap<String, ModInfo>,
    pub downloads: HashMap<String, DownloadInfo>,
    /// Deploy target directory per mod type. The default mod type is `""`.
    pub deploy_targets: HashMap<String, PathBuf>,
    /// Last deployment manifest per mod type.
    pub manifests: HashMap<String, DeploymentManifest>,
    /// Plugin name -> enabled/position. Names are matched case-insensitively.
    pub plugin_states: HashMap<String, PluginState>,
    /// Load order for games without plugin management.
    pub load_order: Option<Vec<LoadOrderEntry>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModInfo {
    pub id: String,
    /// Directory name below the staging path.
    pub installation_path: PathBuf,
    #[serde(default, rename = "type")]
    pub mod_type: String,
    #[serde(default)]
    pub attributes: ModAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModAttributes {
    pub name: Option<String>,
    pub logical_file_name: Option<String>,
    pub custom_file_name: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "fileMD5")]
    pub file_md5: Option<String>,
    pub file_name: Option<String>,
    pub source: Option<String>,
    pub download_game: Option<String>,
    pub download_id: Option<String>,
    pub installer_choices: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadInfo {
    pub local_path: Option<String>,
    pub game: Vec<String>,
    #[serde(rename = "fileMD5")]
    pub file_md5: Option<String>,
}

/// Record of what the last deployment placed in a deploy target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentManifest {
    pub deployment_method: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub deployment_time: Option<i64>,
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    pub rel_path: String,
    /// Id of the mod whose copy is deployed.
    pub source: String,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginState {
    pub enabled: bool,
    pub load_order: i32,
}
