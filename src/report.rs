//! Report assembly.
//!
//! [`ReportGenerator`] resolves a mod in the supplied [`HostState`], lists its
//! staging directory, builds the file and plugin sections and fills in the
//! metadata header. Metadata attributes are each resolved by a `resolve_*`
//! function that falls back to [`NOT_AVAILABLE`].

use crate::config::ReportConfig;
use crate::error::{HashError, ReportError, ReportResult};
use crate::files::{build_file_report, hashing_limiter, FileReportInput, ProgressFn};
use crate::limiter::ConcurrencyLimiter;
use crate::manifest::ManifestLookup;
use crate::model::{
    DeploymentManifest, DownloadInfo, HostState, ModInfo, ModReport, NOT_AVAILABLE,
};
use crate::plugins::{build_plugin_report, plugin_load_order, supports_plugin_report, PluginStates};
use crate::walker::list_directory;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Whether file digests are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestMode {
    #[default]
    Always,
    Never,
    /// Ask the [`DigestPrompt`] when the mod has more files than the
    /// configured threshold.
    Ask,
}

/// Decides whether to hash a large mod. Receives the number of files.
pub trait DigestPrompt {
    fn confirm_digests(&self, file_count: usize) -> bool;
}

impl<F: Fn(usize) -> bool> DigestPrompt for F {
    fn confirm_digests(&self, file_count: usize) -> bool {
        self(file_count)
    }
}

pub struct ReportGenerator {
    config: ReportConfig,
    limiter: ConcurrencyLimiter<HashError>,
    progress: Option<Box<ProgressFn<'static>>>,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        let limiter = hashing_limiter(&config);
        Self {
            config,
            limiter,
            progress: None,
        }
    }

    /// Reports hashing progress as `(completed, total)` file counts.
    pub fn with_progress(
        mut self,
        progress: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Generates the report for `mod_id`.
    ///
    /// Fails with [`ReportError::Cancelled`] when the mod is unknown or its
    /// mod type has no deploy target.
    pub async fn generate(
        &self,
        state: &HostState,
        mod_id: &str,
        digests: DigestMode,
        prompt: &dyn DigestPrompt,
    ) -> ReportResult<ModReport> {
        let result = self.generate_inner(state, mod_id, digests, prompt).await;
        if let Err(ReportError::Cancelled(reason)) = &result {
            log::info!("Report for {} cancelled: {}", mod_id, reason);
        }
        result
    }

    async fn generate_inner(
        &self,
        state: &HostState,
        mod_id: &str,
        digests: DigestMode,
        prompt: &dyn DigestPrompt,
    ) -> ReportResult<ModReport> {
        let mod_info = state
            .mods
            .get(mod_id)
            .ok_or_else(|| ReportError::Cancelled(format!("unknown mod {:?}", mod_id)))?;

        let deploy_target = state.deploy_targets.get(&mod_info.mod_type).ok_or_else(|| {
            ReportError::Cancelled(format!(
                "no deploy target for mod type {:?}",
                mod_info.mod_type
            ))
        })?;

        let mod_root = state.staging_path.join(&mod_info.installation_path);
        let listing = list_directory(&mod_root).await?;

        let empty_manifest = DeploymentManifest::default();
        let manifest = state
            .manifests
            .get(&mod_info.mod_type)
            .unwrap_or(&empty_manifest);
        let lookup = ManifestLookup::new(manifest);

        let file_count = listing.iter().filter(|e| !e.is_directory).count();
        let generate_md5 = self.should_generate_digests(digests, file_count, prompt);
        log::debug!(
            "Reporting on {} files of {} (digests: {})",
            file_count,
            mod_id,
            generate_md5
        );

        let input = FileReportInput {
            mod_id,
            mod_root: &mod_root,
            deploy_target,
            manifest: &lookup,
        };
        let files = build_file_report(
            input,
            &listing,
            &self.limiter,
            generate_md5,
            self.progress.as_deref(),
        )
        .await;

        let (plugins, load_order) = if supports_plugin_report(&state.game_id) {
            let states = PluginStates::new(&state.plugin_states);
            let plugins = build_plugin_report(&listing, &mod_root, &states);
            let load_order = plugin_load_order(&states, &plugins, mod_id);
            (Some(plugins), Some(load_order))
        } else {
            (None, state.load_order.clone())
        };

        let download = resolve_download(state, mod_info);

        let report = ModReport {
            mod_id: mod_id.to_string(),
            name: resolve_name(mod_info),
            version: resolve_version(mod_info),
            md5: resolve_md5(mod_info, download),
            archive_name: resolve_archive_name(mod_info, download),
            source: resolve_source(mod_info),
            managed_game: resolve_managed_game(state),
            intended_game: resolve_intended_game(mod_info, download),
            deployment_method: resolve_deployment_method(state, manifest),
            deployment_time: resolve_deployment_time(manifest),
            mod_type: resolve_mod_type(mod_info),
            files,
            plugins,
            load_order,
            installer_choices: mod_info.attributes.installer_choices.clone(),
        };

        log::info!(
            "Generated report for {} ({} files, {} plugins)",
            mod_id,
            report.files.len(),
            report.plugins.as_ref().map_or(0, Vec::len)
        );
        Ok(report)
    }

    fn should_generate_digests(
        &self,
        digests: DigestMode,
        file_count: usize,
        prompt: &dyn DigestPrompt,
    ) -> bool {
        match digests {
            DigestMode::Always => true,
            DigestMode::Never => false,
            DigestMode::Ask if file_count > self.config.digest_prompt_threshold => {
                prompt.confirm_digests(file_count)
            }
            DigestMode::Ask => true,
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

fn or_not_available(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

/// The download the mod was installed from, if the host still knows it.
pub fn resolve_download<'a>(state: &'a HostState, mod_info: &ModInfo) -> Option<&'a DownloadInfo> {
    mod_info
        .attributes
        .download_id
        .as_ref()
        .and_then(|id| state.downloads.get(id))
}

/// Custom name, then logical file name, then name, then the mod id.
pub fn resolve_name(mod_info: &ModInfo) -> String {
    let attributes = &mod_info.attributes;
    non_empty(attributes.custom_file_name.as_ref())
        .or_else(|| non_empty(attributes.logical_file_name.as_ref()))
        .or_else(|| non_empty(attributes.name.as_ref()))
        .unwrap_or(mod_info.id.as_str())
        .to_string()
}

/// Version attribute, or `N/A`.
pub fn resolve_version(mod_info: &ModInfo) -> String {
    or_not_available(non_empty(mod_info.attributes.version.as_ref()))
}

/// Archive checksum recorded on the mod, then on its download, or `N/A`.
pub fn resolve_md5(mod_info: &ModInfo, download: Option<&DownloadInfo>) -> String {
    or_not_available(
        non_empty(mod_info.attributes.file_md5.as_ref())
            .or_else(|| download.and_then(|d| non_empty(d.file_md5.as_ref()))),
    )
}

/// Archive file name, then the file name of the download's path, or `N/A`.
pub fn resolve_archive_name(mod_info: &ModInfo, download: Option<&DownloadInfo>) -> String {
    if let Some(name) = non_empty(mod_info.attributes.file_name.as_ref()) {
        return name.to_string();
    }
    let from_download = download
        .and_then(|d| non_empty(d.local_path.as_ref()))
        .and_then(|p| Path::new(p).file_name())
        .map(|n| n.to_string_lossy().into_owned());
    from_download.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Where the mod was obtained (e.g. a mod site), or `N/A`.
pub fn resolve_source(mod_info: &ModInfo) -> String {
    or_not_available(non_empty(mod_info.attributes.source.as_ref()))
}

/// Game the host is managing, or `N/A`.
pub fn resolve_managed_game(state: &HostState) -> String {
    or_not_available(Some(state.game_id.as_str()).filter(|g| !g.is_empty()))
}

/// Game the mod was downloaded for, then the download's first game, or `N/A`.
pub fn resolve_intended_game(mod_info: &ModInfo, download: Option<&DownloadInfo>) -> String {
    or_not_available(
        non_empty(mod_info.attributes.download_game.as_ref())
            .or_else(|| download.and_then(|d| non_empty(d.game.first()))),
    )
}

/// Method named in the manifest, then the host's active method, or `N/A`.
pub fn resolve_deployment_method(state: &HostState, manifest: &DeploymentManifest) -> String {
    or_not_available(
        non_empty(manifest.deployment_method.as_ref())
            .or_else(|| non_empty(state.deployment_method.as_ref())),
    )
}

/// Manifest deployment time as RFC 3339, or `N/A`.
pub fn resolve_deployment_time(manifest: &DeploymentManifest) -> String {
    manifest
        .deployment_time
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Mod type, with the unnamed type reported as `default`.
pub fn resolve_mod_type(mod_info: &ModInfo) -> String {
    if mod_info.mod_type.is_empty() {
        "default".to_string()
    } else {
        mod_info.mod_type.clone()
    }
}
