//! Game plugin and load order reporting.
//!
//! Games built on the Gamebryo/Creation engines load `.esp`/`.esm`/`.esl`
//! plugins from the top of their data directory, so only plugins at the root of
//! a mod are reported. Other games provide their own load order, which is
//! passed through untouched.

use crate::model::{LoadOrderEntry, PluginEntry, PluginState};
use crate::walker::ListedEntry;
use std::collections::HashMap;
use std::path::Path;

pub const PLUGIN_EXTENSIONS: &[&str] = &["esp", "esm", "esl"];

/// Games whose load order is expressed through plugin files.
pub const PLUGIN_GAMES: &[&str] = &[
    "oblivion",
    "skyrim",
    "skyrimse",
    "skyrimvr",
    "fallout3",
    "falloutnv",
    "fallout4",
    "fallout4vr",
    "enderal",
    "enderalspecialedition",
];

pub fn supports_plugin_report(game_id: &str) -> bool {
    PLUGIN_GAMES.contains(&game_id.to_lowercase().as_str())
}

pub fn is_plugin_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| PLUGIN_EXTENSIONS.contains(&ext.as_str()))
}

/// Case-insensitive view over the host's plugin states.
pub struct PluginStates<'a> {
    by_name: HashMap<String, (&'a str, PluginState)>,
}

impl<'a> PluginStates<'a> {
    pub fn new(states: &'a HashMap<String, PluginState>) -> Self {
        let by_name = states
            .iter()
            .map(|(name, state)| (name.to_lowercase(), (name.as_str(), *state)))
            .collect();
        Self { by_name }
    }

    pub fn get(&self, plugin_name: &str) -> Option<PluginState> {
        self.by_name
            .get(&plugin_name.to_lowercase())
            .map(|(_, state)| *state)
    }

    /// Enabled plugins ordered by load position.
    fn enabled_in_order(&self) -> Vec<(&'a str, PluginState)> {
        let mut enabled: Vec<_> = self
            .by_name
            .values()
            .filter(|(_, state)| state.enabled)
            .copied()
            .collect();
        enabled.sort_by(|a, b| {
            a.1.load_order
                .cmp(&b.1.load_order)
                .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
        });
        enabled
    }
}

/// Lists the plugins at the root of `mod_root` with their load state.
/// Plugins unknown to the host are reported disabled at position `-1`.
pub fn build_plugin_report(
    listing: &[ListedEntry],
    mod_root: &Path,
    states: &PluginStates<'_>,
) -> Vec<PluginEntry> {
    let mut plugins: Vec<PluginEntry> = listing
        .iter()
        .filter(|e| !e.is_directory && is_plugin_file(&e.path))
        .filter(|e| e.path.parent() == Some(mod_root))
        .filter_map(|e| e.path.file_name())
        .map(|name| {
            let name = name.to_string_lossy().into_owned();
            let state = states.get(&name);
            PluginEntry {
                load_order: state.map_or(-1, |s| s.load_order),
                enabled: state.is_some_and(|s| s.enabled),
                name,
            }
        })
        .collect();

    plugins.sort_by_cached_key(|p| p.name.to_lowercase());
    plugins
}

/// Load order derived from plugin states, tagging entries this mod provides.
pub fn plugin_load_order(
    states: &PluginStates<'_>,
    plugins: &[PluginEntry],
    mod_id: &str,
) -> Vec<LoadOrderEntry> {
    states
        .enabled_in_order()
        .into_iter()
        .map(|(name, state)| {
            let owned = plugins.iter().any(|p| p.name.eq_ignore_ascii_case(name));
            LoadOrderEntry {
                id: name.to_lowercase(),
                name: Some(name.to_string()),
                enabled: true,
                mod_id: owned.then(|| mod_id.to_string()),
                position: Some(state.load_order),
            }
        })
        .collect()
}
