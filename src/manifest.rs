//! Case-insensitive lookup over a deployment manifest.

use crate::model::{DeploymentManifest, ManifestFile};
use std::collections::HashMap;

/// Maps uppercased relative paths to the manifest records describing them.
///
/// Both `/` and `\` are accepted as separators so staging paths and host
/// manifest paths match regardless of platform.
#[derive(Debug, Default)]
pub struct ManifestLookup<'a> {
    entries: HashMap<String, &'a ManifestFile>,
}

impl<'a> ManifestLookup<'a> {
    pub fn new(manifest: &'a DeploymentManifest) -> Self {
        let entries = manifest
            .files
            .iter()
            .map(|file| (normalize_key(&file.rel_path), file))
            .collect();
        Self { entries }
    }

    pub fn get(&self, rel_path: &str) -> Option<&'a ManifestFile> {
        self.entries.get(&normalize_key(rel_path)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_key(rel_path: &str) -> String {
    rel_path
        .replace('\\', "/")
        .trim_start_matches('/')
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> DeploymentManifest {
        DeploymentManifest {
            files: vec![
                ManifestFile {
                    rel_path: "Textures\\Armor\\Iron.dds".into(),
                    source: "mod-a".into(),
                    target: None,
                },
                ManifestFile {
                    rel_path: "plugin.esp".into(),
                    source: "mod-b".into(),
                    target: None,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn lookup_ignores_case_and_separator_style() {
        let manifest = manifest();
        let lookup = ManifestLookup::new(&manifest);

        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get("textures/armor/iron.DDS").unwrap().source, "mod-a");
        assert_eq!(lookup.get("PLUGIN.ESP").unwrap().source, "mod-b");
        assert!(lookup.get("missing.esp").is_none());
    }

    #[test]
    fn empty_manifest_yields_empty_lookup() {
        let manifest = DeploymentManifest::default();
        let lookup = ManifestLookup::new(&manifest);
        assert!(lookup.is_empty());
    }
}
