use modreport_core::{DeploymentManifest, HostState, ManifestFile, ModAttributes, ModInfo};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub const MOD_ID: &str = "cool-mod";

/// Staging and game directories for a single mod, plus the host state
/// describing them.
pub struct TestEnv {
    _tmp: TempDir,
    pub staging: PathBuf,
    pub game: PathBuf,
    pub state: HostState,
}

impl TestEnv {
    pub fn new(game_id: &str) -> Self {
        INIT.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });

        let tmp = TempDir::new().expect("create temp dir");
        let staging = tmp.path().join("staging");
        let game = tmp.path().join("game/Data");
        fs::create_dir_all(staging.join(MOD_ID)).expect("create mod dir");
        fs::create_dir_all(&game).expect("create game dir");

        let mut state = HostState {
            game_id: game_id.to_string(),
            staging_path: staging.clone(),
            deployment_method: Some("hardlink".to_string()),
            ..Default::default()
        };
        state.mods.insert(
            MOD_ID.to_string(),
            ModInfo {
                id: MOD_ID.to_string(),
                installation_path: PathBuf::from(MOD_ID),
                mod_type: String::new(),
                attributes: ModAttributes {
                    logical_file_name: Some("Cool Mod".to_string()),
                    version: Some("1.2.0".to_string()),
                    ..Default::default()
                },
            },
        );
        state.deploy_targets.insert(String::new(), game.clone());
        state
            .manifests
            .insert(String::new(), DeploymentManifest::default());

        Self {
            _tmp: tmp,
            staging,
            game,
            state,
        }
    }

    pub fn mod_dir(&self) -> PathBuf {
        self.staging.join(MOD_ID)
    }

    /// Writes a file into the mod's staging folder.
    pub fn stage(&self, rel_path: &str, content: &str) {
        write_file(&self.mod_dir().join(rel_path), content);
    }

    /// Writes a file into the game directory.
    pub fn deploy(&self, rel_path: &str, content: &str) {
        write_file(&self.game.join(rel_path), content);
    }

    /// Records `rel_path` as deployed from `source` in the manifest.
    pub fn record(&mut self, rel_path: &str, source: &str) {
        let manifest = self
            .state
            .manifests
            .get_mut("")
            .expect("default manifest");
        manifest.files.push(ManifestFile {
            rel_path: rel_path.to_string(),
            source: source.to_string(),
            target: None,
        });
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write file");
}

pub fn md5_of(content: &str) -> String {
    format!("{:x}", md5::compute(content))
}
