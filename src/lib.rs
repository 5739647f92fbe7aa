//! ModReport Core Library
//!
//! Diagnostic reports for mods installed by a mod manager: which of a mod's
//! files are deployed, which were overwritten by other mods, their checksums,
//! and where the mod's game plugins sit in the load order.
//!
//! # Architecture
//!
//! The mod manager host owns all durable state. It hands this library a
//! [`HostState`] snapshot (mods, downloads, deploy targets, deployment
//! manifests, load order) either directly from Rust or as JSON through the
//! C ABI in [`ffi`]. Nothing is read from or written back to the host's state.
//!
//! # Pipeline
//!
//! ## Collection (`walker`, `hasher`, `limiter`)
//! - `walk_directory()` / `list_directory()` - Recursive listing of a mod's staging folder
//! - `hash_file()` - Streaming MD5 digest of a deployed file
//! - `ConcurrencyLimiter` - Bounded, FIFO admission with retry on descriptor exhaustion
//!
//! ## Analysis (`manifest`, `files`, `plugins`)
//! - `ManifestLookup` - Case-insensitive view of the deployment manifest
//! - `build_file_report()` - Deployment, ownership and checksum per file
//! - `build_plugin_report()` - Plugin load state for Gamebryo/Creation games
//!
//! ## Output (`report`, `format`, `operations`)
//! - `ReportGenerator` - Assembles a [`ModReport`] for a mod id
//! - `render_text()` / `to_json()` - Human readable and raw renderings
//! - `save_report()` - Timestamped export to a directory

pub mod config;
pub mod error;
pub mod ffi;
pub mod files;
pub mod format;
pub mod hasher;
pub mod limiter;
pub mod manifest;
pub mod model;
pub mod operations;
pub mod plugins;
pub mod report;
pub mod walker;

pub use config::{ReportConfig, RetryPolicy};
pub use error::{HashError, ListError, ReportError, ReportResult};
pub use limiter::ConcurrencyLimiter;
pub use model::{
    DeploymentManifest, DownloadInfo, FileCategory, FileEntry, HostState, LoadOrderEntry,
    ManifestFile, ModAttributes, ModInfo, ModReport, PluginEntry, PluginState,
};
pub use report::{DigestMode, DigestPrompt, ReportGenerator};
