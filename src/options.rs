//! Resolution options configuration.
//!
//! This module provides the [`ResolveOptions`] struct for configuring how
//! descriptors are evaluated and where resolved files land.

use semver::Version;
use serde::{Deserialize, Serialize};

/// Name of the folder holding the installer descriptor inside a package.
pub const DEFAULT_METADATA_DIR: &str = "fomod";

/// Folder under the game directory that receives installed content.
pub const DEFAULT_INSTALL_ROOT: &str = "Data";

/// Configuration options for a resolution run.
///
/// # Default Behavior
///
/// No versions are known, so version predicates in descriptors always hold.
/// Installed files go below `Data`, and the `fomod` folder is treated as
/// package metadata.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::ResolveOptions;
/// use semver::Version;
///
/// // Defaults: no version checks, install below "Data"
/// let opts = ResolveOptions::default();
/// assert_eq!(opts.install_root, "Data");
///
/// // Check game-version requirements against an installed game
/// let opts = ResolveOptions {
///     game_version: Some(Version::new(1, 6, 640)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Installed game version used by game-version predicates.
    ///
    /// When `None`, those predicates evaluate to `true`.
    ///
    /// Default: `None`
    pub game_version: Option<Version>,

    /// Mod manager version used by mod-manager-version predicates.
    ///
    /// When `None`, those predicates evaluate to `true`.
    ///
    /// Default: `None`
    pub mod_manager_version: Option<Version>,

    /// Folder, relative to the game directory, that install targets go below.
    ///
    /// Destinations whose first segment already names this folder are not
    /// prefixed again. An empty string disables prefixing.
    ///
    /// Default: `"Data"`
    pub install_root: String,

    /// Package folder holding installer metadata.
    ///
    /// Never installed by the no-descriptor fallback and skipped when a
    /// descriptor installs the whole package root.
    ///
    /// Default: `"fomod"`
    pub metadata_dir: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            game_version: None,
            mod_manager_version: None,
            install_root: DEFAULT_INSTALL_ROOT.to_string(),
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
        }
    }
}
