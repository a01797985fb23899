//! Execution modes and target planning.
//!
//! A [`Manifest`] says which package file lands at which relative
//! destination. How that destination is rooted depends on the
//! [`ExecutionMode`]: extraction lays files out in a staging area exactly as
//! resolved, installation places them below the game's install root.

use crate::{
    resolve_manifest, AvailableFiles, Manifest, ManifestEntry, ModuleConfig, Provenance, RelPath,
    ResolveError, ResolveOptions, Selections,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Where resolved files are sent.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::ExecutionMode;
///
/// for mode in ExecutionMode::all() {
///     println!("{mode}");
/// }
/// assert_eq!("install".parse::<ExecutionMode>().unwrap(), ExecutionMode::Install);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionMode {
    /// Copy into a staging area using manifest destinations as is.
    Extract,
    /// Place below the install root of the game directory.
    Install,
}

impl ExecutionMode {
    /// Returns all execution modes.
    pub fn all() -> impl Iterator<Item = ExecutionMode> {
        Self::iter()
    }
}

/// A concrete file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    /// File in the package.
    pub source: RelPath,
    /// Destination relative to the staging area or game directory.
    pub destination: RelPath,
    /// Mode the destination was computed for.
    pub mode: ExecutionMode,
}

/// Map manifest entries to targets for `mode`.
///
/// In [`ExecutionMode::Install`] every destination is placed below
/// [`ResolveOptions::install_root`] unless it already starts there. Targets
/// are unique by destination and sorted by it. When prefixing makes two
/// entries collide, the higher [`Provenance::precedence`] wins and the later
/// entry wins a tie.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{fallback_manifest, resolve_targets, AvailableFiles, ExecutionMode, ResolveOptions};
///
/// let files: AvailableFiles = ["some_plugin.esp", "Data/textures/a.dds"].into_iter().collect();
/// let options = ResolveOptions::default();
/// let manifest = fallback_manifest(&files, &options);
///
/// let targets = resolve_targets(&manifest, ExecutionMode::Install, &options);
/// let destinations: Vec<&str> = targets.iter().map(|t| t.destination.as_str()).collect();
/// assert_eq!(destinations, vec!["Data/some_plugin.esp", "Data/textures/a.dds"]);
/// ```
pub fn resolve_targets(
    manifest: &Manifest,
    mode: ExecutionMode,
    options: &ResolveOptions,
) -> Vec<ResolvedTarget> {
    let root = match mode {
        ExecutionMode::Extract => RelPath::root(),
        ExecutionMode::Install => install_root(options),
    };

    // Prefixing can fold distinct destinations together; settle those with
    // the manifest's own override rules.
    let rooted = Manifest::from_entries(manifest.iter().map(|entry| ManifestEntry {
        destination: if is_under(&entry.destination, &root) {
            entry.destination.clone()
        } else {
            root.join(&entry.destination)
        },
        ..entry.clone()
    }));
    if rooted.len() < manifest.len() {
        tracing::debug!(
            entries = manifest.len(),
            targets = rooted.len(),
            "destinations merged below install root"
        );
    }

    rooted
        .iter()
        .map(|entry| ResolvedTarget {
            source: entry.source.clone(),
            destination: entry.destination.clone(),
            mode,
        })
        .collect()
}

fn install_root(options: &ResolveOptions) -> RelPath {
    match RelPath::new(&options.install_root) {
        Ok(root) => root,
        Err(e) => {
            tracing::warn!("ignoring install root: {}", e);
            RelPath::root()
        }
    }
}

/// Whether `path` already lies at or below `root`.
fn is_under(path: &RelPath, root: &RelPath) -> bool {
    root.is_root()
        || path.key() == root.key()
        || path
            .key()
            .strip_prefix(root.key())
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Pass-through manifest for packages without a descriptor.
///
/// Every listed file maps to itself, except those inside the metadata folder
/// ([`ResolveOptions::metadata_dir`]).
pub fn fallback_manifest(files: &AvailableFiles, options: &ResolveOptions) -> Manifest {
    mirror(
        files
            .iter()
            .filter(|file| !file.starts_with_segment(&options.metadata_dir)),
    )
}

fn mirror<'a>(files: impl Iterator<Item = &'a RelPath>) -> Manifest {
    Manifest::from_entries(files.map(|file| ManifestEntry {
        source: file.clone(),
        destination: file.clone(),
        provenance: Provenance::Required,
    }))
}

/// A mod package: its file listing and, if it has one, the parsed descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    /// Parsed descriptor.
    pub config: Option<ModuleConfig>,
    /// Files in the package.
    pub files: AvailableFiles,
}

impl Package {
    /// A package without a descriptor.
    pub fn new(files: AvailableFiles) -> Self {
        Self {
            config: None,
            files,
        }
    }

    /// Attach a descriptor.
    pub fn with_config(mut self, config: ModuleConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Compute the file operations for a package.
///
/// With a descriptor the wizard runs over `selections` and the resulting
/// manifest is mapped to targets. Without one, installation uses
/// [`fallback_manifest`] and extraction mirrors the whole listing, metadata
/// folder included.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{plan, AvailableFiles, ExecutionMode, Package, ResolveOptions, Selections};
///
/// let package = Package::new(
///     ["fomod/no_module_conf.txt", "some_plugin.esp"].into_iter().collect::<AvailableFiles>(),
/// );
/// let options = ResolveOptions::default();
///
/// let staged = plan(&package, &Selections::new(), ExecutionMode::Extract, &options).unwrap();
/// assert_eq!(staged.len(), 2);
///
/// let installed = plan(&package, &Selections::new(), ExecutionMode::Install, &options).unwrap();
/// assert_eq!(installed.len(), 1);
/// assert_eq!(installed[0].destination.as_str(), "Data/some_plugin.esp");
/// ```
pub fn plan(
    package: &Package,
    selections: &Selections,
    mode: ExecutionMode,
    options: &ResolveOptions,
) -> Result<Vec<ResolvedTarget>, ResolveError> {
    let manifest = match (&package.config, mode) {
        (Some(config), _) => resolve_manifest(config, &package.files, selections, options)?,
        (None, ExecutionMode::Install) => {
            tracing::debug!(files = package.files.len(), "no descriptor, installing listing");
            fallback_manifest(&package.files, options)
        }
        (None, ExecutionMode::Extract) => {
            tracing::debug!(files = package.files.len(), "no descriptor, extracting listing");
            mirror(package.files.iter())
        }
    };
    if package.config.is_none() && !selections.is_empty() {
        tracing::warn!("selections ignored for a package without a descriptor");
    }
    Ok(resolve_targets(&manifest, mode, options))
}
