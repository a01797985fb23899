//! The manifest builder.
//!
//! Merges the three kinds of file installs into one list keyed by
//! destination:
//!
//! 1. required installs,
//! 2. installs of the options the wizard selected,
//! 3. conditional installs whose dependency holds against the final flags.
//!
//! Folder installs are expanded against the package listing. When two
//! installs target the same destination the one with higher precedence wins
//! (conditional > option-bound > required); at equal precedence the later one
//! wins. The result is sorted by destination, so it depends only on the
//! inputs and never on the order in which they were walked.

use crate::{
    AvailableFiles, ConfigError, EvalContext, FileInstall, FileKind, ModuleConfig, RelPath,
    Resolution, ResolveOptions,
};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

/// Where a manifest entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// A required install of the module.
    Required,
    /// An install of a selected option.
    OptionBound {
        /// Page index of the option.
        page: usize,
        /// Group index of the option.
        group: usize,
        /// Option index.
        option: usize,
    },
    /// A conditional install whose dependency held.
    Conditional {
        /// Index of the conditional install in the descriptor.
        pattern: usize,
    },
}

impl Provenance {
    /// Override rank; higher replaces lower at the same destination.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Required => 0,
            Self::OptionBound { .. } => 1,
            Self::Conditional { .. } => 2,
        }
    }
}

/// One resolved file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// File in the package, in the listing's casing.
    pub source: RelPath,
    /// Target relative to the install root.
    pub destination: RelPath,
    /// Which install produced it.
    pub provenance: Provenance,
}

/// The resolved, deduplicated file list, sorted by destination.
///
/// Serialized as a plain list of entries. Deserializing applies the same
/// override rules as building, in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ManifestEntry>", into = "Vec<ManifestEntry>")]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest from entries in insertion order, applying the
    /// override rules.
    pub(crate) fn from_entries(entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        let mut slots: BTreeMap<String, ManifestEntry> = BTreeMap::new();
        for entry in entries {
            match slots.entry(entry.destination.key().to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get();
                    if entry.provenance.precedence() < current.provenance.precedence() {
                        tracing::trace!(
                            destination = %entry.destination,
                            source = %entry.source,
                            "lower-precedence install ignored"
                        );
                        continue;
                    }
                    tracing::debug!(
                        destination = %current.destination,
                        replaced = %current.source,
                        by = %entry.source,
                        "destination overridden"
                    );
                    // The first-seen destination casing is kept for display.
                    let destination = current.destination.clone();
                    slot.insert(ManifestEntry {
                        destination,
                        ..entry
                    });
                }
            }
        }
        Self {
            entries: slots.into_values().collect(),
        }
    }

    /// All entries, sorted by destination.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing gets installed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry installed at `destination`, compared case-insensitively.
    pub fn get(&self, destination: &RelPath) -> Option<&ManifestEntry> {
        self.entries
            .binary_search_by(|e| e.destination.key().cmp(destination.key()))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Destinations in order.
    pub fn destinations(&self) -> impl Iterator<Item = &RelPath> {
        self.entries.iter().map(|e| &e.destination)
    }
}

impl From<Vec<ManifestEntry>> for Manifest {
    fn from(entries: Vec<ManifestEntry>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<Manifest> for Vec<ManifestEntry> {
    fn from(manifest: Manifest) -> Self {
        manifest.entries
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

struct Candidate<'c> {
    file: &'c FileInstall,
    provenance: Provenance,
    location: String,
}

/// Build the manifest for a completed run.
///
/// Pure and idempotent: identical inputs give identical manifests. Files the
/// descriptor names but the package lacks are left out.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{
///     build, resolve, AvailableFiles, FileInstall, ModuleConfig, RelPath, ResolveOptions,
///     Selections,
/// };
///
/// let config = ModuleConfig {
///     required_installs: vec![FileInstall::folder("Core").to("")],
///     ..Default::default()
/// };
/// let files: AvailableFiles = ["Core/Plugin.esp", "Core/meshes/a.nif"].into_iter().collect();
/// let options = ResolveOptions::default();
///
/// let resolution = resolve(&config, &files, &Selections::new(), &options).unwrap();
/// let manifest = build(&config, &resolution, &files, &options).unwrap();
///
/// let plugin = manifest.get(&RelPath::new("plugin.esp").unwrap()).unwrap();
/// assert_eq!(plugin.source.as_str(), "Core/Plugin.esp");
/// assert_eq!(manifest.len(), 2);
/// ```
pub fn build(
    config: &ModuleConfig,
    resolution: &Resolution,
    files: &AvailableFiles,
    options: &ResolveOptions,
) -> Result<Manifest, ConfigError> {
    let mut candidates: Vec<Candidate<'_>> = Vec::new();

    for (i, file) in config.required_installs.iter().enumerate() {
        candidates.push(Candidate {
            file,
            provenance: Provenance::Required,
            location: format!("required_installs[{i}]"),
        });
    }

    for install in &resolution.active {
        candidates.push(Candidate {
            file: &install.file,
            provenance: Provenance::OptionBound {
                page: install.page,
                group: install.group,
                option: install.option,
            },
            location: format!(
                "pages[{}].groups[{}].options[{}].files",
                install.page, install.group, install.option
            ),
        });
    }

    let covered: HashSet<&FileInstall> = candidates.iter().map(|c| c.file).collect();
    let ctx = EvalContext::with_options(&resolution.flags, files, options);
    for (c, conditional) in config.conditional_installs.iter().enumerate() {
        let holds = conditional.dependency.evaluate(&ctx).map_err(|e| {
            ConfigError::malformed(format!("conditional_installs[{c}].dependency"), e)
        })?;
        if !holds {
            tracing::trace!(pattern = c, "conditional install does not match");
            continue;
        }
        for (i, file) in conditional.files.iter().enumerate() {
            if covered.contains(file) {
                continue;
            }
            candidates.push(Candidate {
                file,
                provenance: Provenance::Conditional { pattern: c },
                location: format!("conditional_installs[{c}].files[{i}]"),
            });
        }
    }

    let mut entries = Vec::new();
    for candidate in &candidates {
        for (source, destination) in expand(candidate, files, options)? {
            entries.push(ManifestEntry {
                source,
                destination,
                provenance: candidate.provenance,
            });
        }
    }

    let manifest = Manifest::from_entries(entries);
    tracing::debug!(
        module = %config.name,
        candidates = candidates.len(),
        entries = manifest.len(),
        "manifest built"
    );
    Ok(manifest)
}

/// Concrete `(source, destination)` pairs for one install.
fn expand(
    candidate: &Candidate<'_>,
    files: &AvailableFiles,
    options: &ResolveOptions,
) -> Result<Vec<(RelPath, RelPath)>, ConfigError> {
    let file = candidate.file;
    let source = file.source_path().map_err(|e| ConfigError::InvalidPath {
        location: format!("{}.source", candidate.location),
        path: e.0,
    })?;
    let destination = file.destination_path().map_err(|e| ConfigError::InvalidPath {
        location: format!("{}.destination", candidate.location),
        path: e.0,
    })?;

    match file.kind {
        FileKind::File => {
            let Some(listed) = files.get(&source) else {
                tracing::debug!(source = %source, "file not in package, skipped");
                return Ok(Vec::new());
            };
            // An empty file destination installs under the file's own name.
            let destination = match destination.is_root() {
                true => listed.file_name().unwrap_or_else(RelPath::root),
                false => destination,
            };
            Ok(vec![(listed.clone(), destination)])
        }
        FileKind::Folder => {
            let pairs: Vec<(RelPath, RelPath)> = files
                .files_under(&source)
                .filter(|(listed, _)| {
                    !(source.is_root() && listed.starts_with_segment(&options.metadata_dir))
                })
                .map(|(listed, rest)| (listed.clone(), destination.join(&rest)))
                .collect();
            if pairs.is_empty() {
                tracing::debug!(source = %source, "folder not in package, skipped");
            }
            Ok(pairs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActiveInstall, ConditionalInstall, Dependency, FlagSet};

    fn path(raw: &str) -> RelPath {
        RelPath::new(raw).unwrap()
    }

    fn chosen(option: usize, file: FileInstall) -> ActiveInstall {
        ActiveInstall {
            page: 0,
            group: 0,
            option,
            file,
        }
    }

    fn sources(manifest: &Manifest) -> Vec<(&str, &str)> {
        manifest
            .iter()
            .map(|e| (e.destination.as_str(), e.source.as_str()))
            .collect()
    }

    #[test]
    fn test_required_files_mirror_sources() {
        let config = ModuleConfig {
            required_installs: vec![
                FileInstall::file("Data/SKSE/Plugins/X.dll"),
                FileInstall::file("Data/SKSE/Plugins/X.pdb"),
            ],
            ..Default::default()
        };
        let files: AvailableFiles = ["Data/SKSE/Plugins/X.dll", "Data/SKSE/Plugins/X.pdb"]
            .into_iter()
            .collect();
        let manifest = build(&config, &Resolution::default(), &files, &ResolveOptions::default())
            .unwrap();
        assert_eq!(
            sources(&manifest),
            vec![
                ("Data/SKSE/Plugins/X.dll", "Data/SKSE/Plugins/X.dll"),
                ("Data/SKSE/Plugins/X.pdb", "Data/SKSE/Plugins/X.pdb"),
            ]
        );
        assert!(manifest.iter().all(|e| e.provenance == Provenance::Required));
    }

    #[test]
    fn test_missing_files_are_excluded() {
        let config = ModuleConfig {
            required_installs: vec![
                FileInstall::file("present.esp"),
                FileInstall::file("absent.esp"),
                FileInstall::folder("NoSuchFolder"),
            ],
            ..Default::default()
        };
        let files: AvailableFiles = ["Present.esp"].into_iter().collect();
        let manifest = build(&config, &Resolution::default(), &files, &ResolveOptions::default())
            .unwrap();
        assert_eq!(sources(&manifest), vec![("present.esp", "Present.esp")]);
    }

    #[test]
    fn test_folder_expansion_and_root_folder() {
        let config = ModuleConfig {
            required_installs: vec![FileInstall::folder("00 Core").to("Data")],
            ..Default::default()
        };
        let files: AvailableFiles = ["00 Core/Plugin.esp", "00 Core/meshes/a.nif", "01 Extra/b.esp"]
            .into_iter()
            .collect();
        let manifest = build(&config, &Resolution::default(), &files, &ResolveOptions::default())
            .unwrap();
        let destinations: Vec<&str> = manifest.destinations().map(RelPath::as_str).collect();
        assert_eq!(destinations, vec!["Data/meshes/a.nif", "Data/Plugin.esp"]);

        let whole = ModuleConfig {
            required_installs: vec![FileInstall::folder("")],
            ..Default::default()
        };
        let files: AvailableFiles = ["fomod/ModuleConfig.xml", "Textures/x.dds"]
            .into_iter()
            .collect();
        let manifest = build(&whole, &Resolution::default(), &files, &ResolveOptions::default())
            .unwrap();
        assert_eq!(sources(&manifest), vec![("Textures/x.dds", "Textures/x.dds")]);
    }

    #[test]
    fn test_empty_file_destination_uses_file_name() {
        let config = ModuleConfig {
            required_installs: vec![FileInstall::file("Optional/Patch.esp").to("")],
            ..Default::default()
        };
        let files: AvailableFiles = ["Optional/Patch.esp"].into_iter().collect();
        let manifest = build(&config, &Resolution::default(), &files, &ResolveOptions::default())
            .unwrap();
        assert_eq!(sources(&manifest), vec![("Patch.esp", "Optional/Patch.esp")]);
    }

    #[test]
    fn test_precedence_conditional_over_option_over_required() {
        let config = ModuleConfig {
            required_installs: vec![FileInstall::file("base/Plugin.esp").to("Plugin.esp")],
            conditional_installs: vec![ConditionalInstall {
                dependency: Dependency::flag("patched", "yes"),
                files: vec![FileInstall::file("patched/Plugin.esp").to("plugin.ESP")],
            }],
            ..Default::default()
        };
        let files: AvailableFiles = ["base/Plugin.esp", "option/Plugin.esp", "patched/Plugin.esp"]
            .into_iter()
            .collect();
        let mut resolution = Resolution {
            active: vec![chosen(0, FileInstall::file("option/Plugin.esp").to("Plugin.esp"))],
            ..Default::default()
        };
        let options = ResolveOptions::default();

        let manifest = build(&config, &resolution, &files, &options).unwrap();
        assert_eq!(sources(&manifest), vec![("Plugin.esp", "option/Plugin.esp")]);

        resolution.flags = [("patched", "yes")].into_iter().collect();
        let manifest = build(&config, &resolution, &files, &options).unwrap();
        assert_eq!(manifest.len(), 1);
        let entry = &manifest.entries()[0];
        assert_eq!(entry.source.as_str(), "patched/Plugin.esp");
        assert_eq!(entry.destination.as_str(), "Plugin.esp");
        assert_eq!(entry.provenance, Provenance::Conditional { pattern: 0 });
    }

    #[test]
    fn test_equal_precedence_later_wins() {
        let config = ModuleConfig::default();
        let files: AvailableFiles = ["a/x.esp", "b/x.esp"].into_iter().collect();
        let resolution = Resolution {
            active: vec![
                chosen(0, FileInstall::file("a/x.esp").to("x.esp")),
                chosen(1, FileInstall::file("b/x.esp").to("x.esp")),
            ],
            ..Default::default()
        };
        let manifest = build(&config, &resolution, &files, &ResolveOptions::default()).unwrap();
        assert_eq!(sources(&manifest), vec![("x.esp", "b/x.esp")]);
    }

    #[test]
    fn test_conditional_duplicate_of_required_is_skipped() {
        let shared = FileInstall::file("core.esp");
        let config = ModuleConfig {
            required_installs: vec![shared.clone()],
            conditional_installs: vec![ConditionalInstall {
                dependency: Dependency::flag("unset", ""),
                files: vec![shared],
            }],
            ..Default::default()
        };
        let files: AvailableFiles = ["core.esp"].into_iter().collect();
        let manifest = build(&config, &Resolution::default(), &files, &ResolveOptions::default())
            .unwrap();
        assert_eq!(manifest.entries()[0].provenance, Provenance::Required);
    }

    #[test]
    fn test_flag_gated_variants_share_one_destination() {
        let config = ModuleConfig {
            conditional_installs: vec![
                ConditionalInstall {
                    dependency: Dependency::flag("ussep", "on"),
                    files: vec![FileInstall::file("ussep/Interiors.esp").to("Interiors.esp")],
                },
                ConditionalInstall {
                    dependency: Dependency::not(Dependency::flag("ussep", "on")),
                    files: vec![FileInstall::file("plain/Interiors.esp").to("Interiors.esp")],
                },
            ],
            ..Default::default()
        };
        let files: AvailableFiles = ["ussep/Interiors.esp", "plain/Interiors.esp"]
            .into_iter()
            .collect();
        let options = ResolveOptions::default();

        let off = build(&config, &Resolution::default(), &files, &options).unwrap();
        assert_eq!(sources(&off), vec![("Interiors.esp", "plain/Interiors.esp")]);

        let on = Resolution {
            flags: [("ussep", "on")].into_iter().collect::<FlagSet>(),
            ..Default::default()
        };
        let on = build(&config, &on, &files, &options).unwrap();
        assert_eq!(sources(&on), vec![("Interiors.esp", "ussep/Interiors.esp")]);
    }

    #[test]
    fn test_malformed_conditional_fails_whole_build() {
        let config = ModuleConfig {
            required_installs: vec![FileInstall::file("a.esp")],
            conditional_installs: vec![ConditionalInstall {
                dependency: Dependency::or(vec![]),
                files: vec![],
            }],
            ..Default::default()
        };
        let files: AvailableFiles = ["a.esp"].into_iter().collect();
        let err = build(&config, &Resolution::default(), &files, &ResolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedDependency { .. }));
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = ModuleConfig {
            required_installs: vec![FileInstall::folder("")],
            ..Default::default()
        };
        let files: AvailableFiles = ["z.esp", "B/c.nif", "a.esp", "b/A.nif"].into_iter().collect();
        let options = ResolveOptions::default();
        let first = build(&config, &Resolution::default(), &files, &options).unwrap();
        let second = build(&config, &Resolution::default(), &files, &options).unwrap();
        assert_eq!(first, second);
        let keys: Vec<&str> = first.iter().map(|e| e.destination.key()).collect();
        assert_eq!(keys, vec!["a.esp", "b/a.nif", "b/c.nif", "z.esp"]);
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let manifest = Manifest::from_entries([ManifestEntry {
            source: path("src/X.esp"),
            destination: path("Data/X.esp"),
            provenance: Provenance::Required,
        }]);
        assert!(manifest.get(&path("data/x.ESP")).is_some());
        assert!(manifest.get(&path("data/y.esp")).is_none());
    }

    #[test]
    fn test_manifest_serializes_as_list() {
        let manifest = Manifest::from_entries([ManifestEntry {
            source: path("a.esp"),
            destination: path("a.esp"),
            provenance: Provenance::OptionBound {
                page: 1,
                group: 0,
                option: 2,
            },
        }]);
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "source": "a.esp",
                "destination": "a.esp",
                "provenance": { "kind": "option_bound", "page": 1, "group": 0, "option": 2 }
            }])
        );
    }

    #[test]
    fn test_deserialize_sorts_and_merges_entries() {
        let json = serde_json::json!([
            { "source": "z.esp", "destination": "z.esp", "provenance": { "kind": "required" } },
            { "source": "a.esp", "destination": "a.esp", "provenance": { "kind": "required" } },
            {
                "source": "patch/a.esp",
                "destination": "A.esp",
                "provenance": { "kind": "conditional", "pattern": 0 }
            },
            {
                "source": "late/a.esp",
                "destination": "a.esp",
                "provenance": { "kind": "required" }
            }
        ]);
        let manifest: Manifest = serde_json::from_value(json).unwrap();

        assert_eq!(sources(&manifest), vec![("a.esp", "patch/a.esp"), ("z.esp", "z.esp")]);
        assert!(manifest.get(&path("z.esp")).is_some());

        let reloaded: Manifest =
            serde_json::from_value(serde_json::to_value(&manifest).unwrap()).unwrap();
        assert_eq!(reloaded, manifest);
    }
}
