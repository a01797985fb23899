//! Canonical relative paths and the package file listing.
//!
//! Descriptors and archive listings disagree freely on separators and case
//! (`Data\Meshes\x.nif` vs `data/meshes/X.nif`), so every path is reduced to a
//! [`RelPath`] that keeps a display form and a lowercase comparison key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A raw path contained a `..` segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path '{0}' climbs out of its root")]
pub struct PathEscapesRoot(pub String);

/// A relative path in canonical form.
///
/// Backslashes become `/`, empty and `.` segments are dropped and `..` is
/// rejected. Two paths refer to the same location when their [`key`]s match.
///
/// [`key`]: RelPath::key
///
/// # Example
///
/// ```rust
/// use fomod_resolver::RelPath;
///
/// let a = RelPath::new(r"Data\Meshes\./Skeleton.NIF").unwrap();
/// let b = RelPath::new("data/meshes/skeleton.nif").unwrap();
/// assert_eq!(a.as_str(), "Data/Meshes/Skeleton.NIF");
/// assert_eq!(a.key(), b.key());
/// assert!(RelPath::new("../escape.esp").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath {
    // Field order matters: derived `Ord` sorts by key first.
    key: String,
    display: String,
}

impl RelPath {
    /// Canonicalize a raw relative path.
    pub fn new(raw: &str) -> Result<Self, PathEscapesRoot> {
        let mut segments = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment.trim() {
                "" | "." => {}
                ".." => return Err(PathEscapesRoot(raw.to_string())),
                _ => segments.push(segment),
            }
        }
        Ok(Self::from_segments(&segments))
    }

    /// The empty path, i.e. the root it is relative to.
    pub fn root() -> Self {
        Self {
            key: String::new(),
            display: String::new(),
        }
    }

    fn from_segments(segments: &[&str]) -> Self {
        let display = segments.join("/");
        Self {
            key: display.to_lowercase(),
            display,
        }
    }

    /// Whether this is the empty path.
    pub fn is_root(&self) -> bool {
        self.display.is_empty()
    }

    /// Display form with the original casing.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Case-insensitive comparison key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path segments in display casing.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.display.split('/').filter(|s| !s.is_empty())
    }

    /// Whether the first segment equals `name`, ignoring case.
    pub fn starts_with_segment(&self, name: &str) -> bool {
        match self.segments().next() {
            Some(first) => first.to_lowercase() == name.to_lowercase(),
            None => false,
        }
    }

    /// The last segment as a single-segment path.
    pub fn file_name(&self) -> Option<RelPath> {
        self.segments().last().map(|name| Self::from_segments(&[name]))
    }

    /// Append `other` below this path.
    pub fn join(&self, other: &RelPath) -> RelPath {
        let segments: Vec<&str> = self.segments().chain(other.segments()).collect();
        Self::from_segments(&segments)
    }

    /// The remainder of this path below `prefix`, compared case-insensitively.
    ///
    /// Returns `None` when this path is not strictly inside `prefix`.
    pub fn strip_prefix(&self, prefix: &RelPath) -> Option<RelPath> {
        let own: Vec<&str> = self.segments().collect();
        let lead: Vec<&str> = prefix.segments().collect();
        if own.len() <= lead.len() {
            return None;
        }
        let matches = own
            .iter()
            .zip(&lead)
            .all(|(a, b)| a.to_lowercase() == b.to_lowercase());
        matches.then(|| Self::from_segments(&own[lead.len()..]))
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl TryFrom<String> for RelPath {
    type Error = PathEscapesRoot;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(&raw)
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.display
    }
}

/// The files contained in a mod package.
///
/// Built from an archive listing supplied by the caller. Lookups ignore case;
/// the listing's own casing is kept for output. Iteration is in key order.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{AvailableFiles, RelPath};
///
/// let files: AvailableFiles = ["Data/SKSE/Plugins/X.dll", "fomod/ModuleConfig.xml"]
///     .into_iter()
///     .collect();
/// assert!(files.contains(&RelPath::new("data/skse").unwrap()));
/// assert!(files.contains_file(&RelPath::new("DATA/SKSE/PLUGINS/x.dll").unwrap()));
/// assert_eq!(files.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct AvailableFiles {
    files: BTreeMap<String, RelPath>,
}

impl AvailableFiles {
    /// An empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a listing, dropping paths that cannot be canonicalized.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut files = Self::new();
        for raw in paths {
            if let Err(e) = files.insert(raw.as_ref()) {
                tracing::warn!("skipping listing entry: {}", e);
            }
        }
        files
    }

    /// Add a file. Returns `false` if a path with the same key was already present,
    /// in which case the first casing is kept.
    pub fn insert(&mut self, raw: &str) -> Result<bool, PathEscapesRoot> {
        let path = RelPath::new(raw)?;
        if path.is_root() || self.files.contains_key(path.key()) {
            return Ok(false);
        }
        self.files.insert(path.key().to_string(), path);
        Ok(true)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All files in key order.
    pub fn iter(&self) -> impl Iterator<Item = &RelPath> {
        self.files.values()
    }

    /// The listed file matching `path`, in the listing's casing.
    pub fn get(&self, path: &RelPath) -> Option<&RelPath> {
        self.files.get(path.key())
    }

    /// Whether `path` is a listed file.
    pub fn contains_file(&self, path: &RelPath) -> bool {
        self.files.contains_key(path.key())
    }

    /// Whether `path` is a listed file or a folder containing at least one file.
    pub fn contains(&self, path: &RelPath) -> bool {
        if path.is_root() {
            return !self.is_empty();
        }
        self.contains_file(path) || self.files_under(path).next().is_some()
    }

    /// Every file strictly inside `folder`, paired with its path relative to `folder`.
    pub fn files_under<'a>(
        &'a self,
        folder: &'a RelPath,
    ) -> impl Iterator<Item = (&'a RelPath, RelPath)> + 'a {
        let prefix = if folder.is_root() {
            String::new()
        } else {
            format!("{}/", folder.key())
        };
        self.files
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .filter_map(move |(_, file)| {
                if folder.is_root() {
                    Some((file, file.clone()))
                } else {
                    file.strip_prefix(folder).map(|rest| (file, rest))
                }
            })
    }
}

impl<S: AsRef<str>> FromIterator<S> for AvailableFiles {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_paths(iter)
    }
}

impl From<Vec<String>> for AvailableFiles {
    fn from(paths: Vec<String>) -> Self {
        Self::from_paths(paths)
    }
}

impl From<AvailableFiles> for Vec<String> {
    fn from(files: AvailableFiles) -> Self {
        files.files.into_values().map(String::from).collect()
    }
}
