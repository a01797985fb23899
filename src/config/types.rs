//! Type definitions for the parsed installer descriptor.
//!
//! The tree mirrors the descriptor layout: a module has required installs,
//! an ordered list of pages (each with groups of options) and a list of
//! conditional installs. Parsers build it directly or deserialize it with
//! serde; the resolver only reads it.

use crate::{
    Dependency, EvalContext, EvaluationError, FlagSetting, GroupKind, PathEscapesRoot, RelPath,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// The type of an option, as resolved for the current run.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::OptionType;
///
/// let ty: OptionType = "NotUsable".parse().unwrap();
/// assert!(!ty.is_eligible());
/// assert!(OptionType::Required.is_forced());
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
)]
pub enum OptionType {
    /// Always selected; the user cannot deselect it.
    Required,
    /// Preferred default choice.
    Recommended,
    /// Ordinary choice.
    #[default]
    Optional,
    /// Selectable, but may not work.
    CouldBeUsable,
    /// Cannot be selected.
    NotUsable,
}

impl OptionType {
    /// Whether an option of this type may be selected.
    pub fn is_eligible(&self) -> bool {
        !matches!(self, Self::NotUsable)
    }

    /// Whether an option of this type is selected regardless of the caller.
    pub fn is_forced(&self) -> bool {
        matches!(self, Self::Required)
    }

    /// Whether an option of this type is picked ahead of others by defaults.
    pub fn is_preferred(&self) -> bool {
        matches!(self, Self::Required | Self::Recommended)
    }

    /// Iterator over all option types.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }
}

/// One `(dependency, type)` pair of a pattern-based type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePattern {
    /// Condition for this pattern.
    pub dependency: Dependency,
    /// Type when the condition holds.
    #[serde(rename = "type")]
    pub option_type: OptionType,
}

/// How an option's type is determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDescriptor {
    /// Fixed type.
    Static(OptionType),

    /// One of two types depending on a condition.
    Conditional {
        /// Condition evaluated against the flags at the time the group is resolved.
        condition: Dependency,
        /// Type when the condition holds.
        when_true: OptionType,
        /// Type otherwise.
        when_false: OptionType,
    },

    /// First matching pattern wins, else the default.
    Patterns {
        /// Patterns in descriptor order.
        patterns: Vec<TypePattern>,
        /// Type when no pattern matches.
        default: OptionType,
    },
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        Self::Static(OptionType::default())
    }
}

impl TypeDescriptor {
    /// Resolve the type against the current run state.
    pub fn resolve(&self, ctx: &EvalContext<'_>) -> Result<OptionType, EvaluationError> {
        match self {
            Self::Static(ty) => Ok(*ty),
            Self::Conditional {
                condition,
                when_true,
                when_false,
            } => Ok(if condition.evaluate(ctx)? {
                *when_true
            } else {
                *when_false
            }),
            Self::Patterns { patterns, default } => {
                for pattern in patterns {
                    if pattern.dependency.evaluate(ctx)? {
                        return Ok(pattern.option_type);
                    }
                }
                Ok(*default)
            }
        }
    }

    /// Every dependency this descriptor references, in order.
    pub(crate) fn dependencies(&self) -> Vec<&Dependency> {
        match self {
            Self::Static(_) => Vec::new(),
            Self::Conditional { condition, .. } => vec![condition],
            Self::Patterns { patterns, .. } => patterns.iter().map(|p| &p.dependency).collect(),
        }
    }
}

/// Whether a file install names a single file or a folder subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// A single file.
    #[default]
    File,
    /// A folder, installed recursively.
    Folder,
}

/// A `(source, destination)` install rule.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::FileInstall;
///
/// let plugin = FileInstall::file("Plugins/Interiors.esp").to("RelightingSkyrim_SSE.esp");
/// assert_eq!(plugin.destination_path().unwrap().as_str(), "RelightingSkyrim_SSE.esp");
///
/// let meshes = FileInstall::folder("meshes");
/// assert_eq!(meshes.destination_path().unwrap().as_str(), "meshes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInstall {
    /// Path relative to the package root. An empty folder source is the package root.
    pub source: String,
    /// Path relative to the install root; `None` mirrors the source path.
    #[serde(default)]
    pub destination: Option<String>,
    /// File or folder.
    #[serde(default)]
    pub kind: FileKind,
}

impl FileInstall {
    /// Single-file install mirroring its source path.
    pub fn file(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            kind: FileKind::File,
        }
    }

    /// Folder install mirroring its source path.
    pub fn folder(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            kind: FileKind::Folder,
        }
    }

    /// Set an explicit destination.
    pub fn to(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Canonical source path.
    pub fn source_path(&self) -> Result<RelPath, PathEscapesRoot> {
        RelPath::new(&self.source)
    }

    /// Canonical destination path.
    pub fn destination_path(&self) -> Result<RelPath, PathEscapesRoot> {
        RelPath::new(self.destination.as_deref().unwrap_or(&self.source))
    }
}

/// A leaf choice inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallOption {
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// How the option's type is determined.
    #[serde(default, rename = "type")]
    pub option_type: TypeDescriptor,
    /// Flags written when the option is selected.
    #[serde(default)]
    pub flags: Vec<FlagSetting>,
    /// Files installed when the option is selected.
    #[serde(default)]
    pub files: Vec<FileInstall>,
}

impl InstallOption {
    /// An `Optional` option with no flags or files.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            option_type: TypeDescriptor::default(),
            flags: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Replace the type descriptor.
    pub fn with_type(mut self, option_type: TypeDescriptor) -> Self {
        self.option_type = option_type;
        self
    }

    /// Add a flag assignment.
    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.push(FlagSetting::new(name, value));
        self
    }

    /// Add a file install.
    pub fn with_file(mut self, file: FileInstall) -> Self {
        self.files.push(file);
        self
    }
}

/// A named set of options with a selection mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Display name.
    pub name: String,
    /// Selection mode.
    #[serde(rename = "type")]
    pub kind: GroupKind,
    /// Visibility condition; `None` means always visible.
    #[serde(default)]
    pub visible: Option<Dependency>,
    /// Options in descriptor order.
    #[serde(default)]
    pub options: Vec<InstallOption>,
}

impl Group {
    /// A visible group.
    pub fn new(name: impl Into<String>, kind: GroupKind, options: Vec<InstallOption>) -> Self {
        Self {
            name: name.into(),
            kind,
            visible: None,
            options,
        }
    }
}

/// One step of the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Display name.
    pub name: String,
    /// Visibility condition over flags set by earlier pages.
    #[serde(default)]
    pub visible: Option<Dependency>,
    /// Groups in descriptor order.
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Page {
    /// A visible page.
    pub fn new(name: impl Into<String>, groups: Vec<Group>) -> Self {
        Self {
            name: name.into(),
            visible: None,
            groups,
        }
    }

    /// Set a visibility condition.
    pub fn visible_when(mut self, condition: Dependency) -> Self {
        self.visible = Some(condition);
        self
    }
}

/// Files installed when a dependency holds against the final flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalInstall {
    /// Condition.
    pub dependency: Dependency,
    /// Files installed when it holds.
    #[serde(default)]
    pub files: Vec<FileInstall>,
}

/// The parsed installer descriptor.
///
/// Immutable once built. Share it between concurrent runs behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module name.
    #[serde(default)]
    pub name: String,
    /// Files installed by every run.
    #[serde(default)]
    pub required_installs: Vec<FileInstall>,
    /// Wizard pages in order.
    #[serde(default)]
    pub pages: Vec<Page>,
    /// Flag-matched installs in descriptor order.
    #[serde(default)]
    pub conditional_installs: Vec<ConditionalInstall>,
}
