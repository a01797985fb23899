//! Error types for resolution operations.
//!
//! Every variant names the location that caused it (page/group/option
//! indices or a dotted path into the descriptor) and every error type offers
//! a `fix_suggestion()` with an actionable hint for the caller.

use crate::GroupKind;
use thiserror::Error;

/// Structural failure inside a dependency expression.
///
/// Only malformed structure is an error. Predicate kinds the evaluator does
/// not recognize evaluate to `true` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    /// An `and`/`or` composite with no children.
    #[error("'{operator}' composite at '{path}' has no children")]
    EmptyComposite {
        /// The composite operator (`and` or `or`).
        operator: &'static str,
        /// Path of the composite inside its expression, e.g. `and[1].or`.
        path: String,
    },
}

/// The descriptor is malformed or inconsistent.
///
/// Config errors are fatal: resolution aborts before (or at the point where)
/// the broken part of the descriptor is first referenced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A group whose mode requires a selection has no options at all.
    #[error("group '{name}' (page {page}, group {group}) is {kind} but has no options")]
    EmptyGroup {
        /// Page index.
        page: usize,
        /// Group index within the page.
        group: usize,
        /// Group name from the descriptor.
        name: String,
        /// The group's selection mode.
        kind: GroupKind,
    },

    /// Every option of a group that requires a selection resolved to `NotUsable`.
    #[error("group '{name}' (page {page}, group {group}) is {kind} but no option is usable")]
    NoEligibleOption {
        /// Page index.
        page: usize,
        /// Group index within the page.
        group: usize,
        /// Group name from the descriptor.
        name: String,
        /// The group's selection mode.
        kind: GroupKind,
    },

    /// A single-select group has more than one option typed `Required`.
    #[error(
        "group '{name}' (page {page}, group {group}) is {kind} but has {required} required options"
    )]
    ConflictingRequired {
        /// Page index.
        page: usize,
        /// Group index within the page.
        group: usize,
        /// Group name from the descriptor.
        name: String,
        /// The group's selection mode.
        kind: GroupKind,
        /// Number of options typed `Required`.
        required: usize,
    },

    /// A source or destination path climbs out of its root with `..`.
    #[error("invalid path '{path}' at {location}")]
    InvalidPath {
        /// Dotted location of the file install inside the descriptor.
        location: String,
        /// The offending raw path.
        path: String,
    },

    /// A dependency expression is structurally malformed.
    #[error("malformed dependency at {location}: {source}")]
    MalformedDependency {
        /// Dotted location of the expression inside the descriptor.
        location: String,
        /// The underlying structural failure.
        #[source]
        source: EvaluationError,
    },
}

impl ConfigError {
    /// Get an actionable suggestion for fixing this error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fomod_resolver::ConfigError;
    ///
    /// let error = ConfigError::InvalidPath {
    ///     location: "required_installs[0].source".to_string(),
    ///     path: "../outside.esp".to_string(),
    /// };
    /// assert!(error.fix_suggestion().contains("package root"));
    /// ```
    pub fn fix_suggestion(&self) -> &'static str {
        match self {
            Self::EmptyGroup { .. } => "Add at least one option to the group or change its mode",
            Self::NoEligibleOption { .. } => {
                "Check the option type conditions; at least one option must stay usable"
            }
            Self::ConflictingRequired { .. } => {
                "Mark at most one option of a single-select group as Required"
            }
            Self::InvalidPath { .. } => "Use paths relative to the package root without '..'",
            Self::MalformedDependency { .. } => {
                "Give every 'and'/'or' dependency at least one child"
            }
        }
    }

    pub(crate) fn malformed(location: impl Into<String>, source: EvaluationError) -> Self {
        Self::MalformedDependency {
            location: location.into(),
            source,
        }
    }
}

/// A caller-supplied selection is invalid.
///
/// The run that produced it is aborted; no partial flag set is exposed.
/// Callers restart resolution with corrected selections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SelectionError {
    /// The selection names a page the descriptor does not have.
    #[error("unknown page {page}")]
    UnknownPage {
        /// Requested page index.
        page: usize,
    },

    /// The selection names a group the page does not have.
    #[error("unknown group {group} on page {page}")]
    UnknownGroup {
        /// Page index.
        page: usize,
        /// Requested group index.
        group: usize,
    },

    /// The selection names an option the group does not have.
    #[error("unknown option {option} in group {group} on page {page}")]
    UnknownOption {
        /// Page index.
        page: usize,
        /// Group index.
        group: usize,
        /// Requested option index.
        option: usize,
    },

    /// The same option was listed more than once.
    #[error("option {option} listed twice in group {group} on page {page}")]
    DuplicateOption {
        /// Page index.
        page: usize,
        /// Group index.
        group: usize,
        /// Repeated option index.
        option: usize,
    },

    /// The option resolved to `NotUsable` under the current flags.
    #[error("option '{name}' ({option}) in group {group} on page {page} is not usable")]
    UnusableOption {
        /// Page index.
        page: usize,
        /// Group index.
        group: usize,
        /// Option index.
        option: usize,
        /// Option name from the descriptor.
        name: String,
    },

    /// The number of selected options violates the group's mode.
    #[error("group {group} on page {page} is {kind} but {selected} option(s) were selected")]
    Cardinality {
        /// Page index.
        page: usize,
        /// Group index.
        group: usize,
        /// The group's selection mode.
        kind: GroupKind,
        /// Number of options that ended up selected (forced ones included).
        selected: usize,
    },

    /// The wizard already failed; a new run is required.
    #[error("resolution was aborted by an earlier error")]
    Aborted,

    /// `finish` was called before every page was resolved.
    #[error("resolution has not reached the final page")]
    NotCompleted,
}

impl SelectionError {
    /// The page index this error refers to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            Self::UnknownPage { page }
            | Self::UnknownGroup { page, .. }
            | Self::UnknownOption { page, .. }
            | Self::DuplicateOption { page, .. }
            | Self::UnusableOption { page, .. }
            | Self::Cardinality { page, .. } => Some(*page),
            Self::Aborted | Self::NotCompleted => None,
        }
    }

    /// Get an actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &'static str {
        match self {
            Self::UnknownPage { .. } | Self::UnknownGroup { .. } | Self::UnknownOption { .. } => {
                "Use indices taken from the descriptor's pages, groups and options"
            }
            Self::DuplicateOption { .. } => "List each option at most once",
            Self::UnusableOption { .. } => "Pick an option that is usable with the current flags",
            Self::Cardinality { .. } => "Select a number of options allowed by the group's mode",
            Self::Aborted => "Start a new resolution run with corrected selections",
            Self::NotCompleted => "Advance through every page before finishing",
        }
    }
}

/// Any failure of a resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// The descriptor is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The caller's selections are invalid.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// A concurrent resolution task panicked or was cancelled.
    #[error("resolution task failed: {message}")]
    TaskFailed {
        /// Description of the task failure.
        message: String,
    },
}

impl ResolveError {
    /// Get an actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &'static str {
        match self {
            Self::Config(e) => e.fix_suggestion(),
            Self::Selection(e) => e.fix_suggestion(),
            Self::TaskFailed { .. } => "Retry the resolution; the descriptor itself is unaffected",
        }
    }
}
