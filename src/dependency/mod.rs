//! Dependency expressions.
//!
//! A dependency is a boolean tree over leaf predicates (flag values, file
//! presence, version requirements) joined by `and`/`or`/`not`. Descriptors
//! use them for page and group visibility, computed option types and
//! conditional file installs.
//!
//! - `eval`: structural-recursion evaluator and [`EvalContext`]
//! - `version`: lenient version parsing for version predicates

mod eval;
mod version;

pub use eval::{evaluate, EvalContext};
pub(crate) use version::parse_version;

use serde::{Deserialize, Serialize};

/// Required state of a file for a [`Dependency::File`] predicate.
///
/// Only presence in the package listing is known to the resolver, so
/// `Active` and `Inactive` both require the path to be present and
/// `Missing` requires it to be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileState {
    /// The file or folder is present.
    #[default]
    Active,
    /// The file or folder is present but not enabled.
    Inactive,
    /// The file or folder is absent.
    Missing,
}

/// A dependency expression.
///
/// Serialized with an internal `type` tag. Tags the resolver does not know
/// deserialize to [`Dependency::Unknown`], which always evaluates to `true`.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::Dependency;
///
/// let expr: Dependency = serde_json::from_str(
///     r#"{ "type": "and", "children": [
///         { "type": "flag", "name": "USSEP", "value": "On" },
///         { "type": "not", "child": { "type": "flag", "name": "Version", "value": "Exteriors" } }
///     ] }"#,
/// ).unwrap();
///
/// assert_eq!(
///     expr,
///     Dependency::and(vec![
///         Dependency::flag("USSEP", "On"),
///         Dependency::not(Dependency::flag("Version", "Exteriors")),
///     ]),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dependency {
    /// Flag `name` currently has `value`.
    Flag {
        /// Flag name.
        name: String,
        /// Expected value; `""` matches an unset flag.
        #[serde(default)]
        value: String,
    },

    /// A file or folder of the package is in the given state.
    File {
        /// Path relative to the package root.
        path: String,
        /// Required state.
        #[serde(default)]
        state: FileState,
    },

    /// The game is at least `minimum`.
    GameVersion {
        /// Minimum version as written in the descriptor.
        minimum: String,
    },

    /// The mod manager is at least `minimum`.
    ModManagerVersion {
        /// Minimum version as written in the descriptor.
        minimum: String,
    },

    /// All children hold.
    And {
        /// Operands; must not be empty.
        children: Vec<Dependency>,
    },

    /// At least one child holds.
    Or {
        /// Operands; must not be empty.
        children: Vec<Dependency>,
    },

    /// The child does not hold.
    Not {
        /// Operand.
        child: Box<Dependency>,
    },

    /// A predicate kind this resolver does not understand.
    #[serde(other)]
    Unknown,
}

impl Dependency {
    /// Flag-equality predicate.
    pub fn flag(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Flag {
            name: name.into(),
            value: value.into(),
        }
    }

    /// File-presence predicate requiring the path to be present.
    pub fn file(path: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            state: FileState::Active,
        }
    }

    /// Conjunction.
    pub fn and(children: Vec<Dependency>) -> Self {
        Self::And { children }
    }

    /// Disjunction.
    pub fn or(children: Vec<Dependency>) -> Self {
        Self::Or { children }
    }

    /// Negation.
    pub fn not(child: Dependency) -> Self {
        Self::Not {
            child: Box::new(child),
        }
    }
}
