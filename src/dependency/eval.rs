//! Dependency evaluation.

use super::{parse_version, Dependency, FileState};
use crate::{AvailableFiles, EvaluationError, FlagSet, RelPath, ResolveOptions};
use semver::Version;

/// Everything a dependency expression can observe.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Flags accumulated so far in the run.
    pub flags: &'a FlagSet,
    /// The package listing.
    pub files: &'a AvailableFiles,
    /// Installed game version, if known.
    pub game_version: Option<&'a Version>,
    /// Mod manager version, if known.
    pub mod_manager_version: Option<&'a Version>,
}

impl<'a> EvalContext<'a> {
    /// Context without version information; version predicates hold.
    pub fn new(flags: &'a FlagSet, files: &'a AvailableFiles) -> Self {
        Self {
            flags,
            files,
            game_version: None,
            mod_manager_version: None,
        }
    }

    /// Context taking version information from `options`.
    pub fn with_options(
        flags: &'a FlagSet,
        files: &'a AvailableFiles,
        options: &'a ResolveOptions,
    ) -> Self {
        Self {
            flags,
            files,
            game_version: options.game_version.as_ref(),
            mod_manager_version: options.mod_manager_version.as_ref(),
        }
    }
}

/// Evaluate `expr` against `flags` and `files`.
///
/// Pure and total over flag sets: unset flags compare as unset, never as
/// an error. Only structurally malformed expressions fail.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{evaluate, AvailableFiles, Dependency, FlagSet};
///
/// let flags: FlagSet = [("USSEP", "On")].into_iter().collect();
/// let files = AvailableFiles::new();
///
/// let expr = Dependency::or(vec![
///     Dependency::flag("USSEP", "Off"),
///     Dependency::flag("USSEP", "On"),
/// ]);
/// assert_eq!(evaluate(&expr, &flags, &files), Ok(true));
///
/// let broken = Dependency::and(vec![]);
/// assert!(evaluate(&broken, &flags, &files).is_err());
/// ```
pub fn evaluate(
    expr: &Dependency,
    flags: &FlagSet,
    files: &AvailableFiles,
) -> Result<bool, EvaluationError> {
    expr.evaluate(&EvalContext::new(flags, files))
}

impl Dependency {
    /// Evaluate against `ctx`, short-circuiting composites.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, EvaluationError> {
        match self {
            Self::Flag { name, value } => Ok(ctx.flags.matches(name, value)),
            Self::File { path, state } => Ok(file_state_holds(ctx.files, path, *state)),
            Self::GameVersion { minimum } => Ok(version_holds(ctx.game_version, minimum)),
            Self::ModManagerVersion { minimum } => {
                Ok(version_holds(ctx.mod_manager_version, minimum))
            }
            Self::And { children } => {
                ensure_children("and", children)?;
                for (i, child) in children.iter().enumerate() {
                    if !child.evaluate(ctx).map_err(|e| e.within("and", i))? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or { children } => {
                ensure_children("or", children)?;
                for (i, child) in children.iter().enumerate() {
                    if child.evaluate(ctx).map_err(|e| e.within("or", i))? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not { child } => child
                .evaluate(ctx)
                .map(|holds| !holds)
                .map_err(|e| e.within_not()),
            Self::Unknown => {
                tracing::trace!("unrecognized dependency kind evaluates to true");
                Ok(true)
            }
        }
    }

    /// Check the whole tree for structural problems without evaluating it.
    ///
    /// Evaluation short-circuits, so a malformed branch behind a decided
    /// composite would otherwise go unnoticed.
    pub fn check(&self) -> Result<(), EvaluationError> {
        match self {
            Self::And { children } | Self::Or { children } => {
                let operator = if matches!(self, Self::And { .. }) { "and" } else { "or" };
                ensure_children(operator, children)?;
                for (i, child) in children.iter().enumerate() {
                    child.check().map_err(|e| e.within(operator, i))?;
                }
                Ok(())
            }
            Self::Not { child } => child.check().map_err(|e| e.within_not()),
            _ => Ok(()),
        }
    }
}

fn ensure_children(operator: &'static str, children: &[Dependency]) -> Result<(), EvaluationError> {
    if children.is_empty() {
        return Err(EvaluationError::EmptyComposite {
            operator,
            path: operator.to_string(),
        });
    }
    Ok(())
}

fn file_state_holds(files: &AvailableFiles, path: &str, state: FileState) -> bool {
    // A path that escapes the package can never be part of it.
    let present = match RelPath::new(path) {
        Ok(path) => files.contains(&path),
        Err(_) => false,
    };
    match state {
        FileState::Active | FileState::Inactive => present,
        FileState::Missing => !present,
    }
}

fn version_holds(actual: Option<&Version>, minimum: &str) -> bool {
    match (actual, parse_version(minimum)) {
        (Some(actual), Some(minimum)) => *actual >= minimum,
        _ => true,
    }
}

impl EvaluationError {
    fn within(self, operator: &'static str, index: usize) -> Self {
        match self {
            Self::EmptyComposite { operator: op, path } => Self::EmptyComposite {
                operator: op,
                path: format!("{operator}[{index}].{path}"),
            },
        }
    }

    fn within_not(self) -> Self {
        match self {
            Self::EmptyComposite { operator, path } => Self::EmptyComposite {
                operator,
                path: format!("not.{path}"),
            },
        }
    }
}
