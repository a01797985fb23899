//! # fomod-resolver
//!
//! Resolution engine for FOMOD mod installers.
//!
//! A FOMOD package ships a declarative descriptor describing an installer
//! wizard: pages of option groups, flags set by selected options, and file
//! installs that are either always applied, bound to an option, or gated on
//! a dependency expression. This crate evaluates such a descriptor against a
//! package's file listing and a set of user choices and produces a
//! deterministic manifest of source-to-destination mappings.
//!
//! Parsing the XML descriptor, reading archives and copying files are left
//! to the caller. Everything here is pure and synchronous except
//! [`resolve_all`], which fans independent runs out over tokio.
//!
//! ## Features
//!
//! - [`ModuleConfig`] and friends model the descriptor (serde-enabled)
//! - [`Dependency`] expressions with short-circuit evaluation
//! - [`Wizard`] drives the page-by-page selection state machine
//! - [`build`] merges required, option-bound and conditional installs
//! - [`plan`] maps a package to extract or install targets
//! - [`resolve_all`] resolves many selection sets in parallel
//!
//! ## Example
//!
//! ```rust
//! use fomod_resolver::{
//!     plan, AvailableFiles, ConditionalInstall, Dependency, ExecutionMode, FileInstall, Group,
//!     GroupKind, InstallOption, ModuleConfig, Package, Page, ResolveOptions, Selections,
//! };
//!
//! let config = ModuleConfig {
//!     name: "Example Lighting".to_string(),
//!     required_installs: vec![FileInstall::folder("core").to("")],
//!     pages: vec![Page::new(
//!         "Patches",
//!         vec![Group::new(
//!             "Compatibility",
//!             GroupKind::AtMostOne,
//!             vec![InstallOption::new("Unofficial Patch").with_flag("ussep", "on")],
//!         )],
//!     )],
//!     conditional_installs: vec![ConditionalInstall {
//!         dependency: Dependency::flag("ussep", "on"),
//!         files: vec![FileInstall::file("patches/Lighting - USSEP.esp").to("Lighting - USSEP.esp")],
//!     }],
//! };
//! let files: AvailableFiles = [
//!     "core/Lighting.esp",
//!     "patches/Lighting - USSEP.esp",
//!     "fomod/ModuleConfig.xml",
//! ]
//! .into_iter()
//! .collect();
//! let package = Package::new(files).with_config(config);
//! let options = ResolveOptions::default();
//!
//! // Nothing chosen: only the core plugin is installed.
//! let targets = plan(&package, &Selections::new(), ExecutionMode::Install, &options).unwrap();
//! assert_eq!(targets.len(), 1);
//! assert_eq!(targets[0].destination.as_str(), "Data/Lighting.esp");
//!
//! // Picking the patch option sets the flag that enables the conditional install.
//! let with_patch = Selections::new().pick(0, 0);
//! let targets = plan(&package, &with_patch, ExecutionMode::Install, &options).unwrap();
//! assert_eq!(targets.len(), 2);
//! ```

mod config;
mod dependency;
mod dispatch;
mod error;
mod flags;
mod group_kind;
mod manifest;
mod options;
mod paths;
mod resolve;
mod selection;

pub use config::{
    ConditionalInstall, FileInstall, FileKind, Group, InstallOption, ModuleConfig, OptionType,
    Page, TypeDescriptor, TypePattern,
};
pub use dependency::{evaluate, Dependency, EvalContext, FileState};
pub use dispatch::{
    fallback_manifest, plan, resolve_targets, ExecutionMode, Package, ResolvedTarget,
};
pub use error::{ConfigError, EvaluationError, ResolveError, SelectionError};
pub use flags::{FlagSet, FlagSetting};
pub use group_kind::GroupKind;
pub use manifest::{build, Manifest, ManifestEntry, Provenance};
pub use options::{ResolveOptions, DEFAULT_INSTALL_ROOT, DEFAULT_METADATA_DIR};
pub use paths::{AvailableFiles, PathEscapesRoot, RelPath};
pub use resolve::{resolve_all, resolve_manifest};
pub use selection::{
    resolve, ActiveInstall, GroupView, PageChoices, PageView, Resolution, SelectedOption,
    Selection, Selections, Wizard, WizardState,
};
