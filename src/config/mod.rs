//! The in-memory installer descriptor.
//!
//! Built by an external parser (or deserialized with serde) and treated as
//! read-only by every resolution run. Call [`ModuleConfig::validate`] to
//! surface structural problems up front; the wizard does so on construction.

mod types;
mod validate;

pub use types::{
    ConditionalInstall, FileInstall, FileKind, Group, InstallOption, ModuleConfig, OptionType,
    Page, TypeDescriptor, TypePattern,
};
