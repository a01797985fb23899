//! Structural validation of a descriptor.

use super::{FileInstall, ModuleConfig, TypeDescriptor};
use crate::selection::check_required;
use crate::{ConfigError, Dependency};

impl ModuleConfig {
    /// Check the descriptor for structural problems.
    ///
    /// Rejects groups that require a selection but have no options,
    /// single-select groups with several statically `Required` options, paths
    /// that climb out of their root, and `and`/`or` dependencies without
    /// children. The error names the first offending location in descriptor
    /// order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fomod_resolver::{ConfigError, Group, GroupKind, ModuleConfig, Page};
    ///
    /// let config = ModuleConfig {
    ///     pages: vec![Page::new("Main", vec![Group::new("Plugin", GroupKind::ExactlyOne, vec![])])],
    ///     ..Default::default()
    /// };
    /// assert!(matches!(config.validate(), Err(ConfigError::EmptyGroup { page: 0, group: 0, .. })));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_files("required_installs", &self.required_installs)?;

        for (p, page) in self.pages.iter().enumerate() {
            if let Some(visible) = &page.visible {
                check_dependency(&format!("pages[{p}].visible"), visible)?;
            }
            for (g, group) in page.groups.iter().enumerate() {
                let at = format!("pages[{p}].groups[{g}]");
                if let Some(visible) = &group.visible {
                    check_dependency(&format!("{at}.visible"), visible)?;
                }
                if group.options.is_empty() && group.kind.requires_selection() {
                    return Err(ConfigError::EmptyGroup {
                        page: p,
                        group: g,
                        name: group.name.clone(),
                        kind: group.kind,
                    });
                }
                let static_types: Vec<_> = group
                    .options
                    .iter()
                    .filter_map(|option| match &option.option_type {
                        TypeDescriptor::Static(option_type) => Some(*option_type),
                        _ => None,
                    })
                    .collect();
                check_required(p, g, group, &static_types)?;
                for (o, option) in group.options.iter().enumerate() {
                    let at = format!("{at}.options[{o}]");
                    for dependency in option.option_type.dependencies() {
                        check_dependency(&format!("{at}.type"), dependency)?;
                    }
                    check_files(&format!("{at}.files"), &option.files)?;
                }
            }
        }

        for (c, install) in self.conditional_installs.iter().enumerate() {
            let at = format!("conditional_installs[{c}]");
            check_dependency(&format!("{at}.dependency"), &install.dependency)?;
            check_files(&format!("{at}.files"), &install.files)?;
        }

        Ok(())
    }
}

fn check_dependency(location: &str, dependency: &Dependency) -> Result<(), ConfigError> {
    dependency
        .check()
        .map_err(|e| ConfigError::malformed(location, e))
}

fn check_files(location: &str, files: &[FileInstall]) -> Result<(), ConfigError> {
    for (i, file) in files.iter().enumerate() {
        if let Err(e) = file.source_path() {
            return Err(ConfigError::InvalidPath {
                location: format!("{location}[{i}].source"),
                path: e.0,
            });
        }
        if let Err(e) = file.destination_path() {
            return Err(ConfigError::InvalidPath {
                location: format!("{location}[{i}].destination"),
                path: e.0,
            });
        }
    }
    Ok(())
}
