//! Run-scoped condition flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A flag assignment carried by an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSetting {
    /// Flag name.
    pub name: String,
    /// Value written when the owning option is selected.
    pub value: String,
}

impl FlagSetting {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The flags accumulated over one resolution run.
///
/// A flag that was never set compares equal to the empty string and to
/// nothing else. Writes are last-write-wins; the ordered map keeps
/// iteration and serialization deterministic.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::FlagSet;
///
/// let mut flags = FlagSet::new();
/// assert!(flags.matches("USSEP", ""));
///
/// flags.set("USSEP", "On");
/// assert!(flags.matches("USSEP", "On"));
/// assert!(!flags.matches("USSEP", ""));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet {
    values: BTreeMap<String, String>,
}

impl FlagSet {
    /// An empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Assign `value` to `name`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    /// Apply a list of settings in order.
    pub fn apply(&mut self, settings: &[FlagSetting]) {
        for setting in settings {
            if let Some(previous) = self.set(setting.name.clone(), setting.value.clone()) {
                if previous != setting.value {
                    tracing::trace!(
                        flag = %setting.name,
                        from = %previous,
                        to = %setting.value,
                        "flag overwritten"
                    );
                }
            }
        }
    }

    /// Whether `name` currently has `expected`; an unset flag only matches `""`.
    pub fn matches(&self, name: &str, expected: &str) -> bool {
        self.get(name).unwrap_or("") == expected
    }

    /// Whether `name` was ever set in this run.
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of flags set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no flag was set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flags in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut flags = Self::new();
        for (name, value) in iter {
            flags.set(name, value);
        }
        flags
    }
}
