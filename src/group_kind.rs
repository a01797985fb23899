//! Group selection modes.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// How many options of a group may be selected.
///
/// The string forms match the descriptor's `type` attribute on `<group>`
/// elements, so parsers can use `str::parse` directly:
///
/// ```rust
/// use fomod_resolver::GroupKind;
///
/// let kind: GroupKind = "SelectExactlyOne".parse().unwrap();
/// assert_eq!(kind, GroupKind::ExactlyOne);
/// assert_eq!(kind.to_string(), "SelectExactlyOne");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
)]
pub enum GroupKind {
    /// Exactly one option must be selected.
    #[strum(serialize = "SelectExactlyOne")]
    #[serde(rename = "SelectExactlyOne")]
    ExactlyOne,
    /// Zero or one option may be selected.
    #[strum(serialize = "SelectAtMostOne")]
    #[serde(rename = "SelectAtMostOne")]
    AtMostOne,
    /// One or more options must be selected.
    #[strum(serialize = "SelectAtLeastOne")]
    #[serde(rename = "SelectAtLeastOne")]
    AtLeastOne,
    /// Any number of options may be selected.
    #[strum(serialize = "SelectAny")]
    #[serde(rename = "SelectAny")]
    Any,
    /// Every usable option is selected.
    #[strum(serialize = "SelectAll")]
    #[serde(rename = "SelectAll")]
    All,
}

impl GroupKind {
    /// Whether `selected` options out of `eligible` usable ones satisfy this mode.
    ///
    /// ```rust
    /// use fomod_resolver::GroupKind;
    ///
    /// assert!(GroupKind::AtMostOne.accepts(0, 3));
    /// assert!(!GroupKind::ExactlyOne.accepts(2, 3));
    /// assert!(GroupKind::All.accepts(3, 3));
    /// ```
    pub fn accepts(&self, selected: usize, eligible: usize) -> bool {
        match self {
            Self::ExactlyOne => selected == 1,
            Self::AtMostOne => selected <= 1,
            Self::AtLeastOne => selected >= 1,
            Self::Any => true,
            Self::All => selected == eligible,
        }
    }

    /// Whether a group of this mode must end up with at least one selection.
    pub fn requires_selection(&self) -> bool {
        matches!(self, Self::ExactlyOne | Self::AtLeastOne)
    }

    /// Whether a group of this mode holds at most one selection.
    pub fn is_single_select(&self) -> bool {
        matches!(self, Self::ExactlyOne | Self::AtMostOne)
    }

    /// Iterator over all selection modes.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }
}
