//! The selection engine.
//!
//! [`Wizard`] walks the descriptor's pages strictly forward. Each step
//! resolves every group on the current page, either from caller choices
//! (validated against the group's mode and the options' computed types) or
//! from deterministic defaults, and merges the selected options' flags into
//! the run's [`FlagSet`].
//!
//! ```text
//! AwaitingPage(0) -> AwaitingPage(1) -> ... -> Completed
//!        \________________\___________________-> Aborted (on any error)
//! ```
//!
//! Invisible pages are skipped without a step. Going back is not supported:
//! callers re-run resolution from scratch with different [`Selections`].

use crate::{
    AvailableFiles, ConfigError, EvalContext, FileInstall, FlagSet, Group, GroupKind,
    ModuleConfig, OptionType, Page, ResolveError, ResolveOptions, SelectionError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Options chosen for the groups of one page, keyed by group index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageChoices {
    groups: BTreeMap<usize, Vec<usize>>,
}

impl PageChoices {
    /// No choices; every group falls back to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose `options` in `group`, replacing earlier choices for that group.
    pub fn choose(mut self, group: usize, options: impl IntoIterator<Item = usize>) -> Self {
        self.groups.insert(group, options.into_iter().collect());
        self
    }

    /// Choices for `group`, if any were made.
    pub fn group(&self, group: usize) -> Option<&[usize]> {
        self.groups.get(&group).map(Vec::as_slice)
    }

    /// All `(group, options)` pairs in group order.
    pub fn groups(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.groups.iter().map(|(g, o)| (*g, o.as_slice()))
    }
}

/// One serialized selection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Page index.
    pub page: usize,
    /// Group index within the page.
    #[serde(default)]
    pub group: usize,
    /// Chosen option indices within the group.
    pub options: Vec<usize>,
}

/// Caller choices for a whole run.
///
/// Pages and groups without choices use defaults. Serialized as a list of
/// [`Selection`] records; a later record for the same page and group
/// replaces an earlier one.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::Selections;
///
/// let selections = Selections::new()
///     .pick(0, 1)              // page 0, group 0, option 1
///     .choose(1, 2, [0, 3]);   // page 1, group 2, options 0 and 3
///
/// assert_eq!(selections.page(0).unwrap().group(0), Some(&[1][..]));
/// assert!(selections.page(2).is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Selection>", into = "Vec<Selection>")]
pub struct Selections {
    pages: BTreeMap<usize, PageChoices>,
}

impl Selections {
    /// No choices at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose `options` in group `group` of page `page`.
    pub fn choose(
        mut self,
        page: usize,
        group: usize,
        options: impl IntoIterator<Item = usize>,
    ) -> Self {
        let choices = self.pages.remove(&page).unwrap_or_default();
        self.pages.insert(page, choices.choose(group, options));
        self
    }

    /// Choose the single option `option` in the first group of page `page`.
    pub fn pick(self, page: usize, option: usize) -> Self {
        self.choose(page, 0, [option])
    }

    /// Choices for `page`, if any were made.
    pub fn page(&self, page: usize) -> Option<&PageChoices> {
        self.pages.get(&page)
    }

    /// Page indices with choices, ascending.
    pub fn pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.keys().copied()
    }

    /// Whether no choice was made.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl From<Vec<Selection>> for Selections {
    fn from(records: Vec<Selection>) -> Self {
        records.into_iter().fold(Self::new(), |acc, record| {
            acc.choose(record.page, record.group, record.options)
        })
    }
}

impl From<Selections> for Vec<Selection> {
    fn from(selections: Selections) -> Self {
        selections
            .pages
            .into_iter()
            .flat_map(|(page, choices)| {
                choices.groups.into_iter().map(move |(group, options)| Selection {
                    page,
                    group,
                    options,
                })
            })
            .collect()
    }
}

/// Where the wizard is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WizardState {
    /// Waiting for choices for the page with this index.
    AwaitingPage(usize),
    /// Every page was resolved.
    Completed,
    /// An error ended the run.
    Aborted,
}

impl WizardState {
    /// Whether no further step is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// A selected option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Page index.
    pub page: usize,
    /// Group index.
    pub group: usize,
    /// Option index.
    pub option: usize,
    /// Option name.
    pub name: String,
    /// Type the option resolved to when it was selected.
    pub option_type: OptionType,
}

/// A file install made active by a selected option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveInstall {
    /// Page index of the owning option.
    pub page: usize,
    /// Group index of the owning option.
    pub group: usize,
    /// Option index of the owning option.
    pub option: usize,
    /// The install rule.
    pub file: FileInstall,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Final flags.
    pub flags: FlagSet,
    /// Option-bound installs in activation order.
    pub active: Vec<ActiveInstall>,
    /// Selected options in page, group, option order.
    pub selected: Vec<SelectedOption>,
}

impl Resolution {
    /// Option indices selected in `group` of `page`.
    pub fn selected_in(&self, page: usize, group: usize) -> Vec<usize> {
        self.selected
            .iter()
            .filter(|s| s.page == page && s.group == group)
            .map(|s| s.option)
            .collect()
    }
}

/// A group as it currently appears to the user.
#[derive(Debug, Clone)]
pub struct GroupView<'a> {
    /// Group index.
    pub index: usize,
    /// The group.
    pub group: &'a Group,
    /// Whether the group is shown and resolved.
    pub visible: bool,
    /// Resolved type of every option, in option order.
    pub option_types: Vec<OptionType>,
}

/// The page the wizard is waiting on.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    /// Page index.
    pub index: usize,
    /// The page.
    pub page: &'a Page,
    /// Its groups.
    pub groups: Vec<GroupView<'a>>,
}

/// Forward-only state machine over a descriptor's pages.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{
///     AvailableFiles, Group, GroupKind, InstallOption, ModuleConfig, Page, PageChoices,
///     ResolveOptions, Wizard, WizardState,
/// };
///
/// let config = ModuleConfig {
///     pages: vec![Page::new("Patches", vec![Group::new(
///         "USSEP",
///         GroupKind::ExactlyOne,
///         vec![
///             InstallOption::new("Yes").with_flag("USSEP", "On"),
///             InstallOption::new("No").with_flag("USSEP", "Off"),
///         ],
///     )])],
///     ..Default::default()
/// };
/// let files = AvailableFiles::new();
/// let options = ResolveOptions::default();
///
/// let mut wizard = Wizard::new(&config, &files, &options).unwrap();
/// assert_eq!(wizard.state(), WizardState::AwaitingPage(0));
///
/// let state = wizard.advance(&PageChoices::new().choose(0, [1])).unwrap();
/// assert_eq!(state, WizardState::Completed);
///
/// let resolution = wizard.finish().unwrap();
/// assert_eq!(resolution.flags.get("USSEP"), Some("Off"));
/// ```
#[derive(Debug)]
pub struct Wizard<'a> {
    config: &'a ModuleConfig,
    files: &'a AvailableFiles,
    options: &'a ResolveOptions,
    state: WizardState,
    flags: FlagSet,
    active: Vec<ActiveInstall>,
    selected: Vec<SelectedOption>,
}

impl<'a> Wizard<'a> {
    /// Validate `config` and move to its first visible page.
    pub fn new(
        config: &'a ModuleConfig,
        files: &'a AvailableFiles,
        options: &'a ResolveOptions,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut wizard = Self {
            config,
            files,
            options,
            state: WizardState::Completed,
            flags: FlagSet::new(),
            active: Vec::new(),
            selected: Vec::new(),
        };
        wizard.state = wizard.next_visible_page(0)?;
        tracing::debug!(module = %config.name, state = ?wizard.state, "wizard started");
        Ok(wizard)
    }

    /// Current state.
    pub fn state(&self) -> WizardState {
        self.state
    }

    /// The page awaiting choices, with group visibility and option types
    /// resolved against the flags committed so far.
    ///
    /// Returns `None` once the wizard is completed or aborted.
    pub fn current_page(&self) -> Result<Option<PageView<'a>>, ConfigError> {
        let WizardState::AwaitingPage(index) = self.state else {
            return Ok(None);
        };
        let config = self.config;
        let page = &config.pages[index];
        let ctx = self.context();
        let mut groups = Vec::with_capacity(page.groups.len());
        for (g, group) in page.groups.iter().enumerate() {
            groups.push(GroupView {
                index: g,
                group,
                visible: group_visible(index, g, group, &ctx)?,
                option_types: option_types(index, g, group, &ctx)?,
            });
        }
        Ok(Some(PageView {
            index,
            page,
            groups,
        }))
    }

    /// Resolve the current page with `choices` and move to the next visible page.
    ///
    /// Groups without choices (or with an empty list) use defaults. On any
    /// error the wizard is aborted and discards everything it accumulated.
    /// Advancing a completed wizard is a no-op.
    pub fn advance(&mut self, choices: &PageChoices) -> Result<WizardState, ResolveError> {
        let index = match self.state {
            WizardState::AwaitingPage(index) => index,
            WizardState::Completed => return Ok(WizardState::Completed),
            WizardState::Aborted => return Err(ResolveError::Selection(SelectionError::Aborted)),
        };

        match self.resolve_page(index, choices) {
            Ok(next) => {
                self.state = next;
                Ok(next)
            }
            Err(e) => {
                tracing::debug!(page = index, error = %e, "wizard aborted");
                self.state = WizardState::Aborted;
                self.flags = FlagSet::new();
                self.active.clear();
                self.selected.clear();
                Err(e)
            }
        }
    }

    /// Hand over the final flags and active installs.
    pub fn finish(self) -> Result<Resolution, SelectionError> {
        match self.state {
            WizardState::Completed => Ok(Resolution {
                flags: self.flags,
                active: self.active,
                selected: self.selected,
            }),
            WizardState::Aborted => Err(SelectionError::Aborted),
            WizardState::AwaitingPage(_) => Err(SelectionError::NotCompleted),
        }
    }

    fn context(&self) -> EvalContext<'_> {
        EvalContext::with_options(&self.flags, self.files, self.options)
    }

    fn resolve_page(
        &mut self,
        index: usize,
        choices: &PageChoices,
    ) -> Result<WizardState, ResolveError> {
        let config = self.config;
        let page = &config.pages[index];

        if let Some((group, _)) = choices.groups().find(|(g, _)| *g >= page.groups.len()) {
            return Err(ResolveError::Selection(SelectionError::UnknownGroup {
                page: index,
                group,
            }));
        }

        for (g, group) in page.groups.iter().enumerate() {
            let chosen = {
                let ctx = self.context();
                if !group_visible(index, g, group, &ctx)? {
                    tracing::debug!(page = index, group = %group.name, "skipping invisible group");
                    continue;
                }
                let types = option_types(index, g, group, &ctx)?;
                check_required(index, g, group, &types)?;
                let chosen = match choices.group(g) {
                    Some(requested) if !requested.is_empty() => {
                        validate_choices(index, g, group, &types, requested)?
                    }
                    _ => default_choices(index, g, group, &types)?,
                };
                chosen
                    .into_iter()
                    .map(|o| (o, types[o]))
                    .collect::<Vec<_>>()
            };

            for (o, option_type) in chosen {
                self.commit(index, g, group, o, option_type);
            }
        }

        Ok(self.next_visible_page(index + 1)?)
    }

    fn commit(&mut self, page: usize, g: usize, group: &Group, o: usize, option_type: OptionType) {
        let option = &group.options[o];
        tracing::debug!(page, group = %group.name, option = %option.name, "option selected");
        self.flags.apply(&option.flags);
        self.active.extend(option.files.iter().map(|file| ActiveInstall {
            page,
            group: g,
            option: o,
            file: file.clone(),
        }));
        self.selected.push(SelectedOption {
            page,
            group: g,
            option: o,
            name: option.name.clone(),
            option_type,
        });
    }

    fn next_visible_page(&self, from: usize) -> Result<WizardState, ConfigError> {
        let ctx = self.context();
        for (index, page) in self.config.pages.iter().enumerate().skip(from) {
            let visible = match &page.visible {
                Some(condition) => condition
                    .evaluate(&ctx)
                    .map_err(|e| ConfigError::malformed(format!("pages[{index}].visible"), e))?,
                None => true,
            };
            if visible {
                return Ok(WizardState::AwaitingPage(index));
            }
            tracing::debug!(page = index, name = %page.name, "skipping invisible page");
        }
        Ok(WizardState::Completed)
    }
}

fn group_visible(
    page: usize,
    g: usize,
    group: &Group,
    ctx: &EvalContext<'_>,
) -> Result<bool, ConfigError> {
    match &group.visible {
        Some(condition) => condition
            .evaluate(ctx)
            .map_err(|e| ConfigError::malformed(format!("pages[{page}].groups[{g}].visible"), e)),
        None => Ok(true),
    }
}

fn option_types(
    page: usize,
    g: usize,
    group: &Group,
    ctx: &EvalContext<'_>,
) -> Result<Vec<OptionType>, ConfigError> {
    group
        .options
        .iter()
        .enumerate()
        .map(|(o, option)| {
            option.option_type.resolve(ctx).map_err(|e| {
                ConfigError::malformed(format!("pages[{page}].groups[{g}].options[{o}].type"), e)
            })
        })
        .collect()
}

/// Validate caller choices and add forced options.
fn validate_choices(
    page: usize,
    g: usize,
    group: &Group,
    types: &[OptionType],
    requested: &[usize],
) -> Result<Vec<usize>, SelectionError> {
    let mut chosen = BTreeSet::new();
    for &option in requested {
        let Some(option_type) = types.get(option) else {
            return Err(SelectionError::UnknownOption { page, group: g, option });
        };
        if !chosen.insert(option) {
            return Err(SelectionError::DuplicateOption { page, group: g, option });
        }
        if !option_type.is_eligible() {
            return Err(SelectionError::UnusableOption {
                page,
                group: g,
                option,
                name: group.options[option].name.clone(),
            });
        }
    }

    chosen.extend(indices_where(types, OptionType::is_forced));

    let eligible = indices_where(types, OptionType::is_eligible).len();
    if !group.kind.accepts(chosen.len(), eligible) {
        return Err(SelectionError::Cardinality {
            page,
            group: g,
            kind: group.kind,
            selected: chosen.len(),
        });
    }
    Ok(chosen.into_iter().collect())
}

/// Reject single-select groups where more than one option is forced.
pub(crate) fn check_required(
    page: usize,
    g: usize,
    group: &Group,
    types: &[OptionType],
) -> Result<(), ConfigError> {
    let required = types.iter().filter(|t| t.is_forced()).count();
    if required > 1 && group.kind.is_single_select() {
        return Err(ConfigError::ConflictingRequired {
            page,
            group: g,
            name: group.name.clone(),
            kind: group.kind,
            required,
        });
    }
    Ok(())
}

/// Deterministic selection for a group the caller left alone.
fn default_choices(
    page: usize,
    g: usize,
    group: &Group,
    types: &[OptionType],
) -> Result<Vec<usize>, ConfigError> {
    let eligible = indices_where(types, OptionType::is_eligible);
    let forced = indices_where(types, OptionType::is_forced);
    let recommended = indices_where(types, |t| matches!(t, OptionType::Recommended));

    let chosen: Vec<usize> = match group.kind {
        GroupKind::ExactlyOne => forced
            .first()
            .or_else(|| recommended.first())
            .or_else(|| eligible.first())
            .copied()
            .into_iter()
            .collect(),
        GroupKind::AtLeastOne => {
            let preferred = indices_where(types, OptionType::is_preferred);
            if preferred.is_empty() {
                eligible.first().copied().into_iter().collect()
            } else {
                preferred
            }
        }
        GroupKind::AtMostOne => forced.first().copied().into_iter().collect(),
        GroupKind::Any => forced,
        GroupKind::All => eligible,
    };

    if chosen.is_empty() && group.kind.requires_selection() {
        return Err(ConfigError::NoEligibleOption {
            page,
            group: g,
            name: group.name.clone(),
            kind: group.kind,
        });
    }
    tracing::trace!(page, group = %group.name, ?chosen, "default selection");
    Ok(chosen)
}

fn indices_where(types: &[OptionType], pred: impl Fn(&OptionType) -> bool) -> Vec<usize> {
    types
        .iter()
        .enumerate()
        .filter(|(_, t)| pred(*t))
        .map(|(i, _)| i)
        .collect()
}

/// Run the wizard over every page using `selections`.
///
/// Pages without choices use defaults; choices for pages skipped as
/// invisible are ignored. Choices naming a page the descriptor does not
/// have are rejected.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{
///     resolve, AvailableFiles, Group, GroupKind, InstallOption, ModuleConfig, Page,
///     ResolveOptions, Selections,
/// };
///
/// let config = ModuleConfig {
///     pages: vec![Page::new("Version", vec![Group::new(
///         "Version",
///         GroupKind::ExactlyOne,
///         vec![
///             InstallOption::new("Full").with_flag("Version", "Full"),
///             InstallOption::new("Lite").with_flag("Version", "Lite"),
///         ],
///     )])],
///     ..Default::default()
/// };
/// let files = AvailableFiles::new();
/// let options = ResolveOptions::default();
///
/// let defaults = resolve(&config, &files, &Selections::new(), &options).unwrap();
/// assert_eq!(defaults.flags.get("Version"), Some("Full"));
///
/// let lite = resolve(&config, &files, &Selections::new().pick(0, 1), &options).unwrap();
/// assert_eq!(lite.flags.get("Version"), Some("Lite"));
/// ```
pub fn resolve(
    config: &ModuleConfig,
    files: &AvailableFiles,
    selections: &Selections,
    options: &ResolveOptions,
) -> Result<Resolution, ResolveError> {
    let mut wizard = Wizard::new(config, files, options)?;

    if let Some(page) = selections.pages().find(|p| *p >= config.pages.len()) {
        return Err(ResolveError::Selection(SelectionError::UnknownPage { page }));
    }

    let no_choices = PageChoices::new();
    while let WizardState::AwaitingPage(index) = wizard.state() {
        wizard.advance(selections.page(index).unwrap_or(&no_choices))?;
    }
    Ok(wizard.finish()?)
}
