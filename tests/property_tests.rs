//! Property-based tests for resolution invariants.
//!
//! These tests verify:
//! - Path canonicalization is idempotent
//! - Manifests and targets are deterministic and sorted
//! - Every resolved group satisfies its selection mode
//! - Conditional installs appear exactly when their condition holds

use fomod_resolver::{
    build, fallback_manifest, plan, resolve, resolve_targets, AvailableFiles, ConditionalInstall,
    ConfigError, Dependency, ExecutionMode, FileInstall, Group, GroupKind, InstallOption,
    ModuleConfig, OptionType, Package, Page, RelPath, ResolveError, ResolveOptions, Selections,
    TypeDescriptor,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn group_kind_strategy() -> impl Strategy<Value = GroupKind> {
    prop_oneof![
        Just(GroupKind::ExactlyOne),
        Just(GroupKind::AtMostOne),
        Just(GroupKind::AtLeastOne),
        Just(GroupKind::Any),
        Just(GroupKind::All),
    ]
}

fn option_type_strategy() -> impl Strategy<Value = OptionType> {
    prop_oneof![
        Just(OptionType::Required),
        Just(OptionType::Recommended),
        Just(OptionType::Optional),
        Just(OptionType::CouldBeUsable),
        Just(OptionType::NotUsable),
    ]
}

/// Relative paths over a small alphabet so that case collisions are common.
fn raw_path_strategy() -> impl Strategy<Value = String> {
    let segment = prop_oneof![
        Just("Data"),
        Just("data"),
        Just("fomod"),
        Just("Meshes"),
        Just("textures"),
        Just("a.esp"),
        Just("B.ESP"),
        Just("x.nif"),
    ];
    (prop::collection::vec(segment, 1..4), prop::bool::ANY).prop_map(|(segments, windows)| {
        segments.join(if windows { "\\" } else { "/" })
    })
}

fn listing_strategy() -> impl Strategy<Value = AvailableFiles> {
    prop::collection::vec(raw_path_strategy(), 0..12).prop_map(|paths| paths.into_iter().collect())
}

fn single_group(kind: GroupKind, types: &[OptionType]) -> ModuleConfig {
    let options = types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            InstallOption::new(format!("Option {i}"))
                .with_type(TypeDescriptor::Static(*ty))
                .with_flag("choice", i.to_string())
        })
        .collect();
    ModuleConfig {
        name: "Generated".to_string(),
        pages: vec![Page::new("Main", vec![Group::new("Group", kind, options)])],
        ..Default::default()
    }
}

// =============================================================================
// Paths
// =============================================================================

proptest! {
    /// Canonicalizing a canonical path changes nothing.
    #[test]
    fn relpath_canonical_form_is_stable(raw in raw_path_strategy()) {
        let path = RelPath::new(&raw).unwrap();
        let again = RelPath::new(path.as_str()).unwrap();
        prop_assert_eq!(&path, &again);
        prop_assert!(!path.as_str().contains('\\'));
        prop_assert_eq!(path.key(), path.as_str().to_lowercase());
    }
}

// =============================================================================
// Determinism
// =============================================================================

proptest! {
    /// Planning twice yields identical, strictly ordered, metadata-free targets.
    #[test]
    fn fallback_install_is_deterministic(files in listing_strategy()) {
        let options = ResolveOptions::default();
        let package = Package::new(files);
        let first = plan(&package, &Selections::new(), ExecutionMode::Install, &options).unwrap();
        let second = plan(&package, &Selections::new(), ExecutionMode::Install, &options).unwrap();
        prop_assert_eq!(&first, &second);

        for pair in first.windows(2) {
            prop_assert!(pair[0].destination.key() < pair[1].destination.key());
        }
        for target in &first {
            prop_assert!(target.destination.starts_with_segment("data"));
            prop_assert!(!target.source.starts_with_segment("fomod"));
        }
    }

    /// Extraction mirrors every listed file.
    #[test]
    fn fallback_extract_mirrors_listing(files in listing_strategy()) {
        let package = Package::new(files.clone());
        let options = ResolveOptions::default();
        let targets = plan(&package, &Selections::new(), ExecutionMode::Extract, &options).unwrap();
        prop_assert_eq!(targets.len(), files.len());
        for target in &targets {
            prop_assert_eq!(&target.source, &target.destination);
        }
    }

    /// A whole-package folder install builds the same manifest as the fallback.
    #[test]
    fn root_folder_install_matches_fallback(files in listing_strategy()) {
        let options = ResolveOptions::default();
        let config = ModuleConfig {
            required_installs: vec![FileInstall::folder("")],
            ..Default::default()
        };
        let resolution = resolve(&config, &files, &Selections::new(), &options).unwrap();
        let built = build(&config, &resolution, &files, &options).unwrap();
        let fallback = fallback_manifest(&files, &options);
        prop_assert_eq!(
            resolve_targets(&built, ExecutionMode::Install, &options),
            resolve_targets(&fallback, ExecutionMode::Install, &options)
        );
    }
}

// =============================================================================
// Cardinality
// =============================================================================

proptest! {
    /// Defaults always satisfy the group's mode, or the group cannot be satisfied.
    #[test]
    fn defaults_satisfy_cardinality(
        kind in group_kind_strategy(),
        types in prop::collection::vec(option_type_strategy(), 1..6),
    ) {
        let config = single_group(kind, &types);
        let files = AvailableFiles::new();
        let eligible = types.iter().filter(|t| t.is_eligible()).count();

        match resolve(&config, &files, &Selections::new(), &ResolveOptions::default()) {
            Ok(resolution) => {
                let chosen = resolution.selected_in(0, 0);
                prop_assert!(kind.accepts(chosen.len(), eligible));
                prop_assert!(chosen.iter().all(|&o| types[o].is_eligible()));
            }
            Err(ResolveError::Config(ConfigError::NoEligibleOption { .. })) => {
                prop_assert!(kind.requires_selection());
                prop_assert_eq!(eligible, 0);
            }
            Err(ResolveError::Config(ConfigError::ConflictingRequired { required, .. })) => {
                prop_assert!(kind.is_single_select());
                prop_assert!(required > 1);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Accepted explicit choices satisfy the mode and include every required option.
    #[test]
    fn accepted_choices_satisfy_cardinality(
        kind in group_kind_strategy(),
        types in prop::collection::vec(option_type_strategy(), 1..6),
        picks in prop::collection::btree_set(0usize..6, 1..4),
    ) {
        let config = single_group(kind, &types);
        let files = AvailableFiles::new();
        let selections = Selections::new().choose(0, 0, picks.iter().copied());

        if let Ok(resolution) = resolve(&config, &files, &selections, &ResolveOptions::default()) {
            let chosen = resolution.selected_in(0, 0);
            let eligible = types.iter().filter(|t| t.is_eligible()).count();
            prop_assert!(kind.accepts(chosen.len(), eligible));
            prop_assert!(chosen.iter().all(|&o| types[o] != OptionType::NotUsable));
            for (o, ty) in types.iter().enumerate() {
                if *ty == OptionType::Required {
                    prop_assert!(chosen.contains(&o));
                }
            }
            // The last selected option's flag wins.
            let last = chosen.last().copied();
            prop_assert_eq!(
                resolution.flags.get("choice").map(str::to_string),
                last.map(|o| o.to_string())
            );
        }
    }
}

// =============================================================================
// Conditional installs
// =============================================================================

proptest! {
    /// A conditional entry is present exactly when its condition holds.
    #[test]
    fn conditional_entry_iff_condition(pick in 0usize..3, expected in 0usize..3) {
        let mut config = single_group(
            GroupKind::ExactlyOne,
            &[OptionType::Optional, OptionType::Optional, OptionType::Optional],
        );
        config.conditional_installs = vec![ConditionalInstall {
            dependency: Dependency::flag("choice", expected.to_string()),
            files: vec![FileInstall::file("patch.esp")],
        }];
        let files: AvailableFiles = ["patch.esp"].into_iter().collect();
        let options = ResolveOptions::default();

        let selections = Selections::new().pick(0, pick);
        let resolution = resolve(&config, &files, &selections, &options).unwrap();
        let manifest = build(&config, &resolution, &files, &options).unwrap();
        let present = manifest.get(&RelPath::new("patch.esp").unwrap()).is_some();
        prop_assert_eq!(present, pick == expected);
    }
}
