//! End-to-end resolution: wizard run plus manifest build.

use crate::{
    build, resolve, AvailableFiles, Manifest, ModuleConfig, ResolveError, ResolveOptions,
    Selections,
};
use futures::future::join_all;
use std::sync::Arc;

/// Run the wizard over `selections` and build the manifest.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{
///     resolve_manifest, AvailableFiles, FileInstall, Group, GroupKind, InstallOption,
///     ModuleConfig, Page, RelPath, ResolveOptions, Selections,
/// };
///
/// let config = ModuleConfig {
///     pages: vec![Page::new(
///         "Textures",
///         vec![Group::new(
///             "Resolution",
///             GroupKind::ExactlyOne,
///             vec![
///                 InstallOption::new("2K").with_file(FileInstall::folder("2K").to("textures")),
///                 InstallOption::new("4K").with_file(FileInstall::folder("4K").to("textures")),
///             ],
///         )],
///     )],
///     ..Default::default()
/// };
/// let files: AvailableFiles = ["2K/rock.dds", "4K/rock.dds"].into_iter().collect();
///
/// let manifest = resolve_manifest(
///     &config,
///     &files,
///     &Selections::new().pick(0, 1),
///     &ResolveOptions::default(),
/// )
/// .unwrap();
/// let rock = manifest.get(&RelPath::new("textures/rock.dds").unwrap()).unwrap();
/// assert_eq!(rock.source.as_str(), "4K/rock.dds");
/// ```
pub fn resolve_manifest(
    config: &ModuleConfig,
    files: &AvailableFiles,
    selections: &Selections,
    options: &ResolveOptions,
) -> Result<Manifest, ResolveError> {
    let resolution = resolve(config, files, selections, options)?;
    Ok(build(config, &resolution, files, options)?)
}

/// Resolve several independent selection sets in parallel.
///
/// Each run executes on tokio's blocking pool and owns its own flags and
/// manifest; the descriptor and listing are shared. Results come back in
/// the order of `runs`.
///
/// # Performance
///
/// Runs are joined with `futures::future::join_all`, so the total time is
/// roughly that of the slowest run rather than the sum.
///
/// # Example
///
/// ```rust
/// use fomod_resolver::{resolve_all, AvailableFiles, FileInstall, ModuleConfig, ResolveOptions, Selections};
/// use std::sync::Arc;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let config = Arc::new(ModuleConfig {
///         required_installs: vec![FileInstall::file("Core.esp")],
///         ..Default::default()
///     });
///     let files: Arc<AvailableFiles> = Arc::new(["Core.esp"].into_iter().collect());
///
///     let runs = vec![Selections::new(), Selections::new()];
///     let results = resolve_all(config, files, runs, ResolveOptions::default()).await;
///     assert_eq!(results.len(), 2);
///     assert!(results.iter().all(|r| r.as_ref().is_ok_and(|m| m.len() == 1)));
/// }
/// ```
pub async fn resolve_all(
    config: Arc<ModuleConfig>,
    files: Arc<AvailableFiles>,
    runs: Vec<Selections>,
    options: ResolveOptions,
) -> Vec<Result<Manifest, ResolveError>> {
    let options = Arc::new(options);
    let handles: Vec<_> = runs
        .into_iter()
        .map(|selections| {
            let config = Arc::clone(&config);
            let files = Arc::clone(&files);
            let options = Arc::clone(&options);
            tokio::task::spawn_blocking(move || {
                resolve_manifest(&config, &files, &selections, &options)
            })
        })
        .collect();

    tracing::debug!(runs = handles.len(), "resolving in parallel");
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(ResolveError::TaskFailed {
                message: e.to_string(),
            }),
        })
        .collect()
}
