//! The extension manager: registry, load pipeline and unload.
//!
//! [`ExtensionManager`] owns the registered bundles, the per-bundle state
//! table and every loaded instance. Each loaded instance keeps its own
//! [`LoadingContext`] open until it is unloaded.
//!
//! Failures are caught at the bundle boundary: a bundle that cannot be
//! loaded is marked [`ExtensionState::Failed`], logged, and recorded in the
//! returned report. Batch operations never stop on a single bundle.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::EntryPointCatalog;
use crate::config::ManagerConfig;
use crate::context::{ContextLedger, LoadingContext};
use crate::contract::{Extension, ExtensionContext, Hook, HookError};
use crate::dependency::{DependencyGraph, LoadPlan};
use crate::descriptor::ExtensionDescriptor;
use crate::error::{DependencyKind, Error, Result};
use crate::host::HostServices;
use crate::lifecycle::ExtensionState;
use crate::scanner::{BundleScanner, RegisteredBundle, ScanReport};

/// A running extension. Field order matters: the extension object is
/// dropped before its loading context is released.
struct LoadedExtension {
    bundle: RegisteredBundle,
    extension: Box<dyn Extension>,
    context: LoadingContext,
}

impl LoadedExtension {
    fn name(&self) -> &str {
        self.bundle.name()
    }

    fn depends_on_any(&self, names: &BTreeSet<String>) -> bool {
        self.bundle
            .descriptor
            .extension_dependencies()
            .any(|dep| names.contains(dep))
    }
}

/// Owned snapshot of one active extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveExtension {
    pub name: String,
    pub version: String,
    pub descriptor: ExtensionDescriptor,
    pub archive: PathBuf,
    pub state: ExtensionState,
}

/// What happened to one bundle during [`ExtensionManager::load_all`].
#[derive(Debug)]
pub enum LoadOutcome {
    Enabled { name: String, version: String },
    Failed { name: String, error: Error },
}

impl LoadOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Enabled { name, .. } | Self::Failed { name, .. } => name,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }
}

/// Outcomes of one load pass, in processing order.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub outcomes: Vec<LoadOutcome>,
}

impl LoadReport {
    /// Names enabled by this pass, in load order.
    pub fn enabled(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_enabled())
            .map(LoadOutcome::name)
            .collect()
    }

    /// Bundles that failed, with their cause.
    pub fn failures(&self) -> Vec<(&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                LoadOutcome::Failed { name, error } => Some((name.as_str(), error)),
                LoadOutcome::Enabled { .. } => None,
            })
            .collect()
    }

    /// The failure recorded for `name`, if any.
    pub fn error_for(&self, name: &str) -> Option<&Error> {
        self.failures()
            .into_iter()
            .find(|(failed, _)| *failed == name)
            .map(|(_, error)| error)
    }
}

/// One extension taken down by an unload.
#[derive(Debug)]
pub struct UnloadOutcome {
    pub name: String,
    /// The `on_disable` failure, if the hook failed. The unload still happened.
    pub error: Option<Error>,
}

/// Extensions unloaded by one call, in unload order.
#[derive(Debug, Default)]
pub struct UnloadReport {
    pub outcomes: Vec<UnloadOutcome>,
}

impl UnloadReport {
    /// Names unloaded, in order.
    pub fn unloaded(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.name.as_str()).collect()
    }

    /// `on_disable` failures, in order.
    pub fn failures(&self) -> Vec<(&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| (o.name.as_str(), e)))
            .collect()
    }
}

/// Everything a [`ExtensionManager::reload`] did.
#[derive(Debug)]
pub struct ReloadReport {
    pub unloaded: UnloadReport,
    pub scan: ScanReport,
    pub loaded: LoadReport,
}

/// Discovers, loads and unloads extensions from one directory.
pub struct ExtensionManager {
    config: ManagerConfig,
    catalog: Arc<EntryPointCatalog>,
    host: Arc<dyn HostServices>,
    ledger: ContextLedger,
    registered: Vec<RegisteredBundle>,
    states: BTreeMap<String, ExtensionState>,
    active: Vec<LoadedExtension>,
}

impl ExtensionManager {
    /// Create a manager. Nothing touches the filesystem until [`scan`](Self::scan).
    pub fn new(
        config: ManagerConfig,
        catalog: Arc<EntryPointCatalog>,
        host: Arc<dyn HostServices>,
    ) -> Self {
        Self {
            config,
            catalog,
            host,
            ledger: ContextLedger::new(),
            registered: Vec::new(),
            states: BTreeMap::new(),
            active: Vec::new(),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &EntryPointCatalog {
        &self.catalog
    }

    fn scanner(&self) -> BundleScanner {
        BundleScanner::new(
            self.config.archive_extension.clone(),
            Arc::clone(&self.catalog),
            self.ledger.clone(),
        )
    }

    /// Rescan the extensions directory and replace the registry.
    ///
    /// On a directory-level error the previous registry is kept. Active
    /// extensions keep running and keep their state. Rejected bundles whose
    /// manifest declares a name are recorded as [`ExtensionState::Failed`].
    pub fn scan(&mut self) -> Result<ScanReport> {
        let report = self.scanner().scan(&self.config.extensions_dir)?;

        let active: BTreeSet<String> = self.active.iter().map(|l| l.name().to_string()).collect();
        self.states.retain(|name, _| active.contains(name));
        for bundle in &report.bundles {
            if !active.contains(bundle.name()) {
                self.transition(bundle.name(), ExtensionState::Discovered);
                self.transition(bundle.name(), ExtensionState::Validated);
            }
        }
        // Bundles whose manifest names them but fails validation stay
        // queryable as failed.
        for failure in &report.failures {
            if let Some(name) = &failure.name {
                if !self.states.contains_key(name) {
                    self.transition(name, ExtensionState::Discovered);
                    self.transition(name, ExtensionState::Failed);
                }
            }
        }
        self.registered = report.bundles.clone();

        Ok(report)
    }

    /// Read one archive's descriptor without registering it.
    pub fn read_bundle(&self, archive: &Path) -> Result<RegisteredBundle> {
        self.scanner().read_bundle(archive)
    }

    /// Compute the load order for the current registry.
    pub fn plan(&self) -> LoadPlan {
        DependencyGraph::from_bundles(&self.registered).plan()
    }

    /// Load every registered bundle that has not been attempted yet.
    ///
    /// Cycle members fail without a context being opened. Other bundles are
    /// loaded in dependency order; each one that loads is enabled and
    /// becomes active.
    pub fn load_all(&mut self) -> LoadReport {
        let plan = self.plan();
        let mut report = LoadReport::default();

        for cycle in &plan.cycles {
            for name in cycle {
                if !self.is_pending(name) {
                    continue;
                }
                let Some(bundle) = self.bundle(name).cloned() else {
                    continue;
                };
                let error = Error::DependencyCycle {
                    participants: cycle.clone(),
                };
                self.fail(&bundle, error, &mut report);
            }
        }

        for name in &plan.order {
            if !self.is_pending(name) {
                continue;
            }
            let Some(bundle) = self.bundle(name).cloned() else {
                continue;
            };

            match self.load_one(&bundle) {
                Ok(loaded) => {
                    let version = bundle.descriptor.version.clone();
                    self.transition(name, ExtensionState::Enabled);
                    self.active.push(loaded);
                    tracing::info!("Enabled extension: {} v{}", name, version);
                    report.outcomes.push(LoadOutcome::Enabled {
                        name: name.clone(),
                        version,
                    });
                }
                Err(error) => self.fail(&bundle, error, &mut report),
            }
        }

        tracing::debug!(
            enabled = report.enabled().len(),
            failed = report.failures().len(),
            "Load pass finished"
        );
        report
    }

    fn load_one(&mut self, bundle: &RegisteredBundle) -> Result<LoadedExtension> {
        let descriptor = &bundle.descriptor;
        let name = bundle.name();

        self.check_plugin_dependencies(descriptor)?;
        self.check_extension_dependencies(descriptor)?;
        self.transition(name, ExtensionState::DependenciesSatisfied);

        let context = LoadingContext::open(&bundle.archive, Arc::clone(&self.catalog), &self.ledger)?;
        let mut extension = context.resolve(&descriptor.entry_point)?.instantiate()?;

        let data_dir = self.config.data_dir_for(name);
        fs::create_dir_all(&data_dir)?;

        extension
            .init(ExtensionContext {
                descriptor: descriptor.clone(),
                data_dir,
                host: Arc::clone(&self.host),
            })
            .map_err(|e| hook_error(name, Hook::Init, e))?;
        self.transition(name, ExtensionState::Loaded);

        extension
            .on_load()
            .map_err(|e| hook_error(name, Hook::Load, e))?;
        extension
            .on_enable()
            .map_err(|e| hook_error(name, Hook::Enable, e))?;

        Ok(LoadedExtension {
            bundle: bundle.clone(),
            extension,
            context,
        })
    }

    fn check_plugin_dependencies(&self, descriptor: &ExtensionDescriptor) -> Result<()> {
        for plugin in &descriptor.plugin_depend {
            if !self.host.is_plugin_active(plugin) {
                return Err(Error::DependencyMissing {
                    extension: descriptor.name.clone(),
                    kind: DependencyKind::Plugin,
                    dependency: plugin.clone(),
                    reason: "not found".to_string(),
                });
            }
        }
        for plugin in &descriptor.plugin_softdepend {
            if !self.host.is_plugin_active(plugin) {
                tracing::info!(
                    "Extension {} soft-depends on plugin '{}' - not found, continuing",
                    descriptor.name,
                    plugin
                );
            }
        }
        Ok(())
    }

    fn check_extension_dependencies(&self, descriptor: &ExtensionDescriptor) -> Result<()> {
        for dependency in &descriptor.extension_depend {
            let reason = if self.bundle(dependency).is_none() {
                "not registered".to_string()
            } else {
                match self.state(dependency) {
                    Some(state) if state.is_available() => continue,
                    Some(state) => format!("not loaded ({state})"),
                    None => "not loaded".to_string(),
                }
            };
            return Err(Error::DependencyMissing {
                extension: descriptor.name.clone(),
                kind: DependencyKind::Extension,
                dependency: dependency.clone(),
                reason,
            });
        }
        for dependency in &descriptor.extension_softdepend {
            let available = self.state(dependency).is_some_and(ExtensionState::is_available);
            if !available {
                tracing::info!(
                    "Extension {} soft-depends on extension '{}' - not loaded, continuing",
                    descriptor.name,
                    dependency
                );
            }
        }
        Ok(())
    }

    fn fail(&mut self, bundle: &RegisteredBundle, error: Error, report: &mut LoadReport) {
        let name = bundle.name();
        tracing::warn!(
            "Failed to load extension {} ({}): {}",
            name,
            bundle.file_name(),
            error
        );
        self.transition(name, ExtensionState::Failed);
        report.outcomes.push(LoadOutcome::Failed {
            name: name.to_string(),
            error,
        });
    }

    fn transition(&mut self, name: &str, next: ExtensionState) {
        let current = self.states.get(name).copied();
        debug_assert!(
            current.is_none_or(|state| state.can_transition_to(next)),
            "illegal transition for {name}: {current:?} -> {next}"
        );
        tracing::trace!(extension = name, state = %next, "State change");
        self.states.insert(name.to_string(), next);
    }

    fn is_pending(&self, name: &str) -> bool {
        self.state(name) == Some(ExtensionState::Validated)
    }

    fn bundle(&self, name: &str) -> Option<&RegisteredBundle> {
        self.registered.iter().find(|b| b.name() == name)
    }

    /// Unload one active extension.
    ///
    /// Active extensions that depend on it (hard or soft, transitively) are
    /// unloaded first, in reverse load order.
    pub fn unload(&mut self, name: &str) -> Result<UnloadReport> {
        if !self.is_active(name) {
            return Err(Error::UnknownExtension(name.to_string()));
        }

        let mut doomed = BTreeSet::from([name.to_string()]);
        loop {
            let dependents: Vec<String> = self
                .active
                .iter()
                .filter(|l| !doomed.contains(l.name()) && l.depends_on_any(&doomed))
                .map(|l| l.name().to_string())
                .collect();
            if dependents.is_empty() {
                break;
            }
            doomed.extend(dependents);
        }

        let mut report = UnloadReport::default();
        loop {
            let Some(index) = self.active.iter().rposition(|l| doomed.contains(l.name())) else {
                break;
            };
            report.outcomes.push(self.unload_at(index));
        }
        Ok(report)
    }

    /// Unload every active extension, most recently loaded first.
    pub fn unload_all(&mut self) -> UnloadReport {
        let mut report = UnloadReport::default();
        while !self.active.is_empty() {
            report.outcomes.push(self.unload_at(self.active.len() - 1));
        }
        report
    }

    fn unload_at(&mut self, index: usize) -> UnloadOutcome {
        let mut loaded = self.active.remove(index);
        let name = loaded.name().to_string();

        let error = match loaded.extension.on_disable() {
            Ok(()) => None,
            Err(e) => {
                let error = hook_error(&name, Hook::Disable, e);
                tracing::warn!("{} ({})", error, loaded.bundle.file_name());
                Some(error)
            }
        };

        drop(loaded);
        self.transition(&name, ExtensionState::Disabled);
        tracing::info!("Disabled extension: {}", name);

        UnloadOutcome { name, error }
    }

    /// Unload everything, forget all state, rescan and load again.
    ///
    /// If the rescan fails, the unload that already happened is logged at
    /// `warn` before the error is returned.
    pub fn reload(&mut self) -> Result<ReloadReport> {
        let unloaded = self.unload_all();
        self.registered.clear();
        self.states.clear();

        let scan = match self.scan() {
            Ok(scan) => scan,
            Err(error) => {
                tracing::warn!(
                    unloaded = ?unloaded.unloaded(),
                    disable_failures = unloaded.failures().len(),
                    "Reload aborted after unloading, rescan failed: {}",
                    error
                );
                return Err(error);
            }
        };
        let loaded = self.load_all();
        Ok(ReloadReport {
            unloaded,
            scan,
            loaded,
        })
    }

    /// Registered bundles from the last successful scan.
    pub fn registered(&self) -> Vec<RegisteredBundle> {
        self.registered.clone()
    }

    /// Snapshots of the active extensions, in load order.
    pub fn active_extensions(&self) -> Vec<ActiveExtension> {
        self.active
            .iter()
            .map(|loaded| ActiveExtension {
                name: loaded.name().to_string(),
                version: loaded.bundle.descriptor.version.clone(),
                descriptor: loaded.bundle.descriptor.clone(),
                archive: loaded.context.archive_path().to_path_buf(),
                state: self.state(loaded.name()).unwrap_or(ExtensionState::Enabled),
            })
            .collect()
    }

    /// Lifecycle state of a registered or previously loaded bundle.
    pub fn state(&self, name: &str) -> Option<ExtensionState> {
        self.states.get(name).copied()
    }

    /// Borrow an active extension object.
    pub fn extension(&self, name: &str) -> Option<&dyn Extension> {
        self.active
            .iter()
            .find(|loaded| loaded.name() == name)
            .map(|loaded| loaded.extension.as_ref())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|loaded| loaded.name() == name)
    }

    /// Loading contexts currently open.
    pub fn open_context_count(&self) -> usize {
        self.ledger.open_count()
    }

    /// Loading contexts opened since the manager was created.
    pub fn contexts_opened(&self) -> usize {
        self.ledger.opened_total()
    }
}

impl std::fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionManager")
            .field("config", &self.config)
            .field("registered", &self.registered.len())
            .field("states", &self.states)
            .field(
                "active",
                &self.active.iter().map(LoadedExtension::name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

fn hook_error(extension: &str, hook: Hook, error: HookError) -> Error {
    Error::Hook {
        extension: extension.to_string(),
        hook,
        reason: error.to_string(),
    }
}
