//! Extensions written against the public contract, driven by a custom host.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use exthost_core::{
    EntryPointCatalog, Extension, ExtensionContext, ExtensionManager, ExtensionState,
    HookResult, HostServices, ManagerConfig,
};
use exthost_test_utils::{BundleBuilder, ExtensionsDir};
use pretty_assertions::assert_eq;

/// A host whose plugin set can change while extensions run.
#[derive(Debug, Default)]
struct LiveHost {
    plugins: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
}

impl LiveHost {
    fn enable_plugin(&self, name: &str) {
        self.plugins.lock().unwrap().push(name.to_string());
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl HostServices for LiveHost {
    fn is_plugin_active(&self, name: &str) -> bool {
        self.queries.lock().unwrap().push(name.to_string());
        self.plugins.lock().unwrap().iter().any(|p| p == name)
    }
}

/// Keeps a visit counter in its data directory.
#[derive(Default)]
struct Counter {
    file: Option<PathBuf>,
}

impl Extension for Counter {
    fn init(&mut self, ctx: ExtensionContext) -> HookResult {
        self.file = Some(ctx.data_dir.join("visits.txt"));
        Ok(())
    }

    fn on_enable(&mut self) -> HookResult {
        let file = self.file.as_ref().ok_or("not initialized")?;
        let visits: u32 = match fs::read_to_string(file) {
            Ok(content) => content.trim().parse()?,
            Err(_) => 0,
        };
        fs::write(file, (visits + 1).to_string())?;
        Ok(())
    }
}

/// Records which optional plugins were present when it started.
#[derive(Default)]
struct Bridge {
    ctx: Option<ExtensionContext>,
}

impl Extension for Bridge {
    fn init(&mut self, ctx: ExtensionContext) -> HookResult {
        self.ctx = Some(ctx);
        Ok(())
    }

    fn on_enable(&mut self) -> HookResult {
        let ctx = self.ctx.as_ref().ok_or("not initialized")?;
        let present: Vec<&str> = ctx
            .descriptor
            .plugin_softdepend
            .iter()
            .map(String::as_str)
            .filter(|plugin| ctx.host.is_plugin_active(plugin))
            .collect();
        fs::write(ctx.data_dir.join("bridges.txt"), present.join(","))?;
        Ok(())
    }
}

fn catalog() -> Arc<EntryPointCatalog> {
    let mut catalog = EntryPointCatalog::new();
    catalog.register::<Counter>("org.demo.Counter");
    catalog.register::<Bridge>("org.demo.Bridge");
    Arc::new(catalog)
}

#[test]
fn test_data_directory_survives_reload() {
    let dir = ExtensionsDir::new();
    dir.add("counter.jar", BundleBuilder::extension("Counter", "org.demo.Counter"));
    let mut manager = ExtensionManager::new(
        ManagerConfig::new(dir.path()),
        catalog(),
        Arc::new(LiveHost::default()),
    );

    manager.scan().unwrap();
    manager.load_all();
    manager.reload().unwrap();
    manager.reload().unwrap();

    let visits = fs::read_to_string(dir.path().join("Counter").join("visits.txt")).unwrap();
    assert_eq!(visits, "3");
    assert_eq!(manager.state("Counter"), Some(ExtensionState::Enabled));
}

#[test]
fn test_extensions_see_the_shared_host() {
    let dir = ExtensionsDir::new();
    dir.add(
        "bridge.jar",
        BundleBuilder::extension("Bridge", "org.demo.Bridge")
            .list("depend", &["Core"])
            .list("softdepend", &["Maps", "Chat"]),
    );
    let host = Arc::new(LiveHost::default());
    host.enable_plugin("Core");
    host.enable_plugin("Chat");
    let mut manager = ExtensionManager::new(
        ManagerConfig::new(dir.path()),
        catalog(),
        Arc::clone(&host) as Arc<dyn HostServices>,
    );

    manager.scan().unwrap();
    let report = manager.load_all();

    assert_eq!(report.enabled(), vec!["Bridge"]);
    let bridges = fs::read_to_string(dir.path().join("Bridge").join("bridges.txt")).unwrap();
    assert_eq!(bridges, "Chat");
    assert!(host.queries().starts_with(&["Core".to_string()]));
}

#[test]
fn test_hard_plugin_dependency_checked_against_host() {
    let dir = ExtensionsDir::new();
    dir.add(
        "bridge.jar",
        BundleBuilder::extension("Bridge", "org.demo.Bridge").list("depend", &["Core"]),
    );
    let host = Arc::new(LiveHost::default());
    let mut manager = ExtensionManager::new(
        ManagerConfig::new(dir.path()),
        catalog(),
        Arc::clone(&host) as Arc<dyn HostServices>,
    );

    manager.scan().unwrap();
    let first = manager.load_all();
    assert_eq!(manager.state("Bridge"), Some(ExtensionState::Failed));
    assert!(first.error_for("Bridge").is_some());
    assert!(!dir.path().join("Bridge").exists());

    host.enable_plugin("Core");
    let second = manager.reload().unwrap();

    assert_eq!(second.loaded.enabled(), vec!["Bridge"]);
    assert!(manager.is_active("Bridge"));
}

#[test]
fn test_mixed_directory_full_cycle() {
    let dir = ExtensionsDir::new();
    dir.add("counter.jar", BundleBuilder::extension("Counter", "org.demo.Counter"));
    dir.add(
        "bridge.jar",
        BundleBuilder::extension("Bridge", "org.demo.Bridge")
            .list("ext-softdepend", &["Counter"]),
    );
    dir.add("broken.jar", BundleBuilder::manifest("name: Broken\nmain: org.demo.Missing\n"));
    dir.add_garbage("garbage.jar");
    let mut manager = ExtensionManager::new(
        ManagerConfig::new(dir.path()),
        catalog(),
        Arc::new(LiveHost::default()),
    );

    let scan = manager.scan().unwrap();
    assert_eq!(scan.bundles.len(), 3);
    assert_eq!(scan.failures.len(), 1);

    let loaded = manager.load_all();
    assert_eq!(loaded.enabled(), vec!["Counter", "Bridge"]);
    assert_eq!(loaded.failures().len(), 1);
    assert_eq!(manager.open_context_count(), 2);

    let unloaded = manager.unload_all();
    assert_eq!(unloaded.unloaded(), vec!["Bridge", "Counter"]);
    assert_eq!(manager.open_context_count(), 0);
    assert_eq!(manager.contexts_opened(), 3 + 3);
}
