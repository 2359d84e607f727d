//! End-to-end scenarios over real bundle archives on disk.
//!
//! Each test builds an extensions directory, drives a fresh manager through
//! scan and load, and checks the observable outcome: registry, states,
//! hook order and open loading contexts.

use std::path::Path;
use std::sync::Arc;

use exthost_core::{
    EntryPointCatalog, Error, ExtensionManager, ExtensionState, Hook, ManagerConfig, StaticHost,
};
use exthost_test_utils::{BundleBuilder, ExtensionsDir, Journal, Script, ScriptedExtension};
use pretty_assertions::assert_eq;
use rstest::rstest;

// =============================================================================
// Test Infrastructure
// =============================================================================

/// A manager whose catalog exports `com.x.<Name>` for every given name.
fn manager_for(dir: &Path, journal: &Journal, names: &[&str]) -> ExtensionManager {
    let mut catalog = EntryPointCatalog::new();
    for name in names {
        ScriptedExtension::register(&mut catalog, &format!("com.x.{name}"), journal, Script::ok());
    }
    ExtensionManager::new(
        ManagerConfig::new(dir),
        Arc::new(catalog),
        Arc::new(StaticHost::new()),
    )
}

/// Write one bundle per `(name, hard deps)` pair, as `<lowercase name>.jar`.
fn write_graph(dir: &ExtensionsDir, graph: &[(&str, &[&str])]) {
    for (name, deps) in graph {
        let mut bundle = BundleBuilder::extension(name, &format!("com.x.{name}"));
        if !deps.is_empty() {
            bundle = bundle.list("ext-depend", deps);
        }
        dir.add(&format!("{}.jar", name.to_lowercase()), bundle);
    }
}

fn position(entries: &[String], entry: &str) -> usize {
    entries
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{entry} not in journal: {entries:?}"))
}

// =============================================================================
// Scenario: a.jar and b.jar
// =============================================================================

#[test]
fn test_dependent_pair_loads_in_order() {
    let dir = ExtensionsDir::new();
    dir.add("a.jar", BundleBuilder::extension("A", "com.x.A"));
    dir.add(
        "b.jar",
        BundleBuilder::extension("B", "com.x.B").list("ext-depend", &["A"]),
    );
    let journal = Journal::new();
    let mut manager = manager_for(dir.path(), &journal, &["A", "B"]);

    manager.scan().unwrap();
    let report = manager.load_all();

    assert_eq!(report.enabled(), vec!["A", "B"]);
    let names: Vec<String> = manager
        .active_extensions()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn test_dependent_pair_without_main_fails_both() {
    let dir = ExtensionsDir::new();
    dir.add("a.jar", BundleBuilder::manifest("name: A\n"));
    dir.add(
        "b.jar",
        BundleBuilder::extension("B", "com.x.B").list("ext-depend", &["A"]),
    );
    let journal = Journal::new();
    let mut manager = manager_for(dir.path(), &journal, &["A", "B"]);

    manager.scan().unwrap();
    let report = manager.load_all();

    assert_eq!(manager.state("A"), Some(ExtensionState::Failed));
    assert_eq!(manager.state("B"), Some(ExtensionState::Failed));
    assert!(report.enabled().is_empty());
    assert!(manager.active_extensions().is_empty());
    assert_eq!(manager.open_context_count(), 0);
}

// =============================================================================
// Scan properties
// =============================================================================

#[rstest]
#[case(0, 0)]
#[case(3, 0)]
#[case(0, 2)]
#[case(4, 3)]
fn test_scan_counts_valid_and_invalid(#[case] valid: usize, #[case] invalid: usize) {
    let dir = ExtensionsDir::new();
    for i in 0..valid {
        dir.add(
            &format!("valid-{i}.jar"),
            BundleBuilder::extension(&format!("Valid{i}"), "com.x.Valid"),
        );
    }
    for i in 0..invalid {
        let bundle = match i % 3 {
            0 => BundleBuilder::manifest(&format!("name: Invalid{i}\n")),
            1 => BundleBuilder::manifest("main: com.x.Nameless\n"),
            _ => BundleBuilder::empty().resource("plugin.yml", "name: wrong\n"),
        };
        dir.add(&format!("invalid-{i}.jar"), bundle);
    }
    let journal = Journal::new();
    let mut manager = manager_for(dir.path(), &journal, &[]);

    let report = manager.scan().unwrap();

    assert_eq!(report.bundles.len(), valid);
    assert_eq!(manager.registered().len(), valid);
    assert_eq!(report.failures.len(), invalid);
    for failure in &report.failures {
        let file = failure.file_name();
        assert!(file.starts_with("invalid-"), "{file}");
        assert!(failure.to_string().starts_with(&format!("Skipping {file} - ")));
    }
    assert_eq!(manager.open_context_count(), 0);
}

#[test]
fn test_rescan_drops_removed_bundles() {
    let dir = ExtensionsDir::new();
    write_graph(&dir, &[("Keep", &[]), ("Drop", &[])]);
    let journal = Journal::new();
    let mut manager = manager_for(dir.path(), &journal, &["Keep", "Drop"]);
    manager.scan().unwrap();

    dir.remove("drop.jar");
    dir.add("fresh.jar", BundleBuilder::extension("Fresh", "com.x.Fresh"));
    manager.scan().unwrap();

    let mut names: Vec<String> = manager
        .registered()
        .into_iter()
        .map(|b| b.descriptor.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Fresh", "Keep"]);
}

// =============================================================================
// Ordering properties
// =============================================================================

type Graph = &'static [(&'static str, &'static [&'static str])];

const CHAIN: Graph = &[("C", &["B"]), ("B", &["A"]), ("A", &[])];
const DIAMOND: Graph = &[
    ("Top", &["Left", "Right"]),
    ("Left", &["Base"]),
    ("Right", &["Base"]),
    ("Base", &[]),
];
const FOREST: Graph = &[
    ("Web", &["Http", "Db"]),
    ("Http", &["Net"]),
    ("Net", &[]),
    ("Db", &["Pool"]),
    ("Pool", &[]),
    ("Cli", &[]),
];

#[rstest]
#[case::chain(CHAIN)]
#[case::diamond(DIAMOND)]
#[case::forest(FOREST)]
fn test_dependencies_enable_before_dependents(#[case] graph: Graph) {
    let dir = ExtensionsDir::new();
    write_graph(&dir, graph);
    let names: Vec<&str> = graph.iter().map(|(name, _)| *name).collect();
    let journal = Journal::new();
    let mut manager = manager_for(dir.path(), &journal, &names);

    manager.scan().unwrap();
    let report = manager.load_all();

    assert_eq!(report.enabled().len(), graph.len());
    let entries = journal.entries();
    for (name, deps) in graph {
        let constructed = position(&entries, &format!("new:com.x.{name}"));
        for dep in *deps {
            let dep_enabled = position(&entries, &format!("{dep}:on_enable"));
            assert!(
                dep_enabled < constructed,
                "{dep} must be enabled before {name} is constructed"
            );
        }
    }
}

#[test]
fn test_cycle_has_no_side_effects() {
    let dir = ExtensionsDir::new();
    write_graph(
        &dir,
        &[
            ("Ping", &["Pong"]),
            ("Pong", &["Ping"]),
            ("Self", &["Self"]),
            ("Free", &[]),
            ("Downstream", &["Ping"]),
        ],
    );
    let journal = Journal::new();
    let mut manager = manager_for(
        dir.path(),
        &journal,
        &["Ping", "Pong", "Self", "Free", "Downstream"],
    );

    manager.scan().unwrap();
    let opened_by_scan = manager.contexts_opened();
    let report = manager.load_all();

    for name in ["Ping", "Pong", "Self"] {
        assert_eq!(manager.state(name), Some(ExtensionState::Failed), "{name}");
        assert!(matches!(
            report.error_for(name),
            Some(Error::DependencyCycle { .. })
        ));
        assert_eq!(journal.count(&format!("new:com.x.{name}")), 0);
        assert!(!dir.path().join(name).exists());
    }
    // The downstream bundle fails its dependency check before any context opens.
    assert_eq!(manager.state("Downstream"), Some(ExtensionState::Failed));
    assert_eq!(report.enabled(), vec!["Free"]);
    assert_eq!(manager.contexts_opened(), opened_by_scan + 1);
}

// =============================================================================
// Unload properties
// =============================================================================

#[rstest]
#[case(Script::ok())]
#[case(Script::fail_on(Hook::Disable))]
fn test_unload_always_releases(#[case] script: Script) {
    let dir = ExtensionsDir::new();
    dir.add("a.jar", BundleBuilder::extension("A", "com.x.A"));
    let journal = Journal::new();
    let mut catalog = EntryPointCatalog::new();
    ScriptedExtension::register(&mut catalog, "com.x.A", &journal, script);
    let mut manager = ExtensionManager::new(
        ManagerConfig::new(dir.path()),
        Arc::new(catalog),
        Arc::new(StaticHost::new()),
    );
    manager.scan().unwrap();
    manager.load_all();

    let report = manager.unload("A").unwrap();

    assert_eq!(report.unloaded(), vec!["A"]);
    assert_eq!(report.failures().len(), usize::from(script.fail_on.is_some()));
    assert!(!manager.is_active("A"));
    assert!(manager.extension("A").is_none());
    assert_eq!(manager.open_context_count(), 0);
    assert_eq!(journal.count("A:drop"), 1);
}

// =============================================================================
// Duplicate names
// =============================================================================

#[test]
fn test_duplicate_name_is_deterministic() {
    for _ in 0..3 {
        let dir = ExtensionsDir::new();
        dir.add("zz-late.jar", BundleBuilder::extension("Twin", "com.x.Late"));
        dir.add("aa-early.jar", BundleBuilder::extension("Twin", "com.x.Early"));
        let journal = Journal::new();
        let mut catalog = EntryPointCatalog::new();
        ScriptedExtension::register(&mut catalog, "com.x.Early", &journal, Script::ok());
        ScriptedExtension::register(&mut catalog, "com.x.Late", &journal, Script::ok());
        let mut manager = ExtensionManager::new(
            ManagerConfig::new(dir.path()),
            Arc::new(catalog),
            Arc::new(StaticHost::new()),
        );

        let scan = manager.scan().unwrap();
        manager.load_all();

        assert_eq!(scan.failures.len(), 1);
        assert_eq!(scan.failures[0].file_name(), "zz-late.jar");
        assert_eq!(journal.entries()[0], "new:com.x.Early");
        assert_eq!(journal.count("new:com.x.Late"), 0);
    }
}
