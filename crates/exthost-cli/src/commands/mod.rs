//! Command implementations for extctl

pub mod inspect;
pub mod plan;
pub mod scan;

use std::sync::Arc;

use exthost_core::{EntryPointCatalog, ExtensionManager, ManagerConfig, StaticHost};

pub use inspect::run_inspect;
pub use plan::run_plan;
pub use scan::run_scan;

/// A manager that can scan and plan but has no entry points to instantiate.
fn inspection_manager(config: &ManagerConfig) -> ExtensionManager {
    ExtensionManager::new(
        config.clone(),
        Arc::new(EntryPointCatalog::new()),
        Arc::new(StaticHost::new()),
    )
}
