//! Extension host core.
//!
//! This crate discovers extension bundles (zip archives carrying an
//! [`MANIFEST_FILENAME`] document), validates their descriptors, orders them
//! by their declared dependencies and drives each one through a fixed
//! lifecycle inside its own loading context.

pub mod catalog;
pub mod config;
pub mod context;
pub mod contract;
pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod manager;
pub mod scanner;

/// The reserved manifest filename at the root of every bundle archive.
pub const MANIFEST_FILENAME: &str = "extension.yml";

/// Archive suffix (without the dot) used for discovery when none is configured.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "jar";

pub use catalog::{EntryPointCatalog, ExportedType};
pub use config::ManagerConfig;
pub use context::{ContextLedger, LoadingContext};
pub use contract::{Extension, ExtensionContext, Hook, HookError, HookResult};
pub use dependency::{DependencyGraph, LoadPlan};
pub use descriptor::ExtensionDescriptor;
pub use error::{DependencyKind, Error, Result};
pub use host::{HostServices, StaticHost};
pub use lifecycle::ExtensionState;
pub use manager::{
    ActiveExtension, ExtensionManager, LoadOutcome, LoadReport, ReloadReport, UnloadOutcome,
    UnloadReport,
};
pub use scanner::{BundleScanner, RegisteredBundle, ScanFailure, ScanReport};
