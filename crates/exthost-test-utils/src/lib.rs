//! Shared test fixtures for the extension-host workspace.
//!
//! This crate is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`bundle`]: [`BundleBuilder`] writing bundle archives to disk
//! - [`scripted`]: [`ScriptedExtension`] and the [`Journal`] it records into
//! - [`logs`]: [`capture_logs`] recording `tracing` events for assertions

pub mod bundle;
pub mod logs;
pub mod scripted;

pub use bundle::{BundleBuilder, ExtensionsDir};
pub use logs::{CapturedEvent, CapturedLogs, capture_logs};
pub use scripted::{Journal, Script, ScriptedExtension};
