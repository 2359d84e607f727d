//! The capability surface every loaded extension implements.
//!
//! The manager drives each instance through the hooks in a fixed order:
//! [`Extension::init`] once after construction, then [`Extension::on_load`]
//! and [`Extension::on_enable`]; [`Extension::on_disable`] runs when the
//! extension is unloaded. Hooks run synchronously on the caller's thread.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::descriptor::ExtensionDescriptor;
use crate::host::HostServices;

/// Error type returned by extension hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by extension hooks.
pub type HookResult = std::result::Result<(), HookError>;

/// Everything an extension receives when it is initialized.
#[derive(Clone)]
pub struct ExtensionContext {
    /// The descriptor read from the bundle's manifest.
    pub descriptor: ExtensionDescriptor,
    /// Per-extension data directory, created before `init` runs.
    pub data_dir: PathBuf,
    /// Handle to host functionality.
    pub host: Arc<dyn HostServices>,
}

impl fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("descriptor", &self.descriptor)
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

/// Lifecycle contract implemented by extension entry points.
pub trait Extension {
    /// Receive the descriptor, data directory and host handle.
    fn init(&mut self, ctx: ExtensionContext) -> HookResult;

    /// Called after a successful `init`, before `on_enable`.
    fn on_load(&mut self) -> HookResult {
        Ok(())
    }

    /// Activate the extension.
    fn on_enable(&mut self) -> HookResult;

    /// Deactivate the extension. Failures are reported but never stop the
    /// unload.
    fn on_disable(&mut self) -> HookResult {
        Ok(())
    }
}

/// Names of the lifecycle hooks, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Init,
    Load,
    Enable,
    Disable,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Load => "on_load",
            Self::Enable => "on_enable",
            Self::Disable => "on_disable",
        };
        f.write_str(name)
    }
}
