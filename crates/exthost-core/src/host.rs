//! Host environment handle shared with extensions.

use std::collections::BTreeSet;

/// Services the host application exposes to the extension system.
///
/// The manager only asks whether a host plugin is present and active (for
/// `depend` / `softdepend` gating); extensions receive the same handle in
/// [`ExtensionContext`](crate::ExtensionContext).
pub trait HostServices {
    /// Whether the named host plugin is present and active.
    fn is_plugin_active(&self, name: &str) -> bool;
}

/// A host with a fixed set of active plugins.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    plugins: BTreeSet<String>,
}

impl StaticHost {
    /// Create a host with no active plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host with the given plugins active.
    pub fn with_plugins<I, S>(plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            plugins: plugins.into_iter().map(Into::into).collect(),
        }
    }

    /// Mark a plugin as active.
    pub fn activate(&mut self, name: impl Into<String>) {
        self.plugins.insert(name.into());
    }
}

impl HostServices for StaticHost {
    fn is_plugin_active(&self, name: &str) -> bool {
        self.plugins.contains(name)
    }
}
