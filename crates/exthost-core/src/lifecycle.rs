//! Per-bundle lifecycle states.
//!
//! ```text
//! Discovered -> Validated -> DependenciesSatisfied -> Loaded -> Enabled -> Disabled
//!      \______________\_____________\___________________\_________\____> Failed
//! ```

use std::fmt;

/// Where one bundle is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionState {
    /// Found on disk, manifest not yet read.
    Discovered,
    /// Manifest parsed and registered.
    Validated,
    /// Every hard dependency is present.
    DependenciesSatisfied,
    /// Constructed and initialized.
    Loaded,
    /// `on_load` and `on_enable` completed; the extension is active.
    Enabled,
    /// Unloaded after being enabled.
    Disabled,
    /// A step failed; terminal.
    Failed,
}

impl ExtensionState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: ExtensionState) -> bool {
        use ExtensionState::*;
        match (self, next) {
            (Failed | Disabled, _) => false,
            (_, Failed) => true,
            (Discovered, Validated)
            | (Validated, DependenciesSatisfied)
            | (DependenciesSatisfied, Loaded)
            | (Loaded, Enabled)
            | (Enabled, Disabled) => true,
            _ => false,
        }
    }

    /// Whether the state can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Disabled)
    }

    /// Whether a dependent may rely on this extension (at least `Loaded`).
    pub fn is_available(self) -> bool {
        matches!(self, Self::Loaded | Self::Enabled)
    }
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovered => "discovered",
            Self::Validated => "validated",
            Self::DependenciesSatisfied => "dependencies-satisfied",
            Self::Loaded => "loaded",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
