use std::fmt;

use crate::contract::Hook;

/// Which host a missing dependency was expected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// A plugin provided by the host environment (`depend`).
    Plugin,
    /// Another extension in the same registry (`ext-depend`).
    Extension,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plugin => f.write_str("plugin"),
            Self::Extension => f.write_str("extension"),
        }
    }
}

/// Errors that can occur while scanning, loading or unloading extensions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bundle archive has no manifest at its root.
    #[error("{0} missing")]
    ManifestMissing(&'static str),

    /// The manifest is not well-formed YAML.
    #[error("failed to parse extension.yml: {0}")]
    ManifestParse(#[from] serde_yaml::Error),

    /// A required manifest field is missing or invalid.
    #[error("{0}")]
    Validation(String),

    /// Another bundle already registered the same extension name.
    #[error("duplicate extension name '{name}' (already provided by {existing})")]
    DuplicateName { name: String, existing: String },

    /// The bundle could not be opened as an archive.
    #[error("failed to open archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error reading bundles or creating data directories.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the manager configuration.
    #[error("invalid manager configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The declared entry point is not visible from the bundle's loading context.
    #[error("entry point '{entry_point}' could not be resolved")]
    UnknownEntryPoint { entry_point: String },

    /// The entry point resolves to a type that does not implement [`crate::Extension`].
    #[error("{entry_point} ({type_name}) does not implement the extension contract")]
    ContractViolation {
        entry_point: String,
        type_name: String,
    },

    /// A hard dependency is absent or did not load.
    #[error("extension {extension} requires {kind} '{dependency}' - {reason}")]
    DependencyMissing {
        extension: String,
        kind: DependencyKind,
        dependency: String,
        reason: String,
    },

    /// The extension takes part in a dependency cycle.
    #[error("dependency cycle between extensions: {}", participants.join(", "))]
    DependencyCycle { participants: Vec<String> },

    /// The entry point's constructor failed.
    #[error("failed to construct {entry_point}: {reason}")]
    Instantiation { entry_point: String, reason: String },

    /// A lifecycle hook returned an error.
    #[error("{hook} hook of extension {extension} failed: {reason}")]
    Hook {
        extension: String,
        hook: Hook,
        reason: String,
    },

    /// No active extension with that name.
    #[error("unknown extension: {0}")]
    UnknownExtension(String),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
