//! Bundle discovery.
//!
//! The scanner lists the immediate children of an extensions directory whose
//! name ends in the archive suffix, opens each in a short-lived
//! [`LoadingContext`] to read its manifest, and reports one
//! [`RegisteredBundle`] or one [`ScanFailure`] per archive. A bad bundle never
//! stops the pass.
//!
//! Archives are processed in ascending file-name order so that duplicate
//! extension names resolve the same way on every platform: the first archive
//! wins and later ones are reported as failures.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::EntryPointCatalog;
use crate::context::{ContextLedger, LoadingContext};
use crate::descriptor::ExtensionDescriptor;
use crate::error::{Error, Result};

/// A descriptor paired with the archive it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredBundle {
    pub descriptor: ExtensionDescriptor,
    pub archive: PathBuf,
}

impl RegisteredBundle {
    /// The declared extension name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The archive's file name, for messages.
    pub fn file_name(&self) -> String {
        file_name(&self.archive)
    }
}

/// One archive that could not be registered.
#[derive(Debug)]
pub struct ScanFailure {
    pub file: PathBuf,
    /// The extension name the manifest declares, when it could be read.
    pub name: Option<String>,
    pub error: Error,
}

impl ScanFailure {
    /// The archive's file name, for messages.
    pub fn file_name(&self) -> String {
        file_name(&self.file)
    }
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skipping {} - {}", self.file_name(), self.error)
    }
}

/// Result of one full scan pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Successfully parsed bundles, in processing order.
    pub bundles: Vec<RegisteredBundle>,
    /// Per-archive failures, in processing order.
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    /// The one-line summary logged at the end of a pass.
    pub fn summary(&self) -> String {
        format!("Registered {} extensions.", self.bundles.len())
    }
}

/// Discovers bundles in a directory.
#[derive(Debug, Clone)]
pub struct BundleScanner {
    archive_extension: String,
    catalog: Arc<EntryPointCatalog>,
    ledger: ContextLedger,
}

impl BundleScanner {
    /// Create a scanner matching `*.<archive_extension>`.
    pub fn new(
        archive_extension: impl Into<String>,
        catalog: Arc<EntryPointCatalog>,
        ledger: ContextLedger,
    ) -> Self {
        Self {
            archive_extension: archive_extension.into(),
            catalog,
            ledger,
        }
    }

    /// Scan `dir`, creating it if it does not exist.
    ///
    /// Only directory-level I/O errors are returned as `Err`; per-bundle
    /// problems are collected in [`ScanReport::failures`].
    pub fn scan(&self, dir: &Path) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        if !dir.exists() {
            fs::create_dir_all(dir)?;
            tracing::debug!(dir = %dir.display(), "Created extensions directory");
            tracing::info!("{}", report.summary());
            return Ok(report);
        }

        let candidates = self.candidates(dir)?;
        let mut seen: HashMap<String, String> = HashMap::new();

        for archive in candidates {
            let mut declared = None;
            let result = self.read_manifest(&archive).and_then(|content| {
                declared = ExtensionDescriptor::declared_name(&content);
                let descriptor = ExtensionDescriptor::from_yaml(&content)?;
                match seen.get(&descriptor.name) {
                    Some(existing) => Err(Error::DuplicateName {
                        name: descriptor.name,
                        existing: existing.clone(),
                    }),
                    None => Ok(RegisteredBundle {
                        descriptor,
                        archive: archive.clone(),
                    }),
                }
            });

            match result {
                Ok(bundle) => {
                    tracing::info!("Registered extension: {}", bundle.name());
                    seen.insert(bundle.name().to_string(), bundle.file_name());
                    report.bundles.push(bundle);
                }
                Err(error) => {
                    let failure = ScanFailure {
                        file: archive,
                        name: declared,
                        error,
                    };
                    tracing::warn!("{}", failure);
                    report.failures.push(failure);
                }
            }
        }

        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Read one archive's descriptor through a short-lived context.
    pub fn read_bundle(&self, archive: &Path) -> Result<RegisteredBundle> {
        let content = self.read_manifest(archive)?;
        Ok(RegisteredBundle {
            descriptor: ExtensionDescriptor::from_yaml(&content)?,
            archive: archive.to_path_buf(),
        })
    }

    /// Manifest text of one archive. The context is released before this
    /// returns.
    fn read_manifest(&self, archive: &Path) -> Result<String> {
        let mut context = LoadingContext::open(archive, Arc::clone(&self.catalog), &self.ledger)?;
        context.read_manifest()
    }

    fn candidates(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut archives = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && self.matches(&path) {
                archives.push(path);
            }
        }
        tracing::debug!(?archives, "Discovered bundle archives");
        archives.sort_by_key(|path| file_name(path));
        Ok(archives)
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&format!(".{}", self.archive_extension)))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> BundleScanner {
        BundleScanner::new(
            "jar",
            Arc::new(EntryPointCatalog::new()),
            ContextLedger::new(),
        )
    }

    #[test]
    fn test_missing_directory_is_created() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("extensions");

        let report = scanner().scan(&dir).unwrap();

        assert!(dir.is_dir());
        assert!(report.bundles.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(report.summary(), "Registered 0 extensions.");
    }

    #[test]
    fn test_non_matching_files_ignored() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("notes.txt"), "hello").unwrap();
        std::fs::create_dir(temp.path().join("folder.jar")).unwrap();

        let report = scanner().scan(temp.path()).unwrap();

        assert!(report.bundles.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_corrupt_archive_reported_not_fatal() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.jar"), "not a zip").unwrap();

        let report = scanner().scan(temp.path()).unwrap();

        assert_eq!(report.failures.len(), 1);
        let msg = report.failures[0].to_string();
        assert!(msg.starts_with("Skipping broken.jar - "), "{msg}");
        assert!(matches!(report.failures[0].error, Error::Archive(_)));
    }

    #[test]
    fn test_failed_open_does_not_leak_context() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.jar"), "not a zip").unwrap();
        let scanner = scanner();

        scanner.scan(temp.path()).unwrap();

        assert_eq!(scanner.ledger.open_count(), 0);
    }
}
