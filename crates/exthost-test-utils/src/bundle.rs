//! Bundle archive fixtures.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use exthost_core::MANIFEST_FILENAME;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Builds one bundle archive: an optional `extension.yml` plus arbitrary
/// resources.
///
/// # Example
///
/// ```rust,no_run
/// use exthost_test_utils::BundleBuilder;
///
/// let dir = tempfile::TempDir::new().unwrap();
/// BundleBuilder::extension("Greeter", "com.example.Greeter")
///     .field("version", "2.1")
///     .list("ext-depend", &["Core"])
///     .write_in(dir.path(), "greeter.jar");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BundleBuilder {
    manifest: Option<String>,
    resources: Vec<(String, Vec<u8>)>,
}

impl BundleBuilder {
    /// An archive with no manifest at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A manifest with `name` and `main` set.
    pub fn extension(name: &str, main: &str) -> Self {
        Self::manifest(&format!("name: {name}\nmain: {main}\n"))
    }

    /// A manifest with verbatim YAML content.
    pub fn manifest(yaml: &str) -> Self {
        Self {
            manifest: Some(yaml.to_string()),
            resources: Vec::new(),
        }
    }

    /// Append `key: value` to the manifest.
    pub fn field(mut self, key: &str, value: &str) -> Self {
        let manifest = self.manifest.get_or_insert_with(String::new);
        manifest.push_str(&format!("{key}: {value}\n"));
        self
    }

    /// Append a YAML sequence under `key` to the manifest.
    pub fn list(mut self, key: &str, items: &[&str]) -> Self {
        let manifest = self.manifest.get_or_insert_with(String::new);
        manifest.push_str(&format!("{key}:\n"));
        for item in items {
            manifest.push_str(&format!("  - {item}\n"));
        }
        self
    }

    /// Add a non-manifest entry.
    pub fn resource(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.resources.push((name.to_string(), content.into()));
        self
    }

    /// Write the archive to `path`.
    pub fn write_to(&self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        if let Some(manifest) = &self.manifest {
            writer.start_file(MANIFEST_FILENAME, options).unwrap();
            writer.write_all(manifest.as_bytes()).unwrap();
        }
        for (name, content) in &self.resources {
            writer.start_file(name.as_str(), options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
        path.to_path_buf()
    }

    /// Write the archive as `dir/file_name`.
    pub fn write_in(&self, dir: &Path, file_name: &str) -> PathBuf {
        self.write_to(&dir.join(file_name))
    }
}

/// A temporary extensions directory.
pub struct ExtensionsDir {
    temp_dir: TempDir,
}

impl Default for ExtensionsDir {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionsDir {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `bundle` as `file_name` inside the directory.
    pub fn add(&self, file_name: &str, bundle: BundleBuilder) -> PathBuf {
        bundle.write_in(self.path(), file_name)
    }

    /// Write a file that is not a valid archive.
    pub fn add_garbage(&self, file_name: &str) -> PathBuf {
        let path = self.path().join(file_name);
        fs::write(&path, b"this is not a zip archive").unwrap();
        path
    }

    /// Delete a file from the directory.
    pub fn remove(&self, file_name: &str) {
        fs::remove_file(self.path().join(file_name)).unwrap();
    }
}
