//! Extension descriptor parsing for `extension.yml` files.
//!
//! Every bundle carries a manifest at its archive root describing the
//! extension it provides. The canonical filename is
//! [`MANIFEST_FILENAME`](crate::MANIFEST_FILENAME).
//!
//! # Example YAML
//!
//! ```yaml
//! name: Greeter
//! main: com.example.Greeter
//! version: 1.2.0
//! author: someone
//! description: Says hello
//! website: https://example.com
//!
//! depend: [Vault]
//! softdepend: [Essentials]
//! ext-depend: [CoreExt]
//! ext-softdepend: [OptionalExt]
//! ```
//!
//! Scalars are read leniently (`version: 1.0` is the string `"1.0"`) and
//! every string is trimmed. List keys that are absent or not sequences read
//! as empty lists.

use std::fmt;
use std::io::Read;

use serde::Serialize;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};

/// Version reported when the manifest does not declare one.
pub const DEFAULT_VERSION: &str = "1.0";

/// Immutable metadata declared by one extension bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionDescriptor {
    /// Extension name, unique within a registry.
    pub name: String,
    /// Entry-point identifier (`main`), resolved through the loading context.
    #[serde(rename = "main")]
    pub entry_point: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub website: String,
    /// Host plugins that must be active (`depend`).
    #[serde(rename = "depend")]
    pub plugin_depend: Vec<String>,
    /// Host plugins used when present (`softdepend`).
    #[serde(rename = "softdepend")]
    pub plugin_softdepend: Vec<String>,
    /// Extensions that must load first (`ext-depend`).
    #[serde(rename = "ext-depend")]
    pub extension_depend: Vec<String>,
    /// Extensions loaded first when present (`ext-softdepend`).
    #[serde(rename = "ext-softdepend")]
    pub extension_softdepend: Vec<String>,
}

impl ExtensionDescriptor {
    /// Parse a descriptor from a manifest stream.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::from_yaml(&content)
    }

    /// Parse a descriptor from manifest text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let root: YamlValue = serde_yaml::from_str(content)?;
        let empty = Mapping::new();
        let doc = match &root {
            YamlValue::Mapping(map) => map,
            YamlValue::Null => &empty,
            _ => {
                return Err(Error::validation(format!(
                    "{} must be a mapping of keys to values",
                    crate::MANIFEST_FILENAME
                )));
            }
        };

        let name = string_field(doc, "name", "");
        let entry_point = string_field(doc, "main", "");

        if entry_point.is_empty() {
            return Err(Error::validation(format!(
                "No 'main' specified in {}",
                crate::MANIFEST_FILENAME
            )));
        }
        if name.is_empty() {
            return Err(Error::validation(format!(
                "No 'name' specified in {}",
                crate::MANIFEST_FILENAME
            )));
        }
        validate_name(&name)?;

        Ok(Self {
            name,
            entry_point,
            version: string_field(doc, "version", DEFAULT_VERSION),
            author: string_field(doc, "author", ""),
            description: string_field(doc, "description", ""),
            website: string_field(doc, "website", ""),
            plugin_depend: list_field(doc, "depend"),
            plugin_softdepend: list_field(doc, "softdepend"),
            extension_depend: list_field(doc, "ext-depend"),
            extension_softdepend: list_field(doc, "ext-softdepend"),
        })
    }

    /// The `name` a manifest declares, if one can be read, even when the
    /// manifest as a whole is invalid.
    pub fn declared_name(content: &str) -> Option<String> {
        let root: YamlValue = serde_yaml::from_str(content).ok()?;
        let name = root.as_mapping()?.get("name").and_then(scalar_to_string)?;
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Extension names this descriptor orders itself after: hard dependencies
    /// first, then soft ones.
    pub fn extension_dependencies(&self) -> impl Iterator<Item = &str> {
        self.extension_depend
            .iter()
            .chain(&self.extension_softdepend)
            .map(String::as_str)
    }
}

impl fmt::Display for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)?;
        if !self.description.is_empty() {
            write!(f, " - {}", self.description)?;
        }
        if !self.author.is_empty() {
            write!(f, " (author: {})", self.author)?;
        }
        Ok(())
    }
}

/// The name doubles as the data directory name under the extensions root.
fn validate_name(name: &str) -> Result<()> {
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::validation(format!(
            "invalid extension name '{name}': must not be a path"
        )));
    }
    Ok(())
}

fn scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

fn string_field(doc: &Mapping, key: &str, default: &str) -> String {
    doc.get(key)
        .and_then(scalar_to_string)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .to_string()
}

fn list_field(doc: &Mapping, key: &str) -> Vec<String> {
    match doc.get(key) {
        Some(YamlValue::Sequence(items)) => items
            .iter()
            .filter_map(scalar_to_string)
            .map(|item| item.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}
