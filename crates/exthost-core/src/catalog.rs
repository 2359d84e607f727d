//! Entry-point catalog: the types a loading context can resolve.
//!
//! A manifest's `main` key names an entry point by a textual identifier. The
//! host registers every identifier it is willing to instantiate, together
//! with a constructor when the type implements [`Extension`]. Types exported
//! without a constructor resolve, but fail the contract check.
//!
//! # Example
//!
//! ```
//! use exthost_core::{EntryPointCatalog, Extension, ExtensionContext, HookResult};
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl Extension for Greeter {
//!     fn init(&mut self, _ctx: ExtensionContext) -> HookResult { Ok(()) }
//!     fn on_enable(&mut self) -> HookResult { Ok(()) }
//! }
//!
//! let mut catalog = EntryPointCatalog::new();
//! catalog.register::<Greeter>("com.example.Greeter");
//! assert!(catalog.get("com.example.Greeter").unwrap().is_extension());
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::contract::{Extension, HookError};
use crate::error::{Error, Result};

/// No-argument constructor for one extension type.
pub type ExtensionFactory =
    Box<dyn Fn() -> std::result::Result<Box<dyn Extension>, HookError>>;

/// A type visible to loading contexts under an entry-point identifier.
pub struct ExportedType {
    id: String,
    type_name: &'static str,
    factory: Option<ExtensionFactory>,
}

impl ExportedType {
    /// The entry-point identifier this type is exported under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rust type name of the exported type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the type implements the extension contract.
    pub fn is_extension(&self) -> bool {
        self.factory.is_some()
    }

    /// Verify the contract, then construct exactly one instance.
    pub fn instantiate(&self) -> Result<Box<dyn Extension>> {
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| Error::ContractViolation {
                entry_point: self.id.clone(),
                type_name: self.type_name.to_string(),
            })?;
        factory().map_err(|e| Error::Instantiation {
            entry_point: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for ExportedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedType")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("is_extension", &self.is_extension())
            .finish()
    }
}

/// Registry of entry points shared by every loading context.
#[derive(Debug, Default)]
pub struct EntryPointCatalog {
    types: HashMap<String, ExportedType>,
}

impl EntryPointCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Export an extension type constructed through `Default`.
    pub fn register<E>(&mut self, id: impl Into<String>)
    where
        E: Extension + Default + 'static,
    {
        self.register_factory(id, std::any::type_name::<E>(), || {
            Ok(Box::new(E::default()) as Box<dyn Extension>)
        });
    }

    /// Export an extension type with a fallible constructor.
    pub fn register_factory<F>(&mut self, id: impl Into<String>, type_name: &'static str, factory: F)
    where
        F: Fn() -> std::result::Result<Box<dyn Extension>, HookError> + 'static,
    {
        self.insert(id.into(), type_name, Some(Box::new(factory)));
    }

    /// Export a type that extensions may reference but that is not itself an
    /// extension. Naming it as `main` fails the contract check.
    pub fn register_type<T: 'static>(&mut self, id: impl Into<String>) {
        self.insert(id.into(), std::any::type_name::<T>(), None);
    }

    fn insert(&mut self, id: String, type_name: &'static str, factory: Option<ExtensionFactory>) {
        if self.types.contains_key(&id) {
            tracing::debug!(id = %id, "Replacing exported entry point");
        }
        self.types.insert(
            id.clone(),
            ExportedType {
                id,
                type_name,
                factory,
            },
        );
    }

    /// Look up an exported type by identifier.
    pub fn get(&self, id: &str) -> Option<&ExportedType> {
        self.types.get(id)
    }

    /// Whether an identifier is exported.
    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// All exported identifiers (sorted).
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.types.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of exported types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is exported.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
