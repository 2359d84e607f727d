//! A configurable extension that records every hook call.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use exthost_core::{EntryPointCatalog, Extension, ExtensionContext, Hook, HookResult};

/// Ordered record of hook calls shared between a test and its extensions.
///
/// Entries read `"<extension>:<hook>"`, e.g. `"Core:on_enable"`. Construction
/// is recorded as `"new:<entry point>"` and drop as `"<extension>:drop"`.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// All entries so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Entries for one extension, with the `"<extension>:"` prefix removed.
    pub fn entries_for(&self, extension: &str) -> Vec<String> {
        let prefix = format!("{extension}:");
        self.entries()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Number of entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Which step a [`ScriptedExtension`] should fail at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Script {
    pub fail_construct: bool,
    pub fail_on: Option<Hook>,
}

impl Script {
    /// Succeed at every step.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Fail the constructor.
    pub fn fail_construct() -> Self {
        Self {
            fail_construct: true,
            fail_on: None,
        }
    }

    /// Fail the given hook.
    pub fn fail_on(hook: Hook) -> Self {
        Self {
            fail_construct: false,
            fail_on: Some(hook),
        }
    }
}

/// An extension whose hooks append to a [`Journal`] and fail on command.
#[derive(Debug)]
pub struct ScriptedExtension {
    journal: Journal,
    script: Script,
    name: Option<String>,
    data_dir: Option<PathBuf>,
}

impl ScriptedExtension {
    pub fn new(journal: Journal, script: Script) -> Self {
        Self {
            journal,
            script,
            name: None,
            data_dir: None,
        }
    }

    /// Export a scripted extension under `entry_point`. Every construction
    /// builds a fresh instance sharing `journal`.
    pub fn register(
        catalog: &mut EntryPointCatalog,
        entry_point: &str,
        journal: &Journal,
        script: Script,
    ) {
        let journal = journal.clone();
        let id = entry_point.to_string();
        catalog.register_factory(entry_point, "ScriptedExtension", move || {
            journal.record(format!("new:{id}"));
            if script.fail_construct {
                return Err(format!("{id} refused to construct").into());
            }
            Ok(Box::new(ScriptedExtension::new(journal.clone(), script)) as Box<dyn Extension>)
        });
    }

    /// Data directory received in `init`.
    pub fn data_dir(&self) -> Option<&PathBuf> {
        self.data_dir.as_ref()
    }

    fn step(&self, hook: Hook) -> HookResult {
        let name = self.name.as_deref().unwrap_or("?");
        self.journal.record(format!("{name}:{hook}"));
        if self.script.fail_on == Some(hook) {
            return Err(format!("{name} scripted {hook} failure").into());
        }
        Ok(())
    }
}

impl Extension for ScriptedExtension {
    fn init(&mut self, ctx: ExtensionContext) -> HookResult {
        self.name = Some(ctx.descriptor.name.clone());
        self.data_dir = Some(ctx.data_dir.clone());
        if !ctx.data_dir.is_dir() {
            return Err(format!("data directory {} missing", ctx.data_dir.display()).into());
        }
        self.step(Hook::Init)
    }

    fn on_load(&mut self) -> HookResult {
        self.step(Hook::Load)
    }

    fn on_enable(&mut self) -> HookResult {
        self.step(Hook::Enable)
    }

    fn on_disable(&mut self) -> HookResult {
        self.step(Hook::Disable)
    }
}

impl Drop for ScriptedExtension {
    fn drop(&mut self) {
        let name = self.name.as_deref().unwrap_or("?");
        self.journal.record(format!("{name}:drop"));
    }
}
