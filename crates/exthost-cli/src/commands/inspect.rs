//! Inspect command implementation

use std::path::Path;

use colored::Colorize;

use exthost_core::{ExtensionDescriptor, ManagerConfig};

use super::inspection_manager;
use crate::error::{CliError, Result};

/// Run the inspect command
pub fn run_inspect(config: &ManagerConfig, archive: &Path, json: bool) -> Result<()> {
    if !archive.is_file() {
        return Err(CliError::user(format!(
            "Archive not found: {}",
            archive.display()
        )));
    }

    let manager = inspection_manager(config);
    let descriptor = manager.read_bundle(archive)?.descriptor;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
    } else {
        print_descriptor(&descriptor);
    }
    Ok(())
}

fn print_descriptor(descriptor: &ExtensionDescriptor) {
    println!("{}", descriptor.to_string().bold());
    println!();
    field("Name", &descriptor.name);
    field("Main", &descriptor.entry_point);
    field("Version", &descriptor.version);
    field("Author", &descriptor.author);
    field("Description", &descriptor.description);
    field("Website", &descriptor.website);
    list("Depend", &descriptor.plugin_depend);
    list("Softdepend", &descriptor.plugin_softdepend);
    list("Ext-depend", &descriptor.extension_depend);
    list("Ext-softdepend", &descriptor.extension_softdepend);
}

fn field(label: &str, value: &str) {
    if value.is_empty() {
        println!("  {:<15} {}", label.cyan(), "-".dimmed());
    } else {
        println!("  {:<15} {}", label.cyan(), value);
    }
}

fn list(label: &str, values: &[String]) {
    field(label, &values.join(", "));
}
