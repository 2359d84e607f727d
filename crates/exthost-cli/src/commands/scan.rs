//! Scan command implementation

use colored::Colorize;
use serde_json::json;

use exthost_core::{ManagerConfig, ScanReport};

use super::inspection_manager;
use crate::error::Result;

/// Run the scan command
pub fn run_scan(config: &ManagerConfig, json: bool) -> Result<()> {
    let mut manager = inspection_manager(config);
    let report = manager.scan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scan_json(config, &report))?);
    } else {
        print_scan(config, &report);
    }
    Ok(())
}

fn scan_json(config: &ManagerConfig, report: &ScanReport) -> serde_json::Value {
    json!({
        "directory": config.extensions_dir.display().to_string(),
        "registered": report.bundles.iter()
            .map(|bundle| json!({
                "file": bundle.file_name(),
                "descriptor": bundle.descriptor,
            }))
            .collect::<Vec<_>>(),
        "failures": report.failures.iter()
            .map(|failure| json!({
                "file": failure.file_name(),
                "name": failure.name,
                "error": failure.error.to_string(),
            }))
            .collect::<Vec<_>>(),
    })
}

fn print_scan(config: &ManagerConfig, report: &ScanReport) {
    println!(
        "{} {}",
        "Extensions in".bold(),
        config.extensions_dir.display().to_string().yellow()
    );
    println!();

    for bundle in &report.bundles {
        println!(
            "  {} {} {}",
            "+".green().bold(),
            bundle.descriptor,
            format!("({})", bundle.file_name()).dimmed()
        );
    }
    for failure in &report.failures {
        println!("  {} {}", "-".red().bold(), failure);
    }

    if !report.bundles.is_empty() || !report.failures.is_empty() {
        println!();
    }
    println!("{}", report.summary());
}
