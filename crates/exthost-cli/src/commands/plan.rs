//! Plan command implementation
//!
//! Shows the order `load_all` would use without instantiating anything.

use colored::Colorize;

use exthost_core::ManagerConfig;

use super::inspection_manager;
use crate::error::Result;

/// Run the plan command
pub fn run_plan(config: &ManagerConfig) -> Result<()> {
    let mut manager = inspection_manager(config);
    let report = manager.scan()?;

    for failure in &report.failures {
        eprintln!("{} {}", "warning:".yellow().bold(), failure);
    }

    let plan = manager.plan();
    if plan.order.is_empty() && plan.cycles.is_empty() {
        println!("No extensions registered.");
        return Ok(());
    }

    println!("{}", "Load order".bold());
    for (position, name) in plan.order.iter().enumerate() {
        println!("  {:>3}. {}", position + 1, name.green());
    }

    if !plan.cycles.is_empty() {
        println!();
        println!("{}", "Dependency cycles (will not load)".red().bold());
        for cycle in &plan.cycles {
            println!("  {}", cycle.join(", "));
        }
    }
    Ok(())
}
