//! Terminal output helpers.
//!
//! This module uses println! for CLI output, which is appropriate
//! for terminal user interfaces.

#![allow(clippy::disallowed_macros)]

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::audit::AccessPolicyRow;
use crate::cleanup::{CleanupReport, CleanupStatus, ResourceGroupRecord};
use crate::rotation::{BindingResult, RotationOutcome};

fn status_color(status: CleanupStatus) -> Color {
    match status {
        CleanupStatus::Deleted => Color::Red,
        CleanupStatus::MarkedForCleanup => Color::Yellow,
        CleanupStatus::SkippedCriticalResources | CleanupStatus::SkippedLocked => Color::Cyan,
        CleanupStatus::UnknownActivity => Color::DarkGrey,
        CleanupStatus::Failed => Color::Magenta,
    }
}

/// Colored status label.
pub fn status_colored(status: CleanupStatus) -> String {
    let label = status.as_str();
    match status {
        CleanupStatus::Deleted => label.red().bold().to_string(),
        CleanupStatus::MarkedForCleanup => label.yellow().to_string(),
        CleanupStatus::SkippedCriticalResources | CleanupStatus::SkippedLocked => {
            label.cyan().to_string()
        }
        CleanupStatus::UnknownActivity => label.dimmed().to_string(),
        CleanupStatus::Failed => label.magenta().bold().to_string(),
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::new(n).fg(Color::Cyan)).collect()
}

/// Table of cleanup report rows.
pub fn cleanup_table(records: &[ResourceGroupRecord]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&[
        "Subscription",
        "Resource Group",
        "Location",
        "Last Modified",
        "Days",
        "Status",
    ]));

    for record in records {
        table.add_row(vec![
            Cell::new(&record.subscription),
            Cell::new(&record.resource_group),
            Cell::new(&record.location),
            Cell::new(
                record
                    .last_modified
                    .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d").to_string()),
            ),
            Cell::new(
                record
                    .days_inactive
                    .map_or_else(|| "-".to_string(), |d| d.to_string()),
            ),
            Cell::new(record.status.as_str()).fg(status_color(record.status)),
        ]);
    }

    table
}

/// Table of flattened access policies.
pub fn access_policy_table(rows: &[AccessPolicyRow]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&["Vault", "RBAC", "Object ID", "Secrets", "Keys"]));

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.vault_name),
            Cell::new(if row.rbac_enabled { "yes" } else { "no" }),
            Cell::new(if row.object_id.is_empty() {
                "-"
            } else {
                row.object_id.as_str()
            }),
            Cell::new(&row.secret_permissions),
            Cell::new(&row.key_permissions),
        ]);
    }

    table
}

/// Print the cleanup table followed by per-status counts.
pub fn print_cleanup_summary(report: &CleanupReport) {
    if report.is_empty() {
        println!("{}", "No resource groups matched the cleanup criteria".dimmed());
        return;
    }

    println!("{}", cleanup_table(report.records()));
    println!();
    for (status, count) in report.summary() {
        println!("  {:<28} {}", status_colored(status), count);
    }
}

/// Print per-binding rotation results.
pub fn print_rotation_outcome(outcome: &RotationOutcome) {
    println!(
        "{} {}",
        "New secret version:".cyan().bold(),
        outcome.secret_version_id
    );
    for binding in &outcome.bindings {
        match &binding.result {
            BindingResult::Updated { restarted } => println!(
                "  {} {} ({}){}",
                "✓".green(),
                binding.app,
                binding.setting,
                if *restarted { ", restarted" } else { "" }
            ),
            BindingResult::Failed { error } => println!(
                "  {} {} ({}): {}",
                "✗".red(),
                binding.app,
                binding.setting,
                error.red()
            ),
        }
    }
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}
