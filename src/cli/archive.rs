//! Result archive management commands

use chrono::{DateTime, Local};
use colored::Colorize;
use dialoguer::Confirm;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::output::formatters::format_size;
use crate::output::table::format_properties;

/// Show archive statistics
pub fn status(ctx: &CommandContext) -> Result<()> {
    let stats = ctx.archive()?.stats()?;
    let path = ctx.archive_dir()?.display().to_string();

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "total_entries": stats.total_entries,
                "valid_entries": stats.valid_entries,
                "expired_entries": stats.expired_entries,
                "total_size_bytes": stats.total_size_bytes,
                "total_size_human": format_size(stats.total_size_bytes),
                "oldest_entry_timestamp": stats.oldest_entry,
                "newest_entry_timestamp": stats.newest_entry,
                "retention_days": ctx.config.retention.archive_days,
                "path": path,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            let mut rows = vec![
                ("Location", path),
                ("Scans", stats.valid_entries.to_string()),
                ("Expired", stats.expired_entries.to_string()),
                ("Total size", format_size(stats.total_size_bytes)),
                (
                    "Retention",
                    format!("{} days", ctx.config.retention.archive_days),
                ),
            ];
            if let Some(oldest) = stats.oldest_entry {
                rows.push(("Oldest entry", local_time(oldest)));
            }
            if let Some(newest) = stats.newest_entry {
                rows.push(("Newest entry", local_time(newest)));
            }

            println!("Archive Status");
            println!("{}", format_properties(&rows));
        }
    }

    Ok(())
}

/// Remove every archived scan, asking first unless `yes`
pub fn clear(ctx: &CommandContext, yes: bool) -> Result<()> {
    let archive = ctx.archive()?;

    if !yes {
        let stats = archive.stats()?;
        if stats.total_entries > 0 {
            eprintln!(
                "{} Remove {} archived scan(s)? Reports can no longer be generated for them.",
                "⚠".yellow(),
                stats.total_entries
            );
            let confirm = Confirm::new()
                .with_prompt("Clear the archive?")
                .default(false)
                .interact()?;

            if !confirm {
                eprintln!("Cancelled.");
                return Ok(());
            }
        }
    }

    let stats = archive.clear()?;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries_removed": stats.entries_removed,
                "success": true,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            if stats.entries_removed > 0 {
                println!("{} Cleared {} archived scans", "✓".green(), stats.entries_removed);
            } else {
                println!("Archive was already empty");
            }
        }
    }

    Ok(())
}

/// Print the archive directory
pub fn path(ctx: &CommandContext) -> Result<()> {
    println!("{}", ctx.archive_dir()?.display());
    Ok(())
}

fn local_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
