//! Archived scan browsing

use crate::archive::ArchivedScan;
use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::models::display::HistoryDisplay;
use crate::output::json::format_json;
use crate::output::table::format_table_or;

/// List recently archived scans
pub fn list(ctx: &CommandContext, limit: usize) -> Result<()> {
    let scans: Vec<ArchivedScan> = ctx.archive()?.list(limit)?;

    if ctx.format == OutputFormat::Json {
        println!("{}", format_json(&scans)?);
        return Ok(());
    }

    let rows: Vec<HistoryDisplay> = scans.into_iter().map(HistoryDisplay::from).collect();
    println!(
        "{}",
        format_table_or(
            &rows,
            "No archived scans. Run `vulnscope scan <URL>` to create one."
        )
    );
    Ok(())
}

/// Show one archived scan
pub fn show(ctx: &CommandContext, scan: &str) -> Result<()> {
    let result = ctx.archive()?.resolve(scan)?;
    super::scan::print_result(&result, ctx.format)
}
