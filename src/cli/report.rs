//! Report commands

use std::path::{Path, PathBuf};

use colored::Colorize;
use log::debug;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::models::ScanResult;
use crate::report::{self, Fidelity, RenderedReport, ReportFormat};

/// Write a report for an archived scan
pub fn run(
    ctx: &CommandContext,
    scan: &str,
    format: ReportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let archive = ctx.archive()?;
    let result = archive.resolve(scan)?;
    debug!("Rendering {} report for {}", format, result.summary.scan_id);

    let dir = ctx.report_dir(None);
    let (path, rendered) = save(&result, format, output, &dir, ctx.report_title())?;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "scan_id": result.summary.scan_id,
                "path": path.display().to_string(),
                "requested": rendered.requested,
                "format": rendered.format,
                "mime_type": rendered.format.mime_type(),
                "bytes": rendered.bytes.len(),
                "degraded": rendered.fidelity.is_degraded(),
                "reasons": rendered.fidelity.reasons(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => println!("{} Wrote {}", "✓".green(), path.display()),
    }

    Ok(())
}

/// Render `result` and write it to `output`, or under `dir` with a generated name.
///
/// Degradation and format fallback are reported on stderr; the report is
/// written either way.
pub(crate) fn save(
    result: &ScanResult,
    format: ReportFormat,
    output: Option<&Path>,
    dir: &Path,
    title: Option<&str>,
) -> Result<(PathBuf, RenderedReport)> {
    let rendered = report::export(result, format, title);
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => dir.join(rendered.file_name(result)),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, &rendered.bytes)?;

    if rendered.format != rendered.requested {
        eprintln!(
            "{} {} report unavailable, wrote {} instead",
            "⚠".yellow(),
            rendered.requested,
            rendered.format
        );
    }
    if let Fidelity::Degraded(reasons) = &rendered.fidelity {
        eprintln!("{} {} report is incomplete:", "⚠".yellow(), rendered.format);
        for reason in reasons {
            eprintln!("  - {}", reason);
        }
    }

    Ok((path, rendered))
}
