//! Scan command

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};

use crate::archive;
use crate::cli::{CommandContext, OutputFormat, ScanArgs};
use crate::engine::{ScanEngine, SimulatedProfile};
use crate::error::{Result, ScanError};
use crate::models::ScanResult;
use crate::models::display::{FindingDisplay, SummaryView};
use crate::orchestrator::{Orchestrator, OrchestratorSettings, SessionId, SessionState, SessionStatus};
use crate::output::{Formattable, json};

/// How often the progress bar polls session status
const POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Run a scan to completion, then print, archive and export the result
pub async fn run(ctx: &CommandContext, args: &ScanArgs) -> Result<()> {
    let scan_config = args.to_scan_config(&ctx.config.defaults);
    // Reject bad input before building an engine
    scan_config.validate()?;

    let engine = if args.simulate {
        debug!("Using simulated engine");
        ScanEngine::simulated(SimulatedProfile::default())
    } else {
        ScanEngine::http(&ctx.config.http, capture_dir(ctx, args)?)?
    };

    let orchestrator = Orchestrator::new(engine, OrchestratorSettings::from_config(&ctx.config));
    let id = orchestrator.start(scan_config)?;
    let status = track(&orchestrator, &id, ctx.format != OutputFormat::Json).await?;

    match status.state {
        SessionState::Completed => {}
        SessionState::Cancelled => return Err(ScanError::Cancelled.into()),
        _ => {
            let reason = status
                .error
                .unwrap_or_else(|| format!("session ended in state {}", status.state));
            return Err(ScanError::Failed(reason).into());
        }
    }

    let result = orchestrator.result(&id)?;
    print_result(&result, ctx.format)?;

    if !args.no_archive {
        store(ctx, &result);
    }

    if !args.report.is_empty() {
        let dir = ctx.report_dir(args.out_dir.as_deref());
        for format in &args.report {
            let (path, _) =
                super::report::save(&result, *format, None, &dir, ctx.report_title())?;
            eprintln!("{} Wrote {}", "✓".green(), path.display());
        }
    }

    Ok(())
}

/// Print a completed result in the requested output format
pub(crate) fn print_result(result: &ScanResult, format: OutputFormat) -> Result<()> {
    let rows: Vec<FindingDisplay> = result
        .findings_by_severity()
        .into_iter()
        .map(FindingDisplay::from)
        .collect();

    match format {
        OutputFormat::Json => println!("{}", json::format_document(result)?),
        OutputFormat::Table => rows.print(format)?,
        OutputFormat::Pretty => {
            println!("{}", SummaryView::new(result).format_text());
            if !rows.is_empty() {
                println!();
                rows.print(format)?;
            }
        }
    }
    Ok(())
}

/// Poll the session until it finishes, cancelling it on Ctrl-C
async fn track(
    orchestrator: &Orchestrator,
    id: &SessionId,
    show_progress: bool,
) -> Result<SessionStatus> {
    let bar = if show_progress {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    } else {
        ProgressBar::hidden()
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancelling = false;
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = &mut ctrl_c, if !cancelling => {
                cancelling = true;
                if let Err(e) = signal {
                    warn!("Could not listen for Ctrl-C: {}", e);
                } else if orchestrator.cancel(id) {
                    bar.set_message("Cancelling after the current phase...");
                }
            }
        }

        let status = orchestrator.status(id)?;
        bar.set_position(u64::from(status.progress));
        if !cancelling {
            if let Some(message) = &status.phase_message {
                bar.set_message(message.clone());
            }
        }

        if status.state.is_terminal() {
            bar.finish_and_clear();
            return Ok(status);
        }
    }
}

fn capture_dir(ctx: &CommandContext, args: &ScanArgs) -> Result<PathBuf> {
    match &args.out_dir {
        Some(dir) => Ok(dir.join("captures")),
        None => Ok(ctx.archive_dir()?.join("captures")),
    }
}

/// Archive the result; failures are reported but do not fail the scan
fn store(ctx: &CommandContext, result: &ScanResult) {
    let stored = ctx.archive().and_then(|archive| {
        archive.put(result, archive::retention(ctx.config.retention.archive_days))?;
        let purged = archive.purge_expired()?;
        if purged.entries_removed > 0 {
            debug!("Purged {} expired archive entries", purged.entries_removed);
        }
        Ok(())
    });

    if let Err(e) = stored {
        warn!("Archiving {} failed: {}", result.summary.scan_id, e);
        eprintln!("{} Result not archived: {}", "⚠".yellow(), e);
    }
}
