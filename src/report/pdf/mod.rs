//! PDF report.
//!
//! The full layout is built from named steps. Optional steps (analysis and
//! screenshots) degrade the document when they fail instead of aborting it.
//! If a required step fails, a minimal single-section layout is attempted;
//! only when that fails too is generation reported as failed.

mod layout;

use anyhow::{Context, Result, ensure};
use log::{debug, warn};

use self::layout::{BLACK, Capture, Font, GREY, Layout, MARGIN, Rgb};
use super::{Fidelity, default_title};
use crate::error::ReportError;
use crate::models::{Finding, ScanResult, Severity};

/// A finished, validated PDF
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    pub fidelity: Fidelity,
    pub pages: usize,
    pub findings_listed: usize,
}

/// Inputs shared by every layout step
struct Page<'a> {
    result: &'a ScanResult,
    title: &'a str,
}

type Step = fn(&mut Layout, &Page<'_>, &mut Vec<String>) -> Result<()>;

const REQUIRED_STEPS: [(&str, Step); 3] = [
    ("cover", cover),
    ("summary", summary),
    ("findings", findings),
];

const OPTIONAL_STEPS: [(&str, Step); 2] = [("ai-analysis", analysis), ("screenshots", screenshots)];

pub fn render_pdf(result: &ScanResult) -> std::result::Result<PdfDocument, ReportError> {
    render_pdf_titled(result, &default_title(result))
}

pub fn render_pdf_titled(
    result: &ScanResult,
    title: &str,
) -> std::result::Result<PdfDocument, ReportError> {
    let page = Page { result, title };
    match full_layout(&page) {
        Ok(document) => Ok(document),
        Err(full_err) => {
            warn!("Full PDF layout failed, trying minimal layout: {:#}", full_err);
            let mut document = minimal_layout(&page).map_err(|minimal_err| {
                ReportError::GenerationFailed(format!(
                    "{:#}; minimal layout: {:#}",
                    full_err, minimal_err
                ))
            })?;
            document.fidelity = Fidelity::Degraded(vec![format!(
                "minimal layout used: {:#}",
                full_err
            )]);
            Ok(document)
        }
    }
}

fn full_layout(page: &Page<'_>) -> Result<PdfDocument> {
    let mut layout = Layout::new(page.title)?;
    let mut reasons = Vec::new();

    for (name, step) in REQUIRED_STEPS {
        step(&mut layout, page, &mut reasons).with_context(|| format!("{} step", name))?;
        debug!("PDF step {} done, {} pages", name, layout.page_count());
    }
    for (name, step) in OPTIONAL_STEPS {
        if let Err(e) = step(&mut layout, page, &mut reasons) {
            warn!("PDF step {} skipped: {:#}", name, e);
            reasons.push(format!("{} omitted: {:#}", name, e));
        }
    }

    seal(layout, page, Fidelity::from_reasons(reasons))
}

/// Cover line, severity counts and one line per finding
fn minimal_layout(page: &Page<'_>) -> Result<PdfDocument> {
    let result = page.result;
    let mut layout = Layout::new(page.title)?;
    layout.line(page.title, Font::Bold, 16.0, BLACK)?;
    layout.line(&counts_line(result), Font::Regular, 10.0, BLACK)?;
    layout.gap(8.0);
    for finding in result.findings_by_severity() {
        let line = format!(
            "[{}] {} {} {}",
            finding.severity.label(),
            finding.id,
            finding.title,
            finding.location
        );
        let line: String = line.chars().take(110).collect();
        layout.line(&line, Font::Regular, 8.0, BLACK)?;
        layout.record_finding();
    }
    seal(layout, page, Fidelity::Full).context("minimal layout")
}

fn seal(layout: Layout, page: &Page<'_>, fidelity: Fidelity) -> Result<PdfDocument> {
    let pages = layout.page_count();
    let findings_listed = layout.findings_listed();
    ensure!(
        findings_listed == page.result.findings.len(),
        "{} of {} findings written",
        findings_listed,
        page.result.findings.len()
    );
    let bytes = layout.finish()?;
    layout::validate(&bytes, pages).context("validating document")?;
    Ok(PdfDocument {
        bytes,
        fidelity,
        pages,
        findings_listed,
    })
}

fn counts_line(result: &ScanResult) -> String {
    let parts: Vec<String> = Severity::DESCENDING
        .iter()
        .map(|s| format!("{} {}", s.label(), result.summary.count(*s)))
        .collect();
    format!("{} findings: {}", result.summary.total, parts.join(", "))
}

fn severity_color(severity: Severity) -> Rgb {
    match severity {
        Severity::Critical => Rgb(0.56, 0.11, 0.11),
        Severity::High => Rgb(0.85, 0.28, 0.06),
        Severity::Medium => Rgb(0.91, 0.64, 0.09),
        Severity::Low => Rgb(0.18, 0.5, 0.76),
        Severity::Info => Rgb(0.48, 0.53, 0.58),
    }
}

fn cover(layout: &mut Layout, page: &Page<'_>, _: &mut Vec<String>) -> Result<()> {
    let result = page.result;
    layout.gap(120.0);
    layout.paragraph(page.title, Font::Bold, 22.0, 0.0)?;
    layout.line(&result.target_host(), Font::Regular, 16.0, GREY)?;
    layout.gap(20.0);
    for (label, value) in [
        ("Target", result.config.target_url.clone()),
        ("Mode", result.summary.mode.to_string()),
        (
            "Started",
            result.summary.start_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
        ("Duration", format!("{}s", result.summary.duration_secs())),
        ("Scan id", result.summary.scan_id.clone()),
    ] {
        layout.line(&format!("{}: {}", label, value), Font::Regular, 11.0, BLACK)?;
    }
    layout.new_page()
}

fn summary(layout: &mut Layout, page: &Page<'_>, _: &mut Vec<String>) -> Result<()> {
    let result = page.result;
    layout.line("Summary", Font::Bold, 18.0, BLACK)?;
    layout.gap(6.0);
    layout.line(
        &format!("{} findings in total", result.summary.total),
        Font::Regular,
        11.0,
        BLACK,
    )?;
    layout.gap(6.0);

    let max = Severity::DESCENDING
        .iter()
        .map(|s| result.summary.count(*s))
        .max()
        .unwrap_or(0)
        .max(1);
    for severity in Severity::DESCENDING {
        let count = result.summary.count(severity);
        let width = 300.0 * count as f32 / max as f32;
        layout.bar(MARGIN + 90.0, width.max(1.0), 10.0, severity_color(severity))?;
        layout.line(
            &format!("{:<9} {}", severity.label(), count),
            Font::Regular,
            10.0,
            BLACK,
        )?;
        layout.gap(4.0);
    }

    layout.gap(10.0);
    layout.line(
        &format!(
            "{} locations and {} parameters tested, about {} requests issued",
            result.summary.locations_tested,
            result.summary.parameters_tested,
            result.summary.requests_issued
        ),
        Font::Regular,
        9.0,
        GREY,
    )?;

    if let Some(server) = &result.server_info {
        layout.gap(10.0);
        let banner = server.server.as_deref().unwrap_or("unknown server");
        layout.line(
            &format!("Server: {} (HTTP {})", banner, server.status_code),
            Font::Regular,
            10.0,
            BLACK,
        )?;
    }
    if let Some(cert) = &result.certificate_info {
        layout.line(
            &format!(
                "HTTPS: {}, certificate verified: {}, HSTS: {}",
                cert.https,
                cert.verified,
                cert.hsts.as_deref().unwrap_or("not set")
            ),
            Font::Regular,
            10.0,
            BLACK,
        )?;
    }
    Ok(())
}

fn findings(layout: &mut Layout, page: &Page<'_>, _: &mut Vec<String>) -> Result<()> {
    let result = page.result;
    layout.gap(16.0);
    layout.line("Findings", Font::Bold, 18.0, BLACK)?;
    if result.findings.is_empty() {
        layout.line("No vulnerabilities found.", Font::Regular, 11.0, BLACK)?;
        return Ok(());
    }
    for finding in result.findings_by_severity() {
        finding_block(layout, finding)?;
    }
    Ok(())
}

fn finding_block(layout: &mut Layout, finding: &Finding) -> Result<()> {
    layout.gap(10.0);
    layout.reserve(60.0)?;
    layout.line(
        &format!("[{}] {}", finding.severity.label(), finding.title),
        Font::Bold,
        12.0,
        severity_color(finding.severity),
    )?;
    layout.line(
        &format!("{}  {}", finding.id, finding.category),
        Font::Regular,
        9.0,
        GREY,
    )?;
    layout.paragraph(&format!("Location: {}", finding.location), Font::Regular, 9.0, 0.0)?;
    if let Some(parameter) = &finding.parameter {
        layout.paragraph(&format!("Parameter: {}", parameter), Font::Regular, 9.0, 0.0)?;
    }
    if let Some(payload) = &finding.payload {
        layout.paragraph(&format!("Payload: {}", payload), Font::Regular, 9.0, 0.0)?;
    }
    layout.paragraph(&finding.description, Font::Regular, 9.0, 0.0)?;
    layout.paragraph(&format!("Evidence: {}", finding.evidence), Font::Regular, 8.0, 10.0)?;
    layout.paragraph(
        &format!("Remediation: {}", finding.remediation),
        Font::Regular,
        9.0,
        0.0,
    )?;
    layout.record_finding();
    Ok(())
}

fn analysis(layout: &mut Layout, page: &Page<'_>, _: &mut Vec<String>) -> Result<()> {
    let result = page.result;
    let Some(analysis) = &result.ai_analysis else {
        return Ok(());
    };
    layout.new_page()?;
    layout.line("Analysis", Font::Bold, 18.0, BLACK)?;
    layout.gap(6.0);
    layout.paragraph(&analysis.summary, Font::Regular, 10.0, 0.0)?;
    layout.gap(6.0);
    for (i, step) in analysis.remediation.iter().enumerate() {
        layout.paragraph(&format!("{}. {}", i + 1, step), Font::Regular, 10.0, 0.0)?;
    }
    layout.gap(6.0);
    layout.line(
        &format!("Generated by {}", analysis.generated_by),
        Font::Regular,
        8.0,
        GREY,
    )
}

/// Embed JPEG captures; other references are listed by name and noted as a
/// degradation
fn screenshots(layout: &mut Layout, page: &Page<'_>, reasons: &mut Vec<String>) -> Result<()> {
    let result = page.result;
    let captured: Vec<(&Finding, &str)> = result
        .findings
        .iter()
        .filter_map(|f| f.screenshot.as_deref().map(|s| (f, s)))
        .collect();
    if captured.is_empty() {
        return Ok(());
    }

    layout.new_page()?;
    layout.line("Evidence captures", Font::Bold, 18.0, BLACK)?;

    let mut skipped = 0;
    for (finding, reference) in captured {
        layout.gap(8.0);
        layout.line(&finding.id, Font::Bold, 10.0, BLACK)?;
        let image = std::fs::read(reference)
            .context("unreadable")
            .and_then(|data| Capture::from_jpeg(&data));
        match image {
            Ok(image) => layout.image(image)?,
            Err(e) => {
                debug!("Capture {} not embedded: {:#}", reference, e);
                skipped += 1;
                layout.paragraph(reference, Font::Regular, 9.0, 0.0)?;
            }
        }
    }
    if skipped > 0 {
        reasons.push(format!(
            "{} capture(s) listed by reference only, not embeddable as JPEG",
            skipped
        ));
    }
    Ok(())
}
