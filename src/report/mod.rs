//! Report compiler: renders a completed `ScanResult` as HTML, CSV or PDF.
//!
//! HTML and CSV rendering cannot fail. PDF rendering walks a ladder of named
//! steps and degrades instead of failing where it can; `export` adds a final
//! fallback from PDF to HTML so callers always get an artifact.

use std::fmt;

use log::warn;
use serde::Serialize;

use crate::models::ScanResult;

mod csv;
mod html;
mod pdf;

pub use self::csv::render_csv;
pub use self::html::{render_html, render_html_titled};
pub use self::pdf::{render_pdf, render_pdf_titled};

/// Output format of a report artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Html,
    Csv,
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Csv => "csv",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Csv => "text/csv; charset=utf-8",
            ReportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How complete a rendered artifact is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "fidelity", content = "reasons", rename_all = "lowercase")]
pub enum Fidelity {
    Full,
    /// Usable, but something was left out; one reason per omission
    Degraded(Vec<String>),
}

impl Fidelity {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Fidelity::Degraded(_))
    }

    pub fn reasons(&self) -> &[String] {
        match self {
            Fidelity::Full => &[],
            Fidelity::Degraded(reasons) => reasons,
        }
    }

    fn from_reasons(reasons: Vec<String>) -> Self {
        if reasons.is_empty() {
            Fidelity::Full
        } else {
            Fidelity::Degraded(reasons)
        }
    }
}

/// A report ready to be written out.
///
/// `format` is the format actually produced, which differs from the
/// requested one when PDF generation fell back to HTML.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub requested: ReportFormat,
    pub format: ReportFormat,
    pub bytes: Vec<u8>,
    pub fidelity: Fidelity,
}

impl RenderedReport {
    /// Conventional file name: `vulnscope-<host>-<start time>.<ext>`
    pub fn file_name(&self, result: &ScanResult) -> String {
        file_name(result, self.format)
    }
}

pub fn file_name(result: &ScanResult, format: ReportFormat) -> String {
    let host: String = result
        .target_host()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!(
        "vulnscope-{}-{}.{}",
        host,
        result.summary.start_time.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Title used when the caller does not configure one
pub fn default_title(result: &ScanResult) -> String {
    format!("Security scan report: {}", result.target_host())
}

/// Render `result` in `format`, falling back from PDF to HTML when no PDF
/// could be produced at all.
pub fn export(result: &ScanResult, format: ReportFormat, title: Option<&str>) -> RenderedReport {
    let html = || match title {
        Some(title) => render_html_titled(result, title),
        None => render_html(result),
    };
    match format {
        ReportFormat::Html => RenderedReport {
            requested: format,
            format,
            bytes: html().into_bytes(),
            fidelity: Fidelity::Full,
        },
        ReportFormat::Csv => RenderedReport {
            requested: format,
            format,
            bytes: render_csv(result).into_bytes(),
            fidelity: Fidelity::Full,
        },
        ReportFormat::Pdf => match title.map_or_else(
            || render_pdf(result),
            |title| render_pdf_titled(result, title),
        ) {
            Ok(document) => RenderedReport {
                requested: format,
                format,
                bytes: document.bytes,
                fidelity: document.fidelity,
            },
            Err(e) => {
                warn!("PDF generation failed, exporting HTML instead: {}", e);
                RenderedReport {
                    requested: format,
                    format: ReportFormat::Html,
                    bytes: html().into_bytes(),
                    fidelity: Fidelity::Degraded(vec![format!("PDF unavailable: {}", e)]),
                }
            }
        },
    }
}

/// Escape text for HTML element content and attribute values
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
