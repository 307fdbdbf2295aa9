//! Self-contained HTML report

use std::fmt::Write as _;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::{default_title, escape_html};
use crate::models::{Finding, ScanResult, Severity};

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2rem; color: #1f2933; }
h1 { margin-bottom: 0.2rem; }
.meta { color: #616e7c; margin-top: 0; }
.counts { display: flex; gap: 1rem; margin: 1rem 0 2rem; }
.count { padding: 0.6rem 1rem; border-radius: 6px; color: #fff; min-width: 6rem; }
.count strong { display: block; font-size: 1.6rem; }
.critical { background: #8e1b1b; } .high { background: #d9480f; }
.medium { background: #e8a317; } .low { background: #2f80c2; } .info { background: #7b8794; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.45rem; border-bottom: 1px solid #d9e2ec; vertical-align: top; }
td.evidence { font-family: monospace; white-space: pre-wrap; word-break: break-all; }
.badge { padding: 0.1rem 0.5rem; border-radius: 4px; color: #fff; font-size: 0.8rem; }
dl { display: grid; grid-template-columns: max-content auto; gap: 0.3rem 1rem; }
dt { font-weight: bold; }
figure img { max-width: 100%; border: 1px solid #d9e2ec; }
"#;

/// Render the result as a single HTML document.
///
/// Optional sections appear only when the result carries their data.
pub fn render_html(result: &ScanResult) -> String {
    render_html_titled(result, &default_title(result))
}

pub fn render_html_titled(result: &ScanResult, title: &str) -> String {
    let mut html = String::with_capacity(16 * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(title));
    let _ = writeln!(html, "<style>{}</style>\n</head>\n<body>", STYLE);

    let _ = writeln!(html, "<h1>{}</h1>", escape_html(title));
    let _ = writeln!(
        html,
        "<p class=\"meta\">Target <code>{}</code> &middot; {} scan &middot; started {} &middot; {}s &middot; scan id {}</p>",
        escape_html(&result.config.target_url),
        result.summary.mode,
        result.summary.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
        result.summary.duration_secs(),
        escape_html(&result.summary.scan_id),
    );

    summary_section(&mut html, result);
    findings_section(&mut html, result);

    if let Some(server) = &result.server_info {
        html.push_str("<section id=\"server-info\">\n<h2>Server</h2>\n<dl>\n");
        definition(&mut html, "Status", &server.status_code.to_string());
        if let Some(banner) = &server.server {
            definition(&mut html, "Server", banner);
        }
        if let Some(powered_by) = &server.powered_by {
            definition(&mut html, "Powered by", powered_by);
        }
        if let Some(content_type) = &server.content_type {
            definition(&mut html, "Content type", content_type);
        }
        definition(&mut html, "Response time", &format!("{} ms", server.response_time_ms));
        html.push_str("</dl>\n</section>\n");
    }

    if let Some(cert) = &result.certificate_info {
        html.push_str("<section id=\"certificate\">\n<h2>Transport security</h2>\n<dl>\n");
        definition(&mut html, "HTTPS", yes_no(cert.https));
        definition(&mut html, "Certificate verified", yes_no(cert.verified));
        definition(
            &mut html,
            "HSTS",
            cert.hsts.as_deref().unwrap_or("not set"),
        );
        if let Some(issuer) = &cert.issuer {
            definition(&mut html, "Issuer", issuer);
        }
        if let Some(expires) = cert.expires_at {
            definition(&mut html, "Expires", &expires.format("%Y-%m-%d").to_string());
        }
        html.push_str("</dl>\n</section>\n");
    }

    if let Some(analysis) = &result.ai_analysis {
        html.push_str("<section id=\"ai-analysis\">\n<h2>Analysis</h2>\n");
        let _ = writeln!(html, "<p>{}</p>", escape_html(&analysis.summary));
        if !analysis.remediation.is_empty() {
            html.push_str("<ol>\n");
            for step in &analysis.remediation {
                let _ = writeln!(html, "<li>{}</li>", escape_html(step));
            }
            html.push_str("</ol>\n");
        }
        let _ = writeln!(
            html,
            "<p class=\"meta\">Generated by {}</p>\n</section>",
            escape_html(&analysis.generated_by)
        );
    }

    if result.has_screenshots() || result.recording.is_some() {
        screenshots_section(&mut html, result);
    }

    if !result.issues.is_empty() {
        html.push_str("<section id=\"issues\">\n<h2>Scan issues</h2>\n<ul>\n");
        for issue in &result.issues {
            let _ = writeln!(
                html,
                "<li><strong>{}</strong>: {}</li>",
                escape_html(&issue.phase),
                escape_html(&issue.message)
            );
        }
        html.push_str("</ul>\n</section>\n");
    }

    let _ = writeln!(
        html,
        "<footer class=\"meta\">{} locations and {} parameters tested, about {} requests issued. Generated by vulnscope {}.</footer>",
        result.summary.locations_tested,
        result.summary.parameters_tested,
        result.summary.requests_issued,
        env!("CARGO_PKG_VERSION"),
    );
    html.push_str("</body>\n</html>\n");
    html
}

fn summary_section(html: &mut String, result: &ScanResult) {
    let summary = &result.summary;
    let _ = writeln!(
        html,
        "<section id=\"summary\">\n<h2>Summary</h2>\n<p>{} findings in total.</p>\n<div class=\"counts\">",
        summary.total
    );
    for severity in Severity::DESCENDING {
        let _ = writeln!(
            html,
            "<div class=\"count {sev}\" data-severity=\"{sev}\" data-count=\"{count}\"><strong>{count}</strong>{label}</div>",
            sev = severity,
            count = summary.count(severity),
            label = severity.label(),
        );
    }
    html.push_str("</div>\n</section>\n");
}

fn findings_section(html: &mut String, result: &ScanResult) {
    let _ = writeln!(
        html,
        "<section id=\"findings\" data-finding-count=\"{}\">\n<h2>Findings</h2>",
        result.findings.len()
    );

    if result.findings.is_empty() {
        html.push_str("<p>No vulnerabilities found.</p>\n</section>\n");
        return;
    }

    html.push_str(
        "<table>\n<thead>\n<tr><th>ID</th><th>Severity</th><th>Finding</th><th>Location</th><th>Evidence</th><th>Remediation</th></tr>\n</thead>\n<tbody>\n",
    );
    for finding in result.findings_by_severity() {
        finding_row(html, finding);
    }
    html.push_str("</tbody>\n</table>\n</section>\n");
}

fn finding_row(html: &mut String, finding: &Finding) {
    let mut location = format!("<code>{}</code>", escape_html(&finding.location));
    if let Some(parameter) = &finding.parameter {
        let _ = write!(location, "<br>parameter <code>{}</code>", escape_html(parameter));
    }
    if let Some(payload) = &finding.payload {
        let _ = write!(location, "<br>payload <code>{}</code>", escape_html(payload));
    }

    let mut detail = format!(
        "<strong>{}</strong><br>{}",
        escape_html(&finding.title),
        escape_html(&finding.description)
    );
    if !finding.cwe.is_empty() {
        let _ = write!(detail, "<br><small>{}</small>", escape_html(&finding.cwe_list()));
    }
    if let Some(cvss) = finding.cvss {
        let _ = write!(detail, " <small>CVSS {:.1}</small>", cvss);
    }

    let _ = writeln!(
        html,
        "<tr class=\"finding {sev}\" id=\"{id}\"><td>{id}</td><td><span class=\"badge {sev}\">{label}</span></td><td>{detail}</td><td>{location}</td><td class=\"evidence\">{evidence}</td><td>{remediation}</td></tr>",
        sev = finding.severity,
        id = escape_html(&finding.id),
        label = finding.severity.label(),
        detail = detail,
        location = location,
        evidence = escape_html(&finding.evidence),
        remediation = escape_html(&finding.remediation),
    );
}

fn screenshots_section(html: &mut String, result: &ScanResult) {
    html.push_str("<section id=\"screenshots\">\n<h2>Evidence captures</h2>\n");
    for finding in &result.findings {
        let Some(reference) = &finding.screenshot else {
            continue;
        };
        match embed_image(reference) {
            Some(data_uri) => {
                let _ = writeln!(
                    html,
                    "<figure><img src=\"{}\" alt=\"Capture for {id}\"><figcaption>{id}</figcaption></figure>",
                    data_uri,
                    id = escape_html(&finding.id),
                );
            }
            None => {
                let _ = writeln!(
                    html,
                    "<p>{}: <code>{}</code></p>",
                    escape_html(&finding.id),
                    escape_html(reference)
                );
            }
        }
    }
    if let Some(recording) = &result.recording {
        let _ = writeln!(html, "<p>Recording: <code>{}</code></p>", escape_html(recording));
    }
    html.push_str("</section>\n");
}

/// Data URI for a readable image file, if the reference is one
fn embed_image(reference: &str) -> Option<String> {
    let path = Path::new(reference);
    let mime = match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    let bytes = std::fs::read(path).ok()?;
    Some(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

fn definition(html: &mut String, term: &str, value: &str) {
    let _ = writeln!(
        html,
        "<dt>{}</dt><dd>{}</dd>",
        escape_html(term),
        escape_html(value)
    );
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
