//! Finding Catalog
//!
//! Static reference data: canonical description, remediation, CWE ids and
//! default severity per category, plus the payload sets and detection
//! signatures the test modules share. Read-only and shared by every session.

use crate::models::{Category, Severity, TestCategory};

/// Canonical reference data for one finding category
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub category: Category,
    pub title: &'static str,
    pub description: &'static str,
    pub remediation: &'static str,
    pub cwe: &'static [&'static str],
    pub default_severity: Severity,
    pub cvss: f32,
}

impl CatalogEntry {
    pub fn cwe_ids(&self) -> Vec<String> {
        self.cwe.iter().map(|c| c.to_string()).collect()
    }
}

static ENTRIES: [CatalogEntry; 7] = [
    CatalogEntry {
        category: Category::Xss,
        title: "Reflected Cross-Site Scripting",
        description: "User-controlled input is reflected into the response without output encoding, \
                      allowing script execution in the victim's browser.",
        remediation: "Encode all untrusted data for the HTML context it is written into, validate input \
                      against an allow-list, and deploy a restrictive Content-Security-Policy.",
        cwe: &["CWE-79"],
        default_severity: Severity::High,
        cvss: 7.1,
    },
    CatalogEntry {
        category: Category::SqlInjection,
        title: "SQL Injection",
        description: "Input is concatenated into a database query, letting an attacker alter the query \
                      structure and read or modify data.",
        remediation: "Use parameterized queries or prepared statements for every database call, apply \
                      least-privilege database accounts, and suppress database error details in responses.",
        cwe: &["CWE-89"],
        default_severity: Severity::Critical,
        cvss: 9.8,
    },
    CatalogEntry {
        category: Category::Csrf,
        title: "Missing Anti-CSRF Token",
        description: "A state-changing form can be submitted cross-site because it carries no \
                      unpredictable per-session token.",
        remediation: "Add a synchronizer token to every state-changing form, verify it server-side, and \
                      set session cookies with SameSite=Lax or Strict.",
        cwe: &["CWE-352"],
        default_severity: Severity::Medium,
        cvss: 6.5,
    },
    CatalogEntry {
        category: Category::SecurityHeaders,
        title: "Missing Security Header",
        description: "The response lacks an HTTP header that instructs browsers to enable a protection \
                      against a class of client-side attacks.",
        remediation: "Configure the web server or framework to emit the missing header on all HTML \
                      responses with a restrictive value.",
        cwe: &["CWE-693"],
        default_severity: Severity::Low,
        cvss: 3.7,
    },
    CatalogEntry {
        category: Category::FileUpload,
        title: "Unrestricted File Upload",
        description: "An upload form accepts files without restricting their type, which can allow \
                      uploading executable content to the server.",
        remediation: "Validate file type by content server-side, restrict extensions to an allow-list, \
                      store uploads outside the web root, and serve them with a safe Content-Type.",
        cwe: &["CWE-434"],
        default_severity: Severity::High,
        cvss: 8.1,
    },
    CatalogEntry {
        category: Category::PathTraversal,
        title: "Path Traversal",
        description: "A file path built from user input can escape the intended directory and expose \
                      arbitrary files.",
        remediation: "Resolve paths against a fixed base directory, reject '..' segments after \
                      canonicalization, and map user input to identifiers instead of file names.",
        cwe: &["CWE-22"],
        default_severity: Severity::High,
        cvss: 7.5,
    },
    CatalogEntry {
        category: Category::InfoDisclosure,
        title: "Information Disclosure",
        description: "The application reveals implementation details such as software versions that \
                      help an attacker select exploits.",
        remediation: "Remove version banners from Server and X-Powered-By headers and disable verbose \
                      error pages in production.",
        cwe: &["CWE-200"],
        default_severity: Severity::Low,
        cvss: 3.1,
    },
];

/// Look up the catalog entry for a category
pub fn entry(category: Category) -> &'static CatalogEntry {
    ENTRIES
        .iter()
        .find(|e| e.category == category)
        .unwrap_or(&ENTRIES[0])
}

/// All catalog entries
pub fn entries() -> &'static [CatalogEntry] {
    &ENTRIES
}

const XSS_PAYLOADS: &[&str] = &[
    "<script>alert('vs-xss')</script>",
    "\"><img src=x onerror=alert('vs-xss')>",
    "<svg/onload=alert('vs-xss')>",
    "'><body onload=alert('vs-xss')>",
    "javascript:alert('vs-xss')",
    "<iframe src=\"javascript:alert('vs-xss')\"></iframe>",
    "<details open ontoggle=alert('vs-xss')>",
];

const SQLI_PAYLOADS: &[&str] = &[
    "'",
    "' OR '1'='1",
    "1' OR '1'='1' --",
    "\" OR \"\"=\"",
    "1; DROP TABLE users --",
    "' UNION SELECT NULL,NULL --",
    "1 AND 1=CONVERT(int,@@version)",
];

/// Payloads offered to the test module of a category.
///
/// Categories that audit responses rather than inject input get none.
pub fn payloads(category: TestCategory) -> Vec<String> {
    let set: &[&str] = match category {
        TestCategory::Xss => XSS_PAYLOADS,
        TestCategory::Sqli => SQLI_PAYLOADS,
        TestCategory::Csrf | TestCategory::Headers | TestCategory::Upload => &[],
    };
    set.iter().map(|p| p.to_string()).collect()
}

/// Database error fragments that indicate an injectable query (lowercase)
pub const SQL_ERROR_SIGNATURES: &[&str] = &[
    "you have an error in your sql syntax",
    "warning: mysql",
    "unclosed quotation mark after the character string",
    "quoted string not properly terminated",
    "pg::syntaxerror",
    "postgresql query failed",
    "sqlite3::exception",
    "sqlite_error",
    "ora-01756",
    "microsoft ole db provider for sql server",
    "syntax error at or near",
];

/// Input names that count as an anti-CSRF token (lowercase substrings)
pub const CSRF_TOKEN_NAMES: &[&str] = &[
    "csrf",
    "xsrf",
    "_token",
    "authenticity_token",
    "__requestverificationtoken",
    "nonce",
];

/// A security header the header audit requires
#[derive(Debug, Clone, Copy)]
pub struct RequiredHeader {
    pub name: &'static str,
    pub severity: Severity,
    pub https_only: bool,
    pub purpose: &'static str,
}

pub const REQUIRED_HEADERS: &[RequiredHeader] = &[
    RequiredHeader {
        name: "content-security-policy",
        severity: Severity::Medium,
        https_only: false,
        purpose: "restricts script sources and mitigates XSS",
    },
    RequiredHeader {
        name: "x-frame-options",
        severity: Severity::Medium,
        https_only: false,
        purpose: "prevents clickjacking through framing",
    },
    RequiredHeader {
        name: "strict-transport-security",
        severity: Severity::Medium,
        https_only: true,
        purpose: "forces HTTPS on subsequent visits",
    },
    RequiredHeader {
        name: "x-content-type-options",
        severity: Severity::Low,
        https_only: false,
        purpose: "disables MIME type sniffing",
    },
    RequiredHeader {
        name: "referrer-policy",
        severity: Severity::Low,
        https_only: false,
        purpose: "limits URL leakage through the Referer header",
    },
];

/// Evidence templates for simulated detections; `{payload}` and `{param}` are
/// substituted.
pub fn evidence_patterns(category: Category) -> &'static [&'static str] {
    match category {
        Category::Xss => &[
            "Payload reflected unencoded in response body: ...<div class=\"results\">{payload}</div>...",
            "Parameter '{param}' echoed inside attribute value: value=\"{payload}\"",
        ],
        Category::SqlInjection => &[
            "You have an error in your SQL syntax near '{payload}' at line 1",
            "Unclosed quotation mark after the character string '{payload}'.",
            "Response length changed by 4812 bytes when '{param}' was set to {payload}",
        ],
        Category::Csrf => &[
            "<form method=\"post\" action=\"/account/update\"> contains no anti-CSRF token",
            "POST form without hidden token input; session cookie lacks SameSite attribute",
        ],
        Category::SecurityHeaders => &[
            "Response headers do not include {param}",
        ],
        Category::FileUpload => &[
            "<input type=\"file\" name=\"upload\"> has no accept restriction",
            "Server accepted shell.php.jpg with Content-Type application/x-php",
        ],
        Category::PathTraversal => &[
            "root:x:0:0:root:/root:/bin/bash returned for {param}={payload}",
        ],
        Category::InfoDisclosure => &[
            "Server header discloses version: {param}",
        ],
    }
}

/// Paths the simulated discovery reports, roughly ordered by crawl depth
pub const SIMULATED_PAGES: &[&str] = &[
    "/login",
    "/search?q=test",
    "/products?id=1",
    "/contact",
    "/profile?user=guest",
    "/upload",
    "/api/users?id=1",
    "/blog?page=2&sort=asc",
    "/admin",
    "/cart?item=42",
    "/download?file=report.pdf",
    "/feedback?msg=hello",
];
