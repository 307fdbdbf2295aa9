//! HTML extraction shared by discovery and the form-auditing modules.
//!
//! `scraper::Html` is not `Send`, so parsing happens in these synchronous
//! helpers and only owned data crosses an `.await`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// One `<input>`, `<textarea>` or `<select>` in a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    /// Lowercased `type` attribute; "text" when absent
    pub kind: String,
    pub accept: Option<String>,
}

/// A form as it appears in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub action: Url,
    /// Uppercased method; GET when absent
    pub method: String,
    pub enctype: Option<String>,
    pub fields: Vec<FormField>,
    /// Opening tag, kept as evidence
    pub markup: String,
}

impl Form {
    pub fn is_post(&self) -> bool {
        self.method == "POST"
    }

    pub fn file_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|f| f.kind == "file")
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Absolute link targets found in `<a href>`, without fragments
pub fn links(base: &Url, body: &str) -> Vec<Url> {
    let Some(anchor) = selector("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(body);

    let mut out = Vec::new();
    for element in document.select(&anchor) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }
        if let Ok(mut url) = base.join(href) {
            url.set_fragment(None);
            if !out.contains(&url) {
                out.push(url);
            }
        }
    }
    out
}

/// Every form in the page, with action resolved against `base`
pub fn forms(base: &Url, body: &str) -> Vec<Form> {
    let (Some(form_sel), Some(field_sel)) = (
        selector("form"),
        selector("input[name], textarea[name], select[name]"),
    ) else {
        return Vec::new();
    };
    let document = Html::parse_document(body);

    document
        .select(&form_sel)
        .filter_map(|form| {
            let attrs = form.value();
            let action = match attrs.attr("action").map(str::trim) {
                Some(action) if !action.is_empty() => base.join(action).ok()?,
                _ => base.clone(),
            };
            let fields = form.select(&field_sel).map(field).collect();

            Some(Form {
                action,
                method: attrs.attr("method").unwrap_or("GET").trim().to_uppercase(),
                enctype: attrs.attr("enctype").map(str::to_string),
                fields,
                markup: opening_tag(&form),
            })
        })
        .collect()
}

fn field(element: ElementRef<'_>) -> FormField {
    let attrs = element.value();
    let kind = match attrs.name() {
        "input" => attrs.attr("type").unwrap_or("text").to_ascii_lowercase(),
        other => other.to_string(),
    };
    FormField {
        name: attrs.attr("name").unwrap_or_default().to_string(),
        kind,
        accept: attrs.attr("accept").map(str::to_string),
    }
}

fn opening_tag(element: &ElementRef<'_>) -> String {
    let html = element.html();
    match html.find('>') {
        Some(end) => html[..=end].to_string(),
        None => html,
    }
}

/// Same scheme, host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}
