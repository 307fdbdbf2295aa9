//! Flowing A4 layout on top of `printpdf`.
//!
//! Coordinates are kept in points with a top-down cursor and converted to
//! millimetres when handed to `printpdf`. Text uses the built-in Helvetica
//! faces, so anything outside WinAnsi is written as a `\u{..}` escape.

use std::borrow::Cow;
use std::io::Cursor;

use anyhow::{Context, Result, anyhow, ensure};
use printpdf::image_crate::ImageDecoder;
use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocumentReference,
    PdfLayerReference, Pt, Rect,
};

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 50.0;

/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Upper bound on pages in one document
const MAX_PAGES: usize = 400;

const LAYER: &str = "Content";

/// Non-ASCII characters the WinAnsi encoding of the built-in fonts covers
/// besides Latin-1
const WIN_ANSI_EXTRAS: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

/// RGB fill colour, components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb(printpdf::Rgb::new(rgb.0, rgb.1, rgb.2, None))
    }
}

pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
pub const GREY: Rgb = Rgb(0.38, 0.43, 0.49);

fn mm(points: f32) -> Mm {
    Mm::from(Pt(points))
}

/// A decoded JPEG capture ready for embedding
pub struct Capture {
    pub width: u32,
    pub height: u32,
    image: Image,
}

impl Capture {
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        ensure!(data.starts_with(&[0xFF, 0xD8]), "not a JPEG image");
        let decoder = JpegDecoder::new(Cursor::new(data)).context("reading JPEG header")?;
        let (width, height) = decoder.dimensions();
        ensure!(width > 0 && height > 0, "JPEG has zero dimensions");
        let image = Image::try_from(decoder).context("decoding JPEG")?;
        Ok(Self {
            width,
            height,
            image,
        })
    }
}

/// Map text onto what the built-in fonts can show. Line breaks become
/// spaces; characters WinAnsi lacks are spelled out instead of dropped.
pub fn pdf_text(text: &str) -> Cow<'_, str> {
    let representable = |c: char| {
        (c.is_ascii() && !c.is_ascii_control())
            || ('\u{a0}'..='\u{ff}').contains(&c)
            || WIN_ANSI_EXTRAS.contains(c)
    };
    if text.chars().all(representable) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\n' | '\r' | '\t' => out.push(' '),
            c if representable(c) => out.push(c),
            c => out.push_str(&format!("\\u{{{:04x}}}", c as u32)),
        }
    }
    Cow::Owned(out)
}

/// Greedy word wrap by estimated glyph width. Words longer than a line are
/// split.
pub fn wrap(text: &str, size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (size * AVG_GLYPH_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    lines
}

/// Flowing layout over A4 pages with a top-down cursor
pub struct Layout {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    pages: usize,
    findings: usize,
    y: f32,
}

impl Layout {
    pub fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = printpdf::PdfDocument::new(
            pdf_text(title),
            mm(PAGE_WIDTH),
            mm(PAGE_HEIGHT),
            LAYER,
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("loading Helvetica: {:?}", e))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("loading Helvetica-Bold: {:?}", e))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            pages: 1,
            findings: 0,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Finding entries written so far
    pub fn findings_listed(&self) -> usize {
        self.findings
    }

    pub fn record_finding(&mut self) {
        self.findings += 1;
    }

    pub fn text_width(&self) -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN
    }

    pub fn new_page(&mut self) -> Result<()> {
        ensure!(self.pages < MAX_PAGES, "document exceeds {} pages", MAX_PAGES);
        let (page, layer) = self.doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.y = PAGE_HEIGHT - MARGIN;
        Ok(())
    }

    /// Make room for `height` points, breaking the page if needed
    pub fn reserve(&mut self, height: f32) -> Result<()> {
        if self.y - height < MARGIN {
            self.new_page()?;
        }
        Ok(())
    }

    pub fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    pub fn line(&mut self, text: &str, font: Font, size: f32, color: Rgb) -> Result<()> {
        self.line_at(MARGIN, text, font, size, color)
    }

    pub fn line_at(&mut self, x: f32, text: &str, font: Font, size: f32, color: Rgb) -> Result<()> {
        let leading = size * 1.35;
        self.reserve(leading)?;
        self.y -= leading;
        let face = match font {
            Font::Regular => &self.regular,
            Font::Bold => &self.bold,
        };
        self.layer.set_fill_color(color.into());
        self.layer
            .use_text(pdf_text(text), size, mm(x), mm(self.y), face);
        Ok(())
    }

    /// Wrapped paragraph at the left margin, offset by `indent`
    pub fn paragraph(&mut self, text: &str, font: Font, size: f32, indent: f32) -> Result<()> {
        for line in wrap(text, size, self.text_width() - indent) {
            self.line_at(MARGIN + indent, &line, font, size, BLACK)?;
        }
        Ok(())
    }

    /// Filled rectangle whose top edge sits at the cursor
    pub fn bar(&mut self, x: f32, width: f32, height: f32, color: Rgb) -> Result<()> {
        self.reserve(height)?;
        let y = self.y - height;
        self.layer.set_fill_color(color.into());
        self.layer
            .add_rect(Rect::new(mm(x), mm(y), mm(x + width), mm(y + height)));
        Ok(())
    }

    /// Place a capture scaled to the text width (never upscaled) and at most
    /// half a page tall
    pub fn image(&mut self, capture: Capture) -> Result<()> {
        let max_width = self.text_width();
        let max_height = (PAGE_HEIGHT - 2.0 * MARGIN) / 2.0;
        let scale = (max_width / capture.width as f32)
            .min(max_height / capture.height as f32)
            .min(1.0);
        let height = capture.height as f32 * scale;

        self.reserve(height)?;
        self.y -= height;
        // At 72 dpi one pixel is one point
        capture.image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(mm(MARGIN)),
                translate_y: Some(mm(self.y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(72.0),
                ..Default::default()
            },
        );
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| anyhow!("serializing document: {:?}", e))
    }
}

/// Structural check of a finished document: it must parse back and hold
/// the expected number of pages.
pub fn validate(bytes: &[u8], pages: usize) -> Result<()> {
    ensure!(bytes.starts_with(b"%PDF-1."), "missing PDF header");
    let parsed = printpdf::lopdf::Document::load_mem(bytes)
        .map_err(|e| anyhow!("document does not parse: {:?}", e))?;
    let found = parsed.get_pages().len();
    ensure!(
        found == pages,
        "document has {} pages, {} were laid out",
        found,
        pages
    );
    Ok(())
}
