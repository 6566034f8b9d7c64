//! Plain-text to PDF layout.
//!
//! Lines are drawn top to bottom at a fixed left margin with a fixed line
//! height. When the cursor falls below the bottom margin the next line opens a
//! new page. Text is set in the standard Helvetica font, so only characters in
//! the WinAnsi range render; anything else is replaced with `?`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;

const A4_WIDTH_PT: f32 = 595.275_6;
const A4_HEIGHT_PT: f32 = 841.889_8;
const DEFAULT_MARGIN_PT: f32 = 40.0;
const DEFAULT_LINE_HEIGHT_PT: f32 = 15.0;
const DEFAULT_FONT_SIZE_PT: f32 = 12.0;
const FONT_RESOURCE_NAME: &str = "F1";
const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("input is not valid UTF-8 text: {0}")]
    Decode(#[from] std::str::Utf8Error),
    #[error("failed to encode PDF: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub line_height: f32,
    pub font_size: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageLayout {
    pub fn a4() -> Self {
        Self {
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            margin_left: DEFAULT_MARGIN_PT,
            margin_top: DEFAULT_MARGIN_PT,
            margin_bottom: DEFAULT_MARGIN_PT,
            line_height: DEFAULT_LINE_HEIGHT_PT,
            font_size: DEFAULT_FONT_SIZE_PT,
        }
    }

    fn top_cursor(&self) -> f32 {
        self.page_height - self.margin_top
    }

    /// Number of lines that fit on one page.
    pub fn lines_per_page(&self) -> usize {
        if self.line_height <= 0.0 {
            return usize::MAX;
        }
        let usable = self.top_cursor() - self.margin_bottom;
        if usable < 0.0 {
            return 1;
        }
        (usable / self.line_height).floor() as usize + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub line_count: usize,
}

/// Assigns every line a page and a baseline position. Always yields at least one page.
pub fn plan_pages(text: &str, layout: &PageLayout) -> Vec<Vec<PlacedLine>> {
    let top = layout.top_cursor();
    let mut pages = Vec::new();
    let mut current = Vec::new();
    let mut cursor = top;

    for line in split_lines(text) {
        if cursor < layout.margin_bottom && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
            cursor = top;
        }
        current.push(PlacedLine {
            x: layout.margin_left,
            y: cursor,
            text: line.trim().to_string(),
        });
        cursor -= layout.line_height;
    }

    pages.push(current);
    pages
}

/// Splits on `\n`, `\r\n` and a bare `\r`. A final line ending does not open an empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(end) => {
                lines.push(&rest[..end]);
                let width = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[end + width..];
            }
            None => {
                lines.push(rest);
                rest = "";
            }
        }
    }
    lines
}

pub fn render_text_pdf(input: &[u8], layout: &PageLayout) -> Result<RenderedPdf, LayoutError> {
    let text = std::str::from_utf8(input)?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let pages = plan_pages(text, layout);
    let line_count = pages.iter().map(Vec::len).sum();
    let page_count = pages.len();
    let bytes = encode_document(&pages, layout)?;
    Ok(RenderedPdf {
        bytes,
        page_count,
        line_count,
    })
}

fn encode_document(pages: &[Vec<PlacedLine>], layout: &PageLayout) -> Result<Vec<u8>, LayoutError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_RESOURCE_NAME => font_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page, layout),
        };
        let encoded = content
            .encode()
            .map_err(|error| LayoutError::Encode(error.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let page_tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(pages.len() as i64),
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(layout.page_width),
            Object::Real(layout.page_height),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|error| LayoutError::Encode(error.to_string()))?;
    Ok(bytes)
}

fn page_operations(lines: &[PlacedLine], layout: &PageLayout) -> Vec<Operation> {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    for line in lines.iter().filter(|line| !line.text.is_empty()) {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![FONT_RESOURCE_NAME.into(), Object::Real(layout.font_size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(line.x), Object::Real(line.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi_bytes(&line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    operations
}

fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| {
            if ch.is_control() {
                b' '
            } else {
                u8::try_from(u32::from(ch)).unwrap_or(b'?')
            }
        })
        .collect()
}
