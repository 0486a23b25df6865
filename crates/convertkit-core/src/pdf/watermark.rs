//! Diagonal text watermark
//!
//! Each page's existing content is wrapped in `q`/`Q` and a new stream draws
//! the text in translucent grey Helvetica, rotated 45 degrees about the page
//! centre. Resources are copied onto the page before the watermark font and
//! graphics state are added, so shared resource dictionaries are left alone.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::{inline_inherited_attributes, load_document, page_media_box, save_document};
use crate::artifact::Artifact;
use crate::error::{ToolError, ToolResult};

pub const DEFAULT_WATERMARK_TEXT: &str = "WATERMARK";

const FILL_GRAY: f32 = 0.5;
const OPACITY: f32 = 0.25;
const ANGLE_DEGREES: f32 = 45.0;

/// Vertical offset from baseline to the visual middle of capitals, per point of font size
const MIDLINE_RATIO: f32 = 0.36;

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

const DEFAULT_GLYPH_WIDTH: u16 = 556;

/// Encode for a WinAnsi simple font; characters outside Latin-1 become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Width of WinAnsi-encoded text in Helvetica at `font_size`
pub fn helvetica_text_width(encoded: &[u8], font_size: f32) -> f32 {
    let units: u32 = encoded
        .iter()
        .map(|&b| match b {
            0x20..=0x7E => HELVETICA_WIDTHS[(b - 0x20) as usize],
            _ => DEFAULT_GLYPH_WIDTH,
        } as u32)
        .sum();
    units as f32 * font_size / 1000.0
}

/// Operation: stamp `text` across every page
///
/// `text` is drawn as given; callers substitute [`DEFAULT_WATERMARK_TEXT`]
/// for missing input.
pub fn watermark_pdf(bytes: &[u8], text: &str) -> ToolResult<Artifact> {
    let mut doc = load_document(bytes)?;
    inline_inherited_attributes(&mut doc);

    let encoded = encode_win_ansi(text);
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let gs_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(OPACITY)),
        ("CA", Object::Real(OPACITY)),
    ]));
    let save_state_id = doc.add_object(Stream::new(Dictionary::new(), b"q".to_vec()));

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(ToolError::InvalidInput("PDF has no pages".into()));
    }

    for page_id in page_ids {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| ToolError::OperationError(format!("Page object: {}", e)))?;

        let mut resources = resolve_dictionary(&doc, page.get(b"Resources").ok());
        let mut fonts = resolve_dictionary(&doc, resources.get(b"Font").ok());
        let mut states = resolve_dictionary(&doc, resources.get(b"ExtGState").ok());
        let font_name = unused_name(&fonts, "CkWmFont");
        let gs_name = unused_name(&states, "CkWmGs");
        fonts.set(font_name.clone(), Object::Reference(font_id));
        states.set(gs_name.clone(), Object::Reference(gs_id));
        resources.set("Font", Object::Dictionary(fonts));
        resources.set("ExtGState", Object::Dictionary(states));

        let mut contents = vec![Object::Reference(save_state_id)];
        contents.extend(existing_contents(&doc, page));

        let stamp = stamp_content(
            page_media_box(&doc, page_id),
            &encoded,
            &font_name,
            &gs_name,
        )?;
        contents.push(Object::Reference(
            doc.add_object(Stream::new(Dictionary::new(), stamp)),
        ));

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| ToolError::OperationError(format!("Page object: {}", e)))?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
    }

    doc.compress();
    let data = save_document(&mut doc)?;
    Ok(Artifact::pdf(data, "watermarked.pdf"))
}

fn resolve_dictionary(doc: &Document, obj: Option<&Object>) -> Dictionary {
    match obj {
        Some(Object::Dictionary(dict)) => dict.clone(),
        Some(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

fn unused_name(dict: &Dictionary, prefix: &str) -> Vec<u8> {
    let mut index = 0;
    loop {
        let name = format!("{}{}", prefix, index).into_bytes();
        if !dict.has(&name) {
            return name;
        }
        index += 1;
    }
}

fn existing_contents(doc: &Document, page: &Dictionary) -> Vec<Object> {
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn stamp_content(
    media_box: (f32, f32, f32, f32),
    encoded: &[u8],
    font_name: &[u8],
    gs_name: &[u8],
) -> ToolResult<Vec<u8>> {
    let (llx, lly, urx, ury) = media_box;
    let (width, height) = (urx - llx, ury - lly);
    let font_size = width.min(height) / 8.0;

    let (sin, cos) = ANGLE_DEGREES.to_radians().sin_cos();
    let half_width = helvetica_text_width(encoded, font_size) / 2.0;
    let midline = font_size * MIDLINE_RATIO;
    let (cx, cy) = (llx + width / 2.0, lly + height / 2.0);
    let tx = cx - cos * half_width + sin * midline;
    let ty = cy - sin * half_width - cos * midline;

    let content = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.to_vec())]),
            Operation::new("g", vec![Object::Real(FILL_GRAY)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_name.to_vec()), Object::Real(font_size)],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Real(cos),
                    Object::Real(sin),
                    Object::Real(-sin),
                    Object::Real(cos),
                    Object::Real(tx),
                    Object::Real(ty),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encoded.to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };

    content
        .encode()
        .map_err(|e| ToolError::EncodeError(format!("Watermark content: {}", e)))
}
