//! Build PDFs whose pages are full-page images

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

use super::save_document;
use crate::artifact::Artifact;
use crate::error::{ToolError, ToolResult};
use crate::imaging::encode::{decode_image, encode_jpeg};

/// One bitmap and the physical size of the page it fills
#[derive(Debug, Clone)]
pub struct PageImage {
    pub image: DynamicImage,
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageImage {
    /// One pixel per point
    pub fn at_72_dpi(image: DynamicImage) -> Self {
        let width_pt = image.width() as f32;
        let height_pt = image.height() as f32;
        Self {
            image,
            width_pt,
            height_pt,
        }
    }
}

/// How page bitmaps are stored inside the PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Raw RGB behind FlateDecode
    Lossless,
    /// DCTDecode at the given quality
    Jpeg(u8),
}

/// Operation: each uploaded image becomes one page, in upload order
pub fn images_to_pdf(uploads: &[Vec<u8>]) -> ToolResult<Artifact> {
    if uploads.is_empty() {
        return Err(ToolError::InvalidInput("No images provided".into()));
    }

    let pages = uploads
        .iter()
        .map(|bytes| decode_image(bytes).map(PageImage::at_72_dpi))
        .collect::<ToolResult<Vec<_>>>()?;

    let pdf = pages_to_pdf(&pages, ImageEncoding::Lossless)?;
    Ok(Artifact::pdf(pdf, "images.pdf"))
}

/// Lay out one image per page, each stretched over its page
pub fn pages_to_pdf(pages: &[PageImage], encoding: ImageEncoding) -> ToolResult<Vec<u8>> {
    if pages.is_empty() {
        return Err(ToolError::InvalidInput("No pages to write".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for page in pages {
        let image_id = doc.add_object(image_xobject(&page.image, encoding)?);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(page.width_pt),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(page.height_pt),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| ToolError::EncodeError(format!("Content stream: {}", e)))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let resources = Dictionary::from_iter(vec![(
            "XObject",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "Im0",
                Object::Reference(image_id),
            )])),
        )]);

        let page_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.width_pt),
                    Object::Real(page.height_pt),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(kids.len() as i64)),
        ("Kids", Object::Array(kids)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    save_document(&mut doc)
}

fn image_xobject(image: &DynamicImage, encoding: ImageEncoding) -> ToolResult<Stream> {
    let (filter, data) = match encoding {
        ImageEncoding::Lossless => {
            let rgb = image.to_rgb8();
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(rgb.as_raw())?;
            ("FlateDecode", encoder.finish()?)
        }
        ImageEncoding::Jpeg(quality) => ("DCTDecode", encode_jpeg(image, quality)?),
    };

    let dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(image.width() as i64)),
        ("Height", Object::Integer(image.height() as i64)),
        ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::Name(filter.as_bytes().to_vec())),
    ]);

    Ok(Stream::new(dict, data).with_compression(false))
}
