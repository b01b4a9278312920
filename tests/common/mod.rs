//! PDF fixtures generated in memory

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// One page per `(width, height)`; page N shows the text "Page N"
pub fn pdf_with_sizes(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for (i, &(width, height)) in sizes.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 72 72 Td (Page {}) Tj ET\n", i + 1);
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to save fixture");
    bytes
}

/// `count` pages where page N is `100 + N` points wide
pub fn numbered_pdf(count: usize) -> Vec<u8> {
    let sizes: Vec<(f32, f32)> = (1..=count).map(|n| (100.0 + n as f32, 200.0)).collect();
    pdf_with_sizes(&sizes)
}

/// `count` US Letter pages
pub fn letter_pdf(count: usize) -> Vec<u8> {
    pdf_with_sizes(&vec![(612.0, 792.0); count])
}

/// MediaBox widths of every page, in order
pub fn page_widths(bytes: &[u8]) -> Vec<f32> {
    let doc = Document::load_mem(bytes).expect("Failed to load PDF");
    doc.get_pages()
        .values()
        .map(|&id| docsuite::pdf::document::media_box(&doc, id))
        .map(|[x1, _, x2, _]| x2 - x1)
        .collect()
}

/// Number of pages in a PDF
pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes).expect("Failed to load PDF").get_pages().len()
}

/// Solid red PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    let img = RgbImage::from_pixel(width, height, Rgb([220, 20, 20]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf.into_inner()
}

/// Decoded drawings of every watermark layer on page `page_index`, in resource order
pub fn watermark_layers(bytes: &[u8], page_index: usize) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("Failed to load PDF");
    let page_id = doc.get_pages().values().copied().nth(page_index).expect("Missing page");

    let resources = docsuite::pdf::document::inherited_attribute(&doc, page_id, b"Resources")
        .and_then(|res| docsuite::pdf::document::resolve_dict(&doc, &res))
        .expect("Page has no resources");
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|xo| docsuite::pdf::document::resolve_dict(&doc, xo))
        .expect("Page has no XObjects");

    xobjects
        .iter()
        .filter(|(name, _)| name.starts_with(b"DocsuiteWatermark"))
        .map(|(_, object)| {
            let id = object.as_reference().expect("XObject is not a reference");
            let stream = doc.get_object(id).and_then(Object::as_stream).expect("XObject is not a stream");
            String::from_utf8(stream.get_plain_content().expect("Failed to decode XObject"))
                .expect("Overlay is not UTF-8")
        })
        .collect()
}
