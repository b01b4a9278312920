//! Stamping an overlay onto every page
//!
//! The overlay becomes one Form XObject shared by all pages. Each page's
//! existing content is wrapped in `q`/`Q` so whatever transformation it
//! leaves behind cannot move the watermark, then the XObject is drawn on top.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::Result;
use crate::layout::PageGeometry;
use crate::pdf::document;
use crate::pdf::fonts::{self, FONT_RESOURCE};
use crate::pdf::watermark::{build_overlay, Overlay, WatermarkSpec, WatermarkStyle, IMAGE_RESOURCE};

/// Name the overlay XObject is registered under in page resources
///
/// A page stamped more than once gets `DocsuiteWatermark1`, `DocsuiteWatermark2`
/// and so on, so earlier layers keep their own entry.
pub const OVERLAY_RESOURCE: &str = "DocsuiteWatermark";

/// Watermark every page of a PDF
///
/// The overlay is computed from the first page's size and drawn unchanged on
/// all pages, so pages of a different size get it at the same coordinates.
pub fn watermark_pdf(bytes: &[u8], spec: &WatermarkSpec, style: &WatermarkStyle) -> Result<Vec<u8>> {
    let mut doc = document::load(bytes)?;
    let geometry = document::first_page_geometry(&doc)?;

    let overlay = build_overlay(geometry, spec, style)?;
    apply_overlay(&mut doc, &overlay)?;

    doc.compress();
    document::to_bytes(&mut doc)
}

/// Draw `overlay` on top of every page, returning the shared XObject id
pub fn apply_overlay(doc: &mut Document, overlay: &Overlay) -> Result<ObjectId> {
    let xobject_id = create_overlay_xobject(doc, overlay);

    let pages = document::page_ids(doc);
    let name = unused_xobject_name(doc, &pages);

    // Shared by all pages
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));
    let invoke_id = doc.add_object(Stream::new(
        Dictionary::new(),
        format!("q\n/{} Do\nQ\n", name).into_bytes(),
    ));

    for &page_id in &pages {
        add_xobject_to_page_resources(doc, page_id, &name, xobject_id)?;
        prepend_content_to_page(doc, page_id, save_id)?;
        append_content_to_page(doc, page_id, restore_id)?;
        append_content_to_page(doc, page_id, invoke_id)?;
    }

    debug!(pages = pages.len(), %name, blank = overlay.is_blank(), "stamped overlay");

    Ok(xobject_id)
}

/// Create the Form XObject holding the overlay drawing and its resources
fn create_overlay_xobject(doc: &mut Document, overlay: &Overlay) -> ObjectId {
    let mut resources = Dictionary::new();

    if overlay.text_placement().is_some() {
        let font_id = fonts::add_helvetica_bold(doc);
        let mut fonts = Dictionary::new();
        fonts.set(FONT_RESOURCE, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));
    }

    if let Some(ref image) = overlay.image {
        let image_id = image.add_to(doc);
        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_RESOURCE, Object::Reference(image_id));
        resources.set("XObject", Object::Dictionary(xobjects));
    }

    let gstates = overlay.ext_gstates();
    if !gstates.is_empty() {
        let mut ext_gstates = Dictionary::new();
        for (name, alpha) in gstates {
            let mut state = Dictionary::new();
            state.set("Type", Object::Name(b"ExtGState".to_vec()));
            state.set("ca", Object::Real(alpha));
            state.set("CA", Object::Real(alpha));
            ext_gstates.set(name, Object::Dictionary(state));
        }
        resources.set("ExtGState", Object::Dictionary(ext_gstates));
    }

    let PageGeometry { width, height } = overlay.geometry;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width),
            Object::Real(height),
        ]),
    );
    xobject_dict.set("Resources", Object::Dictionary(resources));

    // Stream::new sets Length, which small uncompressed streams need on save
    let xobject_stream = Stream::new(xobject_dict, overlay.content_stream().into_bytes());

    doc.add_object(Object::Stream(xobject_stream))
}

/// XObject names already present in a page's (possibly inherited) resources
fn page_xobject_names(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    document::inherited_attribute(doc, page_id, b"Resources")
        .and_then(|res| document::resolve_dict(doc, &res))
        .and_then(|res| res.get(b"XObject").ok().and_then(|xo| document::resolve_dict(doc, xo)))
        .map(|xobjects| xobjects.iter().map(|(name, _)| name.clone()).collect())
        .unwrap_or_default()
}

/// First overlay name that no page uses yet
fn unused_xobject_name(doc: &Document, pages: &[ObjectId]) -> String {
    let taken: Vec<Vec<u8>> = pages
        .iter()
        .flat_map(|&page_id| page_xobject_names(doc, page_id))
        .collect();

    let mut name = OVERLAY_RESOURCE.to_string();
    let mut n = 1;
    while taken.iter().any(|t| t.as_slice() == name.as_bytes()) {
        name = format!("{}{}", OVERLAY_RESOURCE, n);
        n += 1;
    }
    name
}

/// Add the overlay XObject to a page's Resources dictionary
///
/// Resources inherited from the page tree are copied onto the page first, so
/// sibling pages sharing them are left untouched.
fn add_xobject_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    xobject_id: ObjectId,
) -> Result<()> {
    let mut resources = document::inherited_attribute(doc, page_id, b"Resources")
        .and_then(|res| document::resolve_dict(doc, &res))
        .unwrap_or_default();

    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|xo| document::resolve_dict(doc, xo))
        .unwrap_or_default();

    xobjects.set(name, Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    if let Object::Dictionary(ref mut page_dict) = doc.get_object_mut(page_id)? {
        page_dict.set("Resources", Object::Dictionary(resources));
    }

    Ok(())
}

/// Prepend a content stream to a page's Contents
fn prepend_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    if let Object::Dictionary(ref mut page_dict) = doc.get_object_mut(page_id)? {
        let existing_content = page_dict.get(b"Contents").ok().cloned();

        let contents = match existing_content {
            Some(Object::Reference(content_id)) => vec![
                Object::Reference(new_content_id),
                Object::Reference(content_id),
            ],
            Some(Object::Array(mut content_array)) => {
                content_array.insert(0, Object::Reference(new_content_id));
                content_array
            }
            _ => vec![Object::Reference(new_content_id)],
        };
        page_dict.set("Contents", Object::Array(contents));
    }

    Ok(())
}

/// Append a content stream to a page's Contents, drawn on top of the rest
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    if let Object::Dictionary(ref mut page_dict) = doc.get_object_mut(page_id)? {
        let existing_content = page_dict.get(b"Contents").ok().cloned();

        let contents = match existing_content {
            Some(Object::Reference(content_id)) => vec![
                Object::Reference(content_id),
                Object::Reference(new_content_id),
            ],
            Some(Object::Array(mut content_array)) => {
                content_array.push(Object::Reference(new_content_id));
                content_array
            }
            _ => vec![Object::Reference(new_content_id)],
        };
        page_dict.set("Contents", Object::Array(contents));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::raster::tests::png_bytes;
    use crate::pdf::test_support::{nested_tree_pdf, page_widths, pdf_with_sizes};
    use crate::pdf::watermark::{ImageWatermark, TextWatermark};

    fn draft() -> WatermarkSpec {
        WatermarkSpec::Text(TextWatermark { content: "DRAFT".to_string() })
    }

    fn named_ref(doc: &Document, page_id: ObjectId, name: &str) -> ObjectId {
        let resources = document::inherited_attribute(doc, page_id, b"Resources").unwrap();
        let resources = document::resolve_dict(doc, &resources).unwrap();
        let xobjects = document::resolve_dict(doc, resources.get(b"XObject").unwrap()).unwrap();
        xobjects.get(name.as_bytes()).unwrap().as_reference().unwrap()
    }

    fn overlay_ref(doc: &Document, page_id: ObjectId) -> ObjectId {
        named_ref(doc, page_id, OVERLAY_RESOURCE)
    }

    /// Decoded drawing of the overlay registered as `name` on the first page
    fn saved_overlay_content(bytes: &[u8], name: &str) -> String {
        let doc = document::load(bytes).unwrap();
        let xobject_id = named_ref(&doc, document::page_ids(&doc)[0], name);
        let stream = doc.get_object(xobject_id).unwrap().as_stream().unwrap();
        String::from_utf8(stream.get_plain_content().unwrap()).unwrap()
    }

    fn stream_text(doc: &Document, id: ObjectId) -> String {
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        String::from_utf8(stream.get_plain_content().unwrap()).unwrap()
    }

    fn contents(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        page.get(b"Contents")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_reference().unwrap())
            .collect()
    }

    #[test]
    fn test_every_page_uses_same_xobject() {
        let output = watermark_pdf(
            &pdf_with_sizes(&[(612.0, 792.0); 3]),
            &draft(),
            &WatermarkStyle::default(),
        )
        .unwrap();

        let doc = document::load(&output).unwrap();
        let ids: Vec<ObjectId> = document::page_ids(&doc)
            .into_iter()
            .map(|page| overlay_ref(&doc, page))
            .collect();

        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    #[test]
    fn test_page_content_is_wrapped_and_overlay_drawn_last() {
        let mut doc = document::load(&pdf_with_sizes(&[(612.0, 792.0)])).unwrap();
        let overlay = build_overlay(PageGeometry::letter(), &draft(), &WatermarkStyle::default()).unwrap();
        apply_overlay(&mut doc, &overlay).unwrap();

        let page = document::page_ids(&doc)[0];
        let streams = contents(&doc, page);
        assert_eq!(streams.len(), 4);

        let text = |id: ObjectId| {
            let stream = doc.get_object(id).unwrap().as_stream().unwrap();
            String::from_utf8(stream.content.clone()).unwrap()
        };
        assert_eq!(text(streams[0]), "q\n");
        assert!(text(streams[1]).contains("(Page 1) Tj"));
        assert_eq!(text(streams[2]), "Q\n");
        assert_eq!(text(streams[3]), "q\n/DocsuiteWatermark Do\nQ\n");
    }

    #[test]
    fn test_overlay_xobject_resources() {
        let spec = WatermarkSpec::Combined {
            text: TextWatermark { content: "DRAFT".into() },
            image: ImageWatermark { bytes: png_bytes(20, 10, 255), content_type: Some("image/png".into()) },
        };
        let mut doc = document::load(&pdf_with_sizes(&[(595.0, 842.0)])).unwrap();
        let overlay = build_overlay(PageGeometry::a4(), &spec, &WatermarkStyle::default()).unwrap();
        let xobject_id = apply_overlay(&mut doc, &overlay).unwrap();

        let xobject = doc.get_object(xobject_id).unwrap().as_stream().unwrap();
        assert_eq!(xobject.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");

        let resources = xobject.dict.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
        assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(b"Im0"));

        let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        let gs0 = states.get(b"GS0").unwrap().as_dict().unwrap();
        assert_eq!(gs0.get(b"ca").unwrap().as_float().unwrap(), 0.2);
        let gs1 = states.get(b"GS1").unwrap().as_dict().unwrap();
        assert_eq!(gs1.get(b"ca").unwrap().as_float().unwrap(), 0.18);
    }

    #[test]
    fn test_inherited_resources_are_copied_per_page() {
        let output = watermark_pdf(
            &nested_tree_pdf(2, (500.0, 700.0)),
            &draft(),
            &WatermarkStyle::default(),
        )
        .unwrap();

        let doc = document::load(&output).unwrap();
        assert_eq!(page_widths(&doc), vec![500.0, 500.0]);
        for page_id in document::page_ids(&doc) {
            let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
            let resources = document::resolve_dict(&doc, page.get(b"Resources").unwrap()).unwrap();
            // Original font survives next to the overlay
            assert!(resources.has(b"Font"));
            assert!(resources.has(b"XObject"));
        }
    }

    #[test]
    fn test_saved_text_overlay_keeps_drawing() {
        let spec = WatermarkSpec::Text(TextWatermark { content: "FIRST".to_string() });
        let output = watermark_pdf(&pdf_with_sizes(&[(612.0, 792.0)]), &spec, &WatermarkStyle::default()).unwrap();

        let content = saved_overlay_content(&output, OVERLAY_RESOURCE);
        assert!(content.contains("1 0 0 1 306 396 cm\n"), "{}", content);
        assert!(content.contains("0.7071 -0.7071 0.7071 0.7071 0 0 cm\n"), "{}", content);
        assert!(content.contains("/F1 55 Tf\n"), "{}", content);
        assert!(content.contains("<4649525354> Tj\n"), "{}", content);

        let doc = document::load(&output).unwrap();
        let page = document::page_ids(&doc)[0];
        let last = *contents(&doc, page).last().unwrap();
        assert_eq!(stream_text(&doc, last), "q\n/DocsuiteWatermark Do\nQ\n");
    }

    #[test]
    fn test_saved_image_overlay_keeps_drawing() {
        let spec = WatermarkSpec::Image(ImageWatermark {
            bytes: png_bytes(64, 32, 255),
            content_type: Some("image/png".into()),
        });
        let output = watermark_pdf(&pdf_with_sizes(&[(612.0, 792.0)]), &spec, &WatermarkStyle::default()).unwrap();

        let content = saved_overlay_content(&output, OVERLAY_RESOURCE);
        assert!(content.contains("/GS0 gs\n"), "{}", content);
        assert!(content.contains("367.2 0 0 183.6 "), "{}", content);
        assert!(content.contains("/Im0 Do\n"), "{}", content);
    }

    #[test]
    fn test_saved_combined_overlay_draws_image_under_text() {
        let spec = WatermarkSpec::Combined {
            text: TextWatermark { content: "DRAFT".into() },
            image: ImageWatermark { bytes: png_bytes(20, 10, 255), content_type: None },
        };
        let output = watermark_pdf(&pdf_with_sizes(&[(612.0, 792.0)]), &spec, &WatermarkStyle::default()).unwrap();

        let content = saved_overlay_content(&output, OVERLAY_RESOURCE);
        let image_at = content.find("/Im0 Do").unwrap();
        let text_at = content.find("/F1 55 Tf").unwrap();
        assert!(image_at < text_at, "{}", content);
        assert!(content.contains("1 0 0 1 306 396 cm\n"), "{}", content);
    }

    #[test]
    fn test_second_watermark_keeps_first_layer() {
        let text = |content: &str| WatermarkSpec::Text(TextWatermark { content: content.to_string() });
        let style = WatermarkStyle::default();

        let once = watermark_pdf(&pdf_with_sizes(&[(612.0, 792.0); 2]), &text("FIRST"), &style).unwrap();
        let twice = watermark_pdf(&once, &text("SECOND"), &style).unwrap();

        // FIRST and SECOND in hex
        assert!(saved_overlay_content(&twice, "DocsuiteWatermark").contains("<4649525354> Tj"));
        assert!(saved_overlay_content(&twice, "DocsuiteWatermark1").contains("<5345434F4E44> Tj"));

        let doc = document::load(&twice).unwrap();
        for page in document::page_ids(&doc) {
            assert_ne!(named_ref(&doc, page, "DocsuiteWatermark"), named_ref(&doc, page, "DocsuiteWatermark1"));

            let drawn: Vec<String> = contents(&doc, page).into_iter().map(|id| stream_text(&doc, id)).collect();
            let invocations = |name: &str| drawn.iter().filter(|s| s.contains(&format!("/{} Do", name))).count();
            assert_eq!(invocations("DocsuiteWatermark"), 1);
            assert_eq!(invocations("DocsuiteWatermark1"), 1);
        }
    }

    #[test]
    fn test_blank_watermark_keeps_pages() {
        let input = pdf_with_sizes(&[(612.0, 792.0), (612.0, 792.0)]);
        let output = watermark_pdf(&input, &WatermarkSpec::Blank, &WatermarkStyle::default()).unwrap();

        let doc = document::load(&output).unwrap();
        assert_eq!(document::page_count(&doc), 2);
    }

    #[test]
    fn test_mixed_page_sizes_use_first_page_geometry() {
        let input = pdf_with_sizes(&[(612.0, 792.0), (842.0, 595.0)]);
        let output = watermark_pdf(&input, &draft(), &WatermarkStyle::default()).unwrap();

        let doc = document::load(&output).unwrap();
        assert_eq!(page_widths(&doc), vec![612.0, 842.0]);

        let xobject_id = overlay_ref(&doc, document::page_ids(&doc)[1]);
        let xobject = doc.get_object(xobject_id).unwrap().as_stream().unwrap();
        let bbox = xobject.dict.get(b"BBox").unwrap().as_array().unwrap();
        assert_eq!(bbox[2].as_float().unwrap(), 612.0);
    }
}
