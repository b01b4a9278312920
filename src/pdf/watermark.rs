//! Watermark overlay construction
//!
//! A watermark is computed once, from the geometry of the document's first
//! page, as a list of drawing instructions. The resulting [`Overlay`] is then
//! stamped unchanged onto every page by [`crate::pdf::stamp`].
//!
//! Text is drawn diagonally across the page center:
//! - font size is `floor(sqrt(W² + H²) / 18)`
//! - the origin moves to `(W/2, H/2)` and rotates by -45°
//! - Helvetica-Bold text is centered on that origin, semi-transparent
//!
//! Images are fit inside a centered box of 60% of the page width and height,
//! keeping their aspect ratio.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::{fmt_num, PageGeometry, Rect, TransformMatrix, WATERMARK_ROTATION_DEGREES};
use crate::pdf::fonts::{self, FONT_RESOURCE};
use crate::pdf::raster::PreparedImage;

/// Resource name of the watermark image inside the overlay
pub const IMAGE_RESOURCE: &str = "Im0";

/// Text watermark content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWatermark {
    pub content: String,
}

/// Uploaded watermark image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWatermark {
    pub bytes: Vec<u8>,
    /// MIME type reported by the client, if any
    pub content_type: Option<String>,
}

impl ImageWatermark {
    /// Whether the upload claims to be an image (missing type is accepted)
    pub fn is_image(&self) -> bool {
        !self.bytes.is_empty()
            && self
                .content_type
                .as_deref()
                .map_or(true, |ct| ct.starts_with("image/"))
    }
}

/// What to draw as the watermark
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkSpec {
    /// Nothing to draw; the overlay is empty
    Blank,
    Text(TextWatermark),
    Image(ImageWatermark),
    /// Image underneath, text on top
    Combined {
        text: TextWatermark,
        image: ImageWatermark,
    },
}

impl WatermarkSpec {
    /// Select the variant from whichever request fields carry content
    ///
    /// Whitespace-only text and uploads that are not images count as absent.
    pub fn from_parts(text: Option<String>, image: Option<ImageWatermark>) -> Self {
        let text = text
            .filter(|t| !t.trim().is_empty())
            .map(|content| TextWatermark { content });
        let image = image.filter(ImageWatermark::is_image);

        match (text, image) {
            (None, None) => WatermarkSpec::Blank,
            (Some(text), None) => WatermarkSpec::Text(text),
            (None, Some(image)) => WatermarkSpec::Image(image),
            (Some(text), Some(image)) => WatermarkSpec::Combined { text, image },
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, WatermarkSpec::Blank)
    }

    fn text(&self) -> Option<&TextWatermark> {
        match self {
            WatermarkSpec::Text(text) | WatermarkSpec::Combined { text, .. } => Some(text),
            _ => None,
        }
    }

    fn image(&self) -> Option<&ImageWatermark> {
        match self {
            WatermarkSpec::Image(image) | WatermarkSpec::Combined { image, .. } => Some(image),
            _ => None,
        }
    }
}

/// Tunable watermark appearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkStyle {
    /// Fill alpha of text watermarks (0.0 - 1.0)
    pub text_opacity: f32,
    /// Fill alpha of image watermarks (0.0 - 1.0)
    pub image_opacity: f32,
    /// Fail with `EmptyWatermark` instead of stamping a blank overlay
    pub reject_empty: bool,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            text_opacity: 0.18,
            image_opacity: 0.2,
            reject_empty: false,
        }
    }
}

impl WatermarkStyle {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("text_opacity", self.text_opacity), ("image_opacity", self.image_opacity)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "watermark.{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// One drawing instruction of an overlay
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    SaveState,
    RestoreState,
    /// Move the origin by `(x, y)`
    Translate { x: f32, y: f32 },
    /// Rotate the coordinate system about the current origin
    Rotate { degrees: f32 },
    SetFillAlpha(f32),
    /// Select Helvetica-Bold at `size` points
    SetFont { size: f32 },
    /// Draw text horizontally centered on the current origin, baseline at y = 0
    DrawCenteredText { text: String },
    /// Draw the overlay image into `rect`
    DrawImage { rect: Rect },
}

/// Where and how big the watermark text ends up on the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    /// Transform from text space origin to page space
    pub ctm: TransformMatrix,
    pub font_size: f32,
    /// Advance width of the drawn string in points
    pub width: f32,
}

/// A page-sized drawing holding only the watermark
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub geometry: PageGeometry,
    pub ops: Vec<DrawOp>,
    pub image: Option<PreparedImage>,
}

/// Build the overlay for pages of `geometry`
pub fn build_overlay(geometry: PageGeometry, spec: &WatermarkSpec, style: &WatermarkStyle) -> Result<Overlay> {
    if spec.is_blank() && style.reject_empty {
        return Err(Error::EmptyWatermark);
    }

    let mut ops = Vec::new();
    let mut prepared = None;

    if let Some(image) = spec.image() {
        let decoded = PreparedImage::decode(&image.bytes)?;
        let rect = geometry
            .watermark_image_box()
            .fit_centered(decoded.width as f32, decoded.height as f32);

        ops.push(DrawOp::SaveState);
        ops.push(DrawOp::SetFillAlpha(style.image_opacity));
        ops.push(DrawOp::DrawImage { rect });
        ops.push(DrawOp::RestoreState);
        prepared = Some(decoded);
    }

    if let Some(text) = spec.text() {
        let (cx, cy) = geometry.center();

        ops.push(DrawOp::SaveState);
        ops.push(DrawOp::SetFont { size: geometry.watermark_font_size() });
        ops.push(DrawOp::SetFillAlpha(style.text_opacity));
        ops.push(DrawOp::Translate { x: cx, y: cy });
        ops.push(DrawOp::Rotate { degrees: WATERMARK_ROTATION_DEGREES });
        ops.push(DrawOp::DrawCenteredText { text: text.content.clone() });
        ops.push(DrawOp::RestoreState);
    }

    Ok(Overlay { geometry, ops, image: prepared })
}

impl Overlay {
    /// Overlay with nothing to draw
    pub fn is_blank(&self) -> bool {
        self.ops.is_empty()
    }

    /// Distinct fill alphas used, in order of first use, with their
    /// ExtGState resource names
    pub fn ext_gstates(&self) -> Vec<(String, f32)> {
        let mut states: Vec<(String, f32)> = Vec::new();
        for op in &self.ops {
            if let DrawOp::SetFillAlpha(alpha) = *op {
                if !states.iter().any(|(_, a)| *a == alpha) {
                    states.push((format!("GS{}", states.len()), alpha));
                }
            }
        }
        states
    }

    /// Placement of the text watermark, if the overlay draws text
    pub fn text_placement(&self) -> Option<TextPlacement> {
        let mut ctm = TransformMatrix::identity();
        let mut font_size = 0.0;
        let mut stack = Vec::new();

        for op in &self.ops {
            match op {
                DrawOp::SaveState => stack.push((ctm, font_size)),
                DrawOp::RestoreState => {
                    if let Some((saved_ctm, saved_size)) = stack.pop() {
                        ctm = saved_ctm;
                        font_size = saved_size;
                    }
                }
                DrawOp::Translate { x, y } => ctm = TransformMatrix::translate(*x, *y).then(&ctm),
                DrawOp::Rotate { degrees } => ctm = TransformMatrix::rotate(*degrees).then(&ctm),
                DrawOp::SetFont { size } => font_size = *size,
                DrawOp::DrawCenteredText { text } => {
                    let width = fonts::text_width(&fonts::encode_win_ansi(text), font_size);
                    return Some(TextPlacement { ctm, font_size, width });
                }
                DrawOp::SetFillAlpha(_) | DrawOp::DrawImage { .. } => {}
            }
        }

        None
    }

    /// Render the drawing instructions as PDF content stream operators
    pub fn content_stream(&self) -> String {
        let gstates = self.ext_gstates();
        let mut content = String::new();
        let mut font_size = 0.0;

        for op in &self.ops {
            match op {
                DrawOp::SaveState => content.push_str("q\n"),
                DrawOp::RestoreState => content.push_str("Q\n"),
                DrawOp::Translate { x, y } => {
                    let m = TransformMatrix::translate(*x, *y);
                    content.push_str(&format!("{} cm\n", m.to_operands()));
                }
                DrawOp::Rotate { degrees } => {
                    let m = TransformMatrix::rotate(*degrees);
                    content.push_str(&format!("{} cm\n", m.to_operands()));
                }
                DrawOp::SetFillAlpha(alpha) => {
                    if let Some((name, _)) = gstates.iter().find(|(_, a)| a == alpha) {
                        content.push_str(&format!("/{} gs\n", name));
                    }
                }
                DrawOp::SetFont { size } => font_size = *size,
                DrawOp::DrawCenteredText { text } => {
                    let encoded = fonts::encode_win_ansi(text);
                    let width = fonts::text_width(&encoded, font_size);

                    content.push_str("0 g\n");
                    content.push_str("BT\n");
                    content.push_str(&format!("/{} {} Tf\n", FONT_RESOURCE, fmt_num(font_size)));
                    content.push_str(&format!("{} 0 Td\n", fmt_num(-width / 2.0)));
                    content.push_str(&format!("{} Tj\n", fonts::hex_string(&encoded)));
                    content.push_str("ET\n");
                }
                DrawOp::DrawImage { rect } => {
                    content.push_str(&format!(
                        "{} 0 0 {} {} {} cm\n",
                        fmt_num(rect.width),
                        fmt_num(rect.height),
                        fmt_num(rect.x),
                        fmt_num(rect.y)
                    ));
                    content.push_str(&format!("/{} Do\n", IMAGE_RESOURCE));
                }
            }
        }

        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::raster::tests::png_bytes;

    fn text_spec(content: &str) -> WatermarkSpec {
        WatermarkSpec::Text(TextWatermark { content: content.to_string() })
    }

    fn image_spec(width: u32, height: u32) -> WatermarkSpec {
        WatermarkSpec::Image(ImageWatermark {
            bytes: png_bytes(width, height, 255),
            content_type: Some("image/png".to_string()),
        })
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_from_parts_selects_variant() {
        let image = ImageWatermark { bytes: vec![1, 2, 3], content_type: Some("image/png".into()) };

        assert_eq!(WatermarkSpec::from_parts(None, None), WatermarkSpec::Blank);
        assert_eq!(WatermarkSpec::from_parts(Some("   ".into()), None), WatermarkSpec::Blank);
        assert!(matches!(
            WatermarkSpec::from_parts(Some("DRAFT".into()), None),
            WatermarkSpec::Text(_)
        ));
        assert!(matches!(
            WatermarkSpec::from_parts(None, Some(image.clone())),
            WatermarkSpec::Image(_)
        ));
        assert!(matches!(
            WatermarkSpec::from_parts(Some("DRAFT".into()), Some(image)),
            WatermarkSpec::Combined { .. }
        ));
    }

    #[test]
    fn test_from_parts_ignores_non_images() {
        let text_file = ImageWatermark {
            bytes: b"hello".to_vec(),
            content_type: Some("text/plain".into()),
        };
        assert_eq!(WatermarkSpec::from_parts(None, Some(text_file)), WatermarkSpec::Blank);

        let empty = ImageWatermark { bytes: vec![], content_type: None };
        assert_eq!(WatermarkSpec::from_parts(None, Some(empty)), WatermarkSpec::Blank);
    }

    #[test]
    fn test_text_overlay_ops() {
        let overlay = build_overlay(PageGeometry::letter(), &text_spec("DRAFT"), &WatermarkStyle::default()).unwrap();

        assert_eq!(
            overlay.ops,
            vec![
                DrawOp::SaveState,
                DrawOp::SetFont { size: 55.0 },
                DrawOp::SetFillAlpha(0.18),
                DrawOp::Translate { x: 306.0, y: 396.0 },
                DrawOp::Rotate { degrees: -45.0 },
                DrawOp::DrawCenteredText { text: "DRAFT".to_string() },
                DrawOp::RestoreState,
            ]
        );
        assert!(overlay.image.is_none());
    }

    #[test]
    fn test_text_origin_is_page_center() {
        for (w, h) in [(612.0, 792.0), (595.0, 842.0), (1000.0, 300.0), (1.0, 1.0), (7.5, 4321.0)] {
            let geometry = PageGeometry::new(w, h);
            let overlay = build_overlay(geometry, &text_spec("X"), &WatermarkStyle::default()).unwrap();
            let placement = overlay.text_placement().unwrap();

            let (x, y) = placement.ctm.apply(0.0, 0.0);
            assert!(close(x, w / 2.0), "x {} for {}x{}", x, w, h);
            assert!(close(y, h / 2.0), "y {} for {}x{}", y, w, h);
            assert_eq!(placement.font_size, geometry.watermark_font_size());
        }
    }

    #[test]
    fn test_text_is_centered_on_origin() {
        let overlay = build_overlay(PageGeometry::letter(), &text_spec("CONFIDENTIAL"), &WatermarkStyle::default()).unwrap();
        let placement = overlay.text_placement().unwrap();

        // Start and end of the baseline are symmetric around the page center
        let (sx, sy) = placement.ctm.apply(-placement.width / 2.0, 0.0);
        let (ex, ey) = placement.ctm.apply(placement.width / 2.0, 0.0);
        assert!(close((sx + ex) / 2.0, 306.0));
        assert!(close((sy + ey) / 2.0, 396.0));

        // -45 degrees: reading direction runs down to the right
        assert!(ex > sx);
        assert!(ey < sy);
    }

    #[test]
    fn test_long_text_is_not_shrunk() {
        let long = "WATERMARK ".repeat(20);
        let overlay = build_overlay(PageGeometry::letter(), &text_spec(&long), &WatermarkStyle::default()).unwrap();
        let placement = overlay.text_placement().unwrap();
        assert_eq!(placement.font_size, 55.0);
        assert!(placement.width > PageGeometry::letter().diagonal());
    }

    #[test]
    fn test_text_content_stream() {
        let overlay = build_overlay(PageGeometry::letter(), &text_spec("Hi"), &WatermarkStyle::default()).unwrap();
        let content = overlay.content_stream();

        assert!(content.starts_with("q\n/GS0 gs\n1 0 0 1 306 396 cm\n0.7071 -0.7071 0.7071 0.7071 0 0 cm\n"));
        assert!(content.contains("/F1 55 Tf\n"));
        // "Hi" = (722 + 278) / 1000 * 55 = 55pt wide, so it starts at -27.5
        assert!(content.contains("-27.5 0 Td\n"));
        assert!(content.contains("<4869> Tj\n"));
        assert!(content.ends_with("ET\nQ\n"));
        assert_eq!(overlay.ext_gstates(), vec![("GS0".to_string(), 0.18)]);
    }

    #[test]
    fn test_image_overlay_is_fit_and_centered() {
        // 2:1 image on a letter page: box is 367.2 x 475.2, width-limited
        let overlay = build_overlay(PageGeometry::letter(), &image_spec(200, 100), &WatermarkStyle::default()).unwrap();

        let rect = overlay
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::DrawImage { rect } => Some(*rect),
                _ => None,
            })
            .unwrap();

        assert!(close(rect.width, 367.2));
        assert!(close(rect.height, 183.6));
        let (cx, cy) = rect.center();
        assert!(close(cx, 306.0));
        assert!(close(cy, 396.0));

        assert!(overlay.ops.contains(&DrawOp::SetFillAlpha(0.2)));
        assert!(overlay.image.is_some());
        assert!(overlay.text_placement().is_none());
        assert!(overlay.content_stream().contains("/Im0 Do\n"));
    }

    #[test]
    fn test_combined_draws_image_then_text() {
        let spec = WatermarkSpec::Combined {
            text: TextWatermark { content: "DRAFT".into() },
            image: ImageWatermark { bytes: png_bytes(10, 10, 255), content_type: None },
        };
        let overlay = build_overlay(PageGeometry::letter(), &spec, &WatermarkStyle::default()).unwrap();

        let image_at = overlay.ops.iter().position(|op| matches!(op, DrawOp::DrawImage { .. })).unwrap();
        let text_at = overlay.ops.iter().position(|op| matches!(op, DrawOp::DrawCenteredText { .. })).unwrap();
        assert!(image_at < text_at);

        let names: Vec<String> = overlay.ext_gstates().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["GS0", "GS1"]);
    }

    #[test]
    fn test_blank_overlay() {
        let overlay = build_overlay(PageGeometry::letter(), &WatermarkSpec::Blank, &WatermarkStyle::default()).unwrap();
        assert!(overlay.is_blank());
        assert_eq!(overlay.content_stream(), "");
    }

    #[test]
    fn test_blank_rejected_when_configured() {
        let style = WatermarkStyle { reject_empty: true, ..Default::default() };
        let result = build_overlay(PageGeometry::letter(), &WatermarkSpec::Blank, &style);
        assert!(matches!(result, Err(Error::EmptyWatermark)));
    }

    #[test]
    fn test_invalid_image_fails() {
        let spec = WatermarkSpec::Image(ImageWatermark { bytes: b"nope".to_vec(), content_type: None });
        let result = build_overlay(PageGeometry::letter(), &spec, &WatermarkStyle::default());
        assert!(matches!(result, Err(Error::InvalidImage(_))));
    }

    #[test]
    fn test_style_validation() {
        assert!(WatermarkStyle::default().validate().is_ok());
        let bad = WatermarkStyle { text_opacity: 1.5, ..Default::default() };
        assert!(matches!(bad.validate(), Err(Error::Config(_))));
    }
}
