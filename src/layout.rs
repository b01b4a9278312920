//! Page geometry and transformation calculations
//!
//! All lengths are PDF points (1/72 inch). The coordinate system has its
//! origin at the bottom-left of the page with y growing upwards.

/// Divisor tying watermark glyph size to the page diagonal
pub const WATERMARK_FONT_DIVISOR: f32 = 18.0;

/// Rotation applied to text watermarks, in degrees
pub const WATERMARK_ROTATION_DEGREES: f32 = -45.0;

/// Share of page width and height available to image watermarks
pub const WATERMARK_IMAGE_BOX_RATIO: f32 = 0.6;

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self::new(mm_to_pt(210.0), mm_to_pt(297.0))
    }

    /// Geometry of a `[x1 y1 x2 y2]` MediaBox
    pub fn from_media_box(media_box: [f32; 4]) -> Self {
        Self::new(
            (media_box[2] - media_box[0]).abs(),
            (media_box[3] - media_box[1]).abs(),
        )
    }

    /// Page center `(width/2, height/2)`
    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Length of the page diagonal
    pub fn diagonal(&self) -> f32 {
        (self.width * self.width + self.height * self.height).sqrt()
    }

    /// Font size for a diagonal text watermark: `floor(diagonal / 18)`
    pub fn watermark_font_size(&self) -> f32 {
        (self.diagonal() / WATERMARK_FONT_DIVISOR).floor()
    }

    /// Box available to an image watermark (60% of each dimension)
    pub fn watermark_image_box(&self) -> Rect {
        let width = self.width * WATERMARK_IMAGE_BOX_RATIO;
        let height = self.height * WATERMARK_IMAGE_BOX_RATIO;
        Rect {
            x: (self.width - width) / 2.0,
            y: (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

/// Convert millimeters to points
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Axis-aligned rectangle, `(x, y)` is the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Largest rectangle with the given aspect ratio that fits inside this
    /// one, centered on this one's center
    ///
    /// Returns `self` unchanged when either content dimension is not positive.
    pub fn fit_centered(&self, content_width: f32, content_height: f32) -> Rect {
        if content_width <= 0.0 || content_height <= 0.0 {
            return *self;
        }

        let scale = (self.width / content_width).min(self.height / content_height);
        let width = content_width * scale;
        let height = content_height * scale;
        let (cx, cy) = self.center();

        Rect {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }
}

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl TransformMatrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// Translation by `(tx, ty)`
    pub fn translate(tx: f32, ty: f32) -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: tx, f: ty }
    }

    /// Counter-clockwise rotation by `degrees` (negative turns clockwise)
    pub fn rotate(degrees: f32) -> Self {
        let radians = degrees.to_radians();
        let (sin, cos) = radians.sin_cos();
        Self { a: cos, b: sin, c: -sin, d: cos, e: 0.0, f: 0.0 }
    }

    /// Compose so that `self` applies first, then `outer`
    ///
    /// This matches how a `cm` operator pre-multiplies the current matrix:
    /// after `outer cm` then `self cm`, user space maps through `self`
    /// followed by `outer`.
    pub fn then(&self, outer: &TransformMatrix) -> Self {
        Self {
            a: self.a * outer.a + self.b * outer.c,
            b: self.a * outer.b + self.b * outer.d,
            c: self.c * outer.a + self.d * outer.c,
            d: self.c * outer.b + self.d * outer.d,
            e: self.e * outer.a + self.f * outer.c + outer.e,
            f: self.e * outer.b + self.f * outer.d + outer.f,
        }
    }

    /// Map a point through this matrix
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Operands for a content stream `cm` operator
    pub fn to_operands(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            fmt_num(self.a),
            fmt_num(self.b),
            fmt_num(self.c),
            fmt_num(self.d),
            fmt_num(self.e),
            fmt_num(self.f)
        )
    }
}

/// Format a number for a content stream (no exponent notation)
pub fn fmt_num(value: f32) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    let text = format!("{:.4}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
