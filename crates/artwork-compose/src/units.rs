//! Canvas pixels, millimeters and PDF points
//!
//! Canvas space has its origin at the top-left with Y growing down. Page
//! space has its origin at the bottom-left with Y growing up. The flip
//! between the two lives in [`to_page_space`] and nowhere else.

use crate::constants::POINTS_PER_MM;
use crate::types::{PlacedElement, Template};

// =============================================================================
// Scalar Conversions
// =============================================================================

/// Horizontal canvas pixels to millimeters
#[inline]
pub fn mm_from_px_x(px: f32, template: &Template) -> f32 {
    px * template.width_mm / template.pixel_width
}

/// Vertical canvas pixels to millimeters
#[inline]
pub fn mm_from_px_y(px: f32, template: &Template) -> f32 {
    px * template.height_mm / template.pixel_height
}

#[inline]
pub fn px_from_mm_x(mm: f32, template: &Template) -> f32 {
    mm * template.pixel_width / template.width_mm
}

#[inline]
pub fn px_from_mm_y(mm: f32, template: &Template) -> f32 {
    mm * template.pixel_height / template.height_mm
}

/// Convert millimeters to points
#[inline]
pub fn pt_from_mm(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Convert points to millimeters
#[inline]
pub fn mm_from_pt(pt: f32) -> f32 {
    pt / POINTS_PER_MM
}

/// Flip a top-left anchored box into page space.
///
/// Returns the bottom-left corner of a box whose top-left corner is at
/// `(x_pt, y_pt)` measured from the top of a page `page_height_pt` tall.
#[inline]
pub fn to_page_space(x_pt: f32, y_pt: f32, h_pt: f32, page_height_pt: f32) -> (f32, f32) {
    (x_pt, page_height_pt - y_pt - h_pt)
}

/// Page size of a template in points
pub fn page_size_pt(template: &Template) -> (f32, f32) {
    (pt_from_mm(template.width_mm), pt_from_mm(template.height_mm))
}

/// Physical size of an element in millimeters
pub fn element_size_mm(element: &PlacedElement, template: &Template) -> (f32, f32) {
    (
        mm_from_px_x(element.width, template),
        mm_from_px_y(element.height, template),
    )
}

/// Box of an element in page space points.
pub fn element_box(element: &PlacedElement, template: &Template) -> Rect {
    let (_, page_height_pt) = page_size_pt(template);
    let x_pt = pt_from_mm(mm_from_px_x(element.x, template));
    let y_pt = pt_from_mm(mm_from_px_y(element.y, template));
    let width_pt = pt_from_mm(mm_from_px_x(element.width, template));
    let height_pt = pt_from_mm(mm_from_px_y(element.height, template));

    let (x, y) = to_page_space(x_pt, y_pt, height_pt, page_height_pt);
    Rect::new(x, y, width_pt, height_pt)
}

// =============================================================================
// Geometry
// =============================================================================

/// A rectangular area in points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// PDF affine transform `[a b c d e f]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Matrix {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Clockwise rotation as seen on the printed page
    pub fn rotate_clockwise(degrees: f32) -> Self {
        let (sin, cos) = (-degrees).to_radians().sin_cos();
        Matrix {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self` applied first, then `next`
    pub fn then(&self, next: &Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Maps the box `[0, w] x [0, h]` onto `rect`, rotated clockwise about
    /// the rect center.
    pub fn placement(rect: &Rect, rotation_degrees: f32) -> Matrix {
        let to_origin = Matrix::translate(-rect.width / 2.0, -rect.height / 2.0);
        let to_center = Matrix::translate(rect.center_x(), rect.center_y());
        if rotation_degrees.rem_euclid(360.0).abs() < 1e-3 {
            return to_origin.then(&to_center);
        }
        to_origin
            .then(&Matrix::rotate_clockwise(rotation_degrees))
            .then(&to_center)
    }

    /// Operand string for the `cm` operator
    pub fn to_operands(&self) -> String {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .map(|v| fmt_num(*v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Format a number for a content stream: fixed precision, no trailing zeros.
pub fn fmt_num(value: f32) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
