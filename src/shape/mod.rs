// shape kinds, the enable mask, and rasterization
//
// the set of kinds is closed: every operation is a match over `Shape`

mod mutate;

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geom::{
    clip_segment, scan_convex_polygon, spans_from_pixels, trace_line, Point, Scanline,
};

/// vertex count used when approximating a rotated ellipse
const ELLIPSE_SEGMENTS: usize = 20;
/// sample count along a quadratic bezier
const BEZIER_SEGMENTS: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Rectangle,
    RotatedRectangle,
    Triangle,
    Ellipse,
    RotatedEllipse,
    Circle,
    Line,
    QuadraticBezier,
    Polyline,
}

impl ShapeType {
    pub const ALL: [ShapeType; 9] = [
        ShapeType::Rectangle,
        ShapeType::RotatedRectangle,
        ShapeType::Triangle,
        ShapeType::Ellipse,
        ShapeType::RotatedEllipse,
        ShapeType::Circle,
        ShapeType::Line,
        ShapeType::QuadraticBezier,
        ShapeType::Polyline,
    ];

    /// this kind as a one-bit `ShapeTypes` mask
    pub const fn flag(self) -> ShapeTypes {
        match self {
            ShapeType::Rectangle => ShapeTypes::RECTANGLE,
            ShapeType::RotatedRectangle => ShapeTypes::ROTATED_RECTANGLE,
            ShapeType::Triangle => ShapeTypes::TRIANGLE,
            ShapeType::Ellipse => ShapeTypes::ELLIPSE,
            ShapeType::RotatedEllipse => ShapeTypes::ROTATED_ELLIPSE,
            ShapeType::Circle => ShapeTypes::CIRCLE,
            ShapeType::Line => ShapeTypes::LINE,
            ShapeType::QuadraticBezier => ShapeTypes::QUADRATIC_BEZIER,
            ShapeType::Polyline => ShapeTypes::POLYLINE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ShapeType::Rectangle => "rectangle",
            ShapeType::RotatedRectangle => "rotated_rectangle",
            ShapeType::Triangle => "triangle",
            ShapeType::Ellipse => "ellipse",
            ShapeType::RotatedEllipse => "rotated_ellipse",
            ShapeType::Circle => "circle",
            ShapeType::Line => "line",
            ShapeType::QuadraticBezier => "quadratic_bezier",
            ShapeType::Polyline => "polyline",
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitmask of enabled shape kinds, serialized as the raw bits. Unknown bits
/// are dropped on load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct ShapeTypes(u32);

bitflags::bitflags! {
    impl ShapeTypes: u32 {
        const RECTANGLE         = 1;
        const ROTATED_RECTANGLE = 1 << 1;
        const TRIANGLE          = 1 << 2;
        const ELLIPSE           = 1 << 3;
        const ROTATED_ELLIPSE   = 1 << 4;
        const CIRCLE            = 1 << 5;
        const LINE              = 1 << 6;
        const QUADRATIC_BEZIER  = 1 << 7;
        const POLYLINE          = 1 << 8;
    }
}

impl ShapeTypes {
    /// everything except the stroked line family
    pub const FILLED: ShapeTypes = ShapeTypes::RECTANGLE
        .union(ShapeTypes::ROTATED_RECTANGLE)
        .union(ShapeTypes::TRIANGLE)
        .union(ShapeTypes::ELLIPSE)
        .union(ShapeTypes::ROTATED_ELLIPSE)
        .union(ShapeTypes::CIRCLE);

    #[inline]
    pub const fn enables(self, kind: ShapeType) -> bool {
        self.contains(kind.flag())
    }

    /// enabled kinds in `ShapeType::ALL` order
    pub fn kinds(self) -> impl Iterator<Item = ShapeType> {
        ShapeType::ALL.into_iter().filter(move |k| self.enables(*k))
    }
}

impl From<ShapeType> for ShapeTypes {
    fn from(kind: ShapeType) -> Self {
        kind.flag()
    }
}

impl From<u32> for ShapeTypes {
    fn from(bits: u32) -> Self {
        ShapeTypes::from_bits_truncate(bits)
    }
}

impl From<ShapeTypes> for u32 {
    fn from(mask: ShapeTypes) -> Self {
        mask.bits()
    }
}

/// A geometric primitive in integer pixel coordinates.
///
/// Angles are whole degrees. Coordinates may lie off canvas: rasterization
/// clips, it never fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle { x1: i32, y1: i32, x2: i32, y2: i32 },
    RotatedRectangle { x1: i32, y1: i32, x2: i32, y2: i32, angle: i32 },
    Triangle { points: [Point; 3] },
    Ellipse { x: i32, y: i32, rx: i32, ry: i32 },
    RotatedEllipse { x: i32, y: i32, rx: i32, ry: i32, angle: i32 },
    Circle { x: i32, y: i32, r: i32 },
    Line { x1: i32, y1: i32, x2: i32, y2: i32 },
    QuadraticBezier { cx: i32, cy: i32, x1: i32, y1: i32, x2: i32, y2: i32 },
    Polyline { points: [Point; 4] },
}

impl Shape {
    pub const fn kind(&self) -> ShapeType {
        match self {
            Shape::Rectangle { .. } => ShapeType::Rectangle,
            Shape::RotatedRectangle { .. } => ShapeType::RotatedRectangle,
            Shape::Triangle { .. } => ShapeType::Triangle,
            Shape::Ellipse { .. } => ShapeType::Ellipse,
            Shape::RotatedEllipse { .. } => ShapeType::RotatedEllipse,
            Shape::Circle { .. } => ShapeType::Circle,
            Shape::Line { .. } => ShapeType::Line,
            Shape::QuadraticBezier { .. } => ShapeType::QuadraticBezier,
            Shape::Polyline { .. } => ShapeType::Polyline,
        }
    }

    /// Covered pixels as row-major spans clipped to `width x height`.
    ///
    /// Pure function of the parameters. Zero-area or fully off-canvas shapes
    /// give an empty vector.
    pub fn rasterize(&self, width: u32, height: u32) -> Vec<Scanline> {
        profiling::scope!("Shape::rasterize");
        match *self {
            Shape::Rectangle { x1, y1, x2, y2 } => rect_spans(x1, y1, x2, y2, width, height),
            Shape::RotatedRectangle { x1, y1, x2, y2, angle } => {
                let corners = rotated_rect_corners(x1, y1, x2, y2, angle);
                scan_convex_polygon(&corners, width, height)
            }
            Shape::Triangle { points } => scan_convex_polygon(&points, width, height),
            Shape::Ellipse { x, y, rx, ry } => ellipse_spans(x, y, rx, ry, width, height),
            Shape::RotatedEllipse { x, y, rx, ry, angle } => {
                if rx <= 0 || ry <= 0 {
                    return Vec::new();
                }
                let outline = rotated_ellipse_outline(x, y, rx, ry, angle);
                scan_convex_polygon(&outline, width, height)
            }
            Shape::Circle { x, y, r } => ellipse_spans(x, y, r, r, width, height),
            Shape::Line { x1, y1, x2, y2 } => stroke_spans(&[(x1, y1), (x2, y2)], width, height),
            Shape::QuadraticBezier { cx, cy, x1, y1, x2, y2 } => {
                let path = bezier_points((x1, y1), (cx, cy), (x2, y2));
                stroke_spans(&path, width, height)
            }
            Shape::Polyline { points } => stroke_spans(&points, width, height),
        }
    }
}

fn rect_spans(x1: i32, y1: i32, x2: i32, y2: i32, width: u32, height: u32) -> Vec<Scanline> {
    let (xa, xb) = (x1.min(x2), x1.max(x2));
    let y_lo = y1.min(y2).max(0);
    let y_hi = y1.max(y2).min(height as i32 - 1);
    (y_lo..=y_hi)
        .filter_map(|y| Scanline::new(y, xa, xb).clip(width, height))
        .collect()
}

fn rotate(px: f64, py: f64, angle_deg: i32) -> (f64, f64) {
    let (s, c) = (angle_deg as f64).to_radians().sin_cos();
    (px * c - py * s, px * s + py * c)
}

fn rotated_rect_corners(x1: i32, y1: i32, x2: i32, y2: i32, angle: i32) -> [Point; 4] {
    let (xa, xb) = (x1.min(x2) as f64, x1.max(x2) as f64);
    let (ya, yb) = (y1.min(y2) as f64, y1.max(y2) as f64);
    let (cx, cy) = ((xa + xb) / 2.0, (ya + yb) / 2.0);
    let (hw, hh) = ((xb - xa) / 2.0, (yb - ya) / 2.0);

    let corner = |ox: f64, oy: f64| {
        let (rx, ry) = rotate(ox, oy, angle);
        ((cx + rx).round() as i32, (cy + ry).round() as i32)
    };
    [corner(-hw, -hh), corner(hw, -hh), corner(hw, hh), corner(-hw, hh)]
}

fn ellipse_spans(cx: i32, cy: i32, rx: i32, ry: i32, width: u32, height: u32) -> Vec<Scanline> {
    if rx <= 0 || ry <= 0 {
        return Vec::new();
    }
    let y_lo = (cy as i64 - ry as i64).max(0) as i32;
    let y_hi = (cy as i64 + ry as i64).min(height as i64 - 1) as i32;
    let (rx, ryf) = (rx as f64, ry as f64);
    (y_lo..=y_hi)
        .filter_map(|y| {
            let dy = (y as f64 - cy as f64) / ryf;
            let half = ((1.0 - dy * dy).max(0.0).sqrt() * rx) as i32;
            Scanline::new(y, cx.saturating_sub(half), cx.saturating_add(half)).clip(width, height)
        })
        .collect()
}

fn rotated_ellipse_outline(cx: i32, cy: i32, rx: i32, ry: i32, angle: i32) -> Vec<Point> {
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / ELLIPSE_SEGMENTS as f64;
            let (ox, oy) = rotate(rx as f64 * t.cos(), ry as f64 * t.sin(), angle);
            ((cx as f64 + ox).round() as i32, (cy as f64 + oy).round() as i32)
        })
        .collect()
}

fn bezier_points(p0: Point, c: Point, p1: Point) -> Vec<Point> {
    (0..=BEZIER_SEGMENTS)
        .map(|i| {
            let t = i as f64 / BEZIER_SEGMENTS as f64;
            let u = 1.0 - t;
            let x = u * u * p0.0 as f64 + 2.0 * u * t * c.0 as f64 + t * t * p1.0 as f64;
            let y = u * u * p0.1 as f64 + 2.0 * u * t * c.1 as f64 + t * t * p1.1 as f64;
            (x.round() as i32, y.round() as i32)
        })
        .collect()
}

/// one-pixel stroke through consecutive points, each segment clipped first
fn stroke_spans(path: &[Point], width: u32, height: u32) -> Vec<Scanline> {
    let mut pixels = Vec::new();
    for seg in path.windows(2) {
        if let Some((a, b)) = clip_segment(seg[0], seg[1], width, height) {
            trace_line(a, b, |x, y| pixels.push((x, y)));
        }
    }
    spans_from_pixels(pixels, width, height)
}
