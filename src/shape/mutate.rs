// random construction and mutation of shapes
//
// all generated coordinates are clamped into the search bounds; radii stay
// in [1, longest side of the bounds]

use rand::Rng;

use super::{Shape, ShapeType};
use crate::geom::Point;
use crate::settings::PixelBounds;

/// max initial size of a fresh shape along each axis (pixels)
const INITIAL_EXTENT: i32 = 32;
/// max per-mutation move of a point or radius (pixels)
const JITTER: i32 = 16;
/// max per-mutation rotation (degrees)
const ANGLE_JITTER: i32 = 30;

impl Shape {
    /// A fresh shape of `kind` with uniformly random parameters inside `bounds`.
    pub fn random<R: Rng>(kind: ShapeType, rng: &mut R, bounds: &PixelBounds) -> Shape {
        profiling::scope!("Shape::random");
        match kind {
            ShapeType::Rectangle => {
                let (x1, y1) = random_point(rng, bounds);
                let (x2, y2) = grow(rng, (x1, y1), bounds);
                Shape::Rectangle { x1, y1, x2, y2 }
            }
            ShapeType::RotatedRectangle => {
                let (x1, y1) = random_point(rng, bounds);
                let (x2, y2) = grow(rng, (x1, y1), bounds);
                Shape::RotatedRectangle { x1, y1, x2, y2, angle: rng.random_range(0..360) }
            }
            ShapeType::Triangle => {
                let a = random_point(rng, bounds);
                let b = offset(rng, a, INITIAL_EXTENT, bounds);
                let c = offset(rng, a, INITIAL_EXTENT, bounds);
                Shape::Triangle { points: [a, b, c] }
            }
            ShapeType::Ellipse => {
                let (x, y) = random_point(rng, bounds);
                let (rx, ry) = (random_radius(rng, bounds), random_radius(rng, bounds));
                Shape::Ellipse { x, y, rx, ry }
            }
            ShapeType::RotatedEllipse => {
                let (x, y) = random_point(rng, bounds);
                Shape::RotatedEllipse {
                    x,
                    y,
                    rx: random_radius(rng, bounds),
                    ry: random_radius(rng, bounds),
                    angle: rng.random_range(0..360),
                }
            }
            ShapeType::Circle => {
                let (x, y) = random_point(rng, bounds);
                Shape::Circle { x, y, r: random_radius(rng, bounds) }
            }
            ShapeType::Line => {
                let (x1, y1) = random_point(rng, bounds);
                let (x2, y2) = offset(rng, (x1, y1), INITIAL_EXTENT, bounds);
                Shape::Line { x1, y1, x2, y2 }
            }
            ShapeType::QuadraticBezier => {
                let (cx, cy) = random_point(rng, bounds);
                let (x1, y1) = offset(rng, (cx, cy), INITIAL_EXTENT, bounds);
                let (x2, y2) = offset(rng, (cx, cy), INITIAL_EXTENT, bounds);
                Shape::QuadraticBezier { cx, cy, x1, y1, x2, y2 }
            }
            ShapeType::Polyline => {
                let start = random_point(rng, bounds);
                let mut points = [start; 4];
                for p in points.iter_mut().skip(1) {
                    *p = offset(rng, start, INITIAL_EXTENT, bounds);
                }
                Shape::Polyline { points }
            }
        }
    }

    /// A perturbed copy: one randomly chosen parameter group moves by a
    /// random amount, clamped to `bounds`. The kind never changes.
    pub fn mutate<R: Rng>(&self, rng: &mut R, bounds: &PixelBounds) -> Shape {
        profiling::scope!("Shape::mutate");
        let mut s = *self;
        match &mut s {
            Shape::Rectangle { x1, y1, x2, y2 } => match rng.random_range(0..2) {
                0 => (*x1, *y1) = offset(rng, (*x1, *y1), JITTER, bounds),
                _ => (*x2, *y2) = offset(rng, (*x2, *y2), JITTER, bounds),
            },
            Shape::RotatedRectangle { x1, y1, x2, y2, angle } => match rng.random_range(0..3) {
                0 => (*x1, *y1) = offset(rng, (*x1, *y1), JITTER, bounds),
                1 => (*x2, *y2) = offset(rng, (*x2, *y2), JITTER, bounds),
                _ => *angle = turn(rng, *angle),
            },
            Shape::Triangle { points } => {
                let i = rng.random_range(0..points.len());
                points[i] = offset(rng, points[i], JITTER, bounds);
            }
            Shape::Ellipse { x, y, rx, ry } => match rng.random_range(0..3) {
                0 => (*x, *y) = offset(rng, (*x, *y), JITTER, bounds),
                1 => *rx = resize(rng, *rx, bounds),
                _ => *ry = resize(rng, *ry, bounds),
            },
            Shape::RotatedEllipse { x, y, rx, ry, angle } => match rng.random_range(0..4) {
                0 => (*x, *y) = offset(rng, (*x, *y), JITTER, bounds),
                1 => *rx = resize(rng, *rx, bounds),
                2 => *ry = resize(rng, *ry, bounds),
                _ => *angle = turn(rng, *angle),
            },
            Shape::Circle { x, y, r } => match rng.random_range(0..2) {
                0 => (*x, *y) = offset(rng, (*x, *y), JITTER, bounds),
                _ => *r = resize(rng, *r, bounds),
            },
            Shape::Line { x1, y1, x2, y2 } => match rng.random_range(0..2) {
                0 => (*x1, *y1) = offset(rng, (*x1, *y1), JITTER, bounds),
                _ => (*x2, *y2) = offset(rng, (*x2, *y2), JITTER, bounds),
            },
            Shape::QuadraticBezier { cx, cy, x1, y1, x2, y2 } => match rng.random_range(0..3) {
                0 => (*cx, *cy) = offset(rng, (*cx, *cy), JITTER, bounds),
                1 => (*x1, *y1) = offset(rng, (*x1, *y1), JITTER, bounds),
                _ => (*x2, *y2) = offset(rng, (*x2, *y2), JITTER, bounds),
            },
            Shape::Polyline { points } => {
                let i = rng.random_range(0..points.len());
                points[i] = offset(rng, points[i], JITTER, bounds);
            }
        }
        s
    }
}

#[inline]
fn random_point<R: Rng>(rng: &mut R, b: &PixelBounds) -> Point {
    (rng.random_range(b.x_min..=b.x_max), rng.random_range(b.y_min..=b.y_max))
}

/// move `p` by up to `extent` on each axis, staying inside `b`
#[inline]
fn offset<R: Rng>(rng: &mut R, p: Point, extent: i32, b: &PixelBounds) -> Point {
    let x = p.0 + rng.random_range(-extent..=extent);
    let y = p.1 + rng.random_range(-extent..=extent);
    b.clamp_point((x, y))
}

/// opposite corner for a box anchored at `p`, extending down-right
#[inline]
fn grow<R: Rng>(rng: &mut R, p: Point, b: &PixelBounds) -> Point {
    let x = p.0 + rng.random_range(1..=INITIAL_EXTENT);
    let y = p.1 + rng.random_range(1..=INITIAL_EXTENT);
    b.clamp_point((x, y))
}

#[inline]
fn max_radius(b: &PixelBounds) -> i32 {
    b.width().max(b.height()).max(1)
}

#[inline]
fn random_radius<R: Rng>(rng: &mut R, b: &PixelBounds) -> i32 {
    rng.random_range(1..=INITIAL_EXTENT.min(max_radius(b)))
}

#[inline]
fn resize<R: Rng>(rng: &mut R, r: i32, b: &PixelBounds) -> i32 {
    (r + rng.random_range(-JITTER..=JITTER)).clamp(1, max_radius(b))
}

#[inline]
fn turn<R: Rng>(rng: &mut R, angle: i32) -> i32 {
    (angle + rng.random_range(-ANGLE_JITTER..=ANGLE_JITTER)).rem_euclid(360)
}
