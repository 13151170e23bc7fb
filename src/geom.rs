// scanline rasterization primitives
//
// everything here produces clipped horizontal spans:
// - at most one span per row for filled convex shapes
// - spans never overlap within a row
// - rows come out in ascending y order

use serde::{Deserialize, Serialize};

/// integer pixel coordinate
pub type Point = (i32, i32);

/// a horizontal run of pixels on row `y`, covering `x1..=x2`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scanline {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
}

impl Scanline {
    #[inline]
    pub const fn new(y: i32, x1: i32, x2: i32) -> Self {
        Scanline { y, x1, x2 }
    }

    /// number of pixels covered (0 for an inverted span)
    #[inline]
    pub fn len(&self) -> usize {
        if self.x2 < self.x1 { 0 } else { (self.x2 - self.x1 + 1) as usize }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// clip to `[0,width) x [0,height)`; None if nothing is left
    #[inline]
    pub fn clip(self, width: u32, height: u32) -> Option<Scanline> {
        if self.y < 0 || self.y >= height as i32 {
            return None;
        }
        let x1 = self.x1.max(0);
        let x2 = self.x2.min(width as i32 - 1);
        if x1 > x2 {
            return None;
        }
        Some(Scanline { y: self.y, x1, x2 })
    }
}

/// total pixel count of a span set
pub fn covered_pixels(lines: &[Scanline]) -> usize {
    lines.iter().map(Scanline::len).sum()
}

/// signed area of a polygon (shoelace formula).
/// positive for CCW in a y-up frame, zero for degenerate input.
pub fn signed_area(pts: &[Point]) -> f64 {
    if pts.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..pts.len() {
        let j = (i + 1) % pts.len();
        area += pts[i].0 as f64 * pts[j].1 as f64;
        area -= pts[j].0 as f64 * pts[i].1 as f64;
    }
    area * 0.5
}

/// Bresenham walk from `a` to `b` inclusive, calling `plot` for each pixel.
///
/// Walks every pixel between the endpoints; clip with `clip_segment` first
/// when they may lie far off canvas.
pub fn trace_line(a: Point, b: Point, mut plot: impl FnMut(i32, i32)) {
    let (mut x, mut y) = (a.0 as i64, a.1 as i64);
    let (bx, by) = (b.0 as i64, b.1 as i64);
    let dx = (bx - x).abs();
    let dy = -(by - y).abs();
    let sx = if x < bx { 1 } else { -1 };
    let sy = if y < by { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        // stays between the endpoints, so always fits in i32
        plot(x as i32, y as i32);
        if x == bx && y == by {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Liang-Barsky clip of segment `a`-`b` to the pixel grid `[0,width) x [0,height)`.
///
/// Segments already on canvas come back unchanged. None if nothing is visible.
pub fn clip_segment(a: Point, b: Point, width: u32, height: u32) -> Option<(Point, Point)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (x_max, y_max) = (width as f64 - 1.0, height as f64 - 1.0);
    let (x0, y0) = (a.0 as f64, a.1 as f64);
    let (dx, dy) = (b.0 as f64 - x0, b.1 as f64 - y0);

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [(-dx, x0), (dx, x_max - x0), (-dy, y0), (dy, y_max - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| {
        let x = (x0 + t * dx).round().clamp(0.0, x_max) as i32;
        let y = (y0 + t * dy).round().clamp(0.0, y_max) as i32;
        (x, y)
    };
    Some((at(t0), at(t1)))
}

/// Scan-convert a convex polygon into clipped spans.
///
/// Only rows on canvas are visited; each row's extent comes from the edges
/// crossing it, so the cost is rows covered times vertex count whatever the
/// polygon's size. Polygons with zero area yield nothing.
pub fn scan_convex_polygon(pts: &[Point], width: u32, height: u32) -> Vec<Scanline> {
    profiling::scope!("scan_convex_polygon");
    if pts.len() < 3 || signed_area(pts) == 0.0 {
        return Vec::new();
    }

    let min_y = pts.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let max_y = pts.iter().map(|p| p.1).max().unwrap_or(-1).min(height as i32 - 1);
    if min_y > max_y {
        return Vec::new();
    }

    let x_max = width as f64 - 1.0;
    (min_y..=max_y)
        .filter_map(|y| {
            let (lo, hi) = row_extent(pts, y)?;
            let (lo, hi) = (lo.max(0.0), hi.min(x_max));
            (lo <= hi).then(|| Scanline::new(y, lo as i32, hi as i32))
        })
        .collect()
}

/// leftmost and rightmost x where the polygon outline meets row `y`
fn row_extent(pts: &[Point], y: i32) -> Option<(f64, f64)> {
    let yf = y as f64;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..pts.len() {
        let (a, b) = (pts[i], pts[(i + 1) % pts.len()]);
        let (ax, ay, bx, by) = (a.0 as f64, a.1 as f64, b.0 as f64, b.1 as f64);
        if yf < ay.min(by) || yf > ay.max(by) {
            continue;
        }
        if ay == by {
            lo = lo.min(ax.min(bx));
            hi = hi.max(ax.max(bx));
        } else {
            let x = (ax + (yf - ay) * (bx - ax) / (by - ay)).round();
            lo = lo.min(x);
            hi = hi.max(x);
        }
    }
    (lo <= hi).then_some((lo, hi))
}

/// Collapse a bag of pixels (possibly duplicated, possibly off canvas) into
/// sorted, merged, clipped spans.
pub fn spans_from_pixels(mut pixels: Vec<Point>, width: u32, height: u32) -> Vec<Scanline> {
    profiling::scope!("spans_from_pixels");
    pixels.retain(|&(x, y)| x >= 0 && y >= 0 && x < width as i32 && y < height as i32);
    pixels.sort_unstable_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
    pixels.dedup();

    let mut lines: Vec<Scanline> = Vec::new();
    for (x, y) in pixels {
        match lines.last_mut() {
            Some(last) if last.y == y && last.x2 + 1 == x => last.x2 = x,
            _ => lines.push(Scanline::new(y, x, x)),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(lines: &[Scanline], width: u32, height: u32) {
        for l in lines {
            assert!(l.y >= 0 && l.y < height as i32, "row out of bounds: {l:?}");
            assert!(l.x1 >= 0 && l.x2 < width as i32 && l.x1 <= l.x2, "span out of bounds: {l:?}");
        }
        for pair in lines.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(a.y < b.y || (a.y == b.y && a.x2 < b.x1), "overlap or disorder: {a:?} {b:?}");
        }
    }

    #[test]
    fn test_signed_area_ccw() {
        let pts = vec![(0, 0), (1, 0), (1, 1), (0, 1)];
        assert!(signed_area(&pts) > 0.0);
    }

    #[test]
    fn test_signed_area_cw() {
        let pts = vec![(0, 0), (0, 1), (1, 1), (1, 0)];
        assert!(signed_area(&pts) < 0.0);
    }

    #[test]
    fn test_clip() {
        assert_eq!(Scanline::new(1, -3, 2).clip(4, 4), Some(Scanline::new(1, 0, 2)));
        assert_eq!(Scanline::new(1, 2, 9).clip(4, 4), Some(Scanline::new(1, 2, 3)));
        assert_eq!(Scanline::new(4, 0, 1).clip(4, 4), None);
        assert_eq!(Scanline::new(-1, 0, 1).clip(4, 4), None);
        assert_eq!(Scanline::new(0, 5, 9).clip(4, 4), None);
    }

    #[test]
    fn test_trace_line_endpoints() {
        let mut seen = Vec::new();
        trace_line((0, 0), (3, 1), |x, y| seen.push((x, y)));
        assert_eq!(seen.first(), Some(&(0, 0)));
        assert_eq!(seen.last(), Some(&(3, 1)));
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_triangle_scan() {
        let lines = scan_convex_polygon(&[(0, 0), (4, 0), (0, 4)], 10, 10);
        assert_well_formed(&lines, 10, 10);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], Scanline::new(0, 0, 4));
        assert_eq!(lines[4], Scanline::new(4, 0, 0));
    }

    #[test]
    fn test_collinear_polygon_is_empty() {
        assert!(scan_convex_polygon(&[(0, 0), (2, 2), (4, 4)], 10, 10).is_empty());
    }

    #[test]
    fn test_offscreen_polygon_is_empty() {
        assert!(scan_convex_polygon(&[(20, 20), (30, 20), (25, 30)], 10, 10).is_empty());
        assert!(scan_convex_polygon(&[(-20, 2), (-10, 2), (-15, 8)], 10, 10).is_empty());
    }

    #[test]
    fn test_partially_visible_polygon_is_clipped() {
        let lines = scan_convex_polygon(&[(-5, -5), (14, -5), (14, 14), (-5, 14)], 10, 10);
        assert_well_formed(&lines, 10, 10);
        assert_eq!(covered_pixels(&lines), 100);
    }

    #[test]
    fn test_clip_segment_keeps_visible_segment() {
        assert_eq!(clip_segment((1, 2), (5, 3), 10, 10), Some(((1, 2), (5, 3))));
    }

    #[test]
    fn test_clip_segment_cuts_to_canvas() {
        assert_eq!(clip_segment((-10, 4), (20, 4), 8, 8), Some(((0, 4), (7, 4))));
        assert_eq!(clip_segment((-10, -10), (20, 20), 8, 8), Some(((0, 0), (7, 7))));
        assert_eq!(clip_segment((-60_000_000, -5), (-1, -5), 8, 8), None);
        assert_eq!(clip_segment((9, 0), (12, 7), 8, 8), None);
    }

    #[test]
    fn test_clip_segment_extreme_coordinates() {
        let (a, b) = clip_segment((i32::MIN, 1), (i32::MAX, 1), 4, 4).unwrap();
        assert_eq!((a, b), ((0, 1), (3, 1)));
        let (a, b) = clip_segment((i32::MIN, i32::MIN), (i32::MAX, i32::MAX), 6, 6).unwrap();
        assert!(a.0 >= 0 && a.1 >= 0 && b.0 < 6 && b.1 < 6);
    }

    #[test]
    fn test_huge_polygon_is_clipped_per_row() {
        let lines = scan_convex_polygon(&[(-2_000_000_000, 0), (2_000_000_000, 0), (0, 3)], 4, 4);
        assert_well_formed(&lines, 4, 4);
        assert_eq!(lines.first(), Some(&Scanline::new(0, 0, 3)));
        assert_eq!(lines.last(), Some(&Scanline::new(3, 0, 0)));

        let (lo, hi) = (i32::MIN, i32::MAX);
        let extreme = [(lo, lo), (hi, lo), (hi, hi), (lo, hi)];
        let lines = scan_convex_polygon(&extreme, 5, 5);
        assert_well_formed(&lines, 5, 5);
        assert_eq!(covered_pixels(&lines), 25);
    }

    #[test]
    fn test_spans_from_pixels_merges_and_dedups() {
        let px = vec![(2, 1), (1, 1), (3, 1), (1, 1), (5, 1), (0, 0), (-1, 0), (7, 9)];
        let lines = spans_from_pixels(px, 6, 6);
        let expected = vec![Scanline::new(0, 0, 0), Scanline::new(1, 1, 3), Scanline::new(1, 5, 5)];
        assert_eq!(lines, expected);
    }
}
