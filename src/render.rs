// alpha compositing of scanlines onto a bitmap
//
// this is the only code that writes into a job's `current` bitmap, and it
// only runs when a shape is committed

use crate::bitmap::{Bitmap, Rgba};
use crate::geom::Scanline;

/// Composite one channel of a source over a destination at opacity `a`
/// (0.0-1.0). The source alpha channel is treated as fully opaque, which
/// makes the alpha byte follow Porter-Duff "over".
#[inline(always)]
pub fn blend_channel(dst: f64, src: f64, a: f64) -> f64 {
    dst * (1.0 - a) + src * a
}

/// Draw `color` over every pixel in `lines` at the colour's own alpha,
/// rounding each channel to the nearest byte.
pub fn draw_lines(bmp: &mut Bitmap, lines: &[Scanline], color: Rgba) {
    profiling::scope!("draw_lines");
    if color.a == 0 {
        return;
    }
    let a = color.a as f64 / 255.0;
    let src = [color.r as f64, color.g as f64, color.b as f64, 255.0];

    for line in lines {
        let row = bmp.span_mut(line.y as u32, line.x1 as u32, line.x2 as u32);
        for px in row.chunks_exact_mut(4) {
            for (d, &s) in px.iter_mut().zip(&src) {
                *d = blend_channel(*d as f64, s, a).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Copy the pixels under `lines` into a flat buffer, in span order.
pub fn copy_lines(bmp: &Bitmap, lines: &[Scanline]) -> Vec<u8> {
    profiling::scope!("copy_lines");
    let mut out = Vec::with_capacity(crate::geom::covered_pixels(lines) * 4);
    for line in lines {
        out.extend_from_slice(bmp.span(line.y as u32, line.x1 as u32, line.x2 as u32));
    }
    out
}
