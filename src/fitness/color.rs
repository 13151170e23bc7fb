use crate::bitmap::{Bitmap, Rgba};
use crate::geom::Scanline;

/// Unrounded colour a candidate would be drawn with. Rounded to bytes only
/// when the candidate is committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FittedColor {
    pub rgb: [f64; 3],
    pub alpha: u8,
}

impl FittedColor {
    pub fn to_rgba(self) -> Rgba {
        let q = |c: f64| c.round().clamp(0.0, 255.0) as u8;
        Rgba::new(q(self.rgb[0]), q(self.rgb[1]), q(self.rgb[2]), self.alpha)
    }
}

/// Least-squares flat colour for the pixels under `lines`.
///
/// Drawing `s` at opacity `a` over `d` yields `d + a*(s - d)`; the squared
/// error against target `t` summed over the covered pixels is minimized at
/// `s = mean(d + (t - d) / a)` per channel, clamped to the byte range.
///
/// Returns None for alpha 0 or an empty pixel set: such a candidate cannot
/// change anything.
pub fn optimal_color(
    target: &Bitmap,
    current: &Bitmap,
    lines: &[Scanline],
    alpha: u8,
) -> Option<FittedColor> {
    profiling::scope!("optimal_color");
    if alpha == 0 {
        return None;
    }
    let inv_a = 255.0 / alpha as f64;

    let mut sums = [0.0f64; 3];
    let mut count = 0usize;
    for line in lines {
        let (y, x1, x2) = (line.y as u32, line.x1 as u32, line.x2 as u32);
        let t_row = target.span(y, x1, x2);
        let c_row = current.span(y, x1, x2);
        for (t, c) in t_row.chunks_exact(4).zip(c_row.chunks_exact(4)) {
            for ch in 0..3 {
                let d = c[ch] as f64;
                sums[ch] += d + (t[ch] as f64 - d) * inv_a;
            }
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }

    let n = count as f64;
    let rgb = sums.map(|s| (s / n).clamp(0.0, 255.0));
    Some(FittedColor { rgb, alpha })
}
