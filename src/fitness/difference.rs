//─────────────────────────────────────────────────────────────────────────────
// RMS difference over all four RGBA channels, normalized to 0..1
//
//   score = sqrt(Σ (t - c)² / (w * h * 4)) / 255
//
// partial variants update a known score by swapping the squared error of
// just the covered pixels, so scoring a candidate costs O(its footprint)
//─────────────────────────────────────────────────────────────────────────────

use crate::bitmap::Bitmap;
use crate::geom::Scanline;
use crate::render::blend_channel;

use super::color::{optimal_color, FittedColor};

#[inline]
fn channel_count(bmp: &Bitmap) -> f64 {
    bmp.width() as f64 * bmp.height() as f64 * 4.0
}

/// squared-error total a score stands for
#[inline]
fn total_from_score(score: f64, n: f64) -> f64 {
    let s = score * 255.0;
    s * s * n
}

#[inline]
fn score_from_total(total: f64, n: f64) -> f64 {
    (total.max(0.0) / n).sqrt() / 255.0
}

/// Score of `current` against `target` over the whole image. 0 is a perfect match.
pub fn difference_full(target: &Bitmap, current: &Bitmap) -> f64 {
    profiling::scope!("difference_full");
    debug_assert!(target.same_dimensions(current));

    let total: u64 = target
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .map(|(&t, &c)| {
            let d = t as i64 - c as i64;
            (d * d) as u64
        })
        .sum();
    score_from_total(total as f64, channel_count(target))
}

/// Re-score after the pixels under `lines` changed from `before` (as copied
/// by `render::copy_lines`) to what `after` now holds.
pub fn difference_partial(
    target: &Bitmap,
    before: &[u8],
    after: &Bitmap,
    lines: &[Scanline],
    score: f64,
) -> f64 {
    profiling::scope!("difference_partial");
    let n = channel_count(target);
    let mut total = total_from_score(score, n);

    let mut offset = 0;
    for line in lines {
        let (y, x1, x2) = (line.y as u32, line.x1 as u32, line.x2 as u32);
        let t_row = target.span(y, x1, x2);
        let a_row = after.span(y, x1, x2);
        let b_row = &before[offset..offset + t_row.len()];
        offset += t_row.len();

        for ((&t, &b), &a) in t_row.iter().zip(b_row).zip(a_row) {
            let db = t as f64 - b as f64;
            let da = t as f64 - a as f64;
            total += da * da - db * db;
        }
    }
    score_from_total(total, n)
}

/// Score `current` would have if `color` were drawn over `lines`, computed
/// with unrounded blending and without touching `current`.
pub fn candidate_score(
    target: &Bitmap,
    current: &Bitmap,
    lines: &[Scanline],
    color: &FittedColor,
    score: f64,
) -> f64 {
    profiling::scope!("candidate_score");
    let n = channel_count(target);
    let mut total = total_from_score(score, n);
    let a = color.alpha as f64 / 255.0;
    let src = [color.rgb[0], color.rgb[1], color.rgb[2], 255.0];

    for line in lines {
        let (y, x1, x2) = (line.y as u32, line.x1 as u32, line.x2 as u32);
        let t_row = target.span(y, x1, x2);
        let c_row = current.span(y, x1, x2);
        for (t, c) in t_row.chunks_exact(4).zip(c_row.chunks_exact(4)) {
            for ch in 0..4 {
                let tv = t[ch] as f64;
                let cv = c[ch] as f64;
                let before = tv - cv;
                let after = tv - blend_channel(cv, src[ch], a);
                total += after * after - before * before;
            }
        }
    }
    score_from_total(total, n)
}

/// Fit a colour for `lines` and score the hypothetical result.
///
/// Candidates that cannot change anything (alpha 0, nothing covered) keep the
/// current score and carry no colour.
pub fn energy(
    target: &Bitmap,
    current: &Bitmap,
    lines: &[Scanline],
    alpha: u8,
    score: f64,
) -> (Option<FittedColor>, f64) {
    profiling::scope!("energy");
    match optimal_color(target, current, lines, alpha) {
        Some(color) => {
            let s = candidate_score(target, current, lines, &color, score);
            (Some(color), s)
        }
        None => (None, score),
    }
}
