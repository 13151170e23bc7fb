//─────────────────────────────────────────────────────────────────────────────
// human-facing metrics derived from a job score (RMS, PSNR, similarity)
//─────────────────────────────────────────────────────────────────────────────

/// Decibels for a mean squared error measured against `peak`.
///
/// A zero error is floored so an exact match reports a large finite value.
#[inline]
pub fn psnr_from_mse(mse: f64, peak: f64) -> f64 {
    let mse = mse.max(1e-12);
    10.0 * ((peak * peak) / mse).log10()
}

/// cached snapshot of metrics for display and logging
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// the job score itself (normalized RMS, 0 = perfect)
    pub rms: f64,
    pub psnr: f64,
    /// percent, 100 = perfect
    pub similarity: f64,
}

impl MetricsSnapshot {
    /// a score is already RMS/255, so MSE on the byte scale is (score*255)²
    #[inline]
    pub fn from_score(score: f64) -> Self {
        let rms = score.max(0.0);
        let mse = (rms * 255.0) * (rms * 255.0);
        Self { rms, psnr: psnr_from_mse(mse, 255.0), similarity: (1.0 - rms) * 100.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_score_caps_psnr() {
        let m = MetricsSnapshot::from_score(0.0);
        assert_eq!(m.similarity, 100.0);
        assert!(m.psnr > 100.0);
    }

    #[test]
    fn worst_score_is_zero_db() {
        let m = MetricsSnapshot::from_score(1.0);
        assert!(m.psnr.abs() < 1e-9);
        assert_eq!(m.similarity, 0.0);
    }

    #[test]
    fn psnr_known_value() {
        // mse 65.025 on a 255 peak is exactly 30 dB
        assert!((psnr_from_mse(65.025, 255.0) - 30.0).abs() < 1e-9);
    }
}
