//! Single-frequency discrete Fourier transform

use std::f64::consts::PI;

/// Magnitude of the unnormalized DFT of `series` at `frequency` (cycles per sample)
///
/// `|sum_n x[n] * exp(-2*pi*i*frequency*n)|`; NaN for an empty series.
pub fn dft_magnitude(series: &[f64], frequency: f64) -> f64 {
    if series.is_empty() {
        return f64::NAN;
    }
    let (re, im) = series
        .iter()
        .enumerate()
        .fold((0.0_f64, 0.0_f64), |(re, im), (n, x)| {
            let angle = 2.0 * PI * frequency * n as f64;
            (re + x * angle.cos(), im - x * angle.sin())
        });
    re.hypot(im)
}
