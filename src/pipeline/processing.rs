//! FID processing: zero filling, apodization, phase correction, and
//! absorption-mode spectrum generation.
//!
//! These produce the curve a [`SpectrumDocument`] is built from. The
//! time-domain FID is a complex sequence; after zero-order phasing the
//! absorption-mode spectrum is assembled from the FFTs of its real and
//! imaginary channels.

use std::f64::consts::PI;

use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::data::document::{Sample, SpectrumDocument};
use crate::error::EngineError;

/// Sweep parameters mapping spectrum indices onto a ppm axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepParams {
    pub begin_ppm: f64,
    pub end_ppm: f64,
}

// =========================================================================
//  Zero Filling
// =========================================================================

/// Next power of two >= n
pub fn next_power_of_two(n: usize) -> usize {
    let mut p = 1;
    while p < n {
        p <<= 1;
    }
    p
}

/// Zero-fill the FID to the target size (no-op if already as long).
pub fn zero_fill(fid: &mut Vec<Complex<f64>>, target_size: usize) {
    if target_size <= fid.len() {
        return;
    }
    let from = fid.len();
    fid.resize(target_size, Complex::new(0.0, 0.0));
    log::debug!("zero-filled FID from {} to {} points", from, target_size);
}

/// Zero-fill up to the next power of two.
pub fn zero_fill_to_power_of_two(fid: &mut Vec<Complex<f64>>) {
    let target = next_power_of_two(fid.len());
    zero_fill(fid, target);
}

// =========================================================================
//  Apodization
// =========================================================================

/// Exponential multiplication (line broadening in Hz).
pub fn apodize_exponential(fid: &mut [Complex<f64>], dwell_s: f64, lb_hz: f64) {
    for (i, point) in fid.iter_mut().enumerate() {
        let t = i as f64 * dwell_s;
        *point *= (-PI * lb_hz * t).exp();
    }
}

// =========================================================================
//  Phase Correction
// =========================================================================

/// Zero-order phase correction: rotate the whole FID by `angle` units of
/// π radians (2.0 is the identity).
pub fn phase_correct(fid: &mut [Complex<f64>], angle: f64) {
    let rot = Complex::from_polar(1.0, angle * PI);
    for point in fid.iter_mut() {
        *point *= rot;
    }
}

/// Find and apply the zero-order phase that maximizes the absorption
/// spectrum sum, by shrinking-step coordinate search: step in either
/// direction while the score improves, divide the step by ten when it
/// stops, finish below `precision`. Returns the applied angle in units of
/// π radians.
pub fn auto_phase(fid: &mut [Complex<f64>], precision: f64) -> f64 {
    fn score(fid: &[Complex<f64>]) -> f64 {
        absorption_spectrum(fid).iter().sum()
    }

    let mut best = score(fid);
    let mut total = 0.0;
    let mut step = 1.0;
    while step >= precision {
        let mut improved = false;
        for dir in [step, -step] {
            loop {
                phase_correct(fid, dir);
                let current = score(fid);
                if current > best {
                    best = current;
                    total += dir;
                    improved = true;
                } else {
                    phase_correct(fid, -dir);
                    break;
                }
            }
        }
        if !improved {
            step /= 10.0;
        }
    }
    log::debug!("auto phase applied {:.4}π rad", total);
    total
}

// =========================================================================
//  Absorption Spectrum
// =========================================================================

/// Absorption-mode spectrum of a FID: the real FFT of the real channel
/// combined with the imaginary FFT of the imaginary channel, first half
/// mirrored to the left, second kept on the right.
pub fn absorption_spectrum(fid: &[Complex<f64>]) -> Vec<f64> {
    let n = fid.len();
    if n < 2 {
        return Vec::new();
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    let mut real_channel: Vec<Complex<f64>> =
        fid.iter().map(|p| Complex::new(p.re, 0.0)).collect();
    let mut imag_channel: Vec<Complex<f64>> =
        fid.iter().map(|p| Complex::new(p.im, 0.0)).collect();
    fft.process(&mut real_channel);
    fft.process(&mut imag_channel);

    let half = n / 2;
    let mut left: Vec<f64> = (0..half)
        .map(|i| real_channel[i].re - imag_channel[i].im)
        .collect();
    left.reverse();
    let right = (0..half).map(|i| real_channel[i].re + imag_channel[i].im);

    left.into_iter().chain(right).collect()
}

/// Build a document from a FID: absorption spectrum on an ascending ppm
/// axis synthesized from the sweep parameters.
pub fn document_from_fid(
    name: impl Into<String>,
    fid: &[Complex<f64>],
    sweep: &SweepParams,
) -> Result<SpectrumDocument, EngineError> {
    if !(sweep.begin_ppm < sweep.end_ppm) {
        return Err(EngineError::InvalidRange {
            start: sweep.begin_ppm,
            end: sweep.end_ppm,
        });
    }
    let spectrum = absorption_spectrum(fid);
    let n = spectrum.len();
    if n < 2 {
        return Err(EngineError::TooFewSamples { got: n });
    }
    let width = sweep.end_ppm - sweep.begin_ppm;
    let samples = spectrum
        .into_iter()
        .enumerate()
        .map(|(i, y)| Sample::new(sweep.begin_ppm + width * i as f64 / (n - 1) as f64, y))
        .collect();
    SpectrumDocument::from_samples(name, samples)
}
