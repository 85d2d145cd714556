//! Analyser taps: frequency snapshots of a point in the graph.
//!
//! The audio thread pushes samples into an `AnalyserTap`; the render thread
//! pulls byte-scaled magnitude spectra from the paired `Analyser`, computed
//! on demand from the most recent `fft_size` samples.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::{Arc, Mutex, PoisonError};

use crate::params::AnalyserConfig;

/// Write side, owned by the audio thread
#[derive(Clone)]
pub struct AnalyserTap {
    samples: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl AnalyserTap {
    /// Append samples, keeping only the most recent window
    pub fn push(&self, block: &[f32]) {
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        samples.extend(block.iter().copied());
        let excess = samples.len().saturating_sub(self.capacity);
        samples.drain(..excess);
    }
}

/// Read side, owned by the render thread
pub struct Analyser {
    config: AnalyserConfig,
    samples: Arc<Mutex<VecDeque<f32>>>,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

/// Create a connected analyser/tap pair
pub fn analyser(config: &AnalyserConfig) -> (Analyser, AnalyserTap) {
    let size = config.fft_size;
    let samples = Arc::new(Mutex::new(VecDeque::from(vec![0.0; size])));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(size);

    let analyser = Analyser {
        config: config.clone(),
        samples: Arc::clone(&samples),
        fft,
        window: (0..size).map(|i| blackman_window(i, size)).collect(),
        spectrum: vec![Complex::new(0.0, 0.0); size],
        smoothed: vec![0.0; size / 2],
    };
    let tap = AnalyserTap {
        samples,
        capacity: size,
    };
    (analyser, tap)
}

impl Analyser {
    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    /// Fill `out` with the current magnitude spectrum scaled to 0..=255
    ///
    /// Writes `min(out.len(), frequency_bin_count)` entries.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.update_spectrum();

        let range = self.config.max_db - self.config.min_db;
        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            let db = 20.0 * magnitude.log10();
            let scaled = (255.0 / range) * (db - self.config.min_db);
            *byte = if scaled.is_finite() {
                scaled.floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }

    /// Window, transform and smooth the latest samples
    fn update_spectrum(&mut self) {
        {
            let samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
            for ((bin, &s), &w) in self.spectrum.iter_mut().zip(samples.iter()).zip(&self.window) {
                *bin = Complex::new(s * w, 0.0);
            }
        }
        self.fft.process(&mut self.spectrum);

        let size = self.config.fft_size as f32;
        let tau = self.config.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.spectrum) {
            let magnitude = bin.norm() / size;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }
    }
}

/// Blackman window (alpha = 0.16)
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}
