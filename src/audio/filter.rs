//! Biquad all-pass filter (RBJ Audio EQ Cookbook).

use std::f64::consts::PI;

/// Second-order all-pass filter, transposed direct form II
#[derive(Debug, Clone)]
pub struct AllPassFilter {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl AllPassFilter {
    /// Create an all-pass filter centered on `frequency_hz`
    pub fn new(frequency_hz: f32, q: f32, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f64;
        let freq = (frequency_hz as f64).clamp(1.0, sample_rate * 0.49);
        let q = (q as f64).max(0.001);

        let omega = 2.0 * PI * freq / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - alpha) / a0,
            b1: (-2.0 * cos_omega) / a0,
            b2: (1.0 + alpha) / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn process_sample(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y as f32
    }

    /// Filter `input` into `output` (equal lengths)
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        for (out, &x) in output.iter_mut().zip(input) {
            *out = self.process_sample(x);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allpass_preserves_amplitude() {
        let sample_rate = 44100;
        let mut filter = AllPassFilter::new(350.0, 1.0, sample_rate);
        let tone = |n: usize| (2.0 * PI * 1000.0 * n as f64 / sample_rate as f64).sin() as f32;

        // Settle
        for n in 0..2000 {
            filter.process_sample(tone(n));
        }

        let max_amplitude = (2000..2441)
            .map(|n| filter.process_sample(tone(n)).abs())
            .fold(0.0f32, f32::max);

        assert!(
            max_amplitude > 0.95 && max_amplitude < 1.05,
            "All-pass amplitude not preserved: {}",
            max_amplitude
        );
    }

    #[test]
    fn test_allpass_passes_dc() {
        let mut filter = AllPassFilter::new(350.0, 1.0, 48000);
        let mut last = 0.0;
        for _ in 0..48000 {
            last = filter.process_sample(1.0);
        }
        assert!((last - 1.0).abs() < 1e-3);
    }
}
