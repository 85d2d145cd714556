//! Impulse buffers: synthetic noise, normalization and resampling.

use rand::Rng;

use crate::params::{audio_constants::CALIBRATION_SAMPLE_RATE_HZ, NoiseChannels};

/// Perceived-loudness calibration applied to normalized impulses (dB)
const GAIN_CALIBRATION_DB: f32 = -58.0;

/// Floor for the RMS used during normalization
const MIN_POWER: f32 = 0.000125;

/// Audio block used as a convolver response
///
/// Channels are stored planar and always have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl ImpulseBuffer {
    /// Build a buffer from planar channel data
    ///
    /// Channels longer than the shortest one are truncated to keep lengths equal.
    pub fn new(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let len = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(len);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn duration_s(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }

    /// Gain that brings this response to the calibrated loudness
    pub fn normalization_scale(&self) -> f32 {
        let count = self.channel_count() * self.len();
        let power = if count == 0 {
            0.0
        } else {
            let sum: f64 = self
                .channels
                .iter()
                .flat_map(|c| c.iter())
                .map(|&s| (s as f64) * (s as f64))
                .sum();
            (sum / count as f64).sqrt() as f32
        };
        let power = if power.is_finite() && power >= MIN_POWER {
            power
        } else {
            MIN_POWER
        };

        let mut scale = 1.0 / power;
        scale *= 10f32.powf(GAIN_CALIBRATION_DB * 0.05);
        if self.sample_rate > 0 {
            scale *= CALIBRATION_SAMPLE_RATE_HZ / self.sample_rate as f32;
        }
        scale
    }

    /// Copy of at most the first `max_duration_s` seconds
    pub fn truncated(&self, max_duration_s: f32) -> Self {
        let max_frames = (max_duration_s.max(0.0) as f64 * self.sample_rate as f64) as usize;
        let frames = self.len().min(max_frames);
        Self {
            sample_rate: self.sample_rate,
            channels: self
                .channels
                .iter()
                .map(|c| c[..frames].to_vec())
                .collect(),
        }
    }

    /// Linearly resample every channel to `target_rate`
    pub fn resampled(&self, target_rate: u32) -> Self {
        if target_rate == self.sample_rate || self.sample_rate == 0 {
            return self.clone();
        }
        let channels = self
            .channels
            .iter()
            .map(|c| resample_linear(c, self.sample_rate, target_rate))
            .collect();
        Self {
            sample_rate: target_rate,
            channels,
        }
    }
}

/// Generate a stereo noise impulse of `duration_s` seconds
///
/// Frames per channel is `floor(duration_s * sample_rate)`; every value is
/// uniform in [-1, 1).
pub fn create_noise<R: Rng>(
    sample_rate: u32,
    duration_s: f32,
    layout: NoiseChannels,
    rng: &mut R,
) -> ImpulseBuffer {
    let frames = (duration_s as f64 * sample_rate as f64) as usize;
    let left: Vec<f32> = (0..frames).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let right = match layout {
        NoiseChannels::Mirrored => left.clone(),
        NoiseChannels::Independent => (0..frames).map(|_| rng.gen_range(-1.0..1.0)).collect(),
    };
    ImpulseBuffer::new(sample_rate, vec![left, right])
}

/// Linear-interpolation sample rate conversion
pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if input.is_empty() || from_rate == to_rate {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (input.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let last = input.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = input[idx.min(last)];
            let b = input[(idx + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}
