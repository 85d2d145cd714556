//! Audio graph and analyser configuration.

/// How the synthetic noise impulse fills its two channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseChannels {
    /// Right channel is a copy of the left (long-standing behavior)
    #[default]
    Mirrored,

    /// Each channel gets its own random samples
    Independent,
}

/// Audio graph parameters
#[derive(Debug, Clone)]
pub struct GraphParams {
    /// Master output gain (linear)
    pub master_gain: f32,

    /// All-pass filter center frequency (Hz)
    /// Conventional biquad default: 350
    pub allpass_frequency_hz: f32,

    /// All-pass filter Q (linear)
    pub allpass_q: f32,

    /// Duration of the synthetic noise impulse seeded into the convolver (seconds)
    pub noise_duration_s: f32,

    /// Channel layout of the noise impulse
    pub noise_channels: NoiseChannels,

    /// Scale impulse responses to a calibrated loudness
    pub normalize_impulse: bool,

    /// Longest impulse response the convolver accepts; longer ones are truncated (seconds)
    /// Convolution cost per block grows with this; 6s stays well inside a 128-frame budget
    pub max_impulse_s: f32,

    /// Maximum microphone backlog before old input is dropped (frames)
    /// 4096 ≈ 93ms @ 44.1kHz
    pub max_input_latency_frames: usize,

    /// Analyser settings shared by the pre and post taps
    pub analyser: AnalyserConfig,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            master_gain: 0.7,
            allpass_frequency_hz: 350.0,
            allpass_q: 1.0,
            noise_duration_s: 1.0,
            noise_channels: NoiseChannels::Mirrored,
            normalize_impulse: true,
            max_impulse_s: audio_constants::DEFAULT_MAX_IMPULSE_S,
            max_input_latency_frames: 4096,
            analyser: AnalyserConfig::default(),
        }
    }
}

impl GraphParams {
    /// Validate parameters before building a graph
    pub fn validate(&self) -> Result<(), String> {
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(format!("Master gain must be >= 0, got {}", self.master_gain));
        }
        if !(self.noise_duration_s > 0.0) {
            return Err(format!(
                "Noise duration must be > 0, got {}",
                self.noise_duration_s
            ));
        }
        if !(self.max_impulse_s > 0.0) || !self.max_impulse_s.is_finite() {
            return Err(format!(
                "Maximum impulse length must be > 0, got {}",
                self.max_impulse_s
            ));
        }
        if !(self.allpass_q > 0.0) {
            return Err(format!("All-pass Q must be > 0, got {}", self.allpass_q));
        }
        self.analyser.validate()
    }
}

/// Frequency analyser configuration (fft 2048, smoothing 0.8, -100..-30 dB)
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// Averaging constant between successive snapshots, in [0, 1]
    pub smoothing: f32,

    /// Magnitude mapped to byte 0 (dB)
    pub min_db: f32,

    /// Magnitude mapped to byte 255 (dB)
    pub max_db: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins exposed per snapshot
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(format!(
                "FFT size must be a power of 2 >= 32, got {}",
                self.fft_size
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(format!(
                "Smoothing must be within [0, 1], got {}",
                self.smoothing
            ));
        }
        if self.min_db >= self.max_db {
            return Err(format!(
                "min_db ({}) must be below max_db ({})",
                self.min_db, self.max_db
            ));
        }
        Ok(())
    }
}

/// Audio constants (compile-time)
pub mod audio_constants {
    /// Processing block size (frames); buffer swaps land on block boundaries
    /// 128 = 2.9ms @ 44.1kHz
    pub const BLOCK_SIZE: usize = 128;

    /// Sample rate the impulse normalization is calibrated against (Hz)
    pub const CALIBRATION_SAMPLE_RATE_HZ: f32 = 44100.0;

    /// Default cap on impulse response length (seconds)
    pub const DEFAULT_MAX_IMPULSE_S: f32 = 6.0;
}
