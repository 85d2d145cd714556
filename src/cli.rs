//! Command-line argument parsing.

use clap::Parser;
use std::io;
use std::path::PathBuf;

use crate::params::{
    AnalyserConfig, CatalogConfig, GraphParams, NoiseChannels, RecordingConfig, RenderConfig,
    DEFAULT_SOUND_ID,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Convolver")]
#[command(about = "Live microphone convolution with a scrolling spectrogram", long_about = None)]
pub struct Args {
    /// Sound id fetched as the first impulse response
    #[arg(long, value_name = "ID", default_value = DEFAULT_SOUND_ID)]
    pub sound: String,

    /// Catalog API key
    #[arg(long, env = "FREESOUND_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Catalog API root
    #[arg(long, value_name = "URL", default_value = "http://www.freesound.org/api")]
    pub catalog_url: String,

    /// Catalog request timeout
    #[arg(long, value_name = "SECONDS", default_value = "30")]
    pub timeout: u64,

    /// Master output gain (linear)
    #[arg(long, value_name = "GAIN", default_value = "0.7")]
    pub master_gain: f32,

    /// Length of the startup noise impulse
    #[arg(long, value_name = "SECONDS", default_value = "1.0")]
    pub noise_duration: f32,

    /// Draw each noise channel separately instead of mirroring left into right
    #[arg(long)]
    pub independent_noise: bool,

    /// Longest impulse response played; longer samples are truncated
    #[arg(long, value_name = "SECONDS", default_value = "6.0")]
    pub max_impulse: f32,

    /// Song (Ogg Vorbis or WAV) toggled with S, mixed into the output
    #[arg(long, value_name = "PATH")]
    pub song: Option<PathBuf>,

    /// Analyser FFT size (power of two)
    #[arg(long, value_name = "SIZE", default_value = "2048")]
    pub fft_size: usize,

    /// Initial window width
    #[arg(long, value_name = "PIXELS", default_value = "1280")]
    pub width: u32,

    /// Initial window height
    #[arg(long, value_name = "PIXELS", default_value = "720")]
    pub height: u32,

    /// Record output audio and frames (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,
}

impl Args {
    /// Audio graph parameters from the command line
    pub fn graph_params(&self) -> GraphParams {
        let noise_channels = if self.independent_noise {
            NoiseChannels::Independent
        } else {
            NoiseChannels::Mirrored
        };
        GraphParams {
            master_gain: self.master_gain,
            noise_duration_s: self.noise_duration,
            noise_channels,
            max_impulse_s: self.max_impulse,
            analyser: AnalyserConfig {
                fft_size: self.fft_size,
                ..AnalyserConfig::default()
            },
            ..GraphParams::default()
        }
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            base_url: self.catalog_url.clone(),
            api_key: self.api_key.clone().filter(|key| !key.trim().is_empty()),
            timeout_secs: self.timeout,
            initial_sound_id: self.sound.clone(),
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width,
            window_height: self.height,
            ..RenderConfig::default()
        }
    }

    /// Create recording configuration (and its directories) if recording mode is enabled
    pub fn create_recording_config(&self) -> io::Result<Option<RecordingConfig>> {
        let Some(duration) = self.record else {
            return Ok(None);
        };

        let config = RecordingConfig::new(duration);
        std::fs::create_dir_all(config.frames_dir())?;
        std::fs::create_dir_all(&config.output_dir)?;
        Ok(Some(config))
    }
}
