//! Error types for the audio session, sample fetching and presentation.

use thiserror::Error;

/// Failures while opening devices or building the audio session
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio input device found")]
    NoInputDevice,

    #[error("No audio output device found")]
    NoOutputDevice,

    #[error("Invalid audio parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Failed to get audio config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Failed to create WAV writer: {0}")]
    Recording(#[from] hound::Error),
}

/// Failures while turning downloaded bytes into an impulse buffer
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unsupported audio container (expected Ogg Vorbis or WAV)")]
    UnsupportedFormat,

    #[error("Vorbis decode failed: {0}")]
    Vorbis(#[from] lewton::VorbisError),

    #[error("WAV decode failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("Decoded audio contains no samples")]
    Empty,
}

/// Failures anywhere along descriptor -> download -> decode
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid sound id: {id:?}")]
    InvalidSoundId { id: String },

    #[error("Failed to build HTTP client: {reason}")]
    Client { reason: String },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid sound descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Fetch worker for sound {id} exited without a result")]
    WorkerLost { id: String },
}

/// Failures while setting up GPU presentation
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("Failed to find suitable GPU adapter")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
