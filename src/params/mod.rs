//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable numbers live here with:
//! - Physical units (seconds, Hz, dB, pixels)
//! - Documented ranges and meanings
//! - Conventional audio-node defaults

mod audio;
mod catalog;
mod render;

// Re-export all types
pub use audio::{audio_constants, AnalyserConfig, GraphParams, NoiseChannels};
pub use catalog::{CatalogConfig, DEFAULT_SOUND_ID};
pub use render::{RecordingConfig, RenderConfig};
