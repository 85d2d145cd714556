//! Microphone convolution graph and frequency analysis.
//!
//! Microphone audio runs through an all-pass filter and a swappable
//! convolver to the output, with analyser taps before and after the
//! convolver for the spectrogram.

mod analyser;
mod buffer;
mod convolver;
mod filter;
mod graph;
mod song;
mod sweep;
mod system;

// Re-export public types
pub use analyser::{analyser, blackman_window, Analyser, AnalyserTap};
pub use buffer::{create_noise, resample_linear, ImpulseBuffer};
pub use convolver::{convolver, Convolver, ConvolverHandle, ConvolverKernel};
pub use filter::AllPassFilter;
pub use graph::{AudioGraph, GraphHandles, SweepTrigger};
pub use song::{SongControl, SongVoice};
pub use sweep::SawSweep;
pub use system::AudioSession;
