//! Convolver library - live microphone convolution with a scrolling spectrogram

pub mod audio;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod overlay;
pub mod params;
pub mod rendering;
pub mod visual;
