//! Spectrogram visualization on a CPU canvas.

mod canvas;
mod render_loop;
mod spectrogram;

pub use canvas::{Canvas, Rgba};
pub use render_loop::{RenderLoop, RenderLoopHandle};
pub use spectrogram::Spectrogram;
