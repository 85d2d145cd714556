//! Per-frame render loop with explicit cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::canvas::Canvas;
use super::spectrogram::Spectrogram;
use crate::audio::Analyser;

/// Drives the spectrogram once per redraw until stopped
pub struct RenderLoop {
    spectrogram: Spectrogram,
    running: Arc<AtomicBool>,
    frames: u64,
}

/// Stops a running `RenderLoop` from anywhere
#[derive(Clone)]
pub struct RenderLoopHandle {
    running: Arc<AtomicBool>,
}

impl RenderLoopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl RenderLoop {
    pub fn new(spectrogram: Spectrogram) -> (Self, RenderLoopHandle) {
        let running = Arc::new(AtomicBool::new(true));
        let handle = RenderLoopHandle {
            running: Arc::clone(&running),
        };
        let render_loop = Self {
            spectrogram,
            running,
            frames: 0,
        };
        (render_loop, handle)
    }

    /// Run one iteration; returns whether the loop wants another frame
    pub fn run_frame(&mut self, canvas: &mut Canvas, pre: &mut Analyser, post: &mut Analyser) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        self.spectrogram.render_frame(canvas, pre, post);
        self.frames += 1;
        true
    }

    /// Frames painted so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Forward a canvas resize to the painter
    pub fn on_resize(&mut self, width: u32) {
        self.spectrogram.on_resize(width);
    }
}
