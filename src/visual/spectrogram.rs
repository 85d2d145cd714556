//! Scrolling spectrogram painter.

use super::canvas::{Canvas, Rgba};
use crate::audio::Analyser;
use crate::params::RenderConfig;

/// Paints one column per frame: pre-effect in red, post-effect in blue
pub struct Spectrogram {
    column: u32,
    pre_alpha: f32,
    post_alpha: f32,
    pre: Vec<u8>,
    post: Vec<u8>,
}

impl Spectrogram {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            column: 0,
            pre_alpha: config.pre_alpha,
            post_alpha: config.post_alpha,
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    /// Column the next frame paints into
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Read both analysers and paint the next column
    pub fn render_frame(&mut self, canvas: &mut Canvas, pre: &mut Analyser, post: &mut Analyser) {
        self.pre.resize(pre.frequency_bin_count(), 0);
        self.post.resize(post.frequency_bin_count(), 0);
        pre.byte_frequency_data(&mut self.pre);
        post.byte_frequency_data(&mut self.post);

        let pre_bins = std::mem::take(&mut self.pre);
        let post_bins = std::mem::take(&mut self.post);
        self.paint_column(canvas, &pre_bins, &post_bins);
        self.pre = pre_bins;
        self.post = post_bins;
    }

    /// Paint the lower half of the spectrum at the current column, then advance
    ///
    /// Bin `i` covers rows `2i` and `2i + 1`.
    pub fn paint_column(&mut self, canvas: &mut Canvas, pre: &[u8], post: &[u8]) {
        let x = self.column as i64;
        for (i, (&pre_level, &post_level)) in pre.iter().zip(post).take(pre.len() / 2).enumerate() {
            let y = 2 * i as i64;
            canvas.fill_rect(x, y, 1, 2, Rgba::new(pre_level, 0, 0, self.pre_alpha));
            canvas.fill_rect(x, y, 1, 2, Rgba::new(0, 0, post_level, self.post_alpha));
        }

        self.column += 1;
        if self.column >= canvas.width() {
            self.column = 0;
        }
    }

    /// Keep the column inside a resized canvas
    pub fn on_resize(&mut self, width: u32) {
        if self.column >= width {
            self.column = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analyser;
    use crate::params::AnalyserConfig;

    fn spectrogram() -> Spectrogram {
        Spectrogram::new(&RenderConfig::default())
    }

    #[test]
    fn test_column_wraps_after_width_frames() {
        let mut canvas = Canvas::new(5, 8);
        let mut spectrogram = spectrogram();
        let bins = [0u8; 8];

        for frame in 1..=5 {
            spectrogram.paint_column(&mut canvas, &bins, &bins);
            assert!(spectrogram.column() <= canvas.width());
            assert_eq!(spectrogram.column(), frame % 5);
        }
        assert_eq!(spectrogram.column(), 0);
    }

    #[test]
    fn test_paints_lower_half_of_bins() {
        let mut canvas = Canvas::new(2, 16);
        let mut spectrogram = spectrogram();
        let pre = [255u8; 8];
        let post = [0u8; 8];

        spectrogram.paint_column(&mut canvas, &pre, &post);

        // 4 bins painted, 2 rows each
        for y in 0..8 {
            let pixel = canvas.pixel(0, y).unwrap();
            assert!(pixel[0] > 0 && pixel[3] > 0, "row {} unpainted", y);
        }
        for y in 8..16 {
            assert_eq!(canvas.pixel(0, y), Some([0, 0, 0, 0]));
        }
        // Other columns untouched
        assert_eq!(canvas.pixel(1, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_resize_resets_column_outside_canvas() {
        let mut canvas = Canvas::new(10, 4);
        let mut spectrogram = spectrogram();
        let bins = [0u8; 4];
        for _ in 0..7 {
            spectrogram.paint_column(&mut canvas, &bins, &bins);
        }
        assert_eq!(spectrogram.column(), 7);

        spectrogram.on_resize(20);
        assert_eq!(spectrogram.column(), 7);

        spectrogram.on_resize(5);
        assert_eq!(spectrogram.column(), 0);
    }

    #[test]
    fn test_render_frame_uses_analysers() {
        let config = AnalyserConfig::default();
        let (mut pre, _pre_tap) = analyser(&config);
        let (mut post, _post_tap) = analyser(&config);
        let mut canvas = Canvas::new(3, 3);
        let mut spectrogram = spectrogram();

        spectrogram.render_frame(&mut canvas, &mut pre, &mut post);
        assert_eq!(spectrogram.column(), 1);
        assert_eq!(spectrogram.pre.len(), config.frequency_bin_count());
    }
}
