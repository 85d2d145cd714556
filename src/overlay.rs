//! Sound id text field drawn over the spectrogram.
//!
//! The field appears on mouse movement and hides again after a short idle
//! period unless it has keyboard focus.

use std::time::{Duration, Instant};

use crate::visual::{Canvas, Rgba};

const FIELD_X: i64 = 16;
const FIELD_Y: i64 = 16;
const FIELD_WIDTH: u32 = 168;
const FIELD_HEIGHT: u32 = 32;
const MAX_LEN: usize = 12;

/// Glyph pixel size
const SCALE: u32 = 3;

/// 3x5 digit glyphs, one row per entry, high bit on the left
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// The sound id input field
#[derive(Debug)]
pub struct SoundInput {
    text: String,
    visible: bool,
    focused: bool,
    hide_at: Option<Instant>,
    idle: Duration,
}

impl SoundInput {
    /// Hidden, empty field that hides `idle` after the last mouse movement
    pub fn new(idle: Duration) -> Self {
        Self {
            text: String::new(),
            visible: false,
            focused: false,
            hide_at: None,
            idle,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Show the field and restart the idle timer
    pub fn pointer_moved(&mut self, now: Instant) {
        self.visible = true;
        self.hide_at = Some(now + self.idle);
    }

    /// Fire the idle timer if it has expired
    pub fn tick(&mut self, now: Instant) {
        match self.hide_at {
            Some(deadline) if now >= deadline => {
                self.hide_at = None;
                if !self.focused {
                    self.visible = false;
                }
            }
            _ => {}
        }
    }

    pub fn set_focus(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Whether `(x, y)` lands on the visible field
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.visible
            && x >= FIELD_X as f64
            && x < (FIELD_X + FIELD_WIDTH as i64) as f64
            && y >= FIELD_Y as f64
            && y < (FIELD_Y + FIELD_HEIGHT as i64) as f64
    }

    /// Type into the field; only digits are accepted
    pub fn key_text(&mut self, typed: &str) {
        if !self.focused {
            return;
        }
        for c in typed.chars().filter(char::is_ascii_digit) {
            if self.text.len() < MAX_LEN {
                self.text.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if self.focused {
            self.text.pop();
        }
    }

    /// The sound id to fetch when Enter is pressed in the focused field
    pub fn submit(&self) -> Option<String> {
        let id = self.text.trim();
        (self.focused && !id.is_empty()).then(|| id.to_string())
    }

    /// Draw the field if visible
    pub fn draw(&self, canvas: &mut Canvas) {
        if !self.visible {
            return;
        }

        let border = if self.focused {
            Rgba::new(90, 140, 255, 1.0)
        } else {
            Rgba::new(160, 160, 160, 1.0)
        };
        canvas.fill_rect(FIELD_X, FIELD_Y, FIELD_WIDTH, FIELD_HEIGHT, border);
        canvas.fill_rect(
            FIELD_X + 2,
            FIELD_Y + 2,
            FIELD_WIDTH - 4,
            FIELD_HEIGHT - 4,
            Rgba::new(250, 250, 250, 1.0),
        );

        let ink = Rgba::new(20, 20, 20, 1.0);
        let glyph_y = FIELD_Y + ((FIELD_HEIGHT - 5 * SCALE) / 2) as i64;
        let mut glyph_x = FIELD_X + 8;
        for digit in self.text.chars().filter_map(|c| c.to_digit(10)) {
            draw_glyph(canvas, &DIGITS[digit as usize], glyph_x, glyph_y, ink);
            glyph_x += 4 * SCALE as i64;
        }

        if self.focused {
            canvas.fill_rect(glyph_x, glyph_y - 1, 1, 5 * SCALE + 2, ink);
        }
    }
}

fn draw_glyph(canvas: &mut Canvas, rows: &[u8; 5], x: i64, y: i64, color: Rgba) {
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..3 {
            if bits & (0b100 >> col) != 0 {
                canvas.fill_rect(
                    x + (col * SCALE) as i64,
                    y + (row as u32 * SCALE) as i64,
                    SCALE,
                    SCALE,
                    color,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_millis(500);

    #[test]
    fn test_starts_hidden() {
        let input = SoundInput::new(IDLE);
        assert!(!input.is_visible());
        assert!(!input.contains(20.0, 20.0));
    }

    #[test]
    fn test_hides_after_idle_without_focus() {
        let start = Instant::now();
        let mut input = SoundInput::new(IDLE);

        input.pointer_moved(start);
        assert!(input.is_visible());

        input.tick(start + Duration::from_millis(499));
        assert!(input.is_visible());

        input.tick(start + Duration::from_millis(500));
        assert!(!input.is_visible());
    }

    #[test]
    fn test_stays_visible_with_focus() {
        let start = Instant::now();
        let mut input = SoundInput::new(IDLE);

        input.pointer_moved(start);
        input.set_focus(true);
        input.tick(start + Duration::from_secs(2));
        assert!(input.is_visible());

        // Timer fired once; losing focus later does not hide by itself
        input.set_focus(false);
        input.tick(start + Duration::from_secs(3));
        assert!(input.is_visible());
    }

    #[test]
    fn test_movement_restarts_timer() {
        let start = Instant::now();
        let mut input = SoundInput::new(IDLE);

        input.pointer_moved(start);
        input.pointer_moved(start + Duration::from_millis(400));
        input.tick(start + Duration::from_millis(600));
        assert!(input.is_visible());

        input.tick(start + Duration::from_millis(900));
        assert!(!input.is_visible());
    }

    #[test]
    fn test_typing_and_submit() {
        let mut input = SoundInput::new(IDLE);
        input.pointer_moved(Instant::now());

        // Unfocused field ignores keys
        input.key_text("1");
        assert_eq!(input.text(), "");
        assert_eq!(input.submit(), None);

        input.set_focus(true);
        input.key_text("16a3");
        input.key_text("2239");
        input.backspace();
        assert_eq!(input.text(), "163223");
        assert_eq!(input.submit(), Some("163223".to_string()));

        input.set_focus(false);
        assert_eq!(input.submit(), None);
    }

    #[test]
    fn test_contains_field_rect() {
        let mut input = SoundInput::new(IDLE);
        input.pointer_moved(Instant::now());
        assert!(input.contains(20.0, 20.0));
        assert!(!input.contains(5.0, 20.0));
        assert!(!input.contains(20.0, 60.0));
    }

    #[test]
    fn test_draw_only_when_visible() {
        let mut canvas = Canvas::new(200, 60);
        let mut input = SoundInput::new(IDLE);

        input.draw(&mut canvas);
        assert!(canvas.as_bytes().iter().all(|&b| b == 0));

        input.pointer_moved(Instant::now());
        input.set_focus(true);
        input.key_text("8");
        input.draw(&mut canvas);
        assert_eq!(canvas.pixel(16, 16), Some([90, 140, 255, 255]));
        assert_eq!(canvas.pixel(24, 24), Some([20, 20, 20, 255]));
    }
}
