/// Text metrics used by the layout. Implemented by the front end that actually draws text.
pub trait Measurer {
    /// Width and height of `text` on one line.
    fn measure(&self, text: &str) -> (f64, f64);
}

/// Fixed-pitch metrics; good enough for SVG output with a monospace font.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        MonospaceMeasurer {
            char_width: 7.0,
            line_height: 14.0,
        }
    }
}

impl Measurer for MonospaceMeasurer {
    fn measure(&self, text: &str) -> (f64, f64) {
        (text.chars().count() as f64 * self.char_width, self.line_height)
    }
}

impl<M: Measurer + ?Sized> Measurer for &M {
    fn measure(&self, text: &str) -> (f64, f64) {
        (**self).measure(text)
    }
}
