//! Text measurement for the built-in PDF fonts.
//!
//! Widths come from the standard Helvetica and Helvetica-Bold metrics
//! (1/1000 em, printable ASCII). Times is approximated from Helvetica;
//! Courier is monospaced.

use crate::config::FontSpec;

/// Family of a built-in PDF font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Map a configured family name. Arial and unknown names fall back to
    /// Helvetica.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "times" | "times-roman" | "times new roman" => FontFamily::Times,
            "courier" | "courier new" => FontFamily::Courier,
            _ => FontFamily::Helvetica,
        }
    }
}

/// A concrete font face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontFace {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

impl FontFace {
    pub const HELVETICA: FontFace = FontFace {
        family: FontFamily::Helvetica,
        bold: false,
        italic: false,
    };

    pub const HELVETICA_BOLD: FontFace = FontFace {
        family: FontFamily::Helvetica,
        bold: true,
        italic: false,
    };

    pub fn from_spec(spec: &FontSpec) -> Self {
        Self {
            family: FontFamily::from_name(&spec.family),
            bold: spec.is_bold(),
            italic: spec.is_italic(),
        }
    }

    /// Width of `text` at `size`, in the same unit as `size`.
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| self.char_width(c)).sum();
        units as f64 * size / 1000.0
    }

    fn char_width(&self, c: char) -> u32 {
        match self.family {
            FontFamily::Courier => 600,
            FontFamily::Helvetica => helvetica_width(c, self.bold),
            FontFamily::Times => helvetica_width(c, self.bold) * 9 / 10,
        }
    }
}

const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a-m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n-z
    389, 280, 389, 584, // {..~
];

fn helvetica_width(c: char, bold: bool) -> u32 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    let code = c as u32;
    if (32..=126).contains(&code) {
        table[(code - 32) as usize] as u32
    } else {
        556
    }
}

/// Largest size not above `max_size` (and not below `min_size`) at which
/// `text` fits in `width`.
pub fn fit_size(face: FontFace, text: &str, max_size: f64, min_size: f64, width: f64) -> f64 {
    let natural = face.text_width(text, max_size);
    if natural <= width || natural == 0.0 {
        return max_size;
    }
    (max_size * width / natural).max(min_size)
}

/// Cut `text` with a trailing ellipsis so it fits in `width`.
pub fn ellipsize(face: FontFace, text: &str, size: f64, width: f64) -> String {
    if face.text_width(text, size) <= width {
        return text.to_string();
    }
    let mut out: String = text.to_string();
    while !out.is_empty() && face.text_width(&format!("{}...", out), size) > width {
        out.pop();
    }
    format!("{}...", out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        // "Hello" in Helvetica: 722 + 556 + 222 + 222 + 556 = 2278
        let w = FontFace::HELVETICA.text_width("Hello", 10.0);
        assert!((w - 22.78).abs() < 1e-9);
        assert!(FontFace::HELVETICA_BOLD.text_width("Hello", 10.0) > w);
    }

    #[test]
    fn test_courier_is_monospaced() {
        let face = FontFace {
            family: FontFamily::Courier,
            bold: false,
            italic: false,
        };
        assert_eq!(face.text_width("iiii", 10.0), face.text_width("MMMM", 10.0));
    }

    #[test]
    fn test_family_mapping() {
        assert_eq!(FontFamily::from_name("Arial"), FontFamily::Helvetica);
        assert_eq!(FontFamily::from_name("TIMES"), FontFamily::Times);
        assert_eq!(FontFamily::from_name("courier"), FontFamily::Courier);
    }

    #[test]
    fn test_fit_and_ellipsize() {
        let face = FontFace::HELVETICA;
        let text = "a-very-long-bucket-name-that-will-not-fit";
        let size = fit_size(face, text, 12.0, 6.0, 100.0);
        assert!(size < 12.0 && size >= 6.0);
        assert_eq!(fit_size(face, "ok", 12.0, 6.0, 100.0), 12.0);

        let cut = ellipsize(face, text, 12.0, 60.0);
        assert!(cut.ends_with("..."));
        assert!(face.text_width(&cut, 12.0) <= 60.0);
    }
}
