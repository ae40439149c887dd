//! Static font-metric tables used to measure text runs.
//!
//! Character widths are in em units (relative to font size). Tables cover the
//! printable ASCII range 0x20..=0x7E; index = (char as usize) - 32. Anything
//! outside that range is measured with the table's average width.

use serde::{Deserialize, Serialize};

/// Line box height as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.2;

/// Font families the measurer knows how to size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    /// Humanist sans-serif, the document default.
    #[default]
    SansSerif,
    /// Old-style serif, roughly 85% of the sans widths.
    Serif,
    /// Fixed-pitch, every glyph 0.6em.
    Monospace,
}

/// Character-width table for one font family.
pub struct FontMetricTable {
    pub font: FontFamily,
    widths: [f64; 95],
    /// Fallback width for characters outside 0x20..=0x7E.
    pub average_char_width: f64,
    pub space_width: f64,
}

impl FontMetricTable {
    /// Width of `s` in em units.
    pub fn measure_str(&self, s: &str) -> f64 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Width of `s` in pixels at `font_size`.
    pub fn measure_px(&self, s: &str, font_size: f64) -> f64 {
        self.measure_str(s) * font_size
    }

    /// Width of one inter-word space in pixels at `font_size`.
    pub fn space_px(&self, font_size: f64) -> f64 {
        self.space_width * font_size
    }
}

static SANS_SERIF_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::SansSerif,
    #[rustfmt::skip]
    widths: [
        // space ! " # $ % & ' ( ) * + , - . /
        0.25, 0.30, 0.38, 0.56, 0.56, 0.89, 0.67, 0.22, 0.33, 0.33, 0.39, 0.59, 0.28, 0.33, 0.28, 0.31,
        // digits
        0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
        // : ; < = > ? @
        0.28, 0.28, 0.59, 0.59, 0.59, 0.50, 1.02,
        // A..M
        0.67, 0.61, 0.61, 0.67, 0.56, 0.50, 0.67, 0.67, 0.25, 0.39, 0.61, 0.53, 0.78,
        // N..Z
        0.67, 0.72, 0.56, 0.72, 0.61, 0.50, 0.56, 0.67, 0.67, 0.89, 0.61, 0.61, 0.56,
        // [ \ ] ^ _ `
        0.28, 0.31, 0.28, 0.47, 0.56, 0.34,
        // a..m
        0.56, 0.56, 0.50, 0.56, 0.56, 0.31, 0.56, 0.56, 0.22, 0.22, 0.53, 0.22, 0.83,
        // n..z
        0.56, 0.56, 0.56, 0.56, 0.33, 0.44, 0.39, 0.56, 0.50, 0.72, 0.50, 0.50, 0.44,
        // { | } ~
        0.33, 0.26, 0.33, 0.59,
    ],
    average_char_width: 0.52,
    space_width: 0.25,
};

static SERIF_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Serif,
    #[rustfmt::skip]
    widths: [
        // space ! " # $ % & ' ( ) * + , - . /
        0.21, 0.26, 0.32, 0.48, 0.48, 0.76, 0.57, 0.19, 0.28, 0.28, 0.33, 0.50, 0.24, 0.28, 0.24, 0.26,
        // digits
        0.48, 0.48, 0.48, 0.48, 0.48, 0.48, 0.48, 0.48, 0.48, 0.48,
        // : ; < = > ? @
        0.24, 0.24, 0.50, 0.50, 0.50, 0.43, 0.87,
        // A..M
        0.57, 0.52, 0.52, 0.57, 0.48, 0.43, 0.57, 0.57, 0.21, 0.33, 0.52, 0.45, 0.66,
        // N..Z
        0.57, 0.61, 0.48, 0.61, 0.52, 0.43, 0.48, 0.57, 0.57, 0.76, 0.52, 0.52, 0.48,
        // [ \ ] ^ _ `
        0.24, 0.26, 0.24, 0.40, 0.48, 0.29,
        // a..m
        0.48, 0.48, 0.43, 0.48, 0.48, 0.26, 0.48, 0.48, 0.19, 0.19, 0.45, 0.19, 0.71,
        // n..z
        0.48, 0.48, 0.48, 0.48, 0.28, 0.37, 0.33, 0.48, 0.43, 0.61, 0.43, 0.43, 0.37,
        // { | } ~
        0.28, 0.22, 0.28, 0.50,
    ],
    average_char_width: 0.44,
    space_width: 0.21,
};

static MONOSPACE_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Monospace,
    widths: [0.60; 95],
    average_char_width: 0.60,
    space_width: 0.60,
};

/// Returns the static metric table for a font family.
pub fn get_metrics(font: FontFamily) -> &'static FontMetricTable {
    match font {
        FontFamily::SansSerif => &SANS_SERIF_TABLE,
        FontFamily::Serif => &SERIF_TABLE,
        FontFamily::Monospace => &MONOSPACE_TABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_str_empty_returns_zero() {
        assert_eq!(get_metrics(FontFamily::SansSerif).measure_str(""), 0.0);
    }

    #[test]
    fn test_measure_str_ascii_characters() {
        // "Headline" = H(0.67) + e(0.56) + a(0.56) + d(0.56) + l(0.22) + i(0.22) + n(0.56) + e(0.56)
        let width = get_metrics(FontFamily::SansSerif).measure_str("Headline");
        assert!((width - 3.91).abs() < 1e-3, "got {width}");
    }

    #[test]
    fn test_measure_str_non_ascii_falls_back() {
        let metrics = get_metrics(FontFamily::Serif);
        let width = metrics.measure_str("é");
        assert!((width - metrics.average_char_width).abs() < 1e-4);
    }

    #[test]
    fn test_measure_px_scales_with_font_size() {
        let metrics = get_metrics(FontFamily::Monospace);
        assert!((metrics.measure_px("abcd", 10.0) - 24.0).abs() < 1e-3);
        assert!((metrics.measure_px("abcd", 20.0) - 48.0).abs() < 1e-3);
        assert!((metrics.space_px(10.0) - 6.0).abs() < 1e-3);
    }

    #[test]
    fn test_serif_narrower_than_sans() {
        let text = "Fit the text to the box";
        assert!(
            get_metrics(FontFamily::Serif).measure_str(text)
                < get_metrics(FontFamily::SansSerif).measure_str(text)
        );
    }

    #[test]
    fn test_family_deserializes_from_kebab_case() {
        let family: FontFamily = serde_json::from_str("\"sans-serif\"").unwrap();
        assert_eq!(family, FontFamily::SansSerif);
        let family: FontFamily = serde_json::from_str("\"monospace\"").unwrap();
        assert_eq!(family, FontFamily::Monospace);
    }
}
