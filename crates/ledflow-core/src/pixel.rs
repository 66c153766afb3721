//! Pixel encodings
//!
//! An encoding fixes how many DMX channels one physical pixel consumes and
//! how channel values map onto wire bytes. Only 3-channel RGB8 exists today;
//! further encodings (RGBW, 16-bit) are new variants, not conditional
//! branches.

use serde::{Deserialize, Serialize};

/// Channel count of a standard DMX universe
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Highest valid sACN universe number
pub const UNIVERSE_MAX: u16 = 63999;

/// Pixel encoding of a strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelKind {
    /// 8-bit RGB: three consecutive channels map onto one pixel, in order
    Rgb8,
}

impl PixelKind {
    /// DMX channels consumed by one pixel of this encoding
    pub const fn channel_span(self) -> usize {
        match self {
            PixelKind::Rgb8 => 3,
        }
    }

    /// Stable label used in configuration files
    pub const fn label(self) -> &'static str {
        match self {
            PixelKind::Rgb8 => "rgb8",
        }
    }
}

impl std::fmt::Display for PixelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb8_spans_three_channels() {
        assert_eq!(PixelKind::Rgb8.channel_span(), 3);
    }

    #[test]
    fn config_label_round_trip() {
        let json = serde_json::to_string(&PixelKind::Rgb8).unwrap();
        assert_eq!(json, "\"rgb8\"");
        let kind: PixelKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, PixelKind::Rgb8);
    }
}
