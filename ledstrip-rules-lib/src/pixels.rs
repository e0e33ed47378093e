//! Brightness scaling and strip buffer encoding

use log::debug;
use rgb::RGB8;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::color::Color;

/// Bytes per pixel on the widest supported strip (RGBW)
const MAX_CHANNELS: usize = 4;

/// Scaled bytes for one pixel, in wire order
pub type Pixel = SmallVec<[u8; MAX_CHANNELS]>;

/// Whether the strip has a dedicated white LED per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Rgb,
    #[default]
    Rgbw,
}

impl ChannelMode {
    /// Bytes emitted per pixel
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgbw => 4,
        }
    }
}

/// Scale one channel by `(brightness + 1) / 256` in fixed point.
///
/// Truncates, so brightness 255 keeps full intensity and 0 gives zero.
#[inline]
#[must_use]
pub fn scale_channel(value: u8, brightness: u8) -> u8 {
    // 255 * 256 >> 8 == 255, so the result always fits
    #[allow(clippy::cast_possible_truncation)]
    let scaled = ((u16::from(value) * (u16::from(brightness) + 1)) >> 8) as u8;
    scaled
}

/// Scaled bytes for a single pixel: R, G, B and, in RGBW mode, W
#[must_use]
pub fn scale_pixel(color: Color, brightness: u8, mode: ChannelMode) -> Pixel {
    let rgb: RGB8 = color.rgb();
    let mut pixel: Pixel = [rgb.r, rgb.g, rgb.b]
        .into_iter()
        .map(|c| scale_channel(c, brightness))
        .collect();
    if mode == ChannelMode::Rgbw {
        pixel.push(scale_channel(color.w, brightness));
    }
    debug_assert_eq!(pixel.len(), mode.channels());
    pixel
}

/// Encode a whole strip lit with one color.
///
/// The scaled pixel is repeated `strip_count` times. Inputs are expected to be
/// validated already, so there is no error path.
#[must_use]
pub fn encode(color: Color, brightness: u8, mode: ChannelMode, strip_count: usize) -> Vec<u8> {
    let pixel = scale_pixel(color, brightness, mode);
    debug!("Pixel: {:?} x {strip_count}", pixel.as_slice());
    pixel.repeat(strip_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_brightness_keeps_full_red() {
        let buf = encode(Color::new(255, 0, 0, 0), 255, ChannelMode::Rgb, 1);
        assert_eq!(buf, vec![255, 0, 0]);
    }

    #[test]
    fn test_zero_brightness_is_dark() {
        let buf = encode(Color::new(255, 255, 255, 255), 0, ChannelMode::Rgbw, 2);
        assert_eq!(buf, vec![0; 8]);
    }

    #[test]
    fn test_rgbw_repeated_across_strip() {
        let buf = encode(Color::new(10, 20, 30, 40), 255, ChannelMode::Rgbw, 3);
        assert_eq!(buf, [10u8, 20, 30, 40].repeat(3));
    }

    #[test]
    fn test_rgb_mode_drops_white() {
        let buf = encode(Color::new(10, 20, 30, 40), 255, ChannelMode::Rgb, 2);
        assert_eq!(buf, vec![10, 20, 30, 10, 20, 30]);
    }

    #[test]
    fn test_half_brightness_truncates() {
        // (255 * 128) >> 8 = 127, (3 * 128) >> 8 = 1
        assert_eq!(scale_channel(255, 127), 127);
        assert_eq!(scale_channel(3, 127), 1);
        assert_eq!(scale_channel(1, 254), 0);
    }

    #[test]
    fn test_original_strip_length() {
        // Default geometry: 144 RGBW pixels
        let buf = encode(Color::new(0, 0, 0, 230), 255, ChannelMode::Rgbw, 144);
        assert_eq!(buf.len(), 576);
        assert!(buf.chunks(4).all(|p| p == [0, 0, 0, 230]));
    }

    #[test]
    fn test_matches_smart_leds_brightness() {
        // smart-leds applies the same (brightness + 1) / 256 scaling to RGB
        for brightness in [0u8, 1, 64, 127, 128, 200, 254, 255] {
            for value in [0u8, 1, 17, 128, 254, 255] {
                let color = RGB8::new(value, value / 2, 255 - value);
                let expected: Vec<RGB8> =
                    smart_leds::brightness(std::iter::once(color), brightness).collect();
                let ours = scale_pixel(Color::new(color.r, color.g, color.b, 0), brightness, ChannelMode::Rgb);
                assert_eq!(
                    ours.as_slice(),
                    &[expected[0].r, expected[0].g, expected[0].b],
                    "value={value} brightness={brightness}"
                );
            }
        }
    }

    #[test]
    fn test_channel_mode_wire_names() {
        let parse = |v: serde_json::Value| serde_json::from_value::<ChannelMode>(v).ok();
        assert_eq!(parse(serde_json::json!("rgb")), Some(ChannelMode::Rgb));
        assert_eq!(parse(serde_json::json!("rgbw")), Some(ChannelMode::Rgbw));
        assert_eq!(parse(serde_json::json!("RGB")), None);
        assert_eq!(parse(serde_json::json!(3)), None);
    }
}
