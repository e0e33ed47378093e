use rgb::RGB8;
use serde::{Deserialize, Serialize};

/// A strip color with a dedicated white channel.
///
/// On the wire this is always a 4-element array `[r, g, b, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Color {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    /// The color part without the white channel
    #[must_use]
    pub const fn rgb(self) -> RGB8 {
        RGB8::new(self.r, self.g, self.b)
    }

    /// Same color with the white channel cleared, for strips without a W LED
    #[must_use]
    pub fn without_white(self) -> Self {
        Self::from(self.rgb())
    }

    #[must_use]
    pub const fn components(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.w]
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, w]: [u8; 4]) -> Self {
        Self { r, g, b, w }
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        color.components()
    }
}

impl From<RGB8> for Color {
    fn from(rgb: RGB8) -> Self {
        Self::new(rgb.r, rgb.g, rgb.b, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_array() {
        let color = Color::new(1, 2, 3, 4);
        assert_eq!(serde_json::to_string(&color).unwrap(), "[1,2,3,4]");

        let parsed: Color = serde_json::from_str("[0,0,0,230]").unwrap();
        assert_eq!(parsed, Color::new(0, 0, 0, 230));
    }

    #[test]
    fn test_without_white() {
        let color = Color::new(10, 20, 30, 40);
        assert_eq!(color.without_white(), Color::new(10, 20, 30, 0));
        assert_eq!(color.rgb(), RGB8::new(10, 20, 30));
    }
}
