use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt,
    ops::Mul,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Mul<f32> for Size {
    type Output = Size;

    fn mul(self, rhs: f32) -> Self::Output {
        Size {
            width: self.width * rhs,
            height: self.height * rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Mul<f32> for Position {
    type Output = Position;
    fn mul(self, factor: f32) -> Self::Output {
        Position {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of `size` whose top edge sits at `top` and is horizontally centred on `center_x`.
    pub fn centered_at(center_x: f32, top: f32, size: Size) -> Self {
        Self::new(center_x - size.width / 2.0, top, size.width, size.height)
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.x
            && position.x <= self.x + self.width
            && position.y >= self.y
            && position.y <= self.y + self.height
    }

    /// True when `other` lies fully inside `self`.
    pub fn encloses(&self, other: &Rectangle) -> bool {
        self.contains(other.pos())
            && self.contains(Position::new(
                other.x + other.width,
                other.y + other.height,
            ))
    }

    pub fn pos(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Element-wise distance used to compare layouts rendered at different scales.
    pub fn max_deviation(&self, other: &Rectangle) -> f32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.width - other.width).abs())
            .max((self.height - other.height).abs())
    }
}

// Scales origin and extent together, mapping design units onto pixels.
impl Mul<f32> for Rectangle {
    type Output = Rectangle;
    fn mul(self, factor: f32) -> Self::Output {
        Rectangle::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }
}

/// Straight (non-premultiplied) RGBA color. Serialised as a CSS-like hex string
/// (`#rrggbb` or `#rrggbbaa`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(0xff, 0xff, 0xff);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    /// Same color with the alpha channel replaced by `opacity` in `[0, 1]`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            a: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgba::parse_hex(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid color `{s}`, expected #rrggbb[aa]")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_roundtrip_through_display() {
        let c = Rgba::parse_hex("#28a745").unwrap();
        assert_eq!(c, Rgba::rgb(0x28, 0xa7, 0x45));
        assert_eq!(c.to_string(), "#28a745");
        let translucent = Rgba::parse_hex("#40baf44d").unwrap();
        assert_eq!(translucent.a, 0x4d);
        assert!(Rgba::parse_hex("28a745").is_none());
        assert!(Rgba::parse_hex("#28a7").is_none());
    }

    #[test]
    fn rectangle_scaling_moves_origin() {
        let r = Rectangle::new(10.0, 20.0, 30.0, 40.0) * 4.0;
        assert_eq!(r, Rectangle::new(40.0, 80.0, 120.0, 160.0));
        let outer = Rectangle::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.encloses(&Rectangle::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!outer.encloses(&Rectangle::new(90.0, 10.0, 20.0, 20.0)));
    }
}
