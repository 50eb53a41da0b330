use nalgebra as na;
use na::vector;
use serde::{Deserialize, Serialize};

use crate::math::Vec4f;
use crate::texture::TextureFormat;

/// 8 bit per channel color. In texture memory channels are laid out as B, G, R, A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

pub const BLACK: Color = Color::rgb(0, 0, 0);
pub const WHITE: Color = Color::rgb(255, 255, 255);
pub const RED: Color = Color::rgb(255, 0, 0);
pub const GREEN: Color = Color::rgb(0, 255, 0);
pub const BLUE: Color = Color::rgb(0, 0, 255);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn grey(value: u8) -> Self {
        Self::rgb(value, value, value)
    }

    /// Converts channels in [0, 1] to bytes. Values outside the range saturate.
    pub fn from_float(v: Vec4f) -> Self {
        fn channel(value: f32) -> u8 {
            // Float to int casts saturate, NaN becomes 0.
            return (value * 255.0) as u8;
        }
        return Self::rgba(channel(v.x), channel(v.y), channel(v.z), channel(v.w));
    }

    /// Channels as floats in [0, 1].
    pub fn to_float(&self) -> Vec4f {
        return vector![
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0
        ];
    }

    /// Channel-wise product, each channel treated as a value in [0, 1].
    pub fn modulate(self, other: Color) -> Color {
        fn mul(a: u8, b: u8) -> u8 {
            return ((a as u32 * b as u32 + 127) / 255) as u8;
        }
        return Color {
            r: mul(self.r, other.r),
            g: mul(self.g, other.g),
            b: mul(self.b, other.b),
            a: mul(self.a, other.a),
        };
    }

    /// Get convex combination of two colors: t * c_1 + (1 - t) * c_2.
    /// t is unrestricted, the result saturates.
    pub fn blend(color_1: Color, color_2: Color, t: f32) -> Color {
        return Color::from_float(color_1.to_float() * t + color_2.to_float() * (1.0 - t));
    }

    /// Raw channel bytes in memory order.
    pub fn to_bgra(&self) -> [u8; 4] {
        return [self.b, self.g, self.r, self.a];
    }

    /// Reads one pixel worth of bytes. Greyscale expands to an opaque grey, RGB gets full alpha.
    pub fn from_bgra(bytes: &[u8], format: TextureFormat) -> Color {
        match format {
            TextureFormat::Greyscale => Color::grey(bytes[0]),
            TextureFormat::Rgb => Color::rgb(bytes[2], bytes[1], bytes[0]),
            TextureFormat::Rgba => Color::rgba(bytes[2], bytes[1], bytes[0], bytes[3]),
        }
    }

    /// Writes one pixel worth of bytes. Greyscale stores the channel average.
    pub fn write_bgra(&self, out: &mut [u8], format: TextureFormat) {
        match format {
            TextureFormat::Greyscale => {
                out[0] = ((self.r as u16 + self.g as u16 + self.b as u16) / 3) as u8;
            }
            TextureFormat::Rgb => out[..3].copy_from_slice(&self.to_bgra()[..3]),
            TextureFormat::Rgba => out[..4].copy_from_slice(&self.to_bgra()),
        }
    }
}
