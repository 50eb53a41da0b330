//! Depth testing policies.
//!
//! Greater depth wins: the rasterizer stores the interpolated 1/w, which grows
//! as surfaces get closer to the camera.

use crate::color::Color;
use crate::texture::{Texture, TextureFormat};

pub trait DepthTest {
    /// Would `depth` at (x, y) pass, without storing it.
    fn test(&self, x: i32, y: i32, depth: f32) -> bool;
    /// Stores `depth` at (x, y) if it passes. Returns whether it did.
    fn test_and_write(&mut self, x: i32, y: i32, depth: f32) -> bool;
    fn clear(&mut self);
}

/// Everything passes, nothing is stored. Used for flat 2D drawing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDepthTest;

impl DepthTest for NoDepthTest {
    fn test(&self, _x: i32, _y: i32, _depth: f32) -> bool {
        return true;
    }

    fn test_and_write(&mut self, _x: i32, _y: i32, _depth: f32) -> bool {
        return true;
    }

    fn clear(&mut self) {}
}

/// Dense per-pixel depth storage, bottom left origin like `Texture`.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        return Self {
            width,
            height,
            values: vec![f32::NEG_INFINITY; width as usize * height as usize],
        };
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        return Some(y as usize * self.width as usize + x as usize);
    }

    /// Stored value, `None` outside of the buffer.
    pub fn get(&self, x: i32, y: i32) -> Option<f32> {
        return self.index(x, y).map(|i| self.values[i]);
    }

    /// Depth values normalized over the written range, near is white.
    /// Cells that were never written stay black.
    pub fn to_grey_texture(&self) -> Texture {
        let written = self.values.iter().copied().filter(|v| v.is_finite());
        let (z_min, z_max) = written.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let scale = z_max - z_min;

        let mut texture = Texture::new(self.width, self.height, TextureFormat::Greyscale);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let Some(z) = self.get(x, y).filter(|z| z.is_finite()) else {
                    continue;
                };
                let t = if scale > 0.0 { (z - z_min) / scale } else { 1.0 };
                texture.set_pixel(x, y, Color::grey((t * 255.0) as u8));
            }
        }
        return texture;
    }
}

impl DepthTest for DepthBuffer {
    fn test(&self, x: i32, y: i32, depth: f32) -> bool {
        match self.index(x, y) {
            Some(i) => depth > self.values[i],
            None => false,
        }
    }

    fn test_and_write(&mut self, x: i32, y: i32, depth: f32) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        if depth > self.values[i] {
            self.values[i] = depth;
            return true;
        }
        return false;
    }

    fn clear(&mut self) {
        self.values.fill(f32::NEG_INFINITY);
    }
}
