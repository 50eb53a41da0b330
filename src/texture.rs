//! CPU pixel buffer used both as render target and as shader input.
//! (0, 0) is the bottom left pixel, rows go up, same as screen space.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::color::Color;
use crate::error::TextureError;
use crate::math::Vec2f;
use crate::tga;

/// Pixel layout of a texture. The value is the number of bytes per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Greyscale = 1,
    Rgb = 3,
    Rgba = 4,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        return self as usize;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    width: u32,
    height: u32,
    format: TextureFormat,
    data: Vec<u8>,
}

impl Texture {
    /// Zero filled texture (transparent black).
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        let capacity = width as usize * height as usize * format.bytes_per_pixel();
        return Self {
            width,
            height,
            format,
            data: vec![0; capacity],
        };
    }

    /// Wraps raw bottom-up BGRA-ordered bytes. Fails when the length doesn't match.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Vec<u8>,
    ) -> Result<Self, TextureError> {
        if data.len() != width as usize * height as usize * format.bytes_per_pixel() {
            return Err(TextureError::Conversion { width, height });
        }
        return Ok(Self {
            width,
            height,
            format,
            data,
        });
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    pub fn format(&self) -> TextureFormat {
        return self.format;
    }

    pub fn as_bytes(&self) -> &[u8] {
        return &self.data[..];
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let pixel = y as usize * self.width as usize + x as usize;
        return Some(pixel * self.format.bytes_per_pixel());
    }

    /// Color at (x, y). Outside of the texture the default color is returned.
    pub fn pixel(&self, x: i32, y: i32) -> Color {
        match self.index(x, y) {
            Some(i) => Color::from_bgra(&self.data[i..], self.format),
            None => Color::default(),
        }
    }

    /// Writes a pixel. Out of bounds writes are ignored and reported with `false`.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        color.write_bgra(&mut self.data[i..], self.format);
        return true;
    }

    /// Sets all bytes to zero.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn fill(&mut self, color: Color) {
        let bpp = self.format.bytes_per_pixel();
        for pixel in self.data.chunks_exact_mut(bpp) {
            color.write_bgra(pixel, self.format);
        }
    }

    pub fn flip_vertically(&mut self) {
        let row = self.width as usize * self.format.bytes_per_pixel();
        let height = self.height as usize;
        for y in 0..height / 2 {
            let (low, high) = self.data.split_at_mut((height - 1 - y) * row);
            low[y * row..(y + 1) * row].swap_with_slice(&mut high[..row]);
        }
    }

    pub fn flip_horizontally(&mut self) {
        let bpp = self.format.bytes_per_pixel();
        let row = self.width as usize * bpp;
        if row == 0 {
            return;
        }
        for line in self.data.chunks_exact_mut(row) {
            let width = line.len() / bpp;
            for x in 0..width / 2 {
                let mirrored = width - 1 - x;
                for k in 0..bpp {
                    line.swap(x * bpp + k, mirrored * bpp + k);
                }
            }
        }
    }

    /// Nearest-neighbour resample to the new size.
    pub fn scale(&self, width: u32, height: u32) -> Texture {
        let mut scaled = Texture::new(width, height, self.format);
        if self.width == 0 || self.height == 0 {
            return scaled;
        }
        let bpp = self.format.bytes_per_pixel();
        for y in 0..height as usize {
            let src_y = y * self.height as usize / height as usize;
            for x in 0..width as usize {
                let src_x = x * self.width as usize / width as usize;
                let src = (src_y * self.width as usize + src_x) * bpp;
                let dst = (y * width as usize + x) * bpp;
                scaled.data[dst..dst + bpp].copy_from_slice(&self.data[src..src + bpp]);
            }
        }
        return scaled;
    }

    /// Nearest texel for uv in [0, 1]^2, v = 0 being the bottom row.
    /// Coordinates outside of the unit square are clamped to the border.
    pub fn sample(&self, uv: Vec2f) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::default();
        }
        let x = (uv.x * self.width as f32) as i32;
        let y = (uv.y * self.height as f32) as i32;
        return self.pixel(
            x.clamp(0, self.width as i32 - 1),
            y.clamp(0, self.height as i32 - 1),
        );
    }

    /// Loads `.tga` files with the built-in codec and everything else through `image`.
    pub fn load(path: impl AsRef<Path>) -> Result<Texture, TextureError> {
        let path = path.as_ref();
        if is_tga(path) {
            let texture = tga::read_file(path).map_err(|source| TextureError::Tga {
                path: path.to_owned(),
                source,
            })?;
            log::info!(
                "loaded {} ({}x{}, {:?})",
                path.display(),
                texture.width,
                texture.height,
                texture.format
            );
            return Ok(texture);
        }

        let image = image::open(path).map_err(|source| TextureError::Image {
            path: path.to_owned(),
            source,
        })?;
        let texture = Texture::from_image(&image.flipv());
        log::info!(
            "loaded {} ({}x{}, {:?})",
            path.display(),
            texture.width,
            texture.height,
            texture.format
        );
        return Ok(texture);
    }

    /// Saves to `.tga` with the built-in codec (optionally run-length encoded),
    /// other extensions go through `image`.
    pub fn save(&self, path: impl AsRef<Path>, rle: bool) -> Result<(), TextureError> {
        let path = path.as_ref();
        if is_tga(path) {
            return tga::write_file(self, path, rle).map_err(|source| TextureError::Tga {
                path: path.to_owned(),
                source,
            });
        }

        let image = self.to_image()?.flipv();
        return image.save(path).map_err(|source| TextureError::Image {
            path: path.to_owned(),
            source,
        });
    }

    /// Row-major rgb8 bytes with the top row first, the layout windows and encoders expect.
    pub fn to_rgb8_top_down(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in (0..self.height as i32).rev() {
            for x in 0..self.width as i32 {
                let color = self.pixel(x, y);
                out.extend_from_slice(&[color.r, color.g, color.b]);
            }
        }
        return out;
    }

    /// Bottom-up texture from an image stored bottom-up.
    fn from_image(image: &DynamicImage) -> Texture {
        let color = image.color();
        let format = if color.has_alpha() {
            TextureFormat::Rgba
        } else if color.channel_count() == 1 {
            TextureFormat::Greyscale
        } else {
            TextureFormat::Rgb
        };
        let rgba = image.to_rgba8();
        let mut texture = Texture::new(rgba.width(), rgba.height(), format);
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            texture.set_pixel(x as i32, y as i32, Color::rgba(r, g, b, a));
        }
        return texture;
    }

    /// Image stored bottom-up, same row order as the texture.
    fn to_image(&self) -> Result<DynamicImage, TextureError> {
        let conversion = TextureError::Conversion {
            width: self.width,
            height: self.height,
        };
        let pixels = (0..self.height as i32)
            .flat_map(|y| (0..self.width as i32).map(move |x| (x, y)))
            .map(|(x, y)| self.pixel(x, y));
        let image = match self.format {
            TextureFormat::Greyscale => {
                let bytes = self.data.clone();
                DynamicImage::ImageLuma8(
                    GrayImage::from_raw(self.width, self.height, bytes).ok_or(conversion)?,
                )
            }
            TextureFormat::Rgb => {
                let bytes = pixels.flat_map(|c| [c.r, c.g, c.b]).collect();
                DynamicImage::ImageRgb8(
                    RgbImage::from_raw(self.width, self.height, bytes).ok_or(conversion)?,
                )
            }
            TextureFormat::Rgba => {
                let bytes = pixels.flat_map(|c| [c.r, c.g, c.b, c.a]).collect();
                DynamicImage::ImageRgba8(
                    RgbaImage::from_raw(self.width, self.height, bytes).ok_or(conversion)?,
                )
            }
        };
        return Ok(image);
    }
}

fn is_tga(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tga"))
        .unwrap_or(false);
}
