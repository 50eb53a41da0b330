//! Truevision TGA reader and writer.
//!
//! Handles uncompressed and run-length encoded true-color and greyscale images
//! with 8, 24 or 32 bits per pixel. Pixel bytes are stored in B, G, R, A order,
//! which is also the texture memory layout, so no channel swizzling happens here.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::TgaError;
use crate::texture::{Texture, TextureFormat};

const HEADER_SIZE: usize = 18;
const MAX_PACKET: usize = 128;
const FOOTER_SIGNATURE: &[u8; 18] = b"TRUEVISION-XFILE.\0";

const TYPE_TRUE_COLOR: u8 = 2;
const TYPE_GREYSCALE: u8 = 3;
const TYPE_TRUE_COLOR_RLE: u8 = 10;
const TYPE_GREYSCALE_RLE: u8 = 11;

const ORIGIN_TOP: u8 = 0x20;
const ORIGIN_RIGHT: u8 = 0x10;

#[derive(Debug, Clone, Copy)]
struct Header {
    id_length: u8,
    color_map_type: u8,
    image_type: u8,
    color_map_length: u16,
    color_map_depth: u8,
    width: u16,
    height: u16,
    bits_per_pixel: u8,
    descriptor: u8,
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Header, TgaError> {
        if bytes.len() < HEADER_SIZE {
            return Err(TgaError::Truncated("header"));
        }
        let le = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        return Ok(Header {
            id_length: bytes[0],
            color_map_type: bytes[1],
            image_type: bytes[2],
            color_map_length: le(5),
            color_map_depth: bytes[7],
            width: le(12),
            height: le(14),
            bits_per_pixel: bytes[16],
            descriptor: bytes[17],
        });
    }

    fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = self.id_length;
        bytes[1] = self.color_map_type;
        bytes[2] = self.image_type;
        bytes[5..7].copy_from_slice(&self.color_map_length.to_le_bytes());
        bytes[7] = self.color_map_depth;
        bytes[12..14].copy_from_slice(&self.width.to_le_bytes());
        bytes[14..16].copy_from_slice(&self.height.to_le_bytes());
        bytes[16] = self.bits_per_pixel;
        bytes[17] = self.descriptor;
        return bytes;
    }
}

/// Decodes a whole TGA stream into a bottom-up, left-to-right texture.
pub fn read(mut reader: impl Read) -> Result<Texture, TgaError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let header = Header::parse(&bytes)?;

    let format = match header.bits_per_pixel {
        8 => TextureFormat::Greyscale,
        24 => TextureFormat::Rgb,
        32 => TextureFormat::Rgba,
        depth => return Err(TgaError::UnsupportedDepth(depth)),
    };
    let rle = match header.image_type {
        TYPE_TRUE_COLOR | TYPE_GREYSCALE => false,
        TYPE_TRUE_COLOR_RLE | TYPE_GREYSCALE_RLE => true,
        other => return Err(TgaError::UnsupportedType(other)),
    };
    if header.width == 0 || header.height == 0 {
        return Err(TgaError::BadDimensions {
            width: header.width as u32,
            height: header.height as u32,
        });
    }

    // Skip the image id and a color map, which true-color images may carry but don't use.
    let mut offset = HEADER_SIZE + header.id_length as usize;
    if header.color_map_type != 0 {
        let entry_size = (header.color_map_depth as usize + 7) / 8;
        offset += header.color_map_length as usize * entry_size;
    }
    let payload = bytes.get(offset..).ok_or(TgaError::Truncated("image id"))?;

    let bpp = format.bytes_per_pixel();
    let n_pixels = header.width as usize * header.height as usize;
    let data = if rle {
        decode_rle(payload, n_pixels, bpp)?
    } else {
        payload
            .get(..n_pixels * bpp)
            .ok_or(TgaError::Truncated("pixel data"))?
            .to_vec()
    };

    let mut texture = Texture::from_raw(header.width as u32, header.height as u32, format, data)
        .map_err(|_| TgaError::Truncated("pixel data"))?;
    if header.descriptor & ORIGIN_TOP != 0 {
        texture.flip_vertically();
    }
    if header.descriptor & ORIGIN_RIGHT != 0 {
        texture.flip_horizontally();
    }
    return Ok(texture);
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Texture, TgaError> {
    let file = File::open(path)?;
    return read(BufReader::new(file));
}

fn decode_rle(mut payload: &[u8], n_pixels: usize, bpp: usize) -> Result<Vec<u8>, TgaError> {
    let mut data = Vec::with_capacity(n_pixels * bpp);
    let mut decoded = 0;
    while decoded < n_pixels {
        let (&packet, rest) = payload
            .split_first()
            .ok_or(TgaError::Truncated("RLE packet"))?;
        payload = rest;
        let repeated = packet & 0x80 != 0;
        let count = (packet & 0x7f) as usize + 1;
        if decoded + count > n_pixels {
            return Err(TgaError::RleOverflow { expected: n_pixels });
        }

        let stored = if repeated { bpp } else { count * bpp };
        if payload.len() < stored {
            return Err(TgaError::Truncated("RLE packet"));
        }
        let (chunk, rest) = payload.split_at(stored);
        payload = rest;
        if repeated {
            for _ in 0..count {
                data.extend_from_slice(chunk);
            }
        } else {
            data.extend_from_slice(chunk);
        }
        decoded += count;
    }
    return Ok(data);
}

/// Encodes the texture with a bottom-left origin followed by the TGA 2.0 footer.
pub fn write(texture: &Texture, mut writer: impl Write, rle: bool) -> Result<(), TgaError> {
    let (width, height) = match (
        u16::try_from(texture.width()),
        u16::try_from(texture.height()),
    ) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(TgaError::BadDimensions {
                width: texture.width(),
                height: texture.height(),
            })
        }
    };
    let format = texture.format();
    let image_type = match (format, rle) {
        (TextureFormat::Greyscale, false) => TYPE_GREYSCALE,
        (TextureFormat::Greyscale, true) => TYPE_GREYSCALE_RLE,
        (_, false) => TYPE_TRUE_COLOR,
        (_, true) => TYPE_TRUE_COLOR_RLE,
    };
    let header = Header {
        id_length: 0,
        color_map_type: 0,
        image_type,
        color_map_length: 0,
        color_map_depth: 0,
        width,
        height,
        bits_per_pixel: (format.bytes_per_pixel() * 8) as u8,
        descriptor: if format == TextureFormat::Rgba { 8 } else { 0 },
    };

    writer.write_all(&header.to_bytes())?;
    if rle {
        write_rle(&mut writer, texture.as_bytes(), format.bytes_per_pixel())?;
    } else {
        writer.write_all(texture.as_bytes())?;
    }
    // Developer area and extension area offsets, both absent.
    writer.write_all(&[0u8; 8])?;
    writer.write_all(FOOTER_SIGNATURE)?;
    writer.flush()?;
    return Ok(());
}

pub fn write_file(texture: &Texture, path: impl AsRef<Path>, rle: bool) -> Result<(), TgaError> {
    let file = File::create(path)?;
    return write(texture, BufWriter::new(file), rle);
}

/// Splits the pixels into raw and repeated packets of at most 128 pixels.
fn write_rle(writer: &mut impl Write, data: &[u8], bpp: usize) -> Result<(), TgaError> {
    let pixel = |i: usize| &data[i * bpp..(i + 1) * bpp];
    let n_pixels = data.len() / bpp;
    let mut current = 0;
    while current < n_pixels {
        let mut run = 1;
        let mut raw = true;
        while current + run < n_pixels && run < MAX_PACKET {
            let same = pixel(current + run) == pixel(current + run - 1);
            if run == 1 {
                raw = !same;
            }
            if raw && same {
                // The last pixel starts the next repeated packet.
                run -= 1;
                break;
            }
            if !raw && !same {
                break;
            }
            run += 1;
        }

        if raw {
            writer.write_all(&[(run - 1) as u8])?;
            writer.write_all(&data[current * bpp..(current + run) * bpp])?;
        } else {
            writer.write_all(&[0x80 | (run - 1) as u8])?;
            writer.write_all(pixel(current))?;
        }
        current += run;
    }
    return Ok(());
}
