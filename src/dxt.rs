//! Decoding for the BC1 (DXT1) and BC3 (DXT5) block compressed texture formats.
//!
//! Textures are stored as independently decodable 4x4 texel blocks in row-major block order.
//! Decoded images are tightly packed RGBA8 with `width * height * 4` bytes.
//!
//! BC1 blocks always use the four color mode.
//! The third and fourth palette entries are the 1/3 and 2/3 interpolations of the endpoints
//! regardless of the endpoint ordering, and alpha is always opaque.
use thiserror::Error;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

const BC1_BLOCK_SIZE: usize = 8;
const BC3_BLOCK_SIZE: usize = 16;

/// The compression format byte stored in a texture header.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TextureFormat {
    Bc1 = 0x86,
    /// Recognized in texture headers but not supported for decoding.
    Bc2 = 0x87,
    Bc3 = 0x88,
}

impl TextureFormat {
    /// The size in bytes of a single compressed 4x4 block.
    pub fn block_size_in_bytes(&self) -> usize {
        match self {
            TextureFormat::Bc1 => BC1_BLOCK_SIZE,
            TextureFormat::Bc2 | TextureFormat::Bc3 => BC3_BLOCK_SIZE,
        }
    }
}

impl TryFrom<u8> for TextureFormat {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x86 => Ok(TextureFormat::Bc1),
            0x87 => Ok(TextureFormat::Bc2),
            0x88 => Ok(TextureFormat::Bc3),
            _ => Err(DecodeError::UnknownFormat(value)),
        }
    }
}

impl From<TextureFormat> for u8 {
    fn from(format: TextureFormat) -> Self {
        format as u8
    }
}

/// Errors while decoding block compressed image data.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The format is recognized but has no decoder.
    #[error("Decoding {0:?} textures is not supported.")]
    UnsupportedFormat(TextureFormat),

    /// The format byte does not correspond to any known format.
    #[error("Unknown texture format 0x{0:02X}.")]
    UnknownFormat(u8),

    /// The compressed data is smaller than the block grid for the image dimensions.
    #[error(
        "Expected at least {} bytes of compressed data but found {}.",
        expected,
        actual
    )]
    NotEnoughData { expected: usize, actual: usize },
}

/// The size in bytes of the compressed data for the base mip level of a `width` x `height` image.
pub fn compressed_size(width: usize, height: usize, format: TextureFormat) -> usize {
    block_count(width) * block_count(height) * format.block_size_in_bytes()
}

fn block_count(pixels: usize) -> usize {
    (pixels + 3) / 4
}

/// Decodes the base mip level of `data` to tightly packed RGBA8 pixels.
///
/// Blocks on the right and bottom edges are decoded fully,
/// but only the pixels inside the image bounds are written.
pub fn decode_rgba8(
    data: &[u8],
    width: usize,
    height: usize,
    format: TextureFormat,
) -> Result<Vec<u8>, DecodeError> {
    let decode_block: fn(&[u8]) -> [[u8; 4]; 16] = match format {
        TextureFormat::Bc1 => decode_bc1_block,
        TextureFormat::Bc3 => decode_bc3_block,
        TextureFormat::Bc2 => return Err(DecodeError::UnsupportedFormat(format)),
    };

    let expected = compressed_size(width, height, format);
    if data.len() < expected {
        return Err(DecodeError::NotEnoughData {
            expected,
            actual: data.len(),
        });
    }

    let mut rgba = vec![0u8; width * height * 4];
    if rgba.is_empty() {
        return Ok(rgba);
    }

    let blocks_x = block_count(width);
    let block_size = format.block_size_in_bytes();
    for (i, block) in data[..expected].chunks_exact(block_size).enumerate() {
        let pixels = decode_block(block);
        write_block(&mut rgba, &pixels, i % blocks_x, i / blocks_x, width, height);
    }

    Ok(rgba)
}

/// Forces every pixel of the RGBA8 `rgba` to be fully opaque.
pub fn strip_alpha(rgba: &mut [u8]) {
    for pixel in rgba.chunks_exact_mut(4) {
        pixel[3] = 255;
    }
}

fn write_block(
    rgba: &mut [u8],
    pixels: &[[u8; 4]; 16],
    block_x: usize,
    block_y: usize,
    width: usize,
    height: usize,
) {
    for (i, pixel) in pixels.iter().enumerate() {
        let x = block_x * 4 + i % 4;
        let y = block_y * 4 + i / 4;
        if x < width && y < height {
            let offset = (y * width + x) * 4;
            rgba[offset..offset + 4].copy_from_slice(pixel);
        }
    }
}

/// Expands a 16 bit RGB565 color to 8 bits per channel with bit replication.
/// This matches the rounding of the reference decoder exactly.
pub fn rgb565_to_rgb888(color: u16) -> [u8; 3] {
    let color = color as u32;
    [
        expand_channel(color >> 11, 32),
        expand_channel((color & 0x07E0) >> 5, 64),
        expand_channel(color & 0x001F, 32),
    ]
}

fn expand_channel(value: u32, scale: u32) -> u8 {
    let temp = value * 255 + scale / 2;
    ((temp / scale + temp) / scale) as u8
}

/// Calculates the alpha value for a 3 bit BC3 alpha `index`.
///
/// Indices 0 and 1 select the endpoints directly.
/// The remaining indices interpolate in 7 steps when `alpha0 > alpha1`.
/// Otherwise indices 2 to 5 interpolate in 5 steps, 6 is transparent, and 7 is opaque.
pub fn bc3_alpha(alpha0: u8, alpha1: u8, index: u8) -> u8 {
    let a0 = alpha0 as u32;
    let a1 = alpha1 as u32;
    let i = (index & 0x7) as u32;

    if i == 0 {
        alpha0
    } else if i == 1 {
        alpha1
    } else if alpha0 > alpha1 {
        (((8 - i) * a0 + (i - 1) * a1) / 7) as u8
    } else if i == 6 {
        0
    } else if i == 7 {
        255
    } else {
        (((6 - i) * a0 + (i - 1) * a1) / 5) as u8
    }
}

fn color_palette(c0: u16, c1: u16) -> [[u8; 3]; 4] {
    let [r0, g0, b0] = rgb565_to_rgb888(c0);
    let [r1, g1, b1] = rgb565_to_rgb888(c1);

    let two_thirds = |a: u8, b: u8| ((2 * a as u32 + b as u32) / 3) as u8;

    [
        [r0, g0, b0],
        [r1, g1, b1],
        [two_thirds(r0, r1), two_thirds(g0, g1), two_thirds(b0, b1)],
        [two_thirds(r1, r0), two_thirds(g1, g0), two_thirds(b1, b0)],
    ]
}

/// Decodes an 8 byte BC1 block to 16 RGBA8 pixels in row-major order.
fn decode_bc1_block(block: &[u8]) -> [[u8; 4]; 16] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);

    let palette = color_palette(c0, c1);

    let mut pixels = [[0u8; 4]; 16];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        let index = (indices >> (2 * i)) & 0x3;
        let [r, g, b] = palette[index as usize];
        *pixel = [r, g, b, 255];
    }
    pixels
}

/// Decodes a 16 byte BC3 block to 16 RGBA8 pixels in row-major order.
fn decode_bc3_block(block: &[u8]) -> [[u8; 4]; 16] {
    let alpha0 = block[0];
    let alpha1 = block[1];
    let alpha_indices = u64::from_le_bytes([
        block[2], block[3], block[4], block[5], block[6], block[7], 0, 0,
    ]);

    let mut pixels = decode_bc1_block(&block[8..16]);
    for (i, pixel) in pixels.iter_mut().enumerate() {
        let index = ((alpha_indices >> (3 * i)) & 0x7) as u8;
        pixel[3] = bc3_alpha(alpha0, alpha1, index);
    }
    pixels
}
