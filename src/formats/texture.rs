//! Texture table entries and their compressed image data.
//!
//! The 0x24 byte header describes a single compressed texture in video memory.
//! Most fields have no known purpose but are preserved when writing.
use std::borrow::Cow;
use std::cell::OnceCell;
use std::io::{Read, Seek, Write};

use binread::{BinRead, BinResult};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dxt::{decode_rgba8, strip_alpha, DecodeError, TextureFormat},
    read_elements_at,
};

pub const TEXTURE_HEADER_SIZE: u64 = 0x24;

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, PartialEq, Eq)]
pub struct TextureHeader {
    pub vram_ptr: u32,
    pub unk_0x04: u8,
    pub mip_map_count: u8,
    /// The raw format byte. See [TextureFormat].
    pub format: u8,
    pub unk_0x07: u8,
    pub unk_0x08: [u8; 8],
    /// Swizzle flags. Compressed textures typically use 0xAAE4.
    pub gtf_flags: u32,
    pub unk_0x14: [u8; 4],
    pub width: i16,
    pub height: i16,
    pub unk_0x1c: i16,
    pub unk_0x1e: i16,
    pub unk_0x20: i16,
    pub unk_0x22: i16,
}

impl TextureHeader {
    /// The values used by the games for a single mip level compressed texture.
    pub fn new(width: i16, height: i16, format: TextureFormat) -> Self {
        Self {
            vram_ptr: 0,
            unk_0x04: 0,
            mip_map_count: 1,
            format: format.into(),
            unk_0x07: 0x29,
            unk_0x08: [0x00, 0x01, 0x03, 0x03, 0x80, 0x03, 0x00, 0x00],
            gtf_flags: 0xAAE4,
            unk_0x14: [0x02, 0x06, 0x3E, 0x80],
            width,
            height,
            unk_0x1c: 0x0010,
            unk_0x1e: 0,
            unk_0x20: 0x00FF,
            unk_0x22: 0,
        }
    }
}

/// A texture header and its compressed data with a lazily decoded RGBA8 image.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Texture {
    pub id: i32,
    pub header: TextureHeader,
    data: Vec<u8>,
    #[cfg_attr(feature = "derive_serde", serde(skip))]
    rgba: OnceCell<Vec<u8>>,
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.header == other.header && self.data == other.data
    }
}

impl Texture {
    pub fn new(id: i32, width: i16, height: i16, data: Vec<u8>, format: TextureFormat) -> Self {
        Self {
            id,
            header: TextureHeader::new(width, height, format),
            data,
            rgba: OnceCell::new(),
        }
    }

    /// Reads `count` headers from the texture table at the absolute position `offset`.
    /// Each texture's id is its index in the table and has no data.
    pub fn read_table<R: Read + Seek>(
        reader: &mut R,
        offset: u64,
        count: usize,
    ) -> BinResult<Vec<Self>> {
        let headers: Vec<TextureHeader> = read_elements_at(reader, offset, count)?;
        Ok(headers
            .into_iter()
            .enumerate()
            .map(|(i, header)| Self {
                id: i as i32,
                header,
                data: Vec::new(),
                rgba: OnceCell::new(),
            })
            .collect())
    }

    /// Writes the header with `vram_ptr` in place of the stored pointer.
    pub fn write_header<W: Write>(&self, writer: &mut W, vram_ptr: u32) -> std::io::Result<()> {
        crate::export::write_texture_header(writer, &self.header, vram_ptr)
    }

    pub fn format(&self) -> Result<TextureFormat, DecodeError> {
        TextureFormat::try_from(self.header.format)
    }

    pub fn width(&self) -> usize {
        self.header.width.max(0) as usize
    }

    pub fn height(&self) -> usize {
        self.header.height.max(0) as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the compressed data and clears the decoded image.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.invalidate();
    }

    /// Clears the decoded image so the next access decodes the data again.
    pub fn invalidate(&mut self) {
        self.rgba = OnceCell::new();
    }

    /// The decoded base mip level as RGBA8.
    /// The image is decoded on the first call and reused until [Texture::invalidate] is called.
    pub fn rgba8(&self) -> Result<&[u8], DecodeError> {
        if let Some(rgba) = self.rgba.get() {
            return Ok(rgba);
        }

        let rgba = decode_rgba8(&self.data, self.width(), self.height(), self.format()?)?;
        Ok(self.rgba.get_or_init(|| rgba))
    }

    /// The decoded image with alpha forced to opaque if `include_transparency` is `false`.
    pub fn rgba8_with_transparency(
        &self,
        include_transparency: bool,
    ) -> Result<Cow<'_, [u8]>, DecodeError> {
        let rgba = self.rgba8()?;
        if include_transparency {
            Ok(Cow::Borrowed(rgba))
        } else {
            let mut rgba = rgba.to_vec();
            strip_alpha(&mut rgba);
            Ok(Cow::Owned(rgba))
        }
    }
}
