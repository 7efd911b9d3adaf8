//! # moby_lib
//!
//! moby_lib reads and writes the moby model containers used by the Ratchet & Clank games
//! and decodes the block compressed textures those models are rendered with.
//!
//! A moby container is one contiguous region of a level file. A fixed 0x48 byte header holds
//! pointers relative to the start of the container for each variable length section such as
//! animations, bones, attachments, sounds, and the mesh buffers.
//! [MobyModel](crate::formats::moby::MobyModel) replaces these offsets with owned collections,
//! so edits never need to fix up pointers by hand.
//!
//! ## Reading and Writing
/*!
```no_run
use moby_lib::prelude::*;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
// Models are stored at some offset in a larger file.
let mut model = MobyModel::from_file("engine.ps3", GameType::RaC1, 5, 0x1000)?;

// Make some edits.
model.size = 2.0;

// Offsets and alignment are recalculated when writing.
let bytes = model.to_bytes(0x1000)?;
# Ok(())
# }
```
 */
//!
//! ## File Differences
//! Writing a model recalculates every offset and padding region.
//! An unmodified model is not guaranteed to be binary identical after saving,
//! but reading the output at the same offset produces an equivalent model.
pub mod dxt;
pub mod formats;

mod export;

use std::io::{Read, Seek, SeekFrom};

use binread::{BinRead, BinReaderExt, BinResult};
use thiserror::Error;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// Common imports for top level types.
pub mod prelude {
    pub use crate::dxt::TextureFormat;
    pub use crate::formats::attachment::Attachments;
    pub use crate::formats::moby::MobyModel;
    pub use crate::formats::texture::Texture;
    pub use crate::GameType;
}

/// The game a model was read from.
/// Some record layouts differ between games.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameType {
    RaC1,
    RaC2,
    RaC3,
    /// Deadlocked
    Dl,
}

impl Default for GameType {
    fn default() -> Self {
        GameType::RaC1
    }
}

/// Errors while reading a model container.
#[derive(Error, Debug)]
pub enum ReadMobyError {
    /// An error occurred while trying to read the file.
    /// Truncated files and pointers past the end of the data are reported here.
    #[error(transparent)]
    BinRead(#[from] binread::Error),

    /// An error occurred while trying to read the file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 2 contiguous floats for encoding UV data.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3 contiguous floats for encoding XYZ data.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// 4 contiguous floats for encoding XYZW data.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vector4 {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

/// A row-major 4x4 matrix of contiguous floats.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix4x4 {
    pub row1: Vector4,
    pub row2: Vector4,
    pub row3: Vector4,
    pub row4: Vector4,
}

impl Matrix4x4 {
    pub fn identity() -> Self {
        Self {
            row1: Vector4::new(1.0, 0.0, 0.0, 0.0),
            row2: Vector4::new(0.0, 1.0, 0.0, 0.0),
            row3: Vector4::new(0.0, 0.0, 1.0, 0.0),
            row4: Vector4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

/// Reads a single little endian value at the absolute position `offset`.
pub(crate) fn read_at<T: BinRead<Args = ()>, R: Read + Seek>(
    reader: &mut R,
    offset: u64,
) -> BinResult<T> {
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_le::<T>()
}

/// Reads `count` contiguous little endian values starting at the absolute position `offset`.
pub(crate) fn read_elements_at<T: BinRead<Args = ()>, R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    count: usize,
) -> BinResult<Vec<T>> {
    reader.seek(SeekFrom::Start(offset))?;

    // Counts come from the file, so avoid trusting them for allocations.
    let mut elements = Vec::new();
    for _ in 0..count {
        let element = reader.read_le::<T>()?;
        elements.push(element);
    }

    Ok(elements)
}

/// Reads `count` raw bytes starting at the absolute position `offset`.
pub(crate) fn read_bytes_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    count: usize,
) -> BinResult<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;

    let mut bytes = Vec::new();
    reader.by_ref().take(count as u64).read_to_end(&mut bytes)?;
    if bytes.len() != count {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    Ok(bytes)
}

#[cfg(test)]
pub(crate) fn group_hex(a: &str, words_per_line: usize) -> String {
    // ex: "FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF..."
    let words: Vec<String> = a
        .as_bytes()
        .chunks(8)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();

    words
        .chunks(words_per_line)
        .map(|c| c.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
macro_rules! assert_hex_eq {
    ($a:expr, $b:expr) => {
        assert!(
            $a == $b,
            "\n{} !=\n{}",
            crate::group_hex(&hex::encode($a), 8),
            crate::group_hex(&hex::encode($b), 8)
        )
    };
}

#[cfg(test)]
pub(crate) use assert_hex_eq;
