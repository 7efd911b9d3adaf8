//! The moby model container used for animated objects.
//!
//! A container starts with a fixed 0x48 byte header followed by a table of animation pointers.
//! Every pointer in the container is relative to the start of the container,
//! and a pointer of 0 marks a missing section.
//! See [MobyModel] for the parsed representation.
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use binread::{BinRead, BinResult};
use log::warn;
use modular_bitfield::prelude::*;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    formats::{
        animation::Animation,
        attachment::Attachments,
        mesh::{read_mesh_data, MeshData, MeshHeader},
        skeleton::{BoneData, BoneMatrix, Skeleton},
    },
    read_at, read_bytes_at, read_elements_at, GameType, ReadMobyError,
};

pub const MOBY_HEADER_SIZE: u64 = 0x48;
pub const MODEL_SOUND_SIZE: u64 = 0x20;
pub const HITBOX_HEADER_SIZE: u64 = 0x10;

/// An RGBA color packed into 4 bytes.
#[bitfield(bits = 32)]
#[derive(Debug, BinRead, Clone, Copy, PartialEq, Eq)]
#[br(map = Self::from_bytes)]
pub struct PackedColor {
    pub r: B8,
    pub g: B8,
    pub b: B8,
    pub a: B8,
}

impl Default for PackedColor {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u32> for PackedColor {
    fn from(value: u32) -> Self {
        Self::from_bytes(value.to_le_bytes())
    }
}

impl From<PackedColor> for u32 {
    fn from(color: PackedColor) -> Self {
        u32::from_le_bytes(color.into_bytes())
    }
}

#[cfg(feature = "derive_serde")]
impl Serialize for PackedColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        u32::from(*self).serialize(serializer)
    }
}

#[cfg(feature = "derive_serde")]
impl<'de> Deserialize<'de> for PackedColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from)
    }
}

/// A sound effect entry. The values have no known meaning and are preserved as is.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelSound {
    pub values: [i32; 8],
}

#[binread::derive_binread]
#[derive(Debug)]
struct MobyHeader {
    mesh_ptr: u32,
    null1: i32,
    bone_count: u8,
    lp_bone_count: u8,
    count3: u8,
    count4: u8,
    #[br(temp)]
    animation_count: u8,
    sound_count: u8,
    lp_render_dist: u8,
    count8: u8,
    hitbox_ptr: u32,
    bone_matrix_ptr: u32,
    bone_data_ptr: u32,
    attachment_ptr: u32,
    null2: i32,
    size: f32,
    sound_ptr: u32,
    null3: i32,
    unk1: f32,
    unk2: f32,
    unk3: f32,
    unk4: f32,
    color: PackedColor,
    unk6: u32,
    #[br(count = animation_count)]
    animation_ptrs: Vec<u32>,
}

/// A decoded moby model container.
/// Pointers are replaced by owned collections and recalculated when writing.
///
/// Fields named `unk` or `null` have no known purpose and are preserved when writing.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MobyModel {
    pub id: i16,
    pub game: GameType,
    /// `false` for placeholder entries with no container data.
    pub is_model: bool,
    pub null1: i32,
    pub bone_count: u8,
    /// The bone count for the low poly model.
    pub lp_bone_count: u8,
    pub count3: u8,
    pub count4: u8,
    /// The distance at which the low poly model is used.
    pub lp_render_dist: u8,
    pub count8: u8,
    pub null2: i32,
    pub size: f32,
    pub null3: i32,
    pub unk1: f32,
    pub unk2: f32,
    pub unk3: f32,
    pub unk4: f32,
    /// The color applied to vertices after the lit vertices.
    pub color: PackedColor,
    pub unk6: u32,
    pub animations: Vec<Animation>,
    pub sounds: Vec<ModelSound>,
    pub attachments: Option<Attachments>,
    /// The bind transforms for each bone. This has the same length as [bone_datas](#structfield.bone_datas).
    pub bone_matrices: Vec<BoneMatrix>,
    pub bone_datas: Vec<BoneData>,
    /// The raw collision data including its 0x10 byte header.
    pub hitbox: Vec<u8>,
    pub mesh: MeshData,
}

impl MobyModel {
    /// Reads the container at the absolute position `offset` in `path`.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        game: GameType,
        id: i16,
        offset: u64,
    ) -> Result<Self, ReadMobyError> {
        let mut reader = Cursor::new(fs::read(path)?);
        Self::read(&mut reader, game, id, offset)
    }

    /// Reads the container at the absolute position `offset`.
    /// An `offset` of 0 produces a placeholder without reading any data.
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        game: GameType,
        id: i16,
        offset: u64,
    ) -> Result<Self, ReadMobyError> {
        if offset == 0 {
            return Ok(Self {
                id,
                game,
                is_model: false,
                ..Default::default()
            });
        }

        let header: MobyHeader = read_at(reader, offset)?;
        if header.null1 != 0 || header.null2 != 0 || header.null3 != 0 {
            warn!(
                "Expected null header fields for model {} but found {}, {}, {}.",
                id, header.null1, header.null2, header.null3
            );
        }

        let bone_count = if header.bone_count == 0 {
            header.lp_bone_count
        } else {
            header.bone_count
        };

        let animations = header
            .animation_ptrs
            .iter()
            .map(|p| Animation::read(reader, offset, *p, bone_count))
            .collect::<BinResult<Vec<_>>>()?;

        let hitbox = if header.hitbox_ptr != 0 {
            read_hitbox(reader, offset + header.hitbox_ptr as u64)?
        } else {
            Vec::new()
        };

        let bone_matrices = if header.bone_matrix_ptr != 0 {
            read_elements_at(
                reader,
                offset + header.bone_matrix_ptr as u64,
                bone_count as usize,
            )?
        } else {
            Vec::new()
        };

        let bone_datas = if header.bone_data_ptr != 0 {
            read_elements_at(
                reader,
                offset + header.bone_data_ptr as u64,
                bone_count as usize,
            )?
        } else {
            Vec::new()
        };

        let attachments = if header.attachment_ptr != 0 {
            Some(Attachments::read(reader, offset, header.attachment_ptr)?)
        } else {
            None
        };

        let sounds = if header.sound_ptr != 0 {
            read_elements_at(
                reader,
                offset + header.sound_ptr as u64,
                header.sound_count as usize,
            )?
        } else {
            Vec::new()
        };

        let mesh = if header.mesh_ptr != 0 {
            let mesh_header: MeshHeader = read_at(reader, offset + header.mesh_ptr as u64)?;
            read_mesh_data(reader, offset, &mesh_header)?
        } else {
            MeshData::default()
        };

        Ok(Self {
            id,
            game,
            is_model: true,
            null1: header.null1,
            bone_count,
            lp_bone_count: header.lp_bone_count,
            count3: header.count3,
            count4: header.count4,
            lp_render_dist: header.lp_render_dist,
            count8: header.count8,
            null2: header.null2,
            size: header.size,
            null3: header.null3,
            unk1: header.unk1,
            unk2: header.unk2,
            unk3: header.unk3,
            unk4: header.unk4,
            color: header.color,
            unk6: header.unk6,
            animations,
            sounds,
            attachments,
            bone_matrices,
            bone_datas,
            hitbox,
            mesh,
        })
    }

    /// Reads a model that only contains mesh data such as armor.
    /// The mesh header is at the absolute position `mesh_ptr`, and its pointers are absolute.
    pub fn read_armor<R: Read + Seek>(reader: &mut R, mesh_ptr: u64) -> Result<Self, ReadMobyError> {
        let mesh_header: MeshHeader = read_at(reader, mesh_ptr)?;
        Ok(Self {
            is_model: true,
            size: 1.0,
            mesh: read_mesh_data(reader, 0, &mesh_header)?,
            ..Default::default()
        })
    }

    /// Reads a model that only contains mesh data such as gadgets.
    /// The mesh header follows a variable size header at the absolute position `model_ptr`.
    /// The mesh header's pointers are absolute.
    ///
    /// The lit vertex count is taken from the gadget's own mesh header
    /// rather than the 0x1C offset of the outer header block.
    pub fn read_gadget<R: Read + Seek>(
        reader: &mut R,
        model_ptr: u64,
    ) -> Result<Self, ReadMobyError> {
        let header_size: u32 = read_at(reader, model_ptr)?;
        let mesh = if header_size != 0 {
            let mesh_header: MeshHeader = read_at(reader, model_ptr + header_size as u64)?;
            read_mesh_data(reader, 0, &mesh_header)?
        } else {
            MeshData::default()
        };

        Ok(Self {
            is_model: true,
            mesh,
            ..Default::default()
        })
    }

    /// The bone hierarchy or `None` if the model has no bones.
    pub fn skeleton(&self) -> Option<Skeleton> {
        Skeleton::from_bones(&self.bone_matrices, &self.bone_datas)
    }

    /// Writes the container to a new buffer.
    /// `offset` is the absolute position the container will be written to
    /// and determines the padding between sections.
    ///
    /// Placeholder models produce no data.
    pub fn to_bytes(&self, offset: u64) -> std::io::Result<Vec<u8>> {
        crate::export::moby_to_bytes(self, offset)
    }

    /// Writes the container to `writer`, which is assumed to be at the absolute position `offset`.
    pub fn write<W: Write>(&self, writer: &mut W, offset: u64) -> std::io::Result<()> {
        crate::export::write_moby(writer, self, offset)
    }

    /// Writes the container to `path` as if the container is at the absolute position `offset`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P, offset: u64) -> std::io::Result<()> {
        crate::export::write_moby_to_file(path, self, offset)
    }
}

fn read_hitbox<R: Read + Seek>(reader: &mut R, offset: u64) -> BinResult<Vec<u8>> {
    // The last three words of the header sum to the size of the data after the header.
    let lengths: Vec<u32> = read_elements_at(reader, offset + 4, 3)?;
    let length: u64 = lengths.iter().map(|l| *l as u64).sum();
    read_bytes_at(reader, offset, (HITBOX_HEADER_SIZE + length) as usize)
}
