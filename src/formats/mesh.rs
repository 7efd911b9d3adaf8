//! The mesh buffers shared by mobys and the other asset types with the same mesh layout.
//!
//! The mesh header stores vertex counts but not index counts.
//! The number of indices for each pass is the sum of [TextureConfig::size] for that pass.
use std::io::{Read, Seek};

use binread::{BinRead, BinResult};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

use crate::{read_elements_at, Vector2, Vector3};

pub const MESH_HEADER_SIZE: u64 = 0x20;
pub const TEXTURE_CONFIG_SIZE: u64 = 0x10;
pub const TEXTURED_VERTEX_SIZE: u64 = 0x28;
pub const REFLECTIVE_VERTEX_SIZE: u64 = 0x20;

/// A contiguous run of triangle indices rendered with one texture and render mode.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureConfig {
    /// The index into the level's texture list.
    pub id: i32,
    /// The first index in the index buffer.
    pub start: i32,
    /// The number of indices.
    pub size: i32,
    pub mode: i32,
}

/// A vertex used by the primary textured pass.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Default)]
pub struct TexturedVertex {
    pub position: Vector3,
    pub normal: Vector3,
    pub uv: Vector2,
    /// Packed skinning weights.
    pub weights: u32,
    /// Packed skinning bone ids.
    pub ids: u32,
}

/// A vertex used by the reflective pass.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Default)]
pub struct ReflectiveVertex {
    pub position: Vector3,
    pub normal: Vector3,
    pub weight: u32,
    pub bone_id: u32,
}

/// The 0x20 byte mesh metadata header.
/// Pointers are relative to the start of the containing model or absolute for standalone meshes.
#[derive(BinRead, Debug, Clone, PartialEq, Default)]
pub(crate) struct MeshHeader {
    pub textured_submesh_count: u32,
    pub reflective_submesh_count: u32,
    pub textured_table_ptr: u32,
    pub reflective_table_ptr: u32,
    pub vertex_ptr: u32,
    pub index_ptr: u32,
    pub textured_vertex_count: u16,
    pub reflective_vertex_count: u16,
    pub lit_vertex_count: u16,
    pub padding: u16,
}

/// The decoded vertex, index, and texture buffers for both render passes.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub texture_configs: Vec<TextureConfig>,
    pub vertices: Vec<TexturedVertex>,
    pub indices: Vec<u16>,
    /// The texture configs for the reflective pass.
    /// These are independent of [texture_configs](#structfield.texture_configs).
    pub reflective_texture_configs: Vec<TextureConfig>,
    pub reflective_vertices: Vec<ReflectiveVertex>,
    pub reflective_indices: Vec<u16>,
    /// The number of vertices not affected by the model color.
    pub lit_vertex_count: u16,
}

impl MeshData {
    /// The number of indices used by the textured pass.
    pub fn face_count(&self) -> usize {
        face_count(&self.texture_configs)
    }

    /// The number of indices used by the reflective pass.
    pub fn reflective_face_count(&self) -> usize {
        face_count(&self.reflective_texture_configs)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Calculates the number of indices used by `configs`.
pub fn face_count(configs: &[TextureConfig]) -> usize {
    configs
        .iter()
        .map(|c| c.size as i64)
        .sum::<i64>()
        .max(0) as usize
}

/// Reads the buffers described by `header`.
/// Non zero pointers in `header` are relative to `base`.
pub(crate) fn read_mesh_data<R: Read + Seek>(
    reader: &mut R,
    base: u64,
    header: &MeshHeader,
) -> BinResult<MeshData> {
    let mut mesh = MeshData {
        lit_vertex_count: header.lit_vertex_count,
        ..Default::default()
    };

    if header.textured_table_ptr != 0 {
        mesh.texture_configs = read_elements_at(
            reader,
            base + header.textured_table_ptr as u64,
            header.textured_submesh_count as usize,
        )?;
    }
    let face_count = mesh.face_count();

    let vertex_offset = base + header.vertex_ptr as u64;
    if header.vertex_ptr != 0 && header.textured_vertex_count > 0 {
        mesh.vertices = read_elements_at(
            reader,
            vertex_offset,
            header.textured_vertex_count as usize,
        )?;
    }

    let index_offset = base + header.index_ptr as u64;
    if header.index_ptr != 0 && face_count > 0 {
        mesh.indices = read_elements_at(reader, index_offset, face_count)?;
    }

    if header.reflective_table_ptr != 0 {
        // The reflective buffers directly follow the textured buffers.
        let reflective_vertex_offset =
            vertex_offset + header.textured_vertex_count as u64 * TEXTURED_VERTEX_SIZE;
        mesh.reflective_vertices = read_elements_at(
            reader,
            reflective_vertex_offset,
            header.reflective_vertex_count as usize,
        )?;

        mesh.reflective_texture_configs = read_elements_at(
            reader,
            base + header.reflective_table_ptr as u64,
            header.reflective_submesh_count as usize,
        )?;

        let reflective_index_offset = index_offset + face_count as u64 * 2;
        mesh.reflective_indices = read_elements_at(
            reader,
            reflective_index_offset,
            mesh.reflective_face_count(),
        )?;
    }

    Ok(mesh)
}
