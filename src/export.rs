use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use std::{
    fs::File,
    io::{Cursor, Seek, SeekFrom, Write},
    path::Path,
};

use crate::{
    formats::{
        animation::{Animation, Frame, ANIMATION_HEADER_SIZE, ROTATION_SIZE},
        attachment::{Attachment, Attachments, ATTACHMENT_TERMINATOR},
        mesh::{
            ReflectiveVertex, TextureConfig, TexturedVertex, MESH_HEADER_SIZE,
            REFLECTIVE_VERTEX_SIZE, TEXTURED_VERTEX_SIZE, TEXTURE_CONFIG_SIZE,
        },
        moby::{MobyModel, ModelSound, MOBY_HEADER_SIZE, MODEL_SOUND_SIZE},
        skeleton::{BoneData, BoneMatrix, BONE_DATA_SIZE, BONE_MATRIX_SIZE},
        texture::TextureHeader,
    },
    Matrix4x4, Vector2, Vector3, Vector4,
};

// Model 0 has space reserved after the animation table for its menu animations.
const MENU_ANIMATION_SIZE: u64 = 0x80;
const EXTRA_HEADER_SIZE: u64 = 0x20;
const VERTEX_ALIGNMENT: u64 = 0x80;

fn round_up(value: u64, n: u64) -> u64 {
    // Find the next largest multiple of n.
    ((value + n - 1) / n) * n
}

/// Finds the smallest value at least `length` with `value % 16 == alignment`.
fn align(length: u64, alignment: u64) -> u64 {
    let remainder = length % 16;
    if remainder <= alignment {
        length + alignment - remainder
    } else {
        length + 16 - remainder + alignment
    }
}

/// The remainder of an absolute offset that aligns container relative offsets to 16 bytes.
fn container_alignment(offset: u64) -> u64 {
    (16 - offset % 16) % 16
}

/// The distance from the absolute `offset` to the next multiple of 0x80.
fn dist_to_file80(offset: u64) -> u64 {
    (VERTEX_ALIGNMENT - offset % VERTEX_ALIGNMENT) % VERTEX_ALIGNMENT
}

/// The container relative offset of each section.
#[derive(Debug, PartialEq)]
struct MobyLayout {
    mesh: u64,
    texture_configs: u64,
    reflective_texture_configs: u64,
    vertices: u64,
    reflective_vertices: u64,
    indices: u64,
    reflective_indices: u64,
    hitbox: u64,
    sounds: u64,
    attachments: u64,
    bone_matrices: u64,
    bone_datas: u64,
    /// The offset for each animation or 0 for animations without frames.
    animations: Vec<u64>,
    length: u64,
}

impl MobyLayout {
    fn new(model: &MobyModel, offset: u64) -> Self {
        let alignment = container_alignment(offset);
        let mesh_data = &model.mesh;

        let mut header_size = MOBY_HEADER_SIZE + model.animations.len() as u64 * 4;
        if model.id == 0 {
            header_size += MENU_ANIMATION_SIZE;
        }
        if model.id > 2 {
            header_size += EXTRA_HEADER_SIZE;
        }

        let mesh = align(header_size, alignment);
        let texture_configs = align(mesh + MESH_HEADER_SIZE, alignment);
        let reflective_texture_configs = align(
            texture_configs + mesh_data.texture_configs.len() as u64 * TEXTURE_CONFIG_SIZE,
            alignment,
        );
        let texture_configs_end = reflective_texture_configs
            + mesh_data.reflective_texture_configs.len() as u64 * TEXTURE_CONFIG_SIZE;

        // Vertex data starts on a 0x80 byte boundary in the file.
        let vertex_padding = if mesh_data.vertices.is_empty() {
            0
        } else {
            dist_to_file80(offset + texture_configs_end)
        };
        let vertices = align(texture_configs_end + vertex_padding, alignment);
        let reflective_vertices =
            vertices + mesh_data.vertices.len() as u64 * TEXTURED_VERTEX_SIZE;
        let indices = align(
            reflective_vertices
                + mesh_data.reflective_vertices.len() as u64 * REFLECTIVE_VERTEX_SIZE,
            alignment,
        );
        let reflective_indices = indices + mesh_data.indices.len() as u64 * 2;
        let hitbox = align(
            reflective_indices + mesh_data.reflective_indices.len() as u64 * 2,
            alignment,
        );
        let sounds = align(hitbox + model.hitbox.len() as u64, alignment);
        let attachments = align(
            sounds + model.sounds.len() as u64 * MODEL_SOUND_SIZE,
            alignment,
        );
        let attachments_size = match &model.attachments {
            Some(a) if !a.is_empty() => a.size_in_bytes(),
            _ => 0,
        };
        let bone_matrices = align(attachments + attachments_size, alignment);
        let bone_datas = align(
            bone_matrices + model.bone_matrices.len() as u64 * BONE_MATRIX_SIZE,
            alignment,
        );
        let animations_start = align(
            bone_datas + model.bone_datas.len() as u64 * BONE_DATA_SIZE,
            alignment,
        );

        let mut length = animations_start;
        let mut animations = Vec::new();
        for animation in &model.animations {
            if animation.frames.is_empty() {
                animations.push(0);
            } else {
                animations.push(length);
                length += animation.size_in_bytes();
            }
        }

        Self {
            mesh,
            texture_configs,
            reflective_texture_configs,
            vertices,
            reflective_vertices,
            indices,
            reflective_indices,
            hitbox,
            sounds,
            attachments,
            bone_matrices,
            bone_datas,
            animations,
            length,
        }
    }
}

fn write_ptr<W: Write>(writer: &mut W, ptr: u64, is_present: bool) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(if is_present { ptr as u32 } else { 0 })
}

fn write_padding<W: Write>(writer: &mut W, count: u64) -> std::io::Result<()> {
    writer.write_all(&vec![0u8; count as usize])
}

/// Pads `size` bytes of already written data to a multiple of `n`.
fn write_padding_to<W: Write>(writer: &mut W, size: u64, n: u64) -> std::io::Result<()> {
    write_padding(writer, round_up(size, n) - size)
}

fn write_f32s<W: Write>(writer: &mut W, values: &[f32]) -> std::io::Result<()> {
    for value in values {
        writer.write_f32::<LittleEndian>(*value)?;
    }
    Ok(())
}

fn write_i32s<W: Write>(writer: &mut W, values: &[i32]) -> std::io::Result<()> {
    for value in values {
        writer.write_i32::<LittleEndian>(*value)?;
    }
    Ok(())
}

/// Writes a table of container relative pointers to records laid out
/// back to back starting at `start`.
fn write_ptr_table<W: Write, T, F: Fn(&T) -> u64>(
    writer: &mut W,
    start: u64,
    elements: &[T],
    size_in_bytes: F,
) -> std::io::Result<()> {
    let mut ptr = start;
    for element in elements {
        writer.write_u32::<LittleEndian>(ptr as u32)?;
        ptr += size_in_bytes(element);
    }
    Ok(())
}

fn write_vector2<W: Write>(writer: &mut W, data: &Vector2) -> std::io::Result<()> {
    write_f32s(writer, &[data.x, data.y])
}

fn write_vector3<W: Write>(writer: &mut W, data: &Vector3) -> std::io::Result<()> {
    write_f32s(writer, &[data.x, data.y, data.z])
}

fn write_vector4<W: Write>(writer: &mut W, data: &Vector4) -> std::io::Result<()> {
    write_f32s(writer, &[data.x, data.y, data.z, data.w])
}

fn write_matrix4x4<W: Write>(writer: &mut W, data: &Matrix4x4) -> std::io::Result<()> {
    write_vector4(writer, &data.row1)?;
    write_vector4(writer, &data.row2)?;
    write_vector4(writer, &data.row3)?;
    write_vector4(writer, &data.row4)?;
    Ok(())
}

fn write_texture_config<W: Write>(writer: &mut W, data: &TextureConfig) -> std::io::Result<()> {
    write_i32s(writer, &[data.id, data.start, data.size, data.mode])
}

fn write_textured_vertex<W: Write>(writer: &mut W, data: &TexturedVertex) -> std::io::Result<()> {
    write_vector3(writer, &data.position)?;
    write_vector3(writer, &data.normal)?;
    write_vector2(writer, &data.uv)?;
    writer.write_u32::<LittleEndian>(data.weights)?;
    writer.write_u32::<LittleEndian>(data.ids)?;
    Ok(())
}

fn write_reflective_vertex<W: Write>(
    writer: &mut W,
    data: &ReflectiveVertex,
) -> std::io::Result<()> {
    write_vector3(writer, &data.position)?;
    write_vector3(writer, &data.normal)?;
    writer.write_u32::<LittleEndian>(data.weight)?;
    writer.write_u32::<LittleEndian>(data.bone_id)?;
    Ok(())
}

fn write_model_sound<W: Write>(writer: &mut W, data: &ModelSound) -> std::io::Result<()> {
    write_i32s(writer, &data.values)
}

fn write_bone_matrix<W: Write>(writer: &mut W, data: &BoneMatrix) -> std::io::Result<()> {
    write_matrix4x4(writer, &data.transform)
}

fn write_bone_data<W: Write>(writer: &mut W, data: &BoneData) -> std::io::Result<()> {
    write_vector3(writer, &data.offset)?;
    writer.write_i16::<LittleEndian>(data.unk_0x0c)?;
    writer.write_i16::<LittleEndian>(data.parent_offset)?;
    Ok(())
}

fn write_attachment<W: Write>(writer: &mut W, data: &Attachment) -> std::io::Result<()> {
    writer.write_u16::<LittleEndian>(data.unk_0x00)?;
    writer.write_u16::<LittleEndian>(data.unk_0x02)?;
    writer.write_all(&data.bone_ids)?;
    writer.write_u8(ATTACHMENT_TERMINATOR)?;
    write_padding_to(writer, 4 + data.bone_ids.len() as u64 + 1, 4)
}

/// Writes the attachment section located at the container relative offset `attachments_ptr`.
fn write_attachments<W: Write>(
    writer: &mut W,
    data: &Attachments,
    attachments_ptr: u64,
) -> std::io::Result<()> {
    match data {
        Attachments::Counted(attachments) => {
            writer.write_u32::<LittleEndian>(attachments.len() as u32)?;

            // The records follow the pointer table.
            write_ptr_table(
                writer,
                attachments_ptr + 4 + attachments.len() as u64 * 4,
                attachments,
                Attachment::size_in_bytes,
            )?;

            for attachment in attachments {
                write_attachment(writer, attachment)?;
            }
        }
        Attachments::Indexed(bone_ids) => {
            // A count of 0 indicates a list of bone indices.
            writer.write_u32::<LittleEndian>(0)?;
            writer.write_all(bone_ids)?;
            writer.write_u8(ATTACHMENT_TERMINATOR)?;
        }
    }
    Ok(())
}

fn write_frame<W: Write>(writer: &mut W, data: &Frame) -> std::io::Result<()> {
    writer.write_f32::<LittleEndian>(data.speed)?;
    writer.write_u16::<LittleEndian>(data.frame_index)?;
    writer.write_u16::<LittleEndian>(data.frame_length())?;
    writer.write_u32::<LittleEndian>(data.unk_0x08)?;
    writer.write_u32::<LittleEndian>(data.unk_0x0c)?;

    for rotation in &data.rotations {
        for value in rotation {
            writer.write_i16::<LittleEndian>(*value)?;
        }
    }
    writer.write_all(&data.data)?;

    let payload_size = data.rotations.len() as u64 * ROTATION_SIZE + data.data.len() as u64;
    write_padding_to(writer, payload_size, 16)
}

/// Writes the animation located at the container relative offset `animation_ptr`.
fn write_animation<W: Write>(
    writer: &mut W,
    data: &Animation,
    animation_ptr: u64,
) -> std::io::Result<()> {
    write_f32s(writer, &[data.unk1, data.unk2, data.unk3, data.unk4])?;
    writer.write_u8(data.frames.len() as u8)?;
    writer.write_all(&data.unk_0x11)?;
    writer.write_i32::<LittleEndian>(data.unk8)?;
    writer.write_f32::<LittleEndian>(data.speed)?;

    write_ptr_table(
        writer,
        animation_ptr + data.header_size_in_bytes(),
        &data.frames,
        Frame::size_in_bytes,
    )?;
    write_padding_to(
        writer,
        ANIMATION_HEADER_SIZE + data.frames.len() as u64 * 4,
        16,
    )?;

    for frame in &data.frames {
        write_frame(writer, frame)?;
    }
    Ok(())
}

fn write_elements<W: Write, T, F: Fn(&mut W, &T) -> std::io::Result<()>>(
    writer: &mut W,
    elements: &[T],
    write_t: F,
) -> std::io::Result<()> {
    for element in elements {
        write_t(writer, element)?;
    }
    Ok(())
}

/// Writes the container at the writer's current position.
/// `offset` is the absolute position of the container in the final file.
fn write_moby_data<W: Write + Seek>(
    writer: &mut W,
    model: &MobyModel,
    offset: u64,
) -> std::io::Result<()> {
    if !model.is_model {
        return Ok(());
    }

    let layout = MobyLayout::new(model, offset);
    debug!("Moby {} layout at offset {:#x}: {:?}", model.id, offset, layout);

    // Zero the entire container first, so any gaps between sections are padding.
    let start = writer.seek(SeekFrom::Current(0))?;
    write_padding(writer, layout.length)?;

    let mesh = &model.mesh;
    let has_mesh = !mesh.vertices.is_empty();
    let has_bones = model.id != 1 && model.id != 2;
    let has_attachments = matches!(&model.attachments, Some(a) if !a.is_empty());

    writer.seek(SeekFrom::Start(start))?;
    write_ptr(writer, layout.mesh, has_mesh)?;
    writer.write_i32::<LittleEndian>(model.null1)?;
    writer.write_u8(model.bone_count)?;
    writer.write_u8(model.lp_bone_count)?;
    writer.write_u8(model.count3)?;
    writer.write_u8(model.count4)?;
    writer.write_u8(model.animations.len() as u8)?;
    writer.write_u8(model.sounds.len() as u8)?;
    writer.write_u8(model.lp_render_dist)?;
    writer.write_u8(model.count8)?;
    write_ptr(writer, layout.hitbox, !model.hitbox.is_empty())?;
    write_ptr(writer, layout.bone_matrices, has_bones)?;
    write_ptr(writer, layout.bone_datas, has_bones)?;
    write_ptr(writer, layout.attachments, has_attachments)?;
    writer.write_i32::<LittleEndian>(model.null2)?;
    writer.write_f32::<LittleEndian>(model.size)?;
    write_ptr(writer, layout.sounds, !model.sounds.is_empty())?;
    writer.write_i32::<LittleEndian>(model.null3)?;
    writer.write_f32::<LittleEndian>(model.unk1)?;
    writer.write_f32::<LittleEndian>(model.unk2)?;
    writer.write_f32::<LittleEndian>(model.unk3)?;
    writer.write_f32::<LittleEndian>(model.unk4)?;
    writer.write_u32::<LittleEndian>(model.color.into())?;
    writer.write_u32::<LittleEndian>(model.unk6)?;
    for ptr in &layout.animations {
        writer.write_u32::<LittleEndian>(*ptr as u32)?;
    }

    writer.seek(SeekFrom::Start(start + layout.mesh))?;
    writer.write_u32::<LittleEndian>(mesh.texture_configs.len() as u32)?;
    writer.write_u32::<LittleEndian>(mesh.reflective_texture_configs.len() as u32)?;
    write_ptr(
        writer,
        layout.texture_configs,
        !mesh.texture_configs.is_empty(),
    )?;
    write_ptr(
        writer,
        layout.reflective_texture_configs,
        !mesh.reflective_texture_configs.is_empty(),
    )?;
    write_ptr(writer, layout.vertices, has_mesh)?;
    // The reflective indices are found relative to the index pointer.
    write_ptr(
        writer,
        layout.indices,
        !mesh.indices.is_empty() || !mesh.reflective_indices.is_empty(),
    )?;
    writer.write_u16::<LittleEndian>(mesh.vertices.len() as u16)?;
    writer.write_u16::<LittleEndian>(mesh.reflective_vertices.len() as u16)?;
    writer.write_u16::<LittleEndian>(mesh.lit_vertex_count)?;

    writer.seek(SeekFrom::Start(start + layout.texture_configs))?;
    write_elements(writer, &mesh.texture_configs, write_texture_config)?;

    writer.seek(SeekFrom::Start(start + layout.reflective_texture_configs))?;
    write_elements(writer, &mesh.reflective_texture_configs, write_texture_config)?;

    writer.seek(SeekFrom::Start(start + layout.vertices))?;
    write_elements(writer, &mesh.vertices, write_textured_vertex)?;

    writer.seek(SeekFrom::Start(start + layout.reflective_vertices))?;
    write_elements(writer, &mesh.reflective_vertices, write_reflective_vertex)?;

    writer.seek(SeekFrom::Start(start + layout.indices))?;
    write_elements(writer, &mesh.indices, |w, i| w.write_u16::<LittleEndian>(*i))?;

    writer.seek(SeekFrom::Start(start + layout.reflective_indices))?;
    write_elements(writer, &mesh.reflective_indices, |w, i| {
        w.write_u16::<LittleEndian>(*i)
    })?;

    writer.seek(SeekFrom::Start(start + layout.hitbox))?;
    writer.write_all(&model.hitbox)?;

    writer.seek(SeekFrom::Start(start + layout.sounds))?;
    write_elements(writer, &model.sounds, write_model_sound)?;

    if let Some(attachments) = &model.attachments {
        if has_attachments {
            writer.seek(SeekFrom::Start(start + layout.attachments))?;
            write_attachments(writer, attachments, layout.attachments)?;
        }
    }

    writer.seek(SeekFrom::Start(start + layout.bone_matrices))?;
    write_elements(writer, &model.bone_matrices, write_bone_matrix)?;

    writer.seek(SeekFrom::Start(start + layout.bone_datas))?;
    write_elements(writer, &model.bone_datas, write_bone_data)?;

    for (animation, ptr) in model.animations.iter().zip(layout.animations.iter()) {
        if *ptr != 0 {
            writer.seek(SeekFrom::Start(start + ptr))?;
            write_animation(writer, animation, *ptr)?;
        }
    }

    writer.seek(SeekFrom::Start(start + layout.length))?;
    Ok(())
}

pub(crate) fn moby_to_bytes(model: &MobyModel, offset: u64) -> std::io::Result<Vec<u8>> {
    let mut writer = Cursor::new(Vec::new());
    write_moby_data(&mut writer, model, offset)?;
    Ok(writer.into_inner())
}

pub(crate) fn write_moby<W: Write>(
    writer: &mut W,
    model: &MobyModel,
    offset: u64,
) -> std::io::Result<()> {
    write_buffered(writer, |c| write_moby_data(c, model, offset))
}

pub(crate) fn write_moby_to_file<P: AsRef<Path>>(
    path: P,
    model: &MobyModel,
    offset: u64,
) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    write_buffered(&mut file, |c| write_moby_data(c, model, offset))
}

pub(crate) fn write_texture_header<W: Write>(
    writer: &mut W,
    data: &TextureHeader,
    vram_ptr: u32,
) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(vram_ptr)?;
    writer.write_u8(data.unk_0x04)?;
    writer.write_u8(data.mip_map_count)?;
    writer.write_u8(data.format)?;
    writer.write_u8(data.unk_0x07)?;
    writer.write_all(&data.unk_0x08)?;
    writer.write_u32::<LittleEndian>(data.gtf_flags)?;
    writer.write_all(&data.unk_0x14)?;
    writer.write_i16::<LittleEndian>(data.width)?;
    writer.write_i16::<LittleEndian>(data.height)?;
    writer.write_i16::<LittleEndian>(data.unk_0x1c)?;
    writer.write_i16::<LittleEndian>(data.unk_0x1e)?;
    writer.write_i16::<LittleEndian>(data.unk_0x20)?;
    writer.write_i16::<LittleEndian>(data.unk_0x22)?;
    Ok(())
}

fn write_buffered<W: Write, F: Fn(&mut Cursor<Vec<u8>>) -> std::io::Result<()>>(
    writer: &mut W,
    write_data: F,
) -> std::io::Result<()> {
    // The section writers seek to precomputed offsets.
    // Buffer the entire write operation into memory to enable writing the final result in order.
    let mut cursor = Cursor::new(Vec::new());
    write_data(&mut cursor)?;

    writer.write_all(cursor.get_ref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_hex_eq, formats::moby::PackedColor, GameType};
    use hexlit::hex;
    use pretty_assertions::assert_eq;

    fn vertex(x: f32) -> TexturedVertex {
        TexturedVertex {
            position: Vector3::new(x, 1.0, 2.0),
            normal: Vector3::new(0.0, 1.0, 0.0),
            uv: Vector2::new(0.5, 0.25),
            weights: 0xFF,
            ids: 1,
        }
    }

    fn triangle_model(id: i16) -> MobyModel {
        let mut model = MobyModel {
            id,
            is_model: true,
            size: 1.0,
            ..Default::default()
        };
        model.mesh.texture_configs = vec![TextureConfig {
            id: 1,
            start: 0,
            size: 3,
            mode: 0,
        }];
        model.mesh.vertices = vec![vertex(0.0), vertex(1.0), vertex(2.0)];
        model.mesh.indices = vec![0, 1, 2];
        model.mesh.lit_vertex_count = 3;
        model
    }

    fn animated_model() -> MobyModel {
        let mut model = triangle_model(5);
        model.bone_count = 2;
        model.lp_bone_count = 2;
        model.lp_render_dist = 0x40;
        model.unk1 = 1.5;
        model.color = PackedColor::from(0x80808080);
        model.bone_matrices = vec![
            BoneMatrix {
                transform: Matrix4x4::identity(),
            };
            2
        ];
        model.bone_datas = vec![
            BoneData::default(),
            BoneData {
                offset: Vector3::new(0.0, 1.0, 0.0),
                unk_0x0c: 3,
                parent_offset: 0,
            },
        ];
        model.animations = vec![Animation {
            unk1: 1.0,
            unk_0x11: [1, 2, 3],
            unk8: -1,
            speed: 0.5,
            frames: vec![Frame {
                speed: 1.0,
                frame_index: 0,
                unk_0x08: 4,
                unk_0x0c: 5,
                rotations: vec![[0, 0, 0, 0x7FFF], [1, 2, 3, 4]],
                data: Vec::new(),
            }],
            ..Default::default()
        }];
        model
    }

    fn reread(bytes: &[u8], offset: u64, model: &MobyModel) -> MobyModel {
        let mut data = vec![0u8; offset as usize];
        data.extend_from_slice(bytes);
        let mut reader = Cursor::new(data);
        MobyModel::read(&mut reader, model.game, model.id, offset).unwrap()
    }

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn align_to_remainder() {
        assert_eq!(0, align(0, 0));
        assert_eq!(0x10, align(1, 0));
        assert_eq!(0x50, align(0x48, 0));
        assert_eq!(0x4C, align(0x48, 0xC));
        assert_eq!(0x54, align(0x49, 0x4));
    }

    #[test]
    fn container_alignment_absolute() {
        assert_eq!(0, container_alignment(0x1000));
        assert_eq!(0xC, container_alignment(0x1004));
        assert_eq!(1, container_alignment(0x0F));
    }

    #[test]
    fn dist_to_file80_boundaries() {
        assert_eq!(0, dist_to_file80(0));
        assert_eq!(0, dist_to_file80(0x180));
        assert_eq!(0x7F, dist_to_file80(0x181));
        assert_eq!(0x10, dist_to_file80(0x70));
    }

    #[test]
    fn write_texture_config_bytes() {
        let mut writer = Cursor::new(Vec::new());
        write_texture_config(
            &mut writer,
            &TextureConfig {
                id: 5,
                start: 3,
                size: 6,
                mode: 10,
            },
        )
        .unwrap();
        assert_hex_eq!(
            writer.get_ref(),
            &hex!("05000000 03000000 06000000 0A000000")
        );
    }

    #[test]
    fn write_textured_vertex_bytes() {
        let mut writer = Cursor::new(Vec::new());
        write_textured_vertex(
            &mut writer,
            &TexturedVertex {
                position: Vector3::new(1.0, 2.0, 3.0),
                normal: Vector3::new(0.0, 1.0, 0.0),
                uv: Vector2::new(0.5, 1.0),
                weights: 0x04030201,
                ids: 0x08070605,
            },
        )
        .unwrap();
        assert_hex_eq!(
            writer.get_ref(),
            &hex!("0000803F 00000040 00004040 00000000 0000803F 00000000 0000003F 0000803F 01020304 05060708")
        );
    }

    #[test]
    fn write_reflective_vertex_bytes() {
        let mut writer = Cursor::new(Vec::new());
        write_reflective_vertex(
            &mut writer,
            &ReflectiveVertex {
                position: Vector3::new(1.0, 0.0, 0.0),
                normal: Vector3::new(0.0, 0.0, 1.0),
                weight: 2,
                bone_id: 3,
            },
        )
        .unwrap();
        assert_hex_eq!(
            writer.get_ref(),
            &hex!("0000803F 00000000 00000000 00000000 00000000 0000803F 02000000 03000000")
        );
    }

    #[test]
    fn write_bone_data_bytes() {
        let mut writer = Cursor::new(Vec::new());
        write_bone_data(
            &mut writer,
            &BoneData {
                offset: Vector3::new(1.0, 0.0, 0.0),
                unk_0x0c: -1,
                parent_offset: 0x40,
            },
        )
        .unwrap();
        assert_hex_eq!(
            writer.get_ref(),
            &hex!("0000803F 00000000 00000000 FFFF4000")
        );
    }

    #[test]
    fn write_attachment_padding() {
        let mut writer = Cursor::new(Vec::new());
        write_attachment(
            &mut writer,
            &Attachment {
                unk_0x00: 1,
                unk_0x02: 2,
                bone_ids: vec![3, 4, 5, 6],
            },
        )
        .unwrap();
        assert_hex_eq!(writer.get_ref(), &hex!("01000200 03040506 FF000000"));
    }

    #[test]
    fn write_counted_attachments_pointers() {
        let mut writer = Cursor::new(Vec::new());
        let attachments = Attachments::Counted(vec![Attachment::default(), Attachment::default()]);
        write_attachments(&mut writer, &attachments, 0x100).unwrap();
        assert_hex_eq!(
            writer.get_ref(),
            &hex!("02000000 0C010000 14010000 00000000 FF000000 00000000 FF000000")
        );
    }

    #[test]
    fn write_indexed_attachments() {
        let mut writer = Cursor::new(Vec::new());
        write_attachments(&mut writer, &Attachments::Indexed(vec![1, 2]), 0x100).unwrap();
        assert_hex_eq!(writer.get_ref(), &hex!("00000000 0102FF"));
    }

    #[test]
    fn write_ptr_table_consecutive_records() {
        let mut writer = Cursor::new(Vec::new());
        write_ptr_table(&mut writer, 0x20, &[0x10u64, 0x30, 0x08], |size| *size).unwrap();
        assert_hex_eq!(writer.get_ref(), &hex!("20000000 30000000 60000000"));
    }

    #[test]
    fn write_padding_to_multiple() {
        let mut writer = Cursor::new(Vec::new());
        write_padding_to(&mut writer, 0x1C + 4, 16).unwrap();
        assert_eq!(0, writer.get_ref().len());
        write_padding_to(&mut writer, 0x1C + 8, 16).unwrap();
        assert_eq!(12, writer.get_ref().len());
    }

    #[test]
    fn write_frame_padding() {
        let mut writer = Cursor::new(Vec::new());
        write_frame(
            &mut writer,
            &Frame {
                speed: 1.0,
                frame_index: 2,
                unk_0x08: 0,
                unk_0x0c: 0,
                rotations: vec![[1, 2, 3, 4]],
                data: vec![0xAA],
            },
        )
        .unwrap();
        assert_hex_eq!(
            writer.get_ref(),
            &hex!("0000803F 02000100 00000000 00000000 01000200 03000400 AA000000 00000000")
        );
    }

    #[test]
    fn write_texture_header_vram_ptr() {
        let mut writer = Cursor::new(Vec::new());
        let mut header = TextureHeader::new(4, 8, crate::dxt::TextureFormat::Bc1);
        header.vram_ptr = 0xFFFF;
        write_texture_header(&mut writer, &header, 0x10).unwrap();
        assert_eq!(0x24, writer.get_ref().len());
        assert_eq!(0x10, read_u32(writer.get_ref(), 0));
    }

    #[test]
    fn placeholder_writes_nothing() {
        let model = MobyModel {
            id: 3,
            is_model: false,
            ..Default::default()
        };
        assert!(model.to_bytes(0x100).unwrap().is_empty());
    }

    #[test]
    fn menu_animation_space_for_model_0() {
        let layout0 = MobyLayout::new(&triangle_model(0), 0x400);
        let layout1 = MobyLayout::new(&triangle_model(1), 0x400);
        assert_eq!(layout1.mesh + 0x80, layout0.mesh);

        let bytes0 = triangle_model(0).to_bytes(0x400).unwrap();
        let bytes1 = triangle_model(1).to_bytes(0x400).unwrap();
        assert_eq!(read_u32(&bytes1, 0) + 0x80, read_u32(&bytes0, 0));
    }

    #[test]
    fn extra_header_space_after_model_2() {
        let layout2 = MobyLayout::new(&triangle_model(2), 0);
        let layout3 = MobyLayout::new(&triangle_model(3), 0);
        assert_eq!(0x50, layout2.mesh);
        assert_eq!(0x70, layout3.mesh);
    }

    #[test]
    fn sections_aligned_to_file() {
        for offset in [0x1000, 0x1004, 0x100F, 0x2345] {
            let model = animated_model();
            let layout = MobyLayout::new(&model, offset);
            assert_eq!(0, (offset + layout.mesh) % 16);
            assert_eq!(0, (offset + layout.texture_configs) % 16);
            assert_eq!(0, (offset + layout.vertices) % 0x80);
            assert_eq!(0, (offset + layout.indices) % 16);
            assert_eq!(0, (offset + layout.bone_matrices) % 16);
            assert_eq!(0, (offset + layout.animations[0]) % 16);
            assert_eq!(layout.length, model.to_bytes(offset).unwrap().len() as u64);
        }
    }

    #[test]
    fn layout_without_vertices_skips_vertex_alignment() {
        let mut model = triangle_model(1);
        model.mesh = Default::default();
        let layout = MobyLayout::new(&model, 0x10);
        // Only the header and mesh header take up space.
        assert_eq!(0x50, layout.mesh);
        assert_eq!(0x70, layout.vertices);
        assert_eq!(0x70, layout.length);
    }

    #[test]
    fn skeleton_models_omit_bone_pointers() {
        for id in [1, 2] {
            let mut model = animated_model();
            model.id = id;
            let bytes = model.to_bytes(0).unwrap();
            assert_eq!(0, read_u32(&bytes, 0x14));
            assert_eq!(0, read_u32(&bytes, 0x18));
        }

        let bytes = animated_model().to_bytes(0).unwrap();
        assert_ne!(0, read_u32(&bytes, 0x14));
        assert_ne!(0, read_u32(&bytes, 0x18));
    }

    #[test]
    fn empty_animation_null_pointer() {
        let mut model = animated_model();
        model.animations.insert(0, Animation::default());
        let bytes = model.to_bytes(0x10).unwrap();
        assert_eq!(2, bytes[0x0C]);
        assert_eq!(0, read_u32(&bytes, 0x48));
        assert_ne!(0, read_u32(&bytes, 0x4C));

        let new_model = reread(&bytes, 0x10, &model);
        assert_eq!(model.animations, new_model.animations);
    }

    #[test]
    fn mesh_header_counts() {
        let mut model = triangle_model(4);
        model.mesh.reflective_vertices = vec![ReflectiveVertex::default(); 2];
        let bytes = model.to_bytes(0).unwrap();
        let layout = MobyLayout::new(&model, 0);
        let mesh = layout.mesh as usize;
        assert_eq!(1, read_u32(&bytes, mesh));
        assert_eq!(layout.texture_configs as u32, read_u32(&bytes, mesh + 0x08));
        assert_eq!(0, read_u32(&bytes, mesh + 0x0C));
        assert_eq!(layout.vertices as u32, read_u32(&bytes, mesh + 0x10));
        assert_eq!(layout.indices as u32, read_u32(&bytes, mesh + 0x14));
        assert_eq!(&[3, 0, 2, 0, 3, 0], &bytes[mesh + 0x18..mesh + 0x1E]);
    }

    #[test]
    fn round_trip_animated_model() {
        let model = animated_model();
        for offset in [0x10, 0x1004, 0x20F1] {
            let bytes = model.to_bytes(offset).unwrap();
            let new_model = reread(&bytes, offset, &model);
            assert_eq!(model, new_model);
            assert_eq!(2, new_model.bone_count);
            assert_eq!(1, new_model.animations.len());
            assert_eq!(model.skeleton(), new_model.skeleton());
        }
    }

    #[test]
    fn round_trip_all_sections() {
        let mut model = triangle_model(0);
        model.game = GameType::RaC3;
        model.null2 = 7;
        model.hitbox = hex!("00000000 04000000 00000000 00000000 01020304").to_vec();
        model.sounds = vec![
            ModelSound {
                values: [1, 2, 3, 4, 5, 6, 7, -8]
            };
            2
        ];
        model.attachments = Some(Attachments::Counted(vec![
            Attachment {
                unk_0x00: 1,
                unk_0x02: 2,
                bone_ids: vec![0, 1],
            },
            Attachment {
                unk_0x00: 3,
                unk_0x02: 4,
                bone_ids: vec![2, 3, 4, 5],
            },
        ]));
        model.mesh.reflective_texture_configs = vec![TextureConfig {
            id: 2,
            start: 0,
            size: 3,
            mode: 1,
        }];
        model.mesh.reflective_vertices = vec![
            ReflectiveVertex {
                position: Vector3::new(1.0, 2.0, 3.0),
                normal: Vector3::new(0.0, 0.0, 1.0),
                weight: 0xFF,
                bone_id: 0,
            };
            3
        ];
        model.mesh.reflective_indices = vec![2, 1, 0];

        let bytes = model.to_bytes(0x38).unwrap();
        assert_eq!(model, reread(&bytes, 0x38, &model));
    }

    #[test]
    fn round_trip_preserves_attachment_variant() {
        let mut model = triangle_model(4);

        model.attachments = Some(Attachments::Indexed(vec![3, 0, 7]));
        let bytes = model.to_bytes(0x10).unwrap();
        assert_eq!(
            Some(Attachments::Indexed(vec![3, 0, 7])),
            reread(&bytes, 0x10, &model).attachments
        );

        let counted = Attachments::Counted(vec![Attachment {
            unk_0x00: 0,
            unk_0x02: 0,
            bone_ids: vec![3, 0, 7],
        }]);
        model.attachments = Some(counted.clone());
        let bytes = model.to_bytes(0x10).unwrap();
        assert_eq!(Some(counted), reread(&bytes, 0x10, &model).attachments);
    }

    #[test]
    fn empty_indexed_attachments_round_trip() {
        let mut model = triangle_model(4);
        model.attachments = Some(Attachments::Indexed(Vec::new()));
        let bytes = model.to_bytes(0x10).unwrap();
        assert_eq!(
            Some(Attachments::Indexed(Vec::new())),
            reread(&bytes, 0x10, &model).attachments
        );
    }

    #[test]
    fn empty_counted_attachments_omitted() {
        let mut model = triangle_model(4);
        model.attachments = Some(Attachments::Counted(Vec::new()));
        let bytes = model.to_bytes(0x10).unwrap();
        assert_eq!(0, read_u32(&bytes, 0x1C));
    }

    #[test]
    fn write_matches_to_bytes() {
        let model = animated_model();
        let mut writer = Cursor::new(Vec::new());
        model.write(&mut writer, 0x1004).unwrap();
        assert_hex_eq!(writer.get_ref(), &model.to_bytes(0x1004).unwrap());
    }
}
