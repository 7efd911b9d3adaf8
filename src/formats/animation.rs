//! Skeletal animations stored as a list of frames with per bone rotations.
//!
//! The rotation data is preserved as is. Interpolating or applying frames is left to the application.
use std::io::{Read, Seek};

use binread::{BinRead, BinResult};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

use crate::{read_at, read_bytes_at, read_elements_at};

pub const ANIMATION_HEADER_SIZE: u64 = 0x1C;
pub const FRAME_HEADER_SIZE: u64 = 0x10;

/// The size in bytes of a single bone rotation in a frame.
pub const ROTATION_SIZE: u64 = 8;

#[derive(BinRead, Debug)]
struct AnimationHeader {
    unk1: f32,
    unk2: f32,
    unk3: f32,
    unk4: f32,
    frame_count: u8,
    unk_0x11: [u8; 3],
    unk8: i32,
    speed: f32,
}

#[derive(BinRead, Debug)]
struct FrameHeader {
    speed: f32,
    frame_index: u16,
    /// The payload size in 16 byte units.
    frame_length: u16,
    unk_0x08: u32,
    unk_0x0c: u32,
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animation {
    pub unk1: f32,
    pub unk2: f32,
    pub unk3: f32,
    pub unk4: f32,
    pub unk_0x11: [u8; 3],
    pub unk8: i32,
    pub speed: f32,
    pub frames: Vec<Frame>,
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub speed: f32,
    pub frame_index: u16,
    pub unk_0x08: u32,
    pub unk_0x0c: u32,
    /// One quaternion rotation for each bone.
    pub rotations: Vec<[i16; 4]>,
    /// The remaining payload after the rotations.
    pub data: Vec<u8>,
}

impl Animation {
    /// Reads the animation at `base + ptr`.
    /// A `ptr` of 0 produces an empty animation.
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        base: u64,
        ptr: u32,
        bone_count: u8,
    ) -> BinResult<Self> {
        if ptr == 0 {
            return Ok(Self::default());
        }

        let offset = base + ptr as u64;
        let header: AnimationHeader = read_at(reader, offset)?;
        let frame_ptrs: Vec<u32> = read_elements_at(
            reader,
            offset + ANIMATION_HEADER_SIZE,
            header.frame_count as usize,
        )?;

        let frames = frame_ptrs
            .iter()
            .map(|p| Frame::read(reader, base + *p as u64, bone_count))
            .collect::<BinResult<Vec<_>>>()?;

        Ok(Self {
            unk1: header.unk1,
            unk2: header.unk2,
            unk3: header.unk3,
            unk4: header.unk4,
            unk_0x11: header.unk_0x11,
            unk8: header.unk8,
            speed: header.speed,
            frames,
        })
    }

    /// The size in bytes of the header and frame pointer table including padding.
    pub fn header_size_in_bytes(&self) -> u64 {
        let size = ANIMATION_HEADER_SIZE + self.frames.len() as u64 * 4;
        (size + 15) / 16 * 16
    }

    /// The size in bytes of the header and all frames.
    pub fn size_in_bytes(&self) -> u64 {
        self.header_size_in_bytes() + self.frames.iter().map(Frame::size_in_bytes).sum::<u64>()
    }
}

impl Frame {
    /// Reads the frame at the absolute position `offset`.
    /// The payload starts with `bone_count` rotations if the payload is large enough.
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, bone_count: u8) -> BinResult<Self> {
        let header: FrameHeader = read_at(reader, offset)?;
        let payload_size = header.frame_length as u64 * 16;

        let rotation_count = (bone_count as u64).min(payload_size / ROTATION_SIZE);
        let payload_offset = offset + FRAME_HEADER_SIZE;
        let rotations = read_elements_at(reader, payload_offset, rotation_count as usize)?;

        let rotations_size = rotation_count * ROTATION_SIZE;
        let data = read_bytes_at(
            reader,
            payload_offset + rotations_size,
            (payload_size - rotations_size) as usize,
        )?;

        Ok(Self {
            speed: header.speed,
            frame_index: header.frame_index,
            unk_0x08: header.unk_0x08,
            unk_0x0c: header.unk_0x0c,
            rotations,
            data,
        })
    }

    /// The payload size in 16 byte units.
    pub fn frame_length(&self) -> u16 {
        let size = self.rotations.len() as u64 * ROTATION_SIZE + self.data.len() as u64;
        ((size + 15) / 16) as u16
    }

    /// The size in bytes of the header and padded payload.
    pub fn size_in_bytes(&self) -> u64 {
        FRAME_HEADER_SIZE + self.frame_length() as u64 * 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlit::hex;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn read_null_animation() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        let value = Animation::read(&mut reader, 0x40, 0, 2).unwrap();
        assert_eq!(Animation::default(), value);
    }

    #[test]
    fn read_frame_with_rotations() {
        let mut reader = Cursor::new(hex!(
            "0000803F 03000100 0A000000 0B000000 01000200 03000400 05000600 07000800"
        ));
        let value = Frame::read(&mut reader, 0, 1).unwrap();
        assert_eq!(
            Frame {
                speed: 1.0,
                frame_index: 3,
                unk_0x08: 10,
                unk_0x0c: 11,
                rotations: vec![[1, 2, 3, 4]],
                data: hex!("05000600 07000800").to_vec(),
            },
            value
        );
        assert_eq!(1, value.frame_length());
        assert_eq!(0x20, value.size_in_bytes());
    }

    #[test]
    fn read_frame_rotations_limited_by_payload() {
        let mut reader = Cursor::new(hex!(
            "00000000 00000100 00000000 00000000 01000100 01000100 02000200 02000200"
        ));
        let value = Frame::read(&mut reader, 0, 5).unwrap();
        assert_eq!(vec![[1, 1, 1, 1], [2, 2, 2, 2]], value.rotations);
        assert!(value.data.is_empty());
    }

    #[test]
    fn read_frame_truncated_payload() {
        let mut reader = Cursor::new(hex!("00000000 00000200 00000000 00000000 01000100"));
        assert!(Frame::read(&mut reader, 0, 1).is_err());
    }

    #[test]
    fn read_animation_with_frame() {
        // The animation is at base + 0x10 and its frame at base + 0x40.
        let mut data = vec![0u8; 4 + 0x10];
        data.extend_from_slice(&hex!(
            "0000803F 00000040 00004040 00008040 01AABBCC 07000000 0000003F 40000000"
        ));
        data.extend_from_slice(&[0u8; 0x10]);
        data.extend_from_slice(&hex!(
            "0000803F 00000100 00000000 00000000 01000200 03000400 00000000 00000000"
        ));

        let mut reader = Cursor::new(data);
        let value = Animation::read(&mut reader, 4, 0x10, 1).unwrap();
        assert_eq!(
            Animation {
                unk1: 1.0,
                unk2: 2.0,
                unk3: 3.0,
                unk4: 4.0,
                unk_0x11: [0xAA, 0xBB, 0xCC],
                unk8: 7,
                speed: 0.5,
                frames: vec![Frame {
                    speed: 1.0,
                    frame_index: 0,
                    unk_0x08: 0,
                    unk_0x0c: 0,
                    rotations: vec![[1, 2, 3, 4]],
                    data: vec![0u8; 8],
                }],
            },
            value
        );
    }

    #[test]
    fn animation_sizes() {
        let animation = Animation {
            frames: vec![
                Frame {
                    rotations: vec![[0; 4]; 3],
                    ..Default::default()
                };
                2
            ],
            ..Default::default()
        };
        // 0x1C + 2 * 4 rounds up to 0x30.
        assert_eq!(0x30, animation.header_size_in_bytes());
        assert_eq!(0x30 + 2 * (0x10 + 0x20), animation.size_in_bytes());
    }

    #[test]
    fn empty_frame_size() {
        assert_eq!(0, Frame::default().frame_length());
        assert_eq!(FRAME_HEADER_SIZE, Frame::default().size_in_bytes());
    }
}
