//! Attachment points used to connect other objects to a model's bones.
use std::io::{Read, Seek, SeekFrom};

use binread::{BinReaderExt, BinResult};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

use crate::{read_at, read_elements_at};

pub(crate) const ATTACHMENT_TERMINATOR: u8 = 0xFF;

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attachment {
    pub unk_0x00: u16,
    pub unk_0x02: u16,
    pub bone_ids: Vec<u8>,
}

/// The attachment section stores either a table of attachment records or a list of bone indices.
/// The leading count selects the encoding.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachments {
    Counted(Vec<Attachment>),
    Indexed(Vec<u8>),
}

impl Attachment {
    /// Reads a record at the absolute position `offset`.
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64) -> BinResult<Self> {
        reader.seek(SeekFrom::Start(offset))?;
        let unk_0x00 = reader.read_le::<u16>()?;
        let unk_0x02 = reader.read_le::<u16>()?;
        let bone_ids = read_until_terminator(reader)?;
        Ok(Self {
            unk_0x00,
            unk_0x02,
            bone_ids,
        })
    }

    /// The size in bytes including the terminator and padding.
    pub fn size_in_bytes(&self) -> u64 {
        let size = 4 + self.bone_ids.len() as u64 + 1;
        (size + 3) / 4 * 4
    }
}

impl Attachments {
    /// Reads the section at `base + ptr`.
    /// Record pointers are relative to `base`.
    pub fn read<R: Read + Seek>(reader: &mut R, base: u64, ptr: u32) -> BinResult<Self> {
        let offset = base + ptr as u64;
        let count = read_at::<i32, _>(reader, offset)?;
        if count > 0 {
            let pointers: Vec<u32> = read_elements_at(reader, offset + 4, count as usize)?;
            let attachments = pointers
                .iter()
                .map(|p| Attachment::read(reader, base + *p as u64))
                .collect::<BinResult<Vec<_>>>()?;
            Ok(Attachments::Counted(attachments))
        } else {
            // The bone list starts right after the count.
            reader.seek(SeekFrom::Start(offset + 4))?;
            Ok(Attachments::Indexed(read_until_terminator(reader)?))
        }
    }

    /// Returns `true` if writing this section would produce no data.
    /// An empty bone list still writes a terminator.
    pub fn is_empty(&self) -> bool {
        match self {
            Attachments::Counted(attachments) => attachments.is_empty(),
            Attachments::Indexed(_) => false,
        }
    }

    /// The size in bytes of the section including the record pointer table.
    pub fn size_in_bytes(&self) -> u64 {
        match self {
            Attachments::Counted(attachments) => {
                4 + attachments
                    .iter()
                    .map(|a| 4 + a.size_in_bytes())
                    .sum::<u64>()
            }
            Attachments::Indexed(bone_ids) => 4 + bone_ids.len() as u64 + 1,
        }
    }
}

fn read_until_terminator<R: Read + Seek>(reader: &mut R) -> BinResult<Vec<u8>> {
    let mut values = Vec::new();
    loop {
        let value = reader.read_le::<u8>()?;
        if value == ATTACHMENT_TERMINATOR {
            break;
        }
        values.push(value);
    }
    Ok(values)
}
