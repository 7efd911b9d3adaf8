//! Bone tables and the bone hierarchy derived from them.
use binread::BinRead;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

use crate::{Matrix4x4, Vector3};

pub const BONE_MATRIX_SIZE: u64 = 0x40;
pub const BONE_DATA_SIZE: u64 = 0x10;

/// The bind transform for a single bone.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Default)]
pub struct BoneMatrix {
    pub transform: Matrix4x4,
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Default)]
pub struct BoneData {
    pub offset: Vector3,
    pub unk_0x0c: i16,
    /// The byte offset of the parent's entry in the bone matrix table.
    pub parent_offset: i16,
}

impl BoneData {
    /// The index of the parent bone in the bone tables.
    pub fn parent_index(&self) -> usize {
        (self.parent_offset.max(0) as u64 / BONE_MATRIX_SIZE) as usize
    }
}

/// A bone hierarchy stored as parent indices.
/// Node `i` corresponds to entry `i` of both bone tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    parents: Vec<Option<usize>>,
}

impl Skeleton {
    /// Links the bones to their parents starting from bone 0 as the root.
    /// Returns `None` if either table is empty.
    ///
    /// A parent must precede its children.
    /// Bones with any other parent index are attached to the root.
    pub fn from_bones(bone_matrices: &[BoneMatrix], bone_datas: &[BoneData]) -> Option<Self> {
        let bone_count = bone_matrices.len().min(bone_datas.len());
        if bone_count == 0 {
            return None;
        }

        let mut parents = vec![None];
        for (i, data) in bone_datas.iter().enumerate().take(bone_count).skip(1) {
            let parent = data.parent_index();
            parents.push(Some(if parent < i { parent } else { 0 }));
        }

        Some(Self { parents })
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// The parent of bone `index` or `None` for the root and out of range indices.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// The direct children of bone `index` in ascending order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(move |(_, p)| **p == Some(index))
            .map(|(i, _)| i)
    }

    /// The number of ancestors of bone `index`.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = index;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }
}
