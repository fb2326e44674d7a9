use std::mem::size_of;

use byteorder::LE;
use glam::{Quat, Vec3};
use zerocopy::{FromBytes, FromZeroes, Unaligned, F32, I32};

use crate::{
    binary_utils::{fixed_str, parse_prefix},
    ChunkHeader, ChunkKind, Diagnostic, Error, Result,
};

#[derive(Debug, FromZeroes, FromBytes, Unaligned)]
#[repr(C)]
pub(crate) struct RawBone {
    name: [u8; 64],
    flags: I32<LE>,
    children_count: I32<LE>,
    parent_index: I32<LE>,
    rotation: [F32<LE>; 4],
    position: [F32<LE>; 3],
}

#[derive(Debug, FromZeroes, FromBytes, Unaligned)]
#[repr(C)]
pub(crate) struct RawAnimInfo {
    name: [u8; 64],
    group: [u8; 64],
    bone_count: I32<LE>,
    root_include: I32<LE>,
    compression_flags: I32<LE>,
    key_quotum: I32<LE>,
    key_reduction: F32<LE>,
    track_time: F32<LE>,
    animation_rate: F32<LE>,
    start_bone: I32<LE>,
    first_raw_frame: I32<LE>,
    raw_frame_count: I32<LE>,
}

#[derive(Debug, FromZeroes, FromBytes, Unaligned)]
#[repr(C)]
pub(crate) struct RawAnimKey {
    position: [F32<LE>; 3],
    rotation: [F32<LE>; 4],
    time: F32<LE>,
}

fn vec3(v: &[F32<LE>; 3]) -> Vec3 {
    Vec3::new(v[0].get(), v[1].get(), v[2].get())
}

fn quat(q: &[F32<LE>; 4]) -> Quat {
    Quat::from_xyzw(q[0].get(), q[1].get(), q[2].get(), q[3].get())
}

/// A skeleton bone. Its position in the bone list is the bone index
/// used by [`AnimInfo`] ranges and by the key stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub flags: i32,
    pub children_count: i32,
    pub parent_index: i32,
    pub rotation: Quat,
    pub position: Vec3,
}

/// Metadata of a single animation sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimInfo {
    pub name: String,
    pub group: String,
    /// Exclusive end of the animated bone range.
    pub bone_count: i32,
    pub root_include: i32,
    pub compression_flags: i32,
    pub key_quotum: i32,
    pub key_reduction: f32,
    pub track_time: f32,
    /// Frames per second.
    pub animation_rate: f32,
    /// Inclusive start of the animated bone range.
    pub start_bone: i32,
    pub first_raw_frame: i32,
    pub raw_frame_count: i32,
}

impl AnimInfo {
    /// Number of bones in `start_bone..bone_count`, zero for empty or inverted ranges.
    #[must_use]
    pub fn bone_range_len(&self) -> usize {
        usize::try_from(self.bone_count.saturating_sub(self.start_bone)).unwrap_or(0)
    }

    /// Number of keys this animation takes from the key stream.
    #[must_use]
    pub fn key_count(&self) -> usize {
        usize::try_from(self.raw_frame_count)
            .unwrap_or(0)
            .saturating_mul(self.bone_range_len())
    }
}

/// A single sampled bone transform. Carries no bone or frame identity,
/// that is implied by its position in the key stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimKey {
    pub position: Vec3,
    pub rotation: Quat,
    pub time: f32,
}

pub(crate) trait Record: Sized {
    type Raw: FromBytes + Unaligned;

    const KIND: ChunkKind;
    /// Record sizes larger than the decoded layout which are known to appear in valid files.
    const EXTENDED_SIZES: &'static [usize] = &[];

    fn decode(raw: &Self::Raw, index: usize, diagnostics: &mut Vec<Diagnostic>) -> Self;
}

fn decode_name(
    bytes: &[u8],
    kind: ChunkKind,
    index: usize,
    field: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    let (name, ascii) = fixed_str(bytes);
    if !ascii {
        diagnostics.push(Diagnostic::NonAsciiName { kind, index, field });
    }
    name
}

impl Record for Bone {
    type Raw = RawBone;

    const KIND: ChunkKind = ChunkKind::Bones;
    // joint length and collision extents follow the position
    const EXTENDED_SIZES: &'static [usize] = &[120];

    fn decode(raw: &RawBone, index: usize, diagnostics: &mut Vec<Diagnostic>) -> Self {
        Self {
            name: decode_name(&raw.name, Self::KIND, index, "name", diagnostics),
            flags: raw.flags.get(),
            children_count: raw.children_count.get(),
            parent_index: raw.parent_index.get(),
            rotation: quat(&raw.rotation),
            position: vec3(&raw.position),
        }
    }
}

impl Record for AnimInfo {
    type Raw = RawAnimInfo;

    const KIND: ChunkKind = ChunkKind::AnimInfos;

    fn decode(raw: &RawAnimInfo, index: usize, diagnostics: &mut Vec<Diagnostic>) -> Self {
        Self {
            name: decode_name(&raw.name, Self::KIND, index, "name", diagnostics),
            group: decode_name(&raw.group, Self::KIND, index, "group", diagnostics),
            bone_count: raw.bone_count.get(),
            root_include: raw.root_include.get(),
            compression_flags: raw.compression_flags.get(),
            key_quotum: raw.key_quotum.get(),
            key_reduction: raw.key_reduction.get(),
            track_time: raw.track_time.get(),
            animation_rate: raw.animation_rate.get(),
            start_bone: raw.start_bone.get(),
            first_raw_frame: raw.first_raw_frame.get(),
            raw_frame_count: raw.raw_frame_count.get(),
        }
    }
}

impl Record for AnimKey {
    type Raw = RawAnimKey;

    const KIND: ChunkKind = ChunkKind::AnimKeys;

    fn decode(raw: &RawAnimKey, _index: usize, _diagnostics: &mut Vec<Diagnostic>) -> Self {
        Self {
            position: vec3(&raw.position),
            rotation: quat(&raw.rotation),
            time: raw.time.get(),
        }
    }
}

/// Decodes the records of a chunk payload.
/// Every record occupies `header.data_size` bytes and is decoded from the start of that window.
pub(crate) fn decode_block<R: Record>(
    header: &ChunkHeader,
    payload: &[u8],
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<R>> {
    if header.data_count == 0 {
        return Ok(Vec::new());
    }

    let layout_size = size_of::<R::Raw>();

    if header.data_size < layout_size {
        return Err(Error::Corrupted {
            chunk: header.chunk_id.clone(),
            error: "record size is smaller than the record layout",
        });
    }

    if header.data_size != layout_size && !R::EXTENDED_SIZES.contains(&header.data_size) {
        diagnostics.push(Diagnostic::RecordSizeMismatch {
            kind: R::KIND,
            expected: layout_size,
            actual: header.data_size,
        });
    }

    let mut records = Vec::with_capacity(header.data_count);

    for (index, window) in payload
        .chunks_exact(header.data_size)
        .take(header.data_count)
        .enumerate()
    {
        let raw = parse_prefix::<R::Raw>(window).ok_or(Error::Eof {
            context: "record",
            offset: index * header.data_size,
        })?;
        records.push(R::decode(raw, index, diagnostics));
    }

    if records.len() != header.data_count {
        return Err(Error::Eof {
            context: "record",
            offset: payload.len(),
        });
    }

    Ok(records)
}
