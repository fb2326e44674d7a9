#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! In-memory SEAnim animations and their binary (version 1) representation.

mod read;
mod write;

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
    result,
};

use bitflags::bitflags;
use glam::{Quat, Vec3};
use thiserror::Error;

pub const SIGNATURE: &[u8; 6] = b"SEAnim";
pub const VERSION: u16 = 1;
pub const HEADER_SIZE: u16 = 0x1C;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("not a seanim file: invalid signature")]
    InvalidSignature,
    #[error("unsupported seanim version {0}")]
    UnsupportedVersion(u16),
    #[error("seanim corrupted: {0}")]
    Corrupted(&'static str),
    #[error("name `{0}` contains a nul byte")]
    InvalidName(String),
    #[error("{0} does not fit in the seanim format")]
    TooLarge(&'static str),
}

pub type Result<T> = result::Result<T, Error>;

/// How the keys of an animation are applied to the rest pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AnimationType {
    Absolute = 0,
    Additive = 1,
    #[default]
    Relative = 2,
    Delta = 3,
}

impl AnimationType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Absolute),
            1 => Some(Self::Additive),
            2 => Some(Self::Relative),
            3 => Some(Self::Delta),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AnimationFlags: u8 {
        const LOOPED = 1 << 0;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct DataPresence: u8 {
        const BONE_LOCATION = 1 << 0;
        const BONE_ROTATION = 1 << 1;
        const BONE_SCALE = 1 << 2;
        const NOTETRACKS = 1 << 6;
        const CUSTOM = 1 << 7;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct DataProperties: u8 {
        const HIGH_PRECISION = 1 << 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key<T> {
    pub frame: u32,
    pub value: T,
}

/// All keys of a single bone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoneTrack {
    pub name: String,
    pub translations: Vec<Key<Vec3>>,
    pub rotations: Vec<Key<Quat>>,
    pub scales: Vec<Key<Vec3>>,
}

impl BoneTrack {
    fn last_frame(&self) -> Option<u32> {
        let translations = self.translations.iter().map(|k| k.frame);
        let rotations = self.rotations.iter().map(|k| k.frame);
        let scales = self.scales.iter().map(|k| k.frame);

        translations.chain(rotations).chain(scales).max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notetrack {
    pub frame: u32,
    pub name: String,
}

/// A SEAnim animation.
///
/// Bones are stored in the order their first key was added.
#[derive(Debug, Clone, PartialEq)]
pub struct SeAnim {
    pub animation_type: AnimationType,
    pub flags: AnimationFlags,
    pub frame_rate: f32,
    /// Write key values as `f64` instead of `f32`.
    pub high_precision: bool,
    bones: Vec<BoneTrack>,
    bone_indices: HashMap<String, usize>,
    modifiers: Vec<(usize, AnimationType)>,
    notetracks: Vec<Notetrack>,
}

impl Default for SeAnim {
    fn default() -> Self {
        Self {
            animation_type: AnimationType::default(),
            flags: AnimationFlags::empty(),
            frame_rate: 30.0,
            high_precision: false,
            bones: Vec::new(),
            bone_indices: HashMap::new(),
            modifiers: Vec::new(),
            notetracks: Vec::new(),
        }
    }
}

impl SeAnim {
    #[must_use]
    pub fn new(frame_rate: f32) -> Self {
        Self {
            frame_rate,
            ..Self::default()
        }
    }

    fn bone_index(&mut self, bone: &str) -> usize {
        if let Some(&index) = self.bone_indices.get(bone) {
            return index;
        }

        let index = self.bones.len();
        self.bones.push(BoneTrack {
            name: bone.to_owned(),
            ..BoneTrack::default()
        });
        self.bone_indices.insert(bone.to_owned(), index);
        index
    }

    fn bone_mut(&mut self, bone: &str) -> &mut BoneTrack {
        let index = self.bone_index(bone);
        &mut self.bones[index]
    }

    pub fn add_translation_key(&mut self, bone: &str, frame: u32, value: Vec3) {
        self.bone_mut(bone).translations.push(Key { frame, value });
    }

    pub fn add_rotation_key(&mut self, bone: &str, frame: u32, value: Quat) {
        self.bone_mut(bone).rotations.push(Key { frame, value });
    }

    pub fn add_scale_key(&mut self, bone: &str, frame: u32, value: Vec3) {
        self.bone_mut(bone).scales.push(Key { frame, value });
    }

    pub fn add_notetrack(&mut self, frame: u32, name: &str) {
        self.notetracks.push(Notetrack {
            frame,
            name: name.to_owned(),
        });
    }

    /// Overrides the animation type of a single bone.
    pub fn set_modifier(&mut self, bone: &str, animation_type: AnimationType) {
        let index = self.bone_index(bone);

        if let Some(modifier) = self.modifiers.iter_mut().find(|(i, _)| *i == index) {
            modifier.1 = animation_type;
        } else {
            self.modifiers.push((index, animation_type));
        }
    }

    #[must_use]
    pub fn bones(&self) -> &[BoneTrack] {
        &self.bones
    }

    #[must_use]
    pub fn bone(&self, name: &str) -> Option<&BoneTrack> {
        self.bone_indices.get(name).map(|&i| &self.bones[i])
    }

    #[must_use]
    pub fn modifier(&self, bone: &str) -> Option<AnimationType> {
        let index = *self.bone_indices.get(bone)?;
        self.modifiers
            .iter()
            .find(|(i, _)| *i == index)
            .map(|&(_, ty)| ty)
    }

    #[must_use]
    pub fn notetracks(&self) -> &[Notetrack] {
        &self.notetracks
    }

    /// One past the highest keyed frame, zero for an animation without keys.
    #[must_use]
    pub fn frame_count(&self) -> u32 {
        let bones = self.bones.iter().filter_map(BoneTrack::last_frame);
        let notetracks = self.notetracks.iter().map(|n| n.frame);

        bones.chain(notetracks).max().map_or(0, |f| f.saturating_add(1))
    }

    fn data_presence(&self) -> DataPresence {
        let mut presence = DataPresence::empty();

        for bone in &self.bones {
            if !bone.translations.is_empty() {
                presence |= DataPresence::BONE_LOCATION;
            }
            if !bone.rotations.is_empty() {
                presence |= DataPresence::BONE_ROTATION;
            }
            if !bone.scales.is_empty() {
                presence |= DataPresence::BONE_SCALE;
            }
        }

        if !self.notetracks.is_empty() {
            presence |= DataPresence::NOTETRACKS;
        }

        presence
    }

    /// Writes the animation to a file, replacing it if it exists.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file can't be written or the animation can't be represented.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads an animation from a file.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file can't be read or is not a valid seanim file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }
}

/// Width of frame numbers, key counts and bone indices, chosen by the largest value they must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    pub(crate) fn for_count(count: u32) -> Self {
        if count <= 0xFF {
            Self::U8
        } else if count <= 0xFFFF {
            Self::U16
        } else {
            Self::U32
        }
    }
}
