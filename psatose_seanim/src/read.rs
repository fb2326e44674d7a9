use glam::{Quat, Vec3};
use zerocopy::{
    byteorder::{F32, LE, U16, U32},
    FromBytes, FromZeroes, Ref, Unaligned,
};

use crate::{
    AnimationFlags, AnimationType, BoneTrack, DataPresence, DataProperties, Error, IndexWidth, Key,
    Notetrack, Result, SeAnim, SIGNATURE, VERSION,
};

#[derive(Debug, Clone, Copy, FromZeroes, FromBytes, Unaligned)]
#[repr(C)]
struct RawHeader {
    signature: [u8; 6],
    version: U16<LE>,
    header_size: U16<LE>,
    animation_type: u8,
    flags: u8,
    data_presence: u8,
    data_properties: u8,
    reserved_1: [u8; 2],
    frame_rate: F32<LE>,
    frame_count: U32<LE>,
    bone_count: U32<LE>,
    modifier_count: u8,
    reserved_2: [u8; 3],
    notetrack_count: U32<LE>,
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(Error::Corrupted(context));
        }
        let (taken, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(taken)
    }

    fn u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.take(1, context)?[0])
    }

    fn index(&mut self, width: IndexWidth, context: &'static str) -> Result<u32> {
        Ok(match width {
            IndexWidth::U8 => u32::from(self.u8(context)?),
            IndexWidth::U16 => {
                let bytes = self.take(2, context)?;
                u32::from(u16::from_le_bytes([bytes[0], bytes[1]]))
            }
            IndexWidth::U32 => {
                let bytes = self.take(4, context)?;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            }
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn float(&mut self, high_precision: bool, context: &'static str) -> Result<f32> {
        if high_precision {
            let mut value = [0; 8];
            value.copy_from_slice(self.take(8, context)?);
            Ok(f64::from_le_bytes(value) as f32)
        } else {
            let mut value = [0; 4];
            value.copy_from_slice(self.take(4, context)?);
            Ok(f32::from_le_bytes(value))
        }
    }

    fn vec3(&mut self, high_precision: bool, context: &'static str) -> Result<Vec3> {
        let x = self.float(high_precision, context)?;
        let y = self.float(high_precision, context)?;
        let z = self.float(high_precision, context)?;
        Ok(Vec3::new(x, y, z))
    }

    fn quat(&mut self, high_precision: bool, context: &'static str) -> Result<Quat> {
        let x = self.float(high_precision, context)?;
        let y = self.float(high_precision, context)?;
        let z = self.float(high_precision, context)?;
        let w = self.float(high_precision, context)?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    fn str(&mut self, context: &'static str) -> Result<String> {
        let len = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::Corrupted(context))?;
        let bytes = self.take(len + 1, context)?;
        Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
    }

    fn keys<T>(
        &mut self,
        frame_width: IndexWidth,
        mut value: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<Key<T>>> {
        let count = self.index(frame_width, "eof reading key count")?;
        // each key takes at least one byte, don't trust the count for the allocation
        let mut keys = Vec::with_capacity((count as usize).min(self.bytes.len()));

        for _ in 0..count {
            let frame = self.index(frame_width, "eof reading key frame")?;
            keys.push(Key {
                frame,
                value: value(self)?,
            });
        }

        Ok(keys)
    }
}

impl SeAnim {
    /// Parses an animation from a byte slice.
    ///
    /// Custom data blocks are not kept.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the signature or version is wrong or the data is truncated.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (header, rest) = Ref::<_, RawHeader>::new_unaligned_from_prefix(bytes)
            .ok_or(Error::Corrupted("eof reading header"))?;

        if &header.signature != SIGNATURE {
            return Err(Error::InvalidSignature);
        }
        let version = header.version.get();
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let animation_type = AnimationType::from_u8(header.animation_type)
            .ok_or(Error::Corrupted("invalid animation type"))?;
        let presence = DataPresence::from_bits_truncate(header.data_presence);
        let high_precision = DataProperties::from_bits_truncate(header.data_properties)
            .contains(DataProperties::HIGH_PRECISION);

        let frame_width = IndexWidth::for_count(header.frame_count.get());
        let bone_count = header.bone_count.get();
        let bone_width = IndexWidth::for_count(bone_count);

        let mut anim = Self {
            animation_type,
            flags: AnimationFlags::from_bits_truncate(header.flags),
            frame_rate: header.frame_rate.get(),
            high_precision,
            ..Self::default()
        };

        let mut reader = Reader { bytes: rest };

        for index in 0..bone_count as usize {
            let name = reader.str("eof reading bone name")?;
            if anim.bone_indices.insert(name.clone(), index).is_some() {
                return Err(Error::Corrupted("duplicate bone name"));
            }
            anim.bones.push(BoneTrack {
                name,
                ..BoneTrack::default()
            });
        }

        for _ in 0..header.modifier_count {
            let index = reader.index(bone_width, "eof reading modifier")? as usize;
            let animation_type = AnimationType::from_u8(reader.u8("eof reading modifier")?)
                .ok_or(Error::Corrupted("invalid modifier animation type"))?;

            if index >= anim.bones.len() {
                return Err(Error::Corrupted("modifier bone index out of range"));
            }
            anim.modifiers.push((index, animation_type));
        }

        for bone in &mut anim.bones {
            let _flags = reader.u8("eof reading bone flags")?;

            if presence.contains(DataPresence::BONE_LOCATION) {
                bone.translations = reader.keys(frame_width, |r| {
                    r.vec3(high_precision, "eof reading translation")
                })?;
            }
            if presence.contains(DataPresence::BONE_ROTATION) {
                bone.rotations = reader.keys(frame_width, |r| {
                    r.quat(high_precision, "eof reading rotation")
                })?;
            }
            if presence.contains(DataPresence::BONE_SCALE) {
                bone.scales =
                    reader.keys(frame_width, |r| r.vec3(high_precision, "eof reading scale"))?;
            }
        }

        if presence.contains(DataPresence::NOTETRACKS) {
            for _ in 0..header.notetrack_count.get() {
                let frame = reader.index(frame_width, "eof reading notetrack frame")?;
                let name = reader.str("eof reading notetrack name")?;
                anim.notetracks.push(Notetrack { frame, name });
            }
        }

        Ok(anim)
    }
}
