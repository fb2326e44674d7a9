use std::io::Write;

use byteorder::{WriteBytesExt, LE};
use glam::{Quat, Vec3};

use crate::{
    DataPresence, DataProperties, Error, IndexWidth, Key, Result, SeAnim, HEADER_SIZE, SIGNATURE,
    VERSION,
};

impl IndexWidth {
    fn write<W: Write>(self, writer: &mut W, value: u32, what: &'static str) -> Result<()> {
        match self {
            Self::U8 => writer.write_u8(u8::try_from(value).map_err(|_| Error::TooLarge(what))?)?,
            Self::U16 => {
                writer.write_u16::<LE>(u16::try_from(value).map_err(|_| Error::TooLarge(what))?)?;
            }
            Self::U32 => writer.write_u32::<LE>(value)?,
        }
        Ok(())
    }
}

trait KeyValue {
    fn write<W: Write>(&self, writer: &mut W, high_precision: bool) -> Result<()>;
}

fn write_floats<W: Write>(writer: &mut W, values: &[f32], high_precision: bool) -> Result<()> {
    for &value in values {
        if high_precision {
            writer.write_f64::<LE>(f64::from(value))?;
        } else {
            writer.write_f32::<LE>(value)?;
        }
    }
    Ok(())
}

impl KeyValue for Vec3 {
    fn write<W: Write>(&self, writer: &mut W, high_precision: bool) -> Result<()> {
        write_floats(writer, &[self.x, self.y, self.z], high_precision)
    }
}

impl KeyValue for Quat {
    fn write<W: Write>(&self, writer: &mut W, high_precision: bool) -> Result<()> {
        write_floats(writer, &[self.x, self.y, self.z, self.w], high_precision)
    }
}

fn write_keys<W: Write, T: KeyValue>(
    writer: &mut W,
    keys: &[Key<T>],
    frame_width: IndexWidth,
    high_precision: bool,
) -> Result<()> {
    let count = u32::try_from(keys.len()).map_err(|_| Error::TooLarge("key count"))?;
    frame_width.write(writer, count, "key count")?;

    for key in keys {
        frame_width.write(writer, key.frame, "frame")?;
        key.value.write(writer, high_precision)?;
    }

    Ok(())
}

fn write_str<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    if value.as_bytes().contains(&0) {
        return Err(Error::InvalidName(value.to_owned()));
    }
    writer.write_all(value.as_bytes())?;
    writer.write_u8(0)?;
    Ok(())
}

impl SeAnim {
    /// Serializes the animation.
    ///
    /// # Errors
    ///
    /// Returns `Err` if writing fails, a name contains a nul byte
    /// or a count exceeds what the format can store.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let frame_count = self.frame_count();
        let bone_count =
            u32::try_from(self.bones.len()).map_err(|_| Error::TooLarge("bone count"))?;
        let modifier_count =
            u8::try_from(self.modifiers.len()).map_err(|_| Error::TooLarge("modifier count"))?;
        let notetrack_count = u32::try_from(self.notetracks.len())
            .map_err(|_| Error::TooLarge("notetrack count"))?;

        let presence = self.data_presence();
        let properties = if self.high_precision {
            DataProperties::HIGH_PRECISION
        } else {
            DataProperties::empty()
        };

        let frame_width = IndexWidth::for_count(frame_count);
        let bone_width = IndexWidth::for_count(bone_count);

        writer.write_all(SIGNATURE)?;
        writer.write_u16::<LE>(VERSION)?;
        writer.write_u16::<LE>(HEADER_SIZE)?;
        writer.write_u8(self.animation_type as u8)?;
        writer.write_u8(self.flags.bits())?;
        writer.write_u8(presence.bits())?;
        writer.write_u8(properties.bits())?;
        writer.write_all(&[0; 2])?;
        writer.write_f32::<LE>(self.frame_rate)?;
        writer.write_u32::<LE>(frame_count)?;
        writer.write_u32::<LE>(bone_count)?;
        writer.write_u8(modifier_count)?;
        writer.write_all(&[0; 3])?;
        writer.write_u32::<LE>(notetrack_count)?;

        for bone in &self.bones {
            write_str(writer, &bone.name)?;
        }

        for &(index, animation_type) in &self.modifiers {
            let index = u32::try_from(index).map_err(|_| Error::TooLarge("bone index"))?;
            bone_width.write(writer, index, "bone index")?;
            writer.write_u8(animation_type as u8)?;
        }

        for bone in &self.bones {
            // bone flags, reserved
            writer.write_u8(0)?;

            if presence.contains(DataPresence::BONE_LOCATION) {
                write_keys(writer, &bone.translations, frame_width, self.high_precision)?;
            }
            if presence.contains(DataPresence::BONE_ROTATION) {
                write_keys(writer, &bone.rotations, frame_width, self.high_precision)?;
            }
            if presence.contains(DataPresence::BONE_SCALE) {
                write_keys(writer, &bone.scales, frame_width, self.high_precision)?;
            }
        }

        for notetrack in &self.notetracks {
            frame_width.write(writer, notetrack.frame, "notetrack frame")?;
            write_str(writer, &notetrack.name)?;
        }

        Ok(())
    }

    /// Serializes the animation into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the animation can't be represented, see [`SeAnim::write`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_animation_is_header_only() {
        let bytes = SeAnim::new(30.0).to_bytes().unwrap();

        assert_eq!(bytes.len(), 36);
        assert_eq!(&bytes[0..6], b"SEAnim");
        assert_eq!(&bytes[6..8], &[1, 0]);
        assert_eq!(&bytes[8..10], &[0x1C, 0]);
        // relative, no flags, no data
        assert_eq!(&bytes[10..14], &[2, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &30.0_f32.to_le_bytes());
        assert_eq!(&bytes[20..28], &[0; 8]);
    }

    #[test]
    fn writes_small_frame_indices_as_bytes() {
        let mut anim = SeAnim::new(30.0);
        anim.add_translation_key("root", 0, Vec3::new(1.0, 2.0, 3.0));
        anim.add_rotation_key("root", 0, Quat::from_xyzw(0.0, 0.0, 0.0, 1.0));
        anim.add_translation_key("root", 1, Vec3::new(4.0, 5.0, 6.0));
        anim.add_rotation_key("root", 1, Quat::from_xyzw(0.0, 0.0, 0.0, 1.0));

        let bytes = anim.to_bytes().unwrap();

        // location | rotation
        assert_eq!(bytes[12], 0b11);
        assert_eq!(&bytes[20..24], &2_u32.to_le_bytes());
        assert_eq!(&bytes[24..28], &1_u32.to_le_bytes());
        assert_eq!(&bytes[36..41], b"root\0");

        let body = &bytes[41..];
        // flags, key count, frame 0, three floats
        assert_eq!(body[0], 0);
        assert_eq!(body[1], 2);
        assert_eq!(body[2], 0);
        assert_eq!(&body[3..7], &1.0_f32.to_le_bytes());
        // second key
        assert_eq!(body[15], 1);
        // header + name + flags + 2 * (count + 2 * (frame + vec3 / quat))
        assert_eq!(bytes.len(), 36 + 5 + 1 + (1 + 2 * 13) + (1 + 2 * 17));
    }

    #[test]
    fn large_frame_counts_widen_indices() {
        let mut anim = SeAnim::new(30.0);
        anim.add_translation_key("root", 300, Vec3::ZERO);

        let bytes = anim.to_bytes().unwrap();

        assert_eq!(&bytes[20..24], &301_u32.to_le_bytes());
        let body = &bytes[36 + 5..];
        // flags, u16 key count, u16 frame
        assert_eq!(&body[1..3], &1_u16.to_le_bytes());
        assert_eq!(&body[3..5], &300_u16.to_le_bytes());
    }

    #[test]
    fn nul_in_bone_name_is_rejected() {
        let mut anim = SeAnim::new(30.0);
        anim.add_translation_key("ro\0ot", 0, Vec3::ZERO);

        assert!(matches!(anim.to_bytes(), Err(Error::InvalidName(_))));
    }

    #[test]
    fn high_precision_writes_doubles() {
        let mut anim = SeAnim::new(30.0);
        anim.high_precision = true;
        anim.add_translation_key("root", 0, Vec3::new(1.5, 0.0, 0.0));

        let bytes = anim.to_bytes().unwrap();

        assert_eq!(bytes[13], 1);
        let body = &bytes[36 + 5..];
        assert_eq!(&body[3..11], &1.5_f64.to_le_bytes());
    }
}
