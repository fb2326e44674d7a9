//! Builders for synthetic psa files used in tests.

use byteorder::{WriteBytesExt, LE};

/// Size of a bone record as written by the Unreal exporters.
pub const BONE_RECORD_SIZE: usize = 120;
pub const ANIM_INFO_RECORD_SIZE: usize = 168;
pub const KEY_RECORD_SIZE: usize = 32;

fn write_fixed_str(bytes: &mut Vec<u8>, value: &str, width: usize) {
    let mut field = vec![0; width];
    let len = value.len().min(width);
    field[..len].copy_from_slice(&value.as_bytes()[..len]);
    bytes.extend_from_slice(&field);
}

fn write_f32s(bytes: &mut Vec<u8>, values: &[f32]) {
    for &value in values {
        bytes.write_f32::<LE>(value).unwrap();
    }
}

/// Pads or truncates an encoded record to `record_size`.
fn sized(mut bytes: Vec<u8>, record_size: usize) -> Vec<u8> {
    bytes.resize(record_size, 0);
    bytes
}

#[derive(Debug, Clone)]
pub struct BoneSpec {
    pub name: String,
    pub flags: i32,
    pub children_count: i32,
    pub parent_index: i32,
    pub rotation: [f32; 4],
    pub position: [f32; 3],
}

impl BoneSpec {
    pub fn new(name: &str, parent_index: i32) -> Self {
        Self {
            name: name.to_owned(),
            flags: 0,
            children_count: 0,
            parent_index,
            rotation: [0.0, 0.0, 0.0, 1.0],
            position: [0.0; 3],
        }
    }

    #[must_use]
    pub fn rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn encode(&self, record_size: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(record_size);
        write_fixed_str(&mut bytes, &self.name, 64);
        bytes.write_i32::<LE>(self.flags).unwrap();
        bytes.write_i32::<LE>(self.children_count).unwrap();
        bytes.write_i32::<LE>(self.parent_index).unwrap();
        write_f32s(&mut bytes, &self.rotation);
        write_f32s(&mut bytes, &self.position);
        sized(bytes, record_size)
    }
}

#[derive(Debug, Clone)]
pub struct AnimInfoSpec {
    pub name: String,
    pub group: String,
    pub bone_count: i32,
    pub root_include: i32,
    pub compression_flags: i32,
    pub key_quotum: i32,
    pub key_reduction: f32,
    pub track_time: f32,
    pub animation_rate: f32,
    pub start_bone: i32,
    pub first_raw_frame: i32,
    pub raw_frame_count: i32,
}

impl AnimInfoSpec {
    /// An animation over bones `0..bone_count` with `raw_frame_count` frames at 30 fps.
    pub fn new(name: &str, bone_count: i32, raw_frame_count: i32) -> Self {
        Self {
            name: name.to_owned(),
            group: "None".to_owned(),
            bone_count,
            root_include: 0,
            compression_flags: 0,
            key_quotum: bone_count * raw_frame_count,
            key_reduction: 1.0,
            track_time: raw_frame_count as f32,
            animation_rate: 30.0,
            start_bone: 0,
            first_raw_frame: 0,
            raw_frame_count,
        }
    }

    #[must_use]
    pub fn group(mut self, group: &str) -> Self {
        self.group = group.to_owned();
        self
    }

    #[must_use]
    pub fn start_bone(mut self, start_bone: i32) -> Self {
        self.start_bone = start_bone;
        self
    }

    #[must_use]
    pub fn animation_rate(mut self, animation_rate: f32) -> Self {
        self.animation_rate = animation_rate;
        self
    }

    pub fn encode(&self, record_size: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(record_size);
        write_fixed_str(&mut bytes, &self.name, 64);
        write_fixed_str(&mut bytes, &self.group, 64);
        bytes.write_i32::<LE>(self.bone_count).unwrap();
        bytes.write_i32::<LE>(self.root_include).unwrap();
        bytes.write_i32::<LE>(self.compression_flags).unwrap();
        bytes.write_i32::<LE>(self.key_quotum).unwrap();
        write_f32s(
            &mut bytes,
            &[self.key_reduction, self.track_time, self.animation_rate],
        );
        bytes.write_i32::<LE>(self.start_bone).unwrap();
        bytes.write_i32::<LE>(self.first_raw_frame).unwrap();
        bytes.write_i32::<LE>(self.raw_frame_count).unwrap();
        sized(bytes, record_size)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub time: f32,
}

impl KeySpec {
    pub fn new(position: [f32; 3], rotation: [f32; 4]) -> Self {
        Self {
            position,
            rotation,
            time: 1.0,
        }
    }

    #[must_use]
    pub fn time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    pub fn encode(&self, record_size: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(record_size);
        write_f32s(&mut bytes, &self.position);
        write_f32s(&mut bytes, &self.rotation);
        write_f32s(&mut bytes, &[self.time]);
        sized(bytes, record_size)
    }
}

/// Assembles a psa byte stream chunk by chunk.
#[derive(Debug, Clone, Default)]
pub struct PsaBuilder {
    bytes: Vec<u8>,
}

impl PsaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw chunk. `payload` is written as is, regardless of the declared sizes.
    #[must_use]
    pub fn chunk(
        mut self,
        id: &str,
        type_flag: i32,
        data_size: i32,
        data_count: i32,
        payload: &[u8],
    ) -> Self {
        write_fixed_str(&mut self.bytes, id, 20);
        self.bytes.write_i32::<LE>(type_flag).unwrap();
        self.bytes.write_i32::<LE>(data_size).unwrap();
        self.bytes.write_i32::<LE>(data_count).unwrap();
        self.bytes.extend_from_slice(payload);
        self
    }

    fn records(self, id: &str, record_size: usize, records: Vec<Vec<u8>>) -> Self {
        let count = i32::try_from(records.len()).unwrap();
        let size = i32::try_from(record_size).unwrap();
        let payload = records.concat();
        self.chunk(id, 1_999_801, size, count, &payload)
    }

    #[must_use]
    pub fn header(self) -> Self {
        self.chunk("ANIMHEAD", 1_999_801, 0, 0, &[])
    }

    #[must_use]
    pub fn bones(self, bones: &[BoneSpec]) -> Self {
        self.bones_sized(bones, BONE_RECORD_SIZE)
    }

    #[must_use]
    pub fn bones_sized(self, bones: &[BoneSpec], record_size: usize) -> Self {
        let records = bones.iter().map(|b| b.encode(record_size)).collect();
        self.records("BONENAMES", record_size, records)
    }

    #[must_use]
    pub fn anim_infos(self, infos: &[AnimInfoSpec]) -> Self {
        let records = infos
            .iter()
            .map(|i| i.encode(ANIM_INFO_RECORD_SIZE))
            .collect();
        self.records("ANIMINFO", ANIM_INFO_RECORD_SIZE, records)
    }

    #[must_use]
    pub fn anim_keys(self, keys: &[KeySpec]) -> Self {
        self.anim_keys_sized(keys, KEY_RECORD_SIZE)
    }

    #[must_use]
    pub fn anim_keys_sized(self, keys: &[KeySpec], record_size: usize) -> Self {
        let records = keys.iter().map(|k| k.encode(record_size)).collect();
        self.records("ANIMKEYS", record_size, records)
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}
