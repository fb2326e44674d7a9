use glam::{Quat, Vec3};
use tracing::{debug, warn};

use crate::{
    psa::{AnimInfo, AnimKey, Bone, ChunkKind, Psa},
    Error, Result, Settings, Warning,
};

/// Receives the rebuilt animations, one at a time.
pub trait Sink {
    type Animation;

    fn create_animation(&mut self, info: &AnimInfo) -> Self::Animation;

    fn add_translation_key(
        &mut self,
        animation: &mut Self::Animation,
        bone: &Bone,
        frame: u32,
        value: Vec3,
    );

    fn add_rotation_key(
        &mut self,
        animation: &mut Self::Animation,
        bone: &Bone,
        frame: u32,
        value: Quat,
    );

    /// Finishes an animation. Called once per animation info, in file order.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the animation can't be written. This aborts the whole conversion.
    fn write(&mut self, animation: Self::Animation, info: &AnimInfo) -> Result<()>;
}

/// Position in the flat key stream.
///
/// The stream is shared by every animation in the file, so a single cursor
/// is carried from one animation to the next and never rewound.
#[derive(Debug, Clone)]
pub struct KeyCursor<'a> {
    keys: &'a [AnimKey],
    consumed: usize,
}

impl<'a> KeyCursor<'a> {
    #[must_use]
    pub fn new(keys: &'a [AnimKey]) -> Self {
        Self { keys, consumed: 0 }
    }

    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.keys.len() - self.consumed
    }
}

impl<'a> Iterator for KeyCursor<'a> {
    type Item = &'a AnimKey;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.get(self.consumed)?;
        self.consumed += 1;
        Some(key)
    }
}

/// Flips the vector part of quaternions with a negative `w`.
#[must_use]
pub fn normalize_rotation(rotation: Quat) -> Quat {
    if rotation.w < 0.0 {
        Quat::from_xyzw(-rotation.x, -rotation.y, -rotation.z, rotation.w)
    } else {
        rotation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Number of animations passed to [`Sink::write`].
    pub animations: usize,
    pub keys_consumed: usize,
    pub keys_available: usize,
    pub warnings: Vec<Warning>,
}

impl Report {
    #[must_use]
    pub fn all_keys_consumed(&self) -> bool {
        self.keys_consumed == self.keys_available
    }

    fn warn(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Converted(Report),
    /// A required chunk is absent or empty, nothing was passed to the sink.
    NoAnimationData { missing: Vec<ChunkKind> },
}

fn non_negative(info: &AnimInfo, field: &'static str, value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::NegativeField {
        animation: info.name.clone(),
        field,
        value,
    })
}

/// Checks every animation against the bone list and sums the keys they take.
fn required_keys(infos: &[AnimInfo], bones: &[Bone]) -> Result<usize> {
    let mut required = 0_usize;

    for info in infos {
        let start_bone = non_negative(info, "start bone", info.start_bone)?;
        let bone_count = non_negative(info, "bone count", info.bone_count)?;
        non_negative(info, "raw frame count", info.raw_frame_count)?;

        if start_bone < bone_count && bone_count > bones.len() {
            return Err(Error::BoneOutOfRange {
                animation: info.name.clone(),
                bone_count: info.bone_count,
                bones: bones.len(),
            });
        }

        required = required.saturating_add(info.key_count());
    }

    Ok(required)
}

/// Rebuilds the animations of a psa file and passes them to `sink`.
///
/// Keys are taken from the stream frame by frame, and within a frame bone by
/// bone over `start_bone..bone_count`. The key count is checked before the
/// sink sees anything, so a mismatching file produces no output at all.
///
/// # Errors
///
/// Returns `Err` if an animation info is invalid, the key count doesn't match
/// or the sink fails to write an animation.
pub fn transcode<S: Sink>(psa: &Psa, sink: &mut S, settings: &Settings) -> Result<Conversion> {
    let mut report = Report {
        animations: 0,
        keys_consumed: 0,
        keys_available: 0,
        warnings: Vec::new(),
    };

    for diagnostic in psa.diagnostics() {
        report.warn(Warning::Psa(diagnostic.clone()));
    }

    let missing = psa.missing_chunks();

    let (bones, infos, keys) = match (psa.bones(), psa.anim_infos(), psa.anim_keys()) {
        (Some(bones), Some(infos), Some(keys)) if missing.is_empty() => (bones, infos, keys),
        _ => return Ok(Conversion::NoAnimationData { missing }),
    };

    let required = required_keys(infos, bones)?;

    if required > keys.len() || (settings.is_strict_key_count() && required != keys.len()) {
        return Err(Error::KeyCountMismatch {
            expected: required,
            actual: keys.len(),
        });
    }

    let mut cursor = KeyCursor::new(keys);

    for info in infos {
        let mut animation = sink.create_animation(info);

        // both were validated as non-negative
        let start_bone = usize::try_from(info.start_bone).unwrap_or_default();
        let bone_count = usize::try_from(info.bone_count).unwrap_or_default();
        let frame_count = u32::try_from(info.raw_frame_count).unwrap_or_default();

        let animated_bones = bones.get(start_bone..bone_count).unwrap_or_default();

        if animated_bones.is_empty() {
            report.warn(Warning::EmptyBoneRange {
                animation: info.name.clone(),
                start_bone: info.start_bone,
                bone_count: info.bone_count,
            });
        }

        debug!(
            "animation `{}`: {} frames, {} bones, keys from {}",
            info.name,
            frame_count,
            animated_bones.len(),
            cursor.consumed()
        );

        for frame in 0..frame_count {
            for bone in animated_bones {
                let key = cursor.next().ok_or(Error::KeyCountMismatch {
                    expected: required,
                    actual: keys.len(),
                })?;

                sink.add_translation_key(&mut animation, bone, frame, key.position);
                sink.add_rotation_key(&mut animation, bone, frame, normalize_rotation(key.rotation));
            }
        }

        sink.write(animation, info)?;
        report.animations += 1;
    }

    if cursor.remaining() > 0 {
        report.warn(Warning::UnusedKeys {
            unused: cursor.remaining(),
        });
    }

    report.keys_consumed = cursor.consumed();
    report.keys_available = keys.len();

    Ok(Conversion::Converted(report))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use psatose_test_utils::{AnimInfoSpec, BoneSpec, KeySpec, PsaBuilder};

    use super::*;
    use crate::psa::Diagnostic;

    #[derive(Debug, Default)]
    struct Recorded {
        name: String,
        translations: Vec<(String, u32, Vec3)>,
        rotations: Vec<(String, u32, Quat)>,
    }

    #[derive(Debug, Default)]
    struct Recorder {
        written: Vec<Recorded>,
    }

    impl Sink for Recorder {
        type Animation = Recorded;

        fn create_animation(&mut self, info: &AnimInfo) -> Recorded {
            Recorded {
                name: info.name.clone(),
                ..Recorded::default()
            }
        }

        fn add_translation_key(&mut self, anim: &mut Recorded, bone: &Bone, frame: u32, value: Vec3) {
            anim.translations.push((bone.name.clone(), frame, value));
        }

        fn add_rotation_key(&mut self, anim: &mut Recorded, bone: &Bone, frame: u32, value: Quat) {
            anim.rotations.push((bone.name.clone(), frame, value));
        }

        fn write(&mut self, anim: Recorded, _info: &AnimInfo) -> Result<()> {
            self.written.push(anim);
            Ok(())
        }
    }

    fn key(x: f32) -> KeySpec {
        KeySpec::new([x, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0])
    }

    fn keys(count: usize) -> Vec<KeySpec> {
        (0..count).map(|i| key(i as f32)).collect()
    }

    fn bones(names: &[&str]) -> Vec<BoneSpec> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| BoneSpec::new(name, i32::try_from(i).unwrap() - 1))
            .collect()
    }

    fn psa(bone_names: &[&str], infos: &[AnimInfoSpec], keys: &[KeySpec]) -> Psa {
        let bytes = PsaBuilder::new()
            .header()
            .bones(&bones(bone_names))
            .anim_infos(infos)
            .anim_keys(keys)
            .build();
        Psa::parse(&bytes).unwrap()
    }

    fn run(psa: &Psa, settings: &Settings) -> (Result<Conversion>, Recorder) {
        let mut recorder = Recorder::default();
        let result = transcode(psa, &mut recorder, settings);
        (result, recorder)
    }

    fn converted(psa: &Psa) -> (Report, Recorder) {
        match run(psa, &Settings::default()) {
            (Ok(Conversion::Converted(report)), recorder) => (report, recorder),
            (other, _) => panic!("expected a conversion, got {other:?}"),
        }
    }

    fn x_values(translations: &[(String, u32, Vec3)]) -> Vec<f32> {
        translations.iter().map(|(_, _, v)| v.x).collect()
    }

    #[test]
    fn surplus_keys_fail_in_strict_mode() {
        let psa = psa(&["a", "b"], &[AnimInfoSpec::new("idle", 2, 2)], &keys(5));

        let (result, recorder) = run(&psa, &Settings::default());

        assert!(
            matches!(
                result,
                Err(Error::KeyCountMismatch {
                    expected: 4,
                    actual: 5
                })
            ),
            "{result:?}"
        );
        assert!(recorder.written.is_empty());
    }

    #[test]
    fn surplus_keys_warn_in_lenient_mode() {
        let psa = psa(&["a", "b"], &[AnimInfoSpec::new("idle", 2, 2)], &keys(5));
        let mut settings = Settings::default();
        settings.strict_key_count(false);

        let (result, recorder) = run(&psa, &settings);
        let report = match result {
            Ok(Conversion::Converted(report)) => report,
            other => panic!("{other:?}"),
        };

        assert_eq!(report.keys_consumed, 4);
        assert_eq!(report.keys_available, 5);
        assert!(!report.all_keys_consumed());
        assert_eq!(report.warnings, [Warning::UnusedKeys { unused: 1 }]);
        assert_eq!(recorder.written.len(), 1);
    }

    #[test]
    fn missing_keys_fail_even_when_lenient() {
        let psa = psa(&["a", "b"], &[AnimInfoSpec::new("idle", 2, 2)], &keys(3));
        let mut settings = Settings::default();
        settings.strict_key_count(false);

        let (result, recorder) = run(&psa, &settings);

        assert!(matches!(
            result,
            Err(Error::KeyCountMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(recorder.written.is_empty());
    }

    #[test]
    fn bone_order_decides_attribution() {
        let infos = [AnimInfoSpec::new("idle", 2, 1)];

        let (_, forward) = converted(&psa(&["a", "b"], &infos, &keys(2)));
        let (_, swapped) = converted(&psa(&["b", "a"], &infos, &keys(2)));

        let find = |recorder: &Recorder, bone: &str| {
            recorder.written[0]
                .translations
                .iter()
                .find(|(name, _, _)| name == bone)
                .map(|(_, _, v)| v.x)
        };

        assert_eq!(find(&forward, "a"), Some(0.0));
        assert_eq!(find(&forward, "b"), Some(1.0));
        assert_eq!(find(&swapped, "a"), Some(1.0));
        assert_eq!(find(&swapped, "b"), Some(0.0));
    }

    #[test]
    fn negative_w_flips_vector_part() {
        let flipped = normalize_rotation(Quat::from_xyzw(1.0, 2.0, 3.0, -0.5));
        assert_relative_eq!(flipped, Quat::from_xyzw(-1.0, -2.0, -3.0, -0.5));

        let positive = Quat::from_xyzw(1.0, 2.0, 3.0, 0.5);
        assert_relative_eq!(normalize_rotation(positive), positive);

        let zero = Quat::from_xyzw(0.0, 1.0, 0.0, 0.0);
        assert_relative_eq!(normalize_rotation(zero), zero);
    }

    #[test]
    fn rotations_are_normalized_in_output() {
        let keys = [
            KeySpec::new([0.0; 3], [1.0, 2.0, 3.0, -0.5]),
            KeySpec::new([0.0; 3], [1.0, 2.0, 3.0, 0.5]),
        ];
        let psa = psa(&["a"], &[AnimInfoSpec::new("idle", 1, 2)], &keys);

        let (_, recorder) = converted(&psa);
        let rotations = &recorder.written[0].rotations;

        assert_relative_eq!(rotations[0].2, Quat::from_xyzw(-1.0, -2.0, -3.0, -0.5));
        assert_relative_eq!(rotations[1].2, Quat::from_xyzw(1.0, 2.0, 3.0, 0.5));
    }

    #[test]
    fn frames_are_contiguous_over_the_bone_range() {
        let info = AnimInfoSpec::new("wave", 3, 3).start_bone(1);
        let psa = psa(&["root", "arm", "hand"], &[info], &keys(6));

        let (report, recorder) = converted(&psa);
        let anim = &recorder.written[0];

        let layout: Vec<_> = anim
            .translations
            .iter()
            .map(|(bone, frame, _)| (bone.as_str(), *frame))
            .collect();
        assert_eq!(
            layout,
            [
                ("arm", 0),
                ("hand", 0),
                ("arm", 1),
                ("hand", 1),
                ("arm", 2),
                ("hand", 2)
            ]
        );
        assert_eq!(anim.rotations.len(), 6);
        assert!(report.all_keys_consumed());
    }

    #[test]
    fn key_stream_continues_across_animations() {
        let infos = [
            AnimInfoSpec::new("a", 2, 2),
            AnimInfoSpec::new("b", 2, 1),
        ];
        let psa = psa(&["root", "spine"], &infos, &keys(6));

        let (report, recorder) = converted(&psa);

        assert_eq!(report.animations, 2);
        assert_eq!(recorder.written[0].name, "a");
        assert_eq!(x_values(&recorder.written[0].translations), [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(recorder.written[1].name, "b");
        assert_eq!(x_values(&recorder.written[1].translations), [4.0, 5.0]);
        assert_eq!(recorder.written[1].translations[0].1, 0);
        assert_eq!(report.keys_consumed, 6);
    }

    #[test]
    fn bones_only_is_no_animation_data() {
        let bytes = PsaBuilder::new().bones(&bones(&["root"])).build();
        let psa = Psa::parse(&bytes).unwrap();

        let (result, recorder) = run(&psa, &Settings::default());

        match result {
            Ok(Conversion::NoAnimationData { missing }) => {
                assert_eq!(missing, [ChunkKind::AnimInfos, ChunkKind::AnimKeys]);
            }
            other => panic!("{other:?}"),
        }
        assert!(recorder.written.is_empty());
    }

    #[test]
    fn empty_bone_range_still_writes_animation() {
        let infos = [
            AnimInfoSpec::new("empty", 2, 3).start_bone(2),
            AnimInfoSpec::new("full", 2, 1),
        ];
        let psa = psa(&["a", "b"], &infos, &keys(2));

        let (report, recorder) = converted(&psa);

        assert_eq!(recorder.written.len(), 2);
        assert!(recorder.written[0].translations.is_empty());
        assert_eq!(x_values(&recorder.written[1].translations), [0.0, 1.0]);
        assert_eq!(
            report.warnings,
            [Warning::EmptyBoneRange {
                animation: "empty".to_owned(),
                start_bone: 2,
                bone_count: 2,
            }]
        );
    }

    #[test]
    fn negative_frame_count_is_rejected() {
        let psa = psa(&["a"], &[AnimInfoSpec::new("broken", 1, -1)], &keys(1));

        let (result, recorder) = run(&psa, &Settings::default());

        assert!(
            matches!(
                &result,
                Err(Error::NegativeField {
                    field: "raw frame count",
                    value: -1,
                    ..
                })
            ),
            "{result:?}"
        );
        assert!(recorder.written.is_empty());
    }

    #[test]
    fn bone_range_past_bone_list_is_rejected() {
        let psa = psa(&["a", "b"], &[AnimInfoSpec::new("idle", 3, 1)], &keys(3));

        let (result, _) = run(&psa, &Settings::default());

        assert!(matches!(
            result,
            Err(Error::BoneOutOfRange {
                bone_count: 3,
                bones: 2,
                ..
            })
        ));
    }

    #[test]
    fn psa_diagnostics_become_warnings() {
        let bytes = PsaBuilder::new()
            .bones(&bones(&["a"]))
            .chunk("EXTRA", 0, 4, 1, &[0; 4])
            .anim_infos(&[AnimInfoSpec::new("idle", 1, 1)])
            .anim_keys(&keys(1))
            .build();
        let psa = Psa::parse(&bytes).unwrap();

        let (report, _) = converted(&psa);

        assert!(matches!(
            report.warnings.as_slice(),
            [Warning::Psa(Diagnostic::UnknownChunk { .. })]
        ));
    }
}
