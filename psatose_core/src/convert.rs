use std::{
    fs,
    path::{Path, PathBuf},
};

use glam::{Quat, Vec3};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    psa::{AnimInfo, Bone, Psa},
    seanim::{self, AnimationType, SeAnim},
    transcode, Conversion, Error, FrameRate, Result, Settings, Sink,
};

/// Returns the file name an animation is written to.
///
/// Characters that aren't allowed in file names on common platforms are replaced with `_`.
#[must_use]
pub fn output_file_name(animation_name: &str) -> String {
    let mut name: String = animation_name
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        name = "unnamed".to_owned();
    }

    name.push_str(".seanim");
    name
}

/// Writes every animation into its own `.seanim` file in a directory.
///
/// The directory is created when the first animation is written.
#[derive(Debug)]
pub struct SeAnimSink {
    output_directory: PathBuf,
    frame_rate: FrameRate,
    animation_type: AnimationType,
    directory_created: bool,
    written: Vec<PathBuf>,
}

impl SeAnimSink {
    pub fn new(output_directory: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            output_directory: output_directory.into(),
            frame_rate: settings.get_frame_rate(),
            animation_type: settings.get_animation_type(),
            directory_created: false,
            written: Vec::new(),
        }
    }

    /// Paths of the files written so far.
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Sink for SeAnimSink {
    type Animation = SeAnim;

    fn create_animation(&mut self, info: &AnimInfo) -> SeAnim {
        let mut animation = SeAnim::new(self.frame_rate.resolve(info));
        animation.animation_type = self.animation_type;
        animation
    }

    fn add_translation_key(&mut self, animation: &mut SeAnim, bone: &Bone, frame: u32, value: Vec3) {
        animation.add_translation_key(&bone.name, frame, value);
    }

    fn add_rotation_key(&mut self, animation: &mut SeAnim, bone: &Bone, frame: u32, value: Quat) {
        animation.add_rotation_key(&bone.name, frame, value);
    }

    fn write(&mut self, animation: SeAnim, info: &AnimInfo) -> Result<()> {
        if !self.directory_created {
            fs::create_dir_all(&self.output_directory).map_err(|error| Error::Io {
                path: self.output_directory.clone(),
                error,
            })?;
            self.directory_created = true;
        }

        let path = self.output_directory.join(output_file_name(&info.name));

        if self.written.contains(&path) {
            warn!(
                "animation `{}` overwrites `{}` written earlier",
                info.name,
                path.display()
            );
        }

        animation.save(&path).map_err(|error| match error {
            seanim::Error::Io(error) => Error::Io {
                path: path.clone(),
                error,
            },
            error => error.into(),
        })?;

        info!("Wrote: {}", path.display());
        self.written.push(path);

        Ok(())
    }
}

/// Converts a psa file into `.seanim` files, one per animation.
///
/// # Errors
///
/// Returns `Err` if the file can't be read or parsed, an animation is invalid
/// or an output file can't be written. Animations written before the error are kept.
pub fn convert_file(path: &Path, settings: &Settings) -> Result<Conversion> {
    let bytes = fs::read(path).map_err(|error| Error::Io {
        path: path.to_path_buf(),
        error,
    })?;
    let psa = Psa::parse(&bytes)?;

    let mut sink = SeAnimSink::new(settings.output_directory_for(path), settings);
    let conversion = transcode(&psa, &mut sink, settings)?;

    if let Conversion::NoAnimationData { missing } = &conversion {
        warn!("Input file contained no valid animation data!");
        for kind in missing {
            warn!("missing or empty {} chunk in `{}`", kind, path.display());
        }
    }

    Ok(conversion)
}

/// Converts several psa files in parallel. Results are in the order of `paths`.
pub fn convert_files<P>(paths: &[P], settings: &Settings) -> Vec<Result<Conversion>>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| convert_file(path.as_ref(), settings))
        .collect()
}
