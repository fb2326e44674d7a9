use std::path::{Path, PathBuf};

use crate::{psa::AnimInfo, seanim::AnimationType};

const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Frame rate written to the output animations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FrameRate {
    /// The animation rate stored in the psa file, or 30 if it isn't a positive number.
    #[default]
    Source,
    Fixed(f32),
}

impl FrameRate {
    #[must_use]
    pub fn resolve(self, info: &AnimInfo) -> f32 {
        match self {
            Self::Source if info.animation_rate.is_finite() && info.animation_rate > 0.0 => {
                info.animation_rate
            }
            Self::Source => DEFAULT_FRAME_RATE,
            Self::Fixed(rate) => rate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    output_directory: Option<PathBuf>,
    frame_rate: FrameRate,
    strict_key_count: bool,
    animation_type: AnimationType,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_directory: None,
            frame_rate: FrameRate::default(),
            strict_key_count: true,
            animation_type: AnimationType::Relative,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory the animations are written to.
    /// Defaults to `exported_files` next to the input file.
    pub fn output_directory(&mut self, output_directory: impl Into<PathBuf>) {
        self.output_directory = Some(output_directory.into());
    }

    pub fn frame_rate(&mut self, frame_rate: FrameRate) {
        self.frame_rate = frame_rate;
    }

    /// If true, keys left over after the last animation are an error instead of a warning.
    pub fn strict_key_count(&mut self, strict_key_count: bool) {
        self.strict_key_count = strict_key_count;
    }

    pub fn animation_type(&mut self, animation_type: AnimationType) {
        self.animation_type = animation_type;
    }

    #[must_use]
    pub fn get_frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    #[must_use]
    pub fn is_strict_key_count(&self) -> bool {
        self.strict_key_count
    }

    #[must_use]
    pub fn get_animation_type(&self) -> AnimationType {
        self.animation_type
    }

    /// Resolves the output directory for an input file.
    #[must_use]
    pub fn output_directory_for(&self, input: &Path) -> PathBuf {
        if let Some(directory) = &self.output_directory {
            return directory.clone();
        }

        input
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("exported_files")
    }
}
