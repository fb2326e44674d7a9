#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! Conversion of Unreal PSA animations into SEAnim files.
//!
//! [`transcode`] rebuilds per-bone keyframes from the flat psa key stream and
//! feeds them into any [`Sink`]. [`convert_file`] wires it up with a
//! [`SeAnimSink`] that writes one `.seanim` file per animation.

mod convert;
mod settings;
mod transcode;

pub use psatose_psa as psa;
pub use psatose_seanim as seanim;

pub use convert::{convert_file, convert_files, output_file_name, SeAnimSink};
pub use settings::{FrameRate, Settings};
pub use transcode::{normalize_rotation, transcode, Conversion, KeyCursor, Report, Sink};

use std::{io, path::PathBuf, result};

use thiserror::Error;

use psa::Diagnostic;

#[derive(Debug, Error)]
pub enum Error {
    #[error("psa error: {0}")]
    Psa(#[from] psa::Error),
    #[error("seanim error: {0}")]
    SeAnim(#[from] seanim::Error),
    #[error("key count mismatch: animations need {expected} keys, file has {actual}")]
    KeyCountMismatch { expected: usize, actual: usize },
    #[error("animation `{animation}` animates {bone_count} bones but the file has {bones}")]
    BoneOutOfRange {
        animation: String,
        bone_count: i32,
        bones: usize,
    },
    #[error("animation `{animation}` has a negative {field} ({value})")]
    NegativeField {
        animation: String,
        field: &'static str,
        value: i32,
    },
    #[error("io error accessing `{path}`: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

pub type Result<T> = result::Result<T, Error>;

/// A problem that doesn't stop the conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("{0}")]
    Psa(Diagnostic),
    #[error(
        "animation `{animation}` has an empty bone range ({start_bone}..{bone_count}), writing it without keys"
    )]
    EmptyBoneRange {
        animation: String,
        start_bone: i32,
        bone_count: i32,
    },
    #[error("{unused} keys at the end of the file belong to no animation")]
    UnusedKeys { unused: usize },
}
