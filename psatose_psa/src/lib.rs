#![warn(clippy::all, clippy::pedantic)]
//! Reader for Unreal PSA animation files.
//!
//! A psa file is a sequence of chunks, each a 32 byte header followed by
//! `data_count` fixed size records. The bone list, the animation infos and
//! one flat key stream covering every animation are decoded here; turning the
//! key stream back into per-bone tracks is left to the caller.

mod binary_utils;
mod chunk;
mod diagnostics;
mod records;


pub use chunk::{Chunk, ChunkHeader, ChunkKind, ChunkScanner, CHUNK_HEADER_SIZE};
pub use diagnostics::Diagnostic;
pub use records::{AnimInfo, AnimKey, Bone};

use std::{fs, io, path::Path, result};

use thiserror::Error;
use tracing::debug;

use records::decode_block;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("psa truncated: eof reading {context} at offset {offset:#x}")]
    Eof {
        context: &'static str,
        offset: usize,
    },
    #[error("psa chunk `{chunk}` corrupted: {error}")]
    Corrupted { chunk: String, error: &'static str },
}

pub type Result<T> = result::Result<T, Error>;

/// The decoded contents of a psa file.
///
/// Each block is `None` if its chunk never appeared in the file.
#[derive(Debug, Clone, Default)]
pub struct Psa {
    bones: Option<Vec<Bone>>,
    anim_infos: Option<Vec<AnimInfo>>,
    anim_keys: Option<Vec<AnimKey>>,
    diagnostics: Vec<Diagnostic>,
}

impl Psa {
    /// Reads and parses a psa file.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file can't be read or is not a valid psa file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Parses a psa file from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a chunk header or payload is truncated,
    /// or a chunk holds records that can't be decoded.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut psa = Self::default();

        for chunk in ChunkScanner::new(bytes) {
            let Chunk {
                header,
                offset,
                payload,
            } = chunk?;

            debug!(
                "chunk `{}` at {:#x}: {} records of {} bytes",
                header.chunk_id, offset, header.data_count, header.data_size
            );

            let kind = if let Some(kind) = header.kind() {
                kind
            } else {
                psa.diagnostics.push(Diagnostic::UnknownChunk {
                    id: header.chunk_id,
                    offset,
                    skipped: payload.len(),
                });
                continue;
            };

            let diagnostics = &mut psa.diagnostics;

            match kind {
                ChunkKind::Header => {}
                ChunkKind::Bones => {
                    let bones = decode_block(&header, payload, diagnostics)?;
                    store(&mut psa.bones, bones, kind, offset, diagnostics);
                }
                ChunkKind::AnimInfos => {
                    let anim_infos = decode_block(&header, payload, diagnostics)?;
                    store(&mut psa.anim_infos, anim_infos, kind, offset, diagnostics);
                }
                ChunkKind::AnimKeys => {
                    let anim_keys = decode_block(&header, payload, diagnostics)?;
                    store(&mut psa.anim_keys, anim_keys, kind, offset, diagnostics);
                }
            }
        }

        Ok(psa)
    }

    #[must_use]
    pub fn bones(&self) -> Option<&[Bone]> {
        self.bones.as_deref()
    }

    #[must_use]
    pub fn anim_infos(&self) -> Option<&[AnimInfo]> {
        self.anim_infos.as_deref()
    }

    #[must_use]
    pub fn anim_keys(&self) -> Option<&[AnimKey]> {
        self.anim_keys.as_deref()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns the record chunks that are absent or hold no records.
    #[must_use]
    pub fn missing_chunks(&self) -> Vec<ChunkKind> {
        let mut missing = Vec::new();

        if self.bones().map_or(true, <[_]>::is_empty) {
            missing.push(ChunkKind::Bones);
        }
        if self.anim_infos().map_or(true, <[_]>::is_empty) {
            missing.push(ChunkKind::AnimInfos);
        }
        if self.anim_keys().map_or(true, <[_]>::is_empty) {
            missing.push(ChunkKind::AnimKeys);
        }

        missing
    }
}

fn store<T>(
    slot: &mut Option<Vec<T>>,
    records: Vec<T>,
    kind: ChunkKind,
    offset: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if slot.replace(records).is_some() {
        diagnostics.push(Diagnostic::DuplicateChunk { kind, offset });
    }
}
