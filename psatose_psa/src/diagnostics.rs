use thiserror::Error;

use crate::ChunkKind;

/// A recoverable problem found while reading a psa file.
/// Parsing continues past these, they are collected on the [`Psa`](crate::Psa).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("unknown chunk `{id}` at offset {offset:#x}, skipped {skipped} bytes")]
    UnknownChunk {
        id: String,
        offset: usize,
        skipped: usize,
    },
    #[error("duplicate {kind} chunk at offset {offset:#x} replaces the earlier one")]
    DuplicateChunk { kind: ChunkKind, offset: usize },
    #[error("{kind} record size is {actual} bytes, expected {expected}")]
    RecordSizeMismatch {
        kind: ChunkKind,
        expected: usize,
        actual: usize,
    },
    #[error("{kind} record {index}: {field} contains non-ascii bytes")]
    NonAsciiName {
        kind: ChunkKind,
        index: usize,
        field: &'static str,
    },
}
