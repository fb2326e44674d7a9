use std::{
    fmt::{self, Display},
    mem::size_of,
};

use byteorder::LE;
use zerocopy::{FromBytes, FromZeroes, Unaligned, I32};

use crate::{
    binary_utils::{null_terminated_prefix, parse},
    Error, Result,
};

#[derive(Debug, FromZeroes, FromBytes, Unaligned)]
#[repr(C)]
struct RawChunkHeader {
    chunk_id: [u8; 20],
    type_flag: I32<LE>,
    data_size: I32<LE>,
    data_count: I32<LE>,
}

pub const CHUNK_HEADER_SIZE: usize = size_of::<RawChunkHeader>();

/// The chunk kinds this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// The file header chunk. Carries no records.
    Header,
    Bones,
    AnimInfos,
    AnimKeys,
}

impl ChunkKind {
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "ANIMHEAD" => Some(Self::Header),
            "BONENAMES" => Some(Self::Bones),
            "ANIMINFO" => Some(Self::AnimInfos),
            "ANIMKEYS" => Some(Self::AnimKeys),
            _ => None,
        }
    }

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Header => "ANIMHEAD",
            Self::Bones => "BONENAMES",
            Self::AnimInfos => "ANIMINFO",
            Self::AnimKeys => "ANIMKEYS",
        }
    }
}

impl Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    pub chunk_id: String,
    /// Format version written by the exporter. Not interpreted.
    pub type_flag: i32,
    /// Size of a single record in bytes.
    pub data_size: usize,
    pub data_count: usize,
}

impl ChunkHeader {
    fn parse(bytes: &mut &[u8], offset: usize) -> Result<Self> {
        let raw: &RawChunkHeader = parse(bytes).ok_or(Error::Eof {
            context: "chunk header",
            offset,
        })?;

        let chunk_id = String::from_utf8_lossy(null_terminated_prefix(&raw.chunk_id)).into_owned();

        let data_size = raw
            .data_size
            .get()
            .try_into()
            .map_err(|_| Error::Corrupted {
                chunk: chunk_id.clone(),
                error: "data size is negative",
            })?;
        let data_count = raw
            .data_count
            .get()
            .try_into()
            .map_err(|_| Error::Corrupted {
                chunk: chunk_id.clone(),
                error: "data count is negative",
            })?;

        Ok(Self {
            chunk_id,
            type_flag: raw.type_flag.get(),
            data_size,
            data_count,
        })
    }

    #[must_use]
    pub fn kind(&self) -> Option<ChunkKind> {
        ChunkKind::from_id(&self.chunk_id)
    }

    /// Total payload length, `None` if it overflows.
    #[must_use]
    pub fn payload_len(&self) -> Option<usize> {
        self.data_size.checked_mul(self.data_count)
    }
}

/// A framed chunk: its header, the offset of the header and the payload bytes following it.
#[derive(Debug, Clone)]
pub struct Chunk<'a> {
    pub header: ChunkHeader,
    pub offset: usize,
    pub payload: &'a [u8],
}

/// Walks a psa byte stream chunk by chunk.
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct ChunkScanner<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> ChunkScanner<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            failed: false,
        }
    }

    /// Offset of the next chunk header.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn next_chunk(&mut self) -> Result<Chunk<'a>> {
        let offset = self.offset;
        let header = ChunkHeader::parse(&mut self.bytes, offset)?;

        let payload_len = header.payload_len().ok_or_else(|| Error::Corrupted {
            chunk: header.chunk_id.clone(),
            error: "payload size overflows",
        })?;

        if payload_len > self.bytes.len() {
            return Err(Error::Eof {
                context: "chunk payload",
                offset: offset + CHUNK_HEADER_SIZE + self.bytes.len(),
            });
        }

        let (payload, remaining) = self.bytes.split_at(payload_len);
        self.bytes = remaining;
        self.offset = offset + CHUNK_HEADER_SIZE + payload_len;

        Ok(Chunk {
            header,
            offset,
            payload,
        })
    }
}

impl<'a> Iterator for ChunkScanner<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.bytes.is_empty() {
            return None;
        }

        let result = self.next_chunk();
        self.failed = result.is_err();
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use psatose_test_utils::PsaBuilder;

    use super::*;

    #[test]
    fn header_is_32_bytes() {
        assert_eq!(CHUNK_HEADER_SIZE, 32);
    }

    #[test]
    fn scans_chunks_in_order() {
        let bytes = PsaBuilder::new()
            .header()
            .chunk("BONENAMES", 0, 4, 2, &[0; 8])
            .chunk("ANIMKEYS", 0, 2, 3, &[0; 6])
            .build();

        let chunks: Vec<_> = ChunkScanner::new(&bytes).map(Result::unwrap).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].header.kind(), Some(ChunkKind::Header));
        assert_eq!(chunks[1].header.chunk_id, "BONENAMES");
        assert_eq!(chunks[1].offset, 32);
        assert_eq!(chunks[1].payload.len(), 8);
        assert_eq!(chunks[2].header.kind(), Some(ChunkKind::AnimKeys));
        assert_eq!(chunks[2].offset, 32 + 32 + 8);
        assert_eq!(chunks[2].header.data_size, 2);
        assert_eq!(chunks[2].header.data_count, 3);
    }

    #[test]
    fn chunk_ids_are_case_sensitive() {
        assert_eq!(ChunkKind::from_id("animkeys"), None);
        assert_eq!(ChunkKind::from_id("ANIMKEYS"), Some(ChunkKind::AnimKeys));
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut bytes = PsaBuilder::new().header().build();
        bytes.extend_from_slice(b"BONENAMES");

        let mut scanner = ChunkScanner::new(&bytes);
        assert!(scanner.next().unwrap().is_ok());

        let err = scanner.next().unwrap().unwrap_err();
        assert!(
            matches!(
                err,
                Error::Eof {
                    context: "chunk header",
                    offset: 32
                }
            ),
            "{err:?}"
        );
        assert!(scanner.next().is_none());
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut bytes = PsaBuilder::new().chunk("ANIMKEYS", 0, 32, 2, &[0; 64]).build();
        bytes.truncate(bytes.len() - 1);

        let err = ChunkScanner::new(&bytes).next().unwrap().unwrap_err();
        assert!(
            matches!(
                err,
                Error::Eof {
                    context: "chunk payload",
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn negative_count_is_corrupted() {
        let bytes = PsaBuilder::new().chunk("ANIMKEYS", 0, 32, -1, &[]).build();

        let err = ChunkScanner::new(&bytes).next().unwrap().unwrap_err();
        assert!(matches!(err, Error::Corrupted { .. }), "{err:?}");
    }

    #[test]
    fn empty_input_has_no_chunks() {
        assert!(ChunkScanner::new(&[]).next().is_none());
    }
}
