//! Raw sample containers (`CS`).

use super::EntityId;
use super::types::CompressionType;
use crate::keys::{KeyReader, KeyType, KeyWriter, Placeholder, Token};
use crate::writer::FamosWrite;
use crate::Result;
use std::io::{BufRead, Seek};

/// An opaque byte region holding the samples of one or more buffers.
///
/// The payload is never held in memory. A parsed raw block remembers where
/// its bytes start in the file; a block being written reserves its region and
/// the data callback fills it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawBlock {
    pub id: EntityId,
    pub index: u32,
    pub compression: CompressionType,
    /// Payload length in bytes.
    pub length: u64,
    /// Absolute offset of the payload in the file it was read from.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub file_offset: Option<u64>,
}

impl Default for RawBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl RawBlock {
    pub fn new() -> Self {
        Self {
            id: EntityId::new(),
            index: 0,
            compression: CompressionType::Uncompressed,
            length: 0,
            file_offset: None,
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::RawBlock, &[1, 2], |r, body| {
            let index = r.read_u32()?;
            let compression = if body.version == 2 {
                CompressionType::from_code(r.read_u32()?)
            } else {
                CompressionType::Uncompressed
            };
            let file_offset = r.position();
            // The payload runs up to the closing ';' and may contain anything.
            let length = (body.end() - 1).saturating_sub(file_offset);
            r.skip_bytes(length)?;
            log::debug!("raw block {index}: {length} bytes at {file_offset}");
            Ok(RawBlock {
                id: EntityId::new(),
                index,
                compression,
                length,
                file_offset: Some(file_offset),
            })
        })
    }

    /// Write the key with a zeroed payload region and return that region.
    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<Placeholder> {
        match self.compression {
            CompressionType::Uncompressed => w.write_key_with_placeholder(
                KeyType::RawBlock,
                1,
                &[Token::UInt(self.index as u64)],
                self.length,
            ),
            compression => w.write_key_with_placeholder(
                KeyType::RawBlock,
                2,
                &[
                    Token::UInt(self.index as u64),
                    Token::UInt(compression.code() as u64),
                ],
                self.length,
            ),
        }
    }
}
