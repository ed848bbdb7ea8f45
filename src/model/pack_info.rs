//! How a component's values are laid out inside its buffers (`CP`).

use super::EntityId;
use super::types::{DataType, decode_code};
use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::Result;
use std::io::{BufRead, Seek};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackInfo {
    /// Matches [`Buffer::reference`](super::Buffer::reference) of the buffers
    /// holding this component's values.
    pub buffer_reference: u32,
    /// Bytes per value.
    pub value_size: u32,
    pub data_type: DataType,
    pub significant_bits: u32,
    /// Bit mask for sub-byte values; nonzero masks cannot be read.
    pub mask: u64,
    /// Offset of the first value within the buffer.
    pub offset: u64,
    /// Values stored back to back before a gap.
    pub group_size: u64,
    /// Bytes skipped after each group.
    pub gap_size: u64,
    /// Resolved buffers, in buffer order.
    pub buffers: Vec<EntityId>,
}

impl PackInfo {
    /// A contiguous layout for `data_type` values.
    pub fn new(data_type: DataType) -> Self {
        let value_size = data_type.natural_width().unwrap_or(1);
        Self {
            buffer_reference: 0,
            value_size,
            data_type,
            significant_bits: value_size * 8,
            mask: 0,
            offset: 0,
            group_size: 1,
            gap_size: 0,
            buffers: Vec::new(),
        }
    }

    /// Values are stored end to end.
    pub fn is_contiguous(&self) -> bool {
        self.gap_size == 0
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::PackInfo, &[1], |r, _| {
            let buffer_reference = r.read_u32()?;
            let value_size = r.read_u32()?;
            let position = r.position();
            let data_type = decode_code(position, "data type", r.read_u32()?, DataType::from_code)?;
            Ok(PackInfo {
                buffer_reference,
                value_size,
                data_type,
                significant_bits: r.read_u32()?,
                mask: r.read_u64()?,
                offset: r.read_u64()?,
                group_size: r.read_u64()?,
                gap_size: r.read_u64()?,
                buffers: Vec::new(),
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::PackInfo,
            1,
            &[
                Token::UInt(self.buffer_reference as u64),
                Token::UInt(self.value_size as u64),
                Token::UInt(self.data_type.code() as u64),
                Token::UInt(self.significant_bits as u64),
                Token::UInt(self.mask),
                Token::UInt(self.offset),
                Token::UInt(self.group_size),
                Token::UInt(self.gap_size),
            ],
        )?;
        Ok(())
    }
}
