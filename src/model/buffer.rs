//! Buffer descriptions (`Cb`): where inside a raw block a component's bytes live.

use super::EntityId;
use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::{Error, Result};
use std::io::{BufRead, Seek};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Buffer {
    pub id: EntityId,
    /// Id shared with the owning component's pack info.
    pub reference: u32,
    /// 1-based index of the raw block; only meaningful at the stream boundary.
    pub raw_block_index: u32,
    /// Resolved raw block.
    pub raw_block: Option<EntityId>,
    /// Start of the buffer within the raw block.
    pub raw_block_offset: u64,
    pub length: u64,
    /// Logical start within the buffer. Nonzero means ring buffer.
    pub offset: u64,
    /// Bytes actually filled.
    pub consumed_bytes: u64,
    pub is_new_event: bool,
    pub x0: f64,
    pub trigger_add_time: f64,
    pub user_info: Vec<u8>,
}

impl Buffer {
    /// A buffer of `length` filled bytes, not yet placed in a raw block.
    pub fn new(length: u64) -> Self {
        Self {
            id: EntityId::new(),
            reference: 0,
            raw_block_index: 0,
            raw_block: None,
            raw_block_offset: 0,
            length,
            offset: 0,
            consumed_bytes: length,
            is_new_event: false,
            x0: 0.0,
            trigger_add_time: 0.0,
            user_info: Vec::new(),
        }
    }

    pub fn is_ring_buffer(&self) -> bool {
        self.offset > 0
    }
}

/// The buffers of one component.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferInfo {
    pub buffers: Vec<Buffer>,
}

impl BufferInfo {
    pub fn find(&self, id: EntityId) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.id == id)
    }

    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut Buffer> {
        self.buffers.iter_mut().find(|b| b.id == id)
    }

    /// Shared user info size, or an error if the buffers disagree.
    pub(crate) fn user_info_size(&self) -> Result<usize> {
        let size = self.buffers.first().map_or(0, |b| b.user_info.len());
        if self.buffers.iter().any(|b| b.user_info.len() != size) {
            return Err(Error::InvariantViolation(
                "buffers of one component have different user info sizes".into(),
            ));
        }
        Ok(size)
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::BufferInfo, &[1], |r, _| {
            let count = r.read_u32()?;
            let position = r.position();
            let user_info_size = usize::try_from(r.read_u64()?)
                .map_err(|_| Error::malformed(position, "user info size out of range"))?;
            let mut buffers = Vec::new();
            for _ in 0..count {
                buffers.push(Buffer {
                    id: EntityId::new(),
                    reference: r.read_u32()?,
                    raw_block_index: r.read_u32()?,
                    raw_block: None,
                    raw_block_offset: r.read_u64()?,
                    length: r.read_u64()?,
                    offset: r.read_u64()?,
                    consumed_bytes: r.read_u64()?,
                    is_new_event: r.read_bool()?,
                    x0: r.read_f64()?,
                    trigger_add_time: r.read_f64()?,
                    user_info: r.read_fixed_bytes(user_info_size)?,
                });
            }
            Ok(BufferInfo { buffers })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        let mut tokens = Vec::with_capacity(2 + self.buffers.len() * 10);
        tokens.push(Token::UInt(self.buffers.len() as u64));
        tokens.push(Token::UInt(self.user_info_size()? as u64));
        for buffer in &self.buffers {
            tokens.extend([
                Token::UInt(buffer.reference as u64),
                Token::UInt(buffer.raw_block_index as u64),
                Token::UInt(buffer.raw_block_offset),
                Token::UInt(buffer.length),
                Token::UInt(buffer.offset),
                Token::UInt(buffer.consumed_bytes),
                Token::Bool(buffer.is_new_event),
                Token::Real(buffer.x0),
                Token::Real(buffer.trigger_add_time),
                Token::Fixed(&buffer.user_info),
            ]);
        }
        w.write_key(KeyType::BufferInfo, 1, &tokens)?;
        Ok(())
    }
}
