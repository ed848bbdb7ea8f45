//! Byte-level addressing of component values.
//!
//! A component's values live in a buffer, which is a window into a raw block.
//! The pack info says where the first value sits and how values are spaced:
//! `group_size` values back to back, then `gap_size` bytes belonging to
//! someone else, repeating. This module turns that description into file
//! offsets, and rewrites buffer layouts between the continuous and the
//! interlaced arrangement.

use crate::model::{Buffer, BufferAlignment, Component, EntityId, PackInfo};
use crate::{Error, Result};

/// Where the requested values of one component are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset of the first requested value.
    pub file_offset: u64,
    pub value_count: u64,
    pub value_size: u64,
    /// Distance between consecutive values; equals `value_size` when the
    /// values form a single contiguous run.
    pub row_size: u64,
}

impl ByteRange {
    pub fn is_contiguous(&self) -> bool {
        self.row_size == self.value_size
    }

    /// Bytes from the first requested value to the end of the last one.
    pub fn byte_length(&self) -> u64 {
        match self.value_count {
            0 => 0,
            n => (n - 1) * self.row_size + self.value_size,
        }
    }

    /// Offset of the `i`-th requested value.
    pub fn value_offset(&self, i: u64) -> u64 {
        self.file_offset + i * self.row_size
    }
}

/// Bytes from the start of one group of values to the start of the next.
pub fn row_size(pack: &PackInfo) -> u64 {
    pack.group_size.max(1) * pack.value_size as u64 + pack.gap_size
}

/// Offset of value `i` relative to the first value.
pub fn value_position(pack: &PackInfo, i: u64) -> u64 {
    let size = pack.value_size as u64;
    if pack.is_contiguous() {
        return i * size;
    }
    let group = pack.group_size.max(1);
    (i / group) * row_size(pack) + (i % group) * size
}

/// Number of values the buffer holds under the pack info's layout.
///
/// Gapped layouts count whole rows; a trailing partial row adds one more
/// group when it holds at least a complete group of values.
pub fn max_value_count(pack: &PackInfo, buffer: &Buffer) -> Result<u64> {
    let size = pack.value_size as u64;
    if size == 0 {
        return Err(Error::InvalidArgument("pack info has value size 0".into()));
    }
    let available = buffer
        .consumed_bytes
        .saturating_sub(buffer.offset)
        .saturating_sub(pack.offset);
    if pack.is_contiguous() {
        return Ok(available / size);
    }
    let group = pack.group_size.max(1);
    let row = row_size(pack);
    let mut rows = available / row;
    if available % row >= group * size {
        rows += 1;
    }
    Ok(rows * group)
}

/// Locate `length` values starting at `start` (`length == 0` means up to the
/// end) of a buffer whose raw block payload begins at `raw_block_offset`.
pub fn byte_range_for(
    pack: &PackInfo,
    buffer: &Buffer,
    raw_block_offset: u64,
    start: u64,
    length: u64,
) -> Result<ByteRange> {
    if buffer.is_ring_buffer() {
        return Err(Error::UnsupportedFeature(format!(
            "ring buffer with offset {}",
            buffer.offset
        )));
    }
    if pack.mask != 0 {
        return Err(Error::UnsupportedFeature(format!(
            "masked values (mask {:#x})",
            pack.mask
        )));
    }
    if pack.group_size > 1 && !pack.is_contiguous() {
        return Err(Error::UnsupportedFeature(format!(
            "groups of {} values separated by {} byte gaps",
            pack.group_size, pack.gap_size
        )));
    }

    let max = max_value_count(pack, buffer)?;
    let end = start
        .checked_add(length)
        .filter(|end| *end <= max && start <= max)
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "values {start}..{} requested but only {max} are stored",
                start.saturating_add(length)
            ))
        })?;
    let value_count = if length == 0 { max - start } else { end - start };

    let file_offset = [
        buffer.raw_block_offset,
        buffer.offset,
        pack.offset,
        value_position(pack, start),
    ]
    .into_iter()
    .try_fold(raw_block_offset, u64::checked_add)
    .ok_or_else(|| Error::InvalidArgument("value offset exceeds the file size limit".into()))?;

    Ok(ByteRange {
        file_offset,
        value_count,
        value_size: pack.value_size as u64,
        row_size: row_size(pack),
    })
}

/// Rewrite the single buffer of each component so that together they fill
/// one raw block in the given arrangement. Returns the raw block length.
///
/// Value counts are taken from the current layout, so realigning preserves
/// every component's logical length.
pub(crate) fn align_components(
    components: &mut [&mut Component],
    mode: BufferAlignment,
    raw_block: EntityId,
) -> Result<u64> {
    let mut counts = Vec::with_capacity(components.len());
    for component in components.iter() {
        let [buffer] = component.buffer_info.buffers.as_slice() else {
            return Err(Error::UnsupportedFeature(format!(
                "aligning component {} with {} buffers",
                component.id,
                component.buffer_info.buffers.len()
            )));
        };
        counts.push(max_value_count(&component.pack_info, buffer)?);
    }

    let total = match mode {
        BufferAlignment::Continuous => {
            let mut cursor = 0;
            for (component, count) in components.iter_mut().zip(&counts) {
                let bytes = count * component.pack_info.value_size as u64;
                let buffer_id = place(component, raw_block, cursor, bytes);
                let pack = &mut component.pack_info;
                pack.offset = 0;
                pack.group_size = 1;
                pack.gap_size = 0;
                pack.buffers = vec![buffer_id];
                cursor += bytes;
            }
            cursor
        }
        BufferAlignment::Interlaced => {
            let count = counts.first().copied().unwrap_or(0);
            if counts.iter().any(|c| *c != count) {
                return Err(Error::InvalidArgument(format!(
                    "interlaced alignment needs equal value counts, found {counts:?}"
                )));
            }
            let stride: u64 = components
                .iter()
                .map(|c| c.pack_info.value_size as u64)
                .sum();
            let mut column = 0;
            for component in components.iter_mut() {
                let size = component.pack_info.value_size as u64;
                let buffer_id = place(component, raw_block, 0, count * stride);
                let pack = &mut component.pack_info;
                pack.offset = column;
                pack.group_size = 1;
                pack.gap_size = stride - size;
                pack.buffers = vec![buffer_id];
                column += size;
            }
            count * stride
        }
    };
    Ok(total)
}

fn place(
    component: &mut Component,
    raw_block: EntityId,
    raw_block_offset: u64,
    length: u64,
) -> EntityId {
    let buffer = &mut component.buffer_info.buffers[0];
    buffer.raw_block = Some(raw_block);
    buffer.raw_block_offset = raw_block_offset;
    buffer.length = length;
    buffer.consumed_bytes = length;
    buffer.offset = 0;
    buffer.id
}
