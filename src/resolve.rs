//! Conversion between wire indices and entity references.
//!
//! The key stream describes a tree through integer indices: group index on
//! texts, single values and channels, raw block index on buffers, buffer
//! reference on pack infos, event list index on event references. After a
//! load those indices are turned into [`EntityId`] links; before a save the
//! links are turned back into freshly numbered indices. In between, the links
//! are authoritative.

use crate::model::{EntityId, FamosHeader};
use crate::{Error, Result};
use std::collections::HashMap;

/// Sort a positionally indexed collection and require `index == position + 1`.
fn check_positions<T>(items: &mut [T], what: &str, index: impl Fn(&T) -> u32) -> Result<()> {
    items.sort_by_key(|item| index(item));
    for (position, item) in items.iter().enumerate() {
        let expected = position as u32 + 1;
        if index(item) != expected {
            return Err(Error::InvariantViolation(format!(
                "{what} index {} found where {expected} was expected",
                index(item)
            )));
        }
    }
    Ok(())
}

/// Resolve indices into references right after parsing.
pub(crate) fn after_load(header: &mut FamosHeader) -> Result<()> {
    check_positions(&mut header.groups, "group", |g| g.index)?;
    check_positions(&mut header.raw_blocks, "raw block", |b| b.index)?;
    for field in &mut header.fields {
        check_positions(&mut field.event_infos, "event list", |e| e.index)?;
        for info in &mut field.event_infos {
            check_positions(&mut info.events, "event", |e| e.index)?;
        }
    }

    let group_positions: HashMap<u32, usize> = header
        .groups
        .iter()
        .enumerate()
        .map(|(position, group)| (group.index, position))
        .collect();
    let group_of = |index: u32, what: &str, name: &str| -> Result<Option<usize>> {
        if index == 0 {
            return Ok(None);
        }
        group_positions.get(&index).copied().map(Some).ok_or_else(|| {
            Error::DanglingReference(format!("{what} {name:?} refers to missing group {index}"))
        })
    };

    for text in std::mem::take(&mut header.texts) {
        match group_of(text.group_index, "text", &text.name)? {
            Some(position) => header.groups[position].texts.push(text),
            None => header.texts.push(text),
        }
    }
    for value in std::mem::take(&mut header.single_values) {
        match group_of(value.group_index, "single value", &value.name)? {
            Some(position) => header.groups[position].single_values.push(value),
            None => header.single_values.push(value),
        }
    }

    let raw_blocks: HashMap<u32, EntityId> =
        header.raw_blocks.iter().map(|b| (b.index, b.id)).collect();

    for field in &mut header.fields {
        let event_infos: HashMap<u32, EntityId> =
            field.event_infos.iter().map(|e| (e.index, e.id)).collect();

        for component in &mut field.components {
            for channel in &component.channels {
                match group_of(channel.group_index, "channel", &channel.name)? {
                    Some(position) => header.groups[position].channels.push(channel.id),
                    None => header.channels.push(channel.id),
                }
            }

            for buffer in &mut component.buffer_info.buffers {
                let id = raw_blocks.get(&buffer.raw_block_index).ok_or_else(|| {
                    Error::DanglingReference(format!(
                        "buffer refers to missing raw block {}",
                        buffer.raw_block_index
                    ))
                })?;
                buffer.raw_block = Some(*id);
            }

            let reference = component.pack_info.buffer_reference;
            component.pack_info.buffers = component
                .buffer_info
                .buffers
                .iter()
                .filter(|b| b.reference == reference)
                .map(|b| b.id)
                .collect();

            if let Some(event_reference) = &mut component.event_reference {
                let index = event_reference.event_info_index;
                let id = event_infos.get(&index).ok_or_else(|| {
                    Error::DanglingReference(format!(
                        "event reference refers to missing event list {index}"
                    ))
                })?;
                event_reference.event_info = Some(*id);
            }
        }
    }
    Ok(())
}

/// Renumber indices from the current references right before writing.
pub(crate) fn before_save(header: &mut FamosHeader) -> Result<()> {
    for (position, group) in header.groups.iter_mut().enumerate() {
        group.index = position as u32 + 1;
        for text in &mut group.texts {
            text.group_index = group.index;
        }
        for value in &mut group.single_values {
            value.group_index = group.index;
        }
    }
    for text in &mut header.texts {
        text.group_index = 0;
    }
    for value in &mut header.single_values {
        value.group_index = 0;
    }
    for (position, block) in header.raw_blocks.iter_mut().enumerate() {
        block.index = position as u32 + 1;
    }

    let channel_groups: HashMap<EntityId, u32> = header
        .groups
        .iter()
        .flat_map(|g| g.channels.iter().map(move |id| (*id, g.index)))
        .collect();
    let raw_blocks: HashMap<EntityId, u32> =
        header.raw_blocks.iter().map(|b| (b.id, b.index)).collect();

    let mut next_buffer_reference = 1;
    for field in &mut header.fields {
        for (position, info) in field.event_infos.iter_mut().enumerate() {
            info.index = position as u32 + 1;
            for (event_position, event) in info.events.iter_mut().enumerate() {
                event.index = event_position as u32 + 1;
            }
        }
        let event_infos: HashMap<EntityId, u32> =
            field.event_infos.iter().map(|e| (e.id, e.index)).collect();

        for component in &mut field.components {
            for channel in &mut component.channels {
                channel.group_index = channel_groups.get(&channel.id).copied().unwrap_or(0);
            }

            let reference = next_buffer_reference;
            next_buffer_reference += 1;
            component.pack_info.buffer_reference = reference;
            for buffer in &mut component.buffer_info.buffers {
                buffer.reference = if component.pack_info.buffers.contains(&buffer.id) {
                    reference
                } else {
                    0
                };
                let raw_block = buffer.raw_block.ok_or_else(|| {
                    Error::DanglingReference(format!("buffer {} has no raw block", buffer.id))
                })?;
                buffer.raw_block_index = *raw_blocks.get(&raw_block).ok_or_else(|| {
                    Error::DanglingReference(format!(
                        "buffer {} refers to raw block {raw_block} outside the header",
                        buffer.id
                    ))
                })?;
            }

            if let Some(event_reference) = &mut component.event_reference {
                let id = event_reference.event_info.ok_or_else(|| {
                    Error::DanglingReference("unresolved event reference".into())
                })?;
                event_reference.event_info_index = *event_infos.get(&id).ok_or_else(|| {
                    Error::DanglingReference(format!(
                        "event reference to {id} outside its field"
                    ))
                })?;
            }
        }
    }
    Ok(())
}
