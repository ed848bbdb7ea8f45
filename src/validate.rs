//! Whole-document invariant checks.
//!
//! Run after every load and before every save. The first violation found
//! aborts with [`Error::InvariantViolation`].

use crate::model::{Component, ComponentKind, EntityId, FamosHeader, Field};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Largest number of lines a digital component can carry.
const MAX_DIGITAL_CHANNELS: usize = 16;

fn violation(message: impl Into<String>) -> Error {
    Error::InvariantViolation(message.into())
}

/// Tracks ids that must occur at most once.
struct Seen<'a> {
    what: &'a str,
    ids: HashSet<EntityId>,
}

impl<'a> Seen<'a> {
    fn new(what: &'a str) -> Self {
        Self {
            what,
            ids: HashSet::new(),
        }
    }

    fn insert(&mut self, id: EntityId, name: &str) -> Result<()> {
        if !self.ids.insert(id) {
            return Err(violation(format!(
                "{} {name:?} ({id}) is added more than once",
                self.what
            )));
        }
        Ok(())
    }
}

impl FamosHeader {
    /// Check every structural invariant of the document.
    pub fn validate(&self) -> Result<()> {
        self.validate_identities()?;
        self.validate_channel_membership()?;

        let raw_blocks: HashMap<EntityId, u64> =
            self.raw_blocks.iter().map(|b| (b.id, b.length)).collect();
        for (position, field) in self.fields.iter().enumerate() {
            validate_field(position, field, &raw_blocks)?;
        }
        Ok(())
    }

    fn validate_identities(&self) -> Result<()> {
        let mut groups = Seen::new("group");
        for group in &self.groups {
            groups.insert(group.id, &group.name)?;
        }

        let mut keys = HashSet::new();
        for key in &self.custom_keys {
            if !keys.insert(key.key.as_str()) {
                return Err(violation(format!("custom key {:?} is not unique", key.key)));
            }
        }

        let mut texts = Seen::new("text");
        let mut values = Seen::new("single value");
        for group in &self.groups {
            for text in &group.texts {
                texts.insert(text.id, &text.name)?;
            }
            for value in &group.single_values {
                values.insert(value.id, &value.name)?;
            }
        }
        for text in &self.texts {
            texts.insert(text.id, &text.name)?;
        }
        for value in &self.single_values {
            values.insert(value.id, &value.name)?;
        }

        let mut raw_blocks = Seen::new("raw block");
        for block in &self.raw_blocks {
            raw_blocks.insert(block.id, "")?;
        }

        let mut components = Seen::new("component");
        let mut buffers = Seen::new("buffer");
        let mut event_infos = Seen::new("event list");
        for field in &self.fields {
            for info in &field.event_infos {
                event_infos.insert(info.id, "")?;
            }
            for component in &field.components {
                components.insert(component.id, "")?;
                for buffer in &component.buffer_info.buffers {
                    buffers.insert(buffer.id, "")?;
                }
            }
        }
        Ok(())
    }

    /// Every channel is owned by exactly one component and listed by exactly
    /// one of: a single group, the top-level list.
    fn validate_channel_membership(&self) -> Result<()> {
        let mut owned = Seen::new("channel");
        let mut names = HashMap::new();
        for channel in self.components().flat_map(|c| c.channels.iter()) {
            owned.insert(channel.id, &channel.name)?;
            names.insert(channel.id, channel.name.as_str());
        }

        let mut listed = HashSet::new();
        let lists = self
            .groups
            .iter()
            .map(|g| (g.name.as_str(), &g.channels))
            .chain(std::iter::once(("<top level>", &self.channels)));
        for (owner, ids) in lists {
            for id in ids {
                let Some(name) = names.get(id) else {
                    return Err(violation(format!(
                        "{owner} lists channel {id}, which no component owns"
                    )));
                };
                if !listed.insert(*id) {
                    return Err(violation(format!(
                        "channel {name:?} is listed by more than one owner"
                    )));
                }
            }
        }
        if let Some((_, name)) = names.iter().find(|(id, _)| !listed.contains(*id)) {
            return Err(violation(format!(
                "channel {name:?} belongs to neither a group nor the top level"
            )));
        }
        Ok(())
    }
}

fn validate_field(
    position: usize,
    field: &Field,
    raw_blocks: &HashMap<EntityId, u64>,
) -> Result<()> {
    if let Some(message) = field.component_rule_error() {
        return Err(violation(format!("field {}: {message}", position + 1)));
    }
    let mut previous: Option<&Component> = None;
    for component in &field.components {
        validate_component(component, raw_blocks)
            .map_err(|e| in_field(e, position, component))?;
        if let Some(previous) = previous {
            inherited_scaling(previous, component)
                .map_err(|e| in_field(e, position, component))?;
        }
        if let Some(reference) = &component.event_reference {
            let known = reference
                .event_info
                .is_some_and(|id| field.event_infos.iter().any(|e| e.id == id));
            if !known {
                return Err(in_field(
                    violation("event reference does not point into its field"),
                    position,
                    component,
                ));
            }
        }
        previous = Some(component);
    }
    Ok(())
}

fn in_field(error: Error, position: usize, component: &Component) -> Error {
    match error {
        Error::InvariantViolation(message) => violation(format!(
            "field {}, component {}: {message}",
            position + 1,
            component.id
        )),
        other => other,
    }
}

/// Scaling keys are sticky on the wire; a component cannot drop one its
/// predecessor set.
fn inherited_scaling(previous: &Component, component: &Component) -> Result<()> {
    if previous.x_scaling.is_some() && component.x_scaling.is_none() {
        return Err(violation("x-axis scaling dropped after a previous component set it"));
    }
    if previous.z_scaling.is_some() && component.z_scaling.is_none() {
        return Err(violation("z-axis scaling dropped after a previous component set it"));
    }
    if previous.trigger_time.is_some() && component.trigger_time.is_none() {
        return Err(violation("trigger time dropped after a previous component set it"));
    }
    Ok(())
}

fn validate_component(component: &Component, raw_blocks: &HashMap<EntityId, u64>) -> Result<()> {
    match &component.kind {
        ComponentKind::Analog { calibration_info } => {
            if calibration_info.is_none() {
                return Err(violation("analog component without calibration info"));
            }
            if let Some(channel) = component.channels.iter().find(|c| c.bit_index != 0) {
                return Err(violation(format!(
                    "analog channel {:?} has bit index {}",
                    channel.name, channel.bit_index
                )));
            }
        }
        ComponentKind::Digital => {
            if component.channels.len() > MAX_DIGITAL_CHANNELS {
                return Err(violation(format!(
                    "digital component has {} channels",
                    component.channels.len()
                )));
            }
            if let Some(channel) = component
                .channels
                .iter()
                .find(|c| !(1..=16).contains(&c.bit_index))
            {
                return Err(violation(format!(
                    "digital channel {:?} has bit index {}",
                    channel.name, channel.bit_index
                )));
            }
        }
    }

    let pack = &component.pack_info;
    if pack.value_size == 0 {
        return Err(violation("value size is 0"));
    }
    if pack.significant_bits > pack.value_size * 8 {
        return Err(violation(format!(
            "{} significant bits do not fit into {} bytes",
            pack.significant_bits, pack.value_size
        )));
    }
    if let Some(width) = pack.data_type.natural_width() {
        if width != pack.value_size {
            return Err(violation(format!(
                "value size {} does not match {:?}",
                pack.value_size, pack.data_type
            )));
        }
    }
    if pack.buffers.is_empty() {
        return Err(violation("pack info references no buffer"));
    }
    for id in &pack.buffers {
        if component.buffer_info.find(*id).is_none() {
            return Err(violation(format!(
                "pack info references buffer {id} outside its buffer info"
            )));
        }
    }

    component.buffer_info.user_info_size()?;
    for buffer in &component.buffer_info.buffers {
        let raw_block = buffer
            .raw_block
            .ok_or_else(|| violation(format!("buffer {} is not placed in a raw block", buffer.id)))?;
        let block_length = raw_blocks.get(&raw_block).ok_or_else(|| {
            violation(format!(
                "buffer {} refers to raw block {raw_block} outside the header",
                buffer.id
            ))
        })?;
        let end = buffer.raw_block_offset.saturating_add(buffer.length);
        if end > *block_length {
            return Err(violation(format!(
                "buffer {} ends at {end} beyond its raw block of {block_length} bytes",
                buffer.id
            )));
        }
        if buffer.offset > 0 && buffer.offset >= buffer.length {
            return Err(violation(format!(
                "buffer {} offset {} is not below its length {}",
                buffer.id, buffer.offset, buffer.length
            )));
        }
        if buffer.length > 0 && pack.offset >= buffer.length {
            return Err(violation(format!(
                "pack offset {} is not below the length {} of buffer {}",
                pack.offset, buffer.length, buffer.id
            )));
        }
        if buffer.consumed_bytes > buffer.length {
            return Err(violation(format!(
                "buffer {} consumes {} of {} bytes",
                buffer.id, buffer.consumed_bytes, buffer.length
            )));
        }
    }

    if let Some(display) = &component.display_info {
        if !(display.y_min < display.y_max) {
            return Err(violation(format!(
                "display range {}..{} is empty",
                display.y_min, display.y_max
            )));
        }
        if display.r > 255 || display.g > 255 || display.b > 255 {
            return Err(violation(format!(
                "display color ({}, {}, {}) out of range",
                display.r, display.g, display.b
            )));
        }
    }
    if let Some(message) = component.trigger_time.as_ref().and_then(|t| t.range_error()) {
        return Err(violation(message));
    }
    Ok(())
}
