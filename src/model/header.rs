//! The document root and the file-level key loop.

use super::{
    BufferAlignment, Channel, Component, ComponentRole, CompressionType, CustomKey, DataType,
    EntityId, Field, Group, LanguageInfo, OriginInfo, PropertyInfo, RawBlock, SingleValue, Text,
};
use crate::keys::{KeyReader, KeyType, KeyWriter, Placeholder, Token};
use crate::layout::{self, ByteRange};
use crate::writer::FamosWrite;
use crate::{Error, Result};
use std::io::{BufRead, Seek};

/// Processor type written in the format key: Intel byte order.
const PROCESSOR_INTEL: u32 = 1;

/// Root of a FAMOS document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FamosHeader {
    pub processor: u32,
    pub origin: Option<OriginInfo>,
    pub language: Option<LanguageInfo>,
    pub custom_keys: Vec<CustomKey>,
    pub groups: Vec<Group>,
    /// Texts outside any group.
    pub texts: Vec<Text>,
    /// Single values outside any group.
    pub single_values: Vec<SingleValue>,
    /// Channels outside any group, by id.
    pub channels: Vec<EntityId>,
    pub fields: Vec<Field>,
    pub raw_blocks: Vec<RawBlock>,
}

impl Default for FamosHeader {
    fn default() -> Self {
        Self {
            processor: PROCESSOR_INTEL,
            origin: None,
            language: None,
            custom_keys: Vec::new(),
            groups: Vec::new(),
            texts: Vec::new(),
            single_values: Vec::new(),
            channels: Vec::new(),
            fields: Vec::new(),
            raw_blocks: Vec::new(),
        }
    }
}

/// Entity an `Np` key at file level attaches to.
#[derive(Clone, Copy)]
enum PropertyTarget {
    None,
    Group(usize),
    Text(usize),
    SingleValue(usize),
}

/// Where a component's values are, relative to its raw block payload.
pub(crate) struct ValueLocation {
    pub raw_block: EntityId,
    pub range: ByteRange,
    pub data_type: DataType,
    pub role: ComponentRole,
}

/// Offsets the data pass and the final patch need.
pub(crate) struct WrittenSkeleton {
    /// Offset of the key group's closed flag.
    pub closed_flag: u64,
    pub raw_blocks: Vec<(EntityId, Placeholder)>,
}

impl FamosHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code_page(&self) -> u32 {
        self.language
            .map_or(crate::keys::DEFAULT_CODE_PAGE, |l| l.code_page)
    }

    /// Add a channel to the top-level (ungrouped) channel list.
    pub fn add_channel(&mut self, channel: &Channel) {
        self.channels.push(channel.id);
    }

    /// Iterate every component of every field.
    pub fn components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.fields.iter().flat_map(|f| f.components.iter())
    }

    pub fn component(&self, id: EntityId) -> Option<(&Field, &Component)> {
        self.fields.iter().find_map(|field| {
            field
                .components
                .iter()
                .find(|c| c.id == id)
                .map(|c| (field, c))
        })
    }

    /// The field and component owning a channel.
    pub fn channel(&self, id: EntityId) -> Option<(&Field, &Component, &Channel)> {
        self.fields.iter().find_map(|field| {
            field.components.iter().find_map(|component| {
                component
                    .channel(id)
                    .map(|channel| (field, component, channel))
            })
        })
    }

    /// Look up a channel by name.
    pub fn channel_by_name(&self, name: &str) -> Option<&Channel> {
        self.components()
            .flat_map(|c| c.channels.iter())
            .find(|ch| ch.name == name)
    }

    pub fn raw_block(&self, id: EntityId) -> Option<&RawBlock> {
        self.raw_blocks.iter().find(|b| b.id == id)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Lay out the buffers of every component that is unassigned or already
    /// stored in `raw_block`, and size the raw block to fit.
    ///
    /// Each claimed component must have exactly one buffer. Components whose
    /// buffers live in another raw block are left alone.
    pub fn align_buffers(&mut self, raw_block: EntityId, mode: BufferAlignment) -> Result<()> {
        let position = self
            .raw_blocks
            .iter()
            .position(|b| b.id == raw_block)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("raw block {raw_block} is not part of the header"))
            })?;

        let mut claimed: Vec<&mut Component> = self
            .fields
            .iter_mut()
            .flat_map(|f| f.components.iter_mut())
            .filter(|c| {
                !c.buffer_info.buffers.is_empty()
                    && c.buffer_info
                        .buffers
                        .iter()
                        .all(|b| b.raw_block.is_none() || b.raw_block == Some(raw_block))
            })
            .collect();

        let length = layout::align_components(&mut claimed, mode, raw_block)?;
        log::debug!(
            "aligned {} components into raw block {raw_block} ({mode:?}, {length} bytes)",
            claimed.len()
        );
        self.raw_blocks[position].length = length;
        Ok(())
    }

    /// Number of values a component's first packed buffer holds.
    pub fn max_value_count(&self, component: EntityId) -> Result<u64> {
        let (_, component) = self.component(component).ok_or_else(|| {
            Error::InvalidArgument(format!("component {component} is not part of the header"))
        })?;
        let buffer = component.packed_buffers().next().ok_or_else(|| {
            Error::InvalidArgument(format!("component {} has no buffer", component.id))
        })?;
        layout::max_value_count(&component.pack_info, buffer)
    }

    /// Locate values `start..start + length` of a component.
    ///
    /// Rejects every layout whose values cannot be addressed as plain
    /// little-endian numbers.
    pub(crate) fn locate(&self, component: EntityId, start: u64, length: u64) -> Result<ValueLocation> {
        let (_, component) = self.component(component).ok_or_else(|| {
            Error::InvalidArgument(format!("component {component} is not part of the header"))
        })?;
        if component.event_reference.is_some() {
            return Err(Error::UnsupportedFeature(
                "values of components split into events".into(),
            ));
        }
        if component.is_digital() {
            return Err(Error::UnsupportedFeature("digital component values".into()));
        }
        let pack = &component.pack_info;
        if !pack.data_type.is_numeric() {
            return Err(Error::UnsupportedFeature(format!(
                "{:?} values",
                pack.data_type
            )));
        }

        let mut buffers = component.packed_buffers();
        let (Some(buffer), None) = (buffers.next(), buffers.next()) else {
            return Err(Error::UnsupportedFeature(format!(
                "component {} does not store its values in exactly one buffer",
                component.id
            )));
        };
        let raw_block = buffer
            .raw_block
            .and_then(|id| self.raw_block(id))
            .ok_or_else(|| {
                Error::DanglingReference(format!("buffer {} has no raw block", buffer.id))
            })?;
        if raw_block.compression != CompressionType::Uncompressed {
            return Err(Error::UnsupportedFeature(format!(
                "compressed raw block ({:?})",
                raw_block.compression
            )));
        }

        Ok(ValueLocation {
            raw_block: raw_block.id,
            range: layout::byte_range_for(pack, buffer, 0, start, length)?,
            data_type: pack.data_type,
            role: component.role,
        })
    }

    /// Parse the key stream from the format key to the end.
    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        let processor = r.expect_key(KeyType::Format, &[2], |r, _| r.read_u32())?;
        let closed = r.expect_key(KeyType::KeyGroup, &[1], |r, _| {
            let _marker = r.read_u32()?;
            r.read_bool()
        })?;
        if !closed {
            return Err(Error::UnterminatedKeyGroup);
        }

        let mut header = FamosHeader {
            processor,
            ..Default::default()
        };
        let mut target = PropertyTarget::None;

        loop {
            let key_start = r.position();
            let Some(key) = r.next_key_type()? else {
                break;
            };
            let mut next_target = PropertyTarget::None;
            match key {
                KeyType::Origin => header.origin = Some(OriginInfo::parse(r)?),
                KeyType::Language => {
                    let language = LanguageInfo::parse(r)?;
                    r.set_code_page(language.code_page);
                    header.language = Some(language);
                }
                KeyType::UserKey => header.custom_keys.push(CustomKey::parse(r)?),
                KeyType::Group => {
                    header.groups.push(Group::parse(r)?);
                    next_target = PropertyTarget::Group(header.groups.len() - 1);
                }
                KeyType::Text => {
                    header.texts.push(Text::parse(r)?);
                    next_target = PropertyTarget::Text(header.texts.len() - 1);
                }
                KeyType::SingleValue => {
                    header.single_values.push(SingleValue::parse(r)?);
                    next_target = PropertyTarget::SingleValue(header.single_values.len() - 1);
                }
                KeyType::Field => header.fields.push(Field::parse(r)?),
                KeyType::RawBlock => header.raw_blocks.push(RawBlock::parse(r)?),
                KeyType::PropertyList => {
                    let properties = Some(PropertyInfo::parse(r)?);
                    match target {
                        PropertyTarget::Group(i) => header.groups[i].properties = properties,
                        PropertyTarget::Text(i) => header.texts[i].properties = properties,
                        PropertyTarget::SingleValue(i) => {
                            header.single_values[i].properties = properties;
                        }
                        PropertyTarget::None => {
                            return Err(Error::malformed(
                                key_start,
                                "property list without a preceding group, text or single value",
                            ));
                        }
                    }
                }
                KeyType::AddReference => {
                    return Err(Error::UnsupportedFeature(format!(
                        "add-reference key at byte {key_start}"
                    )));
                }
                KeyType::Internal => r.skip_key()?,
                KeyType::Unknown => {
                    log::warn!("skipping unknown key at byte {key_start}");
                    r.skip_key()?;
                }
                other => {
                    return Err(Error::malformed(
                        key_start,
                        format!("key {other} is not allowed at file level"),
                    ));
                }
            }
            target = next_target;
        }
        Ok(header)
    }

    /// Write every key, reserving the raw block payloads.
    ///
    /// The key group is written as open; the caller sets the flag once the
    /// payloads are in place.
    pub(crate) fn write_skeleton<W: FamosWrite>(
        &self,
        w: &mut KeyWriter<'_, '_, W>,
    ) -> Result<WrittenSkeleton> {
        w.write_key(KeyType::Format, 2, &[Token::UInt(self.processor as u64)])?;
        let key_group = w.write_key(KeyType::KeyGroup, 1, &[Token::UInt(1), Token::Bool(false)])?;
        // Payload is "1,<flag>".
        let closed_flag = key_group.payload + 2;

        if let Some(origin) = &self.origin {
            origin.write(w)?;
        }
        if let Some(language) = &self.language {
            language.write(w)?;
            w.set_code_page(language.code_page);
        }
        for key in &self.custom_keys {
            key.write(w)?;
        }
        for group in &self.groups {
            group.write(w)?;
        }
        let grouped_texts = self.groups.iter().flat_map(|g| g.texts.iter());
        for text in grouped_texts.chain(&self.texts) {
            text.write(w)?;
        }
        let grouped_values = self.groups.iter().flat_map(|g| g.single_values.iter());
        for value in grouped_values.chain(&self.single_values) {
            value.write(w)?;
        }
        for field in &self.fields {
            field.write(w)?;
        }

        let mut raw_blocks = Vec::with_capacity(self.raw_blocks.len());
        for block in &self.raw_blocks {
            raw_blocks.push((block.id, block.write(w)?));
        }
        Ok(WrittenSkeleton {
            closed_flag,
            raw_blocks,
        })
    }
}
