//! Groups (`CB`).

use super::{Channel, EntityId, PropertyInfo, SingleValue, Text};
use super::metadata::write_properties;
use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::Result;
use std::io::{BufRead, Seek};

/// A named bucket of texts, single values and channels.
///
/// Texts and single values are owned here. Channels are owned by their
/// component and only listed here by id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub id: EntityId,
    pub index: u32,
    pub name: String,
    pub comment: String,
    pub texts: Vec<Text>,
    pub single_values: Vec<SingleValue>,
    pub channels: Vec<EntityId>,
    pub properties: Option<PropertyInfo>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            index: 0,
            name: name.into(),
            comment: String::new(),
            texts: Vec::new(),
            single_values: Vec::new(),
            channels: Vec::new(),
            properties: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn add_channel(&mut self, channel: &Channel) {
        self.channels.push(channel.id);
    }

    pub fn add_text(&mut self, text: Text) {
        self.texts.push(text);
    }

    pub fn add_single_value(&mut self, value: SingleValue) {
        self.single_values.push(value);
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::Group, &[1], |r, _| {
            let index = r.read_u32()?;
            let mut group = Group::new(r.read_string()?);
            group.index = index;
            group.comment = r.read_string()?;
            Ok(group)
        })
    }

    /// Write the `CB` key and its properties. Texts and single values are
    /// written separately, after all groups.
    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::Group,
            1,
            &[
                Token::UInt(self.index as u64),
                Token::Text(&self.name),
                Token::Text(&self.comment),
            ],
        )?;
        write_properties(&self.properties, w)
    }
}
