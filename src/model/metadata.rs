//! Satellite metadata: flat value holders with a generic key encoding.

use super::EntityId;
use super::types::{DataType, Origin, PropertyType, decode_code};
use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::Result;
use std::io::{BufRead, Seek};

/// One named property of a property list.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Property {
    pub name: String,
    pub value: String,
    pub property_type: PropertyType,
    pub flags: u32,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

/// The `Np` key: properties attached to the preceding group, text, single
/// value or channel.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyInfo {
    pub properties: Vec<Property>,
}

impl PropertyInfo {
    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::PropertyList, &[1], |r, _| {
            let count = r.read_u32()?;
            let mut properties = Vec::new();
            for _ in 0..count {
                let name = r.read_string()?;
                let value = r.read_string()?;
                let position = r.position();
                let property_type =
                    decode_code(position, "property type", r.read_u32()?, PropertyType::from_code)?;
                let flags = r.read_u32()?;
                properties.push(Property {
                    name,
                    value,
                    property_type,
                    flags,
                });
            }
            Ok(PropertyInfo { properties })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        let mut tokens = vec![Token::UInt(self.properties.len() as u64)];
        for property in &self.properties {
            tokens.push(Token::Text(&property.name));
            tokens.push(Token::Text(&property.value));
            tokens.push(Token::UInt(property.property_type.code() as u64));
            tokens.push(Token::UInt(property.flags as u64));
        }
        w.write_key(KeyType::PropertyList, 1, &tokens)?;
        Ok(())
    }
}

/// Write `properties` as an `Np` key if there are any.
pub(crate) fn write_properties<W: FamosWrite>(
    properties: &Option<PropertyInfo>,
    w: &mut KeyWriter<'_, '_, W>,
) -> Result<()> {
    match properties {
        Some(info) if !info.properties.is_empty() => info.write(w),
        _ => Ok(()),
    }
}

/// A free text or text array (`CT`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Text {
    pub id: EntityId,
    /// Owning group's index; only meaningful at the stream boundary.
    pub group_index: u32,
    pub name: String,
    /// One entry for a plain text, several for a text array.
    pub values: Vec<String>,
    pub comment: String,
    pub properties: Option<PropertyInfo>,
}

impl Text {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_values(name, vec![text.into()])
    }

    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            id: EntityId::new(),
            group_index: 0,
            name: name.into(),
            values,
            comment: String::new(),
            properties: None,
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::Text, &[1, 2], |r, body| {
            let group_index = r.read_u32()?;
            let name = r.read_string()?;
            let values = if body.version == 1 {
                vec![r.read_string()?]
            } else {
                r.read_string_array()?
            };
            let comment = r.read_string()?;
            Ok(Text {
                id: EntityId::new(),
                group_index,
                name,
                values,
                comment,
                properties: None,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        let group = Token::UInt(self.group_index as u64);
        match self.values.as_slice() {
            [single] => w.write_key(
                KeyType::Text,
                1,
                &[group, Token::Text(&self.name), Token::Text(single), Token::Text(&self.comment)],
            )?,
            values => w.write_key(
                KeyType::Text,
                2,
                &[group, Token::Text(&self.name), Token::TextArray(values), Token::Text(&self.comment)],
            )?,
        };
        write_properties(&self.properties, w)
    }
}

/// A single named numeric value (`CI`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SingleValue {
    pub id: EntityId,
    pub group_index: u32,
    pub data_type: DataType,
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub comment: String,
    /// Seconds relative to the trigger time.
    pub time: f64,
    pub properties: Option<PropertyInfo>,
}

impl SingleValue {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            group_index: 0,
            data_type: DataType::F64,
            name: name.into(),
            value,
            unit: unit.into(),
            comment: String::new(),
            time: 0.0,
            properties: None,
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::SingleValue, &[1], |r, _| {
            let group_index = r.read_u32()?;
            let position = r.position();
            let data_type = decode_code(position, "data type", r.read_u32()?, DataType::from_code)?;
            Ok(SingleValue {
                id: EntityId::new(),
                group_index,
                data_type,
                name: r.read_string()?,
                value: r.read_f64()?,
                unit: r.read_string()?,
                comment: r.read_string()?,
                time: r.read_f64()?,
                properties: None,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::SingleValue,
            1,
            &[
                Token::UInt(self.group_index as u64),
                Token::UInt(self.data_type.code() as u64),
                Token::Text(&self.name),
                Token::Real(self.value),
                Token::Text(&self.unit),
                Token::Text(&self.comment),
                Token::Real(self.time),
            ],
        )?;
        write_properties(&self.properties, w)
    }
}

/// A named channel (`CN`), owned by the component whose data it names.
///
/// Group membership is expressed by listing the channel's id in a
/// [`Group`](super::Group) or in the header's top-level channel list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel {
    pub id: EntityId,
    pub group_index: u32,
    /// 0 for analog components, 1..=16 for a line of a digital component.
    pub bit_index: u32,
    pub name: String,
    pub comment: String,
    pub properties: Option<PropertyInfo>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            group_index: 0,
            bit_index: 0,
            name: name.into(),
            comment: String::new(),
            properties: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_bit_index(mut self, bit_index: u32) -> Self {
        self.bit_index = bit_index;
        self
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::Channel, &[1], |r, _| {
            let group_index = r.read_u32()?;
            let _reserved = r.read_u32()?;
            Ok(Channel {
                id: EntityId::new(),
                group_index,
                bit_index: r.read_u32()?,
                name: r.read_string()?,
                comment: r.read_string()?,
                properties: None,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::Channel,
            1,
            &[
                Token::UInt(self.group_index as u64),
                Token::UInt(0),
                Token::UInt(self.bit_index as u64),
                Token::Text(&self.name),
                Token::Text(&self.comment),
            ],
        )?;
        write_properties(&self.properties, w)
    }
}

/// A user defined key/value pair (`NU`). Keys are unique per file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomKey {
    pub key: String,
    pub value: Vec<u8>,
}

impl CustomKey {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::UserKey, &[1], |r, _| {
            Ok(CustomKey {
                key: r.read_string()?,
                value: r.read_blob()?,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::UserKey,
            1,
            &[Token::Text(&self.key), Token::Blob(&self.value)],
        )?;
        Ok(())
    }
}

/// Who produced the file (`NO`).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OriginInfo {
    pub origin: Origin,
    pub name: String,
    pub comment: String,
}

impl OriginInfo {
    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::Origin, &[1], |r, _| {
            let position = r.position();
            let origin = decode_code(position, "origin", r.read_u32()?, Origin::from_code)?;
            Ok(OriginInfo {
                origin,
                name: r.read_string()?,
                comment: r.read_string()?,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::Origin,
            1,
            &[
                Token::UInt(self.origin.code() as u64),
                Token::Text(&self.name),
                Token::Text(&self.comment),
            ],
        )?;
        Ok(())
    }
}

/// Code page and language of all strings after the `NL` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LanguageInfo {
    pub code_page: u32,
    /// Windows language identifier, e.g. `0x0407` for German.
    pub language: u32,
}

impl Default for LanguageInfo {
    fn default() -> Self {
        Self {
            code_page: crate::keys::DEFAULT_CODE_PAGE,
            language: 0x0409,
        }
    }
}

impl LanguageInfo {
    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::Language, &[1], |r, _| {
            Ok(LanguageInfo {
                code_page: r.read_u32()?,
                language: r.read_hex()?,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::Language,
            1,
            &[Token::UInt(self.code_page as u64), Token::Hex(self.language)],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::CodePageCodec;
    use crate::writer::VecWriter;
    use std::io::Cursor;

    #[test]
    fn text_array_uses_version_two() {
        let mut sink = VecWriter::new();
        let text = Text::with_values("Notes", vec!["a".into(), "bc".into()]);
        text.write(&mut KeyWriter::new(&mut sink, &CodePageCodec).with_line_breaks(false))
            .unwrap();
        assert_eq!(sink.as_slice(), b"|CT,2,23,0,5,Notes,2,1,a,2,bc,0,;");

        let mut r = KeyReader::new(Cursor::new(sink.into_inner()), &CodePageCodec).unwrap();
        assert_eq!(r.next_key_type().unwrap(), Some(KeyType::Text));
        let parsed = Text::parse(&mut r).unwrap();
        assert_eq!(parsed.values, ["a", "bc"]);
        assert_eq!(parsed.comment, "");
    }

    #[test]
    fn channel_key_layout() {
        let mut sink = VecWriter::new();
        let mut channel = Channel::new("GEN_TEMP_1");
        channel.group_index = 1;
        channel
            .write(&mut KeyWriter::new(&mut sink, &CodePageCodec).with_line_breaks(false))
            .unwrap();
        assert_eq!(sink.as_slice(), b"|CN,1,22,1,0,0,10,GEN_TEMP_1,0,;");
    }
}
