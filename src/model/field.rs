//! Data fields (`CG`).

use super::component::ScalingContext;
use super::types::{ComponentRole, FieldType, decode_code};
use super::{Component, EventInfo, TriggerTime, XAxisScaling, ZAxisScaling};
use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::{Error, Result};
use std::io::{BufRead, Seek};

/// A dataset descriptor owning its components and event lists.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub field_type: FieldType,
    pub components: Vec<Component>,
    pub event_infos: Vec<EventInfo>,
}

impl Field {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            components: Vec::new(),
            event_infos: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn dimension(&self) -> u32 {
        self.field_type.dimension()
    }

    /// The time, x, imaginary or phase component, if the field has one.
    pub fn secondary_component(&self) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.role == ComponentRole::Secondary)
    }

    /// Describe why the component roles do not fit the field type.
    pub(crate) fn component_rule_error(&self) -> Option<String> {
        let primary = self
            .components
            .iter()
            .filter(|c| c.role == ComponentRole::Primary)
            .count();
        let secondary = self.components.len() - primary;
        let ok = match self.field_type {
            FieldType::EquidistantTime => primary >= 1 && secondary == 0,
            FieldType::MonotonousTime | FieldType::Xy => primary >= 1 && secondary == 1,
            _ => primary == 1 && secondary == 1,
        };
        if ok {
            None
        } else {
            Some(format!(
                "{:?} field has {primary} primary and {secondary} secondary components",
                self.field_type
            ))
        }
    }

    /// Parse a field whose `CG` prefix has been lexed, including its
    /// scaling keys, event lists and components.
    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        let start = r.position();
        let (count, field_type) = r.read_key_body(KeyType::Field, &[1], |r, _| {
            let count = r.read_u32()?;
            let position = r.position();
            let field_type = decode_code(position, "field type", r.read_u32()?, FieldType::from_code)?;
            let position = r.position();
            let dimension = r.read_u32()?;
            if dimension != field_type.dimension() {
                return Err(Error::malformed(
                    position,
                    format!("dimension {dimension} does not match {field_type:?}"),
                ));
            }
            Ok((count, field_type))
        })?;

        let mut field = Field::new(field_type);
        let mut context = ScalingContext::default();
        loop {
            let key_start = r.position();
            let Some(key) = r.next_key_type()? else {
                break;
            };
            match key {
                KeyType::XScaling => context.x_scaling = Some(XAxisScaling::parse(r)?),
                KeyType::TriggerTime => context.trigger_time = Some(TriggerTime::parse(r)?),
                KeyType::ZScaling => context.z_scaling = Some(ZAxisScaling::parse(r)?),
                KeyType::Component => field.components.push(Component::parse(r, &context)?),
                KeyType::EventList => field.event_infos.push(EventInfo::parse(r)?),
                KeyType::Unknown => {
                    log::warn!("skipping unknown key at byte {key_start}");
                    r.skip_key()?;
                }
                _ => {
                    r.rewind_key_type()?;
                    break;
                }
            }
        }

        if field.components.len() != count as usize {
            return Err(Error::malformed(
                start,
                format!(
                    "field declares {count} components but {} follow",
                    field.components.len()
                ),
            ));
        }
        Ok(field)
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::Field,
            1,
            &[
                Token::UInt(self.components.len() as u64),
                Token::UInt(self.field_type.code() as u64),
                Token::UInt(self.dimension() as u64),
            ],
        )?;
        for info in &self.event_infos {
            info.write(w)?;
        }
        let mut previous = None;
        for component in &self.components {
            component.write(w, previous)?;
            previous = Some(component);
        }
        Ok(())
    }
}
