//! Components: one dataset of a field with its full storage description.

use super::types::{ComponentRole, DataType, decode_code};
use super::{
    Buffer, BufferInfo, CalibrationInfo, Channel, DisplayInfo, EntityId, EventReference,
    PackInfo, PropertyInfo, TriggerTime, XAxisScaling, ZAxisScaling,
};
use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::{Error, Result};
use std::io::{BufRead, Seek};

/// Analog or digital variant, chosen by the discriminant of the `CC` key.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComponentKind {
    /// Numeric samples. A valid analog component carries calibration info.
    Analog {
        calibration_info: Option<CalibrationInfo>,
    },
    /// Up to 16 bit lines packed into a word; never calibrated.
    Digital,
}

/// Scaling keys in force at the point a component starts.
///
/// `CD`, `NT` and `CZ` keys update the context; every component parsed after
/// them inherits a copy.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScalingContext {
    pub x_scaling: Option<XAxisScaling>,
    pub z_scaling: Option<ZAxisScaling>,
    pub trigger_time: Option<TriggerTime>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    pub id: EntityId,
    pub role: ComponentRole,
    pub kind: ComponentKind,
    pub x_scaling: Option<XAxisScaling>,
    pub z_scaling: Option<ZAxisScaling>,
    pub trigger_time: Option<TriggerTime>,
    pub pack_info: PackInfo,
    pub buffer_info: BufferInfo,
    pub display_info: Option<DisplayInfo>,
    pub event_reference: Option<EventReference>,
    pub channels: Vec<Channel>,
}

impl Component {
    fn with_layout(kind: ComponentKind, data_type: DataType, length: u64) -> Self {
        let mut pack_info = PackInfo::new(data_type);
        let buffer = Buffer::new(length * pack_info.value_size as u64);
        pack_info.buffers.push(buffer.id);
        Self {
            id: EntityId::new(),
            role: ComponentRole::Primary,
            kind,
            x_scaling: None,
            z_scaling: None,
            trigger_time: None,
            pack_info,
            buffer_info: BufferInfo {
                buffers: vec![buffer],
            },
            display_info: None,
            event_reference: None,
            channels: Vec::new(),
        }
    }

    /// An analog component holding `length` values of `data_type` in one buffer.
    pub fn analog(data_type: DataType, length: u64, calibration: CalibrationInfo) -> Self {
        Self::with_layout(
            ComponentKind::Analog {
                calibration_info: Some(calibration),
            },
            data_type,
            length,
        )
    }

    /// A digital component holding `length` 16-bit words.
    pub fn digital(length: u64) -> Self {
        Self::with_layout(ComponentKind::Digital, DataType::Digital16, length)
    }

    pub fn with_role(mut self, role: ComponentRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_x_scaling(mut self, scaling: XAxisScaling) -> Self {
        self.x_scaling = Some(scaling);
        self
    }

    pub fn with_trigger_time(mut self, time: TriggerTime) -> Self {
        self.trigger_time = Some(time);
        self
    }

    pub fn with_display_info(mut self, display: DisplayInfo) -> Self {
        self.display_info = Some(display);
        self
    }

    pub fn is_digital(&self) -> bool {
        matches!(self.kind, ComponentKind::Digital)
    }

    pub fn calibration_info(&self) -> Option<&CalibrationInfo> {
        match &self.kind {
            ComponentKind::Analog { calibration_info } => calibration_info.as_ref(),
            ComponentKind::Digital => None,
        }
    }

    pub fn channel(&self, id: EntityId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// The buffers the pack info points at, in buffer order.
    pub fn packed_buffers(&self) -> impl Iterator<Item = &Buffer> + '_ {
        self.buffer_info
            .buffers
            .iter()
            .filter(|b| self.pack_info.buffers.contains(&b.id))
    }

    /// Parse a component whose `CC` prefix has been lexed, up to the first
    /// key that does not belong to it.
    pub(crate) fn parse<R: BufRead + Seek>(
        r: &mut KeyReader<'_, R>,
        context: &ScalingContext,
    ) -> Result<Self> {
        let start = r.position();
        let (role, digital) = r.read_key_body(KeyType::Component, &[1], |r, _| {
            let position = r.position();
            let role = decode_code(
                position,
                "component index",
                r.read_u32()?,
                ComponentRole::from_code,
            )?;
            let position = r.position();
            let digital = match r.read_u32()? {
                1 => false,
                2 => true,
                other => {
                    return Err(Error::malformed(
                        position,
                        format!("invalid analog/digital flag {other}"),
                    ));
                }
            };
            Ok((role, digital))
        })?;

        let mut kind = if digital {
            ComponentKind::Digital
        } else {
            ComponentKind::Analog {
                calibration_info: None,
            }
        };
        let mut pack_info = None;
        let mut buffer_info = None;
        let mut display_info = None;
        let mut event_reference = None;
        let mut channels: Vec<Channel> = Vec::new();
        let mut after_channel = false;

        loop {
            let key_start = r.position();
            let Some(key) = r.next_key_type()? else {
                break;
            };
            match key {
                KeyType::PackInfo => pack_info = Some(PackInfo::parse(r)?),
                KeyType::BufferInfo => buffer_info = Some(BufferInfo::parse(r)?),
                KeyType::Calibration => match &mut kind {
                    ComponentKind::Analog { calibration_info } => {
                        *calibration_info = Some(CalibrationInfo::parse(r)?);
                    }
                    ComponentKind::Digital => {
                        return Err(Error::malformed(
                            key_start,
                            "calibration key inside a digital component",
                        ));
                    }
                },
                KeyType::DisplayInfo => display_info = Some(DisplayInfo::parse(r)?),
                KeyType::EventReference => event_reference = Some(EventReference::parse(r)?),
                KeyType::Channel => channels.push(Channel::parse(r)?),
                KeyType::PropertyList => {
                    let properties = PropertyInfo::parse(r)?;
                    match channels.last_mut() {
                        Some(channel) if after_channel => channel.properties = Some(properties),
                        _ => {
                            return Err(Error::malformed(
                                key_start,
                                "property list without a preceding channel",
                            ));
                        }
                    }
                }
                KeyType::Unknown => {
                    log::warn!("skipping unknown key at byte {key_start}");
                    r.skip_key()?;
                }
                _ => {
                    r.rewind_key_type()?;
                    break;
                }
            }
            after_channel = key == KeyType::Channel;
        }

        let pack_info =
            pack_info.ok_or_else(|| Error::malformed(start, "component without pack info"))?;
        let buffer_info =
            buffer_info.ok_or_else(|| Error::malformed(start, "component without buffer info"))?;

        Ok(Component {
            id: EntityId::new(),
            role,
            kind,
            x_scaling: context.x_scaling.clone(),
            z_scaling: context.z_scaling.clone(),
            trigger_time: context.trigger_time.clone(),
            pack_info,
            buffer_info,
            display_info,
            event_reference,
            channels,
        })
    }

    /// Write the component's keys. Scaling keys are only written when they
    /// differ from what `previous` left in force.
    pub(crate) fn write<W: FamosWrite>(
        &self,
        w: &mut KeyWriter<'_, '_, W>,
        previous: Option<&Component>,
    ) -> Result<()> {
        if let Some(x) = &self.x_scaling {
            if previous.and_then(|p| p.x_scaling.as_ref()) != Some(x) {
                x.write(w)?;
            }
        }
        if let Some(time) = &self.trigger_time {
            if previous.and_then(|p| p.trigger_time.as_ref()) != Some(time) {
                time.write(w)?;
            }
        }
        if let Some(z) = &self.z_scaling {
            if previous.and_then(|p| p.z_scaling.as_ref()) != Some(z) {
                z.write(w)?;
            }
        }

        let analog_digital = if self.is_digital() { 2 } else { 1 };
        w.write_key(
            KeyType::Component,
            1,
            &[
                Token::UInt(self.role.code() as u64),
                Token::UInt(analog_digital),
            ],
        )?;
        self.pack_info.write(w)?;
        self.buffer_info.write(w)?;
        if let Some(calibration) = self.calibration_info() {
            calibration.write(w)?;
        }
        if let Some(display) = &self.display_info {
            display.write(w)?;
        }
        if let Some(reference) = &self.event_reference {
            reference.write(w)?;
        }
        for channel in &self.channels {
            channel.write(w)?;
        }
        Ok(())
    }
}
