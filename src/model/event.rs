//! Event lists and component references into them.

use super::EntityId;
use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::Result;
use std::io::{BufRead, Seek};

/// One event: a slice of a component's buffer with its own time base.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    pub index: u32,
    pub offset: u64,
    pub length: u64,
    pub time: f64,
    pub amplitude_offset0: f64,
    pub amplitude_offset1: f64,
    pub x0: f64,
    pub amplitude_factor0: f64,
    pub amplitude_factor1: f64,
    pub dx: f64,
}

/// An ordered event list (`CV`), owned by a field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventInfo {
    pub id: EntityId,
    pub index: u32,
    pub events: Vec<Event>,
}

impl Default for EventInfo {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl EventInfo {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            id: EntityId::new(),
            index: 0,
            events,
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::EventList, &[1], |r, _| {
            let index = r.read_u32()?;
            let count = r.read_u64()?;
            let mut events = Vec::new();
            for _ in 0..count {
                events.push(Event {
                    index: r.read_u32()?,
                    offset: r.read_u64()?,
                    length: r.read_u64()?,
                    time: r.read_f64()?,
                    amplitude_offset0: r.read_f64()?,
                    amplitude_offset1: r.read_f64()?,
                    x0: r.read_f64()?,
                    amplitude_factor0: r.read_f64()?,
                    amplitude_factor1: r.read_f64()?,
                    dx: r.read_f64()?,
                });
            }
            Ok(EventInfo {
                id: EntityId::new(),
                index,
                events,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        let mut tokens = Vec::with_capacity(2 + self.events.len() * 10);
        tokens.push(Token::UInt(self.index as u64));
        tokens.push(Token::UInt(self.events.len() as u64));
        for event in &self.events {
            tokens.extend([
                Token::UInt(event.index as u64),
                Token::UInt(event.offset),
                Token::UInt(event.length),
                Token::Real(event.time),
                Token::Real(event.amplitude_offset0),
                Token::Real(event.amplitude_offset1),
                Token::Real(event.x0),
                Token::Real(event.amplitude_factor0),
                Token::Real(event.amplitude_factor1),
                Token::Real(event.dx),
            ]);
        }
        w.write_key(KeyType::EventList, 1, &tokens)?;
        Ok(())
    }
}

/// A component's window into an event list (`Cv`).
///
/// The metadata round-trips, but sample data of such components can be
/// neither read nor written.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventReference {
    pub event_info_index: u32,
    /// Resolved event list within the same field.
    pub event_info: Option<EntityId>,
    pub offset: u64,
    pub group_size: u64,
    pub gap_size: u64,
    pub count: u64,
    pub valid_trigger_time: bool,
    pub valid_x_scaling: bool,
    pub valid_calibration1: bool,
    pub valid_calibration2: bool,
}

impl EventReference {
    pub fn new(event_info: EntityId) -> Self {
        Self {
            event_info: Some(event_info),
            ..Default::default()
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::EventReference, &[1], |r, _| {
            Ok(EventReference {
                event_info_index: r.read_u32()?,
                event_info: None,
                offset: r.read_u64()?,
                group_size: r.read_u64()?,
                gap_size: r.read_u64()?,
                count: r.read_u64()?,
                valid_trigger_time: r.read_bool()?,
                valid_x_scaling: r.read_bool()?,
                valid_calibration1: r.read_bool()?,
                valid_calibration2: r.read_bool()?,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::EventReference,
            1,
            &[
                Token::UInt(self.event_info_index as u64),
                Token::UInt(self.offset),
                Token::UInt(self.group_size),
                Token::UInt(self.gap_size),
                Token::UInt(self.count),
                Token::Bool(self.valid_trigger_time),
                Token::Bool(self.valid_x_scaling),
                Token::Bool(self.valid_calibration1),
                Token::Bool(self.valid_calibration2),
            ],
        )?;
        Ok(())
    }
}
