//! Axis scaling and trigger time.
//!
//! These keys appear in field scope ahead of a component and stay in force
//! for every later component of the same field until replaced.

use super::types::{TimeMode, decode_code};
use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::Result;
use std::io::{BufRead, Seek};

/// X-axis scaling (`CD`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XAxisScaling {
    /// Sample spacing.
    pub dx: f64,
    pub calibrated: bool,
    pub unit: String,
    pub reduction: u32,
    pub is_multi_events: bool,
    pub sort_buffers: bool,
    pub x0: f64,
    pub pretrigger_usage: u32,
}

impl Default for XAxisScaling {
    fn default() -> Self {
        Self {
            dx: 1.0,
            calibrated: true,
            unit: String::from("s"),
            reduction: 0,
            is_multi_events: false,
            sort_buffers: false,
            x0: 0.0,
            pretrigger_usage: 0,
        }
    }
}

impl XAxisScaling {
    pub fn new(dx: f64, unit: impl Into<String>) -> Self {
        Self {
            dx,
            unit: unit.into(),
            ..Default::default()
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::XScaling, &[1, 2], |r, body| {
            let mut scaling = XAxisScaling {
                dx: r.read_f64()?,
                calibrated: r.read_bool()?,
                unit: r.read_string()?,
                ..Default::default()
            };
            if body.version == 2 {
                scaling.reduction = r.read_u32()?;
                scaling.is_multi_events = r.read_bool()?;
                scaling.sort_buffers = r.read_bool()?;
                scaling.x0 = r.read_f64()?;
                scaling.pretrigger_usage = r.read_u32()?;
            }
            Ok(scaling)
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::XScaling,
            2,
            &[
                Token::Real(self.dx),
                Token::Bool(self.calibrated),
                Token::Text(&self.unit),
                Token::UInt(self.reduction as u64),
                Token::Bool(self.is_multi_events),
                Token::Bool(self.sort_buffers),
                Token::Real(self.x0),
                Token::UInt(self.pretrigger_usage as u64),
            ],
        )?;
        Ok(())
    }
}

/// Z-axis scaling (`CZ`) for segmented data.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZAxisScaling {
    pub dz: f64,
    pub dz_calibrated: bool,
    pub z0: f64,
    pub z0_calibrated: bool,
    pub unit: String,
    pub segment_size: u64,
}

impl ZAxisScaling {
    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::ZScaling, &[1], |r, _| {
            Ok(ZAxisScaling {
                dz: r.read_f64()?,
                dz_calibrated: r.read_bool()?,
                z0: r.read_f64()?,
                z0_calibrated: r.read_bool()?,
                unit: r.read_string()?,
                segment_size: r.read_u64()?,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::ZScaling,
            1,
            &[
                Token::Real(self.dz),
                Token::Bool(self.dz_calibrated),
                Token::Real(self.z0),
                Token::Bool(self.z0_calibrated),
                Token::Text(&self.unit),
                Token::UInt(self.segment_size),
            ],
        )?;
        Ok(())
    }
}

/// Start time of the measurement (`NT`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerTime {
    pub day: u32,
    pub month: u32,
    pub year: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
    pub time_mode: TimeMode,
}

impl TriggerTime {
    pub fn new(year: u32, month: u32, day: u32, hour: u32, minute: u32, second: f64) -> Self {
        Self {
            day,
            month,
            year,
            hour,
            minute,
            second,
            time_mode: TimeMode::Local,
        }
    }

    /// First out-of-range calendar field, if any.
    pub(crate) fn range_error(&self) -> Option<String> {
        let checks = [
            ("day", (1..=31).contains(&self.day), self.day),
            ("month", (1..=12).contains(&self.month), self.month),
            ("year", (1900..=9999).contains(&self.year), self.year),
            ("hour", self.hour < 24, self.hour),
            ("minute", self.minute < 60, self.minute),
        ];
        if let Some((name, _, value)) = checks.iter().find(|(_, ok, _)| !ok) {
            return Some(format!("trigger time {name} {value} out of range"));
        }
        if !(0.0..60.0).contains(&self.second) {
            return Some(format!("trigger time second {} out of range", self.second));
        }
        None
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::TriggerTime, &[1, 2], |r, body| {
            let mut time = TriggerTime {
                day: r.read_u32()?,
                month: r.read_u32()?,
                year: r.read_u32()?,
                hour: r.read_u32()?,
                minute: r.read_u32()?,
                second: r.read_f64()?,
                time_mode: TimeMode::Local,
            };
            if body.version == 2 {
                let position = r.position();
                time.time_mode =
                    decode_code(position, "time mode", r.read_u32()?, TimeMode::from_code)?;
            }
            Ok(time)
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::TriggerTime,
            2,
            &[
                Token::UInt(self.day as u64),
                Token::UInt(self.month as u64),
                Token::UInt(self.year as u64),
                Token::UInt(self.hour as u64),
                Token::UInt(self.minute as u64),
                Token::Real(self.second),
                Token::UInt(self.time_mode.code() as u64),
            ],
        )?;
        Ok(())
    }
}
