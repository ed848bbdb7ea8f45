//! Calibration and display properties of a component.

use crate::keys::{KeyReader, KeyType, KeyWriter, Token};
use crate::writer::FamosWrite;
use crate::Result;
use std::io::{BufRead, Seek};

/// Linear calibration `physical = raw * factor + offset` (`CR`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationInfo {
    pub apply_transformation: bool,
    pub factor: f64,
    pub offset: f64,
    pub calibrated: bool,
    pub unit: String,
}

impl Default for CalibrationInfo {
    fn default() -> Self {
        Self {
            apply_transformation: false,
            factor: 1.0,
            offset: 0.0,
            calibrated: true,
            unit: String::new(),
        }
    }
}

impl CalibrationInfo {
    /// A calibration that applies `factor` and `offset`.
    pub fn linear(factor: f64, offset: f64, unit: impl Into<String>) -> Self {
        Self {
            apply_transformation: true,
            factor,
            offset,
            calibrated: true,
            unit: unit.into(),
        }
    }

    /// Identity calibration with a unit.
    pub fn with_unit(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Default::default()
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::Calibration, &[1], |r, _| {
            Ok(CalibrationInfo {
                apply_transformation: r.read_bool()?,
                factor: r.read_f64()?,
                offset: r.read_f64()?,
                calibrated: r.read_bool()?,
                unit: r.read_string()?,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::Calibration,
            1,
            &[
                Token::Bool(self.apply_transformation),
                Token::Real(self.factor),
                Token::Real(self.offset),
                Token::Bool(self.calibrated),
                Token::Text(&self.unit),
            ],
        )?;
        Ok(())
    }
}

/// Display color and y range (`ND`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayInfo {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub y_min: f64,
    pub y_max: f64,
}

impl DisplayInfo {
    pub fn new(rgb: (u32, u32, u32), y_min: f64, y_max: f64) -> Self {
        Self {
            r: rgb.0,
            g: rgb.1,
            b: rgb.2,
            y_min,
            y_max,
        }
    }

    pub(crate) fn parse<R: BufRead + Seek>(r: &mut KeyReader<'_, R>) -> Result<Self> {
        r.read_key_body(KeyType::DisplayInfo, &[1], |r, _| {
            Ok(DisplayInfo {
                r: r.read_u32()?,
                g: r.read_u32()?,
                b: r.read_u32()?,
                y_min: r.read_f64()?,
                y_max: r.read_f64()?,
            })
        })
    }

    pub(crate) fn write<W: FamosWrite>(&self, w: &mut KeyWriter<'_, '_, W>) -> Result<()> {
        w.write_key(
            KeyType::DisplayInfo,
            1,
            &[
                Token::UInt(self.r as u64),
                Token::UInt(self.g as u64),
                Token::UInt(self.b as u64),
                Token::Real(self.y_min),
                Token::Real(self.y_max),
            ],
        )?;
        Ok(())
    }
}
