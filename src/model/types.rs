//! Enumerations stored as integer codes in key payloads.

use crate::{Error, Result};

/// Numeric type of a component's values or of a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
    /// imc devices transitional recording.
    TransitionalRecording,
    /// ASCII timestamp.
    AsciiTimestamp,
    /// 16-bit word carrying digital lines.
    Digital16,
    /// Unsigned 48-bit integer.
    U48,
}

impl DataType {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => DataType::U8,
            2 => DataType::I8,
            3 => DataType::U16,
            4 => DataType::I16,
            5 => DataType::U32,
            6 => DataType::I32,
            7 => DataType::F32,
            8 => DataType::F64,
            9 => DataType::TransitionalRecording,
            10 => DataType::AsciiTimestamp,
            11 => DataType::Digital16,
            13 => DataType::U48,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        match self {
            DataType::U8 => 1,
            DataType::I8 => 2,
            DataType::U16 => 3,
            DataType::I16 => 4,
            DataType::U32 => 5,
            DataType::I32 => 6,
            DataType::F32 => 7,
            DataType::F64 => 8,
            DataType::TransitionalRecording => 9,
            DataType::AsciiTimestamp => 10,
            DataType::Digital16 => 11,
            DataType::U48 => 13,
        }
    }

    /// Size in bytes of one value, if the type has a fixed width.
    pub fn natural_width(self) -> Option<u32> {
        match self {
            DataType::U8 | DataType::I8 => Some(1),
            DataType::U16 | DataType::I16 | DataType::Digital16 => Some(2),
            DataType::U32 | DataType::I32 | DataType::F32 => Some(4),
            DataType::F64 => Some(8),
            DataType::U48 => Some(6),
            DataType::TransitionalRecording | DataType::AsciiTimestamp => None,
        }
    }

    /// Whether sample values of this type can be decoded.
    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            DataType::TransitionalRecording | DataType::AsciiTimestamp | DataType::Digital16
        )
    }
}

/// The six kinds of data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldType {
    /// Single channel or equidistant time signal.
    EquidistantTime,
    /// Values with a monotonously increasing time track.
    MonotonousTime,
    /// Characteristic curve: y over x.
    Xy,
    ComplexRealImaginary,
    ComplexMagnitudePhase,
    ComplexMagnitudeDbPhase,
}

impl FieldType {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => FieldType::EquidistantTime,
            2 => FieldType::MonotonousTime,
            3 => FieldType::Xy,
            4 => FieldType::ComplexRealImaginary,
            5 => FieldType::ComplexMagnitudePhase,
            6 => FieldType::ComplexMagnitudeDbPhase,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        match self {
            FieldType::EquidistantTime => 1,
            FieldType::MonotonousTime => 2,
            FieldType::Xy => 3,
            FieldType::ComplexRealImaginary => 4,
            FieldType::ComplexMagnitudePhase => 5,
            FieldType::ComplexMagnitudeDbPhase => 6,
        }
    }

    /// 1 for equidistant time, 2 for everything else.
    pub fn dimension(self) -> u32 {
        match self {
            FieldType::EquidistantTime => 1,
            _ => 2,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(
            self,
            FieldType::ComplexRealImaginary
                | FieldType::ComplexMagnitudePhase
                | FieldType::ComplexMagnitudeDbPhase
        )
    }
}

/// Position of a component within its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComponentRole {
    /// Y values, real part or magnitude.
    #[default]
    Primary,
    /// Time or x track, imaginary part or phase.
    Secondary,
}

impl ComponentRole {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ComponentRole::Primary),
            2 => Some(ComponentRole::Secondary),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            ComponentRole::Primary => 1,
            ComponentRole::Secondary => 2,
        }
    }
}

/// Compression declared by a raw block. Only `Uncompressed` can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompressionType {
    #[default]
    Uncompressed,
    /// Any other compression code, kept verbatim.
    Compressed(u32),
}

impl CompressionType {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => CompressionType::Uncompressed,
            other => CompressionType::Compressed(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            CompressionType::Uncompressed => 0,
            CompressionType::Compressed(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Origin {
    #[default]
    Original,
    Calculated,
}

impl Origin {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Origin::Original),
            1 => Some(Origin::Calculated),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Origin::Original => 0,
            Origin::Calculated => 1,
        }
    }
}

/// How the trigger time is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeMode {
    #[default]
    Local,
    Utc,
}

impl TimeMode {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(TimeMode::Local),
            1 => Some(TimeMode::Utc),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            TimeMode::Local => 0,
            TimeMode::Utc => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyType {
    #[default]
    String,
    Integer,
    Real,
    Boolean,
    TimeStamp,
}

impl PropertyType {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => PropertyType::String,
            1 => PropertyType::Integer,
            2 => PropertyType::Real,
            3 => PropertyType::Boolean,
            4 => PropertyType::TimeStamp,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        match self {
            PropertyType::String => 0,
            PropertyType::Integer => 1,
            PropertyType::Real => 2,
            PropertyType::Boolean => 3,
            PropertyType::TimeStamp => 4,
        }
    }
}

/// Physical arrangement of several components' values in one raw block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BufferAlignment {
    /// Each component occupies its own region, in declaration order.
    #[default]
    Continuous,
    /// One value per component per row, repeating.
    Interlaced,
}

/// Map a decoded code through `from_code`, reporting failures at `position`.
pub(crate) fn decode_code<T>(
    position: u64,
    what: &str,
    code: u32,
    from_code: impl FnOnce(u32) -> Option<T>,
) -> Result<T> {
    from_code(code).ok_or_else(|| Error::malformed(position, format!("invalid {what} {code}")))
}
