//! Typed sample values.

use crate::model::DataType;
use crate::{Error, Result};

/// Decoded values of one component, typed by its pack info data type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelValues {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    /// 48-bit unsigned values widened to `u64`.
    U48(Vec<u64>),
}

macro_rules! decode_le {
    ($values:expr, $ty:ty, $size:expr) => {
        $values
            .iter()
            .map(|v| {
                let mut raw = [0u8; $size];
                raw.copy_from_slice(v);
                <$ty>::from_le_bytes(raw)
            })
            .collect()
    };
}

impl ChannelValues {
    /// Decode little-endian values, one slice per value.
    pub(crate) fn decode(data_type: DataType, values: &[&[u8]]) -> Result<Self> {
        Ok(match data_type {
            DataType::U8 => ChannelValues::U8(values.iter().map(|v| v[0]).collect()),
            DataType::I8 => ChannelValues::I8(values.iter().map(|v| v[0] as i8).collect()),
            DataType::U16 => ChannelValues::U16(decode_le!(values, u16, 2)),
            DataType::I16 => ChannelValues::I16(decode_le!(values, i16, 2)),
            DataType::U32 => ChannelValues::U32(decode_le!(values, u32, 4)),
            DataType::I32 => ChannelValues::I32(decode_le!(values, i32, 4)),
            DataType::F32 => ChannelValues::F32(decode_le!(values, f32, 4)),
            DataType::F64 => ChannelValues::F64(decode_le!(values, f64, 8)),
            DataType::U48 => ChannelValues::U48(
                values
                    .iter()
                    .map(|v| {
                        let mut raw = [0u8; 8];
                        raw[..6].copy_from_slice(v);
                        u64::from_le_bytes(raw)
                    })
                    .collect(),
            ),
            other => {
                return Err(Error::UnsupportedFeature(format!(
                    "decoding {other:?} values"
                )));
            }
        })
    }

    pub fn len(&self) -> usize {
        match self {
            ChannelValues::U8(v) => v.len(),
            ChannelValues::I8(v) => v.len(),
            ChannelValues::U16(v) => v.len(),
            ChannelValues::I16(v) => v.len(),
            ChannelValues::U32(v) => v.len(),
            ChannelValues::I32(v) => v.len(),
            ChannelValues::F32(v) => v.len(),
            ChannelValues::F64(v) => v.len(),
            ChannelValues::U48(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All values widened to `f64`, without calibration.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            ChannelValues::U8(v) => v.iter().map(|x| *x as f64).collect(),
            ChannelValues::I8(v) => v.iter().map(|x| *x as f64).collect(),
            ChannelValues::U16(v) => v.iter().map(|x| *x as f64).collect(),
            ChannelValues::I16(v) => v.iter().map(|x| *x as f64).collect(),
            ChannelValues::U32(v) => v.iter().map(|x| *x as f64).collect(),
            ChannelValues::I32(v) => v.iter().map(|x| *x as f64).collect(),
            ChannelValues::F32(v) => v.iter().map(|x| *x as f64).collect(),
            ChannelValues::F64(v) => v.clone(),
            ChannelValues::U48(v) => v.iter().map(|x| *x as f64).collect(),
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ChannelValues::F64(v) => Some(v),
            _ => None,
        }
    }
}

/// A value type that can be written into a component.
pub trait Sample: Copy {
    /// The pack info data type this sample type is stored as.
    const DATA_TYPE: DataType;

    fn write_le(&self, out: &mut Vec<u8>);
}

macro_rules! impl_sample {
    ($($ty:ty => $data_type:ident),* $(,)?) => {
        $(
            impl Sample for $ty {
                const DATA_TYPE: DataType = DataType::$data_type;

                #[inline]
                fn write_le(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_sample! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    f64 => F64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian() {
        let raw = [1u8, 0, 0xFF, 0xFF];
        let values: Vec<&[u8]> = raw.chunks(2).collect();
        assert_eq!(
            ChannelValues::decode(DataType::I16, &values).unwrap(),
            ChannelValues::I16(vec![1, -1])
        );
    }

    #[test]
    fn u48_is_widened() {
        let raw = [1u8, 0, 0, 0, 0, 1];
        assert_eq!(
            ChannelValues::decode(DataType::U48, &[&raw]).unwrap(),
            ChannelValues::U48(vec![(1 << 40) + 1])
        );
    }

    #[test]
    fn digital_words_are_not_decoded() {
        assert!(matches!(
            ChannelValues::decode(DataType::Digital16, &[]),
            Err(Error::UnsupportedFeature(_))
        ));
    }
}
