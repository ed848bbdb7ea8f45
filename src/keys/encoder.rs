// keys/encoder.rs
//! Key encoding.
//!
//! Each field becomes one comma-joined token; the key length is computed from
//! the encoded payload so it is always exact. Payloads whose content is not
//! known when the key is written (raw sample data) are reserved as a
//! [`Placeholder`] and filled in a later pass.

use super::{DEFAULT_CODE_PAGE, KeyType, TextCodec};
use crate::{Error, Result, writer::FamosWrite};

/// Zero bytes written per chunk when reserving a placeholder region.
const RESERVE_CHUNK: usize = 64 * 1024;

/// Longest real written in plain decimal notation.
const MAX_PLAIN_REAL: usize = 24;

/// One field of a key payload.
#[derive(Debug, Clone, Copy)]
pub enum Token<'a> {
    Int(i64),
    UInt(u64),
    Real(f64),
    /// Written as `0`/`1`.
    Bool(bool),
    /// Written as `0x%04X`.
    Hex(u32),
    /// Length-prefixed string in the active code page.
    Text(&'a str),
    /// Count followed by length-prefixed strings.
    TextArray(&'a [String]),
    /// Length-prefixed bytes.
    Blob(&'a [u8]),
    /// Bytes written verbatim without a length prefix.
    Fixed(&'a [u8]),
}

/// A region of the output reserved for content produced later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placeholder {
    /// Absolute offset of the first reserved byte.
    pub offset: u64,
    /// Number of reserved bytes.
    pub length: u64,
}

impl Placeholder {
    /// Overwrite `bytes` at `at` bytes into the reserved region.
    pub fn fill<W: FamosWrite + ?Sized>(&self, sink: &mut W, at: u64, bytes: &[u8]) -> Result<()> {
        let offset = self.absolute(at, bytes.len() as u64)?;
        sink.patch(offset, bytes)
    }

    /// Absolute offset of `length` bytes at `at`, if they lie inside the region.
    pub fn absolute(&self, at: u64, length: u64) -> Result<u64> {
        let end = at
            .checked_add(length)
            .ok_or_else(|| Error::InvalidArgument("placeholder write overflows".into()))?;
        if end > self.length {
            return Err(Error::InvalidArgument(format!(
                "write of {length} bytes at {at} exceeds reserved region of {} bytes",
                self.length
            )));
        }
        Ok(self.offset + at)
    }
}

/// Where a key landed in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLocation {
    /// Offset of the leading `|`.
    pub start: u64,
    /// Offset of the first payload byte.
    pub payload: u64,
}

/// Serializes keys into a [`FamosWrite`] sink.
pub struct KeyWriter<'a, 'c, W: FamosWrite> {
    sink: &'a mut W,
    code_page: u32,
    codec: &'c dyn TextCodec,
    line_breaks: bool,
}

impl<'a, 'c, W: FamosWrite> KeyWriter<'a, 'c, W> {
    pub fn new(sink: &'a mut W, codec: &'c dyn TextCodec) -> Self {
        Self {
            sink,
            code_page: DEFAULT_CODE_PAGE,
            codec,
            line_breaks: true,
        }
    }

    /// Whether a CRLF follows each key.
    pub fn with_line_breaks(mut self, line_breaks: bool) -> Self {
        self.line_breaks = line_breaks;
        self
    }

    pub fn code_page(&self) -> u32 {
        self.code_page
    }

    pub fn set_code_page(&mut self, code_page: u32) {
        self.code_page = code_page;
    }

    pub fn sink(&mut self) -> &mut W {
        &mut *self.sink
    }

    /// Encode a single token.
    fn encode_token(&self, token: &Token<'_>, out: &mut Vec<u8>) -> Result<()> {
        match token {
            Token::Int(v) => out.extend_from_slice(v.to_string().as_bytes()),
            Token::UInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
            Token::Real(v) => {
                if !v.is_finite() {
                    return Err(Error::InvalidArgument(format!(
                        "{v} cannot be stored in a FAMOS key"
                    )));
                }
                // Display never switches to an exponent; keep huge and tiny
                // magnitudes short enough for the reader's token limit.
                let text = v.to_string();
                if text.len() > MAX_PLAIN_REAL {
                    out.extend_from_slice(format!("{v:e}").as_bytes());
                } else {
                    out.extend_from_slice(text.as_bytes());
                }
            }
            Token::Bool(v) => out.push(if *v { b'1' } else { b'0' }),
            Token::Hex(v) => out.extend_from_slice(format!("0x{v:04X}").as_bytes()),
            Token::Text(text) => {
                let bytes = self.codec.encode(self.code_page, text)?;
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.push(b',');
                out.extend_from_slice(&bytes);
            }
            Token::TextArray(texts) => {
                out.extend_from_slice(texts.len().to_string().as_bytes());
                for text in texts.iter() {
                    out.push(b',');
                    self.encode_token(&Token::Text(text), out)?;
                }
            }
            Token::Blob(bytes) => {
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.push(b',');
                out.extend_from_slice(bytes);
            }
            Token::Fixed(bytes) => out.extend_from_slice(bytes),
        }
        Ok(())
    }

    fn encode_payload(&self, tokens: &[Token<'_>]) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                payload.push(b',');
            }
            self.encode_token(token, &mut payload)?;
        }
        Ok(payload)
    }

    fn write_prefix(&mut self, key: KeyType, version: u32, length: u64) -> Result<KeyLocation> {
        let code = key
            .code()
            .ok_or_else(|| Error::InvalidArgument("cannot write an unknown key".into()))?;
        let start = self.sink.position();
        let mut prefix = Vec::with_capacity(16);
        prefix.push(b'|');
        prefix.extend_from_slice(code);
        prefix.extend_from_slice(format!(",{version},{length},").as_bytes());
        self.sink.write_all(&prefix)?;
        Ok(KeyLocation {
            start,
            payload: self.sink.position(),
        })
    }

    fn write_terminator(&mut self) -> Result<()> {
        if self.line_breaks {
            self.sink.write_all(b";\r\n")
        } else {
            self.sink.write_all(b";")
        }
    }

    /// Write a complete key.
    pub fn write_key(
        &mut self,
        key: KeyType,
        version: u32,
        tokens: &[Token<'_>],
    ) -> Result<KeyLocation> {
        let payload = self.encode_payload(tokens)?;
        let location = self.write_prefix(key, version, payload.len() as u64)?;
        self.sink.write_all(&payload)?;
        self.write_terminator()?;
        Ok(location)
    }

    /// Write a key whose payload ends in `reserved` bytes to be filled later.
    ///
    /// The reserved region is zero-initialised so an unfilled placeholder
    /// still yields a well-formed file.
    pub fn write_key_with_placeholder(
        &mut self,
        key: KeyType,
        version: u32,
        tokens: &[Token<'_>],
        reserved: u64,
    ) -> Result<Placeholder> {
        let mut payload = self.encode_payload(tokens)?;
        payload.push(b',');
        let length = payload.len() as u64 + reserved;
        self.write_prefix(key, version, length)?;
        self.sink.write_all(&payload)?;

        let placeholder = Placeholder {
            offset: self.sink.position(),
            length: reserved,
        };
        let zeros = vec![0u8; RESERVE_CHUNK.min(reserved as usize)];
        let mut remaining = reserved;
        while remaining > 0 {
            let n = remaining.min(zeros.len() as u64) as usize;
            self.sink.write_all(&zeros[..n])?;
            remaining -= n as u64;
        }
        self.write_terminator()?;
        Ok(placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::CodePageCodec;
    use crate::writer::VecWriter;

    #[test]
    fn length_counts_payload_without_terminator() {
        let mut sink = VecWriter::new();
        KeyWriter::new(&mut sink, &CodePageCodec)
            .write_key(KeyType::Format, 2, &[Token::Int(1)])
            .unwrap();
        assert_eq!(sink.as_slice(), b"|CF,2,1,1;\r\n");
    }

    #[test]
    fn strings_are_prefixed_with_byte_length() {
        let mut sink = VecWriter::new();
        KeyWriter::new(&mut sink, &CodePageCodec)
            .with_line_breaks(false)
            .write_key(
                KeyType::Group,
                1,
                &[Token::Int(1), Token::Text("Gen,erator"), Token::Text("")],
            )
            .unwrap();
        assert_eq!(sink.as_slice(), b"|CB,1,18,1,10,Gen,erator,0,;");
    }

    #[test]
    fn reals_round_trip_exactly() {
        let mut sink = VecWriter::new();
        let value = 0.1 + 0.2;
        KeyWriter::new(&mut sink, &CodePageCodec)
            .with_line_breaks(false)
            .write_key(KeyType::DisplayInfo, 1, &[Token::Real(value)])
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let field = &text["|ND,1,19,".len()..text.len() - 1];
        assert_eq!(field.parse::<f64>().unwrap(), value);
    }

    #[test]
    fn extreme_reals_switch_to_exponent_notation() {
        for value in [f64::MAX, -f64::MAX, 1e-300, f64::MIN_POSITIVE, 1e200] {
            let mut sink = VecWriter::new();
            KeyWriter::new(&mut sink, &CodePageCodec)
                .with_line_breaks(false)
                .write_key(KeyType::DisplayInfo, 1, &[Token::Real(value)])
                .unwrap();
            let text = String::from_utf8(sink.into_inner()).unwrap();
            let field = text.rsplit(',').next().unwrap().trim_end_matches(';');
            assert!(field.contains('e'), "{field}");
            assert!(field.len() <= 32);
            assert_eq!(field.parse::<f64>().unwrap(), value);
        }
    }

    #[test]
    fn placeholder_reserves_and_fills() {
        let mut sink = VecWriter::new();
        let placeholder = KeyWriter::new(&mut sink, &CodePageCodec)
            .with_line_breaks(false)
            .write_key_with_placeholder(KeyType::RawBlock, 1, &[Token::Int(1)], 4)
            .unwrap();
        assert_eq!(placeholder.offset, 10);
        placeholder.fill(&mut sink, 1, &[7, 8]).unwrap();
        assert_eq!(sink.as_slice(), b"|CS,1,6,1,\x00\x07\x08\x00;");
        assert!(placeholder.fill(&mut sink, 3, &[1, 2]).is_err());
    }

    #[test]
    fn non_finite_reals_are_rejected() {
        let mut sink = VecWriter::new();
        let err = KeyWriter::new(&mut sink, &CodePageCodec).write_key(
            KeyType::DisplayInfo,
            1,
            &[Token::Real(f64::NAN)],
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }
}
