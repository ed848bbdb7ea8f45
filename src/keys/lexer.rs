// keys/lexer.rs
//! Framing and field decoding for the key stream.
//!
//! The grammar is not self-terminating: raw sample payloads may contain any
//! byte, including `,`, `;` and `|`. The lexer therefore never scans for
//! delimiters across a key boundary. It trusts the declared key length and
//! seeks over payloads it does not interpret.

use super::{DEFAULT_CODE_PAGE, KEY_TYPE_SIZE, KeyType, TextCodec};
use crate::{Error, Result};
use std::io::{BufRead, ErrorKind, Read, Seek};

/// Longest numeric token accepted before the stream is considered garbage.
const MAX_NUMBER_TOKEN: usize = 128;

/// Version and length of the key currently being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBody {
    pub key: KeyType,
    pub version: u32,
    /// Payload bytes, excluding the closing `;`.
    pub length: u64,
    /// Stream offset of the first payload byte.
    pub start: u64,
}

impl KeyBody {
    /// Offset just past the closing `;`.
    ///
    /// [`KeyReader::read_key_body`] rejects lengths for which this overflows.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length).saturating_add(1)
    }
}

/// Reads keys and their fields from a seekable byte stream.
///
/// The reader carries the active code page; it starts at
/// [`DEFAULT_CODE_PAGE`] and is switched when the language key is parsed.
pub struct KeyReader<'c, R> {
    inner: R,
    position: u64,
    code_page: u32,
    codec: &'c dyn TextCodec,
}

impl<'c, R: BufRead + Seek> KeyReader<'c, R> {
    /// Wrap `inner`, which must be positioned at the start of the key stream.
    pub fn new(mut inner: R, codec: &'c dyn TextCodec) -> Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self {
            inner,
            position,
            code_page: DEFAULT_CODE_PAGE,
            codec,
        })
    }

    /// Current absolute stream offset.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn code_page(&self) -> u32 {
        self.code_page
    }

    pub fn set_code_page(&mut self, code_page: u32) {
        self.code_page = code_page;
    }

    /// Give the underlying stream back.
    pub fn into_inner(self) -> R {
        self.inner
    }

    // ------------------------------------------------------------------------
    // Framing
    // ------------------------------------------------------------------------

    /// Lex the next `|XX,` prefix.
    ///
    /// Returns `Ok(None)` at a clean end of stream. Unrecognised codes yield
    /// [`KeyType::Unknown`]; the caller decides whether to skip them.
    pub fn next_key_type(&mut self) -> Result<Option<KeyType>> {
        self.consume_whitespace()?;
        if self.peek_byte()?.is_none() {
            return Ok(None);
        }

        let start = self.position;
        let mut prefix = [0u8; 4];
        self.read_exact(&mut prefix)?;

        if prefix[0] != b'|' || prefix[3] != b',' {
            return Err(Error::malformed(
                start,
                format!(
                    "expected key prefix '|XX,', found {:?}",
                    String::from_utf8_lossy(&prefix)
                ),
            ));
        }
        if !prefix[1].is_ascii_alphabetic() || !prefix[2].is_ascii_alphabetic() {
            return Err(Error::malformed(start, "key code must be two letters"));
        }

        let key = KeyType::from_code([prefix[1], prefix[2]]);
        log::trace!("key {} at byte {}", key, start);
        Ok(Some(key))
    }

    /// Step back over the prefix returned by the last [`next_key_type`](Self::next_key_type).
    pub fn rewind_key_type(&mut self) -> Result<()> {
        self.seek_relative(-KEY_TYPE_SIZE)
    }

    /// Consume the rest of a key whose prefix has already been lexed.
    pub fn skip_key(&mut self) -> Result<()> {
        let start = self.position;
        let _version = self.read_u32()?;
        let length = self.read_u64()?;
        let skip = i64::try_from(length)
            .map_err(|_| Error::malformed(start, "key length out of range"))?;
        self.seek_relative(skip)?;
        self.expect_byte(b';')?;
        self.consume_whitespace()
    }

    /// Lex the next key, require it to be `key`, and decode its body.
    pub fn expect_key<T>(
        &mut self,
        key: KeyType,
        versions: &[u32],
        body: impl FnOnce(&mut Self, KeyBody) -> Result<T>,
    ) -> Result<T> {
        let start = self.position;
        match self.next_key_type()? {
            Some(found) if found == key => self.read_key_body(key, versions, body),
            Some(found) => Err(Error::malformed(
                start,
                format!("expected key {key}, found {found}"),
            )),
            None => Err(Error::TruncatedStream { position: start }),
        }
    }

    /// Decode the body of a key whose prefix has already been lexed.
    ///
    /// Reads the version and length fields, hands the payload to `body`, then
    /// checks the declared length against what was consumed. Fields a newer
    /// revision appended after the ones `body` understands are skipped.
    pub fn read_key_body<T>(
        &mut self,
        key: KeyType,
        versions: &[u32],
        body: impl FnOnce(&mut Self, KeyBody) -> Result<T>,
    ) -> Result<T> {
        let version_pos = self.position;
        let version = self.read_u32()?;
        if !versions.contains(&version) {
            return Err(Error::malformed(
                version_pos,
                format!("unsupported version {version} for key {key}"),
            ));
        }
        let length_pos = self.position;
        let length = self.read_u64()?;
        if self.position.checked_add(length).and_then(|end| end.checked_add(1)).is_none()
            || i64::try_from(length).is_err()
        {
            return Err(Error::malformed(
                length_pos,
                format!("key {key} declares an impossible length of {length} bytes"),
            ));
        }
        let header = KeyBody {
            key,
            version,
            length,
            start: self.position,
        };

        let value = body(self, header)?;

        let end = header.end();
        if self.position > end {
            return Err(Error::malformed(
                header.start,
                format!(
                    "key {key} overruns its declared length of {length} bytes by {}",
                    self.position - end
                ),
            ));
        }
        if self.position < end {
            let rest = i64::try_from(end - self.position - 1)
                .map_err(|_| Error::malformed(header.start, "key length out of range"))?;
            self.seek_relative(rest)?;
            self.expect_byte(b';')?;
        }
        self.consume_whitespace()?;
        Ok(value)
    }

    // ------------------------------------------------------------------------
    // Field decoding
    // ------------------------------------------------------------------------

    /// Read one field up to its `,` or `;` terminator.
    fn read_token(&mut self) -> Result<Vec<u8>> {
        let start = self.position;
        let mut token = Vec::new();
        loop {
            let byte = self.read_byte()?;
            match byte {
                b',' | b';' => return Ok(token),
                _ if token.len() >= MAX_NUMBER_TOKEN => {
                    return Err(Error::malformed(start, "unterminated field"));
                }
                _ => token.push(byte),
            }
        }
    }

    fn read_number_text(&mut self) -> Result<(u64, String)> {
        let start = self.position;
        let token = self.read_token()?;
        let text = core::str::from_utf8(&token)
            .map_err(|_| Error::malformed(start, "numeric field is not ASCII"))?
            .trim()
            .to_string();
        Ok((start, text))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let (start, text) = self.read_number_text()?;
        text.parse()
            .map_err(|_| Error::malformed(start, format!("invalid integer {text:?}")))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let (start, text) = self.read_number_text()?;
        text.parse()
            .map_err(|_| Error::malformed(start, format!("invalid unsigned integer {text:?}")))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let (start, text) = self.read_number_text()?;
        text.parse()
            .map_err(|_| Error::malformed(start, format!("invalid integer {text:?}")))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let (start, text) = self.read_number_text()?;
        text.parse()
            .map_err(|_| Error::malformed(start, format!("invalid unsigned integer {text:?}")))
    }

    /// A `0`/`1` flag.
    pub fn read_bool(&mut self) -> Result<bool> {
        let start = self.position;
        match self.read_i32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::malformed(start, format!("invalid flag {other}"))),
        }
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let (start, text) = self.read_number_text()?;
        text.parse()
            .map_err(|_| Error::malformed(start, format!("invalid real {text:?}")))
    }

    /// A hexadecimal integer, with or without `0x` prefix.
    pub fn read_hex(&mut self) -> Result<u32> {
        let (start, text) = self.read_number_text()?;
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(&text);
        u32::from_str_radix(digits, 16)
            .map_err(|_| Error::malformed(start, format!("invalid hex value {text:?}")))
    }

    /// A length-prefixed byte blob.
    pub fn read_blob(&mut self) -> Result<Vec<u8>> {
        let length = self.read_u64()?;
        let bytes = self.read_declared(length)?;
        self.read_separator()?;
        Ok(bytes)
    }

    /// Exactly `length` raw bytes followed by a separator.
    pub fn read_fixed_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let bytes = self.read_declared(length as u64)?;
        self.read_separator()?;
        Ok(bytes)
    }

    /// A length-prefixed string in the active code page.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_blob()?;
        self.codec.decode(self.code_page, &bytes)
    }

    /// A count followed by that many length-prefixed strings.
    pub fn read_string_array(&mut self) -> Result<Vec<String>> {
        let count = self.read_u32()?;
        let mut strings = Vec::new();
        for _ in 0..count {
            strings.push(self.read_string()?);
        }
        Ok(strings)
    }

    /// Consume a `,` or `;`.
    pub fn read_separator(&mut self) -> Result<()> {
        let start = self.position;
        match self.read_byte()? {
            b',' | b';' => Ok(()),
            other => Err(Error::malformed(
                start,
                format!("expected separator, found {:?}", other as char),
            )),
        }
    }

    /// Skip `length` payload bytes without looking at them.
    pub fn skip_bytes(&mut self, length: u64) -> Result<()> {
        let length = i64::try_from(length)
            .map_err(|_| Error::malformed(self.position, "skip length out of range"))?;
        self.seek_relative(length)
    }

    // ------------------------------------------------------------------------
    // Byte level helpers
    // ------------------------------------------------------------------------

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        let buf = self.inner.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn read_byte(&mut self) -> Result<u8> {
        match self.peek_byte()? {
            Some(byte) => {
                self.inner.consume(1);
                self.position += 1;
                Ok(byte)
            }
            None => Err(Error::TruncatedStream {
                position: self.position,
            }),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Error::TruncatedStream {
                position: self.position,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a length taken from the stream. The buffer grows with the bytes
    /// actually present, so a bogus length ends in `TruncatedStream`.
    fn read_declared(&mut self, length: u64) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let read = (&mut self.inner).take(length).read_to_end(&mut bytes)?;
        self.position += read as u64;
        if (read as u64) < length {
            return Err(Error::TruncatedStream {
                position: self.position,
            });
        }
        Ok(bytes)
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        let start = self.position;
        let found = self.read_byte()?;
        if found != expected {
            return Err(Error::malformed(
                start,
                format!("expected {:?}, found {:?}", expected as char, found as char),
            ));
        }
        Ok(())
    }

    /// Skip whitespace up to, not including, the next `|`.
    fn consume_whitespace(&mut self) -> Result<()> {
        while let Some(byte) = self.peek_byte()? {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.inner.consume(1);
            self.position += 1;
        }
        Ok(())
    }

    fn seek_relative(&mut self, offset: i64) -> Result<()> {
        let target = self
            .position
            .checked_add_signed(offset)
            .ok_or_else(|| Error::malformed(self.position, "seek before start of stream"))?;
        self.inner.seek_relative(offset)?;
        self.position = target;
        Ok(())
    }
}
