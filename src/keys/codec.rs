//! Code-page aware string conversion.
//!
//! FAMOS strings are stored as raw bytes in the code page announced by the
//! `NL` key. The conversion itself is injected through [`TextCodec`] so
//! applications can plug in their own tables.

use crate::{Error, Result};
use encoding_rs::Encoding;

/// Converts between stored bytes and Rust strings for a given code page id.
pub trait TextCodec {
    /// Decode `bytes` stored in `code_page`.
    fn decode(&self, code_page: u32, bytes: &[u8]) -> Result<String>;

    /// Encode `text` for storage in `code_page`.
    fn encode(&self, code_page: u32, text: &str) -> Result<Vec<u8>>;
}

/// Default codec covering the Windows code pages imc software writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodePageCodec;

impl CodePageCodec {
    fn encoding(code_page: u32) -> Result<&'static Encoding> {
        let encoding = match code_page {
            866 => encoding_rs::IBM866,
            874 => encoding_rs::WINDOWS_874,
            932 => encoding_rs::SHIFT_JIS,
            936 => encoding_rs::GBK,
            949 => encoding_rs::EUC_KR,
            950 => encoding_rs::BIG5,
            1250 => encoding_rs::WINDOWS_1250,
            1251 => encoding_rs::WINDOWS_1251,
            // Latin-1 is a strict subset of 1252 for every printable character.
            1252 | 28591 => encoding_rs::WINDOWS_1252,
            1253 => encoding_rs::WINDOWS_1253,
            1254 => encoding_rs::WINDOWS_1254,
            1255 => encoding_rs::WINDOWS_1255,
            1256 => encoding_rs::WINDOWS_1256,
            1257 => encoding_rs::WINDOWS_1257,
            1258 => encoding_rs::WINDOWS_1258,
            65001 => encoding_rs::UTF_8,
            other => {
                return Err(Error::UnsupportedFeature(format!("code page {other}")));
            }
        };
        Ok(encoding)
    }
}

impl TextCodec for CodePageCodec {
    fn decode(&self, code_page: u32, bytes: &[u8]) -> Result<String> {
        let encoding = Self::encoding(code_page)?;
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(Error::Encoding(format!(
                "invalid byte sequence for code page {code_page}"
            )));
        }
        Ok(text.into_owned())
    }

    fn encode(&self, code_page: u32, text: &str) -> Result<Vec<u8>> {
        let encoding = Self::encoding(code_page)?;
        let (bytes, _, had_errors) = encoding.encode(text);
        if had_errors {
            return Err(Error::Encoding(format!(
                "{text:?} is not representable in code page {code_page}"
            )));
        }
        Ok(bytes.into_owned())
    }
}
