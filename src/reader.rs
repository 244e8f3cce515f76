//! Big-endian byte reads and Modified UTF-8 decoding/comparison.
//!
//! Every higher-level parser in `classfile.rs` funnels its reads through
//! this module, mirroring `original_source/readfunctions.c`'s `readu2`/
//! `readu4`/`nextUTF8Character` split.
use crate::error::{JvmResult, JvmStatus};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// Reads a big-endian `u16`, mapping EOF to `UnexpectedEof`.
pub fn read_u2(reader: &mut impl Read) -> JvmResult<u16> {
    reader
        .read_u16::<BigEndian>()
        .map_err(|_| JvmStatus::UnexpectedEof)
}

/// Reads a big-endian `u32`, mapping EOF to `UnexpectedEof`.
pub fn read_u4(reader: &mut impl Read) -> JvmResult<u32> {
    reader
        .read_u32::<BigEndian>()
        .map_err(|_| JvmStatus::UnexpectedEof)
}

/// Reads a single byte, mapping EOF to `UnexpectedEof`.
pub fn read_u1(reader: &mut impl Read) -> JvmResult<u8> {
    reader.read_u8().map_err(|_| JvmStatus::UnexpectedEof)
}

/// Decodes one Modified-UTF-8 scalar from `bytes`, returning the decoded
/// codepoint and the number of bytes consumed. Returns `None` on malformed
/// input, matching `nextUTF8Character`'s `used_bytes == 0` failure signal.
///
/// Java's Modified UTF-8 encodes NUL as the two-byte overlong sequence
/// `0xC0 0x80`, and encodes supplementary-plane characters as a surrogate
/// pair of three-byte sequences (CESU-8) rather than a single four-byte
/// sequence; both are handled here.
#[must_use]
pub fn next_utf8_character(bytes: &[u8]) -> Option<(u32, usize)> {
    let b0 = *bytes.first()?;

    if b0 & 0x80 == 0 {
        return Some((u32::from(b0), 1));
    }

    if b0 & 0xE0 == 0xC0 {
        let b1 = *bytes.get(1)?;
        if b1 & 0xC0 != 0x80 {
            return None;
        }
        let cp = (u32::from(b0 & 0x1F) << 6) | u32::from(b1 & 0x3F);
        return Some((cp, 2));
    }

    if b0 & 0xF0 == 0xE0 {
        let b1 = *bytes.get(1)?;
        let b2 = *bytes.get(2)?;
        if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
            return None;
        }
        let cp = (u32::from(b0 & 0x0F) << 12)
            | (u32::from(b1 & 0x3F) << 6)
            | u32::from(b2 & 0x3F);
        return Some((cp, 3));
    }

    None
}

/// Byte-exact comparison of a Modified UTF-8 slice against another.
#[must_use]
pub fn cmp_utf8(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Byte-exact comparison of a Modified UTF-8 slice against an ASCII string
/// literal (the common case: matching attribute/field names).
#[must_use]
pub fn cmp_utf8_ascii(a: &[u8], b: &str) -> bool {
    a == b.as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ascii() {
        assert_eq!(next_utf8_character(b"A"), Some((0x41, 1)));
    }

    #[test]
    fn decodes_two_byte_nul() {
        assert_eq!(next_utf8_character(&[0xC0, 0x80]), Some((0, 2)));
    }

    #[test]
    fn decodes_three_byte() {
        // U+20AC EURO SIGN
        assert_eq!(next_utf8_character(&[0xE2, 0x82, 0xAC]), Some((0x20AC, 3)));
    }

    #[test]
    fn rejects_truncated_sequence() {
        assert_eq!(next_utf8_character(&[0xE2, 0x82]), None);
    }

    #[test]
    fn rejects_bad_continuation() {
        assert_eq!(next_utf8_character(&[0xC0, 0x00]), None);
    }

    #[test]
    fn ascii_compare() {
        assert!(cmp_utf8_ascii(b"Code", "Code"));
        assert!(!cmp_utf8_ascii(b"Code", "code"));
    }
}
