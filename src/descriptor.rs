//! Field and method descriptor parsing.
//!
//! Hand-written recursive-descent over raw Modified UTF-8 bytes, grounded in
//! `original_source/readfunctions.c: readFieldDescriptor/readMethodDescriptor`.
//! A regular-expression crate can't report partial-match consumed-byte
//! counts, which both functions below depend on (the method descriptor
//! parser re-invokes the field descriptor parser at each parameter boundary
//! and needs to know exactly how far it advanced), so this stays a plain
//! byte walk instead of pulling in `regex`.
use crate::reader::next_utf8_character;

/// Parses one field descriptor from the front of `bytes`. Returns the
/// number of bytes consumed, or `0` if `bytes` does not begin with a valid
/// field descriptor. When `check_identifier` is set, the class-name portion
/// of an `L...;` descriptor is validated as a slash-separated identifier.
#[must_use]
pub fn read_field_descriptor(bytes: &[u8], check_identifier: bool) -> usize {
    let mut offset = 0;
    let mut ch;

    loop {
        let Some((c, used)) = next_utf8_character(&bytes[offset..]) else {
            return 0;
        };
        offset += used;
        ch = c;
        if ch != u32::from(b'[') {
            break;
        }
    }

    match ch {
        c if c <= 0x7f
            && matches!(
                c as u8,
                b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z'
            ) =>
        {
            offset
        }
        c if c == u32::from(b'L') => {
            let identifier_begin = offset;
            let mut identifier_len = 0usize;
            loop {
                let Some((c2, used)) = next_utf8_character(&bytes[offset..]) else {
                    return 0;
                };
                offset += used;
                identifier_len += used;
                if c2 == u32::from(b';') {
                    break;
                }
            }
            if check_identifier
                && !is_valid_java_identifier(
                    &bytes[identifier_begin..identifier_begin + identifier_len - 1],
                )
            {
                return 0;
            }
            offset
        }
        _ => 0,
    }
}

/// Parses one method descriptor `(ParamDescriptors)ReturnDescriptor` from
/// the front of `bytes`, requiring the entire slice to be consumed. Returns
/// the number of bytes consumed (== `bytes.len()`), or `0` on any mismatch.
#[must_use]
pub fn read_method_descriptor(bytes: &[u8], check_identifier: bool) -> usize {
    let Some((c, used)) = next_utf8_character(bytes) else {
        return 0;
    };
    if c != u32::from(b'(') {
        return 0;
    }
    let mut offset = used;

    loop {
        let field_len = read_field_descriptor(&bytes[offset..], check_identifier);
        if field_len == 0 {
            let Some((c2, used2)) = next_utf8_character(&bytes[offset..]) else {
                return 0;
            };
            if c2 != u32::from(b')') {
                return 0;
            }
            offset += used2;
            break;
        }
        offset += field_len;
    }

    let ret_len = read_field_descriptor(&bytes[offset..], true);
    if ret_len == 0 {
        let Some((c2, used2)) = next_utf8_character(&bytes[offset..]) else {
            return 0;
        };
        if c2 != u32::from(b'V') {
            return 0;
        }
        offset += used2;
    } else {
        offset += ret_len;
    }

    if offset == bytes.len() {
        offset
    } else {
        0
    }
}

/// Counts the invocation argument slot total for a method descriptor's
/// parameter section (the parenthesized part only), treating `J`/`D` as two
/// slots and everything else as one. Grounded in
/// `original_source/src/jvm.c: getMethodDescriptorParameterCount`.
#[must_use]
pub fn method_descriptor_parameter_count(descriptor: &[u8]) -> usize {
    debug_assert_eq!(descriptor.first(), Some(&b'('));
    let mut offset = 1;
    let mut count = 0usize;

    while offset < descriptor.len() && descriptor[offset] != b')' {
        match descriptor[offset] {
            b'J' | b'D' => {
                count += 2;
                offset += 1;
            }
            b'L' => {
                count += 1;
                while offset < descriptor.len() && descriptor[offset] != b';' {
                    offset += 1;
                }
                offset += 1;
            }
            b'[' => {
                count += 1;
                while offset < descriptor.len() && descriptor[offset] == b'[' {
                    offset += 1;
                }
                if offset < descriptor.len() && descriptor[offset] == b'L' {
                    while offset < descriptor.len() && descriptor[offset] != b';' {
                        offset += 1;
                    }
                }
                offset += 1;
            }
            _ => {
                count += 1;
                offset += 1;
            }
        }
    }

    count
}

/// Validates a slash-separated internal class name: every path component is
/// a non-empty run of characters that doesn't contain `.`, `;`, `[`, or `/`.
#[must_use]
pub fn is_valid_java_identifier(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    bytes
        .split(|&b| b == b'/')
        .all(|part| !part.is_empty() && !part.iter().any(|&b| matches!(b, b'.' | b';' | b'[')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitive_field_descriptor() {
        assert_eq!(read_field_descriptor(b"I", true), 1);
        assert_eq!(read_field_descriptor(b"J", true), 1);
    }

    #[test]
    fn parses_array_field_descriptor() {
        assert_eq!(read_field_descriptor(b"[[I", true), 3);
    }

    #[test]
    fn parses_class_field_descriptor() {
        assert_eq!(read_field_descriptor(b"Ljava/lang/String;", true), 18);
    }

    #[test]
    fn rejects_malformed_field_descriptor() {
        assert_eq!(read_field_descriptor(b"Q", true), 0);
        assert_eq!(read_field_descriptor(b"Ljava/lang/String", true), 0);
    }

    #[test]
    fn parses_method_descriptor() {
        assert_eq!(read_method_descriptor(b"(II)I", true), 5);
        assert_eq!(read_method_descriptor(b"()V", true), 3);
        assert_eq!(
            read_method_descriptor(b"([Ljava/lang/String;)V", true),
            22
        );
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert_eq!(read_method_descriptor(b"(I)Ix", true), 0);
    }

    #[test]
    fn counts_parameter_slots() {
        assert_eq!(method_descriptor_parameter_count(b"(IJD)V"), 5);
        assert_eq!(
            method_descriptor_parameter_count(b"(Ljava/lang/String;I)V"),
            2
        );
        assert_eq!(method_descriptor_parameter_count(b"([I[[JD)V"), 4);
    }
}
