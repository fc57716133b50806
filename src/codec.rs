// SMS PDU codec primitives
//
// Field readers over a `Cursor<&[u8]>` and the error type shared by every
// datatype decoder. The SMS-DELIVER layout itself lives in `datatypes::sms`;
// this module only knows how to pull bytes off the wire safely.

use bytes::Buf;
use hex::FromHexError;
use std::io::Cursor;
use thiserror::Error;

/// First-octet flag: the user data starts with a User Data Header
pub const TP_UDHI: u8 = 0x40;

/// Codec errors with enough context to point at the offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PduError {
    #[error("Invalid hex at offset {offset}: {reason}")]
    InvalidHex { offset: usize, reason: &'static str },

    #[error("Incomplete PDU: ran out of bytes reading '{field}'")]
    Incomplete { field: &'static str },

    #[error("Invalid service centre timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid user data header element {tag:#04x}: {reason}")]
    InvalidHeader { tag: u8, reason: String },

    #[error("Unsupported data coding scheme: {0:#04x}")]
    UnsupportedEncoding(u8),
}

/// Decode an ASCII hex string into raw bytes
///
/// Leading and trailing whitespace is ignored; both letter cases are accepted.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, PduError> {
    let text = text.trim();
    hex::decode(text).map_err(|err| match err {
        FromHexError::InvalidHexCharacter { index, .. } => PduError::InvalidHex {
            offset: index,
            reason: "not a hex digit",
        },
        FromHexError::OddLength | FromHexError::InvalidStringLength => PduError::InvalidHex {
            offset: text.len(),
            reason: "odd number of digits",
        },
    })
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<u8, PduError> {
    if buf.remaining() < 1 {
        return Err(PduError::Incomplete { field });
    }
    Ok(buf.get_u8())
}

/// Decode exactly `len` bytes
pub fn decode_bytes(
    buf: &mut Cursor<&[u8]>,
    len: usize,
    field: &'static str,
) -> Result<Vec<u8>, PduError> {
    if buf.remaining() < len {
        return Err(PduError::Incomplete { field });
    }
    let mut out = vec![0u8; len];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Skip `len` bytes without copying them
pub fn skip_bytes(buf: &mut Cursor<&[u8]>, len: usize, field: &'static str) -> Result<(), PduError> {
    if buf.remaining() < len {
        return Err(PduError::Incomplete { field });
    }
    buf.advance(len);
    Ok(())
}

/// Render `count` semi-octet digits, swapping the nibbles of every byte
///
/// `0x64 0x07` becomes `"4670"`. The extended BCD digits `*`, `#`, `a`, `b`
/// and `c` are kept; the `0xF` filler never appears within `count`.
pub fn semi_octet_digits(bytes: &[u8], count: usize) -> String {
    const DIGITS: &[u8; 16] = b"0123456789*#abcF";

    bytes
        .iter()
        .flat_map(|&byte| [byte & 0x0F, byte >> 4])
        .take(count)
        .map(|nibble| DIGITS[nibble as usize] as char)
        .collect()
}

/// Value of one swapped BCD byte, tens in the low nibble (`0x21` is 12)
pub fn bcd_unswap(byte: u8) -> u8 {
    (byte & 0x0F) * 10 + (byte >> 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_accepts_both_cases() {
        assert_eq!(decode_hex("0aFf").unwrap(), vec![0x0A, 0xFF]);
        assert_eq!(decode_hex("  00\r\n").unwrap(), vec![0x00]);
    }

    #[test]
    fn decode_hex_rejects_odd_length() {
        let err = decode_hex("ABC").unwrap_err();
        assert!(matches!(err, PduError::InvalidHex { offset: 3, .. }));
    }

    #[test]
    fn decode_hex_reports_bad_digit_offset() {
        let err = decode_hex("00G1").unwrap_err();
        assert_eq!(
            err,
            PduError::InvalidHex {
                offset: 2,
                reason: "not a hex digit"
            }
        );
    }

    #[test]
    fn decode_hex_offsets_ignore_surrounding_whitespace() {
        let err = decode_hex("  0G\r\n").unwrap_err();
        assert!(matches!(err, PduError::InvalidHex { offset: 1, .. }));

        let err = decode_hex(" 123 ").unwrap_err();
        assert_eq!(
            err,
            PduError::InvalidHex {
                offset: 3,
                reason: "odd number of digits"
            }
        );
    }

    #[test]
    fn field_readers_report_underrun() {
        let data = [0x01u8];
        let mut cursor = Cursor::new(&data[..]);

        assert_eq!(decode_u8(&mut cursor, "first").unwrap(), 0x01);
        assert_eq!(
            decode_u8(&mut cursor, "second"),
            Err(PduError::Incomplete { field: "second" })
        );
        assert_eq!(
            decode_bytes(&mut cursor, 2, "block"),
            Err(PduError::Incomplete { field: "block" })
        );
    }

    #[test]
    fn semi_octets_are_swapped() {
        let raw = [0x64, 0x07, 0x28, 0x19, 0x90, 0xF6];
        assert_eq!(semi_octet_digits(&raw, 11), "46708291096");
        assert_eq!(semi_octet_digits(&raw, 12), "46708291096F");
        assert_eq!(semi_octet_digits(&[0xBA], 2), "*#");
        assert_eq!(bcd_unswap(0x21), 12);
        assert_eq!(bcd_unswap(0x99), 99);
    }
}
