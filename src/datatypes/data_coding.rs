// ABOUTME: Data coding scheme selection for received SMS user data
// ABOUTME: Maps the TP-DCS octet onto the two alphabets the decoder implements

use crate::codec::PduError;
use std::fmt;

/// Alphabet of the user data, selected by TP-DCS
///
/// Only the general data coding group without compression is handled:
/// `0x00..=0x03` is the GSM 7-bit default alphabet and `0x08..=0x0B` is
/// UCS-2/UTF-16. The low two bits carry the message class and are ignored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DataCoding {
    /// GSM 7-bit default alphabet, packed
    Gsm7Bit,
    /// UTF-16 big-endian code units
    Ucs2,
}

impl DataCoding {
    /// Select the alphabet for a raw TP-DCS value
    pub fn from_byte(dcs: u8) -> Result<Self, PduError> {
        match dcs {
            0x00..=0x03 => Ok(DataCoding::Gsm7Bit),
            0x08..=0x0B => Ok(DataCoding::Ucs2),
            other => Err(PduError::UnsupportedEncoding(other)),
        }
    }

    pub fn charset_name(&self) -> &'static str {
        match self {
            DataCoding::Gsm7Bit => "GSM 7-bit Default",
            DataCoding::Ucs2 => "UCS-2",
        }
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.charset_name())
    }
}
