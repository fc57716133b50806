// ABOUTME: Originating address decoding for SMS-DELIVER PDUs
// ABOUTME: Handles semi-octet swapped numbers and GSM 7-bit alphanumeric sender names

use crate::codec::{self, PduError};
use crate::datatypes::TypeOfNumber;
use crate::datatypes::gsm7;
use std::fmt;
use std::io::Cursor;

/// Originating address as carried in TP-OA
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// Raw type-of-address octet (`0x91` for an international ISDN number)
    pub type_of_address: u8,
    /// Decoded digits, or the sender name for alphanumeric addresses
    pub value: String,
}

impl Address {
    /// Decode length, type-of-address and value from the buffer
    ///
    /// The length octet counts semi-octets, so the value occupies
    /// `ceil(len / 2)` bytes.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, PduError> {
        let digits = codec::decode_u8(buf, "originating_address_length")? as usize;
        let type_of_address = codec::decode_u8(buf, "originating_address_type")?;
        let raw = codec::decode_bytes(buf, digits.div_ceil(2), "originating_address")?;

        let value = match TypeOfNumber::from_type_of_address(type_of_address) {
            TypeOfNumber::Alphanumeric => {
                let septets = gsm7::unpack_septets(&raw);
                let count = (digits * 4 / 7).min(septets.len());
                gsm7::decode_septets(&septets[..count])
            }
            _ => codec::semi_octet_digits(&raw, digits),
        };

        Ok(Address {
            type_of_address,
            value,
        })
    }

    pub fn type_of_number(&self) -> TypeOfNumber {
        TypeOfNumber::from_type_of_address(self.type_of_address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_of_number() {
            TypeOfNumber::International => write!(f, "+{}", self.value),
            _ => f.write_str(&self.value),
        }
    }
}
