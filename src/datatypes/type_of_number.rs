use num_enum::TryFromPrimitive;

/// Type-of-number field, bits 6..4 of the type-of-address octet
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeOfNumber {
    Unknown = 0b000,
    International = 0b001,
    National = 0b010,
    NetworkSpecific = 0b011,
    SubscriberNumber = 0b100,
    Alphanumeric = 0b101,
    Abbreviated = 0b110,
    Reserved = 0b111,
}

impl TypeOfNumber {
    /// Extract the type of number from a raw type-of-address octet
    pub fn from_type_of_address(toa: u8) -> Self {
        // Three bits always map onto one of the eight variants
        TypeOfNumber::try_from((toa >> 4) & 0x07).unwrap_or(TypeOfNumber::Unknown)
    }
}
