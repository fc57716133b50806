// ABOUTME: TP-SCTS service centre timestamp decoding into chrono fixed-offset datetimes
// ABOUTME: Seven semi-octet swapped bytes: YY MM DD hh mm ss and a quarter-hour zone offset

use crate::codec::{self, PduError};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use std::io::Cursor;

/// Encoded size of TP-SCTS
pub const SCTS_SIZE: usize = 7;

/// Sign bit of the time zone octet (bit 3 of the tens semi-octet)
const TZ_NEGATIVE: u8 = 0x08;

/// Decode the 7-byte service centre timestamp
///
/// Two-digit years are taken as 20YY.
pub fn decode_timestamp(buf: &mut Cursor<&[u8]>) -> Result<DateTime<FixedOffset>, PduError> {
    let raw = codec::decode_bytes(buf, SCTS_SIZE, "service_centre_timestamp")?;

    let mut fields = [0u8; 6];
    for (field, &byte) in fields.iter_mut().zip(&raw[..6]) {
        if byte & 0x0F > 9 || byte >> 4 > 9 {
            return Err(PduError::InvalidTimestamp(format!(
                "non-decimal semi-octet {byte:#04x}"
            )));
        }
        *field = codec::bcd_unswap(byte);
    }
    let [year, month, day, hour, minute, second] = fields;

    let offset = decode_zone(raw[6])?;

    let naive = NaiveDate::from_ymd_opt(2000 + year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| {
            PduError::InvalidTimestamp(format!(
                "{year:02}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} is not a valid date"
            ))
        })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| PduError::InvalidTimestamp("ambiguous local time".to_string()))
}

/// Offset from UTC in quarter hours, sign in bit 3 of the raw octet
fn decode_zone(byte: u8) -> Result<FixedOffset, PduError> {
    let quarters = (byte & 0x07) as i32 * 10 + (byte >> 4) as i32;
    let seconds = quarters * 15 * 60;
    let seconds = if byte & TZ_NEGATIVE != 0 { -seconds } else { seconds };

    FixedOffset::east_opt(seconds)
        .ok_or_else(|| PduError::InvalidTimestamp(format!("zone offset {quarters} quarter hours")))
}
