// ABOUTME: SMS-DELIVER PDU decoding from the hex form listed by the modem
// ABOUTME: Combines address, timestamp, header and alphabet decoders into one Sms record

use crate::codec::{self, PduError, TP_UDHI};
use crate::datatypes::gsm7;
use crate::datatypes::user_data_header::{self, Concatenation, HeaderElement};
use crate::datatypes::{Address, DataCoding, timestamp};
use bytes::Buf;
use chrono::{DateTime, FixedOffset};
use std::io::Cursor;
use tracing::trace;

/// A received short message decoded from an SMS-DELIVER TPDU
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sms {
    /// First octet of the TPDU (message type and flags)
    pub first_octet: u8,
    pub originating_address: Address,
    pub protocol_identifier: u8,
    /// Raw TP-DCS value
    pub data_coding_scheme: u8,
    pub service_centre_timestamp: DateTime<FixedOffset>,
    /// Information elements of the User Data Header, in wire order
    pub header: Vec<HeaderElement>,
    pub text: String,
}

impl Sms {
    /// Decode one PDU line as printed by `AT+CMGL` in PDU mode
    ///
    /// The line starts with the SMSC address block, which is skipped.
    pub fn decode(hex: &str) -> Result<Sms, PduError> {
        let bytes = codec::decode_hex(hex)?;
        let mut buf = Cursor::new(bytes.as_slice());

        let smsc_len = codec::decode_u8(&mut buf, "smsc_length")?;
        codec::skip_bytes(&mut buf, smsc_len as usize, "smsc_address")?;

        Self::decode_tpdu(&mut buf)
    }

    /// Decode the TPDU part, starting at the first octet
    pub fn decode_tpdu(buf: &mut Cursor<&[u8]>) -> Result<Sms, PduError> {
        let first_octet = codec::decode_u8(buf, "first_octet")?;
        let originating_address = Address::decode(buf)?;
        let protocol_identifier = codec::decode_u8(buf, "protocol_identifier")?;
        let data_coding_scheme = codec::decode_u8(buf, "data_coding_scheme")?;
        let service_centre_timestamp = timestamp::decode_timestamp(buf)?;
        let user_data_length = codec::decode_u8(buf, "user_data_length")? as usize;

        // The header length octet is part of the header for septet alignment
        let mut header_block = Vec::new();
        if first_octet & TP_UDHI != 0 {
            let header_len = codec::decode_u8(buf, "user_data_header_length")?;
            header_block.push(header_len);
            header_block.extend(codec::decode_bytes(
                buf,
                header_len as usize,
                "user_data_header",
            )?);
        }
        let header = match header_block.split_first() {
            Some((_, elements)) => user_data_header::decode_header(elements)?,
            None => Vec::new(),
        };

        let coding = DataCoding::from_byte(data_coding_scheme)?;
        let payload = buf.chunk();
        trace!(
            "{} user data, {} header octets, {} payload octets",
            coding,
            header_block.len(),
            payload.len()
        );
        let text = match coding {
            DataCoding::Gsm7Bit => decode_gsm7_user_data(&header_block, payload, user_data_length),
            DataCoding::Ucs2 => {
                let octets = user_data_length.saturating_sub(header_block.len());
                decode_ucs2_user_data(payload, octets)?
            }
        };

        Ok(Sms {
            first_octet,
            originating_address,
            protocol_identifier,
            data_coding_scheme,
            service_centre_timestamp,
            header,
            text,
        })
    }

    pub fn has_user_data_header(&self) -> bool {
        self.first_octet & TP_UDHI != 0
    }

    /// Concatenation element, present on fragments of a multi-part message
    pub fn concatenation(&self) -> Option<Concatenation> {
        user_data_header::concatenation(&self.header)
    }
}

/// Decode packed 7-bit user data
///
/// TP-UDL counts septets including the header, which is padded with fill
/// bits up to the next septet boundary. Unpacking header and payload as one
/// stream and dropping the header septets handles the padding.
fn decode_gsm7_user_data(header_block: &[u8], payload: &[u8], user_data_length: usize) -> String {
    let header_septets = (header_block.len() * 8).div_ceil(7);

    let mut stream = Vec::with_capacity(header_block.len() + payload.len());
    stream.extend_from_slice(header_block);
    stream.extend_from_slice(payload);

    let septets = gsm7::unpack_septets(&stream);
    let end = user_data_length.min(septets.len());
    let start = header_septets.min(end);

    gsm7::decode_septets(&septets[start..end])
}

/// Decode UTF-16BE user data, bounded by the declared octet count
fn decode_ucs2_user_data(payload: &[u8], declared: usize) -> Result<String, PduError> {
    let payload = &payload[..declared.min(payload.len())];
    if payload.len() % 2 != 0 {
        return Err(PduError::Incomplete { field: "user_data" });
    }

    let units = payload
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    Ok(char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::TypeOfNumber;

    const HELLOHELLO: &str =
        "07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37";

    #[test]
    fn decodes_published_vector() {
        let sms = Sms::decode(HELLOHELLO).unwrap();

        assert_eq!(sms.originating_address.value, "27838890001");
        assert_eq!(
            sms.originating_address.type_of_number(),
            TypeOfNumber::SubscriberNumber
        );
        assert_eq!(
            sms.service_centre_timestamp.to_rfc3339(),
            "2099-03-29T15:16:59+02:00"
        );
        assert_eq!(sms.text, "hellohello");
        assert!(sms.header.is_empty());
        assert!(!sms.has_user_data_header());
        assert_eq!(sms.concatenation(), None);
    }

    #[test]
    fn decoding_is_deterministic() {
        assert_eq!(Sms::decode(HELLOHELLO), Sms::decode(HELLOHELLO));
    }

    #[test]
    fn decodes_lowercase_hex() {
        let sms = Sms::decode(&HELLOHELLO.to_lowercase()).unwrap();
        assert_eq!(sms.text, "hellohello");
    }

    #[test]
    fn decodes_ucs2_with_concatenation_header() {
        // no SMSC, UDHI, +46708291096, DCS 0x08, UDL 12: header (6) + "Hé!" (6)
        let pdu = concat!(
            "00",
            "40",
            "0B916407281990F6",
            "00",
            "08",
            "42601132541000",
            "0C",
            "050003050201",
            "004800E90021",
        );
        let sms = Sms::decode(pdu).unwrap();

        assert_eq!(sms.originating_address.to_string(), "+46708291096");
        assert_eq!(sms.text, "Hé!");
        assert_eq!(
            sms.concatenation(),
            Some(Concatenation {
                reference: 5,
                total: 2,
                index: 1,
            })
        );
    }

    #[test]
    fn decodes_ucs2_surrogate_pairs() {
        // U+1F600 is D83D DE00
        let pdu = "00000491214300084260113254100004D83DDE00";
        let sms = Sms::decode(pdu).unwrap();
        assert_eq!(sms.text, "\u{1F600}");
    }

    #[test]
    fn decodes_gsm7_after_header_fill_bits() {
        // 6 header octets are 48 bits, padded by one fill bit to 7 septets
        let text = b"Hello";
        let mut pdu = String::from("0040049121430000426011325410000C050003070101");
        for byte in gsm7::pack_septets(text, 1) {
            pdu.push_str(&format!("{byte:02X}"));
        }

        let sms = Sms::decode(&pdu).unwrap();
        assert_eq!(sms.text, "Hello");
        assert_eq!(sms.concatenation().map(|c| c.reference), Some(7));
    }

    #[test]
    fn user_data_length_drops_trailing_padding() {
        // 7 septets packed into 7 octets would unpack to 8
        let mut pdu = String::from("00000491214300004260113254100007");
        for byte in gsm7::pack_septets(b"1234567", 0) {
            pdu.push_str(&format!("{byte:02X}"));
        }

        let sms = Sms::decode(&pdu).unwrap();
        assert_eq!(sms.text, "1234567");
    }

    #[test]
    fn rejects_unsupported_coding() {
        let pdu = "00000491214300044260113254100002CAFE";
        assert_eq!(Sms::decode(pdu), Err(PduError::UnsupportedEncoding(0x04)));
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(matches!(
            Sms::decode("07ZZ"),
            Err(PduError::InvalidHex { offset: 2, .. })
        ));
    }

    #[test]
    fn truncated_pdu_is_incomplete() {
        assert_eq!(
            Sms::decode("07917283010010F5040BC872"),
            Err(PduError::Incomplete {
                field: "originating_address"
            })
        );
        assert_eq!(
            Sms::decode(""),
            Err(PduError::Incomplete {
                field: "smsc_length"
            })
        );
    }

    #[test]
    fn odd_ucs2_payload_is_incomplete() {
        let pdu = "000004912143000842601132541000030048FF";
        assert_eq!(
            Sms::decode(pdu),
            Err(PduError::Incomplete { field: "user_data" })
        );
    }
}
