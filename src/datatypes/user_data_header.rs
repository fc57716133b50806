// ABOUTME: User Data Header information elements carried ahead of the SMS text
// ABOUTME: Interprets 8-bit concatenation references and keeps other elements opaque

use crate::codec::{self, PduError};
use bytes::Buf;
use std::io::Cursor;

/// IEI of the concatenated short message element with an 8-bit reference
pub const IEI_CONCATENATION: u8 = 0x00;

/// Position of one fragment within a concatenated message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Concatenation {
    pub reference: u8,
    pub total: u8,
    /// 1-based fragment number
    pub index: u8,
}

/// One information element of the User Data Header
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderElement {
    Concatenation(Concatenation),
    /// Any other element; only its tag and length are kept
    Opaque { tag: u8, length: u8 },
}

/// Parse the header block (without its leading length octet)
///
/// Elements are read as tag/length pairs until fewer than two bytes remain.
pub fn decode_header(bytes: &[u8]) -> Result<Vec<HeaderElement>, PduError> {
    let mut buf = Cursor::new(bytes);
    let mut elements = Vec::new();

    while buf.remaining() >= 2 {
        let tag = buf.get_u8();
        let length = buf.get_u8();

        match tag {
            IEI_CONCATENATION => {
                if length != 3 {
                    return Err(PduError::InvalidHeader {
                        tag,
                        reason: format!("concatenation element must be 3 bytes, got {length}"),
                    });
                }
                let reference = codec::decode_u8(&mut buf, "concatenation_reference")?;
                let total = codec::decode_u8(&mut buf, "concatenation_total")?;
                let index = codec::decode_u8(&mut buf, "concatenation_index")?;
                elements.push(HeaderElement::Concatenation(Concatenation {
                    reference,
                    total,
                    index,
                }));
            }
            _ => {
                codec::skip_bytes(&mut buf, length as usize, "user_data_header_element")?;
                elements.push(HeaderElement::Opaque { tag, length });
            }
        }
    }

    Ok(elements)
}

/// First concatenation element, if any
pub fn concatenation(elements: &[HeaderElement]) -> Option<Concatenation> {
    elements.iter().find_map(|element| match element {
        HeaderElement::Concatenation(c) => Some(*c),
        HeaderElement::Opaque { .. } => None,
    })
}
