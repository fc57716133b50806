// ABOUTME: The `+CMGL` listing header that precedes every PDU line
// ABOUTME: Parses index, status, optional alpha tag and TPDU length from the header fields

use crate::at::error::{AtError, AtResult};
use crate::datatypes::MessageStatus;

/// Header of one listed message: `+CMGL: <index>,<stat>,[<alpha>],<length>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedMessage {
    /// Storage index, the value `AT+CMGD` would take
    pub index: u32,
    pub status: MessageStatus,
    /// Phonebook alpha tag, without quotes; usually empty
    pub address_text: String,
    /// TPDU length in octets, not counting the SMSC block
    pub tpdu_length: u32,
}

impl ListedMessage {
    /// Parse the fields after the `+CMGL: ` prefix
    ///
    /// `line` is the full modem line and is only used for error reporting.
    /// The alpha tag may itself contain commas, so it is taken as whatever
    /// lies between the second and the last comma.
    pub fn parse(fields: &str, line: &str) -> AtResult<Self> {
        let malformed = |reason: String| AtError::MalformedRecord {
            line: line.to_string(),
            reason,
        };

        let mut head = fields.splitn(3, ',');
        let index = head.next().unwrap_or_default();
        let status = head
            .next()
            .ok_or_else(|| malformed("missing status field".to_string()))?;
        let rest = head
            .next()
            .ok_or_else(|| malformed("missing address and length fields".to_string()))?;
        let (address_text, tpdu_length) = rest
            .rsplit_once(',')
            .ok_or_else(|| malformed("missing length field".to_string()))?;

        let index = index
            .trim()
            .parse::<u32>()
            .map_err(|e| malformed(format!("index '{}': {e}", index.trim())))?;
        let status_code = status
            .trim()
            .parse::<u8>()
            .map_err(|e| malformed(format!("status '{}': {e}", status.trim())))?;
        let status = MessageStatus::try_from(status_code)
            .map_err(|_| malformed(format!("unknown message status {status_code}")))?;
        let tpdu_length = tpdu_length
            .trim()
            .parse::<u32>()
            .map_err(|e| malformed(format!("length '{}': {e}", tpdu_length.trim())))?;

        Ok(ListedMessage {
            index,
            status,
            address_text: address_text.trim().trim_matches('"').to_string(),
            tpdu_length,
        })
    }
}
