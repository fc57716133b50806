// ABOUTME: Classification of single modem output lines into typed AT responses
// ABOUTME: Listing headers ask the caller for one more line holding the PDU

use crate::at::error::{AtError, AtResult};
use crate::at::listing::ListedMessage;
use crate::datatypes::Sms;

const CMTI_PREFIX: &str = "+CMTI: ";
const CMGL_PREFIX: &str = "+CMGL: ";

/// A response the modem produced, one per classified line (two for listings)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// `+CMTI: <mem>,<index>`, a new message was stored
    IncomingNotice {
        storage: Option<String>,
        index: Option<u32>,
    },
    /// `+CMGL` header plus the decoded PDU line after it
    Listed { record: ListedMessage, sms: Sms },
    /// Final result code `OK`
    Ok,
    /// Final result code carrying an error, with the raw line
    Error(String),
}

/// Outcome of looking at a single line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parsed {
    Response(Response),
    /// A listing header; the next line is its PDU
    NeedsPdu(ListedMessage),
    /// Echoes, blank lines and unsolicited codes the bridge does not track
    Unrecognised,
}

impl Response {
    /// Classify one line, in priority order: `+CMTI`, `+CMGL`, `OK`, errors
    pub fn parse(line: &str) -> AtResult<Parsed> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix(CMTI_PREFIX) {
            let (storage, index) = parse_notice(rest);
            return Ok(Parsed::Response(Response::IncomingNotice { storage, index }));
        }

        if let Some(rest) = line.strip_prefix(CMGL_PREFIX) {
            return ListedMessage::parse(rest, line).map(Parsed::NeedsPdu);
        }

        if line == "OK" {
            return Ok(Parsed::Response(Response::Ok));
        }

        if line.contains(" ERROR:") || line == "ERROR" {
            return Ok(Parsed::Response(Response::Error(line.to_string())));
        }

        Ok(Parsed::Unrecognised)
    }

    /// Complete a listing with its PDU line
    pub fn listed(record: ListedMessage, pdu_line: &str) -> AtResult<Response> {
        let pdu_line = pdu_line.trim();
        let sms = Sms::decode(pdu_line).map_err(|source| AtError::Decode {
            line: pdu_line.to_string(),
            source,
        })?;
        Ok(Response::Listed { record, sms })
    }
}

/// Best-effort split of `"ME",3` into storage and index
fn parse_notice(rest: &str) -> (Option<String>, Option<u32>) {
    match rest.split_once(',') {
        Some((storage, index)) => (
            Some(storage.trim().trim_matches('"').to_string()),
            index.trim().parse().ok(),
        ),
        None => (None, None),
    }
}
