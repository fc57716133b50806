// ABOUTME: Pull-based event reader driving the AT response parser over a line source
// ABOUTME: Hides unrecognised lines and pairs each listing header with its PDU line

use crate::at::{AtError, AtResult, ListedMessage, Parsed, Response};
use std::io;
use tokio::io::{AsyncBufRead, Lines};
use tracing::trace;

/// Source of modem output lines
///
/// `Ok(None)` means the stream ended cleanly.
pub trait LineSource {
    async fn read_line(&mut self) -> io::Result<Option<String>>;
}

impl<R: AsyncBufRead + Unpin> LineSource for Lines<R> {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.next_line().await
    }
}

/// Yields one [`Response`] per call, reading as many lines as it takes
///
/// `next` is cancel safe when the line source is: a listing header whose PDU
/// line has not arrived yet is kept for the following call.
#[derive(Debug)]
pub struct EventReader<L> {
    source: L,
    // Listing header waiting for its PDU line, with the raw header line
    pending: Option<(ListedMessage, String)>,
}

impl<L: LineSource> EventReader<L> {
    pub fn new(source: L) -> Self {
        Self {
            source,
            pending: None,
        }
    }

    /// Read the next response
    ///
    /// Returns `Ok(None)` at end of stream. A stream that ends between a
    /// listing header and its PDU line is an error, not a clean end.
    pub async fn next(&mut self) -> AtResult<Option<Response>> {
        loop {
            if self.pending.is_some() {
                let pdu = self.source.read_line().await?;
                // taken only once the PDU line is in hand
                if let Some((record, line)) = self.pending.take() {
                    let Some(pdu) = pdu else {
                        return Err(AtError::Truncated { line });
                    };
                    return Response::listed(record, &pdu).map(Some);
                }
            }

            let Some(line) = self.source.read_line().await? else {
                return Ok(None);
            };

            match Response::parse(&line)? {
                Parsed::Response(response) => return Ok(Some(response)),
                Parsed::NeedsPdu(record) => self.pending = Some((record, line)),
                Parsed::Unrecognised => trace!("ignoring line: {:?}", line),
            }
        }
    }

    pub fn get_ref(&self) -> &L {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut L {
        &mut self.source
    }

    pub fn into_inner(self) -> L {
        self.source
    }
}
