// ABOUTME: AT command layer: commands sent to the modem and responses parsed from it
// ABOUTME: Exports the line classifier, listing records and the AT error type

mod command;
mod error;
mod listing;
mod response;

pub use command::Command;
pub use error::{AtError, AtResult};
pub use listing::ListedMessage;
pub use response::{Parsed, Response};
