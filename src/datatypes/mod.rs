mod address;
mod data_coding;
pub mod gsm7;
mod message_status;
mod sms;
pub mod timestamp;
mod type_of_number;
pub mod user_data_header;

pub use address::Address;
pub use data_coding::DataCoding;
pub use message_status::MessageStatus;
pub use sms::Sms;
pub use type_of_number::TypeOfNumber;
pub use user_data_header::{Concatenation, HeaderElement};
