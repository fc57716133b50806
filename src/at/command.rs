use std::fmt;

/// Commands the bridge sends to the modem
///
/// Every command is terminated by CR LF on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `AT+CMGF=0`, switch message format to PDU mode
    SetPduMode,
    /// `AT+CMEE=1`, report `+CME ERROR: <n>` instead of a bare `ERROR`
    EnableVerboseErrors,
    /// `AT+CMGL=0`, list received unread messages
    ListUnread,
    /// `AT+CMGD=1,1`, delete every read message
    DeleteRead,
    /// `AT+CMGDA=1`, the variant some modems use to delete read messages
    DeleteAllRead,
}

impl Command {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Command::SetPduMode => b"AT+CMGF=0\r\n",
            Command::EnableVerboseErrors => b"AT+CMEE=1\r\n",
            Command::ListUnread => b"AT+CMGL=0\r\n",
            Command::DeleteRead => b"AT+CMGD=1,1\r\n",
            Command::DeleteAllRead => b"AT+CMGDA=1\r\n",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        // commands are ASCII; drop the CR LF terminator
        let text = std::str::from_utf8(&bytes[..bytes.len() - 2]).map_err(|_| fmt::Error)?;
        f.write_str(text)
    }
}
