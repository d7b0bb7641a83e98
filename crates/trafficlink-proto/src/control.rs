//! Single-byte control values recognised on the wire.

/// Start-of-text delimiter opening a wrapped frame.
pub const STX: u8 = 0x02;

/// End-of-text delimiter closing a wrapped frame.
pub const ETX: u8 = 0x03;

/// Positive handshake acknowledgement.
pub const ACK: u8 = 0x06;

/// Negative handshake acknowledgement.
pub const NAK: u8 = 0x15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_bytes_are_distinct() {
        let bytes = [STX, ETX, ACK, NAK];
        for (i, a) in bytes.iter().enumerate() {
            assert!(bytes[i + 1..].iter().all(|b| b != a), "{a:#04x} repeated");
        }
    }
}
