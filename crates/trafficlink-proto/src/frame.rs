//! Frame construction and decoding.

use crate::{
    checksum::ChecksumMode,
    control::{ETX, STX},
    errors::{ProtocolError, Result},
};

/// Mask every value to its low 8 bits.
///
/// Callers often carry payloads as wider integers (decimal lists typed in by
/// an operator, computed fields); only the low byte of each ever reaches the
/// wire.
pub fn mask_payload<I>(values: I) -> Vec<u8>
where
    I: IntoIterator,
    I::Item: Into<i64>,
{
    values.into_iter().map(|v| (v.into() & 0xFF) as u8).collect()
}

/// Build the bytes to transmit for `payload`.
///
/// With `wrap` the frame is enclosed in STX/ETX. A checksum byte, when the
/// mode asks for one, is computed over the masked payload and sits right
/// before the closing delimiter.
pub fn build_frame<I>(payload: I, wrap: bool, mode: ChecksumMode) -> Vec<u8>
where
    I: IntoIterator,
    I::Item: Into<i64>,
{
    let body = mask_payload(payload);
    let mut out = Vec::with_capacity(body.len() + 2 + mode.len());

    if wrap {
        out.push(STX);
    }
    out.extend_from_slice(&body);
    if let Some(sum) = mode.compute(&body) {
        out.push(sum);
    }
    if wrap {
        out.push(ETX);
    }
    out
}

/// Recover the payload from a frame produced with the same `wrap` and `mode`.
///
/// The checksum is verified. Payload bytes are not inspected for embedded
/// delimiters since the format has no escaping.
pub fn decode_frame(frame: &[u8], wrap: bool, mode: ChecksumMode) -> Result<Vec<u8>> {
    let body = if wrap {
        match frame.first() {
            Some(&STX) => {},
            found => return Err(ProtocolError::MissingStart { found: found.copied() }),
        }
        match frame.last() {
            Some(&ETX) if frame.len() >= 2 => {},
            found => {
                let found = if frame.len() >= 2 { found.copied() } else { None };
                return Err(ProtocolError::MissingEnd { found });
            },
        }
        &frame[1..frame.len() - 1]
    } else {
        frame
    };

    if mode.is_empty() {
        return Ok(body.to_vec());
    }

    let Some((&actual, payload)) = body.split_last() else {
        return Err(ProtocolError::TooShort { len: body.len() });
    };

    match mode.compute(payload) {
        Some(expected) if expected != actual => {
            Err(ProtocolError::ChecksumMismatch { expected, actual })
        },
        _ => Ok(payload.to_vec()),
    }
}
