//! Wire format for traffic-controller command links.
//!
//! A frame is an optional start delimiter, the payload bytes, an optional
//! checksum byte and an optional end delimiter:
//!
//! ```text
//! [STX]? payload-bytes [checksum]? [ETX]?
//! ```
//!
//! There is no escaping. Payload values are masked to their low 8 bits before
//! they reach the wire, and the checksum always covers the masked payload
//! only, never the delimiters.
//!
//! Everything in this crate is pure: building or decoding a frame never
//! touches a transport, a clock or any shared state.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checksum;
pub mod control;
pub mod errors;
pub mod frame;

pub use checksum::{ChecksumMode, sum8, xor7};
pub use control::{ACK, ETX, NAK, STX};
pub use errors::{ProtocolError, Result};
pub use frame::{build_frame, decode_frame, mask_payload};
