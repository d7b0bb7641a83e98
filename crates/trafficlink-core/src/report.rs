//! Exchange outcome record.

use std::fmt::Write as _;

use serde::Serialize;

use crate::{
    config::{InterfaceType, SerialParams},
    error::{ErrorKind, ExchangeError},
};

/// Uniform result of every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeOutcome {
    /// Whether the exchange succeeded.
    pub ok: bool,
    /// Interface the profile uses.
    pub interface_type: InterfaceType,
    /// Time since the first attempt started.
    pub elapsed_ms: u64,
    /// One-line summary.
    pub message: String,
    /// Connection parameters and byte dumps.
    pub details: String,
    /// Bytes transmitted on the last attempt.
    pub sent: Vec<u8>,
    /// Bytes received on the last attempt.
    pub received: Vec<u8>,
    /// Attempts made; zero when the request was refused up front.
    pub attempts: u32,
    /// Failure class of the last attempt.
    pub failure: Option<ErrorKind>,
}

impl ExchangeOutcome {
    /// Outcome for a request refused before any transport was touched.
    pub fn rejected(interface_type: InterfaceType, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            ok: false,
            interface_type,
            elapsed_ms: 0,
            message: message.into(),
            details: details.into(),
            sent: Vec::new(),
            received: Vec::new(),
            attempts: 0,
            failure: Some(ErrorKind::Rejected),
        }
    }
}

/// Render the details line for an exchange over `params`.
///
/// Bytes are dumped as unsigned decimals.
pub fn details(params: &SerialParams, sent: &[u8], received: &[u8], last_error: Option<&ExchangeError>) -> String {
    let mut out = format!(
        "port={}, baud={}, data_bits={}, parity={}, stop_bits={}, flow={}, tx={sent:?}, rx={received:?} (len={})",
        params.port_name,
        params.baud_rate,
        params.data_bits,
        params.parity,
        params.stop_bits,
        params.flow_control,
        received.len(),
    );
    if let Some(err) = last_error {
        let _ = write!(out, ", last_error={err}");
    }
    out
}
