//! Command catalog.
//!
//! Every named command is a variant of [`CommandKind`] paired with a pure
//! builder that turns loosely typed arguments into a [`FrameSpec`]. The
//! exchange engine only ever sees the resulting spec, so adding a command
//! means adding a variant and a builder here and nothing else.
//!
//! Arguments are forgiving: a missing key, a value of the wrong type, or a
//! negative number falls back to the preset's default instead of failing.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use trafficlink_proto::ChecksumMode;

use crate::{
    command::FrameSpec,
    error::{ArgParseError, UnknownCommand},
};

/// Argument key: await the handshake byte.
pub const ARG_EXPECT_ACK: &str = "expectAck";
/// Argument key: exact response length.
pub const ARG_EXPECT_BYTES: &str = "expectBytes";
/// Argument key: read budget in milliseconds.
pub const ARG_READ_TIMEOUT_MS: &str = "readTimeoutMs";
/// Argument key: timestamp for clock commands.
pub const ARG_DATETIME: &str = "datetime";

/// Accepted timestamp layouts for the `datetime` argument.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// `PING\r\n`, sent bare.
const PING_PAYLOAD: [u8; 6] = [80, 73, 78, 71, 13, 10];

/// Fixed M-protocol probe.
const M_PROBE_PAYLOAD: [u8; 22] = [
    128, 217, 134, 128, 128, 133, 128, 131, 133, 137, 128, 132, 129, 131, 129, 130, 131, 132, 133,
    134, 128, 212,
];

const GET_STATUS_OPCODE: u8 = 0x10;
const GET_CLOCK_OPCODE: u8 = 0x20;
const SET_CLOCK_OPCODE: u8 = 0x21;

/// Length of a clock readback.
const CLOCK_REPLY_LEN: usize = 7;

const DEFAULT_TIMEOUT_MS: u64 = 3000;
const SHORT_TIMEOUT_MS: u64 = 2000;

/// A loosely typed argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// `true` / `false`.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Local timestamp.
    DateTime(NaiveDateTime),
    /// Anything else.
    Text(String),
}

impl ArgValue {
    /// Interpret raw text, trying bool, integer, then timestamp.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(b) = trimmed.parse::<bool>() {
            return Self::Bool(b);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::Int(n);
        }
        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map_or_else(|| Self::Text(raw.to_string()), Self::DateTime)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<NaiveDateTime> for ArgValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Argument mapping handed to a command builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs(BTreeMap<String, ArgValue>);

impl CommandArgs {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one argument.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace one argument in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Parse `key=value` strings.
    pub fn parse_pairs<I, S>(pairs: I) -> Result<Self, ArgParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                return Err(ArgParseError::MissingEquals(pair.to_string()));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ArgParseError::EmptyKey(pair.to_string()));
            }
            args.insert(key, ArgValue::parse(value));
        }
        Ok(args)
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.get(key)
    }

    /// Boolean under `key`, or `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(ArgValue::Bool(b)) => *b,
            _ => default,
        }
    }

    /// Non-negative count under `key`, or `default`.
    pub fn get_count(&self, key: &str, default: usize) -> usize {
        match self.get(key) {
            Some(ArgValue::Int(n)) => usize::try_from(*n).unwrap_or(default),
            _ => default,
        }
    }

    /// Positive millisecond budget under `key`, or `default`.
    pub fn get_timeout_ms(&self, key: &str, default: u64) -> u64 {
        match self.get(key) {
            Some(ArgValue::Int(n)) if *n > 0 => u64::try_from(*n).unwrap_or(default),
            _ => default,
        }
    }

    /// Timestamp under `key`.
    pub fn get_datetime(&self, key: &str) -> Option<NaiveDateTime> {
        match self.get(key) {
            Some(ArgValue::DateTime(dt)) => Some(*dt),
            _ => None,
        }
    }
}

/// Pure builder for one catalog entry.
pub type Builder = fn(&CommandArgs) -> FrameSpec;

/// Closed set of named commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Plain-text liveness probe.
    Ping,
    /// Wrapped M-protocol probe.
    MPing,
    /// Wrapped M probe, no response awaited.
    MNoAck,
    /// Bare M probe, handshake only.
    MAckOnly,
    /// Status query.
    GetStatus,
    /// Clock readback.
    GetClock,
    /// Clock set.
    SetClock,
}

impl CommandKind {
    /// Every command, in catalog order.
    pub const ALL: [Self; 7] = [
        Self::Ping,
        Self::MPing,
        Self::MNoAck,
        Self::MAckOnly,
        Self::GetStatus,
        Self::GetClock,
        Self::SetClock,
    ];

    /// Kebab-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::MPing => "m-ping",
            Self::MNoAck => "m-no-ack",
            Self::MAckOnly => "m-ack-only",
            Self::GetStatus => "get-status",
            Self::GetClock => "get-clock",
            Self::SetClock => "set-clock",
        }
    }

    /// One-line description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Ping => "send PING\\r\\n and collect whatever comes back",
            Self::MPing => "wrapped M probe, ACK then read to ETX",
            Self::MNoAck => "wrapped M probe, fire and forget",
            Self::MAckOnly => "bare M probe, wait for the handshake byte only",
            Self::GetStatus => "query controller status",
            Self::GetClock => "read the controller clock (7 bytes)",
            Self::SetClock => "set the controller clock from `datetime` or local time",
        }
    }

    /// Builder for this command.
    pub fn builder(self) -> Builder {
        match self {
            Self::Ping => build_ping,
            Self::MPing => build_m_ping,
            Self::MNoAck => build_m_no_ack,
            Self::MAckOnly => build_m_ack_only,
            Self::GetStatus => build_get_status,
            Self::GetClock => build_get_clock,
            Self::SetClock => build_set_clock,
        }
    }

    /// Build the frame spec for this command.
    pub fn build(self, args: &CommandArgs) -> FrameSpec {
        (self.builder())(args)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandKind {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String =
            s.trim().chars().filter(|c| *c != '-' && *c != '_').map(|c| c.to_ascii_lowercase()).collect();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().replace('-', "") == key)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

fn timeout(args: &CommandArgs, default: u64) -> u64 {
    args.get_timeout_ms(ARG_READ_TIMEOUT_MS, default)
}

fn build_ping(args: &CommandArgs) -> FrameSpec {
    FrameSpec::new(PING_PAYLOAD)
        .with_ack(args.get_bool(ARG_EXPECT_ACK, true))
        .with_expect_bytes(args.get_count(ARG_EXPECT_BYTES, 0))
        .with_read_timeout_ms(timeout(args, SHORT_TIMEOUT_MS))
}

fn build_m_ping(args: &CommandArgs) -> FrameSpec {
    FrameSpec::new(M_PROBE_PAYLOAD)
        .wrapped(true)
        .with_ack(args.get_bool(ARG_EXPECT_ACK, true))
        .with_expect_bytes(args.get_count(ARG_EXPECT_BYTES, 0))
        .with_read_timeout_ms(timeout(args, DEFAULT_TIMEOUT_MS))
}

fn build_m_no_ack(args: &CommandArgs) -> FrameSpec {
    FrameSpec::new(M_PROBE_PAYLOAD).wrapped(true).with_read_timeout_ms(timeout(args, SHORT_TIMEOUT_MS))
}

fn build_m_ack_only(args: &CommandArgs) -> FrameSpec {
    FrameSpec::new(M_PROBE_PAYLOAD).with_ack(true).with_read_timeout_ms(timeout(args, DEFAULT_TIMEOUT_MS))
}

fn build_get_status(args: &CommandArgs) -> FrameSpec {
    FrameSpec::new([GET_STATUS_OPCODE, 0x01])
        .wrapped(true)
        .with_checksum(ChecksumMode::Xor7)
        .with_ack(true)
        .with_expect_bytes(args.get_count(ARG_EXPECT_BYTES, 0))
        .with_read_timeout_ms(timeout(args, DEFAULT_TIMEOUT_MS))
}

fn build_get_clock(args: &CommandArgs) -> FrameSpec {
    FrameSpec::new([GET_CLOCK_OPCODE, 0x01])
        .wrapped(true)
        .with_checksum(ChecksumMode::Xor7)
        .with_ack(true)
        .with_expect_bytes(args.get_count(ARG_EXPECT_BYTES, CLOCK_REPLY_LEN))
        .with_read_timeout_ms(timeout(args, DEFAULT_TIMEOUT_MS))
}

fn build_set_clock(args: &CommandArgs) -> FrameSpec {
    let at = args.get_datetime(ARG_DATETIME).unwrap_or_else(|| Local::now().naive_local());
    FrameSpec::new(clock_payload(at))
        .wrapped(true)
        .with_checksum(ChecksumMode::Xor7)
        .with_ack(true)
        .with_read_timeout_ms(timeout(args, DEFAULT_TIMEOUT_MS))
}

fn clock_payload(at: NaiveDateTime) -> [i64; 7] {
    [
        i64::from(SET_CLOCK_OPCODE),
        i64::from(at.year().rem_euclid(100)),
        i64::from(at.month()),
        i64::from(at.day()),
        i64::from(at.hour()),
        i64::from(at.minute()),
        i64::from(at.second()),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const M_PROBE: [u8; 22] = [
        128, 217, 134, 128, 128, 133, 128, 131, 133, 137, 128, 132, 129, 131, 129, 130, 131, 132,
        133, 134, 128, 212,
    ];

    #[test]
    fn ping_defaults() {
        let spec = CommandKind::Ping.build(&CommandArgs::new());
        assert_eq!(spec.payload, b"PING\r\n");
        assert!(!spec.wrap);
        assert!(spec.expect_ack);
        assert_eq!(spec.expect_bytes, 0);
        assert_eq!(spec.read_timeout_ms, Some(2000));
    }

    #[test]
    fn ping_honours_overrides() {
        let args = CommandArgs::new()
            .with(ARG_EXPECT_ACK, false)
            .with(ARG_EXPECT_BYTES, 4_i64)
            .with(ARG_READ_TIMEOUT_MS, 500_i64);
        let spec = CommandKind::Ping.build(&args);
        assert!(!spec.expect_ack);
        assert_eq!(spec.expect_bytes, 4);
        assert_eq!(spec.read_timeout_ms, Some(500));
    }

    #[test]
    fn bad_overrides_fall_back() {
        let args = CommandArgs::new()
            .with(ARG_EXPECT_ACK, "yes")
            .with(ARG_EXPECT_BYTES, -3_i64)
            .with(ARG_READ_TIMEOUT_MS, "soon");
        let spec = CommandKind::GetClock.build(&args);
        assert!(spec.expect_ack);
        assert_eq!(spec.expect_bytes, 7);
        assert_eq!(spec.read_timeout_ms, Some(3000));
    }

    #[test]
    fn m_probe_variants() {
        let ping = CommandKind::MPing.build(&CommandArgs::new());
        assert_eq!(ping.payload, M_PROBE);
        assert!(ping.wrap && ping.expect_ack);

        let no_ack = CommandKind::MNoAck.build(&CommandArgs::new().with(ARG_EXPECT_ACK, true));
        assert!(no_ack.wrap);
        assert!(!no_ack.expect_ack);
        assert_eq!(no_ack.read_timeout_ms, Some(2000));

        let ack_only = CommandKind::MAckOnly.build(&CommandArgs::new());
        assert!(!ack_only.wrap);
        assert!(ack_only.expect_ack);
        assert_eq!(ack_only.expect_bytes, 0);
    }

    #[test]
    fn status_and_clock_frames() {
        let status = CommandKind::GetStatus.build(&CommandArgs::new());
        assert_eq!(status.encode(), vec![0x02, 16, 1, 17, 0x03]);

        let clock = CommandKind::GetClock.build(&CommandArgs::new());
        assert_eq!(clock.encode(), vec![0x02, 32, 1, 33, 0x03]);
        assert_eq!(clock.expect_bytes, 7);
    }

    #[test]
    fn set_clock_encodes_supplied_time() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(14, 5, 59).unwrap();
        let spec = CommandKind::SetClock.build(&CommandArgs::new().with(ARG_DATETIME, at));
        assert_eq!(spec.payload, vec![0x21, 24, 3, 9, 14, 5, 59]);
        assert_eq!(spec.checksum, ChecksumMode::Xor7);
        assert!(spec.wrap);
    }

    #[test]
    fn set_clock_without_datetime_uses_now() {
        let spec = CommandKind::SetClock.build(&CommandArgs::new().with(ARG_DATETIME, "later"));
        assert_eq!(spec.payload.len(), 7);
        assert_eq!(spec.payload[0], 0x21);
        assert!(spec.payload[1] < 100);
    }

    #[test]
    fn names_round_trip_in_both_spellings() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.name().parse::<CommandKind>(), Ok(kind));
            let screaming = kind.name().replace('-', "_").to_uppercase();
            assert_eq!(screaming.parse::<CommandKind>(), Ok(kind));
        }
        assert_eq!("M_NOACK".parse::<CommandKind>(), Ok(CommandKind::MNoAck));
        assert!("reboot".parse::<CommandKind>().is_err());
    }

    #[test]
    fn parses_key_value_pairs() {
        let args = CommandArgs::parse_pairs([
            "expectAck=false",
            "expectBytes=12",
            "datetime=2025-01-02T03:04:05",
            "note=hello world",
        ])
        .unwrap();
        assert!(!args.get_bool(ARG_EXPECT_ACK, true));
        assert_eq!(args.get_count(ARG_EXPECT_BYTES, 0), 12);
        assert!(args.get_datetime(ARG_DATETIME).is_some());
        assert_eq!(args.get("note"), Some(&ArgValue::Text("hello world".into())));

        assert_eq!(
            CommandArgs::parse_pairs(["expectAck"]),
            Err(ArgParseError::MissingEquals("expectAck".into()))
        );
        assert_eq!(CommandArgs::parse_pairs(["=1"]), Err(ArgParseError::EmptyKey("=1".into())));
    }
}
