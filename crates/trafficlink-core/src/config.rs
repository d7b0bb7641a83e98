//! Connection parameters and communication profiles.
//!
//! A communication profile names one controller endpoint and carries the line
//! settings needed to reach it. Profiles are owned by an external store; this
//! module only defines their shape, the [`ProfileSource`] seam the service
//! resolves them through, and a TOML-backed [`ProfileBook`] for tools that
//! keep profiles in a file.
//!
//! # File format
//!
//! ```toml
//! [[profile]]
//! id = "junction-12"
//! interface = "RS232"
//!
//! [profile.serial]
//! port_name = "/dev/ttyUSB0"
//! baud_rate = 9600
//! parity = "N"
//! retries = 3
//! ```
//!
//! Every serial field except `port_name` has a default.

use std::{
    collections::HashSet,
    env, fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the profile file.
pub const PROFILES_ENV: &str = "TRAFFICLINK_PROFILES";

/// File looked up in the working directory when nothing else is given.
pub const DEFAULT_PROFILES_FILE: &str = "profiles.toml";

/// Opaque profile identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Physical interface a profile talks over.
///
/// Only RS-232 is driven; the others are recognised so that profiles using
/// them can be reported as unsupported instead of rejected at load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterfaceType {
    /// Serial line.
    #[default]
    Rs232,
    /// TCP/UDP endpoint.
    Ethernet,
    /// USB device.
    Usb,
    /// Bluetooth device.
    Bluetooth,
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rs232 => "RS232",
            Self::Ethernet => "ETHERNET",
            Self::Usb => "USB",
            Self::Bluetooth => "BLUETOOTH",
        };
        f.write_str(name)
    }
}

/// Parity setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit.
    #[default]
    #[serde(alias = "N", alias = "n", alias = "NONE", alias = "")]
    None,
    /// Even parity.
    #[serde(alias = "E", alias = "e", alias = "EVEN")]
    Even,
    /// Odd parity.
    #[serde(alias = "O", alias = "o", alias = "ODD")]
    Odd,
    /// Parity bit always set.
    #[serde(alias = "M", alias = "m", alias = "MARK")]
    Mark,
    /// Parity bit always clear.
    #[serde(alias = "S", alias = "s", alias = "SPACE")]
    Space,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Even => "even",
            Self::Odd => "odd",
            Self::Mark => "mark",
            Self::Space => "space",
        };
        f.write_str(name)
    }
}

/// Number of stop bits.
///
/// Stored on disk as `1`, `2`, or `15` for one and a half.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    /// One stop bit.
    #[default]
    One,
    /// One and a half stop bits.
    OnePointFive,
    /// Two stop bits.
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            15 => Ok(Self::OnePointFive),
            2 => Ok(Self::Two),
            other => Err(format!("invalid stop bits: {other} (expected 1, 15 or 2)")),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(value: StopBits) -> Self {
        match value {
            StopBits::One => 1,
            StopBits::OnePointFive => 15,
            StopBits::Two => 2,
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::One => "1",
            Self::OnePointFive => "1.5",
            Self::Two => "2",
        };
        f.write_str(name)
    }
}

/// Flow control setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// No flow control.
    #[default]
    #[serde(alias = "NONE", alias = "")]
    None,
    /// RTS/CTS.
    #[serde(alias = "rtscts", alias = "RTSCTS", alias = "HARDWARE")]
    Hardware,
    /// XON/XOFF.
    #[serde(alias = "xonxoff", alias = "XONXOFF", alias = "SOFTWARE")]
    Software,
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Hardware => "rtscts",
            Self::Software => "xonxoff",
        };
        f.write_str(name)
    }
}

/// Serial connection parameters.
///
/// Immutable for the lifetime of one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialParams {
    /// OS name of the port (`/dev/ttyUSB0`, `COM3`).
    pub port_name: String,
    /// Line speed.
    pub baud_rate: u32,
    /// Data bits per character (5–8).
    pub data_bits: u8,
    /// Parity.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Flow control.
    pub flow_control: FlowControl,
    /// Default response read budget.
    pub read_timeout_ms: u64,
    /// Write budget.
    pub write_timeout_ms: u64,
    /// Maximum attempts per exchange; zero is treated as one.
    pub retries: u32,
}

impl Default for SerialParams {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            read_timeout_ms: 3000,
            write_timeout_ms: 3000,
            retries: 1,
        }
    }
}

impl SerialParams {
    /// Parameters for `port_name` with every other field defaulted.
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self { port_name: port_name.into(), ..Self::default() }
    }

    /// Default response read budget.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write budget.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Number of attempts an exchange may make.
    pub fn max_attempts(&self) -> u32 {
        self.retries.max(1)
    }

    fn validate(&self, id: &ProfileId) -> Result<(), ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid(format!("profile {id}: baud_rate must be positive")));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(ConfigError::Invalid(format!(
                "profile {id}: data_bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        Ok(())
    }
}

fn default_active() -> bool {
    true
}

/// One communication profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommProfile {
    /// Identifier the caller resolves the profile by.
    pub id: ProfileId,
    /// Interface the controller is reached through.
    #[serde(default)]
    pub interface: InterfaceType,
    /// Soft-delete flag; inactive profiles are never exercised.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Serial settings, required for RS-232 profiles.
    #[serde(default)]
    pub serial: Option<SerialParams>,
}

impl CommProfile {
    /// Active RS-232 profile with the given serial settings.
    pub fn rs232(id: impl Into<ProfileId>, params: SerialParams) -> Self {
        Self { id: id.into(), interface: InterfaceType::Rs232, active: true, serial: Some(params) }
    }
}

impl From<String> for ProfileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Resolves profiles by identifier.
pub trait ProfileSource {
    /// Look up a profile.
    fn profile(&self, id: &ProfileId) -> Option<CommProfile>;
}

impl<P: ProfileSource + ?Sized> ProfileSource for &P {
    fn profile(&self, id: &ProfileId) -> Option<CommProfile> {
        (**self).profile(id)
    }
}

/// Profile configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No profile file in any searched location.
    #[error("profile file not found: {0}")]
    FileNotFound(String),

    /// Reading the file failed.
    #[error("failed to read profile file: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML or does not match the schema.
    #[error("invalid profile file: {0}")]
    Parse(String),

    /// Two profiles share an identifier.
    #[error("duplicate profile id: {0}")]
    DuplicateProfile(ProfileId),

    /// A field holds a value the link cannot use.
    #[error("invalid profile value: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Set of profiles loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBook {
    #[serde(rename = "profile", default)]
    profiles: Vec<CommProfile>,
}

impl ProfileBook {
    /// Build a book, rejecting duplicate identifiers and unusable settings.
    pub fn new(profiles: Vec<CommProfile>) -> Result<Self, ConfigError> {
        let book = Self { profiles };
        book.validate()?;
        Ok(book)
    }

    /// Parse a book from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let book: Self = toml::from_str(content)?;
        book.validate()?;
        Ok(book)
    }

    /// Read and parse a book from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// All profiles in file order.
    pub fn profiles(&self) -> &[CommProfile] {
        &self.profiles
    }

    /// Profile with the given identifier.
    pub fn get(&self, id: &ProfileId) -> Option<&CommProfile> {
        self.profiles.iter().find(|p| &p.id == id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if !seen.insert(&profile.id) {
                return Err(ConfigError::DuplicateProfile(profile.id.clone()));
            }
            if let Some(serial) = &profile.serial {
                serial.validate(&profile.id)?;
            }
        }
        Ok(())
    }
}

impl ProfileSource for ProfileBook {
    fn profile(&self, id: &ProfileId) -> Option<CommProfile> {
        self.get(id).cloned()
    }
}

/// Locate the profile file.
///
/// Search order:
/// 1. `explicit`, if given
/// 2. the file named by `TRAFFICLINK_PROFILES`
/// 3. `./profiles.toml`
pub fn find_profiles_file(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(ConfigError::FileNotFound(path.display().to_string()))
        };
    }

    if let Ok(value) = env::var(PROFILES_ENV) {
        let path = PathBuf::from(value);
        return if path.exists() {
            Ok(path)
        } else {
            Err(ConfigError::FileNotFound(format!(
                "{} (from {PROFILES_ENV})",
                path.display()
            )))
        };
    }

    let local = PathBuf::from(DEFAULT_PROFILES_FILE);
    if local.exists() {
        Ok(local)
    } else {
        Err(ConfigError::FileNotFound(format!(
            "{DEFAULT_PROFILES_FILE} in the working directory; pass --profiles or set {PROFILES_ENV}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
        [[profile]]
        id = "junction-12"

        [profile.serial]
        port_name = "/dev/ttyUSB0"
        parity = "E"
        stop_bits = 2
        flow_control = "RTSCTS"
        retries = 3

        [[profile]]
        id = "depot-eth"
        interface = "ETHERNET"
        active = false
    "#;

    #[test]
    fn parses_profiles_with_defaults() {
        let book = ProfileBook::from_toml_str(SAMPLE).unwrap();
        assert_eq!(book.profiles().len(), 2);

        let serial = book.get(&"junction-12".into()).unwrap().serial.clone().unwrap();
        assert_eq!(serial.port_name, "/dev/ttyUSB0");
        assert_eq!(serial.baud_rate, 9600);
        assert_eq!(serial.data_bits, 8);
        assert_eq!(serial.parity, Parity::Even);
        assert_eq!(serial.stop_bits, StopBits::Two);
        assert_eq!(serial.flow_control, FlowControl::Hardware);
        assert_eq!(serial.read_timeout(), Duration::from_millis(3000));
        assert_eq!(serial.max_attempts(), 3);

        let eth = book.get(&"depot-eth".into()).unwrap();
        assert_eq!(eth.interface, InterfaceType::Ethernet);
        assert!(!eth.active);
        assert!(eth.serial.is_none());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let content = r#"
            [[profile]]
            id = "a"
            [[profile]]
            id = "a"
        "#;
        assert!(matches!(
            ProfileBook::from_toml_str(content),
            Err(ConfigError::DuplicateProfile(id)) if id.as_str() == "a"
        ));
    }

    #[test]
    fn rejects_bad_stop_bits() {
        let content = r#"
            [[profile]]
            id = "a"
            [profile.serial]
            port_name = "COM1"
            stop_bits = 3
        "#;
        assert!(matches!(ProfileBook::from_toml_str(content), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_bad_data_bits() {
        let content = r#"
            [[profile]]
            id = "a"
            [profile.serial]
            port_name = "COM1"
            data_bits = 9
        "#;
        assert!(matches!(ProfileBook::from_toml_str(content), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_retries_still_attempts_once() {
        let params = SerialParams { retries: 0, ..SerialParams::for_port("COM1") };
        assert_eq!(params.max_attempts(), 1);
    }

    #[test]
    fn loads_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let path = find_profiles_file(Some(file.path())).unwrap();
        let book = ProfileBook::load(&path).unwrap();
        assert!(book.profile(&"junction-12".into()).is_some());
        assert!(book.profile(&"missing".into()).is_none());
    }

    #[test]
    fn explicit_missing_path_is_not_found() {
        let result = find_profiles_file(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
