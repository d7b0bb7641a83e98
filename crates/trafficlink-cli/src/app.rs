//! Command dispatch.

use std::process::ExitCode;

use trafficlink_core::{
    CommTester, CommandArgs, CommandKind, Environment, EventSink, ExchangeOutcome, FrameRequest, LinkOpener, ProfileBook,
    ProfileId, ProfileSource, config::find_profiles_file,
};
use trafficlink_proto::decode_frame;
use trafficlink_serial::{PortInfo, SerialOpener, list_ports};

use crate::{
    CliError,
    args::{Cli, Command},
    bytes::{parse_byte_args, parse_byte_list, parse_hex},
};

/// Result of one CLI invocation, before rendering.
#[derive(Debug)]
pub enum Report {
    /// Serial ports found on this machine.
    Ports(Vec<PortInfo>),
    /// The preset command catalog.
    Commands,
    /// Result of an exchange.
    Outcome {
        /// What the engine reported.
        outcome: ExchangeOutcome,
        /// Response payload with delimiters and checksum removed, when the
        /// command is wrapped and the response decodes.
        payload: Option<Vec<u8>>,
    },
}

impl Report {
    /// Process exit status: failure when an exchange did not succeed.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Outcome { outcome, .. } if !outcome.ok => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        }
    }
}

/// Run `cli` against real serial ports.
pub fn execute(cli: &Cli) -> Result<Report, CliError> {
    match &cli.command {
        Command::Ports => Ok(Report::Ports(list_ports()?)),
        Command::Commands => Ok(Report::Commands),
        command => {
            let path = find_profiles_file(cli.profiles.as_deref())?;
            let book = ProfileBook::load(&path)?;
            tracing::debug!(path = %path.display(), profiles = book.profiles().len(), "loaded profiles");
            dispatch(&mut CommTester::system(book, SerialOpener), command)
        },
    }
}

/// Run a profile-bound command through `tester`.
pub fn dispatch<P, O, E, S>(tester: &mut CommTester<P, O, E, S>, command: &Command) -> Result<Report, CliError>
where
    P: ProfileSource,
    O: LinkOpener,
    E: Environment,
    S: EventSink,
{
    match command {
        Command::Ports => Ok(Report::Ports(list_ports()?)),
        Command::Commands => Ok(Report::Commands),
        Command::Probe { profile } => {
            let outcome = tester.test_connection(&ProfileId::from(profile.as_str()))?;
            Ok(Report::Outcome { outcome, payload: None })
        },
        Command::Frame { profile, bytes, hex, expect_bytes, timeout_ms, prefix, contains } => {
            let bytes = match hex {
                Some(hex) => parse_hex(hex)?,
                None => parse_byte_args(bytes)?,
            };
            let request = FrameRequest {
                bytes,
                expect_bytes: *expect_bytes,
                read_timeout_ms: *timeout_ms,
                expect_prefix: optional_list(prefix.as_deref())?,
                expect_contains: optional_list(contains.as_deref())?,
            };
            let outcome = tester.send_frame(&ProfileId::from(profile.as_str()), &request)?;
            Ok(Report::Outcome { outcome, payload: None })
        },
        Command::Command { profile, name, args } => {
            let kind: CommandKind = name.parse()?;
            let spec = kind.build(&CommandArgs::parse_pairs(args)?);
            let outcome = tester.send_command(&ProfileId::from(profile.as_str()), &spec)?;
            let payload = if spec.wrap && outcome.ok {
                decode_frame(&outcome.received, true, spec.checksum).ok()
            } else {
                None
            };
            Ok(Report::Outcome { outcome, payload })
        },
    }
}

fn optional_list(input: Option<&str>) -> Result<Vec<i64>, CliError> {
    input.map_or_else(|| Ok(Vec::new()), parse_byte_list)
}
