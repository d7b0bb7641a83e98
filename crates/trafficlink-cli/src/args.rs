//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Exercise traffic-controller serial links.
#[derive(Debug, Parser)]
#[command(name = "trafficlink", version, about)]
pub struct Cli {
    /// Profile file; defaults to `$TRAFFICLINK_PROFILES`, then
    /// `profiles.toml` in the working directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub profiles: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List serial ports the OS knows about.
    Ports,

    /// List the preset controller commands.
    Commands,

    /// Open the profile's port and send a line break.
    Probe {
        /// Profile identifier.
        profile: String,
    },

    /// Send raw bytes and validate the response.
    Frame {
        /// Profile identifier.
        profile: String,

        /// Bytes to send, decimal or 0x-prefixed, space or comma separated.
        #[arg(required_unless_present = "hex", conflicts_with = "hex")]
        bytes: Vec<String>,

        /// Bytes to send as a hex string, e.g. `0210011103`.
        #[arg(long)]
        hex: Option<String>,

        /// Exact response length.
        #[arg(long, value_name = "N")]
        expect_bytes: Option<usize>,

        /// Read budget in milliseconds.
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Bytes the response must begin with.
        #[arg(long, value_name = "BYTES")]
        prefix: Option<String>,

        /// Bytes the response must contain.
        #[arg(long, value_name = "BYTES")]
        contains: Option<String>,
    },

    /// Send a preset command.
    Command {
        /// Profile identifier.
        profile: String,

        /// Command name, e.g. `get-clock`.
        name: String,

        /// Arguments as `key=value`, e.g. `expectAck=false`.
        args: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn frame_takes_positional_bytes() {
        let cli = Cli::try_parse_from(["trafficlink", "frame", "junction-12", "2", "16", "--expect-bytes", "4"]).unwrap();
        match cli.command {
            Command::Frame { profile, bytes, expect_bytes, hex, .. } => {
                assert_eq!(profile, "junction-12");
                assert_eq!(bytes, ["2", "16"]);
                assert_eq!(expect_bytes, Some(4));
                assert!(hex.is_none());
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn frame_rejects_bytes_and_hex_together() {
        let result = Cli::try_parse_from(["trafficlink", "frame", "j", "2", "--hex", "02"]);
        assert!(result.is_err());
    }

    #[test]
    fn frame_requires_some_bytes() {
        assert!(Cli::try_parse_from(["trafficlink", "frame", "j"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["trafficlink", "command", "j", "ping", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
