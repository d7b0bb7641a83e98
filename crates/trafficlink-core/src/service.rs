//! Profile-resolving entry points.
//!
//! [`CommTester`] is what callers use: it looks a profile up, refuses the
//! ones that cannot be exercised, and otherwise hands a prepared
//! [`Exchange`] to the engine. Every call returns an [`ExchangeOutcome`]
//! unless the profile or its connection configuration is missing.

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{CommandArgs, CommandKind},
    command::FrameSpec,
    config::{InterfaceType, ProfileId, ProfileSource, SerialParams},
    env::{Environment, SystemEnv},
    error::ServiceError,
    events::{EventSink, TracingSink},
    exchange::Exchange,
    report::ExchangeOutcome,
    transport::LinkOpener,
    validate::Expectations,
};

/// Raw frame sent in send/validate mode.
///
/// The bytes go out exactly as given (after masking to 8 bits): no
/// delimiters, no checksum, no handshake. A response is always required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameRequest {
    /// Decimal byte values to send.
    pub bytes: Vec<i64>,
    /// Exact response length, if known.
    pub expect_bytes: Option<usize>,
    /// Read budget overriding the profile's.
    pub read_timeout_ms: Option<u64>,
    /// Bytes the response must begin with.
    pub expect_prefix: Vec<i64>,
    /// Bytes the response must contain.
    pub expect_contains: Vec<i64>,
}

impl FrameRequest {
    /// Request sending `bytes`.
    pub fn new(bytes: Vec<i64>) -> Self {
        Self { bytes, ..Self::default() }
    }

    fn spec(&self) -> FrameSpec {
        let mut spec = FrameSpec::new(self.bytes.iter().copied()).with_expect_bytes(self.expect_bytes.unwrap_or(0));
        if let Some(ms) = self.read_timeout_ms {
            spec = spec.with_read_timeout_ms(ms);
        }
        spec
    }

    fn expectations(&self) -> Expectations {
        Expectations::new(
            trafficlink_proto::mask_payload(self.expect_prefix.iter().copied()),
            trafficlink_proto::mask_payload(self.expect_contains.iter().copied()),
        )
    }
}

/// A profile either resolved to usable parameters or refused up front.
enum Resolution {
    Ready(SerialParams),
    Refused(ExchangeOutcome),
}

/// Runs exchanges against profiles from a [`ProfileSource`].
pub struct CommTester<P, O, E = SystemEnv, S = TracingSink> {
    profiles: P,
    opener: O,
    env: E,
    sink: S,
}

impl<P, O> CommTester<P, O>
where
    P: ProfileSource,
    O: LinkOpener,
{
    /// Tester on the system clock, logging through `tracing`.
    pub fn system(profiles: P, opener: O) -> Self {
        Self::new(profiles, opener, SystemEnv, TracingSink)
    }
}

impl<P, O, E, S> CommTester<P, O, E, S>
where
    P: ProfileSource,
    O: LinkOpener,
    E: Environment,
    S: EventSink,
{
    /// Assemble a tester from its collaborators.
    pub fn new(profiles: P, opener: O, env: E, sink: S) -> Self {
        Self { profiles, opener, env, sink }
    }

    /// Open and configure the profile's port, then send a bare CR LF.
    pub fn test_connection(&mut self, id: &ProfileId) -> Result<ExchangeOutcome, ServiceError> {
        match self.resolve(id)? {
            Resolution::Ready(params) => Ok(self.execute(&Exchange::probe(params))),
            Resolution::Refused(outcome) => Ok(outcome),
        }
    }

    /// Send a raw frame and validate the response.
    pub fn send_frame(&mut self, id: &ProfileId, request: &FrameRequest) -> Result<ExchangeOutcome, ServiceError> {
        let params = match self.resolve(id)? {
            Resolution::Ready(params) => params,
            Resolution::Refused(outcome) => return Ok(outcome),
        };
        if request.bytes.is_empty() {
            return Ok(ExchangeOutcome::rejected(
                InterfaceType::Rs232,
                "empty frame: nothing to send",
                format!("profile={id}"),
            ));
        }

        let exchange = Exchange::new(params, request.spec()).with_expectations(request.expectations());
        Ok(self.execute(&exchange))
    }

    /// Send an arbitrary frame specification.
    pub fn send_command(&mut self, id: &ProfileId, spec: &FrameSpec) -> Result<ExchangeOutcome, ServiceError> {
        match self.resolve(id)? {
            Resolution::Ready(params) => Ok(self.execute(&Exchange::new(params, spec.clone()))),
            Resolution::Refused(outcome) => Ok(outcome),
        }
    }

    /// Send a catalog command built from `args`.
    pub fn send_command_kind(
        &mut self,
        id: &ProfileId,
        kind: CommandKind,
        args: &CommandArgs,
    ) -> Result<ExchangeOutcome, ServiceError> {
        let spec = kind.build(args);
        self.send_command(id, &spec)
    }

    /// Event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn execute(&mut self, exchange: &Exchange) -> ExchangeOutcome {
        exchange.run(&mut self.opener, &self.env, &mut self.sink)
    }

    fn resolve(&self, id: &ProfileId) -> Result<Resolution, ServiceError> {
        let profile = self.profiles.profile(id).ok_or_else(|| ServiceError::ConfigurationMissing(id.clone()))?;

        if !profile.active {
            return Ok(Resolution::Refused(ExchangeOutcome::rejected(
                profile.interface,
                format!("profile {id} is deleted"),
                "restore the profile to test it",
            )));
        }
        if profile.interface != InterfaceType::Rs232 {
            return Ok(Resolution::Refused(ExchangeOutcome::rejected(
                profile.interface,
                format!("interface {} not implemented", profile.interface),
                format!("profile={id}"),
            )));
        }

        let params = profile.serial.ok_or_else(|| ServiceError::ConfigurationMissing(id.clone()))?;
        if params.port_name.trim().is_empty() {
            return Ok(Resolution::Refused(ExchangeOutcome::rejected(
                InterfaceType::Rs232,
                "no port name configured",
                format!("profile={id}"),
            )));
        }
        Ok(Resolution::Ready(params))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io, time::Duration};

    use super::*;
    use crate::{
        config::CommProfile,
        error::ErrorKind,
        events::ExchangeEvent,
        transport::{Link, LinkError},
    };

    struct Profiles(HashMap<ProfileId, CommProfile>);

    impl ProfileSource for Profiles {
        fn profile(&self, id: &ProfileId) -> Option<CommProfile> {
            self.0.get(id).cloned()
        }
    }

    /// Opener that must never be reached.
    struct Untouchable;

    impl LinkOpener for Untouchable {
        type Link = Box<dyn Link>;

        fn open(&mut self, params: &SerialParams) -> Result<Self::Link, LinkError> {
            Err(LinkError::Open { port: params.port_name.clone(), reason: "unexpected open".into() })
        }
    }

    struct Silent;

    impl Link for Silent {
        fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
            Ok(0)
        }

        fn purge_input(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn set_control_lines(&mut self, _rts: bool, _dtr: bool) -> io::Result<()> {
            Ok(())
        }
    }

    struct Count(usize);

    impl EventSink for Count {
        fn emit(&mut self, _event: ExchangeEvent) {
            self.0 += 1;
        }
    }

    fn tester<O: LinkOpener>(opener: O, profiles: Vec<CommProfile>) -> CommTester<Profiles, O, SystemEnv, Count> {
        let map = profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        CommTester::new(Profiles(map), opener, SystemEnv, Count(0))
    }

    #[test]
    fn missing_profile_is_an_error() {
        let mut t = tester(Untouchable, vec![]);
        let id = ProfileId::from("ghost");
        assert_eq!(t.test_connection(&id), Err(ServiceError::ConfigurationMissing(id)));
    }

    #[test]
    fn missing_serial_params_is_an_error() {
        let profile = CommProfile { serial: None, ..CommProfile::rs232("p", SerialParams::for_port("COM1")) };
        let mut t = tester(Untouchable, vec![profile]);
        let id = ProfileId::from("p");
        assert!(matches!(
            t.send_command_kind(&id, CommandKind::Ping, &CommandArgs::new()),
            Err(ServiceError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn refused_profiles_never_open() {
        let deleted = CommProfile { active: false, ..CommProfile::rs232("deleted", SerialParams::for_port("COM1")) };
        let usb = CommProfile { interface: InterfaceType::Usb, ..CommProfile::rs232("usb", SerialParams::for_port("COM2")) };
        let blank = CommProfile::rs232("blank", SerialParams::for_port("  "));
        let mut t = tester(Untouchable, vec![deleted, usb, blank]);

        let outcome = t.test_connection(&"deleted".into()).unwrap();
        assert!(!outcome.ok);
        assert!(outcome.message.contains("deleted"));

        let outcome = t.send_command_kind(&"usb".into(), CommandKind::GetStatus, &CommandArgs::new()).unwrap();
        assert!(!outcome.ok);
        assert_eq!(outcome.interface_type, InterfaceType::Usb);
        assert!(outcome.message.contains("not implemented"));

        let outcome = t.send_frame(&"blank".into(), &FrameRequest::new(vec![1])).unwrap();
        assert_eq!(outcome.failure, Some(ErrorKind::Rejected));

        assert_eq!(t.sink().0, 0);
    }

    #[test]
    fn empty_frame_is_refused() {
        let mut t = tester(Untouchable, vec![CommProfile::rs232("p", SerialParams::for_port("COM1"))]);
        let outcome = t.send_frame(&"p".into(), &FrameRequest::default()).unwrap();
        assert!(!outcome.ok);
        assert!(outcome.message.contains("empty frame"));
        assert_eq!(outcome.attempts, 0);
    }

    #[test]
    fn open_failure_becomes_outcome() {
        let params = SerialParams { retries: 2, ..SerialParams::for_port("COM9") };
        let mut t = tester(Untouchable, vec![CommProfile::rs232("p", params)]);
        let outcome = t.test_connection(&"p".into()).unwrap();
        assert!(!outcome.ok);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.failure, Some(ErrorKind::TransportUnavailable));
        assert!(outcome.message.contains("unexpected open"));
    }

    #[test]
    fn frame_request_masks_and_requires_response() {
        let request = FrameRequest {
            bytes: vec![258, 3],
            expect_prefix: vec![-254],
            read_timeout_ms: Some(10),
            ..FrameRequest::default()
        };
        let spec = request.spec();
        assert_eq!(spec.payload, vec![2, 3]);
        assert!(!spec.wrap && !spec.expect_ack);
        assert_eq!(request.expectations().prefix, vec![2]);

        struct SilentOpener;
        impl LinkOpener for SilentOpener {
            type Link = Silent;

            fn open(&mut self, _params: &SerialParams) -> Result<Silent, LinkError> {
                Ok(Silent)
            }
        }

        let mut t = tester(SilentOpener, vec![CommProfile::rs232("p", SerialParams::for_port("COM1"))]);
        let outcome = t.send_frame(&"p".into(), &request).unwrap();
        assert!(!outcome.ok);
        assert_eq!(outcome.failure, Some(ErrorKind::ValidationMismatch));
        assert!(outcome.message.contains("RX=0"));
    }
}
