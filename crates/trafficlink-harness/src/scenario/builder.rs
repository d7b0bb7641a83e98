//! Scenario builder API.

use trafficlink_core::{CommandArgs, CommandKind, Exchange, Expectations, FrameSpec, SerialParams};

use crate::{
    recording::RecordingSink,
    scenario::{OracleFn, World},
    sim_device::{Reply, SimDevice},
    sim_env::SimEnv,
};

/// Scenario builder.
///
/// Describe the device's behaviour and the frame to send, then call
/// `.oracle()` to get a [`RunnableScenario`].
pub struct Scenario {
    name: String,
    seed: u64,
    params: SerialParams,
    spec: FrameSpec,
    expectations: Option<Expectations>,
    replies: Vec<Reply>,
    standing: Option<Reply>,
    open_failures: u32,
    random_chunking: bool,
    control_lines: bool,
}

impl Scenario {
    /// Scenario sending an empty frame to a silent device on `sim0`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed: 0,
            params: SerialParams::for_port("sim0"),
            spec: FrameSpec::new(Vec::<u8>::new()),
            expectations: None,
            replies: Vec::new(),
            standing: None,
            open_failures: 0,
            random_chunking: false,
            control_lines: true,
        }
    }

    /// Seed for the environment RNG.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Connection parameters.
    pub fn params(mut self, params: SerialParams) -> Self {
        self.params = params;
        self
    }

    /// Attempt limit.
    pub fn retries(mut self, retries: u32) -> Self {
        self.params.retries = retries;
        self
    }

    /// Frame to send.
    pub fn send(mut self, spec: FrameSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Catalog command to send.
    pub fn command(self, kind: CommandKind, args: &CommandArgs) -> Self {
        self.send(kind.build(args))
    }

    /// Validate the response.
    pub fn expect(mut self, expectations: Expectations) -> Self {
        self.expectations = Some(expectations);
        self
    }

    /// Queue a device reply.
    pub fn reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }

    /// Reply once the queue is exhausted.
    pub fn always(mut self, reply: Reply) -> Self {
        self.standing = Some(reply);
        self
    }

    /// Fail the first `count` opens.
    pub fn fail_opens(mut self, count: u32) -> Self {
        self.open_failures = count;
        self
    }

    /// Deliver replies in random pieces.
    pub fn chunk_randomly(mut self) -> Self {
        self.random_chunking = true;
        self
    }

    /// Device without modem control lines.
    pub fn without_control_lines(mut self) -> Self {
        self.control_lines = false;
        self
    }

    /// Set the oracle function and return a runnable scenario.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Run the exchange against the scripted device, then the oracle.
    pub fn run(self) -> Result<(), String> {
        let Scenario {
            name,
            seed,
            params,
            spec,
            expectations,
            replies,
            standing,
            open_failures,
            random_chunking,
            control_lines,
        } = self.scenario;

        let env = SimEnv::with_seed(seed);
        let mut device = replies.into_iter().fold(SimDevice::new(env.clone()), SimDevice::reply);
        if let Some(reply) = standing {
            device = device.always(reply);
        }
        if random_chunking {
            device = device.chunk_randomly();
        }
        if !control_lines {
            device = device.without_control_lines();
        }
        device = device.fail_opens(open_failures);

        let mut exchange = Exchange::new(params, spec);
        if let Some(expectations) = expectations {
            exchange = exchange.with_expectations(expectations);
        }

        let mut opener = device.opener();
        let mut sink = RecordingSink::new();
        let outcome = exchange.run(&mut opener, &env, &mut sink);
        drop(opener);

        let world = World::new(outcome, device, sink, env.elapsed());
        (self.oracle)(&world).map_err(|err| format!("Scenario '{name}': {err}"))
    }
}
