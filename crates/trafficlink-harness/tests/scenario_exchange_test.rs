//! Scenario tests for the exchange engine.
//!
//! Each test scripts the simulated controller, runs one exchange, and checks
//! the outcome, the bytes on the wire, and that the link was released.

use trafficlink_core::{CommandArgs, CommandKind, ErrorKind, ExchangeState, FrameSpec, SerialParams};
use trafficlink_harness::{Reply, scenario::Scenario};
use trafficlink_proto::{ACK, ETX, NAK, STX};

const M_PROBE: [u8; 22] = [
    128, 217, 134, 128, 128, 133, 128, 131, 133, 137, 128, 132, 129, 131, 129, 130, 131, 132, 133,
    134, 128, 212,
];

#[test]
fn send_only_preset_transmits_once() {
    let result = Scenario::new("fire and forget")
        .command(CommandKind::MNoAck, &CommandArgs::new())
        .always(Reply::bytes([ACK, 0x02, 0x03]))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if !outcome.ok {
                return Err(format!("expected ok, got {:?}", outcome.message));
            }
            if world.frames_written() != 1 {
                return Err(format!("expected 1 transmission, got {}", world.frames_written()));
            }
            let mut expected = vec![0x02];
            expected.extend_from_slice(&M_PROBE);
            expected.push(0x03);
            if world.device().writes()[0] != expected {
                return Err(format!("unexpected frame {:?}", world.device().writes()[0]));
            }
            if !outcome.received.is_empty() {
                return Err(format!("expected empty trace, got {:?}", outcome.received));
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn ack_then_silence_is_handshake_only() {
    let result = Scenario::new("ack only")
        .send(FrameSpec::new([16_u8, 1]).wrapped(true).with_ack(true))
        .reply(Reply::bytes([ACK]))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if !outcome.ok {
                return Err(format!("expected ok, got {:?}", outcome.message));
            }
            if !outcome.received.is_empty() {
                return Err(format!("expected empty payload, got {:?}", outcome.received));
            }
            if !outcome.message.contains("handshake only") {
                return Err(format!("message should mention the handshake: {:?}", outcome.message));
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn persistent_nak_exhausts_retries() {
    let result = Scenario::new("always NAK")
        .retries(3)
        .send(FrameSpec::new([32_u8, 1]).wrapped(true).with_ack(true))
        .always(Reply::bytes([NAK]))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if outcome.ok {
                return Err("expected failure".to_string());
            }
            if outcome.attempts != 3 || world.frames_written() != 3 {
                return Err(format!(
                    "expected 3 attempts, got {} ({} frames)",
                    outcome.attempts,
                    world.frames_written()
                ));
            }
            if !outcome.message.contains("NAK") || !outcome.message.contains("rejected") {
                return Err(format!("message should reference rejection: {:?}", outcome.message));
            }
            if outcome.failure != Some(ErrorKind::HandshakeRejected) {
                return Err(format!("wrong failure kind {:?}", outcome.failure));
            }
            if world.device().opens() != 3 {
                return Err(format!("expected 3 opens, got {}", world.device().opens()));
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn short_read_reports_counts() {
    let result = Scenario::new("short read")
        .send(FrameSpec::new([32_u8, 1]).with_expect_bytes(7).with_read_timeout_ms(500))
        .reply(Reply::bytes([1, 2]).then_ms(30, [3, 4]))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if outcome.ok {
                return Err("expected failure".to_string());
            }
            if !outcome.message.contains("expected 7") || !outcome.message.contains("received 4") {
                return Err(format!("message should report 7/4: {:?}", outcome.message));
            }
            if outcome.received != [1, 2, 3, 4] {
                return Err(format!("expected a 4-byte trace, got {:?}", outcome.received));
            }
            if outcome.failure != Some(ErrorKind::ReadTimeout) {
                return Err(format!("wrong failure kind {:?}", outcome.failure));
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn open_failures_are_retried() {
    let result = Scenario::new("busy port")
        .retries(3)
        .fail_opens(2)
        .send(FrameSpec::new([1_u8, 2]))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if !outcome.ok {
                return Err(format!("expected ok on third attempt: {:?}", outcome.message));
            }
            if outcome.attempts != 3 {
                return Err(format!("expected 3 attempts, got {}", outcome.attempts));
            }
            if world.events().attempts_failed() != 2 {
                return Err(format!("expected 2 failed attempts, got {}", world.events().attempts_failed()));
            }
            if world.events().states(1) != [ExchangeState::Failed] {
                return Err(format!("attempt 1 states: {:?}", world.events().states(1)));
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn open_failure_on_every_attempt() {
    let result = Scenario::new("port never opens")
        .retries(2)
        .fail_opens(5)
        .send(FrameSpec::new([1_u8]).with_ack(true))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if outcome.ok || outcome.failure != Some(ErrorKind::TransportUnavailable) {
                return Err(format!("expected transport failure, got {:?}", outcome.failure));
            }
            if !outcome.sent.is_empty() || world.frames_written() != 0 {
                return Err("nothing should have been sent".to_string());
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn link_released_after_validation_failure() {
    let result = Scenario::new("release on mismatch")
        .retries(2)
        .send(FrameSpec::new([5_u8]))
        .expect(trafficlink_core::Expectations::new(vec![0x02], vec![]))
        .always(Reply::bytes([0x07, 0x08]))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if outcome.failure != Some(ErrorKind::ValidationMismatch) {
                return Err(format!("wrong failure kind {:?}", outcome.failure));
            }
            if outcome.attempts != 2 {
                return Err(format!("mismatch should be retried, got {} attempts", outcome.attempts));
            }
            if outcome.received != [0x07, 0x08] {
                return Err(format!("trace should survive: {:?}", outcome.received));
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn missing_control_lines_do_not_fail_the_exchange() {
    let result = Scenario::new("no modem lines")
        .without_control_lines()
        .send(FrameSpec::new([1_u8]).with_ack(true))
        .reply(Reply::bytes([ACK]))
        .oracle(Box::new(|world| {
            if !world.outcome().ok {
                return Err(format!("expected ok, got {:?}", world.outcome().message));
            }
            let ignored = world
                .events()
                .events()
                .iter()
                .filter(|e| matches!(e, trafficlink_core::ExchangeEvent::LineControlIgnored { .. }))
                .count();
            if ignored != 1 {
                return Err(format!("expected one ignored line-control event, got {ignored}"));
            }
            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn handshake_timeout_uses_capped_window() {
    let result = Scenario::new("silent device")
        .send(FrameSpec::new([1_u8]).with_ack(true))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if outcome.failure != Some(ErrorKind::HandshakeTimeout) {
                return Err(format!("wrong failure kind {:?}", outcome.failure));
            }
            if !outcome.message.contains("300ms") {
                return Err(format!("window should be 300ms: {:?}", outcome.message));
            }
            // settle delay plus the handshake window
            if world.elapsed().as_millis() != 320 {
                return Err(format!("unexpected virtual time {:?}", world.elapsed()));
            }
            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn every_retry_purges_input() {
    let result = Scenario::new("NAK then retry")
        .retries(3)
        .send(FrameSpec::new([32_u8, 1]).wrapped(true).with_ack(true))
        .always(Reply::bytes([NAK]))
        .oracle(Box::new(|world| {
            let device = world.device();
            if device.opens() != 3 || device.purges() != device.opens() {
                return Err(format!(
                    "expected one purge per open, got {} purges for {} opens",
                    device.purges(),
                    device.opens()
                ));
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn short_reads_purge_again_before_retrying() {
    let result = Scenario::new("short read twice")
        .retries(2)
        .send(FrameSpec::new([32_u8, 1]).with_expect_bytes(7).with_read_timeout_ms(200))
        .always(Reply::bytes([1, 2]))
        .oracle(Box::new(|world| {
            let outcome = world.outcome();
            if outcome.failure != Some(ErrorKind::ReadTimeout) || outcome.attempts != 2 {
                return Err(format!("expected two short reads, got {:?} after {}", outcome.failure, outcome.attempts));
            }
            // one purge when the port opens, one after each short read
            if world.device().purges() != 4 {
                return Err(format!("expected 4 purges, got {}", world.device().purges()));
            }
            if outcome.received != [1, 2] {
                return Err(format!("each attempt starts with an empty trace: {:?}", outcome.received));
            }
            world.check_released()
        }))
        .run();

    assert!(result.is_ok(), "scenario failed: {result:?}");
}

#[test]
fn seeded_chunking_on_configured_port() {
    for seed in [1, 7, 42] {
        let params = SerialParams { read_timeout_ms: 400, ..SerialParams::for_port("COM9") };
        let response = [STX, 0x31, 0x32, 0x33, 0x34, ETX];
        let mut wire = vec![ACK];
        wire.extend_from_slice(&response);

        let result = Scenario::new("chunked wrapped reply")
            .seed(seed)
            .params(params)
            .chunk_randomly()
            .send(FrameSpec::new([16_u8, 1]).wrapped(true).with_ack(true))
            .reply(Reply::bytes(wire))
            .oracle(Box::new(move |world| {
                let outcome = world.outcome();
                if !outcome.ok || outcome.received != response {
                    return Err(format!("seed {seed}: got {:?} ({})", outcome.received, outcome.message));
                }
                if !outcome.details.starts_with("port=COM9") {
                    return Err(format!("params not applied: {}", outcome.details));
                }
                world.check_released()
            }))
            .run();

        assert!(result.is_ok(), "scenario failed: {result:?}");
    }
}
