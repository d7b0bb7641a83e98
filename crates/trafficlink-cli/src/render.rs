//! Human and JSON rendering of a [`Report`].

use std::fmt::Write as _;

use serde::Serialize;
use trafficlink_core::{CommandKind, ExchangeOutcome};
use trafficlink_serial::PortInfo;

use crate::{CliError, app::Report};

#[derive(Serialize)]
struct PortRow<'a> {
    name: &'a str,
    kind: &'a str,
}

#[derive(Serialize)]
struct CommandRow {
    name: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct OutcomeDoc<'a> {
    #[serde(flatten)]
    outcome: &'a ExchangeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a [u8]>,
}

/// Render `report` as text, or as pretty JSON when `json` is set.
pub fn render(report: &Report, json: bool) -> Result<String, CliError> {
    if json {
        return render_json(report);
    }
    Ok(match report {
        Report::Ports(ports) => ports_text(ports),
        Report::Commands => commands_text(),
        Report::Outcome { outcome, payload } => outcome_text(outcome, payload.as_deref()),
    })
}

fn render_json(report: &Report) -> Result<String, CliError> {
    let text = match report {
        Report::Ports(ports) => {
            let rows: Vec<_> = ports.iter().map(|p| PortRow { name: &p.name, kind: &p.kind }).collect();
            serde_json::to_string_pretty(&rows)?
        },
        Report::Commands => serde_json::to_string_pretty(&command_rows())?,
        Report::Outcome { outcome, payload } => {
            serde_json::to_string_pretty(&OutcomeDoc { outcome, payload: payload.as_deref() })?
        },
    };
    Ok(text)
}

fn command_rows() -> Vec<CommandRow> {
    CommandKind::ALL.into_iter().map(|kind| CommandRow { name: kind.name(), description: kind.description() }).collect()
}

fn ports_text(ports: &[PortInfo]) -> String {
    if ports.is_empty() {
        return "no serial ports found\n".to_string();
    }
    let width = ports.iter().map(|p| p.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for port in ports {
        let _ = writeln!(out, "{:width$}  {}", port.name, port.kind);
    }
    out
}

fn commands_text() -> String {
    let rows = command_rows();
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(out, "{:width$}  {}", row.name, row.description);
    }
    out
}

/// Text block for one outcome.
pub fn outcome_text(outcome: &ExchangeOutcome, payload: Option<&[u8]>) -> String {
    let mut out = String::new();
    let status = if outcome.ok { "OK" } else { "FAILED" };
    let _ = writeln!(out, "{status}: {}", outcome.message);
    let _ = writeln!(out, "  interface: {}", outcome.interface_type);
    let _ = writeln!(out, "  attempts:  {}", outcome.attempts);
    let _ = writeln!(out, "  elapsed:   {} ms", outcome.elapsed_ms);
    if let Some(kind) = outcome.failure {
        let _ = writeln!(out, "  failure:   {kind:?}");
    }
    if let Some(payload) = payload {
        let _ = writeln!(out, "  payload:   {payload:?} ({})", hex::encode_upper(payload));
    }
    let _ = writeln!(out, "  {}", outcome.details);
    out
}
