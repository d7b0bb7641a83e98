//! Serial-port links.
//!
//! [`SerialOpener`] turns [`SerialParams`] into an open `serialport` handle
//! wrapped as a [`Link`]. Dropping the [`SerialLink`] closes the port.
//!
//! Mark/space parity and one-and-a-half stop bits are valid profile values
//! but the driver cannot express them; opening such a profile fails with
//! [`LinkError::Unsupported`].

use std::{
    io::{self, Read, Write},
    time::Duration,
};

use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tracing::debug;
use trafficlink_core::{
    Link, LinkError, LinkOpener, SerialParams,
    config::{FlowControl, Parity, StopBits},
};

/// Opens serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl LinkOpener for SerialOpener {
    type Link = SerialLink;

    fn open(&mut self, params: &SerialParams) -> Result<SerialLink, LinkError> {
        let port_name = params.port_name.as_str();
        let unsupported = |setting: String| LinkError::Unsupported { port: port_name.to_string(), setting };

        let data_bits =
            data_bits(params.data_bits).ok_or_else(|| unsupported(format!("data_bits={}", params.data_bits)))?;
        let parity = parity(params.parity).ok_or_else(|| unsupported(format!("parity={}", params.parity)))?;
        let stop_bits =
            stop_bits(params.stop_bits).ok_or_else(|| unsupported(format!("stop_bits={}", params.stop_bits)))?;

        let port = serialport::new(port_name, params.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(flow_control(params.flow_control))
            .timeout(params.read_timeout())
            .open()
            .map_err(|err| LinkError::Open { port: port_name.to_string(), reason: err.to_string() })?;

        debug!(port = port_name, baud = params.baud_rate, "serial port opened");
        Ok(SerialLink { port, write_timeout: params.write_timeout() })
    }
}

/// An open serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    write_timeout: Duration,
}

impl Link for SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.set_timeout(self.write_timeout)?;
        self.port.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.port.set_timeout(timeout)?;
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if is_timeout(&err) => Ok(0),
            Err(err) => Err(err),
        }
    }

    fn purge_input(&mut self) -> io::Result<()> {
        Ok(self.port.clear(ClearBuffer::Input)?)
    }

    fn set_control_lines(&mut self, rts: bool, dtr: bool) -> io::Result<()> {
        self.port.write_request_to_send(rts)?;
        self.port.write_data_terminal_ready(dtr)?;
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        debug!(port = ?self.port.name(), "serial port closed");
    }
}

/// A serial port visible to the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS name, as used in profiles.
    pub name: String,
    /// Short description of the port kind.
    pub kind: String,
}

/// Enumerate serial ports.
pub fn list_ports() -> Result<Vec<PortInfo>, LinkError> {
    let ports = serialport::available_ports().map_err(|err| LinkError::Io(err.into()))?;
    Ok(ports
        .into_iter()
        .map(|p| PortInfo { kind: port_kind(&p.port_type), name: p.port_name })
        .collect())
}

fn port_kind(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => match (&usb.manufacturer, &usb.product) {
            (Some(m), Some(p)) => format!("usb {m} {p}"),
            _ => format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
        },
        SerialPortType::PciPort => "pci".to_string(),
        SerialPortType::BluetoothPort => "bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

fn data_bits(bits: u8) -> Option<serialport::DataBits> {
    match bits {
        5 => Some(serialport::DataBits::Five),
        6 => Some(serialport::DataBits::Six),
        7 => Some(serialport::DataBits::Seven),
        8 => Some(serialport::DataBits::Eight),
        _ => None,
    }
}

fn parity(parity: Parity) -> Option<serialport::Parity> {
    match parity {
        Parity::None => Some(serialport::Parity::None),
        Parity::Even => Some(serialport::Parity::Even),
        Parity::Odd => Some(serialport::Parity::Odd),
        Parity::Mark | Parity::Space => None,
    }
}

fn stop_bits(stop_bits: StopBits) -> Option<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Some(serialport::StopBits::One),
        StopBits::Two => Some(serialport::StopBits::Two),
        StopBits::OnePointFive => None,
    }
}

fn flow_control(flow: FlowControl) -> serialport::FlowControl {
    match flow {
        FlowControl::None => serialport::FlowControl::None,
        FlowControl::Hardware => serialport::FlowControl::Hardware,
        FlowControl::Software => serialport::FlowControl::Software,
    }
}
