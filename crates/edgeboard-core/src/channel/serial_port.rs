use super::SerialChannel;
use crate::baud::BaudSetting;
use crate::error::{Error, Result};
use crate::event::UartEvent;
use crate::uart::{UartConfig, UartEventSink};
use crossbeam_channel::{bounded, unbounded, Sender};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::thread::JoinHandle;
use std::time::Duration;

/// A host serial port as shown by `--list-ports`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub port_name: String,
    /// USB vendor and product id, when the port is a USB bridge.
    pub usb_id: Option<(u16, u16)>,
    pub kind: &'static str,
}

impl PortInfo {
    fn from_host(info: SerialPortInfo) -> Self {
        let (kind, usb_id) = match info.port_type {
            SerialPortType::UsbPort(usb) => ("USB", Some((usb.vid, usb.pid))),
            SerialPortType::PciPort => ("PCI", None),
            SerialPortType::BluetoothPort => ("Bluetooth", None),
            SerialPortType::Unknown => ("Unknown", None),
        };
        Self {
            port_name: info.port_name,
            usb_id,
            kind,
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.usb_id {
            Some((vid, pid)) => write!(f, "{} ({:04X}:{:04X})", self.port_name, vid, pid),
            None => write!(f, "{} ({})", self.port_name, self.kind),
        }
    }
}

enum Command {
    Write(Vec<u8>),
    SetBaud(u32, Sender<Result<()>>),
    Close,
}

/// Host serial port driven by a worker thread that plays the role of the
/// peripheral's interrupt handler.
pub struct SerialPortChannel {
    worker: Option<Worker>,
}

struct Worker {
    tx_cmd: Sender<Command>,
    handle: JoinHandle<()>,
}

impl SerialPortChannel {
    pub fn new() -> Self {
        Self { worker: None }
    }

    pub fn list_ports() -> Vec<PortInfo> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(PortInfo::from_host)
            .collect()
    }

    fn worker(&self) -> Result<&Worker> {
        self.worker.as_ref().ok_or(Error::NotInitialized)
    }
}

impl Default for SerialPortChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialChannel for SerialPortChannel {
    fn open(&mut self, cfg: &UartConfig, baud: &BaudSetting, sink: UartEventSink) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let port = serialport::new(&cfg.port_name, baud.nominal)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(50))
            .open()?;

        let (tx_cmd, rx_cmd) = unbounded::<Command>();
        let handle = std::thread::Builder::new()
            .name(format!("uart-{}", cfg.port_name))
            .spawn(move || run_worker(port, rx_cmd, sink))?;

        self.worker = Some(Worker { tx_cmd, handle });
        Ok(())
    }

    fn set_baud(&mut self, baud: &BaudSetting) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.worker()?
            .tx_cmd
            .send(Command::SetBaud(baud.nominal, reply_tx))
            .map_err(|_| Error::ChannelClosed)?;
        reply_rx.recv().map_err(|_| Error::ChannelClosed)?
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.worker()?
            .tx_cmd
            .send(Command::Write(data.to_vec()))
            .map_err(|_| Error::ChannelClosed)
    }

    fn close(&mut self) -> Result<()> {
        let worker = self.worker.take().ok_or(Error::NotInitialized)?;
        let _ = worker.tx_cmd.send(Command::Close);
        worker.handle.join().map_err(|_| Error::ChannelClosed)
    }
}

fn run_worker(
    mut port: Box<dyn SerialPort>,
    rx_cmd: crossbeam_channel::Receiver<Command>,
    sink: UartEventSink,
) {
    let mut buf = [0u8; 256];
    loop {
        match port.read(&mut buf) {
            Ok(n) => {
                for &b in &buf[..n] {
                    sink.on_event(UartEvent::RxChar(b));
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("uart read failed: {e}");
                sink.on_event(UartEvent::Fault);
                std::thread::sleep(Duration::from_millis(50));
            }
        }

        while let Ok(cmd) = rx_cmd.try_recv() {
            match cmd {
                Command::Write(data) => match port.write_all(&data).and_then(|_| port.flush()) {
                    Ok(()) => {
                        sink.on_event(UartEvent::TxDataEmpty);
                        sink.on_event(UartEvent::TxComplete);
                    }
                    Err(e) => {
                        log::error!("uart write failed: {e}");
                        sink.on_event(UartEvent::Fault);
                    }
                },
                Command::SetBaud(rate, reply) => {
                    let _ = reply.send(port.set_baud_rate(rate).map_err(Error::from));
                }
                Command::Close => return,
            }
        }
    }
}
