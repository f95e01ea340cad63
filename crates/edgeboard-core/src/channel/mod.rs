//! Hardware channel abstraction underneath the UART transport.

use crate::baud::BaudSetting;
use crate::error::Result;
use crate::uart::{UartConfig, UartEventSink};

mod mock;
mod serial_port;

pub use mock::{MockChannel, TxBehavior};
pub use serial_port::{PortInfo, SerialPortChannel};

/// A serial peripheral that reports its activity as [`crate::UartEvent`]s.
pub trait SerialChannel: Send {
    /// Open the channel and start delivering events to `sink`.
    fn open(&mut self, cfg: &UartConfig, baud: &BaudSetting, sink: UartEventSink) -> Result<()>;

    /// Reprogram the bit-rate generator.
    fn set_baud(&mut self, baud: &BaudSetting) -> Result<()>;

    /// Start transmitting `data`. Returns once the transfer is queued;
    /// completion is reported through the sink.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Release the channel. Events stop after this returns.
    fn close(&mut self) -> Result<()>;
}
