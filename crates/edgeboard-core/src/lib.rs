//! Core functionalities: UART transport, receive buffer, hardware channels.

pub mod baud;
pub mod channel;
pub mod error;
pub mod event;
pub mod rx_buffer;
pub mod uart;

pub use baud::{BaudRate, BaudSetting};
pub use channel::{MockChannel, PortInfo, SerialChannel, SerialPortChannel, TxBehavior};
pub use error::{Error, Result};
pub use event::{UartEvent, CARRIAGE_RETURN};
pub use rx_buffer::{OverflowPolicy, RX_BUFFER_SIZE};
pub use uart::{RxState, Uart, UartConfig, UartEventSink};
