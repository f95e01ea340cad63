/// Carriage return, terminates a received command line.
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Hardware events reported by a serial channel to its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartEvent {
    RxChar(u8),
    RxComplete,
    TxComplete,
    TxDataEmpty,
    ErrParity,
    ErrFraming,
    ErrOverflow,
    BreakDetect,
    /// Driver-level failure with no matching line condition (hosted backends).
    Fault,
}
