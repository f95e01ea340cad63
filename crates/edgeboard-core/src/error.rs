pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel not initialized")]
    NotInitialized,

    #[error("channel already initialized")]
    AlreadyInitialized,

    /// An error event (parity, framing, overflow, break or driver fault)
    /// arrived before the transfer completed.
    #[error("transfer aborted by error event")]
    TransferAborted,

    #[error("transfer did not complete within {0:?}")]
    Timeout(std::time::Duration),

    #[error("driver worker has stopped")]
    ChannelClosed,
}
