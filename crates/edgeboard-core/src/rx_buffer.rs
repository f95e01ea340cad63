//! Line buffer filled by the receive callback and drained by the foreground.

/// Capacity of the receive buffer in bytes.
pub const RX_BUFFER_SIZE: usize = 512;

/// Byte the foreground looks for while inference is running.
pub const ABORT_BYTE: u8 = b'b';

/// What to do with received bytes once the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Discard the byte and count it.
    #[default]
    Drop,
    /// Discard the byte, count it and raise the transport error flag.
    Flag,
}

/// Outcome of pushing one received byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Stored,
    Dropped,
}

/// Linear receive buffer with separate write and read indices.
///
/// Invariant: `read <= write <= RX_BUFFER_SIZE`. Both indices return to zero
/// when a completed line has been consumed.
pub struct RxBuffer {
    data: [u8; RX_BUFFER_SIZE],
    write: usize,
    read: usize,
    line_complete: bool,
    dropped: u64,
    /// An abort byte arrived while the buffer was full.
    abort_dropped: bool,
}

impl RxBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0u8; RX_BUFFER_SIZE],
            write: 0,
            read: 0,
            line_complete: false,
            dropped: 0,
            abort_dropped: false,
        }
    }

    /// Store a received byte. A carriage return marks the line complete even
    /// when the byte itself had to be dropped, so a full buffer can drain.
    pub fn push(&mut self, byte: u8, terminator: u8) -> Push {
        let outcome = if self.write < RX_BUFFER_SIZE {
            self.data[self.write] = byte;
            self.write += 1;
            Push::Stored
        } else {
            self.dropped += 1;
            if byte == ABORT_BYTE {
                self.abort_dropped = true;
            }
            Push::Dropped
        };
        if byte == terminator {
            self.line_complete = true;
        }
        outcome
    }

    pub fn mark_complete(&mut self) {
        self.line_complete = true;
    }

    /// Next byte of a completed line, or `None`.
    ///
    /// Consuming the last byte resets both indices and clears the line flag.
    /// A completed line with nothing left to read only resets the indices.
    pub fn take(&mut self) -> Option<u8> {
        if !self.line_complete {
            return None;
        }
        if self.read < self.write {
            let byte = self.data[self.read];
            self.read += 1;
            if self.read == self.write {
                self.reset_indices();
                self.line_complete = false;
            }
            Some(byte)
        } else {
            self.reset_indices();
            None
        }
    }

    /// Report the abort byte if one is waiting in the unread region, or was
    /// dropped since the last reset. Nothing is consumed.
    pub fn peek_abort(&self) -> Option<u8> {
        let waiting = self.abort_dropped || self.data[self.read..self.write].contains(&ABORT_BYTE);
        waiting.then_some(ABORT_BYTE)
    }

    fn reset_indices(&mut self) {
        self.write = 0;
        self.read = 0;
        self.abort_dropped = false;
    }

    pub fn is_line_complete(&self) -> bool {
        self.line_complete
    }

    pub fn write_index(&self) -> usize {
        self.write
    }

    pub fn read_index(&self) -> usize {
        self.read
    }

    /// Bytes received but not yet consumed.
    pub fn pending(&self) -> usize {
        self.write - self.read
    }

    /// Total bytes dropped because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for RxBuffer {
    fn default() -> Self {
        Self::new()
    }
}
