//! In-memory channel for tests and board-less runs

use super::SerialChannel;
use crate::baud::BaudSetting;
use crate::error::{Error, Result};
use crate::event::UartEvent;
use crate::uart::{UartConfig, UartEventSink};
use parking_lot::Mutex;
use std::sync::Arc;

/// How the mock reacts to a queued transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxBehavior {
    /// Report data-empty then transfer-complete.
    Complete,
    /// Report the given error event only.
    Fail(UartEvent),
    /// Report an overflow error and then completion.
    CompleteAfterError,
    /// Report nothing.
    Stall,
}

/// Mock channel. Clones share state, so a test can keep a handle after
/// moving one into a transport.
#[derive(Clone)]
pub struct MockChannel {
    inner: Arc<Mutex<MockChannelInner>>,
}

struct MockChannelInner {
    sink: Option<UartEventSink>,
    baud: Option<BaudSetting>,
    written: Vec<u8>,
    behavior: TxBehavior,
    echo: bool,
    keep_written: bool,
    fail_open: bool,
}

impl MockChannel {
    pub fn new() -> Self {
        MockChannel {
            inner: Arc::new(Mutex::new(MockChannelInner {
                sink: None,
                baud: None,
                written: Vec::new(),
                behavior: TxBehavior::Complete,
                echo: false,
                keep_written: true,
                fail_open: false,
            })),
        }
    }

    /// Mock that feeds every transmitted byte back as received data.
    pub fn loopback() -> Self {
        let channel = Self::new();
        channel.inner.lock().echo = true;
        channel
    }

    /// Mock that completes every transfer without retaining the bytes, for
    /// long runs with no board attached.
    pub fn discarding() -> Self {
        let channel = Self::new();
        channel.inner.lock().keep_written = false;
        channel
    }

    pub fn set_tx_behavior(&self, behavior: TxBehavior) {
        self.inner.lock().behavior = behavior;
    }

    /// Make the next `open` fail, as a missing peripheral would.
    pub fn fail_open(&self) {
        self.inner.lock().fail_open = true;
    }

    /// Deliver events as if the peripheral raised them.
    pub fn inject(&self, events: &[UartEvent]) {
        let sink = self.inner.lock().sink.clone();
        if let Some(sink) = sink {
            for &event in events {
                sink.on_event(event);
            }
        }
    }

    /// Deliver received bytes.
    pub fn inject_rx(&self, data: &[u8]) {
        let events: Vec<UartEvent> = data.iter().map(|&b| UartEvent::RxChar(b)).collect();
        self.inject(&events);
    }

    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().written.clone()
    }

    pub fn baud(&self) -> Option<BaudSetting> {
        self.inner.lock().baud
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().sink.is_some()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialChannel for MockChannel {
    fn open(&mut self, _cfg: &UartConfig, baud: &BaudSetting, sink: UartEventSink) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_open {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "mock peripheral absent",
            )));
        }
        inner.baud = Some(*baud);
        inner.sink = Some(sink);
        Ok(())
    }

    fn set_baud(&mut self, baud: &BaudSetting) -> Result<()> {
        self.inner.lock().baud = Some(*baud);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        // events are delivered with the mock unlocked
        let (sink, behavior, echo) = {
            let mut inner = self.inner.lock();
            let sink = inner.sink.clone().ok_or(Error::NotInitialized)?;
            if inner.keep_written {
                inner.written.extend_from_slice(data);
            }
            (sink, inner.behavior, inner.echo)
        };

        if echo {
            for &b in data {
                sink.on_event(UartEvent::RxChar(b));
            }
        }

        match behavior {
            TxBehavior::Complete => {
                sink.on_event(UartEvent::TxDataEmpty);
                sink.on_event(UartEvent::TxComplete);
            }
            TxBehavior::Fail(event) => sink.on_event(event),
            TxBehavior::CompleteAfterError => {
                sink.on_event(UartEvent::ErrOverflow);
                sink.on_event(UartEvent::TxComplete);
            }
            TxBehavior::Stall => {}
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.inner.lock().sink = None;
        Ok(())
    }
}
