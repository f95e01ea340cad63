//! Line-buffered receive and completion-confirmed transmit over a
//! [`SerialChannel`].
//!
//! The channel's driver reports hardware events through a [`UartEventSink`]
//! (the interrupt callback). The foreground owns the [`Uart`] and blocks on
//! the flags the callback sets.

use crate::baud::{BaudRate, PERIPHERAL_CLOCK_HZ};
use crate::channel::SerialChannel;
use crate::error::{Error, Result};
use crate::event::{UartEvent, CARRIAGE_RETURN};
use crate::rx_buffer::{OverflowPolicy, Push, RxBuffer};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct UartConfig {
    pub port_name: String,
    /// `None` waits for a terminal event forever.
    pub write_timeout: Option<Duration>,
    pub overflow: OverflowPolicy,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            write_timeout: None,
            overflow: OverflowPolicy::Drop,
        }
    }
}

struct TxFlags {
    completed: bool,
    empty: bool,
    error: bool,
    /// Transfers handed to the channel whose `TxComplete` has not arrived.
    in_flight: u32,
}

struct Shared {
    rx: Mutex<RxBuffer>,
    tx: Mutex<TxFlags>,
    tx_changed: Condvar,
    overflow: OverflowPolicy,
}

impl Shared {
    fn new(overflow: OverflowPolicy) -> Self {
        Self {
            rx: Mutex::new(RxBuffer::new()),
            tx: Mutex::new(TxFlags {
                completed: false,
                empty: true,
                error: false,
                in_flight: 0,
            }),
            tx_changed: Condvar::new(),
            overflow,
        }
    }

    fn set_tx(&self, update: impl FnOnce(&mut TxFlags)) {
        let mut flags = self.tx.lock();
        update(&mut *flags);
        self.tx_changed.notify_all();
    }
}

/// Producer half handed to the channel driver. Cheap to clone.
#[derive(Clone)]
pub struct UartEventSink {
    shared: Arc<Shared>,
}

impl UartEventSink {
    /// Apply one hardware event. Never blocks beyond a short critical section.
    pub fn on_event(&self, event: UartEvent) {
        match event {
            UartEvent::RxChar(byte) => {
                let pushed = self.shared.rx.lock().push(byte, CARRIAGE_RETURN);
                if pushed == Push::Dropped {
                    log::warn!("rx buffer full, dropped {:#04x}", byte);
                    if self.shared.overflow == OverflowPolicy::Flag {
                        self.shared.set_tx(|f| {
                            f.error = true;
                            f.in_flight = 0;
                        });
                    }
                }
            }
            UartEvent::RxComplete => self.shared.rx.lock().mark_complete(),
            UartEvent::TxComplete => self.shared.set_tx(|f| {
                f.completed = true;
                f.in_flight = f.in_flight.saturating_sub(1);
            }),
            UartEvent::TxDataEmpty => self.shared.set_tx(|f| f.empty = true),
            UartEvent::ErrParity
            | UartEvent::ErrFraming
            | UartEvent::ErrOverflow
            | UartEvent::BreakDetect
            | UartEvent::Fault => {
                log::debug!("uart error event: {:?}", event);
                // an error ends every outstanding transfer
                self.shared.set_tx(|f| {
                    f.error = true;
                    f.in_flight = 0;
                });
            }
        }
    }
}

/// Snapshot of the receive side, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxState {
    pub write_index: usize,
    pub read_index: usize,
    pub line_complete: bool,
    pub dropped: u64,
}

pub struct Uart<C: SerialChannel> {
    channel: C,
    cfg: UartConfig,
    shared: Arc<Shared>,
    opened: bool,
}

impl<C: SerialChannel> Uart<C> {
    pub fn new(channel: C, cfg: UartConfig) -> Self {
        let shared = Arc::new(Shared::new(cfg.overflow));
        Self {
            channel,
            cfg,
            shared,
            opened: false,
        }
    }

    /// The callback side of this transport.
    pub fn event_sink(&self) -> UartEventSink {
        UartEventSink {
            shared: self.shared.clone(),
        }
    }

    /// Open the channel at the default rate.
    pub fn initialize(&mut self) -> Result<()> {
        if self.opened {
            return Err(Error::AlreadyInitialized);
        }
        let sink = self.event_sink();
        self.channel.open(&self.cfg, BaudRate::Default.setting(), sink)?;
        self.opened = true;
        log::info!(
            "uart open on {:?} at {} baud",
            self.cfg.port_name,
            BaudRate::Default.setting().nominal
        );
        Ok(())
    }

    pub fn set_baud(&mut self, use_max: bool) -> Result<()> {
        self.ensure_open()?;
        let setting = BaudRate::from_max(use_max).setting();
        self.channel.set_baud(setting)?;
        log::info!(
            "uart baud set to {} ({:+.3}% error)",
            setting.nominal,
            setting.error_percent(PERIPHERAL_CLOCK_HZ)
        );
        Ok(())
    }

    /// Write `data` and wait until the driver reports completion or an error.
    ///
    /// Completion is checked before the error flag on every wake. A transfer
    /// left behind by an earlier timeout must finish before this one starts,
    /// so its late `TxComplete` cannot be taken for ours. The configured
    /// timeout covers both waits.
    pub fn write_blocking(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let deadline = self.deadline();
        {
            let mut flags = self.shared.tx.lock();
            self.wait_tx(&mut flags, deadline, |f| f.in_flight == 0)?;
            flags.completed = false;
            flags.error = false;
            flags.in_flight += 1;
        }

        log::debug!("tx {} bytes: {}", data.len(), hex::encode(data));
        if let Err(e) = self.channel.write(data) {
            self.shared.set_tx(|f| f.in_flight = f.in_flight.saturating_sub(1));
            return Err(e);
        }

        let mut flags = self.shared.tx.lock();
        self.wait_tx(&mut flags, deadline, |f| f.completed || f.error)?;
        if flags.completed {
            Ok(())
        } else {
            Err(Error::TransferAborted)
        }
    }

    /// Single-byte write paced by the transmit-empty flag.
    pub fn write_byte_polled(&mut self, byte: u8) -> Result<()> {
        self.ensure_open()?;
        let deadline = self.deadline();
        self.shared.set_tx(|f| f.in_flight += 1);
        if let Err(e) = self.channel.write(&[byte]) {
            self.shared.set_tx(|f| f.in_flight = f.in_flight.saturating_sub(1));
            return Err(e);
        }

        let mut flags = self.shared.tx.lock();
        self.wait_tx(&mut flags, deadline, |f| f.empty)?;
        flags.empty = false;
        Ok(())
    }

    /// Next byte of a completed line, or `None`.
    ///
    /// While inference is running and no line is complete, reports the abort
    /// byte if one is waiting anywhere in the unread region, or arrived
    /// while the buffer was full, without consuming it.
    pub fn read_available(&self, is_inference_running: bool) -> Option<u8> {
        let mut rx = self.shared.rx.lock();
        if rx.is_line_complete() {
            rx.take()
        } else if is_inference_running {
            rx.peek_abort()
        } else {
            None
        }
    }

    /// Close the channel. Failures are logged only.
    pub fn deinitialize(&mut self) {
        if !self.opened {
            return;
        }
        self.opened = false;
        match self.channel.close() {
            Ok(()) => log::info!("uart closed"),
            Err(e) => log::warn!("uart close failed: {e}"),
        }
    }

    pub fn rx_state(&self) -> RxState {
        let rx = self.shared.rx.lock();
        RxState {
            write_index: rx.write_index(),
            read_index: rx.read_index(),
            line_complete: rx.is_line_complete(),
            dropped: rx.dropped(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    pub fn config(&self) -> &UartConfig {
        &self.cfg
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    fn deadline(&self) -> Option<(Duration, Instant)> {
        self.cfg.write_timeout.map(|t| (t, Instant::now() + t))
    }

    /// Block on the transmit condvar until `done` holds or the deadline passes.
    fn wait_tx(
        &self,
        flags: &mut MutexGuard<'_, TxFlags>,
        deadline: Option<(Duration, Instant)>,
        done: impl Fn(&TxFlags) -> bool,
    ) -> Result<()> {
        while !done(&**flags) {
            match deadline {
                None => self.shared.tx_changed.wait(flags),
                Some((timeout, at)) => {
                    let timed_out = self.shared.tx_changed.wait_until(flags, at).timed_out();
                    if timed_out && !done(&**flags) {
                        return Err(Error::Timeout(timeout));
                    }
                }
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.opened {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }
}

impl<C: SerialChannel> Drop for Uart<C> {
    fn drop(&mut self) {
        self.deinitialize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baud::BaudSetting;
    use crate::channel::{MockChannel, TxBehavior};

    fn open_uart(behavior: TxBehavior) -> (Uart<MockChannel>, UartEventSink) {
        let channel = MockChannel::new();
        channel.set_tx_behavior(behavior);
        let mut uart = Uart::new(channel, UartConfig::default());
        uart.initialize().unwrap();
        let sink = uart.event_sink();
        (uart, sink)
    }

    fn feed(sink: &UartEventSink, bytes: &[u8]) {
        for &b in bytes {
            sink.on_event(UartEvent::RxChar(b));
        }
    }

    #[test]
    fn no_data_until_carriage_return() {
        let (uart, sink) = open_uart(TxBehavior::Complete);
        feed(&sink, b"status");
        for _ in 0..3 {
            assert_eq!(uart.read_available(false), None);
        }
        feed(&sink, b"\r");
        assert_eq!(uart.read_available(false), Some(b's'));
    }

    #[test]
    fn hi_cr_scenario() {
        let (uart, sink) = open_uart(TxBehavior::Complete);
        feed(&sink, b"hi\r");
        assert_eq!(uart.read_available(false), Some(b'h'));
        assert_eq!(uart.read_available(false), Some(b'i'));
        assert_eq!(uart.read_available(false), Some(b'\r'));
        assert_eq!(uart.read_available(false), None);

        let state = uart.rx_state();
        assert_eq!(state.write_index, 0);
        assert_eq!(state.read_index, 0);
        assert!(!state.line_complete);
    }

    #[test]
    fn drained_buffer_stays_quiet() {
        let (uart, sink) = open_uart(TxBehavior::Complete);
        feed(&sink, b"x\r");
        while uart.read_available(false).is_some() {}
        let before = uart.rx_state();
        for _ in 0..5 {
            assert_eq!(uart.read_available(false), None);
            assert_eq!(uart.read_available(true), None);
        }
        assert_eq!(uart.rx_state(), before);
    }

    #[test]
    fn abort_byte_peek_during_inference() {
        let (uart, sink) = open_uart(TxBehavior::Complete);
        feed(&sink, b"ab");
        assert_eq!(uart.read_available(false), None);
        assert_eq!(uart.read_available(true), Some(b'b'));
        assert_eq!(uart.read_available(true), Some(b'b'));

        let state = uart.rx_state();
        assert!(!state.line_complete);
        assert_eq!(state.write_index, 2);
        assert_eq!(state.read_index, 0);
    }

    #[test]
    fn abort_byte_survives_a_full_buffer() {
        let (uart, sink) = open_uart(TxBehavior::Complete);
        feed(&sink, &[b'z'; crate::rx_buffer::RX_BUFFER_SIZE]);
        feed(&sink, b"b");
        assert_eq!(uart.rx_state().dropped, 1);
        assert_eq!(uart.read_available(false), None);
        assert_eq!(uart.read_available(true), Some(b'b'));
    }

    #[test]
    fn rx_complete_event_releases_partial_line() {
        let (uart, sink) = open_uart(TxBehavior::Complete);
        feed(&sink, b"ok");
        sink.on_event(UartEvent::RxComplete);
        assert_eq!(uart.read_available(false), Some(b'o'));
        assert_eq!(uart.read_available(false), Some(b'k'));
        assert_eq!(uart.read_available(false), None);
    }

    #[test]
    fn stale_completion_returns_none() {
        let (uart, sink) = open_uart(TxBehavior::Complete);
        sink.on_event(UartEvent::RxComplete);
        assert_eq!(uart.read_available(false), None);
        assert_eq!(uart.rx_state().write_index, 0);
    }

    #[test]
    fn write_blocking_succeeds_on_completion() {
        let (mut uart, _sink) = open_uart(TxBehavior::Complete);
        uart.write_blocking(b"hello\n").unwrap();
        assert_eq!(uart.channel().written(), b"hello\n");
    }

    #[test]
    fn write_blocking_aborts_on_error_event() {
        let (mut uart, _sink) = open_uart(TxBehavior::Fail(UartEvent::ErrFraming));
        let err = uart.write_blocking(b"partial").unwrap_err();
        assert!(matches!(err, Error::TransferAborted));
    }

    #[test]
    fn completion_wins_when_both_flags_are_set() {
        let (mut uart, _sink) = open_uart(TxBehavior::CompleteAfterError);
        uart.write_blocking(b"x").unwrap();
    }

    #[test]
    fn stale_error_is_cleared_by_next_write() {
        let (mut uart, sink) = open_uart(TxBehavior::Complete);
        sink.on_event(UartEvent::BreakDetect);
        uart.write_blocking(b"ok").unwrap();
    }

    #[test]
    fn stalled_write_times_out_when_configured() {
        let channel = MockChannel::new();
        channel.set_tx_behavior(TxBehavior::Stall);
        let cfg = UartConfig {
            write_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let mut uart = Uart::new(channel, cfg);
        uart.initialize().unwrap();
        assert!(matches!(
            uart.write_blocking(b"x"),
            Err(Error::Timeout(_))
        ));
    }

    #[test]
    fn polled_byte_consumes_empty_flag() {
        let (mut uart, _sink) = open_uart(TxBehavior::Complete);
        uart.write_byte_polled(b'A').unwrap();
        uart.write_byte_polled(b'B').unwrap();
        assert_eq!(uart.channel().written(), b"AB");
    }

    #[test]
    fn polled_byte_waits_for_empty_event() {
        let channel = MockChannel::new();
        channel.set_tx_behavior(TxBehavior::Stall);
        let cfg = UartConfig {
            write_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let mut uart = Uart::new(channel, cfg);
        uart.initialize().unwrap();
        // idle transmitter at reset
        uart.write_byte_polled(b'1').unwrap();
        assert!(matches!(
            uart.write_byte_polled(b'2'),
            Err(Error::Timeout(_))
        ));
        uart.event_sink().on_event(UartEvent::TxDataEmpty);
        uart.write_byte_polled(b'3').unwrap();
    }

    #[test]
    fn set_baud_selects_fixed_settings() {
        let (mut uart, _sink) = open_uart(TxBehavior::Complete);
        uart.set_baud(true).unwrap();
        assert_eq!(uart.channel().baud(), Some(BaudSetting::MAX));
        uart.set_baud(false).unwrap();
        assert_eq!(uart.channel().baud(), Some(BaudSetting::DEFAULT));
    }

    #[test]
    fn operations_require_initialize() {
        let mut uart = Uart::new(MockChannel::new(), UartConfig::default());
        assert!(matches!(uart.write_blocking(b"x"), Err(Error::NotInitialized)));
        assert!(matches!(uart.set_baud(true), Err(Error::NotInitialized)));
        uart.initialize().unwrap();
        assert!(matches!(uart.initialize(), Err(Error::AlreadyInitialized)));
    }

    #[test]
    fn deinitialize_closes_channel() {
        let (mut uart, _sink) = open_uart(TxBehavior::Complete);
        uart.deinitialize();
        assert!(!uart.is_open());
        assert!(!uart.channel().is_open());
    }

    #[test]
    fn overflow_flag_policy_aborts_pending_write() {
        let channel = MockChannel::new();
        channel.set_tx_behavior(TxBehavior::Stall);
        let cfg = UartConfig {
            overflow: OverflowPolicy::Flag,
            write_timeout: Some(Duration::from_millis(500)),
            ..Default::default()
        };
        let mut uart = Uart::new(channel, cfg);
        uart.initialize().unwrap();
        let sink = uart.event_sink();
        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            feed(&sink, &[b'z'; crate::rx_buffer::RX_BUFFER_SIZE + 1]);
        });
        assert!(matches!(
            uart.write_blocking(b"x"),
            Err(Error::TransferAborted)
        ));
        producer.join().unwrap();
        assert_eq!(uart.rx_state().dropped, 1);
    }

    #[test]
    fn every_error_event_aborts_the_transfer() {
        let errors = [
            UartEvent::ErrParity,
            UartEvent::ErrFraming,
            UartEvent::ErrOverflow,
            UartEvent::BreakDetect,
            UartEvent::Fault,
        ];
        for event in errors {
            let (mut uart, _sink) = open_uart(TxBehavior::Fail(event));
            match uart.write_blocking(b"frame") {
                Err(Error::TransferAborted) => {}
                other => panic!("{event:?}: expected TransferAborted, got {other:?}"),
            }
            // the aborted transfer does not hold up the next one
            uart.channel().set_tx_behavior(TxBehavior::Complete);
            uart.write_blocking(b"next").unwrap();
        }
    }

    fn stalled_uart(timeout_ms: u64) -> Uart<MockChannel> {
        let channel = MockChannel::new();
        channel.set_tx_behavior(TxBehavior::Stall);
        let cfg = UartConfig {
            write_timeout: Some(Duration::from_millis(timeout_ms)),
            ..Default::default()
        };
        let mut uart = Uart::new(channel, cfg);
        uart.initialize().unwrap();
        uart
    }

    #[test]
    fn late_completion_of_timed_out_write_is_not_reused() {
        let mut uart = stalled_uart(200);
        assert!(matches!(uart.write_blocking(b"first"), Err(Error::Timeout(_))));

        let sink = uart.event_sink();
        let late = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            sink.on_event(UartEvent::TxComplete);
        });
        // the late event releases "first"; "second" is never confirmed
        assert!(matches!(uart.write_blocking(b"second"), Err(Error::Timeout(_))));
        late.join().unwrap();
        assert_eq!(uart.channel().written(), b"firstsecond");
    }

    #[test]
    fn unfinished_transfer_blocks_the_next_write() {
        let mut uart = stalled_uart(20);
        assert!(matches!(uart.write_blocking(b"first"), Err(Error::Timeout(_))));
        assert!(matches!(uart.write_blocking(b"second"), Err(Error::Timeout(_))));
        assert_eq!(uart.channel().written(), b"first");

        uart.event_sink().on_event(UartEvent::TxComplete);
        uart.channel().set_tx_behavior(TxBehavior::Complete);
        uart.write_blocking(b"third").unwrap();
        assert_eq!(uart.channel().written(), b"firstthird");
    }
}
