use edgeboard_core::{
    Error, MockChannel, TxBehavior, Uart, UartConfig, UartEvent, RX_BUFFER_SIZE,
};
use std::thread;
use std::time::Duration;

fn stalled_uart() -> (Uart<MockChannel>, MockChannel) {
    let channel = MockChannel::new();
    channel.set_tx_behavior(TxBehavior::Stall);
    let handle = channel.clone();
    let mut uart = Uart::new(channel, UartConfig::default());
    uart.initialize().unwrap();
    (uart, handle)
}

#[test]
fn blocking_write_waits_for_late_completion() {
    let (mut uart, handle) = stalled_uart();
    let irq = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        handle.inject(&[UartEvent::TxDataEmpty, UartEvent::TxComplete]);
    });
    uart.write_blocking(b"Predictions\n").unwrap();
    irq.join().unwrap();
}

#[test]
fn error_mid_write_aborts_transfer() {
    let (mut uart, handle) = stalled_uart();
    let irq = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        // a few bytes made it out before the line failed
        handle.inject(&[UartEvent::TxDataEmpty, UartEvent::TxDataEmpty]);
        thread::sleep(Duration::from_millis(10));
        handle.inject(&[UartEvent::ErrFraming]);
    });
    let result = uart.write_blocking(b"a longer message");
    irq.join().unwrap();
    assert!(matches!(result, Err(Error::TransferAborted)));
}

#[test]
fn line_from_producer_thread_is_read_in_order() {
    let (uart, handle) = stalled_uart();
    let irq = thread::spawn(move || {
        for &b in b"status 2000" {
            handle.inject_rx(&[b]);
            thread::sleep(Duration::from_millis(1));
        }
        handle.inject_rx(b"\r");
    });
    irq.join().unwrap();

    let mut line = Vec::new();
    while let Some(b) = uart.read_available(false) {
        line.push(b);
    }
    assert_eq!(line, b"status 2000\r");
    assert_eq!(uart.read_available(false), None);
    assert_eq!(uart.rx_state().write_index, 0);
}

#[test]
fn abort_byte_is_seen_while_line_is_open() {
    let (uart, handle) = stalled_uart();
    handle.inject_rx(b"  b");
    assert_eq!(uart.read_available(false), None);
    assert_eq!(uart.read_available(true), Some(b'b'));
    assert!(!uart.rx_state().line_complete);

    handle.inject_rx(b"\r");
    assert_eq!(uart.read_available(true), Some(b' '));
}

#[test]
fn overflow_is_dropped_and_line_recovers() {
    let (uart, handle) = stalled_uart();
    handle.inject_rx(&vec![b'x'; RX_BUFFER_SIZE + 10]);
    handle.inject_rx(b"\r");
    let state = uart.rx_state();
    assert_eq!(state.write_index, RX_BUFFER_SIZE);
    assert_eq!(state.dropped, 11);
    assert!(state.line_complete);

    let mut count = 0;
    while uart.read_available(false).is_some() {
        count += 1;
    }
    assert_eq!(count, RX_BUFFER_SIZE);

    handle.inject_rx(b"ok\r");
    assert_eq!(uart.read_available(false), Some(b'o'));
}

#[test]
fn loopback_echoes_transmitted_line() {
    let mut uart = Uart::new(MockChannel::loopback(), UartConfig::default());
    uart.initialize().unwrap();
    uart.write_blocking(b"b\r").unwrap();
    assert_eq!(uart.read_available(false), Some(b'b'));
    assert_eq!(uart.read_available(false), Some(b'\r'));
    assert_eq!(uart.read_available(false), None);
}

#[test]
fn failed_open_is_reported() {
    let channel = MockChannel::new();
    channel.fail_open();
    let mut uart = Uart::new(channel, UartConfig::default());
    assert!(matches!(uart.initialize(), Err(Error::Io(_))));
    assert!(!uart.is_open());
}
