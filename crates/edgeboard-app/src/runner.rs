//! The standalone inferencing loop.

use anyhow::{bail, Context, Result};
use edgeboard_core::{SerialChannel, Uart};
use edgeboard_impulse::{render, Classifier, StaticSignal};
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

pub const BANNER: &str = "Edge Impulse standalone inferencing (Renesas EK RA8)\n";

/// Byte that stops inferencing when it arrives on the UART.
const STOP_BYTE: u8 = b'b';

const POLL_PERIOD: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub interval: Duration,
    pub max_iterations: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A stop byte was received.
    Stopped,
    /// `max_iterations` inferences ran.
    Finished,
}

/// Diagnostic output: the UART, optionally mirrored to stdout.
pub struct Console<'a, C: SerialChannel> {
    uart: &'a mut Uart<C>,
    mirror_stdout: bool,
}

impl<'a, C: SerialChannel> Console<'a, C> {
    pub fn new(uart: &'a mut Uart<C>, mirror_stdout: bool) -> Self {
        Self {
            uart,
            mirror_stdout,
        }
    }

    /// Print `text`. Transport failures are logged and otherwise ignored.
    pub fn print(&mut self, text: &str) {
        if self.mirror_stdout {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
        if self.uart.is_open() {
            if let Err(e) = self.uart.write_blocking(text.as_bytes()) {
                log::warn!("console write failed: {e}");
            }
        }
    }

    pub fn uart(&self) -> &Uart<C> {
        self.uart
    }
}

/// Run the classifier over `features` until stopped.
pub fn run_inference<C: SerialChannel>(
    console: &mut Console<'_, C>,
    classifier: &mut dyn Classifier,
    features: &[f32],
    settings: &LoopSettings,
) -> Result<Exit> {
    console.print(BANNER);

    let expected = classifier.model().input_frame_size;
    if features.len() != expected {
        let msg = format!(
            "The size of your 'features' array is not correct. Expected {} items, but had {}\n",
            expected,
            features.len()
        );
        console.print(&msg);
        bail!(msg.trim_end().to_string());
    }

    let signal = StaticSignal::new(features);
    let mut iterations = 0u64;
    loop {
        let result = classifier
            .run(&signal, false)
            .context("run_classifier failed")?;
        let report = render(&result, classifier.model());
        console.print(&report);
        iterations += 1;

        if settings.max_iterations.map_or(false, |max| iterations >= max) {
            return Ok(Exit::Finished);
        }
        if wait_for_stop(console.uart(), settings.interval) {
            console.print("Inferencing stopped by user\n");
            return Ok(Exit::Stopped);
        }
    }
}

/// Sleep for `interval`, returning early with `true` if the stop byte shows
/// up. Bytes of other completed lines are consumed and ignored.
fn wait_for_stop<C: SerialChannel>(uart: &Uart<C>, interval: Duration) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        while let Some(byte) = uart.read_available(true) {
            if byte == STOP_BYTE {
                return true;
            }
            log::debug!("ignoring rx byte {:#04x}", byte);
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(POLL_PERIOD.min(deadline - now));
    }
}
