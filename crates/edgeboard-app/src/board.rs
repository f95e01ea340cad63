//! Board bring-up and the two-colour status indicator.

use edgeboard_core::{SerialChannel, Uart};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Green,
    Red,
}

pub trait StatusIndicator {
    fn turn_on(&mut self, color: LedColor);
}

/// Indicator for hosted runs: the LED state goes to the log.
#[derive(Default)]
pub struct LogIndicator {
    lit: Option<LedColor>,
}

impl StatusIndicator for LogIndicator {
    fn turn_on(&mut self, color: LedColor) {
        if self.lit != Some(color) {
            log::info!("status led: {:?}", color);
            self.lit = Some(color);
        }
    }
}

/// Open the transport and show the outcome on the indicator.
///
/// Returns whether the transport came up. A failure is not retried.
pub fn board_init<C: SerialChannel>(
    uart: &mut Uart<C>,
    use_max_baud: bool,
    indicator: &mut dyn StatusIndicator,
) -> bool {
    let opened = match uart.initialize() {
        Ok(()) => true,
        Err(e) => {
            log::error!("uart init failed: {e}");
            false
        }
    };

    if opened && use_max_baud {
        if let Err(e) = uart.set_baud(true) {
            log::warn!("staying at default baud: {e}");
        }
    }

    indicator.turn_on(if opened { LedColor::Green } else { LedColor::Red });
    opened
}
