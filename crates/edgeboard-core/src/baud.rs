/// Peripheral clock feeding the serial unit on the EK-RA8 board.
pub const PERIPHERAL_CLOCK_HZ: u32 = 60_000_000;

/// Bit-rate register image for the serial peripheral.
///
/// Field names follow the hardware register bits. Only `brr` differs between
/// the two settings the board ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudSetting {
    /// Asynchronous base clock select extension
    pub abcse: bool,
    /// Asynchronous base clock select
    pub abcs: bool,
    /// Baud rate generator double-speed mode
    pub bgdm: bool,
    /// Clock select, divides the peripheral clock by 4^cks
    pub cks: u8,
    /// Bit rate register
    pub brr: u8,
    /// Modulation duty, only used when `brme` is set
    pub mddr: u8,
    /// Bit rate modulation enable
    pub brme: bool,
    /// Rate the setting was calculated for.
    pub nominal: u32,
}

impl BaudSetting {
    /// 115200 baud, 1.725% error.
    pub const DEFAULT: BaudSetting = BaudSetting {
        abcse: false,
        abcs: false,
        bgdm: true,
        cks: 0,
        brr: 31,
        mddr: 0,
        brme: false,
        nominal: 115_200,
    };

    /// 921600 baud, 1.725% error.
    pub const MAX: BaudSetting = BaudSetting {
        abcse: false,
        abcs: false,
        bgdm: true,
        cks: 0,
        brr: 3,
        mddr: 0,
        brme: false,
        nominal: 921_600,
    };

    /// Peripheral clock cycles per bit.
    pub fn divisor(&self) -> u64 {
        let base: u64 = if self.abcse {
            12
        } else {
            match (self.bgdm, self.abcs) {
                (false, false) => 64,
                (true, true) => 16,
                _ => 32,
            }
        };
        // base * 2^(2n-1) * (N+1), folded so n = 0 stays integral
        base * (1u64 << (2 * self.cks as u32)) * (self.brr as u64 + 1) / 2
    }

    /// Bit rate produced from `clock_hz`, ignoring modulation.
    pub fn effective_rate(&self, clock_hz: u32) -> f64 {
        let rate = clock_hz as f64 / self.divisor() as f64;
        if self.brme {
            rate * self.mddr as f64 / 256.0
        } else {
            rate
        }
    }

    /// Percentage error of the effective rate against `nominal`.
    pub fn error_percent(&self, clock_hz: u32) -> f64 {
        (self.effective_rate(clock_hz) / self.nominal as f64 - 1.0) * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudRate {
    Default,
    Max,
}

impl BaudRate {
    pub fn from_max(use_max: bool) -> Self {
        if use_max {
            BaudRate::Max
        } else {
            BaudRate::Default
        }
    }

    pub fn setting(&self) -> &'static BaudSetting {
        match self {
            BaudRate::Default => &BaudSetting::DEFAULT,
            BaudRate::Max => &BaudSetting::MAX,
        }
    }
}
