use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// UART status register (SR) bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StatusFlags: u8 {
        const PE = 1 << 0;   // parity error
        const FE = 1 << 1;   // framing error
        const NF = 1 << 2;   // noise
        const OR = 1 << 3;   // overrun
        const IDLE = 1 << 4;
        const RXNE = 1 << 5; // receive data register not empty
        const TC = 1 << 6;   // transmission complete
        const TXE = 1 << 7;  // transmit data register empty
    }
}

/// HSI clock divider (CLK_CKDIVR.HSIDIV).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HsiPrescaler {
    Div1,
    Div2,
    Div4,
    #[default]
    Div8,
}

impl HsiPrescaler {
    pub fn divisor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordLength {
    #[default]
    Bits8,
    Bits9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Tx,
    Rx,
    #[default]
    TxRx,
}

/// Line settings handed to [`crate::UartDriver::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    pub baud_rate: u32,
    pub word_length: WordLength,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub mode: Mode,
}

impl LineConfig {
    /// 8N1, full duplex.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            word_length: WordLength::Bits8,
            stop_bits: StopBits::One,
            parity: Parity::None,
            mode: Mode::TxRx,
        }
    }

    /// BRR divider for the given peripheral clock, rounded to nearest.
    pub fn divider(&self, clock_hz: u32) -> u32 {
        if self.baud_rate == 0 {
            return 0;
        }
        (clock_hz + self.baud_rate / 2) / self.baud_rate
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self::new(serialkit_config::DEFAULT_BAUD_RATE)
    }
}

impl From<&serialkit_config::SerialConfig> for LineConfig {
    fn from(config: &serialkit_config::SerialConfig) -> Self {
        Self::new(config.baud_rate)
    }
}
