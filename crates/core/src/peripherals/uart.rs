use crate::{HsiPrescaler, LineConfig, StatusFlags, UartDriver};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Internal high-speed oscillator frequency.
pub const HSI_HZ: u32 = 16_000_000;

/// Simulated UART peripheral.
///
/// Transmitted bytes go to an optional shared sink (and optionally stdout);
/// received bytes are served from a scripted queue.
#[derive(Debug, serde::Serialize)]
pub struct SimUart {
    hsi_hz: u32,
    prescaler: HsiPrescaler,
    line: Option<LineConfig>,
    brr: u32,
    init_count: u32,
    deinit_count: u32,
    rx: VecDeque<u8>,
    tx_count: usize,
    tx_stalled: bool,
    #[serde(skip)]
    sink: Option<Arc<Mutex<Vec<u8>>>>,
    echo_stdout: bool,
}

impl SimUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a UART whose transmitted bytes are collected in the returned sink.
    pub fn with_sink() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut uart = Self::new();
        uart.set_sink(Some(sink.clone()), false);
        (uart, sink)
    }

    pub fn set_sink(&mut self, sink: Option<Arc<Mutex<Vec<u8>>>>, echo_stdout: bool) {
        self.sink = sink;
        self.echo_stdout = echo_stdout;
    }

    /// Queue bytes as if they arrived on the RX line.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    /// Hold TXE low so transmissions never complete.
    pub fn set_tx_stalled(&mut self, stalled: bool) {
        self.tx_stalled = stalled;
    }

    pub fn hsi_hz(&self) -> u32 {
        self.hsi_hz
    }

    pub fn prescaler(&self) -> HsiPrescaler {
        self.prescaler
    }

    pub fn line_config(&self) -> Option<LineConfig> {
        self.line
    }

    pub fn brr(&self) -> u32 {
        self.brr
    }

    pub fn init_count(&self) -> u32 {
        self.init_count
    }

    pub fn deinit_count(&self) -> u32 {
        self.deinit_count
    }

    pub fn tx_count(&self) -> usize {
        self.tx_count
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn push_tx(&mut self, value: u8) {
        self.tx_count += 1;

        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.push(value);
            }
        }

        if self.echo_stdout {
            let mut out = io::stdout();
            if out.write_all(&[value]).and_then(|_| out.flush()).is_err() {
                tracing::warn!("Failed to echo UART byte {:#04x} to stdout", value);
            }
        }
    }
}

impl Default for SimUart {
    fn default() -> Self {
        Self {
            hsi_hz: HSI_HZ,
            prescaler: HsiPrescaler::default(),
            line: None,
            brr: 0,
            init_count: 0,
            deinit_count: 0,
            rx: VecDeque::new(),
            tx_count: 0,
            tx_stalled: false,
            sink: None,
            echo_stdout: false,
        }
    }
}

impl UartDriver for SimUart {
    fn set_hsi_frequency(&mut self, hz: u32) {
        self.hsi_hz = hz;
    }

    fn set_hsi_prescaler(&mut self, prescaler: HsiPrescaler) {
        self.prescaler = prescaler;
    }

    fn deinit(&mut self) {
        self.deinit_count += 1;
        self.line = None;
        self.brr = 0;
    }

    fn init(&mut self, config: &LineConfig) {
        self.init_count += 1;
        self.line = Some(*config);
        self.brr = config.divider(self.hsi_hz / self.prescaler.divisor());
        tracing::debug!(
            "UART init: {} baud, BRR={:#06x} ({:?})",
            config.baud_rate,
            self.brr,
            self.prescaler
        );
    }

    fn send_data8(&mut self, byte: u8) {
        self.push_tx(byte);
    }

    fn receive_data8(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0x00)
    }

    fn flags(&self) -> StatusFlags {
        let mut flags = StatusFlags::empty();
        if !self.tx_stalled {
            flags |= StatusFlags::TXE | StatusFlags::TC;
        }
        if !self.rx.is_empty() {
            flags |= StatusFlags::RXNE;
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transmit_goes_to_sink() {
        let (mut uart, sink) = SimUart::with_sink();
        uart.send_data8(b'O');
        uart.send_data8(b'K');

        let data = sink.lock().unwrap().clone();
        assert_eq!(data, b"OK".to_vec());
        assert_eq!(uart.tx_count(), 2);
    }

    #[test]
    fn test_rxne_tracks_queue() {
        let mut uart = SimUart::new();
        assert!(!uart.flag_set(StatusFlags::RXNE));

        uart.feed(b"x");
        assert!(uart.flag_set(StatusFlags::RXNE));
        assert_eq!(uart.receive_data8(), b'x');
        assert!(!uart.flag_set(StatusFlags::RXNE));
        // Empty data register reads as zero.
        assert_eq!(uart.receive_data8(), 0);
    }

    #[test]
    fn test_stall_clears_txe() {
        let mut uart = SimUart::new();
        assert_eq!(uart.flags(), StatusFlags::TXE | StatusFlags::TC);
        uart.set_tx_stalled(true);
        assert!(!uart.flag_set(StatusFlags::TXE));
    }

    #[test]
    fn test_init_computes_brr_from_prescaler() {
        let mut uart = SimUart::new();
        uart.set_hsi_prescaler(HsiPrescaler::Div1);
        uart.init(&LineConfig::new(9600));
        assert_eq!(uart.brr(), 1667);

        uart.deinit();
        assert_eq!(uart.line_config(), None);
        assert_eq!(uart.brr(), 0);

        // Reset prescaler is /8 (2 MHz).
        let mut slow = SimUart::new();
        slow.init(&LineConfig::new(9600));
        assert_eq!(slow.brr(), 208);
    }

    #[test]
    fn test_brr_follows_hsi_frequency() {
        let mut uart = SimUart::new();
        assert_eq!(uart.hsi_hz(), HSI_HZ);
        uart.set_hsi_frequency(8_000_000);
        uart.set_hsi_prescaler(HsiPrescaler::Div1);
        uart.init(&LineConfig::new(9600));
        assert_eq!(uart.brr(), 833);
    }

    #[test]
    fn test_snapshot_contains_state() {
        let mut uart = SimUart::new();
        uart.set_hsi_prescaler(HsiPrescaler::Div1);
        uart.init(&LineConfig::new(115_200));
        uart.feed(b"ab");

        let snap = uart.snapshot();
        assert_eq!(snap["prescaler"], "div1");
        assert_eq!(snap["init_count"], 1);
        assert_eq!(snap["line"]["baud_rate"], 115_200);
        assert_eq!(snap["rx"].as_array().unwrap().len(), 2);
        assert!(snap.get("sink").is_none());
    }
}
