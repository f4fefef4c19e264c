use crate::{
    BusyDelay, HsiPrescaler, LineConfig, MemoryMap, SerialResult, StatusFlags, UartDriver,
    WaitPolicy,
};
use serialkit_config::SerialConfig;
use std::fmt;

/// Handle to one UART channel. Every I/O operation goes through it.
#[derive(Debug)]
pub struct SerialPort<D: UartDriver> {
    driver: D,
    wait: WaitPolicy,
    memory_map: MemoryMap,
    delay: BusyDelay,
    clock_hz: Option<u32>,
}

impl<D: UartDriver> SerialPort<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            wait: WaitPolicy::Forever,
            memory_map: MemoryMap::default(),
            delay: BusyDelay::default(),
            clock_hz: None,
        }
    }

    /// Build a port from a validated [`SerialConfig`]. The UART itself is
    /// not touched until [`SerialPort::setup`] is called.
    pub fn from_config(driver: D, config: &SerialConfig) -> anyhow::Result<Self> {
        Ok(Self {
            driver,
            wait: config.wait.into(),
            memory_map: MemoryMap::from_config(&config.memory_map)?,
            delay: BusyDelay::new(config.delay.loops_per_ms),
            clock_hz: Some(config.clock_hz),
        })
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_memory_map(mut self, memory_map: MemoryMap) -> Self {
        self.memory_map = memory_map;
        self
    }

    /// Override the HSI frequency handed to the driver on setup.
    pub fn with_clock_hz(mut self, hz: u32) -> Self {
        self.clock_hz = Some(hz);
        self
    }

    pub fn with_delay(mut self, delay: BusyDelay) -> Self {
        self.delay = delay;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    pub fn memory_map(&self) -> &MemoryMap {
        &self.memory_map
    }

    pub fn delay(&self) -> &BusyDelay {
        &self.delay
    }

    /// Run the HSI at full speed and bring the UART up as 8N1, TX+RX.
    pub fn setup(&mut self, baud_rate: u32) {
        self.setup_with(&LineConfig::new(baud_rate));
    }

    pub fn setup_with(&mut self, config: &LineConfig) {
        crate::assert_param!(config.baud_rate > 0);
        if let Some(hz) = self.clock_hz {
            self.driver.set_hsi_frequency(hz);
        }
        self.driver.set_hsi_prescaler(HsiPrescaler::Div1);
        self.driver.deinit();
        self.driver.init(config);
        tracing::info!(
            "Serial port up: {} baud, {:?}/{:?}/{:?}, {:?}",
            config.baud_rate,
            config.word_length,
            config.parity,
            config.stop_bits,
            config.mode
        );
    }

    /// Transmit one byte and wait for the data register to drain.
    pub fn send_char(&mut self, c: u8) -> SerialResult<u8> {
        self.driver.send_data8(c);
        self.wait.wait_for(&self.driver, StatusFlags::TXE)?;
        tracing::trace!("tx {:#04x}", c);
        Ok(c)
    }

    /// Wait for a byte to arrive and return it.
    pub fn receive_char(&mut self) -> SerialResult<u8> {
        self.wait.wait_for(&self.driver, StatusFlags::RXNE)?;
        let c = self.driver.receive_data8();
        tracing::trace!("rx {:#04x}", c);
        Ok(c)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> SerialResult<()> {
        for &b in bytes {
            self.send_char(b)?;
        }
        Ok(())
    }

    /// Formatted output over the UART, e.g. `port.print(format_args!("{}", x))`.
    pub fn print(&mut self, args: fmt::Arguments<'_>) -> SerialResult<()> {
        match args.as_str() {
            Some(s) => self.write_bytes(s.as_bytes()),
            None => {
                let text = fmt::format(args);
                self.write_bytes(text.as_bytes())
            }
        }
    }

    pub fn delay_ms(&self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

impl<D: UartDriver> fmt::Write for SerialPort<D> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
