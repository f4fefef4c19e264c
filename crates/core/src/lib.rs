pub mod delay;
pub mod diagnostics;
pub mod fault;
pub mod line;
pub mod peripherals;
pub mod port;
pub mod registers;
pub mod wait;

pub use delay::BusyDelay;
pub use diagnostics::{MemoryMap, MemoryRegion};
pub use port::SerialPort;
pub use registers::{HsiPrescaler, LineConfig, Mode, Parity, StatusFlags, StopBits, WordLength};
pub use wait::WaitPolicy;

mod tests;

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Timed out after {polls} polls waiting for {flag:?}")]
    Timeout { flag: StatusFlags, polls: u32 },
    #[error("Line buffer of {0} bytes is too small (need at least 2)")]
    BufferTooSmall(usize),
}

pub type SerialResult<T> = Result<T, SerialError>;

/// Register-level UART driver, as exposed by the vendor peripheral library.
///
/// Implementations only touch hardware; waiting on flags is done by
/// [`SerialPort`].
pub trait UartDriver: std::fmt::Debug {
    /// Tell the driver what the undivided HSI runs at, for BRR computation.
    /// Drivers that query the clock tree themselves can ignore this.
    fn set_hsi_frequency(&mut self, _hz: u32) {}
    fn set_hsi_prescaler(&mut self, prescaler: HsiPrescaler);
    /// Reset the peripheral registers to their power-on defaults.
    fn deinit(&mut self);
    fn init(&mut self, config: &LineConfig);
    fn send_data8(&mut self, byte: u8);
    fn receive_data8(&mut self) -> u8;
    fn flags(&self) -> StatusFlags;

    fn flag_set(&self, flag: StatusFlags) -> bool {
        self.flags().contains(flag)
    }
}

impl<D: UartDriver + ?Sized> UartDriver for &mut D {
    fn set_hsi_frequency(&mut self, hz: u32) {
        (**self).set_hsi_frequency(hz)
    }

    fn set_hsi_prescaler(&mut self, prescaler: HsiPrescaler) {
        (**self).set_hsi_prescaler(prescaler)
    }

    fn deinit(&mut self) {
        (**self).deinit()
    }

    fn init(&mut self, config: &LineConfig) {
        (**self).init(config)
    }

    fn send_data8(&mut self, byte: u8) {
        (**self).send_data8(byte)
    }

    fn receive_data8(&mut self) -> u8 {
        (**self).receive_data8()
    }

    fn flags(&self) -> StatusFlags {
        (**self).flags()
    }
}
