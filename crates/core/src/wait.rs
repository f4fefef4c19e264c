use crate::{SerialError, SerialResult, StatusFlags, UartDriver};
use serialkit_config::WaitConfig;

/// How long to poll a status flag before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Spin until the flag appears, however long that takes.
    #[default]
    Forever,
    /// Give up after `max_polls` reads of the status register.
    Bounded { max_polls: u32 },
}

impl WaitPolicy {
    /// Poll `driver` until `flag` is set.
    pub fn wait_for<D>(self, driver: &D, flag: StatusFlags) -> SerialResult<()>
    where
        D: UartDriver + ?Sized,
    {
        match self {
            Self::Forever => {
                while !driver.flag_set(flag) {
                    std::hint::spin_loop();
                }
                Ok(())
            }
            Self::Bounded { max_polls } => {
                for _ in 0..max_polls {
                    if driver.flag_set(flag) {
                        return Ok(());
                    }
                    std::hint::spin_loop();
                }
                tracing::warn!("Gave up waiting for {:?} after {} polls", flag, max_polls);
                Err(SerialError::Timeout {
                    flag,
                    polls: max_polls,
                })
            }
        }
    }
}

impl From<WaitConfig> for WaitPolicy {
    fn from(config: WaitConfig) -> Self {
        match config {
            WaitConfig::Forever => Self::Forever,
            WaitConfig::Bounded { max_polls } => Self::Bounded { max_polls },
        }
    }
}
