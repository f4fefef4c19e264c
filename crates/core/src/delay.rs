use serialkit_config::DEFAULT_LOOPS_PER_MS;

/// Calibrated busy-wait. Only as accurate as `loops_per_ms` is for the
/// current core clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyDelay {
    loops_per_ms: u32,
}

impl BusyDelay {
    pub fn new(loops_per_ms: u32) -> Self {
        Self { loops_per_ms }
    }

    pub fn loops_per_ms(&self) -> u32 {
        self.loops_per_ms
    }

    /// Total spin iterations executed by `delay_ms(ms)`.
    pub fn spins_for(&self, ms: u32) -> u64 {
        ms as u64 * self.loops_per_ms as u64
    }

    pub fn delay_ms(&self, ms: u32) {
        self.spin(self.spins_for(ms));
    }

    /// Returns the number of iterations run.
    fn spin(&self, spins: u64) -> u64 {
        let mut done = 0u64;
        while done < spins {
            std::hint::spin_loop();
            done += 1;
        }
        done
    }
}

impl Default for BusyDelay {
    fn default() -> Self {
        Self::new(DEFAULT_LOOPS_PER_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_calibration() {
        let delay = BusyDelay::default();
        assert_eq!(delay.loops_per_ms(), 1600);
        assert_eq!(delay.spins_for(10), 16_000);
        assert_eq!(delay.spins_for(0), 0);
    }

    #[test]
    fn test_spins_do_not_overflow() {
        let delay = BusyDelay::new(u32::MAX);
        assert_eq!(delay.spins_for(u32::MAX), u32::MAX as u64 * u32::MAX as u64);
    }

    #[test]
    fn test_delay_runs_calibrated_spin_count() {
        let delay = BusyDelay::new(25);
        assert_eq!(delay.spin(delay.spins_for(4)), 100);
        assert_eq!(delay.spin(delay.spins_for(0)), 0);
    }

    #[test]
    fn test_delay_returns() {
        BusyDelay::new(10).delay_ms(3);
        BusyDelay::default().delay_ms(0);
    }
}
