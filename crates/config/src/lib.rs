use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Legacy calibration: ~1ms of `nop` at 16 MHz.
pub const DEFAULT_LOOPS_PER_MS: u32 = 1600;
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_CLOCK_HZ: u32 = 16_000_000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MemoryRange {
    pub base: u64,
    pub size: String, // e.g. "32 KiB"
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MemoryMapConfig {
    pub flash: MemoryRange,
    pub ram: MemoryRange,
}

impl Default for MemoryMapConfig {
    // STM8S207 memory map. The legacy flash bound 0xFFFF is exclusive.
    fn default() -> Self {
        Self {
            flash: MemoryRange {
                base: 0x8000,
                size: "32767 B".to_string(),
            },
            ram: MemoryRange {
                base: 0x0000,
                size: "6 KiB".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WaitConfig {
    /// Poll status flags without limit (legacy behaviour).
    #[default]
    Forever,
    Bounded { max_polls: u32 },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DelayConfig {
    pub loops_per_ms: u32,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            loops_per_ms: DEFAULT_LOOPS_PER_MS,
        }
    }
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_clock_hz() -> u32 {
    DEFAULT_CLOCK_HZ
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SerialConfig {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u32,
    #[serde(default)]
    pub delay: DelayConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub memory_map: MemoryMapConfig,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            clock_hz: DEFAULT_CLOCK_HZ,
            delay: DelayConfig::default(),
            wait: WaitConfig::default(),
            memory_map: MemoryMapConfig::default(),
        }
    }
}

impl SerialConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open serial config at {:?}", path.as_ref()))?;
        let config: Self =
            serde_yaml::from_reader(f).context("Failed to parse Serial Config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            anyhow::bail!("'baud_rate' must be greater than zero");
        }

        if self.clock_hz == 0 {
            anyhow::bail!("'clock_hz' must be greater than zero");
        }

        if self.delay.loops_per_ms == 0 {
            anyhow::bail!("Delay 'loops_per_ms' must be greater than zero");
        }

        if let WaitConfig::Bounded { max_polls: 0 } = self.wait {
            anyhow::bail!("Bounded wait 'max_polls' must be greater than zero");
        }

        for (name, range) in [
            ("flash", &self.memory_map.flash),
            ("ram", &self.memory_map.ram),
        ] {
            let size = parse_size(&range.size)
                .with_context(|| format!("Invalid size for memory range '{}'", name))?;
            if size == 0 {
                anyhow::bail!("Memory range '{}' cannot be empty", name);
            }
        }

        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
