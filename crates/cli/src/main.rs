use anyhow::Context;
use clap::{Parser, Subcommand};
use serialkit_config::SerialConfig;
use serialkit_core::peripherals::uart::SimUart;
use serialkit_core::{LineConfig, SerialError, SerialPort, WaitPolicy};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "SerialKit UART console utilities (simulated UART on stdout)",
    long_about = None
)]
struct Args {
    /// Path to the serial configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable byte-level tracing
    #[arg(short, long)]
    trace: bool,

    /// Print the UART peripheral state as JSON when done
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hex/ASCII dump of a file
    Hexdump {
        file: PathBuf,

        /// Address printed for the first row
        #[arg(long, value_parser = parse_address, default_value = "0")]
        base: u64,
    },
    /// Read one line from scripted input, echoing it
    Readline {
        /// Bytes to receive; understands \r \n \t \b \0 \\ and \xHH
        #[arg(short, long)]
        input: String,

        /// Line buffer capacity, terminator included
        #[arg(long, default_value_t = 64)]
        capacity: usize,
    },
    /// Print a value with three truncated decimals
    Float {
        #[arg(allow_negative_numbers = true)]
        value: f32,
    },
    /// Classify an address against the memory map
    Address {
        #[arg(value_parser = parse_address)]
        addr: u64,
    },
    /// Emit the ANSI clear-screen sequence
    Clear,
    /// Busy-wait for the given number of milliseconds
    Delay { ms: u32 },
}

fn parse_address(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

fn unescape(input: &str) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'r') => out.push(b'\r'),
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'b') => out.push(0x08),
            Some(b'0') => out.push(0x00),
            Some(b'\\') => out.push(b'\\'),
            Some(b'x') => {
                let hi = bytes.next();
                let lo = bytes.next();
                let digits = match (hi, lo) {
                    (Some(hi), Some(lo)) => [hi, lo],
                    _ => anyhow::bail!("Truncated \\x escape in input"),
                };
                let text = std::str::from_utf8(&digits)?;
                out.push(
                    u8::from_str_radix(text, 16)
                        .with_context(|| format!("Invalid \\x escape '{}'", text))?,
                );
            }
            Some(other) => anyhow::bail!("Unknown escape '\\{}'", other as char),
            None => anyhow::bail!("Input ends with a lone backslash"),
        }
    }
    Ok(out)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Serial output owns stdout; logs go to stderr.
    let level = if args.trace {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(path) = &args.config {
        info!("Loading serial config: {:?}", path);
        SerialConfig::from_file(path)?
    } else {
        SerialConfig::default()
    };

    let mut uart = SimUart::new();
    uart.set_sink(None, true);
    let mut port = SerialPort::from_config(uart, &config)?;
    port.setup_with(&LineConfig::from(&config));

    match args.command {
        Command::Hexdump { file, base } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            info!("Dumping {} bytes of {:?}", data.len(), file);
            port.hex_dump_at(base, &data)?;
        }
        Command::Readline { input, capacity } => {
            let bytes = unescape(&input)?;
            port.driver_mut().feed(&bytes);
            // Scripted input never refills, so an unbounded wait would hang.
            if port.wait_policy() == WaitPolicy::Forever {
                port = port.with_wait_policy(WaitPolicy::Bounded { max_polls: 1 });
            }

            let mut buf = vec![0u8; capacity];
            let len = match port.read_line(&mut buf).map(|line| line.len()) {
                Ok(len) => len,
                Err(SerialError::Timeout { .. }) => {
                    info!("Input ran out before a line terminator");
                    buf.iter().position(|&b| b == 0).unwrap_or(0)
                }
                Err(e) => return Err(e.into()),
            };
            let line = &buf[..len];
            port.write_bytes(b"\r\n")?;
            info!(
                "Line ({} bytes): {:?}, {} input bytes left",
                line.len(),
                String::from_utf8_lossy(line),
                port.driver().pending_rx()
            );
        }
        Command::Float { value } => port.print_float(value)?,
        Command::Address { addr } => port.print_address(addr)?,
        Command::Clear => port.clear_screen()?,
        Command::Delay { ms } => {
            let start = Instant::now();
            port.delay_ms(ms);
            info!(
                "Delayed {} ms ({} spins) in {:?}",
                ms,
                port.delay().spins_for(ms),
                start.elapsed()
            );
        }
    }

    if args.json {
        let snapshot = port.driver().snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x9000").unwrap(), 0x9000);
        assert_eq!(parse_address("0XFF").unwrap(), 0xFF);
        assert_eq!(parse_address("4096").unwrap(), 4096);
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"hi\r").unwrap(), b"hi\r".to_vec());
        assert_eq!(unescape(r"a\b\x7f\0").unwrap(), vec![b'a', 0x08, 0x7F, 0x00]);
        assert_eq!(unescape(r"\\").unwrap(), b"\\".to_vec());
        assert!(unescape(r"\q").is_err());
        assert!(unescape(r"\x7").is_err());
        assert!(unescape("\\").is_err());
    }
}
