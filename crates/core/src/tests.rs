#[cfg(test)]
mod tests {
    use crate::peripherals::uart::SimUart;
    use crate::{HsiPrescaler, SerialError, SerialPort, UartDriver, WaitPolicy};
    use serialkit_config::SerialConfig;
    use std::fmt::Write;

    #[test]
    fn test_console_session() {
        let (mut uart, sink) = SimUart::with_sink();
        uart.feed(b"led on\r");

        let mut port = SerialPort::new(uart);
        port.setup(115_200);
        port.clear_screen().unwrap();
        write!(port, "> ").unwrap();

        let mut buf = [0u8; 32];
        let line = port.read_line(&mut buf).unwrap().to_vec();
        assert_eq!(line, b"led on");

        port.write_bytes(b"\r\n").unwrap();
        port.hex_dump_at(0x0100, &line).unwrap();

        let out = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
        assert!(out.starts_with("\x1b[H\x1b[2J> led on\r\n"));
        assert!(out.contains("  000100:  6c 65 64 20 6f 6e"));
        assert!(out.ends_with("  led on\n\r"));
    }

    #[test]
    fn test_port_over_borrowed_driver() {
        let (mut uart, sink) = SimUart::with_sink();
        uart.feed(b"42\r");
        {
            let mut port = SerialPort::new(&mut uart);
            port.setup(9600);
            let mut buf = [0u8; 4];
            assert_eq!(port.read_line(&mut buf).unwrap(), b"42");
            port.print_float(0.5).unwrap();
        }
        // The caller keeps ownership of the peripheral.
        assert_eq!(uart.prescaler(), HsiPrescaler::Div1);
        assert_eq!(uart.pending_rx(), 0);
        assert!(!uart.flags().is_empty());
        assert_eq!(*sink.lock().unwrap(), b"420.500\n".to_vec());
    }

    #[test]
    fn test_bounded_config_turns_hang_into_error() {
        let yaml = r#"
wait:
  mode: bounded
  max_polls: 16
"#;
        let config: SerialConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let mut uart = SimUart::new();
        uart.set_tx_stalled(true);
        let mut port = SerialPort::from_config(uart, &config).unwrap();
        assert_eq!(port.wait_policy(), WaitPolicy::Bounded { max_polls: 16 });

        let err = port.clear_screen().unwrap_err();
        assert!(matches!(err, SerialError::Timeout { polls: 16, .. }));
        // The byte was written before the wait gave up.
        assert_eq!(port.driver().tx_count(), 1);
        assert!(err.to_string().contains("16 polls"));
    }

    #[test]
    fn test_config_clock_sets_baud_divider() {
        let yaml = r#"
baud_rate: 9600
clock_hz: 8000000
"#;
        let config: SerialConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let mut port = SerialPort::from_config(SimUart::new(), &config).unwrap();
        port.setup_with(&crate::LineConfig::from(&config));
        assert_eq!(port.driver().hsi_hz(), 8_000_000);
        assert_eq!(port.driver().brr(), 833);

        // Without a configured clock the simulated 16 MHz HSI is used.
        let mut plain = SerialPort::new(SimUart::new());
        plain.setup(9600);
        assert_eq!(plain.driver().brr(), 1667);
    }

    #[test]
    fn test_config_memory_map_reaches_print_address() {
        let yaml = r#"
memory_map:
  flash: { base: 0x08000000, size: "512 KiB" }
  ram: { base: 0x20000000, size: "64 KiB" }
"#;
        let config: SerialConfig = serde_yaml::from_str(yaml).unwrap();
        let (uart, sink) = SimUart::with_sink();
        let mut port = SerialPort::from_config(uart, &config).unwrap();

        port.print_address(0x0800_1234).unwrap();
        port.print_address(0x9000).unwrap();

        let out = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
        assert_eq!(out, "In Flash program :  0x8001234\r\n 0x009000\r\n");
    }
}
