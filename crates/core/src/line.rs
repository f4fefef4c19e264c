use crate::{SerialError, SerialPort, SerialResult, UartDriver};

pub const BACKSPACE: u8 = 0x08;
pub const DEL: u8 = 0x7F;
pub const CARRIAGE_RETURN: u8 = b'\r';
pub const NUL: u8 = 0x00;

impl<D: UartDriver> SerialPort<D> {
    /// Read one line into `buf`, echoing what is typed.
    ///
    /// Stops on `\r`, on a NUL byte, or when the buffer is full
    /// (`buf.len() - 1` characters). The buffer is always NUL-terminated,
    /// and the returned slice is the line without the terminator.
    ///
    /// Backspace/DEL moves the cursor back and echoes the control byte
    /// itself; the erased byte is left in the buffer.
    pub fn read_line<'b>(&mut self, buf: &'b mut [u8]) -> SerialResult<&'b [u8]> {
        let capacity = buf.len();
        if capacity < 2 {
            return Err(SerialError::BufferTooSmall(capacity));
        }

        let mut i = 0usize;
        loop {
            let c = match self.receive_char() {
                Ok(c) => c,
                Err(e) => {
                    buf[i] = NUL;
                    return Err(e);
                }
            };

            match c {
                BACKSPACE | DEL => {
                    if i > 0 {
                        i -= 1;
                        self.echo(buf, i, c)?;
                    }
                }
                CARRIAGE_RETURN | NUL => {
                    buf[i] = NUL;
                    break;
                }
                _ => {
                    buf[i] = c;
                    self.echo(buf, i + 1, c)?;
                    i += 1;
                    if i == capacity - 1 {
                        buf[i] = NUL;
                        break;
                    }
                }
            }
        }

        tracing::debug!("Read line of {} bytes", i);
        Ok(&buf[..i])
    }

    // Keep the buffer terminated if the echo fails part-way through a line.
    fn echo(&mut self, buf: &mut [u8], terminate_at: usize, c: u8) -> SerialResult<()> {
        if let Err(e) = self.send_char(c) {
            buf[terminate_at] = NUL;
            return Err(e);
        }
        Ok(())
    }
}
