//! Byte-sink transports for completed frames
//!
//! The serial collaborator only has to accept one byte at a time, in frame
//! order. Physical initialisation stays outside this crate; a transport only
//! reports whether it is ready so the scanner can refuse to start without one.

use std::io::Write;

use tracing::trace;

use crate::Result;

/// Sequential byte sink fed once per serialized byte of a frame.
pub trait Transport {
    /// Write the next byte of the current frame
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Write a run of bytes; the default forwards to [`write_byte`](Self::write_byte)
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Called once a complete frame has been written
    fn end_frame(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether the underlying device is usable
    fn is_ready(&self) -> bool {
        true
    }
}

impl Transport for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn end_frame(&mut self) -> Result<()> {
        (**self).end_frame()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Transport over any [`std::io::Write`] (an opened serial device, a file, a socket).
#[derive(Debug)]
pub struct WriterTransport<W: Write> {
    writer: W,
    frame_bytes: usize,
}

impl<W: Write> WriterTransport<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer, frame_bytes: 0 }
    }

    /// Borrow the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Abandon the current frame; the next one counts from zero
    fn fail(&mut self, source: std::io::Error) -> crate::BufferError {
        let bytes_written = std::mem::take(&mut self.frame_bytes);
        crate::BufferError::Transport { bytes_written, source }
    }
}

impl<W: Write> Transport for WriterTransport<W> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_all(&[byte])
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if let Err(e) = self.writer.write_all(bytes) {
            return Err(self.fail(e));
        }
        self.frame_bytes += bytes.len();
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if let Err(e) = self.writer.flush() {
            return Err(self.fail(e));
        }
        trace!(bytes = self.frame_bytes, "Frame flushed to writer");
        self.frame_bytes = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BufferError;

    struct FailingWriter {
        accept: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.accept == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"));
            }
            let n = buf.len().min(self.accept);
            self.accept -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn vec_collects_bytes_in_order() {
        let mut sink: Vec<u8> = Vec::new();
        sink.write_byte(1).expect("vec never fails");
        Transport::write_all(&mut sink, &[2, 3]).expect("vec never fails");
        sink.end_frame().expect("vec never fails");
        assert_eq!(sink, vec![1, 2, 3]);
        assert!(sink.is_ready());
    }

    #[test]
    fn writer_transport_forwards_bytes() {
        let mut transport = WriterTransport::new(Vec::new());
        transport.write_byte(0x55).expect("in-memory write");
        transport.write_all(&[0x01, 0x02]).expect("in-memory write");
        transport.end_frame().expect("in-memory flush");
        assert_eq!(transport.into_inner(), vec![0x55, 0x01, 0x02]);
    }

    #[test]
    fn writer_failure_reports_progress() {
        let mut transport = WriterTransport::new(FailingWriter { accept: 3 });
        transport.write_all(&[1, 2, 3]).expect("first three bytes fit");

        match transport.write_byte(4) {
            Err(BufferError::Transport { bytes_written, .. }) => assert_eq!(bytes_written, 3),
            other => panic!("Expected transport failure, got {other:?}"),
        }
    }

    #[test]
    fn failed_frame_does_not_inflate_next_frame_count() {
        let mut transport = WriterTransport::new(FailingWriter { accept: 3 });
        transport.write_all(&[1, 2, 3]).expect("first three bytes fit");
        assert!(transport.write_byte(4).is_err());

        // Link comes back for two bytes of the next frame, then drops again
        transport.writer.accept = 2;
        transport.write_all(&[5, 6]).expect("two bytes fit");
        match transport.write_byte(7) {
            Err(BufferError::Transport { bytes_written, .. }) => assert_eq!(bytes_written, 2),
            other => panic!("Expected transport failure, got {other:?}"),
        }
    }
}
