//! Async frame stream over a byte reader

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tracing::debug;

use super::{Frame, FrameDecoder};
use crate::Result;

const READ_CHUNK: usize = 512;

pin_project! {
    /// Yields every frame decoded from an `AsyncRead` (a serial port, a pipe, a file).
    ///
    /// Ends when the reader reaches EOF; a trailing partial frame is dropped.
    pub struct FrameStream<R> {
        #[pin]
        reader: R,
        decoder: FrameDecoder,
        chunk: Box<[u8]>,
        eof: bool,
    }
}

impl<R: AsyncRead> FrameStream<R> {
    /// Wrap a reader with a default decoder
    pub fn new(reader: R) -> Self {
        Self::with_decoder(reader, FrameDecoder::default())
    }

    /// Wrap a reader with a configured decoder
    pub fn with_decoder(reader: R, decoder: FrameDecoder) -> Self {
        Self { reader, decoder, chunk: vec![0u8; READ_CHUNK].into_boxed_slice(), eof: false }
    }

    /// The decoder's resynchronisation statistics
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }
}

impl<R: AsyncRead> Stream for FrameStream<R> {
    type Item = Result<Frame>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(frame) = this.decoder.next_frame() {
                return Poll::Ready(Some(Ok(frame)));
            }

            if *this.eof {
                return Poll::Ready(None);
            }

            let mut buf = ReadBuf::new(this.chunk);
            if let Err(e) = ready!(this.reader.as_mut().poll_read(cx, &mut buf)) {
                return Poll::Ready(Some(Err(e.into())));
            }

            let filled = buf.filled();
            if filled.is_empty() {
                debug!(
                    leftover = this.decoder.buffered(),
                    skipped = this.decoder.skipped_bytes(),
                    "Frame reader reached end of input"
                );
                *this.eof = true;
            } else {
                this.decoder.push(filled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceRecord, Identity, SnapshotHeader};
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;

    fn frame(sequence: u8, n: u8) -> Vec<u8> {
        let mut header = SnapshotHeader::new(sequence);
        header.unique_count = u16::from(n);
        header.raw_event_count = u16::from(n) * 2;
        let records = (0..n)
            .map(|i| DeviceRecord::new(Identity::new([0xC0, 0, 0, 0, sequence, i])))
            .collect();
        Frame { header, records }.to_bytes()
    }

    #[tokio::test]
    async fn yields_frames_from_reader_until_eof() {
        let mut bytes = vec![0xAA, 0xBB];
        bytes.extend(frame(10, 2));
        bytes.extend(frame(11, 0));
        bytes.extend(frame(12, 5));

        let frames: Vec<_> = FrameStream::new(bytes.as_slice()).collect().await;
        let sequences: Vec<u8> =
            frames.iter().filter_map(|f| f.as_ref().ok()).map(|f| f.header.sequence).collect();

        assert_eq!(sequences, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn reads_across_pipe_writes() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let payload = frame(1, 8);

        let writer = tokio::spawn(async move {
            for chunk in payload.chunks(17) {
                tx.write_all(chunk).await.ok();
            }
        });

        let mut stream = FrameStream::new(rx);
        let first = stream.next().await;
        writer.await.ok();

        let frame = first.and_then(|r| r.ok()).expect("one frame decoded");
        assert_eq!(frame.records.len(), 8);
        assert_eq!(frame.header.raw_event_count, 16);
    }
}
