//! Incremental line splitting for streamed response bodies.

use crate::provider::error::Error;
use crate::provider::openai_compat::{DATA_PREFIX, LineStream};
use bytes::BytesMut;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;

/// Incremental line decoder.
///
/// Buffers raw bytes so that lines (and multi-byte characters) split across
/// network chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// Bytes of `buffer` already known to contain no newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return every line it completes.
    ///
    /// Lines are split on `\n`; a trailing `\r` is dropped. A `data:` line
    /// that is not valid UTF-8 comes back as [`Error::MalformedChunk`].
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<String, Error>> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            let line = self.buffer.split_to(pos + 1);
            self.scanned = 0;
            lines.push(decode(&line[..pos]));
        }
        self.scanned = self.buffer.len();

        lines
    }

    /// Flush a final line that had no terminating newline.
    pub fn finish(&mut self) -> Option<Result<String, Error>> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        self.scanned = 0;
        Some(decode(&rest))
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

fn decode(line: &[u8]) -> Result<String, Error> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    match std::str::from_utf8(line) {
        Ok(text) => Ok(text.to_string()),
        Err(e) => {
            let text = String::from_utf8_lossy(line).into_owned();
            if text.starts_with(DATA_PREFIX) {
                tracing::warn!("Invalid UTF-8 in frame: {e}");
                Err(Error::MalformedChunk {
                    line: text,
                    reason: format!("invalid UTF-8: {e}"),
                })
            } else {
                tracing::trace!("Invalid UTF-8 in skipped line: {e}");
                Ok(text)
            }
        }
    }
}

/// Turn a body byte stream into a lazy stream of lines.
///
/// A read error is yielded once as [`Error::StreamInterrupted`] and ends the
/// stream.
pub fn line_stream<S, B, E>(bytes: S) -> LineStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (Box::pin(bytes), LineDecoder::new(), VecDeque::new(), false);

    futures::stream::unfold(
        state,
        |(mut bytes, mut decoder, mut pending, mut ended)| async move {
            loop {
                if let Some(line) = pending.pop_front() {
                    return Some((line, (bytes, decoder, pending, ended)));
                }
                if ended {
                    return None;
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => pending.extend(decoder.feed(chunk.as_ref())),
                    Some(Err(e)) => {
                        ended = true;
                        decoder.clear();
                        let error = Error::StreamInterrupted(e.to_string());
                        return Some((Err(error), (bytes, decoder, pending, ended)));
                    }
                    None => {
                        ended = true;
                        pending.extend(decoder.finish());
                    }
                }
            }
        },
    )
    .boxed()
}
