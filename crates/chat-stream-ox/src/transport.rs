use futures_util::StreamExt;

use crate::error::ChatStreamError;

type ByteStream =
    std::pin::Pin<Box<dyn futures_util::Stream<Item = Result<bytes::Bytes, ChatStreamError>> + Send>>;

/// Incremental line reader over a chunked response body.
///
/// Bytes are buffered until a `\n` completes a line, so a line split across
/// network packets is emitted exactly once. A trailing partial line is
/// flushed when the stream ends without a terminator.
pub struct LineReader {
    byte_stream: ByteStream,
    buffer: Vec<u8>,
    done: bool,
}

impl LineReader {
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::from_stream(response.bytes_stream().map(|chunk| {
            chunk.map_err(|err| ChatStreamError::StreamRead(err.to_string()))
        }))
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures_util::Stream<Item = Result<bytes::Bytes, ChatStreamError>> + Send + 'static,
    {
        Self {
            byte_stream: Box::pin(stream),
            buffer: Vec::new(),
            done: false,
        }
    }

    /// Get the next complete line, or `None` when the stream is exhausted.
    pub async fn next_line(&mut self) -> Result<Option<String>, ChatStreamError> {
        loop {
            if let Some(line) = self.take_buffered_line()? {
                return Ok(Some(line));
            }

            if self.done {
                return Ok(self.take_trailing_line()?);
            }

            match self.byte_stream.next().await {
                Some(chunk_result) => {
                    let chunk = chunk_result?;
                    self.buffer.extend_from_slice(&chunk);
                }
                None => {
                    self.done = true;
                }
            }
        }
    }

    fn take_buffered_line(&mut self) -> Result<Option<String>, ChatStreamError> {
        if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let line = String::from_utf8(line_bytes)?;
            return Ok(Some(line));
        }
        Ok(None)
    }

    fn take_trailing_line(&mut self) -> Result<Option<String>, ChatStreamError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let line = String::from_utf8(std::mem::take(&mut self.buffer))?;
        Ok(Some(line))
    }
}
