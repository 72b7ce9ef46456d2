//! Minimal SSE frame parser over a byte stream, used by the legacy-SSE
//! fallback path in [`crate::client::http`]. Only the `data:` field is
//! surfaced; `event:`/`id:`/`retry:` are not needed by any external server
//! this federates against today.

use futures::{Stream, StreamExt};
use std::pin::Pin;

pub struct SseFrame {
    pub data: String,
}

pub struct SseLineStream {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>,
    buf: String,
}

impl SseLineStream {
    pub fn new<S>(inner: S) -> Self
    where
        S: Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
    {
        Self { inner: Box::pin(inner), buf: String::new() }
    }

    /// Pull bytes until a full SSE frame (one or more `data:` lines
    /// terminated by a blank line) is assembled, or the stream ends.
    pub async fn next_frame(&mut self) -> Option<SseFrame> {
        loop {
            if let Some(frame) = self.take_frame() {
                return Some(frame);
            }
            match self.inner.next().await {
                Some(Ok(chunk)) => self.buf.push_str(&String::from_utf8_lossy(&chunk)),
                _ => return self.take_frame(),
            }
        }
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        let sep = self.buf.find("\n\n")?;
        let raw: String = self.buf.drain(..sep + 2).collect();
        let mut data_lines = Vec::new();
        for line in raw.lines() {
            if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.trim_start().to_string());
            }
        }
        Some(SseFrame { data: data_lines.join("\n") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn parses_single_data_frame() {
        let chunks = vec![Ok(bytes::Bytes::from("data: {\"a\":1}\n\n"))];
        let mut s = SseLineStream::new(stream::iter(chunks));
        let frame = s.next_frame().await.expect("frame");
        assert_eq!(frame.data, "{\"a\":1}");
    }

    #[tokio::test]
    async fn parses_frame_split_across_chunks() {
        let chunks = vec![Ok(bytes::Bytes::from("data: {\"a\"")), Ok(bytes::Bytes::from(":1}\n\n"))];
        let mut s = SseLineStream::new(stream::iter(chunks));
        let frame = s.next_frame().await.expect("frame");
        assert_eq!(frame.data, "{\"a\":1}");
    }

    #[tokio::test]
    async fn returns_none_on_empty_stream() {
        let mut s = SseLineStream::new(stream::iter(Vec::<reqwest::Result<bytes::Bytes>>::new()));
        assert!(s.next_frame().await.is_none());
    }
}
