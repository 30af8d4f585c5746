//! Frame parser for the chat response body.
//!
//! The backend streams `data: <json>\n\n` frames over a long-lived HTTP
//! response. Frames may span transport chunk boundaries, so bytes are
//! buffered and split on the blank-line delimiter before decoding.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::error::ClientError;
use crate::http::parse_sse_data;

use super::event::StreamEvent;

/// A stream of decoded chat events over a raw byte stream.
///
/// Frames that are not `data:` lines are ignored. Frames whose payload is
/// malformed JSON or carries an unknown discriminator are skipped: counted,
/// logged at `debug`, and never surfaced as errors.
pub struct EventStream {
    inner: BoxStream<'static, Result<StreamEvent, ClientError>>,
    skipped: Arc<AtomicU64>,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("skipped", &self.skipped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventStream {
    /// Wrap a byte stream (e.g. a response body) as an event stream.
    pub fn new<S>(bytes: S) -> Self
    where
        S: Stream<Item = Result<Bytes, ClientError>> + Send + 'static,
    {
        let skipped = Arc::new(AtomicU64::new(0));
        let counter = skipped.clone();

        let stream = async_stream::stream! {
            // Buffer raw bytes and split frames at the byte level: a chunk
            // boundary can fall inside a multi-byte codepoint, so text is
            // only decoded once a frame is complete.
            let mut buffer = BytesMut::new();
            futures::pin_mut!(bytes);

            while let Some(chunk_result) = bytes.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(e);
                        // The error is terminal; an incomplete frame left in
                        // the buffer is dropped, not decoded.
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);

                while let Some(frame_end) =
                    buffer.windows(2).position(|w| w == b"\n\n")
                {
                    let frame_bytes = buffer.split_to(frame_end + 2);
                    let frame = String::from_utf8_lossy(&frame_bytes[..frame_end]);

                    if let Some(event) = decode_frame(&frame, &counter) {
                        yield Ok(event);
                    }
                }
            }

            // Clean EOF: a final frame may arrive without its terminator.
            if !buffer.is_empty() {
                let frame = String::from_utf8_lossy(&buffer);
                if let Some(event) = decode_frame(&frame, &counter) {
                    yield Ok(event);
                }
            }
        };

        Self {
            inner: Box::pin(stream),
            skipped,
        }
    }

    /// Wrap a reqwest response body.
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream().map(|r| r.map_err(ClientError::from)))
    }

    /// Number of frames skipped so far (malformed JSON or unknown event).
    pub fn skipped_frames(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Handle to the skip counter, usable after the stream is consumed.
    pub fn skip_counter(&self) -> Arc<AtomicU64> {
        self.skipped.clone()
    }
}

impl Stream for EventStream {
    type Item = Result<StreamEvent, ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Decode one frame, returning `None` for anything that isn't a usable event.
fn decode_frame(frame: &str, skipped: &AtomicU64) -> Option<StreamEvent> {
    // A frame may carry several lines (comments, event names); only the
    // data line matters.
    let data = frame.lines().map(str::trim).find_map(parse_sse_data)?;

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => Some(event),
        Err(e) => {
            skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(error = %e, payload = data, "Skipping undecodable stream frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn byte_stream(
        chunks: Vec<&'static str>,
    ) -> impl Stream<Item = Result<Bytes, ClientError>> + Send + 'static {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes()))),
        )
    }

    async fn collect(events: EventStream) -> Vec<StreamEvent> {
        events
            .map(|r| r.expect("no transport errors in this test"))
            .collect()
            .await
    }

    #[tokio::test]
    async fn parses_frames_in_order() {
        let stream = EventStream::new(byte_stream(vec![
            "data: {\"event\":\"context\",\"citations\":[]}\n\ndata: {\"event\":\"chunk\",\"text\":\"a\"}\n\n",
            "data: {\"event\":\"chunk\",\"text\":\"b\"}\n\n",
        ]));
        let events = collect(stream).await;
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            StreamEvent::Chunk {
                text: "a".to_string()
            }
        );
    }

    #[tokio::test]
    async fn frame_split_across_chunks_is_reassembled() {
        let stream = EventStream::new(byte_stream(vec![
            "data: {\"event\":\"chu",
            "nk\",\"text\":\"he",
            "llo\"}\n",
            "\n",
        ]));
        let events = collect(stream).await;
        assert_eq!(
            events,
            vec![StreamEvent::Chunk {
                text: "hello".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn malformed_json_is_skipped_and_counted() {
        let stream = EventStream::new(byte_stream(vec![
            "data: {\"event\":\"chunk\",\"text\":\"a\"}\n\ndata: {not json}\n\ndata: {\"event\":\"chunk\",\"text\":\"b\"}\n\n",
        ]));
        let counter = stream.skip_counter();
        let events = collect(stream).await;
        assert_eq!(events.len(), 2);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn unknown_event_type_is_skipped() {
        let stream = EventStream::new(byte_stream(vec![
            "data: {\"event\":\"heartbeat\"}\n\ndata: {\"event\":\"chunk\",\"text\":\"x\"}\n\n",
        ]));
        let counter = stream.skip_counter();
        let events = collect(stream).await;
        assert_eq!(events.len(), 1);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn non_data_frames_are_ignored_without_counting() {
        let stream = EventStream::new(byte_stream(vec![
            ": keepalive\n\ndata: {\"event\":\"chunk\",\"text\":\"x\"}\n\n",
        ]));
        let counter = stream.skip_counter();
        let events = collect(stream).await;
        assert_eq!(events.len(), 1);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn trailing_frame_without_terminator_is_decoded() {
        let stream = EventStream::new(byte_stream(vec![
            "data: {\"event\":\"chunk\",\"text\":\"end\"}",
        ]));
        let events = collect(stream).await;
        assert_eq!(
            events,
            vec![StreamEvent::Chunk {
                text: "end".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn multibyte_codepoint_split_across_chunks_survives() {
        // "é" is 0xC3 0xA9; the chunk boundary falls between its two bytes.
        let chunks: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(b"data: {\"event\":\"chunk\",\"text\":\"h\xC3")),
            Ok(Bytes::from_static(b"\xA9llo\"}\n\n")),
        ];
        let events = collect(EventStream::new(stream::iter(chunks))).await;
        assert_eq!(
            events,
            vec![StreamEvent::Chunk {
                text: "héllo".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn partial_frame_is_dropped_after_transport_error() {
        // The buffered frame never got its terminator; it must not surface
        // after the error.
        let chunks: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(b"data: {\"event\":\"chunk\",\"text\":\"a\"}")),
            Err(ClientError::Stream("connection reset".into())),
        ];
        let mut stream = EventStream::new(stream::iter(chunks));

        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn transport_error_terminates_stream() {
        let chunks: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"event\":\"chunk\",\"text\":\"a\"}\n\n",
            )),
            Err(ClientError::Stream("connection reset".into())),
        ];
        let mut stream = EventStream::new(stream::iter(chunks));

        let first = stream.next().await.unwrap();
        assert!(first.is_ok());
        let second = stream.next().await.unwrap();
        assert!(second.is_err());
        assert!(stream.next().await.is_none());
    }
}
