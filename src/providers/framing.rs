//! Chunk-framing parsers for vendor byte streams.
//!
//! Each vendor frames its streaming HTTP body differently: the
//! OpenAI-compatible endpoints and Anthropic use SSE (`data:`-prefixed
//! lines), Google uses newline-delimited JSON objects. Both parsers here
//! buffer partial lines across TCP chunk boundaries and yield complete
//! frames; interpreting a frame is the adapter's job.

use crate::providers::ProviderError;

/// Guard against a misbehaving vendor replaying the same frame forever.
const MAX_IDENTICAL_FRAMES: u32 = 100;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A complete framing unit extracted from the byte stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Payload of one frame (JSON text, framing prefix stripped).
    Data(String),
    /// The `[DONE]` sentinel used by OpenAI-compatible streams.
    Done,
}

// ---------------------------------------------------------------------------
// Repeat guard (shared by both parsers)
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RepeatGuard {
    last: String,
    count: u32,
}

impl RepeatGuard {
    /// Record a payload; errors once the same payload has repeated
    /// [`MAX_IDENTICAL_FRAMES`] times in a row.
    fn check(&mut self, payload: &str) -> Result<(), ProviderError> {
        if payload == self.last {
            self.count += 1;
            if self.count >= MAX_IDENTICAL_FRAMES {
                return Err(ProviderError::Stream(format!(
                    "runaway stream: {MAX_IDENTICAL_FRAMES} identical consecutive frames"
                )));
            }
        } else {
            self.last = payload.to_string();
            self.count = 1;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SSE framing
// ---------------------------------------------------------------------------

/// Stateful SSE line framer.
///
/// Accumulates partial lines across TCP chunks and yields `data:` payloads.
/// `event:` lines, comments, and blank event separators are dropped here; a
/// `data:` payload that later fails to parse as the vendor's JSON shape is
/// the adapter's problem, not the framer's.
#[derive(Debug, Default)]
pub struct SseFramer {
    buffer: String,
    guard: RepeatGuard,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return all frames completed by it.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Frame>, ProviderError> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(frame) = self.frame_from_line(line)? {
                frames.push(frame);
            }
        }
        Ok(frames)
    }

    /// Yield a trailing unterminated line as a final frame, if any.
    pub fn flush(&mut self) -> Result<Option<Frame>, ProviderError> {
        let rest = std::mem::take(&mut self.buffer);
        let line = rest.trim();
        if line.is_empty() {
            return Ok(None);
        }
        self.frame_from_line(line)
    }

    fn frame_from_line(&mut self, line: &str) -> Result<Option<Frame>, ProviderError> {
        if line.is_empty() || line.starts_with(':') || line.starts_with("event:") {
            return Ok(None);
        }
        let Some(data) = line.strip_prefix("data:") else {
            // Unknown line format, not part of any frame we understand.
            return Ok(None);
        };
        let data = data.trim_start();
        if data == "[DONE]" {
            return Ok(Some(Frame::Done));
        }
        self.guard.check(data)?;
        Ok(Some(Frame::Data(data.to_string())))
    }
}

// ---------------------------------------------------------------------------
// NDJSON framing
// ---------------------------------------------------------------------------

/// Stateful newline-delimited JSON framer.
///
/// Every non-empty line is one frame. There is no end-of-stream sentinel;
/// the adapter detects completion from a stop-reason field inside the
/// payload (or from stream EOF).
#[derive(Debug, Default)]
pub struct NdjsonFramer {
    buffer: String,
    guard: RepeatGuard,
}

impl NdjsonFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return all frames completed by it.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Frame>, ProviderError> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.guard.check(line)?;
            frames.push(Frame::Data(line.to_string()));
        }
        Ok(frames)
    }

    /// Yield a trailing unterminated line as a final frame, if any.
    pub fn flush(&mut self) -> Result<Option<Frame>, ProviderError> {
        let rest = std::mem::take(&mut self.buffer);
        let line = rest.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(Frame::Data(line.to_string())))
    }
}

// ---------------------------------------------------------------------------
// Framer trait + delta stream assembly
// ---------------------------------------------------------------------------

/// Common surface of [`SseFramer`] and [`NdjsonFramer`].
pub trait Framer: Send {
    fn feed(&mut self, chunk: &str) -> Result<Vec<Frame>, ProviderError>;
    fn flush(&mut self) -> Result<Option<Frame>, ProviderError>;
}

impl Framer for SseFramer {
    fn feed(&mut self, chunk: &str) -> Result<Vec<Frame>, ProviderError> {
        SseFramer::feed(self, chunk)
    }
    fn flush(&mut self) -> Result<Option<Frame>, ProviderError> {
        SseFramer::flush(self)
    }
}

impl Framer for NdjsonFramer {
    fn feed(&mut self, chunk: &str) -> Result<Vec<Frame>, ProviderError> {
        NdjsonFramer::feed(self, chunk)
    }
    fn flush(&mut self) -> Result<Option<Frame>, ProviderError> {
        NdjsonFramer::flush(self)
    }
}

/// Turn a vendor response body into a [`DeltaStream`].
///
/// `parse` interprets one frame payload as the vendor's chunk shape; a
/// `None` return means the frame did not match and is skipped (lenient
/// parsing for keep-alives and partial frames). The stream yields exactly
/// one `done` delta and stops reading immediately after it; if the body
/// ends without a vendor completion signal, a synthetic `done` delta is
/// emitted so downstream consumers always see a terminal unit.
pub(crate) fn delta_stream<F, P>(
    response: reqwest::Response,
    framer: F,
    parse: P,
) -> crate::providers::DeltaStream
where
    F: Framer + 'static,
    P: FnMut(&str) -> Option<crate::providers::StreamDelta> + Send + 'static,
{
    use futures::stream::{self, StreamExt};
    use std::collections::VecDeque;

    use crate::providers::StreamDelta;

    struct State<F, P> {
        bytes: std::pin::Pin<Box<dyn futures::Stream<Item = Result<String, ProviderError>> + Send>>,
        framer: F,
        parse: P,
        pending: VecDeque<Result<StreamDelta, ProviderError>>,
        skipped: u32,
        finished: bool,
    }

    let state = State {
        bytes: Box::pin(response.bytes_stream().map(|r| {
            r.map(|b| String::from_utf8_lossy(&b).into_owned())
                .map_err(|e| ProviderError::Stream(e.to_string()))
        })),
        framer,
        parse,
        pending: VecDeque::new(),
        skipped: 0,
        finished: false,
    };

    let deltas = stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                if matches!(&item, Ok(d) if d.done) {
                    st.finished = true;
                    if st.skipped > 0 {
                        tracing::debug!(skipped = st.skipped, "Skipped malformed stream frames");
                    }
                }
                return Some((item, st));
            }
            if st.finished {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(text)) => {
                    let frames = match st.framer.feed(&text) {
                        Ok(f) => f,
                        Err(e) => {
                            st.finished = true;
                            return Some((Err(e), st));
                        }
                    };
                    for frame in frames {
                        if st.finished {
                            break;
                        }
                        push_frame(&mut st.pending, &mut st.parse, &mut st.skipped, frame);
                        if matches!(st.pending.back(), Some(Ok(d)) if d.done) {
                            // Stop feeding once the terminal unit is queued.
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                None => {
                    if let Ok(Some(frame)) = st.framer.flush() {
                        push_frame(&mut st.pending, &mut st.parse, &mut st.skipped, frame);
                    }
                    // EOF without a vendor completion signal still yields a
                    // terminal unit.
                    if !st.pending.iter().any(|i| matches!(i, Ok(d) if d.done)) {
                        st.pending.push_back(Ok(StreamDelta::done()));
                    }
                }
            }
        }
    });

    fn push_frame<P>(
        pending: &mut VecDeque<Result<crate::providers::StreamDelta, ProviderError>>,
        parse: &mut P,
        skipped: &mut u32,
        frame: Frame,
    ) where
        P: FnMut(&str) -> Option<crate::providers::StreamDelta>,
    {
        match frame {
            Frame::Done => pending.push_back(Ok(crate::providers::StreamDelta::done())),
            Frame::Data(data) => match parse(&data) {
                Some(delta) => pending.push_back(Ok(delta)),
                None => {
                    *skipped += 1;
                    tracing::debug!(raw = %data, "Frame did not match vendor shape, skipping");
                }
            },
        }
    }

    Box::pin(deltas)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
