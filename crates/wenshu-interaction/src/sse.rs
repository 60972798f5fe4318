//! Server-Sent Events decoding for the chat stream.
//!
//! The backend answers `POST /chat` with `text/event-stream` frames of the
//! form `data: {"type": ..., "data": ...}` separated by a blank line. Frame
//! splitting, line endings and comment lines are handled by
//! `eventsource-stream`; this module turns each `data` payload into a
//! [`StreamEvent`].

use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::{self, Stream, StreamExt};
use std::fmt::Display;
use wenshu_core::stream::{StreamEvent, StreamFault};
use wenshu_core::transport::EventStream;

/// Sentinel some servers send after the last frame.
const DONE_SENTINEL: &str = "[DONE]";

/// Turns a response body into the typed events of one exchange.
///
/// Payloads that fail to parse surface as `StreamFault::Protocol` items and
/// decoding continues. A body error surfaces as a single
/// `StreamFault::Transport` item and ends the stream.
pub fn decode_event_stream<S, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let events = Box::pin(body.eventsource());

    stream::unfold((events, false), |(mut events, finished)| async move {
        if finished {
            return None;
        }
        loop {
            match events.next().await? {
                Ok(event) => {
                    if event.data.is_empty() || event.data.trim() == DONE_SENTINEL {
                        continue;
                    }
                    return Some((StreamEvent::parse(&event.data), (events, false)));
                }
                Err(EventStreamError::Transport(e)) => {
                    let fault = StreamFault::Transport(e.to_string());
                    return Some((Err(fault), (events, true)));
                }
                Err(e) => {
                    let fault = StreamFault::Protocol(e.to_string());
                    return Some((Err(fault), (events, false)));
                }
            }
        }
    })
    .boxed()
}
