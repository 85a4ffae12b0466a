// SPDX-License-Identifier: MIT

//! Server-Sent Events decoding for streamed model responses
//!
//! Providers stream `data: {...}` events separated by blank lines. Network
//! chunks do not respect event boundaries, so bytes are buffered until a full
//! line is available.

use super::TextStream;
use crate::adk::error::{LangkitError, Result};
use futures::stream::{self, StreamExt};
use serde_json::Value;

/// Incremental SSE parser yielding the `data` payload of each complete event
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning payloads of any events it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(payload) = self.dispatch() {
                    events.push(payload);
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // comments (":...") and event/id/retry fields carry nothing we need
        }
        events
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        if payload == "[DONE]" {
            None
        } else {
            Some(payload)
        }
    }
}

/// Turn an SSE response into a stream of text deltas.
///
/// `extract` pulls the text fragment out of one decoded JSON event; events it
/// returns `None` for (pings, stop markers, tool deltas) are skipped.
pub fn text_stream(
    response: reqwest::Response,
    provider: &'static str,
    extract: fn(&Value) -> Option<String>,
) -> TextStream {
    let mut decoder = SseDecoder::new();
    let fragments = response
        .bytes_stream()
        .map(move |chunk| -> Vec<Result<String>> {
            match chunk {
                Ok(bytes) => decoder
                    .push(&bytes)
                    .iter()
                    .filter_map(|payload| decode_event(payload, provider, extract))
                    .collect(),
                Err(e) => vec![Err(e.into())],
            }
        })
        .flat_map(stream::iter);

    Box::pin(fragments)
}

fn decode_event(
    payload: &str,
    provider: &str,
    extract: fn(&Value) -> Option<String>,
) -> Option<Result<String>> {
    let event: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => return Some(Err(e.into())),
    };

    if let Some(error) = event.get("error") {
        let message = error["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Some(Err(LangkitError::api(provider, message)));
    }

    extract(&event).filter(|t| !t.is_empty()).map(Ok)
}
