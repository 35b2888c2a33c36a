//! Incremental server-sent-events decoder.
//!
//! Bytes arrive in arbitrary chunks; complete events are returned once their
//! terminating blank line has been seen.

use std::collections::VecDeque;

use crate::error::SseError;

/// Longest line accepted before the stream is treated as malformed.
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    max_line: usize,
    event: Option<String>,
    data: Vec<String>,
    ready: VecDeque<SseEvent>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line,
            event: None,
            data: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    /// Feed a chunk. Fails if a complete line is not valid UTF-8 or a line grows
    /// past the length limit.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), SseError> {
        self.buffer.extend_from_slice(chunk);
        loop {
            let pos = match self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
                Some(offset) => self.scanned + offset,
                None => {
                    self.scanned = self.buffer.len();
                    if self.buffer.len() > self.max_line {
                        return Err(SseError::LineTooLong { limit: self.max_line });
                    }
                    return Ok(());
                }
            };
            self.scanned = 0;
            if pos > self.max_line {
                return Err(SseError::LineTooLong { limit: self.max_line });
            }
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = std::str::from_utf8(&line)?.to_string();
            self.process_line(&line);
        }
    }

    pub fn next_event(&mut self) -> Option<SseEvent> {
        self.ready.pop_front()
    }

    fn process_line(&mut self, line: &str) {
        if line.is_empty() {
            self.dispatch();
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id and retry carry nothing the gateway client uses
            _ => {}
        }
    }

    fn dispatch(&mut self) {
        if self.event.is_none() && self.data.is_empty() {
            return;
        }
        self.ready.push_back(SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: {\"batch\"").unwrap();
        assert!(decoder.next_event().is_none());
        decoder.push(b":[]}\r\n\r\n").unwrap();

        let event = decoder.next_event().unwrap();
        assert_eq!(event.event, None);
        assert_eq!(event.data, "{\"batch\":[]}");
        assert!(decoder.next_event().is_none());
    }

    #[test]
    fn test_named_events_and_comments() {
        let mut decoder = SseDecoder::new();
        decoder
            .push(
                b": keepalive\n\nevent: heartbeat\ndata: 1700000000\n\n\
                  event: closing\ndata: bye\n\n",
            )
            .unwrap();

        let heartbeat = decoder.next_event().unwrap();
        assert_eq!(heartbeat.event.as_deref(), Some("heartbeat"));
        let closing = decoder.next_event().unwrap();
        assert_eq!(closing.event.as_deref(), Some("closing"));
        assert_eq!(closing.data, "bye");
        assert!(decoder.next_event().is_none());
    }

    #[test]
    fn test_multiline_data() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: first\ndata:second\n\n").unwrap();
        assert_eq!(decoder.next_event().unwrap().data, "first\nsecond");
    }

    #[test]
    fn test_invalid_utf8_line() {
        let mut decoder = SseDecoder::new();
        assert!(matches!(
            decoder.push(&[b'd', b'a', 0xff, b'\n']),
            Err(SseError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_line_without_newline_hits_limit() {
        let mut decoder = SseDecoder::with_max_line(16);
        decoder.push(b"data: 0123456").unwrap();
        assert_eq!(decoder.push(b"789abcdef"), Err(SseError::LineTooLong { limit: 16 }));
    }

    #[test]
    fn test_long_terminated_line_rejected() {
        let mut decoder = SseDecoder::with_max_line(8);
        assert_eq!(
            decoder.push(b"data: 0123456789\n\n"),
            Err(SseError::LineTooLong { limit: 8 })
        );
    }

    #[test]
    fn test_line_assembled_from_small_chunks() {
        let mut decoder = SseDecoder::with_max_line(64);
        for byte in b"data: {\"batch\":[]}\n\n" {
            decoder.push(std::slice::from_ref(byte)).unwrap();
        }
        assert_eq!(decoder.next_event().unwrap().data, "{\"batch\":[]}");
        assert!(decoder.next_event().is_none());
    }
}
