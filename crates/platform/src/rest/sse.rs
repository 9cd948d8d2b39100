//! Incremental decoder for `text/event-stream` bodies.
//!
//! The realtime store streams `event:` / `data:` pairs separated by a blank
//! line. Chunks can split an event (or a UTF-8 sequence) anywhere, so bytes
//! are buffered until a full event is available.

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed one chunk and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer
            .extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = String::from("message");
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    if data.is_empty() && event == "message" {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_complete_events() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(
            b"event: put\ndata: {\"path\":\"/\",\"data\":null}\n\nevent: keep-alive\ndata: null\n\n",
        );

        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: "put".into(),
                    data: r#"{"path":"/","data":null}"#.into(),
                },
                SseEvent {
                    event: "keep-alive".into(),
                    data: "null".into(),
                },
            ]
        );
    }

    #[test]
    fn buffers_events_split_across_chunks() {
        let mut decoder = SseDecoder::default();

        assert!(decoder.push(b"event: pa").is_empty());
        assert!(decoder.push(b"tch\r\ndata: {\"a\":").is_empty());
        let events = decoder.push(b"1}\r\n\r\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "patch");
        assert_eq!(events[0].data, r#"{"a":1}"#);
    }

    #[test]
    fn blank_blocks_are_skipped() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"\n\n").is_empty());
    }
}
