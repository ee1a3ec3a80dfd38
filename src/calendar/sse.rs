//! Incremental decoder for `text/event-stream` bodies.

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Feeds on raw body chunks; yields frames as blank lines complete them.
/// Comment lines, `id:` and `retry:` fields are consumed and dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        // CRLF line endings reduce to LF.
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = vec![];
        while let Some(pos) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buf.drain(..pos + 2).collect();
            if let Some(frame) = parse_block(&String::from_utf8_lossy(&block)) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_block(block: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Vec<&str> = vec![];

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"retry: 5000\n\n: connected\n\nda").is_empty());
        assert!(decoder.push(b"ta: {\"a\":").is_empty());
        let frames = decoder.push(b"1}\n\ndata: two\r\n\r\n");

        assert_eq!(
            frames,
            vec![
                SseFrame { event: None, data: "{\"a\":1}".to_string() },
                SseFrame { event: None, data: "two".to_string() },
            ]
        );
    }

    #[test]
    fn test_multiline_data_and_event_name() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: change\ndata: first\ndata:second\nid: 7\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("change"));
        assert_eq!(frames[0].data, "first\nsecond");
    }

    #[test]
    fn test_keepalive_comment_yields_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b": keepalive\n\n").is_empty());
    }
}
