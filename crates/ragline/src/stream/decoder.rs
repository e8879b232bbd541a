use crate::error::ChatError;

/// Splits a raw byte stream into newline-delimited text frames.
///
/// Network chunks arrive at arbitrary boundaries: a frame, or even a single
/// multi-byte UTF-8 character, may be split across chunks. The decoder keeps
/// the trailing incomplete line in a carry-over buffer and only decodes a
/// line once its terminating separator has arrived, so partial code points
/// never reach the UTF-8 decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    carry: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk and returns the complete lines it finished.
    ///
    /// Invalid UTF-8 in a completed frame is fatal: raw bytes cannot be
    /// safely recovered, so the caller must tear the session down.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, ChatError> {
        self.carry.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let rest = self.carry.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.carry, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(decode(line)?);
        }
        Ok(lines)
    }

    /// Flushes the remaining buffer as a final, unterminated line.
    pub fn finish(self) -> Result<Option<String>, ChatError> {
        if self.carry.is_empty() {
            Ok(None)
        } else {
            decode(self.carry).map(Some)
        }
    }
}

fn decode(bytes: Vec<u8>) -> Result<String, ChatError> {
    String::from_utf8(bytes)
        .map_err(|_| ChatError::StreamDecode("invalid utf-8 in stream frame".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(chunks: &[&[u8]]) -> Vec<String> {
        let mut decoder = FrameDecoder::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(decoder.push(chunk).unwrap());
        }
        if let Some(tail) = decoder.finish().unwrap() {
            lines.push(tail);
        }
        lines
    }

    #[test]
    fn splits_complete_lines() {
        assert_eq!(collect(&[b"a\nb\nc\n"]), vec!["a", "b", "c"]);
    }

    #[test]
    fn carries_partial_line_across_chunks() {
        assert_eq!(collect(&[b"hel", b"lo\nwor", b"ld\n"]), vec!["hello", "world"]);
    }

    #[test]
    fn flushes_unterminated_tail() {
        assert_eq!(collect(&[b"one\ntwo"]), vec!["one", "two"]);
    }

    #[test]
    fn strips_carriage_returns() {
        assert_eq!(collect(&[b"a\r\nb\r\n"]), vec!["a", "b"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        // "héllo\n" with the two-byte 'é' split between chunks.
        let bytes = "h\u{e9}llo\n".as_bytes();
        assert_eq!(bytes[1..3].len(), 2);
        let chunks: &[&[u8]] = &[&bytes[..2], &bytes[2..]];
        assert_eq!(collect(chunks), vec!["h\u{e9}llo"]);
    }

    #[test]
    fn chunk_boundary_independence() {
        let stream = "data: {\"type\":\"text\",\"content\":\"\u{3053}\u{3093}\"}\n\ndata: [DONE]\n";
        let bytes = stream.as_bytes();
        let whole = collect(&[bytes]);
        for split in 1..bytes.len() {
            let chunks: &[&[u8]] = &[&bytes[..split], &bytes[split..]];
            assert_eq!(collect(chunks), whole, "split at {}", split);
        }
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.push(b"\xff\xfe\n").unwrap_err();
        assert!(matches!(err, ChatError::StreamDecode(_)));
    }
}
