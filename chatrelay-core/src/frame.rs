//! Line framing over chunked byte streams.
//!
//! `FrameDecoder` keeps undecoded bytes between chunks and splits on `\n`.
//! Splitting happens on raw bytes, so a multi-byte UTF-8 sequence cut by a
//! chunk boundary stays intact in the buffer until its line completes.
//! Separators are consumed; nothing else (including `\r`) is stripped.

use bytes::{Buf, BytesMut};

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed, in order.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line);
        }
        lines
    }

    /// Pop one complete line from the buffer, if any.
    fn next_line(&mut self) -> Option<String> {
        let idx = self.buf.iter().position(|b| *b == b'\n')?;
        let line = self.buf.split_to(idx);
        self.buf.advance(1);
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Bytes held back waiting for a line feed.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// End of input: the retained partial line, if non-empty, is one more line.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut decoder = FrameDecoder::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(decoder.decode(chunk));
        }
        lines.extend(decoder.finish());
        lines
    }

    #[test]
    fn splits_complete_lines_and_keeps_tail() {
        let mut decoder = FrameDecoder::new();
        let lines = decoder.decode(b"data: a\ndata: b\ndata: c");
        assert_eq!(lines, vec!["data: a", "data: b"]);
        assert_eq!(decoder.pending(), b"data: c");
        assert_eq!(decoder.finish().as_deref(), Some("data: c"));
    }

    #[test]
    fn empty_tail_is_not_a_line() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(b"one\n"), vec!["one"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn chunk_boundaries_do_not_change_lines() {
        let input = "data: {\"x\":\"h\u{e9}llo \u{1f600}\"}\n\ndata: [DONE]\nrest".as_bytes();
        let whole = decode_all(&[input]);
        assert_eq!(whole.len(), 4);

        for cut in 0..=input.len() {
            let (a, b) = input.split_at(cut);
            assert_eq!(decode_all(&[a, b]), whole, "split at byte {cut}");
        }
        let bytewise: Vec<&[u8]> = input.chunks(1).collect();
        assert_eq!(decode_all(&bytewise), whole);
    }

    #[test]
    fn rejoining_lines_reconstructs_input() {
        let input = "a\r\n\nb\nc";
        let lines = decode_all(&[input.as_bytes()]);
        assert_eq!(lines, vec!["a\r", "", "b", "c"]);
        assert_eq!(lines.join("\n"), input);
    }

    #[test]
    fn multibyte_split_across_chunks_survives() {
        let snowman = "\u{2603}".as_bytes();
        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode(&snowman[..1]).is_empty());
        assert!(decoder.decode(&snowman[1..]).is_empty());
        assert_eq!(decoder.decode(b"\n"), vec!["\u{2603}"]);
    }
}
