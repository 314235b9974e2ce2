//! Boundary-safe UTF-8 decoding of a chunked byte stream.
//!
//! The backend streams plain text, but HTTP chunk boundaries fall wherever
//! they fall, including in the middle of a multi-byte character. The decoder
//! holds back a trailing partial sequence until the bytes that complete it
//! arrive, so downstream consumers never see half a character.

/// Incremental UTF-8 decoder for an ordered sequence of byte chunks.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Bytes carried over from the previous chunk: either the prefix of an
    /// unfinished multi-byte character, or nothing.
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    ///
    /// Invalid byte sequences in the middle of the stream are replaced with
    /// U+FFFD and decoding continues; a valid-but-unfinished sequence at the
    /// end of the chunk is withheld until the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::new();
        let mut cursor = 0usize;
        while cursor < self.pending.len() {
            match std::str::from_utf8(&self.pending[cursor..]) {
                Ok(text) => {
                    out.push_str(text);
                    cursor = self.pending.len();
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(
                        &self.pending[cursor..cursor + valid],
                    ));
                    match err.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            cursor += valid + invalid;
                        }
                        None => {
                            // Incomplete trailing sequence: wait for more bytes.
                            cursor += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..cursor);
        out
    }

    /// Flush any held-back bytes at end of stream.
    ///
    /// No further bytes will arrive, so a partial sequence can no longer be
    /// completed and is decoded lossily instead of being dropped.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        if rest.is_empty() {
            String::new()
        } else {
            String::from_utf8_lossy(&rest).into_owned()
        }
    }

    /// Number of bytes currently withheld.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_ascii_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.feed(b"hello world"), "hello world");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn holds_back_split_multibyte_character() {
        // "🔧" is F0 9F 94 A7; split it across two chunks.
        let bytes = "🔧".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.feed(&bytes[..2]), "");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.feed(&bytes[2..]), "🔧");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn split_character_with_surrounding_text() {
        let text = "ab✨cd";
        let bytes = text.as_bytes();
        // Split inside the 3-byte "✨".
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = decoder.feed(&bytes[..3]);
        out.push_str(&decoder.feed(&bytes[3..]));
        assert_eq!(out, text);
    }

    #[test]
    fn every_chunking_yields_identical_text() {
        let text = "Héllo 🔧 wörld ✅ done";
        let bytes = text.as_bytes();
        for split in 1..bytes.len() {
            let mut decoder = Utf8StreamDecoder::new();
            let mut out = decoder.feed(&bytes[..split]);
            out.push_str(&decoder.feed(&bytes[split..]));
            out.push_str(&decoder.finish());
            assert_eq!(out, text, "split at byte {split}");
        }
    }

    #[test]
    fn invalid_bytes_are_replaced_not_fatal() {
        let mut decoder = Utf8StreamDecoder::new();
        let out = decoder.feed(&[b'a', 0xFF, b'b']);
        assert_eq!(out, "a\u{FFFD}b");
    }

    #[test]
    fn truncated_sequence_is_replaced_when_disproved() {
        // F0 9F 92 is a 4-byte prefix; a following ASCII byte disproves it.
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.feed(&[0xF0, 0x9F, 0x92]), "");
        assert_eq!(decoder.feed(b"x"), "\u{FFFD}x");
    }

    #[test]
    fn finish_flushes_partial_tail_lossily() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.feed(&[b'o', b'k', 0xE2, 0x9C]), "ok");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn finish_on_clean_stream_is_empty() {
        let mut decoder = Utf8StreamDecoder::new();
        decoder.feed(b"done");
        assert_eq!(decoder.finish(), "");
    }
}
