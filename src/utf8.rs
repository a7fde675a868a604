//! Incremental UTF-8 decoding for byte streams arriving in arbitrary
//! chunks. A multi-byte sequence torn across feeds is held (at most 3
//! trailing bytes) and completed by the next feed; invalid input becomes
//! U+FFFD per the standard substitution practice.

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Bytes of an incomplete sequence carried across feeds.
    pending: Vec<u8>,
    /// Continuation bytes still expected for `pending`.
    remaining: usize,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.remaining = 0;
    }

    /// Decode a chunk, appending to `out`. Incomplete trailing sequences
    /// are buffered for the next call.
    pub fn decode(&mut self, bytes: &[u8], out: &mut String) {
        for &byte in bytes {
            if self.remaining > 0 {
                if byte & 0xC0 == 0x80 {
                    self.pending.push(byte);
                    self.remaining -= 1;
                    if self.remaining == 0 {
                        self.flush_pending(out);
                    }
                } else {
                    // Truncated sequence: substitute and reprocess the byte.
                    out.push(REPLACEMENT);
                    self.pending.clear();
                    self.remaining = 0;
                    self.start_byte(byte, out);
                }
            } else {
                self.start_byte(byte, out);
            }
        }
    }

    fn start_byte(&mut self, byte: u8, out: &mut String) {
        match byte {
            0x00..=0x7F => out.push(byte as char),
            0xC2..=0xDF => self.begin(byte, 1),
            0xE0..=0xEF => self.begin(byte, 2),
            0xF0..=0xF4 => self.begin(byte, 3),
            // Stray continuation bytes and the always-invalid 0xC0/0xC1,
            // 0xF5..=0xFF lead bytes.
            _ => out.push(REPLACEMENT),
        }
    }

    fn begin(&mut self, byte: u8, remaining: usize) {
        self.pending.clear();
        self.pending.push(byte);
        self.remaining = remaining;
    }

    fn flush_pending(&mut self, out: &mut String) {
        match std::str::from_utf8(&self.pending) {
            Ok(s) => out.push_str(s),
            // Overlong encodings and surrogates reach here with correct
            // byte counts but invalid scalar values.
            Err(_) => out.push(REPLACEMENT),
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut Utf8Decoder, bytes: &[u8]) -> String {
        let mut out = String::new();
        decoder.decode(bytes, &mut out);
        out
    }

    #[test]
    fn ascii_passes_through() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decode_all(&mut decoder, b"hello"), "hello");
    }

    #[test]
    fn multibyte_torn_across_feeds_reassembles() {
        let mut decoder = Utf8Decoder::new();
        let bytes = "héllo🚽".as_bytes();
        for split in 1..bytes.len() {
            let mut decoder2 = Utf8Decoder::new();
            let mut out = String::new();
            decoder2.decode(&bytes[..split], &mut out);
            decoder2.decode(&bytes[split..], &mut out);
            assert_eq!(out, "héllo🚽", "split at byte {}", split);
        }
        assert_eq!(decode_all(&mut decoder, bytes), "héllo🚽");
    }

    #[test]
    fn invalid_bytes_become_replacement() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decode_all(&mut decoder, b"a\xFFb"), "a\u{FFFD}b");
        assert_eq!(decode_all(&mut decoder, b"\x80"), "\u{FFFD}");
    }

    #[test]
    fn truncated_sequence_substitutes_and_recovers() {
        let mut decoder = Utf8Decoder::new();
        // 0xE2 expects two continuations; 'x' interrupts it.
        assert_eq!(decode_all(&mut decoder, b"\xE2x"), "\u{FFFD}x");
    }

    #[test]
    fn overlong_encoding_rejected() {
        let mut decoder = Utf8Decoder::new();
        // Overlong NUL (0xC0 0x80)
        let out = decode_all(&mut decoder, b"\xC0\x80");
        assert!(out.chars().all(|c| c == '\u{FFFD}'));
    }
}
