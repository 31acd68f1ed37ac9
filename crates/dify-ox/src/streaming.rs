//! Incremental framing for `text/event-stream` response bodies.
//!
//! The framer is transport-agnostic: it is driven by [`SseFramer::feed`] with
//! whatever byte chunks the network hands over and returns the records that
//! became complete, keeping any trailing partial record buffered until more
//! bytes arrive. Once the byte stream ends, [`SseFramer::finish`] flushes the
//! remnant as a best-effort final record.

/// Accumulates raw bytes and frames them into SSE records.
///
/// Lines are only decoded once their terminating newline has arrived, so a
/// multi-byte UTF-8 character split across two reads is reassembled before
/// decoding instead of being corrupted per-chunk.
#[derive(Debug, Default)]
pub struct SseFramer {
    /// Bytes received but not yet terminated by a newline.
    buffer: Vec<u8>,
    /// `data` payloads of the record currently being accumulated.
    data: Vec<String>,
    /// Set once `finish` has drained the framer.
    ended: bool,
}

/// One complete record: the `data` payloads it carried, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRecord {
    data: Vec<String>,
}

impl SseRecord {
    /// The record's `data` payloads, prefix-stripped and trimmed.
    ///
    /// A record may legally carry several `data` lines; each is exposed as an
    /// independent payload, preserving order.
    pub fn data_payloads(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(String::as_str)
    }
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of bytes, returning every record it completed.
    ///
    /// Empty `data` payloads and comment lines are dropped; other field lines
    /// (`event:`, `id:`, `retry:`) carry nothing this client consumes and are
    /// skipped. A record with no payloads is not emitted.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseRecord> {
        debug_assert!(!self.ended, "feed after finish");
        self.buffer.extend_from_slice(bytes);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                // Blank line terminates the current record.
                if !self.data.is_empty() {
                    records.push(SseRecord {
                        data: std::mem::take(&mut self.data),
                    });
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            if let Some(rest) = line.strip_prefix("data:") {
                let payload = rest.trim();
                if !payload.is_empty() {
                    self.data.push(payload.to_string());
                }
            }
        }

        records
    }

    /// Flush whatever is still buffered once the byte stream has ended.
    ///
    /// The remnant is at most one unterminated line plus the payloads of an
    /// unterminated record. The line is prefix-stripped if it carries a
    /// `data:` field and otherwise taken verbatim, matching the tail handling
    /// of peers that close the connection without a final blank line.
    pub fn finish(&mut self) -> Option<SseRecord> {
        self.ended = true;

        if !self.buffer.is_empty() {
            let tail_bytes = std::mem::take(&mut self.buffer);
            let tail = String::from_utf8_lossy(&tail_bytes);
            let payload = tail
                .strip_prefix("data:")
                .unwrap_or(&tail)
                .trim()
                .to_string();
            if !payload.is_empty() && !payload.starts_with(':') {
                self.data.push(payload);
            }
        }

        if self.data.is_empty() {
            None
        } else {
            Some(SseRecord {
                data: std::mem::take(&mut self.data),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(record: &SseRecord) -> Vec<&str> {
        record.data_payloads().collect()
    }

    #[test]
    fn frames_complete_record() {
        let mut framer = SseFramer::new();
        let records = framer.feed(b"data: {\"answer\":\"hi\"}\n\n");
        assert_eq!(records.len(), 1);
        assert_eq!(payloads(&records[0]), vec!["{\"answer\":\"hi\"}"]);
    }

    #[test]
    fn reassembles_record_split_across_reads() {
        let mut framer = SseFramer::new();
        assert!(framer.feed(b"data: {\"answer\":").is_empty());
        assert!(framer.feed(b"\"hello\"}").is_empty());
        let records = framer.feed(b"\n\n");
        assert_eq!(records.len(), 1);
        assert_eq!(payloads(&records[0]), vec!["{\"answer\":\"hello\"}"]);
    }

    #[test]
    fn reassembles_multibyte_character_split_across_reads() {
        let mut framer = SseFramer::new();
        let full = "data: {\"answer\":\"caf\u{e9}\"}\n\n".as_bytes();
        // Split in the middle of the two-byte encoding of U+00E9.
        let split = full.len() - 5;
        assert_eq!(&full[split - 1..=split], "\u{e9}".as_bytes());

        assert!(framer.feed(&full[..split]).is_empty());
        let records = framer.feed(&full[split..]);
        assert_eq!(records.len(), 1);
        assert_eq!(payloads(&records[0]), vec!["{\"answer\":\"caf\u{e9}\"}"]);
    }

    #[test]
    fn keeps_multiple_data_lines_independent_and_ordered() {
        let mut framer = SseFramer::new();
        let records = framer.feed(b"data: first\ndata: second\n\n");
        assert_eq!(records.len(), 1);
        assert_eq!(payloads(&records[0]), vec!["first", "second"]);
    }

    #[test]
    fn skips_empty_payloads_comments_and_other_fields() {
        let mut framer = SseFramer::new();
        let records = framer.feed(b"event: message\nid: 7\n: keepalive\ndata:\ndata: kept\n\n");
        assert_eq!(records.len(), 1);
        assert_eq!(payloads(&records[0]), vec!["kept"]);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut framer = SseFramer::new();
        let records = framer.feed(b"data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(records.len(), 2);
        assert_eq!(payloads(&records[0]), vec!["one"]);
        assert_eq!(payloads(&records[1]), vec!["two"]);
    }

    #[test]
    fn frames_several_records_from_one_chunk() {
        let mut framer = SseFramer::new();
        let records = framer.feed(b"data: a\n\ndata: b\n\ndata: c\n\n");
        assert_eq!(records.len(), 3);
        assert_eq!(payloads(&records[1]), vec!["b"]);
    }

    #[test]
    fn finish_flushes_unterminated_data_line() {
        let mut framer = SseFramer::new();
        assert!(framer.feed(b"data: {\"answer\":\"tail\"}").is_empty());
        let record = framer.finish().expect("trailing record");
        assert_eq!(payloads(&record), vec!["{\"answer\":\"tail\"}"]);
    }

    #[test]
    fn finish_strips_data_prefix_from_remnant_only_when_present() {
        let mut framer = SseFramer::new();
        assert!(framer.feed(b"{\"answer\":\"bare\"}").is_empty());
        let record = framer.finish().expect("trailing record");
        assert_eq!(payloads(&record), vec!["{\"answer\":\"bare\"}"]);
    }

    #[test]
    fn finish_combines_buffered_payloads_with_remnant() {
        let mut framer = SseFramer::new();
        assert!(framer.feed(b"data: done\ndata: almo").is_empty());
        let record = framer.finish().expect("trailing record");
        assert_eq!(payloads(&record), vec!["done", "almo"]);
    }

    #[test]
    fn finish_is_none_when_nothing_buffered() {
        let mut framer = SseFramer::new();
        let records = framer.feed(b"data: a\n\n");
        assert_eq!(records.len(), 1);
        assert!(framer.finish().is_none());
    }
}
