//! SSE record splitting
//!
//! Model providers stream responses as newline-delimited `data: ` records.
//! A single network read may end mid-record, so the splitter buffers the
//! trailing fragment and prepends it to the next read before re-splitting.
//! Feeding the same logical byte stream with different chunk boundaries
//! yields an identical record sequence.

/// Terminal sentinel used by OpenAI-style streams
pub const DONE_SENTINEL: &str = "[DONE]";

/// Accumulates raw bytes and emits complete `data: ` payloads.
///
/// The buffer holds bytes, not text: a chunk boundary may fall inside a
/// multi-byte UTF-8 character, so decoding happens only on complete lines.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_from(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        line.strip_prefix("data:")
            .map(|payload| payload.trim_start().to_string())
    }

    /// Feed one network chunk; returns the payloads of every complete
    /// `data: ` record it finished. Non-data lines (comments, `event:`,
    /// blanks) are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..pos + 1).collect();
            if let Some(payload) = Self::record_from(&line[..line.len() - 1]) {
                records.push(payload);
            }
        }
        records
    }

    /// Flush a final unterminated line at end of transport, if any
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        Self::record_from(&line)
    }
}
