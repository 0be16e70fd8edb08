//! Reassembles lines from arbitrarily split byte chunks

/// Accumulates bytes until a full `\n`-terminated line is available.
///
/// Splitting happens on raw bytes so a multi-byte UTF-8 character cut in half
/// by the transport is only decoded once both halves have arrived.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed (without `\n`/`\r\n`)
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(Self::to_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);

        lines
    }

    /// Flush whatever is left once the transport closes
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(Self::to_line(&rest))
    }

    /// Bytes held back waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn to_line(bytes: &[u8]) -> String {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}
