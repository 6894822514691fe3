/// Incremental UTF-8 decoder that splits a byte stream into lines.
///
/// Bytes of a character split across two chunks are held back until the rest
/// arrives, so a multi-byte character is never corrupted at a chunk boundary.
/// Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    buffer: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every line it completed, without the
    /// trailing `\n` (or `\r\n`).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Flushes whatever is left once the byte stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.buffer.push(char::REPLACEMENT_CHARACTER);
        }
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.buffer);
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    fn decode(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut rest = &bytes[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // incomplete sequence at the end of the chunk
                            self.pending = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}
