/// Accumulates content fragments for one stream session.
///
/// Single-writer: only the owning session appends, in event-arrival order.
/// The buffer value is what the renderer stabilizes; it is never mutated by
/// stabilization.
#[derive(Debug, Default, Clone)]
pub struct IncrementalBuffer {
    value: String,
}

impl IncrementalBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenate a fragment and return the new full value.
    pub fn append(&mut self, fragment: &str) -> &str {
        self.value.push_str(fragment);
        &self.value
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn reset(&mut self) {
        self.value.clear();
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Consume the buffer, yielding the accumulated string.
    pub fn into_value(self) -> String {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_running_value() {
        let mut buffer = IncrementalBuffer::new();
        assert_eq!(buffer.append("He"), "He");
        assert_eq!(buffer.append("llo"), "Hello");
        assert_eq!(buffer.value(), "Hello");
    }

    #[test]
    fn concatenation_is_chunking_invariant() {
        let fragments_a = ["Hello, ", "world!"];
        let fragments_b = ["H", "ello", ", wor", "ld", "!"];

        let mut a = IncrementalBuffer::new();
        for f in fragments_a {
            a.append(f);
        }
        let mut b = IncrementalBuffer::new();
        for f in fragments_b {
            b.append(f);
        }
        assert_eq!(a.value(), b.value());
    }

    #[test]
    fn reset_clears_value() {
        let mut buffer = IncrementalBuffer::new();
        buffer.append("data");
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }
}
