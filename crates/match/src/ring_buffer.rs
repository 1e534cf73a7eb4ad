//! Fixed-capacity byte ring used as the chunk index's sliding window.
//!
//! The index streams a file one byte at a time. Once the window is full each
//! push evicts the oldest byte, which is exactly the `outgoing` byte the
//! rolling checksum needs. A contiguous view is only required when the
//! checksum is seeded, so [`RingBuffer::as_slice`] may rotate in place.

/// Fixed-capacity FIFO of bytes.
#[derive(Clone, Debug)]
pub(crate) struct RingBuffer {
    buffer: Vec<u8>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Creates an empty ring holding at most `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            buffer: vec![0u8; capacity],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.buffer.len()
    }

    /// Appends `byte`, returning the evicted byte when the ring was full.
    #[inline]
    pub(crate) fn push_back(&mut self, byte: u8) -> Option<u8> {
        let capacity = self.buffer.len();
        if self.len < capacity {
            let pos = (self.head + self.len) % capacity;
            self.buffer[pos] = byte;
            self.len += 1;
            None
        } else {
            let outgoing = self.buffer[self.head];
            self.buffer[self.head] = byte;
            self.head = (self.head + 1) % capacity;
            Some(outgoing)
        }
    }

    /// Contents in insertion order, rotating the storage if it has wrapped.
    pub(crate) fn as_slice(&mut self) -> &[u8] {
        let end = self.head + self.len;
        if end <= self.buffer.len() {
            return &self.buffer[self.head..end];
        }
        self.buffer.rotate_left(self.head);
        self.head = 0;
        &self.buffer[..self.len]
    }
}
