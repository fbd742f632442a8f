//! Per-open-file content buffer.

use std::fmt;

/// Lifecycle of a [`ContentBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Freshly opened; nothing rendered yet.
    Empty,
    /// Rendered once; content is frozen for this open instance.
    Populated,
    /// Owning handle closed; bytes freed.
    Released,
}

/// Text cache owned by one open instance of a virtual file.
///
/// Populated at most once. A fresh open gets a fresh buffer; there is no
/// way back to [`BufferState::Empty`].
#[derive(Debug)]
pub struct ContentBuffer {
    data: Vec<u8>,
    state: BufferState,
}

impl Default for ContentBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            state: BufferState::Empty,
        }
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    /// True while nothing has been rendered into the buffer.
    pub fn is_empty(&self) -> bool {
        self.state == BufferState::Empty && self.data.is_empty()
    }

    /// Logical size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Append raw bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Read up to `size` bytes starting at `offset`.
    ///
    /// Returns fewer bytes at the end of the content.
    pub fn slice(&self, offset: u64, size: u32) -> &[u8] {
        let start = (offset as usize).min(self.data.len());
        let end = start.saturating_add(size as usize).min(self.data.len());
        &self.data[start..end]
    }

    /// Mark the content as built. Called by the render engine.
    pub(crate) fn mark_populated(&mut self) {
        if self.state == BufferState::Empty {
            self.state = BufferState::Populated;
        }
    }

    /// Free the content. Called when the owning handle closes.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.state = BufferState::Released;
    }
}

impl fmt::Write for ContentBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.data.extend_from_slice(s.as_bytes());
        Ok(())
    }
}
