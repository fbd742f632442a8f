//! Backing-to-cache transfer queue.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::ContentBuffer;
use crate::descriptor::Dispatcher;
use crate::error::VopsResult;
use crate::state::CacheSettings;

/// A file being copied from backing into the cache.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub path: String,
    pub size: u64,
    pub transferred: u64,
    pub started: Instant,
}

impl Transfer {
    /// Completed share, 0..=100.
    pub fn percent(&self) -> u64 {
        if self.size == 0 {
            100
        } else {
            self.transferred.min(self.size) * 100 / self.size
        }
    }
}

/// Pending transfers in submission order.
#[derive(Debug, Default)]
pub struct TransferQueue {
    pending: Mutex<Vec<Transfer>>,
}

impl TransferQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, path: impl Into<String>, size: u64) {
        let path = path.into();
        debug!(%path, size, "transfer queued");
        self.pending.lock().push(Transfer {
            path,
            size,
            transferred: 0,
            started: Instant::now(),
        });
    }

    /// Add `bytes` to the transfer of `path`. Returns false if not queued.
    pub fn progress(&self, path: &str, bytes: u64) -> bool {
        let mut pending = self.pending.lock();
        match pending.iter_mut().find(|t| t.path == path) {
            Some(t) => {
                t.transferred = t.transferred.saturating_add(bytes);
                true
            }
            None => false,
        }
    }

    /// Remove the transfer of `path`.
    pub fn complete(&self, path: &str) -> Option<Transfer> {
        let mut pending = self.pending.lock();
        let pos = pending.iter().position(|t| t.path == path)?;
        Some(pending.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Rate limit line followed by one line per transfer.
    pub fn dump(&self, out: &mut impl Write, max_rate: i64) -> std::fmt::Result {
        let pending = self.pending.lock();
        writeln!(out, "max_rate {max_rate} pending {}", pending.len())?;
        for t in pending.iter() {
            writeln!(
                out,
                "{} {}/{} {}% {}s",
                t.path,
                t.transferred,
                t.size,
                t.percent(),
                t.started.elapsed().as_secs()
            )?;
        }
        Ok(())
    }
}

/// `transfer`: queue state and current rate limit.
pub struct TransferDump {
    queue: Arc<TransferQueue>,
    settings: Arc<CacheSettings>,
}

impl TransferDump {
    pub fn new(queue: Arc<TransferQueue>, settings: Arc<CacheSettings>) -> Self {
        Self { queue, settings }
    }
}

impl Dispatcher for TransferDump {
    fn render(&self, buf: &mut ContentBuffer) -> VopsResult<()> {
        self.queue.dump(buf, self.settings.transfer_max_rate())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_lifecycle() {
        let q = TransferQueue::new();
        q.enqueue("/a.bin", 1000);
        q.enqueue("/b.bin", 0);
        assert_eq!(q.len(), 2);

        assert!(q.progress("/a.bin", 250));
        assert!(!q.progress("/missing", 1));

        let done = q.complete("/b.bin").unwrap();
        assert_eq!(done.percent(), 100);
        assert!(q.complete("/b.bin").is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_dump() {
        let q = TransferQueue::new();
        q.enqueue("/a.bin", 1000);
        q.progress("/a.bin", 500);

        let mut out = String::new();
        q.dump(&mut out, 4096).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("max_rate 4096 pending 1"));
        assert!(lines.next().unwrap().starts_with("/a.bin 500/1000 50% "));
        assert_eq!(lines.next(), None);
    }
}
