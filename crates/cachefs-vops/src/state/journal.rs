//! Write-back journal and its control files.
//!
//! While the write state is `cache`, mutations land in the cache and are
//! recorded here. `apply_journal` replays them onto the backing filesystem;
//! `drop_journal` forgets them.

use std::collections::VecDeque;
use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;
use strum::{Display, EnumString};
use tracing::{info, warn};

use crate::buffer::ContentBuffer;
use crate::codec::payload;
use crate::descriptor::Dispatcher;
use crate::error::{VopsError, VopsResult};

/// Kind of journaled mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum JournalOp {
    Mknod,
    Mkdir,
    Unlink,
    Rmdir,
    Rename,
    Chmod,
    Chown,
    Truncate,
    Utimens,
    Symlink,
    Link,
}

/// One pending mutation.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub seq: u64,
    pub op: JournalOp,
    pub path: String,
    /// Operation argument: rename target, mode, size, link target.
    pub detail: Option<String>,
    pub recorded: SystemTime,
}

/// Replays journal entries onto the backing filesystem.
pub trait JournalApplier: Send + Sync {
    fn apply(&self, entry: &JournalEntry) -> VopsResult<()>;
}

/// Applier used when no backing writer is wired in: logs and accepts.
#[derive(Debug, Default)]
pub struct LogApplier;

impl JournalApplier for LogApplier {
    fn apply(&self, entry: &JournalEntry) -> VopsResult<()> {
        info!(seq = entry.seq, op = %entry.op, path = %entry.path, "journal entry applied");
        Ok(())
    }
}

/// Ordered list of pending mutations.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<VecDeque<JournalEntry>>,
    next_seq: AtomicU64,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; returns its sequence number.
    pub fn record(&self, op: JournalOp, path: impl Into<String>, detail: Option<String>) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push_back(JournalEntry {
            seq,
            op,
            path: path.into(),
            detail,
            recorded: SystemTime::now(),
        });
        seq
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<JournalEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// `pending N` header, then one line per entry: `seq op path [detail]`.
    pub fn dump(&self, out: &mut impl Write) -> std::fmt::Result {
        let entries = self.entries.lock();
        writeln!(out, "pending {}", entries.len())?;
        for entry in entries.iter() {
            write!(out, "{} {} {}", entry.seq, entry.op, entry.path)?;
            if let Some(detail) = &entry.detail {
                write!(out, " {detail}")?;
            }
            out.write_char('\n')?;
        }
        Ok(())
    }

    /// Replay entries in order, removing each once applied.
    ///
    /// Stops at the first failure; the failing entry and everything after it
    /// stay in the journal.
    pub fn apply(&self, applier: &dyn JournalApplier) -> VopsResult<usize> {
        let mut entries = self.entries.lock();
        let mut applied = 0;
        while let Some(entry) = entries.front() {
            if let Err(e) = applier.apply(entry) {
                warn!(seq = entry.seq, path = %entry.path, "journal apply stopped: {e}");
                return Err(VopsError::action(
                    "apply_journal",
                    format!("entry {} ({} {}): {e}", entry.seq, entry.op, entry.path),
                ));
            }
            entries.pop_front();
            applied += 1;
        }
        Ok(applied)
    }

    /// Discard every pending entry; returns how many were dropped.
    pub fn drop_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let n = entries.len();
        entries.clear();
        n
    }
}

/// `journal`: pending entries.
pub struct JournalDump {
    journal: Arc<Journal>,
}

impl JournalDump {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }
}

impl Dispatcher for JournalDump {
    fn render(&self, buf: &mut ContentBuffer) -> VopsResult<()> {
        self.journal.dump(buf)?;
        Ok(())
    }
}

/// `apply_journal`: write `apply` to replay the journal.
pub struct JournalApply {
    journal: Arc<Journal>,
    applier: Arc<dyn JournalApplier>,
}

impl JournalApply {
    pub fn new(journal: Arc<Journal>, applier: Arc<dyn JournalApplier>) -> Self {
        Self { journal, applier }
    }
}

impl Dispatcher for JournalApply {
    fn render(&self, buf: &mut ContentBuffer) -> VopsResult<()> {
        writeln!(buf, "Write 'apply' to replay {} journal entries.", self.journal.len())?;
        Ok(())
    }

    fn accepts_writes(&self) -> bool {
        true
    }

    fn commit(&self, file: &str, raw: &[u8]) -> VopsResult<()> {
        expect_word(file, raw, b"apply")?;
        let applied = self.journal.apply(self.applier.as_ref())?;
        info!(applied, "journal applied");
        Ok(())
    }
}

/// `drop_journal`: write `drop` to discard the journal.
pub struct JournalDrop {
    journal: Arc<Journal>,
}

impl JournalDrop {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }
}

impl Dispatcher for JournalDrop {
    fn render(&self, buf: &mut ContentBuffer) -> VopsResult<()> {
        writeln!(buf, "Write 'drop' to discard {} journal entries.", self.journal.len())?;
        Ok(())
    }

    fn accepts_writes(&self) -> bool {
        true
    }

    fn commit(&self, file: &str, raw: &[u8]) -> VopsResult<()> {
        expect_word(file, raw, b"drop")?;
        let dropped = self.journal.drop_all();
        warn!(dropped, "journal dropped");
        Ok(())
    }
}

fn expect_word(file: &str, raw: &[u8], word: &[u8]) -> VopsResult<()> {
    let got = payload(raw);
    if got == word {
        Ok(())
    } else {
        Err(VopsError::rejected(
            file,
            format!(
                "expected '{}', got '{}'",
                String::from_utf8_lossy(word),
                String::from_utf8_lossy(got)
            ),
        ))
    }
}
