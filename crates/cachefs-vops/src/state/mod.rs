//! Collaborating subsystems behind the control files.
//!
//! The control plane only reads and writes these through getters, setters
//! and [`Dispatcher`](crate::descriptor::Dispatcher)s.

mod cache;
mod journal;
mod metadata;
mod transfer;

use std::sync::Arc;

pub use cache::CacheSettings;
pub(crate) use cache::{check_file_thread_interval, check_file_ttl, check_non_negative};
pub use journal::{
    Journal, JournalApplier, JournalApply, JournalDrop, JournalDump, JournalEntry, JournalOp,
    LogApplier,
};
pub use metadata::{
    LocalSource, MetadataCache, MetadataDump, MetadataEntry, MetadataFill, MetadataFlush,
    MetadataSource, NoSource,
};
pub use transfer::{Transfer, TransferDump, TransferQueue};

use crate::settings::Settings;

/// Handles to every subsystem the standard registry wires up.
#[derive(Clone)]
pub struct Collaborators {
    pub settings: Arc<CacheSettings>,
    pub journal: Arc<Journal>,
    pub applier: Arc<dyn JournalApplier>,
    pub transfers: Arc<TransferQueue>,
    pub metadata: Arc<MetadataCache>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl Collaborators {
    /// Fresh subsystems seeded from `settings`.
    ///
    /// Metadata fills read from `backing_root` when one is configured.
    pub fn from_settings(settings: &Settings) -> Self {
        let source: Arc<dyn MetadataSource> = match &settings.backing_root {
            Some(root) => Arc::new(LocalSource::new(root)),
            None => Arc::new(NoSource),
        };
        Self {
            settings: Arc::new(CacheSettings::from_settings(settings)),
            journal: Arc::new(Journal::new()),
            applier: Arc::new(LogApplier),
            transfers: Arc::new(TransferQueue::new()),
            metadata: Arc::new(MetadataCache::new(source)),
        }
    }

    /// Replace the journal applier.
    pub fn with_applier(mut self, applier: Arc<dyn JournalApplier>) -> Self {
        self.applier = applier;
        self
    }
}
