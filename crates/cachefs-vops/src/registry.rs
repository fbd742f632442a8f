//! Accessor registry: the closed table of virtual files.
//!
//! Built once before the filesystem starts serving requests and never
//! mutated afterwards. The name list used for directory listings is
//! computed in the constructor, so readers only ever see a complete list.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::Descriptor;
use crate::error::{VopsError, VopsResult};
use crate::state::{
    Collaborators, JournalApply, JournalDrop, JournalDump, MetadataDump, MetadataFill,
    MetadataFlush, TransferDump,
};

/// Immutable, ordered set of descriptors keyed by file name.
#[derive(Debug)]
pub struct Registry {
    descriptors: Vec<Descriptor>,
    index: HashMap<&'static str, usize>,
    names: Vec<&'static str>,
}

impl Registry {
    /// Build a registry from descriptors, preserving their order.
    ///
    /// Fails if two descriptors share a name.
    pub fn new(descriptors: Vec<Descriptor>) -> VopsResult<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        let mut names = Vec::with_capacity(descriptors.len());

        for (i, descriptor) in descriptors.iter().enumerate() {
            let name = descriptor.name();
            if index.insert(name, i).is_some() {
                return Err(VopsError::DuplicateName(name.to_string()));
            }
            debug!(name, kind = %descriptor.kind(), "defined virtual file");
            names.push(name);
        }

        Ok(Self {
            descriptors,
            index,
            names,
        })
    }

    /// The production table wired to the given collaborators.
    pub fn standard(c: &Collaborators) -> VopsResult<Self> {
        let s = &c.settings;
        let descriptors = vec![
            Descriptor::modal(
                "read_state",
                {
                    let s = Arc::clone(s);
                    move || s.read_state()
                },
                {
                    let s = Arc::clone(s);
                    move |v| s.set_read_state(v)
                },
            ),
            Descriptor::modal(
                "write_state",
                {
                    let s = Arc::clone(s);
                    move || s.write_state()
                },
                {
                    let s = Arc::clone(s);
                    move |v| s.set_write_state(v)
                },
            ),
            Descriptor::numeric(
                "file_thread_interval",
                {
                    let s = Arc::clone(s);
                    move || s.file_thread_interval()
                },
                {
                    let s = Arc::clone(s);
                    move |v| s.set_file_thread_interval(v)
                },
            ),
            Descriptor::numeric(
                "file_ttl",
                {
                    let s = Arc::clone(s);
                    move || s.file_ttl()
                },
                {
                    let s = Arc::clone(s);
                    move |v| s.set_file_ttl(v)
                },
            ),
            Descriptor::numeric(
                "metadata_ttl",
                {
                    let s = Arc::clone(s);
                    move || s.metadata_ttl()
                },
                {
                    let s = Arc::clone(s);
                    move |v| s.set_metadata_ttl(v)
                },
            ),
            Descriptor::numeric(
                "transfer_max_rate",
                {
                    let s = Arc::clone(s);
                    move || s.transfer_max_rate()
                },
                {
                    let s = Arc::clone(s);
                    move |v| s.set_transfer_max_rate(v)
                },
            ),
            Descriptor::external(
                "transfer",
                Arc::new(TransferDump::new(Arc::clone(&c.transfers), Arc::clone(s))),
            ),
            Descriptor::external("journal", Arc::new(JournalDump::new(Arc::clone(&c.journal)))),
            Descriptor::external(
                "apply_journal",
                Arc::new(JournalApply::new(Arc::clone(&c.journal), Arc::clone(&c.applier))),
            ),
            Descriptor::external("drop_journal", Arc::new(JournalDrop::new(Arc::clone(&c.journal)))),
            Descriptor::external("metadata", Arc::new(MetadataDump::new(Arc::clone(&c.metadata)))),
            Descriptor::external(
                "metadata_flush",
                Arc::new(MetadataFlush::new(Arc::clone(&c.metadata))),
            ),
            Descriptor::external(
                "metadata_fill",
                Arc::new(MetadataFill::new(Arc::clone(&c.metadata))),
            ),
        ];

        Self::new(descriptors)
    }

    /// Exact-match lookup by bare file name.
    pub fn find(&self, name: &str) -> Option<&Descriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// All registered names, in registration order.
    pub fn list_names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
