//! # cachefs-vops
//!
//! Virtual control files for the cachefs caching overlay filesystem.
//!
//! A handful of pseudo-files under a reserved directory (`/.cachefs` by
//! default) expose the cache's runtime state as text:
//! - Reading a setting renders its current value, or a menu of choices with
//!   the active one bracketed.
//! - Writing a setting parses the text and applies it through a validated
//!   setter when the file is closed.
//! - Dump files render collaborator state (journal, transfers, metadata).
//! - Action files trigger a collaborator operation on a magic word.
//!
//! ```text
//! $ cat /mnt/.cachefs/read_state
//! [normal] full handsup nocache quitting
//! $ echo full > /mnt/.cachefs/read_state
//! ```

pub mod buffer;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod state;
pub mod tables;
pub mod vfs;

use std::sync::Arc;

pub use buffer::{BufferState, ContentBuffer};
pub use codec::{ParseOutcome, RenderOutcome, parse, render};
pub use descriptor::{Accessor, AccessorKind, Descriptor, Dispatcher};
pub use error::{VopsError, VopsResult};
pub use registry::Registry;
pub use resolver::{DEFAULT_PREFIX, Resolver};
pub use settings::{ErrorPolicy, Settings, SettingsError};
pub use state::{CacheSettings, Collaborators, Journal, MetadataCache, TransferQueue};
pub use tables::{Modal, ReadState, WriteState};
pub use vfs::{DirEntry, FileAttr, FileType, OpenFlags, VfsError, VfsResult, VirtualDir};

/// Everything needed to serve the virtual directory, wired together.
pub struct ControlPlane {
    collaborators: Collaborators,
    dir: VirtualDir,
}

impl ControlPlane {
    /// Build fresh collaborators from `settings` and the standard registry.
    pub fn new(settings: &Settings) -> VopsResult<Self> {
        Self::with_collaborators(settings, Collaborators::from_settings(settings))
    }

    /// Serve the standard registry over existing collaborators.
    pub fn with_collaborators(
        settings: &Settings,
        collaborators: Collaborators,
    ) -> VopsResult<Self> {
        let registry = Arc::new(Registry::standard(&collaborators)?);
        let resolver = Resolver::new(&settings.prefix, registry);
        tracing::info!(
            prefix = resolver.prefix(),
            files = resolver.registry().len(),
            policy = ?settings.error_policy,
            "control plane ready"
        );
        Ok(Self {
            collaborators,
            dir: VirtualDir::new(resolver, settings.error_policy),
        })
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn dir(&self) -> &VirtualDir {
        &self.dir
    }

    pub fn registry(&self) -> &Registry {
        self.dir.resolver().registry()
    }
}
