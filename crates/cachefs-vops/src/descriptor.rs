//! Accessor descriptors: one per virtual file.
//!
//! A descriptor names a virtual file and declares exactly one behavior
//! shape. The shapes are a closed enum so the render and parse engines
//! dispatch by exhaustive match.

use std::fmt;
use std::sync::Arc;

use strum::Display;

use crate::buffer::ContentBuffer;
use crate::error::{VopsError, VopsResult};
use crate::tables::Modal;

/// Reads the current integer value.
pub type IntGetter = Box<dyn Fn() -> i64 + Send + Sync>;
/// Applies a decoded integer value. May refuse out-of-range input.
pub type IntSetter = Box<dyn Fn(i64) -> VopsResult<()> + Send + Sync>;
/// Reads the current index into a symbol table.
pub type IndexGetter = Box<dyn Fn() -> usize + Send + Sync>;
/// Applies a validated index into a symbol table.
pub type IndexSetter = Box<dyn Fn(usize) -> VopsResult<()> + Send + Sync>;

/// A collaborating subsystem that owns the content of a virtual file.
///
/// The control plane hands over an empty buffer and does no formatting of
/// its own. Writes, if the collaborator accepts any, are delivered to
/// [`Dispatcher::commit`] by the session layer; the parse engine never
/// touches them.
pub trait Dispatcher: Send + Sync {
    /// Fill `buf` with the file's content.
    fn render(&self, buf: &mut ContentBuffer) -> VopsResult<()>;

    /// Whether this file takes writes.
    fn accepts_writes(&self) -> bool {
        false
    }

    /// Handle the bytes written to `file` before close.
    fn commit(&self, file: &str, raw: &[u8]) -> VopsResult<()> {
        let _ = raw;
        Err(VopsError::NotWritable(file.to_string()))
    }
}

/// Behavior shape of a virtual file.
pub enum Accessor {
    /// Integer setting rendered as `<n>\n`.
    Numeric { get: IntGetter, set: IntSetter },
    /// Modal setting rendered as a menu with the active symbol bracketed.
    Enumerated {
        get: IndexGetter,
        set: IndexSetter,
        symbols: &'static [&'static str],
    },
    /// Content delegated to a collaborator.
    External(Arc<dyn Dispatcher>),
}

/// Accessor shape without its callbacks, for logging and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AccessorKind {
    Numeric,
    Enumerated,
    External,
}

/// A registry entry: the name of one virtual file and its accessor.
pub struct Descriptor {
    name: &'static str,
    accessor: Accessor,
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Descriptor");
        s.field("name", &self.name).field("kind", &self.kind());
        if let Accessor::Enumerated { symbols, .. } = &self.accessor {
            s.field("symbols", symbols);
        }
        s.finish()
    }
}

impl Descriptor {
    /// Integer setting.
    pub fn numeric(
        name: &'static str,
        get: impl Fn() -> i64 + Send + Sync + 'static,
        set: impl Fn(i64) -> VopsResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            accessor: Accessor::Numeric {
                get: Box::new(get),
                set: Box::new(set),
            },
        }
    }

    /// Modal setting over an explicit symbol table.
    pub fn enumerated(
        name: &'static str,
        symbols: &'static [&'static str],
        get: impl Fn() -> usize + Send + Sync + 'static,
        set: impl Fn(usize) -> VopsResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            accessor: Accessor::Enumerated {
                get: Box::new(get),
                set: Box::new(set),
                symbols,
            },
        }
    }

    /// Modal setting over a [`Modal`] enum's table.
    pub fn modal<M: Modal>(
        name: &'static str,
        get: impl Fn() -> M + Send + Sync + 'static,
        set: impl Fn(M) -> VopsResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self::enumerated(
            name,
            M::SYMBOLS,
            move || get().index(),
            move |index| match M::from_index(index) {
                Some(value) => set(value),
                None => Err(VopsError::rejected(name, format!("index {index} out of range"))),
            },
        )
    }

    /// Content owned by a collaborator.
    pub fn external(name: &'static str, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            name,
            accessor: Accessor::External(dispatcher),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    pub fn kind(&self) -> AccessorKind {
        match self.accessor {
            Accessor::Numeric { .. } => AccessorKind::Numeric,
            Accessor::Enumerated { .. } => AccessorKind::Enumerated,
            Accessor::External(_) => AccessorKind::External,
        }
    }

    /// Whether a write to this file can have any effect.
    pub fn writable(&self) -> bool {
        match &self.accessor {
            Accessor::Numeric { .. } | Accessor::Enumerated { .. } => true,
            Accessor::External(dispatcher) => dispatcher.accepts_writes(),
        }
    }
}
