//! Enumerated-value tables for modal settings.
//!
//! The position of a symbol in its table is the index exchanged with
//! getters and setters, so variant order here is wire-visible.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, FromRepr, VariantNames};

/// A modal setting backed by a fixed, ordered symbol table.
pub trait Modal: Copy + Send + Sync + 'static {
    /// All symbols, in index order.
    const SYMBOLS: &'static [&'static str];

    /// Position of this value in [`Modal::SYMBOLS`].
    fn index(self) -> usize;

    /// Value at `index`, if in range.
    fn from_index(index: usize) -> Option<Self>;
}

/// How reads are served.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
    EnumString, Display, AsRefStr, VariantNames, FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReadState {
    /// Serve from cache, fetching from backing on miss.
    #[default]
    Normal,
    /// Cache is full; misses are served from backing without caching.
    Full,
    /// Backing is off limits; only cached content is served.
    Handsup,
    /// Bypass the cache entirely.
    Nocache,
    /// Shutting down.
    Quitting,
}

impl Modal for ReadState {
    const SYMBOLS: &'static [&'static str] = <Self as VariantNames>::VARIANTS;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::from_repr(index)
    }
}

/// How writes reach the backing filesystem.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
    EnumString, Display, AsRefStr, VariantNames, FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WriteState {
    /// Writes go to the cache and are journaled.
    #[default]
    Cache,
    /// Journal is being replayed onto backing.
    Flush,
    /// Writes go straight through to backing.
    Force,
}

impl Modal for WriteState {
    const SYMBOLS: &'static [&'static str] = <Self as VariantNames>::VARIANTS;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::from_repr(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_read_state_table_order() {
        assert_eq!(
            ReadState::SYMBOLS,
            &["normal", "full", "handsup", "nocache", "quitting"]
        );
        assert_eq!(ReadState::Handsup.index(), 2);
        assert_eq!(ReadState::from_index(4), Some(ReadState::Quitting));
        assert_eq!(ReadState::from_index(5), None);
    }

    #[test]
    fn test_write_state_table_order() {
        assert_eq!(WriteState::SYMBOLS, &["cache", "flush", "force"]);
        assert_eq!(WriteState::from_index(1), Some(WriteState::Flush));
    }

    #[test]
    fn test_symbols_match_display() {
        for (i, sym) in ReadState::SYMBOLS.iter().enumerate() {
            let state = ReadState::from_index(i).unwrap();
            assert_eq!(state.to_string(), *sym);
            assert_eq!(ReadState::from_str(sym).unwrap(), state);
        }
    }
}
