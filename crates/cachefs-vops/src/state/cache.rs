//! Live cache settings.
//!
//! Plain atomics: each getter and setter is a single load or store, so
//! concurrent writers to one setting race at store granularity.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use tracing::info;

use crate::error::{VopsError, VopsResult};
use crate::settings::Settings;
use crate::tables::{Modal, ReadState, WriteState};

/// In-memory operational parameters of the cache.
#[derive(Debug)]
pub struct CacheSettings {
    read_state: AtomicUsize,
    write_state: AtomicUsize,
    file_thread_interval: AtomicI64,
    file_ttl: AtomicI64,
    max_file_ttl: i64,
    metadata_ttl: AtomicI64,
    transfer_max_rate: AtomicI64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl CacheSettings {
    /// Seed live values from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            read_state: AtomicUsize::new(settings.read_state.index()),
            write_state: AtomicUsize::new(settings.write_state.index()),
            file_thread_interval: AtomicI64::new(settings.file_thread_interval),
            file_ttl: AtomicI64::new(settings.file_ttl),
            max_file_ttl: settings.max_file_ttl,
            metadata_ttl: AtomicI64::new(settings.metadata_ttl),
            transfer_max_rate: AtomicI64::new(settings.transfer_max_rate),
        }
    }

    pub fn read_state(&self) -> ReadState {
        ReadState::from_index(self.read_state.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn set_read_state(&self, state: ReadState) -> VopsResult<()> {
        self.read_state.store(state.index(), Ordering::Release);
        info!(%state, "read state changed");
        Ok(())
    }

    pub fn write_state(&self) -> WriteState {
        WriteState::from_index(self.write_state.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn set_write_state(&self, state: WriteState) -> VopsResult<()> {
        self.write_state.store(state.index(), Ordering::Release);
        info!(%state, "write state changed");
        Ok(())
    }

    /// Seconds between passes of the file expiry thread.
    pub fn file_thread_interval(&self) -> i64 {
        self.file_thread_interval.load(Ordering::Acquire)
    }

    pub fn set_file_thread_interval(&self, secs: i64) -> VopsResult<()> {
        check_file_thread_interval(secs).map_err(|r| VopsError::rejected("file_thread_interval", r))?;
        self.file_thread_interval.store(secs, Ordering::Release);
        Ok(())
    }

    /// Seconds an unused cached file stays open.
    pub fn file_ttl(&self) -> i64 {
        self.file_ttl.load(Ordering::Acquire)
    }

    pub fn set_file_ttl(&self, secs: i64) -> VopsResult<()> {
        check_file_ttl(secs, self.max_file_ttl).map_err(|r| VopsError::rejected("file_ttl", r))?;
        self.file_ttl.store(secs, Ordering::Release);
        Ok(())
    }

    pub fn max_file_ttl(&self) -> i64 {
        self.max_file_ttl
    }

    /// Seconds a metadata entry stays valid.
    pub fn metadata_ttl(&self) -> i64 {
        self.metadata_ttl.load(Ordering::Acquire)
    }

    pub fn set_metadata_ttl(&self, secs: i64) -> VopsResult<()> {
        check_non_negative(secs).map_err(|r| VopsError::rejected("metadata_ttl", r))?;
        self.metadata_ttl.store(secs, Ordering::Release);
        Ok(())
    }

    /// Backing-to-cache transfer limit in bytes per second; 0 disables it.
    pub fn transfer_max_rate(&self) -> i64 {
        self.transfer_max_rate.load(Ordering::Acquire)
    }

    pub fn set_transfer_max_rate(&self, rate: i64) -> VopsResult<()> {
        check_non_negative(rate).map_err(|r| VopsError::rejected("transfer_max_rate", r))?;
        self.transfer_max_rate.store(rate, Ordering::Release);
        Ok(())
    }
}

pub(crate) fn check_file_thread_interval(secs: i64) -> Result<(), String> {
    if secs > 0 && secs < 100 {
        Ok(())
    } else {
        Err(format!("{secs} is outside 1..=99"))
    }
}

pub(crate) fn check_file_ttl(secs: i64, max: i64) -> Result<(), String> {
    if secs > 0 && secs <= max {
        Ok(())
    } else {
        Err(format!("{secs} is outside 1..={max}"))
    }
}

pub(crate) fn check_non_negative(value: i64) -> Result<(), String> {
    if value >= 0 {
        Ok(())
    } else {
        Err(format!("{value} is negative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = CacheSettings::default();
        assert_eq!(s.read_state(), ReadState::Normal);
        assert_eq!(s.write_state(), WriteState::Cache);
        assert_eq!(s.file_thread_interval(), 1);
        assert_eq!(s.file_ttl(), 300);
        assert_eq!(s.metadata_ttl(), 120);
        assert_eq!(s.transfer_max_rate(), 100_000);
    }

    #[test]
    fn test_bounds() {
        let s = CacheSettings::default();
        assert!(s.set_file_thread_interval(0).is_err());
        assert!(s.set_file_thread_interval(100).is_err());
        assert!(s.set_file_thread_interval(99).is_ok());
        assert_eq!(s.file_thread_interval(), 99);

        assert!(s.set_file_ttl(0).is_err());
        assert!(s.set_file_ttl(s.max_file_ttl() + 1).is_err());
        assert!(s.set_file_ttl(120).is_ok());
        assert_eq!(s.file_ttl(), 120);

        assert!(s.set_transfer_max_rate(-1).is_err());
        assert!(s.set_transfer_max_rate(0).is_ok());
        assert!(s.set_metadata_ttl(-5).is_err());
        assert_eq!(s.metadata_ttl(), 120);
    }

    #[test]
    fn test_modal_states() {
        let s = CacheSettings::default();
        s.set_read_state(ReadState::Handsup).unwrap();
        s.set_write_state(WriteState::Force).unwrap();
        assert_eq!(s.read_state(), ReadState::Handsup);
        assert_eq!(s.write_state(), WriteState::Force);
    }
}
