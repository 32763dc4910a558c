//! # config
//!
//! why: size the window's entry buffer
//! relations: consumed by window.rs at construction and on every resize
//! what: WindowConfig with defaults and validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sizing parameters for the in-memory entry buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Capacity the buffer is grown to when it runs low on room
    pub entry_slice_size: usize,
    /// Free capacity below which the buffer is reallocated
    pub min_entry_slice_free_size: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            entry_slice_size: 512,
            min_entry_slice_free_size: 96,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("entry_slice_size must be greater than zero")]
    ZeroSliceSize,
    #[error("min_entry_slice_free_size {min_free} exceeds entry_slice_size {slice_size}")]
    FreeSizeTooLarge { min_free: usize, slice_size: usize },
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_slice_size == 0 {
            return Err(ConfigError::ZeroSliceSize);
        }
        if self.min_entry_slice_free_size > self.entry_slice_size {
            return Err(ConfigError::FreeSizeTooLarge {
                min_free: self.min_entry_slice_free_size,
                slice_size: self.entry_slice_size,
            });
        }
        Ok(())
    }
}
