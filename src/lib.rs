//! Trace-driven simulator for multi-level set-associative caches.
//!
//! Levels are built from a [`Config`], then a [`Hierarchy`] replays
//! [`Access`]es through them one at a time and reports per-level hit, miss
//! and memory-access counts.

pub mod cache;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod replace;
pub mod sectored;
pub mod trace;
pub mod write_buffer;

pub use crate::{
    cache::{Addr, CacheStats, Geometry, IsCache},
    config::{CacheConfig, Config},
    error::{Error, Result},
    hierarchy::{GlobalCounters, Hierarchy, Report},
    trace::{Access, AccessKind, Trace},
};
