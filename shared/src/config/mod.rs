//! Configuration module for Traceline.
//!
//! This module contains configuration structures for collection cadences
//! and flush scheduling.

pub mod collection;
pub mod flush;

pub use collection::CollectionConfig;
pub use flush::FlushConfig;
