#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A HashMap implementation over the chained hash table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers and optional
/// destructor hooks.
pub mod hash_map;

pub mod hash_table;

pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_table::DetachedEntry;
pub use hash_table::Destructor;
pub use hash_table::HashTable;
pub use hash_table::NoDestructor;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when a map does not name one.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when a map does not name one.
        pub type DefaultHashBuilder = std::hash::RandomState;
    }
}
