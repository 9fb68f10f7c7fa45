//! Common types and traits shared across `vegaset` crates.
//!
//! This crate provides the core abstractions that are shared between
//! `vegaset-core` and format implementation crates, preventing circular dependencies.

pub mod capabilities;
pub mod constraints;
pub mod io;
pub mod metadata;

// Re-export commonly used types
pub use capabilities::{CapabilityBinding, CapabilityRegistry, Outcome, Resolution};
pub use constraints::{Attr, AttrValue, ConstraintError, ConstraintSet, Predicate};
pub use io::{BatchIter, DataReader, DataScanner, LogicalType, ReadOptions, Source};
pub use metadata::{MetadataRow, Suffix, UnknownSuffix};
