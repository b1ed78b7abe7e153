//! Path-addressed filesystem over a remote, ID-addressed object store.
//!
//! [`DriveTree`] owns the path→ID resolution and cache maintenance;
//! [`DriveFs`] is the filesystem façade built on it.

pub mod drive_fs;
pub mod lister;
pub mod propagator;
pub mod resolver;
pub mod tree;

pub use drive_fs::{DriveFs, ListingEntry};
pub use tree::{DriveTree, Resolved, RootScope};

#[cfg(test)]
mod test_support;
