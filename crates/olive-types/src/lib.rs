//! Pure data types for olive: filesystem tree nodes, directory entries, errors.
//!
//! This crate is a leaf dependency with no async runtime and no I/O. Both the
//! kernel (which runs the filesystem adapters) and the server (which stores
//! per-account documents) share these types so the wire shape stays in one
//! place.

pub mod dir_entry;
pub mod error;
pub mod node;

// Flat re-exports for convenience
pub use dir_entry::*;
pub use error::*;
pub use node::*;
