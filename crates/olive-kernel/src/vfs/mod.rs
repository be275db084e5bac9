//! Virtual filesystem for olive.
//!
//! One path-tree model, two adapters, one facade:
//!
//! - **LocalFs**: the whole tree under a single key of a synchronous
//!   [`BlobStore`]
//! - **CloudFs**: the whole tree in a per-account remote document
//!   ([`DocumentStore`])
//! - **OliveFs**: routes `/cloud/...` to the remote adapter and everything
//!   else to the local one
//!
//! ```text
//! /                      # LocalFs
//! ├── /documents/
//! └── /cloud/            # CloudFs (prefix stripped)
//! ```
//!
//! Both adapters share the pure tree operations in [`tree`]; they differ
//! only in where the document lives and whether missing parents are created.

mod account;
mod clock;
mod cloud;
mod local;
pub mod path;
mod remote;
mod router;
mod store;
mod traits;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use account::AccountStore;
pub use clock::{Clock, StepClock, SystemClock};
pub use cloud::CloudFs;
pub use local::{LOCAL_FS_KEY, LocalFs};
pub use remote::{DocumentStore, HttpDocumentStore};
pub use router::{CLOUD_PREFIX, OliveFs};
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use traits::Filesystem;
pub use tree::ParentPolicy;
