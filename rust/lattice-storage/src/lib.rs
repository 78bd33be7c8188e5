#![warn(missing_docs)]

//! The key-value substrate that backs the Lattice capability store. A
//! [`StorageBackend`] is the minimal per-key contract required of a
//! persistence layer: atomic single-key get, set and remove, plus lazy
//! iteration via [`StorageSource`]. The [`MemoryStorageBackend`] implements
//! the contract over an in-memory map; durable backends (embedded or
//! networked databases) live outside this repository and only need to
//! satisfy the same trait.

mod backend;
pub use backend::*;

mod memory;
pub use memory::*;

mod error;
pub use error::*;
