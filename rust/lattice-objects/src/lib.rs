#![warn(missing_docs)]

//! The capability-gated object store at the heart of the Lattice trust
//! boundary. Every stored value is addressed by a [`Uid`] and guarded by a
//! set of [`Grant`]s; access is denied by default and only a credential that
//! is root, holds an elevated role, or carries an explicit grant may read,
//! write, execute against or delete an object. Ownership of an identifier is
//! claimed exactly once, by whichever caller writes it first.
//!
//! Alongside the grants, a [`StoragePermissionRegistry`] tracks which
//! federation members hold a replica of each object. That bookkeeping is
//! deliberately independent of access control.
//!
//! [`Uid`]: lattice_common::Uid

mod value;
pub use value::*;

mod grant;
pub use grant::*;

mod member;
pub use member::*;

mod pointer;
pub use pointer::*;

mod directory;
pub use directory::*;

mod registry;
pub use registry::*;

mod store;
pub use store::*;

mod error;
pub use error::*;
